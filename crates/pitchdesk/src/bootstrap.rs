// First-run provisioning.
//
// The server calls [`ensure_admin`] on every boot. The call is idempotent,
// so restarting never duplicates the account or resets its password.

use pitchdesk_core::error::Result;
use pitchdesk_core::utils::id::generate_id;
use pitchdesk_core::{Role, User};

use crate::context::AppContext;
use crate::crypto::password::hash_password;

pub const DEFAULT_ADMIN_EMAIL: &str = "admin@pitchdesk.com";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Credits granted to the provisioned admin account.
const ADMIN_CREDITS: i64 = 999;

/// Create the admin account if no user with `email` exists yet. Returns the
/// account either way.
pub async fn ensure_admin(ctx: &AppContext, email: &str, password: &str) -> Result<User> {
    if let Some(existing) = ctx.store.find_user_by_email(email).await? {
        if existing.role != Role::Admin {
            tracing::warn!(
                email = %existing.email,
                "admin bootstrap found a non-admin account with this email, leaving it untouched"
            );
        }
        return Ok(existing);
    }

    if password == DEFAULT_ADMIN_PASSWORD {
        tracing::warn!(
            "admin account uses the default password, set PITCHDESK_ADMIN_PASSWORD to change it"
        );
    }

    let mut admin = User::new(
        generate_id(),
        "admin".to_string(),
        email.to_string(),
        hash_password(password)?,
        ADMIN_CREDITS,
    );
    admin.role = Role::Admin;
    admin.is_verified = true;

    let created = ctx.store.create_user(&admin).await?;
    tracing::info!(email = %created.email, "provisioned admin account");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use pitchdesk_core::PitchdeskOptions;
    use pitchdesk_memory::MemoryAdapter;

    use crate::identity::authenticate;

    fn test_ctx() -> Arc<AppContext> {
        AppContext::new(PitchdeskOptions::default(), Arc::new(MemoryAdapter::new()))
    }

    #[tokio::test]
    async fn test_creates_admin_account() {
        let ctx = test_ctx();
        let admin = ensure_admin(&ctx, "Admin@Pitchdesk.com", "hunter2-hunter2")
            .await
            .unwrap();

        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.credits, 999);
        assert!(admin.is_verified);
        assert_eq!(admin.email, "admin@pitchdesk.com");
        assert_eq!(admin.username, "admin");
    }

    #[tokio::test]
    async fn test_second_boot_reuses_account() {
        let ctx = test_ctx();
        let first = ensure_admin(&ctx, DEFAULT_ADMIN_EMAIL, "hunter2-hunter2")
            .await
            .unwrap();
        let second = ensure_admin(&ctx, DEFAULT_ADMIN_EMAIL, "different-password")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        let users = ctx.store.adapter().count("user", &[]).await.unwrap();
        assert_eq!(users, 1);
    }

    #[tokio::test]
    async fn test_admin_can_log_in() {
        let ctx = test_ctx();
        ensure_admin(&ctx, DEFAULT_ADMIN_EMAIL, "hunter2-hunter2")
            .await
            .unwrap();

        let (user, session) = authenticate(&ctx, DEFAULT_ADMIN_EMAIL, "hunter2-hunter2")
            .await
            .unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(session.user_id, user.id);
    }
}
