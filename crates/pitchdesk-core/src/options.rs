// PitchdeskOptions, the runtime configuration struct.
//
// Every knob has a default so `PitchdeskOptions::default()` yields a
// working configuration; the server binary overrides fields from the
// environment.

use serde::{Deserialize, Serialize};

/// Top-level configuration for a pitchdesk instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PitchdeskOptions {
    /// Session lifecycle configuration.
    #[serde(default)]
    pub session: SessionOptions,

    /// Password validation bounds.
    #[serde(default)]
    pub password: PasswordOptions,

    /// Credit policy applied by the vote ledger.
    #[serde(default)]
    pub credits: CreditOptions,

    /// Upload handling for idea images.
    #[serde(default)]
    pub uploads: UploadOptions,

    /// Prefix for the session cookie name (default: "pitchdesk", giving
    /// a cookie named "pitchdesk.session_token").
    #[serde(default = "default_cookie_prefix")]
    pub cookie_prefix: String,
}

impl Default for PitchdeskOptions {
    fn default() -> Self {
        Self {
            session: SessionOptions::default(),
            password: PasswordOptions::default(),
            credits: CreditOptions::default(),
            uploads: UploadOptions::default(),
            cookie_prefix: default_cookie_prefix(),
        }
    }
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Session TTL in seconds (default: 604800 = 7 days).
    #[serde(default = "default_session_expires_in")]
    pub expires_in: i64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            expires_in: default_session_expires_in(),
        }
    }
}

/// Password validation bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordOptions {
    /// Minimum password length (default: 8).
    #[serde(default = "default_min_password_length")]
    pub min_length: usize,

    /// Maximum password length (default: 128).
    #[serde(default = "default_max_password_length")]
    pub max_length: usize,
}

impl Default for PasswordOptions {
    fn default() -> Self {
        Self {
            min_length: default_min_password_length(),
            max_length: default_max_password_length(),
        }
    }
}

/// Credit policy applied by the vote ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditOptions {
    /// Balance granted to a freshly registered user (default: 100).
    #[serde(default = "default_starting_credits")]
    pub starting_balance: i64,

    /// Credits spent when a new vote is created (default: 1). Toggling a
    /// vote off never refunds this.
    #[serde(default = "default_vote_cost")]
    pub vote_cost: i64,
}

impl Default for CreditOptions {
    fn default() -> Self {
        Self {
            starting_balance: default_starting_credits(),
            vote_cost: default_vote_cost(),
        }
    }
}

/// Upload handling for idea images.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadOptions {
    /// Directory uploaded files are written to (default: "static/uploads").
    #[serde(default = "default_upload_dir")]
    pub dir: String,

    /// Public path prefix recorded in `media_url` (default: "/static/uploads").
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            dir: default_upload_dir(),
            public_prefix: default_public_prefix(),
        }
    }
}

fn default_cookie_prefix() -> String {
    "pitchdesk".to_string()
}

fn default_session_expires_in() -> i64 {
    604800
}

fn default_min_password_length() -> usize {
    8
}

fn default_max_password_length() -> usize {
    128
}

fn default_starting_credits() -> i64 {
    100
}

fn default_vote_cost() -> i64 {
    1
}

fn default_upload_dir() -> String {
    "static/uploads".to_string()
}

fn default_public_prefix() -> String {
    "/static/uploads".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = PitchdeskOptions::default();
        assert_eq!(options.session.expires_in, 604800);
        assert_eq!(options.password.min_length, 8);
        assert_eq!(options.password.max_length, 128);
        assert_eq!(options.credits.starting_balance, 100);
        assert_eq!(options.credits.vote_cost, 1);
        assert_eq!(options.cookie_prefix, "pitchdesk");
        assert_eq!(options.uploads.dir, "static/uploads");
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let options: PitchdeskOptions =
            serde_json::from_str(r#"{"credits": {"starting_balance": 50}}"#).unwrap();
        assert_eq!(options.credits.starting_balance, 50);
        assert_eq!(options.credits.vote_cost, 1);
        assert_eq!(options.session.expires_in, 604800);
    }
}
