// pitchdesk-sqlx — SQLx storage adapter for pitchdesk.
//
// Implements the core Adapter trait on top of sqlx::AnyPool, supporting
// SQLite, Postgres, and MySQL through one runtime-polymorphic pool, plus
// schema introspection and differential migrations.

pub mod adapter;
pub mod ddl;
pub mod migration;
pub mod query_builder;
pub mod transaction;

pub use adapter::SqlxAdapter;
pub use ddl::DatabaseType;
pub use migration::{get_migrations, get_migrations_auto, MigrationPlan};
pub use transaction::SqlxTransactionAdapter;
