//! Persisted reading history for aquasync.
//!
//! This crate provides SQLite-based storage for the timestamped readings
//! ingested from the telemetry feed. The history is append-only and ordered
//! by capture time.
//!
//! # Example
//!
//! ```no_run
//! use aquasync_store::{Store, ReadingQuery};
//!
//! let store = Store::open_default()?;
//!
//! let latest = store.latest_reading()?;
//! let window = store.query_readings(&ReadingQuery::new().limit(60))?;
//! # Ok::<(), aquasync_store::Error>(())
//! ```

mod error;
mod queries;
mod schema;
mod store;

pub use error::{Error, Result};
pub use queries::ReadingQuery;
pub use schema::SCHEMA_VERSION;
pub use store::Store;

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/aquasync/data.db`
/// - macOS: `~/Library/Application Support/aquasync/data.db`
/// - Windows: `C:\Users\<user>\AppData\Local\aquasync\data.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("aquasync")
        .join("data.db")
}
