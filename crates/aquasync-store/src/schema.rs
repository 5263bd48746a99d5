//! Database schema and migrations.
//!
//! The schema version lives in SQLite's `user_version` pragma. Each entry of
//! [`MIGRATIONS`] upgrades the schema by one version and runs inside its own
//! transaction.

use rusqlite::Connection;

use crate::error::Result;

/// Ordered migrations; entry `n` upgrades from version `n` to `n + 1`.
///
/// Timestamps are stored as Unix milliseconds so interval math keeps
/// sub-second precision.
const MIGRATIONS: &[&str] = &[r#"
    CREATE TABLE readings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        captured_at_ms INTEGER NOT NULL,
        pump_status INTEGER NOT NULL,
        heater_status INTEGER NOT NULL,
        water_temp REAL,
        air_temp REAL,
        water_level REAL,
        flow_rate REAL,
        humidity REAL,
        ph_level REAL,
        oxygen_level REAL
    );
    CREATE INDEX idx_readings_time ON readings(captured_at_ms);
"#];

/// Current schema version.
pub const SCHEMA_VERSION: u32 = MIGRATIONS.len() as u32;

/// Bring the schema up to [`SCHEMA_VERSION`].
pub fn initialize(conn: &mut Connection) -> Result<()> {
    let current = schema_version(conn)?;

    for (version, sql) in MIGRATIONS.iter().enumerate().skip(current as usize) {
        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version as u32 + 1)?;
        tx.commit()?;
        tracing::debug!("Migrated store schema to version {}", version + 1);
    }

    Ok(())
}

fn schema_version(conn: &Connection) -> Result<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}
