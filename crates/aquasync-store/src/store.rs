//! Main store implementation.

use std::path::Path;

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use time::OffsetDateTime;
use tracing::{debug, info};

use aquasync_types::ReadingRecord;

use crate::error::{Error, Result};
use crate::queries::{ReadingQuery, to_millis};
use crate::schema;

/// SQLite-backed append-only reading history.
///
/// The store never updates or deletes a reading. Inserts must not go back in
/// time: a reading older than the newest stored one is rejected with
/// [`Error::OutOfOrder`].
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        info!("Opening database at {}", path.display());
        let mut conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        schema::initialize(&mut conn)?;

        Ok(Self { conn })
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        schema::initialize(&mut conn)?;
        Ok(Self { conn })
    }

    /// Append a reading and return its row id.
    pub fn insert_reading(&self, reading: &ReadingRecord) -> Result<i64> {
        let captured_at_ms = to_millis(reading.timestamp);

        if let Some(newest_ms) = self.newest_timestamp_ms()?
            && captured_at_ms < newest_ms
        {
            return Err(Error::OutOfOrder {
                attempted: reading.timestamp,
                newest: from_millis(newest_ms).map_err(|_| Error::InvalidTimestamp(newest_ms))?,
            });
        }

        self.conn.execute(
            "INSERT INTO readings (captured_at_ms, pump_status, heater_status, water_temp,
             air_temp, water_level, flow_rate, humidity, ph_level, oxygen_level)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                captured_at_ms,
                reading.pump_status,
                reading.heater_status,
                reading.water_temp,
                reading.air_temp,
                reading.water_level,
                reading.flow_rate,
                reading.humidity,
                reading.ph_level,
                reading.oxygen_level,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!(id, captured_at_ms, "Inserted reading");
        Ok(id)
    }

    /// Query readings with filters.
    pub fn query_readings(&self, query: &ReadingQuery) -> Result<Vec<ReadingRecord>> {
        let sql = query.build_sql();
        let (_, params) = query.build_where();

        debug!("Executing query: {}", sql);

        let mut stmt = self.conn.prepare(&sql)?;
        let readings = stmt
            .query_map(rusqlite::params_from_iter(params), row_to_reading)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(readings)
    }

    /// The newest `limit` readings, newest first.
    pub fn latest_readings(&self, limit: u32) -> Result<Vec<ReadingRecord>> {
        self.query_readings(&ReadingQuery::new().limit(limit))
    }

    /// The newest reading, if any.
    pub fn latest_reading(&self) -> Result<Option<ReadingRecord>> {
        let mut readings = self.latest_readings(1)?;
        Ok(readings.pop())
    }

    /// Count all stored readings.
    pub fn count_readings(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM readings", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn newest_timestamp_ms(&self) -> Result<Option<i64>> {
        let newest = self
            .conn
            .query_row("SELECT MAX(captured_at_ms) FROM readings", [], |row| {
                row.get::<_, Option<i64>>(0)
            })
            .optional()?
            .flatten();
        Ok(newest)
    }
}

fn from_millis(ms: i64) -> std::result::Result<OffsetDateTime, time::error::ComponentRange> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000)
}

fn row_to_reading(row: &Row<'_>) -> rusqlite::Result<ReadingRecord> {
    let ms: i64 = row.get(0)?;
    let timestamp = from_millis(ms)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(e)))?;

    Ok(ReadingRecord {
        timestamp,
        pump_status: row.get(1)?,
        heater_status: row.get(2)?,
        water_temp: row.get(3)?,
        air_temp: row.get(4)?,
        water_level: row.get(5)?,
        flow_rate: row.get(6)?,
        humidity: row.get(7)?,
        ph_level: row.get(8)?,
        oxygen_level: row.get(9)?,
    })
}
