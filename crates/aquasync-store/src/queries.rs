//! Query builder for stored readings.
//!
//! # Example
//!
//! ```
//! use aquasync_store::{Store, ReadingQuery};
//! use time::{OffsetDateTime, Duration};
//!
//! let store = Store::open_in_memory()?;
//! let hour_ago = OffsetDateTime::now_utc() - Duration::hours(1);
//!
//! let query = ReadingQuery::new().since(hour_ago).limit(60);
//! let readings = store.query_readings(&query)?;
//! assert!(readings.is_empty());
//! # Ok::<(), aquasync_store::Error>(())
//! ```

use time::OffsetDateTime;

/// Convert a timestamp to the stored millisecond representation.
pub(crate) fn to_millis(ts: OffsetDateTime) -> i64 {
    (ts.unix_timestamp_nanos() / 1_000_000) as i64
}

/// Fluent query builder for readings.
///
/// By default, queries return results ordered by capture time descending
/// (newest first).
#[derive(Debug, Default, Clone)]
pub struct ReadingQuery {
    /// Filter readings captured at or after this time.
    pub since: Option<OffsetDateTime>,
    /// Filter readings captured at or before this time.
    pub until: Option<OffsetDateTime>,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub offset: Option<u32>,
    /// Order newest first.
    pub newest_first: bool,
}

impl ReadingQuery {
    /// Create a new query: no filters, no limit, newest first.
    pub fn new() -> Self {
        Self {
            newest_first: true,
            ..Default::default()
        }
    }

    pub fn since(mut self, time: OffsetDateTime) -> Self {
        self.since = Some(time);
        self
    }

    pub fn until(mut self, time: OffsetDateTime) -> Self {
        self.until = Some(time);
        self
    }

    /// Limit the maximum number of results returned.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first N results. SQLite needs a LIMIT for OFFSET to apply,
    /// so an offset without a limit is treated as unlimited.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Order results chronologically.
    pub fn oldest_first(mut self) -> Self {
        self.newest_first = false;
        self
    }

    /// Build the SQL WHERE clause and parameters.
    pub(crate) fn build_where(&self) -> (String, Vec<i64>) {
        let mut conditions = Vec::new();
        let mut params = Vec::new();

        if let Some(since) = self.since {
            conditions.push("captured_at_ms >= ?");
            params.push(to_millis(since));
        }

        if let Some(until) = self.until {
            conditions.push("captured_at_ms <= ?");
            params.push(to_millis(until));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    /// Build the full SQL query.
    pub(crate) fn build_sql(&self) -> String {
        let (where_clause, _) = self.build_where();
        // ties on timestamp fall back to insertion order
        let order = if self.newest_first { "DESC" } else { "ASC" };

        let mut sql = format!(
            "SELECT captured_at_ms, pump_status, heater_status, water_temp, air_temp, \
             water_level, flow_rate, humidity, ph_level, oxygen_level \
             FROM readings {} ORDER BY captured_at_ms {order}, id {order}",
            where_clause
        );

        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
            (None, None) => {}
        }

        sql
    }
}
