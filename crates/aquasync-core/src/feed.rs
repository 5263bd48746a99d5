//! Telemetry feed reads.
//!
//! The device publishes every sensor and actuator value to the telemetry
//! channel. [`TelemetryFeed::fetch_latest`] returns the newest channel entry;
//! [`FeedEntry::to_reading`] turns it into a [`ReadingRecord`] using the
//! configured [`FieldMap`].

use async_trait::async_trait;
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::debug;

use aquasync_types::ReadingRecord;

use crate::error::GatewayError;
use crate::fields::FieldMap;
use crate::gateway::{HttpGateway, cache_buster, no_cache_headers};

/// One entry of a channel feed. Field values arrive as strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedEntry {
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub entry_id: Option<u64>,
    #[serde(default)]
    pub field1: Option<String>,
    #[serde(default)]
    pub field2: Option<String>,
    #[serde(default)]
    pub field3: Option<String>,
    #[serde(default)]
    pub field4: Option<String>,
    #[serde(default)]
    pub field5: Option<String>,
    #[serde(default)]
    pub field6: Option<String>,
    #[serde(default)]
    pub field7: Option<String>,
    #[serde(default)]
    pub field8: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    feeds: Vec<FeedEntry>,
}

impl FeedEntry {
    /// An entry with no field values.
    pub fn empty(created_at: OffsetDateTime) -> Self {
        Self {
            created_at,
            entry_id: None,
            field1: None,
            field2: None,
            field3: None,
            field4: None,
            field5: None,
            field6: None,
            field7: None,
            field8: None,
        }
    }

    /// Set field `n` (builder style, used by tests and fakes).
    #[must_use]
    pub fn with_field(mut self, n: u8, value: impl Into<String>) -> Self {
        let value = Some(value.into());
        match n {
            1 => self.field1 = value,
            2 => self.field2 = value,
            3 => self.field3 = value,
            4 => self.field4 = value,
            5 => self.field5 = value,
            6 => self.field6 = value,
            7 => self.field7 = value,
            8 => self.field8 = value,
            _ => {}
        }
        self
    }

    /// Raw value of field `n`, treating blank strings as absent.
    pub fn field(&self, n: u8) -> Option<&str> {
        let value = match n {
            1 => &self.field1,
            2 => &self.field2,
            3 => &self.field3,
            4 => &self.field4,
            5 => &self.field5,
            6 => &self.field6,
            7 => &self.field7,
            8 => &self.field8,
            _ => return None,
        };
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    fn number(&self, n: Option<u8>) -> Option<f32> {
        let raw = self.field(n?)?;
        match raw.parse::<f32>() {
            Ok(v) if v.is_finite() => Some(v),
            _ => {
                debug!(field = n, raw, "Ignoring non-numeric field value");
                None
            }
        }
    }

    fn flag(&self, n: u8) -> Option<bool> {
        let raw = self.field(n)?;
        match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "on" => Some(true),
            "0" | "false" | "off" => Some(false),
            other => other.parse::<f32>().ok().map(|v| v != 0.0),
        }
    }

    /// Convert to a reading.
    ///
    /// Actuator fields the entry left empty are carried forward from
    /// `previous` (or default to off); sensor fields are taken as-is.
    pub fn to_reading(&self, map: &FieldMap, previous: Option<&ReadingRecord>) -> ReadingRecord {
        let pump_status = self
            .flag(map.pump)
            .unwrap_or_else(|| previous.is_some_and(|p| p.pump_status));
        let heater_status = self
            .flag(map.heater)
            .unwrap_or_else(|| previous.is_some_and(|p| p.heater_status));

        ReadingRecord {
            timestamp: self.created_at,
            pump_status,
            heater_status,
            water_temp: self.number(map.water_temp),
            air_temp: self.number(map.air_temp),
            water_level: self.number(map.water_level),
            flow_rate: self.number(map.flow_rate),
            humidity: self.number(map.humidity),
            ph_level: self.number(map.ph_level),
            oxygen_level: self.number(map.oxygen_level),
        }
    }
}

/// Source of channel entries.
#[async_trait]
pub trait TelemetryFeed: Send + Sync {
    /// The newest entry, or `None` for an empty channel.
    async fn fetch_latest(&self) -> Result<Option<FeedEntry>, GatewayError>;
}

#[async_trait]
impl TelemetryFeed for HttpGateway {
    async fn fetch_latest(&self) -> Result<Option<FeedEntry>, GatewayError> {
        if self.config.channel_id.is_empty() {
            return Err(GatewayError::NotConfigured(
                "channel id is not set".to_string(),
            ));
        }

        let url = format!(
            "{}/channels/{}/feeds.json",
            self.config.base_url, self.config.channel_id
        );

        let mut query = vec![("results", "1".to_string()), ("t", cache_buster())];
        if !self.config.read_api_key.is_empty() {
            query.insert(0, ("api_key", self.config.read_api_key.clone()));
        }

        let response = self
            .client
            .get(&url)
            .headers(no_cache_headers())
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: FeedResponse = serde_json::from_str(&body)
            .map_err(|e| GatewayError::Malformed(format!("feed body: {e}")))?;

        Ok(parsed.feeds.into_iter().max_by_key(|entry| entry.created_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn entry() -> FeedEntry {
        FeedEntry::empty(datetime!(2024-05-01 12:00 UTC))
    }

    #[test]
    fn test_to_reading_maps_default_fields() {
        let entry = entry()
            .with_field(1, "24.5")
            .with_field(2, "19.25")
            .with_field(3, "1")
            .with_field(4, "0")
            .with_field(5, "80")
            .with_field(6, "3.2")
            .with_field(7, "61");

        let reading = entry.to_reading(&FieldMap::default(), None);

        assert_eq!(reading.timestamp, datetime!(2024-05-01 12:00 UTC));
        assert!(reading.pump_status);
        assert!(!reading.heater_status);
        assert_eq!(reading.water_temp, Some(24.5));
        assert_eq!(reading.air_temp, Some(19.25));
        assert_eq!(reading.water_level, Some(80.0));
        assert_eq!(reading.flow_rate, Some(3.2));
        assert_eq!(reading.humidity, Some(61.0));
        assert_eq!(reading.ph_level, None);
    }

    #[test]
    fn test_to_reading_carries_actuators_forward() {
        let previous = ReadingRecord::new(datetime!(2024-05-01 11:59 UTC), true, true);
        // a write of only the heater field
        let entry = entry().with_field(4, "0");

        let reading = entry.to_reading(&FieldMap::default(), Some(&previous));

        assert!(reading.pump_status);
        assert!(!reading.heater_status);
        assert_eq!(reading.water_temp, None);
    }

    #[test]
    fn test_to_reading_without_history_defaults_off() {
        let reading = entry().to_reading(&FieldMap::default(), None);
        assert!(!reading.pump_status);
        assert!(!reading.heater_status);
    }

    #[test]
    fn test_flag_parsing_variants() {
        let map = FieldMap::default();
        for (raw, expected) in [("true", true), ("1.0", true), (" 0 ", false), ("off", false)] {
            let reading = entry().with_field(3, raw).to_reading(&map, None);
            assert_eq!(reading.pump_status, expected, "raw value {raw:?}");
        }
    }

    #[test]
    fn test_non_numeric_sensor_is_dropped() {
        let reading = entry()
            .with_field(1, "nan")
            .with_field(2, "n/a")
            .to_reading(&FieldMap::default(), None);
        assert_eq!(reading.water_temp, None);
        assert_eq!(reading.air_temp, None);
    }

    #[test]
    fn test_feed_response_parses_thingspeak_shape() {
        let json = r#"{
            "channel": {"id": 2840207, "name": "Aquaponia", "last_entry_id": 12},
            "feeds": [
                {"created_at": "2024-05-01T12:00:00Z", "entry_id": 12,
                 "field1": "24.50", "field3": "1", "field4": null}
            ]
        }"#;
        let parsed: FeedResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.feeds.len(), 1);
        let entry = &parsed.feeds[0];
        assert_eq!(entry.entry_id, Some(12));
        assert_eq!(entry.field(1), Some("24.50"));
        assert_eq!(entry.field(4), None);
    }
}
