//! Mapping between telemetry channel fields and reading attributes.
//!
//! A ThingSpeak-style channel has eight numbered fields. The [`FieldMap`]
//! says which field carries which value; the same map drives both the command
//! gateway (which writes actuator fields) and the ingestion path (which reads
//! every field back into a [`ReadingRecord`]).

use serde::{Deserialize, Serialize};

use aquasync_types::Actuator;

/// Highest field number a channel supports.
pub const MAX_FIELD: u8 = 8;

/// Field numbers for each reading attribute.
///
/// Sensor fields are optional; an unmapped sensor is never read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMap {
    pub water_temp: Option<u8>,
    pub air_temp: Option<u8>,
    pub pump: u8,
    pub heater: u8,
    pub water_level: Option<u8>,
    pub flow_rate: Option<u8>,
    pub humidity: Option<u8>,
    pub ph_level: Option<u8>,
    pub oxygen_level: Option<u8>,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            water_temp: Some(1),
            air_temp: Some(2),
            pump: 3,
            heater: 4,
            water_level: Some(5),
            flow_rate: Some(6),
            humidity: Some(7),
            ph_level: None,
            oxygen_level: None,
        }
    }
}

impl FieldMap {
    /// Field number carrying `actuator`.
    pub fn actuator_field(&self, actuator: Actuator) -> u8 {
        match actuator {
            Actuator::Pump => self.pump,
            Actuator::Heater => self.heater,
        }
    }

    fn assignments(&self) -> Vec<(&'static str, u8)> {
        let sensors = [
            ("water_temp", self.water_temp),
            ("air_temp", self.air_temp),
            ("water_level", self.water_level),
            ("flow_rate", self.flow_rate),
            ("humidity", self.humidity),
            ("ph_level", self.ph_level),
            ("oxygen_level", self.oxygen_level),
        ];
        let mut all = vec![("pump", self.pump), ("heater", self.heater)];
        all.extend(
            sensors
                .into_iter()
                .filter_map(|(name, field)| field.map(|f| (name, f))),
        );
        all
    }

    /// Check that every field number is in range and used once.
    ///
    /// Returns one message per problem; an empty list means the map is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let assignments = self.assignments();

        for (name, field) in &assignments {
            if *field == 0 || *field > MAX_FIELD {
                problems.push(format!("{name} uses field{field}, expected 1-{MAX_FIELD}"));
            }
        }

        for (i, (name, field)) in assignments.iter().enumerate() {
            if let Some((other, _)) = assignments[..i].iter().find(|(_, f)| f == field) {
                problems.push(format!("{name} and {other} both use field{field}"));
            }
        }

        problems
    }
}
