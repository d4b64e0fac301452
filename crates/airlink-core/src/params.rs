//! Device parameter vocabulary and the decoded parameter snapshot.
//!
//! Every parameter has a wire name (the column name used in `status` and
//! `cmd` packs) and a decoded field name used by consumers:
//!
//! | Wire name | Field | Decoded as |
//! |-----------|-------|------------|
//! | `Pow` | `power_on` | `raw == 1` |
//! | `Lig` | `led_on` | `raw == 1` |
//! | `SetTem` | `target_temp` | raw |
//! | `Tur` | `turbo_on` | `raw == 1` |
//! | `TemSen` | `sensor_temp` | `raw - 40` |
//! | `Blo` | `xfan_on` | `raw == 1` |
//! | `Quiet` | `quiet_on` | `raw == 1` |
//! | `SwhSlp` | `sleep_on` | `raw == 1` |
//! | `WdSpd` | `fan_speed` | raw |
//! | `Mod` | `mode` | raw, see [`OperatingMode`] |
//! | `SwUpDn` | `v_swing` | raw |

use crate::{Result, constants::SENSOR_TEMPERATURE_OFFSET, error::Error};
use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;

/// A parameter the device exposes in status polls and accepts in commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ParameterName {
    #[serde(rename = "Pow")]
    Power,
    #[serde(rename = "Lig")]
    Light,
    #[serde(rename = "SetTem")]
    TargetTemperature,
    #[serde(rename = "Tur")]
    Turbo,
    #[serde(rename = "TemSen")]
    SensorTemperature,
    #[serde(rename = "Blo")]
    XFan,
    #[serde(rename = "Quiet")]
    Quiet,
    #[serde(rename = "SwhSlp")]
    Sleep,
    #[serde(rename = "WdSpd")]
    FanSpeed,
    #[serde(rename = "Mod")]
    Mode,
    #[serde(rename = "SwUpDn")]
    VerticalSwing,
}

impl ParameterName {
    /// Every parameter, in the column order used by status polls.
    pub const ALL: [ParameterName; 11] = [
        ParameterName::Power,
        ParameterName::Light,
        ParameterName::TargetTemperature,
        ParameterName::Turbo,
        ParameterName::SensorTemperature,
        ParameterName::XFan,
        ParameterName::Quiet,
        ParameterName::Sleep,
        ParameterName::FanSpeed,
        ParameterName::Mode,
        ParameterName::VerticalSwing,
    ];

    /// Column name on the wire.
    pub fn wire_name(&self) -> &'static str {
        match self {
            ParameterName::Power => "Pow",
            ParameterName::Light => "Lig",
            ParameterName::TargetTemperature => "SetTem",
            ParameterName::Turbo => "Tur",
            ParameterName::SensorTemperature => "TemSen",
            ParameterName::XFan => "Blo",
            ParameterName::Quiet => "Quiet",
            ParameterName::Sleep => "SwhSlp",
            ParameterName::FanSpeed => "WdSpd",
            ParameterName::Mode => "Mod",
            ParameterName::VerticalSwing => "SwUpDn",
        }
    }

    /// Decoded field name exposed to consumers.
    pub fn field_name(&self) -> &'static str {
        match self {
            ParameterName::Power => "power_on",
            ParameterName::Light => "led_on",
            ParameterName::TargetTemperature => "target_temp",
            ParameterName::Turbo => "turbo_on",
            ParameterName::SensorTemperature => "sensor_temp",
            ParameterName::XFan => "xfan_on",
            ParameterName::Quiet => "quiet_on",
            ParameterName::Sleep => "sleep_on",
            ParameterName::FanSpeed => "fan_speed",
            ParameterName::Mode => "mode",
            ParameterName::VerticalSwing => "v_swing",
        }
    }

    /// Look up a parameter by its wire name.
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.wire_name() == name)
    }

    /// Whether the decoded value is an on/off flag.
    pub fn is_boolean(&self) -> bool {
        matches!(
            self,
            ParameterName::Power
                | ParameterName::Light
                | ParameterName::Turbo
                | ParameterName::XFan
                | ParameterName::Quiet
                | ParameterName::Sleep
        )
    }

    /// Whether the parameter can be written with a `cmd` pack.
    pub fn is_writable(&self) -> bool {
        !matches!(self, ParameterName::SensorTemperature)
    }

    /// Raw values the device accepts for a write.
    fn writable_range(&self) -> RangeInclusive<i64> {
        match self {
            ParameterName::TargetTemperature => 16..=30,
            ParameterName::FanSpeed => 0..=5,
            ParameterName::Mode => 0..=4,
            ParameterName::VerticalSwing => 0..=11,
            _ => 0..=1,
        }
    }

    /// Decode a raw column value.
    pub fn decode(&self, raw: i64) -> ParameterValue {
        match self {
            p if p.is_boolean() => ParameterValue::Bool(raw == 1),
            ParameterName::SensorTemperature => {
                ParameterValue::Number(raw - SENSOR_TEMPERATURE_OFFSET)
            }
            _ => ParameterValue::Number(raw),
        }
    }

    /// Encode a value for a `cmd` pack, validating it first.
    ///
    /// # Errors
    /// Returns `Error::ReadOnlyParameter` for `TemSen` and
    /// `Error::InvalidParameterValue` if the value is out of range.
    pub fn encode(&self, value: ParameterValue) -> Result<i64> {
        if !self.is_writable() {
            return Err(Error::ReadOnlyParameter(self.wire_name().to_string()));
        }

        let raw = value.as_i64();
        let range = self.writable_range();
        if !range.contains(&raw) {
            return Err(Error::InvalidParameterValue {
                name: self.wire_name().to_string(),
                value: raw,
                reason: format!("expected {}..={}", range.start(), range.end()),
            });
        }
        Ok(raw)
    }
}

impl fmt::Display for ParameterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl std::str::FromStr for ParameterName {
    type Err = Error;

    /// Accepts either the wire name (`SetTem`) or the field name (`target_temp`).
    fn from_str(s: &str) -> Result<Self> {
        Self::from_wire(s)
            .or_else(|| Self::ALL.into_iter().find(|p| p.field_name() == s))
            .ok_or_else(|| Error::UnknownParameter(s.to_string()))
    }
}

/// A decoded parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Number(i64),
}

impl ParameterValue {
    /// Raw integer form used on the wire.
    pub fn as_i64(&self) -> i64 {
        match self {
            ParameterValue::Bool(b) => i64::from(*b),
            ParameterValue::Number(n) => *n,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParameterValue::Bool(b) => Some(*b),
            ParameterValue::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            ParameterValue::Number(n) => Some(*n),
            ParameterValue::Bool(_) => None,
        }
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Bool(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        ParameterValue::Number(value)
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Bool(b) => write!(f, "{b}"),
            ParameterValue::Number(n) => write!(f, "{n}"),
        }
    }
}

impl std::str::FromStr for ParameterValue {
    type Err = Error;

    /// Parses `true`/`false`/`on`/`off`, an integer, or an operating mode name.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "true" | "on" => Ok(ParameterValue::Bool(true)),
            "false" | "off" => Ok(ParameterValue::Bool(false)),
            other => other
                .parse::<i64>()
                .map(ParameterValue::Number)
                .or_else(|_| other.parse::<OperatingMode>().map(|m| ParameterValue::Number(m as i64)))
                .map_err(|_| Error::Config(format!("Invalid parameter value: {s}"))),
        }
    }
}

/// Operating modes reported in the `Mod` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    Auto = 0,
    Cool = 1,
    Dry = 2,
    Fan = 3,
    Heat = 4,
}

impl TryFrom<i64> for OperatingMode {
    type Error = Error;

    fn try_from(raw: i64) -> Result<Self> {
        match raw {
            0 => Ok(OperatingMode::Auto),
            1 => Ok(OperatingMode::Cool),
            2 => Ok(OperatingMode::Dry),
            3 => Ok(OperatingMode::Fan),
            4 => Ok(OperatingMode::Heat),
            _ => Err(Error::InvalidParameterValue {
                name: ParameterName::Mode.wire_name().to_string(),
                value: raw,
                reason: "unknown operating mode".to_string(),
            }),
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperatingMode::Auto => "auto",
            OperatingMode::Cool => "cool",
            OperatingMode::Dry => "dry",
            OperatingMode::Fan => "fan",
            OperatingMode::Heat => "heat",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for OperatingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(OperatingMode::Auto),
            "cool" => Ok(OperatingMode::Cool),
            "dry" => Ok(OperatingMode::Dry),
            "fan" => Ok(OperatingMode::Fan),
            "heat" => Ok(OperatingMode::Heat),
            _ => Err(Error::Config(format!("Unknown operating mode: {s}"))),
        }
    }
}

/// Snapshot of device parameters from one status poll.
///
/// A new snapshot replaces the previous one entirely; values are never
/// merged across polls.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    values: BTreeMap<ParameterName, ParameterValue>,
    received_at: DateTime<Utc>,
}

impl ParameterSet {
    /// Decode raw column values into a snapshot.
    pub fn from_raw<I>(raw: I, received_at: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = (ParameterName, i64)>,
    {
        let values = raw
            .into_iter()
            .map(|(name, value)| (name, name.decode(value)))
            .collect();
        Self {
            values,
            received_at,
        }
    }

    pub fn get(&self, name: ParameterName) -> Option<ParameterValue> {
        self.values.get(&name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParameterName, ParameterValue)> + '_ {
        self.values.iter().map(|(name, value)| (*name, *value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// When the status reply carrying this snapshot arrived.
    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn power_on(&self) -> Option<bool> {
        self.get(ParameterName::Power).and_then(|v| v.as_bool())
    }

    pub fn target_temp(&self) -> Option<i64> {
        self.get(ParameterName::TargetTemperature)
            .and_then(|v| v.as_number())
    }

    /// Room temperature in degrees Celsius (offset already applied).
    pub fn sensor_temp(&self) -> Option<i64> {
        self.get(ParameterName::SensorTemperature)
            .and_then(|v| v.as_number())
    }

    pub fn fan_speed(&self) -> Option<i64> {
        self.get(ParameterName::FanSpeed).and_then(|v| v.as_number())
    }

    /// Operating mode, if reported and recognised.
    pub fn mode(&self) -> Option<OperatingMode> {
        self.get(ParameterName::Mode)
            .and_then(|v| v.as_number())
            .and_then(|raw| OperatingMode::try_from(raw).ok())
    }
}

impl Serialize for ParameterSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        for (name, value) in &self.values {
            map.serialize_entry(name.field_name(), value)?;
        }
        map.serialize_entry("received_at", &self.received_at)?;
        map.end()
    }
}
