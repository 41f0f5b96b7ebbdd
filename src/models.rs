//! Data models.

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use serde_helpers::deserialize_finite;

/// Identifier of a stored location, assigned by the database on insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocationId(i64);

impl LocationId {
    pub(crate) fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the raw identifier value
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl From<i64> for LocationId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A single location report from a user's device
///
/// Field names match the columns of the `location` table. Records are
/// deserialized from report payloads, but only leave the crate through
/// [`LocationRecord::serialize`], which never exposes `trigger`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LocationRecord {
    /// Client-reported timestamp in seconds from Unix epoch.
    pub timestamp: i64,
    /// Associated username
    pub user: String,
    /// User's device name
    pub device: String,
    /// Latitude in decimal degrees
    #[serde(deserialize_with = "deserialize_finite")]
    pub latitude: f64,
    /// Longitude in decimal degrees
    #[serde(deserialize_with = "deserialize_finite")]
    pub longitude: f64,
    /// Altitude over sea level in meters
    pub altitude: Option<i32>,
    /// Accuracy in meters
    pub accuracy: Option<i32>,
    /// Accuracy of altitude in meters
    pub accuracy_alt: Option<i32>,
    /// Battery percentage at the time of reporting
    pub battery: Option<i32>,
    /// Battery status code
    ///
    /// - 0 = unknown
    /// - 1 = unplugged
    /// - 2 = charging
    /// - 3 = full
    pub battery_status: Option<i32>,
    /// Code for the mechanism that triggered the report. Write-only.
    pub trigger: Option<char>,
    /// Network connection type when the report was created
    pub connection: Option<char>,
    /// Client-specified tracker ID, at most two characters
    pub tracker_id: Option<String>,
    /// Reverse-geocoded address of the coordinates
    pub address: Option<String>,
    /// Course over ground in degrees
    pub angle: Option<i32>,
    /// Barometric pressure in kPa
    #[serde(deserialize_with = "deserialize_finite")]
    pub pressure: f64,
    /// Velocity in km/h
    pub velocity: Option<i32>,
}

impl LocationRecord {
    /// Create a location report entry
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        timestamp: i64,
        user: impl Into<String>,
        device: impl Into<String>,
        latitude: f64,
        longitude: f64,
        altitude: Option<i32>,
        accuracy: Option<i32>,
        accuracy_alt: Option<i32>,
        battery: Option<i32>,
        battery_status: Option<i32>,
        trigger: Option<char>,
        connection: Option<char>,
        tracker_id: Option<String>,
        address: Option<String>,
        angle: Option<i32>,
        pressure: f64,
        velocity: Option<i32>,
    ) -> Self {
        Self {
            timestamp,
            user: user.into(),
            device: device.into(),
            latitude,
            longitude,
            altitude,
            accuracy,
            accuracy_alt,
            battery,
            battery_status,
            trigger,
            connection,
            tracker_id,
            address,
            angle,
            pressure,
            velocity,
        }
    }

    /// Report timestamp as UTC datetime, None if out of range
    pub fn reported_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }

    /// Value of a serializable field
    ///
    /// Returns None for fields the record does not carry itself
    /// (`location_id`, which belongs to [`Persisted`]).
    fn value_of(&self, field: Field) -> Option<Value> {
        let value = match field {
            Field::LocationId => return None,
            Field::Timestamp => Value::from(self.timestamp),
            Field::User => Value::from(self.user.as_str()),
            Field::Device => Value::from(self.device.as_str()),
            Field::Latitude => Value::from(self.latitude),
            Field::Longitude => Value::from(self.longitude),
            Field::Altitude => Value::from(self.altitude),
            Field::Accuracy => Value::from(self.accuracy),
            Field::AccuracyAlt => Value::from(self.accuracy_alt),
            Field::Battery => Value::from(self.battery),
            Field::BatteryStatus => Value::from(self.battery_status),
            Field::Connection => Value::from(self.connection.map(String::from)),
            Field::TrackerId => Value::from(self.tracker_id.clone()),
            Field::Address => Value::from(self.address.clone()),
            Field::Angle => Value::from(self.angle),
            Field::Pressure => Value::from(self.pressure),
            Field::Velocity => Value::from(self.velocity),
        };
        Some(value)
    }

    /// Serialize the record into a JSON object
    ///
    /// Keys follow [`Field::ALL`] order. Absent optional values are emitted
    /// as `null`. An unsaved record has no `location_id` key.
    ///
    /// JSON has no representation for NaN or infinity, so a record built
    /// with non-finite coordinates or pressure emits `null` for them.
    /// Deserialized records never carry such values.
    pub fn serialize(&self, fields: &FieldSet) -> Map<String, Value> {
        project(fields, |field| self.value_of(field))
    }
}

fn project<F>(fields: &FieldSet, mut value_of: F) -> Map<String, Value>
where
    F: FnMut(Field) -> Option<Value>,
{
    Field::ALL
        .iter()
        .copied()
        .filter(|field| fields.contains(*field))
        .filter_map(|field| value_of(field).map(|value| (field.name().to_string(), value)))
        .collect()
}

/// A record that has been written to storage
///
/// Only the database layer creates these, so the identifier is assigned
/// once and cannot change.
#[derive(Debug, Clone, PartialEq)]
pub struct Persisted<T> {
    id: LocationId,
    record: T,
}

impl<T> Persisted<T> {
    pub(crate) fn new(id: LocationId, record: T) -> Self {
        Self { id, record }
    }

    pub fn id(&self) -> LocationId {
        self.id
    }

    pub fn record(&self) -> &T {
        &self.record
    }

    pub fn into_record(self) -> T {
        self.record
    }
}

impl<T> Deref for Persisted<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.record
    }
}

impl Persisted<LocationRecord> {
    /// Serialize the stored record, including `location_id`
    pub fn serialize(&self, fields: &FieldSet) -> Map<String, Value> {
        project(fields, |field| match field {
            Field::LocationId => Some(Value::from(self.id.value())),
            other => self.record.value_of(other),
        })
    }
}

/// Serializable attributes of a location
///
/// `trigger` is stored but has no variant here, so it cannot be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    LocationId,
    Timestamp,
    User,
    Device,
    Latitude,
    Longitude,
    Altitude,
    Accuracy,
    AccuracyAlt,
    Battery,
    BatteryStatus,
    Connection,
    TrackerId,
    Address,
    Angle,
    Pressure,
    Velocity,
}

impl Field {
    /// All fields in output order
    pub const ALL: [Field; 17] = [
        Field::LocationId,
        Field::Timestamp,
        Field::User,
        Field::Device,
        Field::Latitude,
        Field::Longitude,
        Field::Altitude,
        Field::Accuracy,
        Field::AccuracyAlt,
        Field::Battery,
        Field::BatteryStatus,
        Field::Connection,
        Field::TrackerId,
        Field::Address,
        Field::Angle,
        Field::Pressure,
        Field::Velocity,
    ];

    /// Column and JSON key name
    pub fn name(&self) -> &'static str {
        match self {
            Field::LocationId => "location_id",
            Field::Timestamp => "timestamp",
            Field::User => "user",
            Field::Device => "device",
            Field::Latitude => "latitude",
            Field::Longitude => "longitude",
            Field::Altitude => "altitude",
            Field::Accuracy => "accuracy",
            Field::AccuracyAlt => "accuracy_alt",
            Field::Battery => "battery",
            Field::BatteryStatus => "battery_status",
            Field::Connection => "connection",
            Field::TrackerId => "tracker_id",
            Field::Address => "address",
            Field::Angle => "angle",
            Field::Pressure => "pressure",
            Field::Velocity => "velocity",
        }
    }

    fn bit(&self) -> u32 {
        1 << (*self as u32)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name that does not correspond to a serializable field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField(pub String);

impl fmt::Display for UnknownField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown field: {}", self.0)
    }
}

impl std::error::Error for UnknownField {}

impl FromStr for Field {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .iter()
            .copied()
            .find(|field| field.name() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// Set of fields to include in serialization
///
/// A set built from no names at all leaves output unfiltered. A set built
/// from names that are all unknown filters everything out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldSet {
    bits: u32,
    filtered: bool,
}

impl FieldSet {
    /// Unfiltered set, matching every field
    pub fn all() -> Self {
        Self::default()
    }

    /// Build a filter from field names, ignoring names that are not fields
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for name in names {
            set.filtered = true;
            if let Ok(field) = name.as_ref().parse::<Field>() {
                set.insert(field);
            }
        }
        set
    }

    pub fn insert(&mut self, field: Field) {
        self.filtered = true;
        self.bits |= field.bit();
    }

    pub fn contains(&self, field: Field) -> bool {
        !self.filtered || self.bits & field.bit() != 0
    }

    /// True if no filter was requested
    pub fn is_unfiltered(&self) -> bool {
        !self.filtered
    }
}

impl FromIterator<Field> for FieldSet {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        let mut set = Self::default();
        for field in iter {
            set.insert(field);
        }
        set
    }
}

/// Custom deserializers
mod serde_helpers {
    use serde::{de::Error, Deserialize, Deserializer};

    pub fn deserialize_finite<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(D::Error::custom(format!("expected a finite number, got {}", value)))
        }
    }
}
