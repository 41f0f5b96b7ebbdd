// src/database/models.rs
use crate::{
    errors::LocationError,
    models::{LocationId, LocationRecord, Persisted},
};

/// Row of the `location` table, decimals read back as float8
///
/// Every column except the key is nullable, so required fields are checked
/// when converting to a record.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct LocationRow {
    pub location_id: i64,
    pub timestamp: Option<i64>,
    pub user: Option<String>,
    pub device: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<i32>,
    pub accuracy: Option<i32>,
    pub accuracy_alt: Option<i32>,
    pub battery: Option<i32>,
    pub battery_status: Option<i32>,
    pub trigger: Option<String>,
    pub connection: Option<String>,
    pub tracker_id: Option<String>,
    pub address: Option<String>,
    pub angle: Option<i32>,
    pub pressure: Option<f64>,
    pub velocity: Option<i32>,
}

impl TryFrom<LocationRow> for Persisted<LocationRecord> {
    type Error = LocationError;

    fn try_from(row: LocationRow) -> Result<Self, Self::Error> {
        let record = LocationRecord {
            timestamp: required("timestamp", row.timestamp)?,
            user: required("user", row.user)?,
            device: required("device", row.device)?,
            latitude: required("latitude", row.latitude)?,
            longitude: required("longitude", row.longitude)?,
            altitude: row.altitude,
            accuracy: row.accuracy,
            accuracy_alt: row.accuracy_alt,
            battery: row.battery,
            battery_status: row.battery_status,
            trigger: single_char("trigger", row.trigger)?,
            connection: single_char("connection", row.connection)?,
            tracker_id: row.tracker_id,
            address: row.address,
            angle: row.angle,
            pressure: required("pressure", row.pressure)?,
            velocity: row.velocity,
        };
        Ok(Persisted::new(LocationId::new(row.location_id), record))
    }
}

/// Unwrap a column that is nullable in the schema but required in the record
fn required<T>(column: &'static str, value: Option<T>) -> Result<T, LocationError> {
    value.ok_or_else(|| LocationError::InvalidColumn {
        column,
        value: "NULL".to_string(),
    })
}

/// Decode a one-character code column, empty string as None
fn single_char(
    column: &'static str,
    value: Option<String>,
) -> Result<Option<char>, LocationError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Ok(None),
        (Some(c), None) => Ok(Some(c)),
        (Some(_), Some(_)) => Err(LocationError::InvalidColumn { column, value }),
    }
}
