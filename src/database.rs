// src/database.rs
pub(crate) mod models;

use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{debug, error, info};

use crate::{
    config::DatabaseConfig,
    errors::LocationError,
    models::{LocationId, LocationRecord, Persisted},
};
use self::models::LocationRow;

const SELECT_LOCATION: &str = r#"
    SELECT
        location_id, timestamp, "user", device,
        latitude::float8 AS latitude, longitude::float8 AS longitude,
        altitude, accuracy, accuracy_alt, battery, battery_status,
        trigger, connection, tracker_id, address, angle,
        pressure::float8 AS pressure, velocity
    FROM location
    WHERE location_id = $1
"#;

/// Storage for location reports in the `location` table
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Wrap an existing pool, applying pending migrations
    pub async fn new(pool: PgPool) -> Result<Self, LocationError> {
        if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
            error!("Failed to run migrations: {}", e);
            return Err(e.into());
        }
        Ok(Self { pool })
    }

    /// Connect using validated configuration
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self, LocationError> {
        config.validate()?;

        info!(
            "Connecting to database: max_connections={}, acquire_timeout={:?}",
            config.max_connections, config.acquire_timeout
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await?;

        Self::new(pool).await
    }

    /// Insert a location report, assigning its identifier
    pub async fn insert_location(
        &self,
        record: LocationRecord,
    ) -> Result<Persisted<LocationRecord>, LocationError> {
        let location_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO location (
                timestamp, "user", device, latitude, longitude,
                altitude, accuracy, accuracy_alt, battery, battery_status,
                trigger, connection, tracker_id, address, angle,
                pressure, velocity
            ) VALUES (
                $1, $2, $3, $4::numeric(13, 10), $5::numeric(13, 10),
                $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15,
                $16::numeric(19, 16), $17
            )
            RETURNING location_id
            "#,
        )
        .bind(record.timestamp)
        .bind(&record.user)
        .bind(&record.device)
        .bind(record.latitude)
        .bind(record.longitude)
        .bind(record.altitude)
        .bind(record.accuracy)
        .bind(record.accuracy_alt)
        .bind(record.battery)
        .bind(record.battery_status)
        .bind(record.trigger.map(String::from))
        .bind(record.connection.map(String::from))
        .bind(&record.tracker_id)
        .bind(&record.address)
        .bind(record.angle)
        .bind(record.pressure)
        .bind(record.velocity)
        .fetch_one(&self.pool)
        .await?;

        let id = LocationId::new(location_id);
        debug!(
            "Stored location {} for user={}, device={}",
            id, record.user, record.device
        );

        Ok(Persisted::new(id, record))
    }

    /// Fetch a stored location by identifier
    pub async fn get_location(
        &self,
        id: LocationId,
    ) -> Result<Option<Persisted<LocationRecord>>, LocationError> {
        let row: Option<LocationRow> = sqlx::query_as(SELECT_LOCATION)
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Persisted::try_from).transpose()
    }

    /// Delete a stored location, returning whether it existed
    pub async fn delete_location(&self, id: LocationId) -> Result<bool, LocationError> {
        let result = sqlx::query("DELETE FROM location WHERE location_id = $1")
            .bind(id.value())
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            debug!("Deleted location {}", id);
        }
        Ok(deleted)
    }
}
