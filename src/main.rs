//! Location recorder utility
//!
//! Reads location reports as JSON lines from stdin, stores them and writes
//! the serialized stored records to stdout.

use location_recorder::{
    config::AppConfig, database::Database, errors::LocationError, ingest::ReportReader,
    models::FieldSet,
};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), LocationError> {
    #[cfg(feature = "dotenvy")]
    dotenvy::dotenv().ok();

    // Logs go to stderr, stdout carries records
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load()?;
    let fields = config.output.field_set();

    let db = Database::from_config(&config.database).await?;

    let shutdown_signal = signal::ctrl_c();

    tokio::select! {
        result = run_recorder(db, fields) => {
            info!("Location recorder completed: {:?}", result);
            result?;
        }
        _ = shutdown_signal => {
            info!("Received shutdown signal");
        }
    }

    Ok(())
}

async fn run_recorder(database: Database, fields: FieldSet) -> Result<(), LocationError> {
    let mut reports = ReportReader::new(BufReader::new(tokio::io::stdin()));
    let mut stdout = tokio::io::stdout();

    while let Some(record) = reports.next_report().await? {
        let stored = database.insert_location(record).await?;

        let mut payload = serde_json::to_vec(&stored.serialize(&fields))?;
        payload.push(b'\n');
        stdout.write_all(&payload).await?;
        stdout.flush().await?;
    }

    Ok(())
}
