//! Location report storage and serialization

pub mod config;
pub mod database;
pub mod errors;
pub mod ingest;
pub mod models;
