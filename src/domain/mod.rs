// Domain layer - Telemetry model and pure derivations
pub mod csv_ingest;
pub mod dashboard;
pub mod date_parser;
pub mod export;
pub mod kpi;
pub mod schema;
pub mod telemetry;
pub mod time_range;
