pub mod config;
pub mod connectors;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod telemetry;
pub mod tracking;
