// NEXUS Library - Manufacturing Traveler Service
// This exposes the core components for the binary, testing and integration

pub mod api;
pub mod approval;
pub mod barcode;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod labor;
pub mod model;
pub mod observability;
pub mod reports;
pub mod routing;
pub mod service;
pub mod shutdown;
pub mod store;
pub mod telemetry;

// Re-export key types for easy access
pub use config::{config, init_config, NexusConfig};
pub use error::{NexusError, Result};
pub use observability::{service_metrics, OperationTimer};
pub use service::{GateOutcome, ServiceSettings, TravelerService};
pub use shutdown::ShutdownCoordinator;
pub use store::{MemoryStore, Store, TravelerStore, UserDirectory};
pub use telemetry::{init_telemetry, shutdown_telemetry, generate_correlation_id, create_request_span};
