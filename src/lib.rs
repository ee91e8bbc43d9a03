pub mod broadcast;
pub mod config;
pub mod control;
pub mod error;
pub mod extract;
pub mod flush;
pub mod grpc;
pub mod ingestion;
pub mod observability;
pub mod pipeline;
pub mod telemetry;
pub mod writer;

pub use error::{Error, Result};
