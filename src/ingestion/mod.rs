//! L0 Source Adapter: the upstream-facing half of the pipeline (spec §4.1).
//! Owns the live gRPC client, the archive fallback, the circuit breaker,
//! retry/backoff, cursor classification, the optional frame cache, and
//! predictive prefetch. Everything downstream of L1 only ever calls
//! [`source::RawLedgerSource::fetch_ledger`].

pub mod archive_client;
pub mod cache;
pub mod circuit_breaker;
pub mod cursor;
pub mod prefetch;
pub mod retry;
pub mod rpc_client;
pub mod source;

pub use source::RawLedgerSource;
