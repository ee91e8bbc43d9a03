//! Crate-wide error taxonomy (spec §7).
//!
//! Every component narrows this down to the subset of kinds it can actually
//! produce, but all of them share one enum so that propagation across stage
//! boundaries (L1 -> L2, L2/L3 -> control surface) doesn't require
//! re-wrapping.

/// The crate-wide error type. Variant names are the taxonomy kinds from
/// spec §7, not free-form messages.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// L0: retry budget exhausted talking to the upstream RPC/archive.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// L0: the requested cursor fell outside the upstream's retention
    /// window. Not counted against the retry budget; callers reset to
    /// `upstream.latest` and continue.
    #[error("cursor boundary: requested {requested}, upstream floor {floor}")]
    CursorBoundary { requested: u32, floor: u32 },

    /// L0/L1: a frame or its close-meta could not be decoded at all. Fatal
    /// for the ledger it belongs to; never silently skipped.
    #[error("decoding error at ledger {ledger:?}: {reason}")]
    Decoding {
        ledger: Option<u32>,
        reason: String,
    },

    /// L1: a single row failed to parse from otherwise-valid close-meta.
    /// Logged and the row is skipped; the ledger continues.
    #[error("row parse error in {stream} at ledger {ledger}: {reason}")]
    RowParse {
        stream: &'static str,
        ledger: u32,
        reason: String,
    },

    /// L2/L3: the hot or cold store is unreachable. Retryable.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// L2: a natural-key or schema constraint was violated. Implies an
    /// extractor/schema defect; not retried.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// L4: a subscriber failed to keep up and was disconnected.
    #[error("subscriber backpressure: {0}")]
    SubscriberBackpressure(String),

    /// Any stage: cooperative cancellation in progress.
    #[error("cancelled")]
    Cancelled,

    /// Startup: configuration was invalid; refuse to start.
    #[error("config error: {0}")]
    Config(String),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("xdr error: {0}")]
    Xdr(#[from] stellar_xdr::curr::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("hot store error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("cold store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("grpc transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("grpc status: {0}")]
    Status(#[from] tonic::Status),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this kind should be retried with backoff (vs. surfaced
    /// immediately). Mirrors the policy column of the §7 table.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::UpstreamUnavailable(_)
                | Error::StoreUnavailable(_)
                | Error::Http(_)
                | Error::Sqlx(_)
                | Error::ObjectStore(_)
                | Error::Transport(_)
        )
    }

    /// Whether this kind represents an operator-facing defect rather than a
    /// transient condition (constraint violations, bad config).
    pub fn is_fatal_defect(&self) -> bool {
        matches!(self, Error::ConstraintViolation(_) | Error::Config(_))
    }
}

impl From<Error> for tonic::Status {
    fn from(e: Error) -> Self {
        match e {
            Error::CursorBoundary { .. } => tonic::Status::out_of_range(e.to_string()),
            Error::Cancelled => tonic::Status::cancelled(e.to_string()),
            Error::Decoding { .. } => tonic::Status::data_loss(e.to_string()),
            Error::UpstreamUnavailable(_) | Error::StoreUnavailable(_) => {
                tonic::Status::unavailable(e.to_string())
            }
            _ => tonic::Status::internal(e.to_string()),
        }
    }
}
