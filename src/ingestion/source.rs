//! The L0 Source Adapter (spec §4.1): the single entry point the rest of
//! the pipeline pulls closed ledgers from. Combines the live gRPC client,
//! the archive fallback, the circuit breaker, retry/backoff, cursor
//! classification, and the optional frame cache into one `stream(start,
//! end)` contract.

use stellar_xdr::curr::LedgerCloseMeta;
use tokio_util::sync::CancellationToken;

use crate::config::{CacheConfig, LimitsConfig, SourceConfig};
use crate::error::{Error, Result};
use crate::ingestion::archive_client::ArchiveClient;
use crate::ingestion::cache::FrameCache;
use crate::ingestion::circuit_breaker::CircuitBreaker;
use crate::ingestion::cursor::{Cursor, CursorKind};
use crate::ingestion::rpc_client::RpcClient;

pub struct RawLedgerSource {
    source_config: SourceConfig,
    limits: LimitsConfig,
    rpc: RpcClient,
    archive: ArchiveClient,
    cache: Option<FrameCache>,
    breaker: CircuitBreaker,
}

impl RawLedgerSource {
    pub async fn connect(
        source_config: SourceConfig,
        limits: LimitsConfig,
        cache_config: &CacheConfig,
        archive_base_url: String,
        http_client: reqwest::Client,
    ) -> Result<Self> {
        let rpc = RpcClient::connect(source_config.endpoint.clone()).await?;
        let archive = ArchiveClient::connect(http_client, archive_base_url).await?;
        let cache = cache_config.enabled.then(|| FrameCache::new(cache_config));
        let breaker = CircuitBreaker::new(limits.circuit_breaker_threshold, limits.circuit_breaker_reset);
        Ok(Self {
            source_config,
            limits,
            rpc,
            archive,
            cache,
            breaker,
        })
    }

    /// Fetch a single closed ledger, going through the circuit breaker and
    /// retry policy, preferring the cache, then the archive (for historical
    /// cursors) or the live RPC stream (spec §4.1). `upstream_latest` is
    /// whatever the caller's most recent observation of the tip is, used
    /// only for historical/live classification.
    pub async fn fetch_ledger(
        &mut self,
        sequence: u32,
        upstream_latest: u32,
        cancel: &CancellationToken,
    ) -> Result<LedgerCloseMeta> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        if let Some(cache) = &self.cache {
            if let Some(bytes) = cache.get(sequence).await {
                let batch = crate::ingestion::archive_client::parse_batch(sequence, &bytes)?;
                return first_meta(sequence, batch);
            }
        }

        let kind = crate::ingestion::cursor::classify(
            sequence,
            upstream_latest,
            self.limits.retention_window_ledgers,
        );

        let mut backoff = crate::ingestion::retry::build_backoff(&self.limits);
        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if !self.breaker.allow_request() {
                return Err(Error::UpstreamUnavailable("circuit breaker open".to_string()));
            }

            let attempt = self.fetch_once(sequence, kind).await;

            match attempt {
                Ok(meta) => {
                    self.breaker.record_success();
                    return Ok(meta);
                }
                Err(e) if !e.is_retryable() => {
                    return Err(e);
                }
                Err(e) => {
                    self.breaker.record_failure();
                    use backoff::backoff::Backoff;
                    match backoff.next_backoff() {
                        Some(delay) => {
                            tracing::warn!(ledger_sequence = sequence, error = %e, "retrying ledger fetch");
                            tokio::time::sleep(delay).await;
                        }
                        None => return Err(e),
                    }
                }
            }
        }
    }

    async fn fetch_once(&mut self, sequence: u32, kind: CursorKind) -> Result<LedgerCloseMeta> {
        match kind {
            CursorKind::Historical => {
                let raw = self.archive.fetch_raw(sequence).await?;
                if let Some(cache) = &self.cache {
                    cache.put(sequence, raw.clone()).await;
                }
                let batch = crate::ingestion::archive_client::parse_batch(sequence, &raw)?;
                first_meta(sequence, batch)
            }
            CursorKind::Live => {
                use futures::StreamExt;
                let mut stream = self.rpc.stream(sequence).await?;
                futures::pin_mut!(stream);
                match stream.next().await {
                    Some(Ok((_, meta))) => Ok(meta),
                    Some(Err(e)) => Err(e),
                    None => Err(Error::UpstreamUnavailable("live stream closed".into())),
                }
            }
        }
    }

    /// Advance the cursor for the *next* fetch, given the latest known
    /// upstream tip. The source adapter itself is stateless across calls
    /// beyond the breaker and cache; callers (L1/orchestration) own the
    /// actual cursor/checkpoint.
    pub fn classify(&self, sequence: u32, upstream_latest: u32) -> CursorKind {
        crate::ingestion::cursor::classify(sequence, upstream_latest, self.limits.retention_window_ledgers)
    }

    pub fn new_cursor(&self, start_sequence: u32, upstream_latest: u32) -> Cursor {
        Cursor::new(start_sequence, upstream_latest, self.limits.retention_window_ledgers)
    }

    /// Current circuit-breaker state, for the health summary (spec §4.6
    /// "circuit-breaker state"). Read-only: only [`Self::fetch_ledger`]
    /// drives transitions.
    pub fn breaker_state(&self) -> crate::ingestion::circuit_breaker::State {
        self.breaker.state()
    }
}

fn first_meta(sequence: u32, batch: stellar_xdr::curr::LedgerCloseMetaBatch) -> Result<LedgerCloseMeta> {
    batch.ledger_close_metas.into_iter().next().ok_or(Error::Decoding {
        ledger: Some(sequence),
        reason: "archive batch contained no ledgers".to_string(),
    })
}
