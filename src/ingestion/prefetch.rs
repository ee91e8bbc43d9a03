//! Prefetch worker for the optional frame cache (spec §4.1). Runs
//! alongside L1's sequential draining of the source adapter, keeping the
//! cache populated a few ledgers ahead so the next `fetch_ledger` call is
//! usually a cache hit instead of an archive round trip.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::ingestion::cache::predicted_window;
use crate::ingestion::cursor::CursorKind;
use crate::ingestion::source::RawLedgerSource;

/// Spawns a background task that, each time [`Prefetcher::advance`] is
/// called, fetches the next `concurrency` sequential ledgers into the
/// source's cache. Only useful for historical cursors - live ledgers
/// arrive one at a time off the gRPC stream and there is nothing ahead of
/// the tip to prefetch.
pub struct Prefetcher {
    source: Arc<Mutex<RawLedgerSource>>,
    concurrency: usize,
    cancel: CancellationToken,
}

impl Prefetcher {
    pub fn new(source: Arc<Mutex<RawLedgerSource>>, concurrency: usize, cancel: CancellationToken) -> Self {
        Self { source, concurrency, cancel }
    }

    /// Kick off prefetch for the window following `current`, if `current`
    /// classifies as historical against `upstream_latest`. Fire-and-forget:
    /// failures are logged and otherwise ignored, since a prefetch miss
    /// just means the next real fetch falls back to the archive as usual.
    pub fn advance(&self, current: u32, upstream_latest: u32) {
        if self.concurrency == 0 {
            return;
        }
        let source = self.source.clone();
        let concurrency = self.concurrency;
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let window = {
                let guard = source.lock().await;
                if guard.classify(current, upstream_latest) != CursorKind::Historical {
                    return;
                }
                predicted_window(current, concurrency)
            };
            for sequence in window {
                if cancel.is_cancelled() {
                    return;
                }
                let mut guard = source.lock().await;
                if let Err(e) = guard.fetch_ledger(sequence, upstream_latest, &cancel).await {
                    tracing::debug!(ledger_sequence = sequence, error = %e, "prefetch miss");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_zero_window_is_empty() {
        assert_eq!(predicted_window(10, 0).len(), 0);
    }
}
