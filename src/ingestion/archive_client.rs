//! Archive fallback fetch path: zstd-compressed XDR ledger batches over
//! HTTP, addressed the way a SEP-54-style bucket layout does (spec §4.1
//! "archive"). Directly adapted from the teacher's `ledger::fetch`/
//! `ledger::path`, generalized to the crate's own `Error` taxonomy.

use std::io::{Cursor, Read};

use serde::Deserialize;
use stellar_xdr::curr::{LedgerCloseMetaBatch, Limited, Limits, ReadXdr};

use crate::error::{Error, Result};

/// Bucket layout configuration, fetched once from `.config.json` the way
/// the teacher's `fetch_config` does.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveLayout {
    pub network_passphrase: String,
    pub ledgers_per_batch: u32,
    pub batches_per_partition: u32,
    pub compression: String,
}

impl Default for ArchiveLayout {
    fn default() -> Self {
        Self {
            network_passphrase: "Public Global Stellar Network ; September 2015".to_string(),
            ledgers_per_batch: 1,
            batches_per_partition: 64_000,
            compression: "zstd".to_string(),
        }
    }
}

impl ArchiveLayout {
    /// Object path for the batch containing `ledger_sequence`, using an
    /// inverted-hex prefix so lexicographic listing sorts newest first.
    pub fn path_for_ledger(&self, ledger_sequence: u32) -> String {
        let batch_start = ledger_sequence - (ledger_sequence % self.ledgers_per_batch);
        let batch_end = batch_start + self.ledgers_per_batch - 1;

        let partition_size = self.ledgers_per_batch * self.batches_per_partition;
        let partition_start = ledger_sequence - (ledger_sequence % partition_size);
        let partition_end = partition_start + partition_size - 1;

        let partition_prefix = 0xFFFF_FFFFu32.wrapping_sub(partition_start);
        let batch_prefix = 0xFFFF_FFFFu32.wrapping_sub(batch_start);

        let partition_dir = format!("{:08X}--{}-{}", partition_prefix, partition_start, partition_end);
        let batch_file = if self.ledgers_per_batch == 1 {
            format!("{:08X}--{}.xdr.zst", batch_prefix, batch_start)
        } else {
            format!("{:08X}--{}-{}.xdr.zst", batch_prefix, batch_start, batch_end)
        };

        if self.batches_per_partition == 1 && self.ledgers_per_batch == 1 {
            batch_file
        } else {
            format!("{}/{}", partition_dir, batch_file)
        }
    }
}

pub struct ArchiveClient {
    client: reqwest::Client,
    base_url: String,
    layout: ArchiveLayout,
}

impl ArchiveClient {
    pub async fn connect(client: reqwest::Client, base_url: String) -> Result<Self> {
        let layout = fetch_layout(&client, &base_url).await.unwrap_or_default();
        Ok(Self { client, base_url, layout })
    }

    pub fn layout(&self) -> &ArchiveLayout {
        &self.layout
    }

    /// Fetch and decompress a single batch, without decoding its XDR yet -
    /// callers that only need the raw bytes (e.g. to populate the cache)
    /// shouldn't pay for a parse they're going to discard.
    pub async fn fetch_raw(&self, ledger_sequence: u32) -> Result<Vec<u8>> {
        let path = self.layout.path_for_ledger(ledger_sequence);
        let url = format!("{}/{}", self.base_url, path);
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(Error::CursorBoundary {
                requested: ledger_sequence,
                floor: ledger_sequence,
            });
        }
        let compressed = resp.bytes().await?;
        let mut decoder = zstd::stream::Decoder::new(Cursor::new(compressed))
            .map_err(|e| Error::Decoding { ledger: Some(ledger_sequence), reason: e.to_string() })?;
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| Error::Decoding { ledger: Some(ledger_sequence), reason: e.to_string() })?;
        Ok(decompressed)
    }

    pub async fn fetch_batch(&self, ledger_sequence: u32) -> Result<LedgerCloseMetaBatch> {
        let bytes = self.fetch_raw(ledger_sequence).await?;
        parse_batch(ledger_sequence, &bytes)
    }
}

pub fn parse_batch(ledger_sequence: u32, bytes: &[u8]) -> Result<LedgerCloseMetaBatch> {
    let mut limited = Limited::new(Cursor::new(bytes), Limits::none());
    LedgerCloseMetaBatch::read_xdr(&mut limited).map_err(|e| Error::Decoding {
        ledger: Some(ledger_sequence),
        reason: e.to_string(),
    })
}

async fn fetch_layout(client: &reqwest::Client, base_url: &str) -> Result<ArchiveLayout> {
    let url = format!("{}/.config.json", base_url);
    let resp = client.get(&url).send().await?;
    if !resp.status().is_success() {
        return Err(Error::Config(format!("archive layout not found at {}", url)));
    }
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_ledger_batch_path_matches_expected_layout() {
        let layout = ArchiveLayout::default();
        assert_eq!(layout.path_for_ledger(0), "FFFFFFFF--0-63999/FFFFFFFF--0.xdr.zst");
        assert_eq!(layout.path_for_ledger(1), "FFFFFFFF--0-63999/FFFFFFFE--1.xdr.zst");
    }

    #[test]
    fn multi_ledger_batch_path_uses_ranges() {
        let layout = ArchiveLayout {
            network_passphrase: "x".into(),
            ledgers_per_batch: 2,
            batches_per_partition: 8,
            compression: "zstd".into(),
        };
        assert_eq!(layout.path_for_ledger(3), "FFFFFFFF--0-15/FFFFFFFD--2-3.xdr.zst");
    }

    #[test]
    fn empty_batch_fails_to_parse() {
        assert!(parse_batch(1, &[]).is_err());
    }
}
