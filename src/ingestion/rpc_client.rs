//! Live gRPC client for the upstream `RawLedgerSource` stream (spec §6.1).

use futures::Stream;
use stellar_xdr::curr::{Limited, LedgerCloseMeta, Limits, ReadXdr};
use std::io::Cursor;
use tonic::transport::Channel;

use crate::error::{Error, Result};
use crate::grpc::ledger_source::{raw_ledger_source_client::RawLedgerSourceClient, StreamRequest};

pub struct RpcClient {
    inner: RawLedgerSourceClient<Channel>,
}

impl RpcClient {
    pub async fn connect(endpoint: String) -> Result<Self> {
        let inner = RawLedgerSourceClient::connect(endpoint).await?;
        Ok(Self { inner })
    }

    /// Open a live stream of raw ledger frames starting at `start_sequence`.
    /// Each item is the ledger sequence paired with its decoded
    /// `LedgerCloseMeta`; decoding errors surface per-frame rather than
    /// killing the stream, matching the "decoding error is fatal for the
    /// ledger, not the connection" policy (spec §7).
    pub async fn stream(
        &mut self,
        start_sequence: u32,
    ) -> Result<impl Stream<Item = Result<(u32, LedgerCloseMeta)>> + '_> {
        let request = tonic::Request::new(StreamRequest { start_sequence });
        let stream = self.inner.stream(request).await?.into_inner();
        Ok(async_stream::try_stream! {
            futures::pin_mut!(stream);
            use futures::StreamExt;
            while let Some(frame) = stream.next().await {
                let frame = frame.map_err(Error::from)?;
                let mut limited = Limited::new(Cursor::new(frame.close_meta.as_slice()), Limits::none());
                match LedgerCloseMeta::read_xdr(&mut limited) {
                    Ok(meta) => yield (frame.sequence, meta),
                    Err(e) => Err(Error::Decoding { ledger: Some(frame.sequence), reason: e.to_string() })?,
                }
            }
        })
    }
}
