//! ListBlog stream emitter
//!
//! Each enumeration runs on its own task that owns the cursor and feeds a
//! bounded channel read by the transport. The cursor lives in [`emit`]'s frame,
//! so it is released (dropped) exactly once however the enumeration ends:
//! exhausted, engine error, decode error, or the caller going away.

use crate::common::{Error, Result, METRICS};
use crate::engine::Cursor;
use crate::proto::ListBlogResponse;
use crate::service::model::BlogItem;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::Status;

pub type ListBlogItem = std::result::Result<ListBlogResponse, Status>;

/// Spawn the emitter task and return the receiving side as a stream.
///
/// On failure the error is pushed as the final stream item so the caller
/// sees an aborted stream rather than a clean end.
pub fn spawn(cursor: Cursor, buffer: usize) -> ReceiverStream<ListBlogItem> {
    let (tx, rx) = mpsc::channel(buffer.max(1));

    tokio::spawn(async move {
        METRICS.active_streams.inc();
        match emit(cursor, &tx).await {
            Ok(sent) => tracing::debug!(sent, "list stream completed"),
            Err(e) => {
                tracing::warn!(error = %e, "list stream aborted");
                let _ = tx.send(Err(e.to_grpc_status())).await;
            }
        }
        METRICS.active_streams.dec();
    });

    ReceiverStream::new(rx)
}

/// Drive the cursor to completion, sending one message per record.
/// Returns the number of records delivered.
pub async fn emit(mut cursor: Cursor, tx: &mpsc::Sender<ListBlogItem>) -> Result<u64> {
    let mut sent = 0u64;

    loop {
        let next = tokio::select! {
            biased;
            _ = tx.closed() => {
                return Err(Error::StreamDelivery("receiver dropped".into()));
            }
            next = cursor.next() => next,
        };

        let raw = match next {
            Some(raw) => raw?,
            None => break,
        };
        let item: BlogItem = raw.decode().map_err(|e| Error::Decode(e.to_string()))?;

        let msg = ListBlogResponse {
            blog: Some(item.to_proto()),
        };
        tx.send(Ok(msg))
            .await
            .map_err(|_| Error::StreamDelivery("receiver dropped".into()))?;

        sent += 1;
        METRICS.records_streamed.inc();
    }

    Ok(sent)
}
