//! Per-connection transport halves
//!
//! The read half is wrapped in an [`InboundStream`], which yields control
//! frames through [`ControlCodec`] and raw payload bytes for file relays from
//! the same buffer. The write half is driven by a writer task draining the
//! connection's outbound queue.

use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::Decoder;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use ferry_protocol::{CodecError, ControlCodec};

/// Buffered reader over one connection's inbound bytes
pub struct InboundStream<R> {
    reader: R,
    buffer: BytesMut,
    codec: ControlCodec,
}

impl<R: AsyncRead + Unpin> InboundStream<R> {
    pub fn new(reader: R, codec: ControlCodec) -> Self {
        Self {
            reader,
            buffer: BytesMut::new(),
            codec,
        }
    }

    /// Change the control frame limit
    pub fn set_frame_limit(&mut self, max_len: usize) {
        self.codec.set_max_len(max_len);
    }

    /// Read the next control frame
    ///
    /// Returns `Ok(None)` at end of stream. [`CodecError::FrameTooLong`] leaves
    /// the stream usable; the oversized frame is dropped.
    pub async fn next_frame(&mut self) -> Result<Option<BytesMut>, CodecError> {
        loop {
            if let Some(frame) = self.codec.decode(&mut self.buffer)? {
                return Ok(Some(frame));
            }

            let read_size = self.codec.read_size();
            if self.fill(read_size).await? == 0 {
                return self.codec.decode_eof(&mut self.buffer);
            }
        }
    }

    /// Read up to `max` raw bytes, serving buffered bytes first
    ///
    /// An empty result means end of stream.
    pub async fn read_raw(&mut self, max: usize) -> std::io::Result<Bytes> {
        if self.buffer.is_empty() {
            self.fill(max).await?;
        }
        let len = self.buffer.len().min(max);
        Ok(self.buffer.split_to(len).freeze())
    }

    /// Bytes read from the transport but not yet consumed
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    async fn fill(&mut self, max: usize) -> std::io::Result<usize> {
        self.buffer.reserve(max);
        let mut limited = (&mut self.buffer).limit(max);
        self.reader.read_buf(&mut limited).await
    }
}

/// Upper bound on flushing the queue once a connection is closing
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Spawn the task that writes queued bytes to the connection
///
/// The task stops when `close` fires or every sender is dropped, then shuts
/// down the write half. Bytes already queued when `close` fires are still
/// written, for at most [`DRAIN_TIMEOUT`]. A failed write fires `close` so
/// the owning handler runs its disconnection path.
pub fn spawn_writer<W>(
    mut writer: W,
    mut outbound: mpsc::Receiver<Bytes>,
    close: CancellationToken,
    label: String,
) -> JoinHandle<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = close.cancelled() => {
                    outbound.close();
                    let drain = drain_queue(&mut writer, &mut outbound);
                    match tokio::time::timeout(DRAIN_TIMEOUT, drain).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => debug!("Dropping queued bytes for {}: {}", label, e),
                        Err(_) => debug!("Timed out flushing queued bytes for {}", label),
                    }
                    break;
                }
                data = outbound.recv() => {
                    let Some(data) = data else { break };
                    if let Err(e) = write_frame(&mut writer, &data).await {
                        warn!("Write to {} failed: {}", label, e);
                        close.cancel();
                        break;
                    }
                }
            }
        }

        if let Err(e) = writer.shutdown().await {
            debug!("Shutdown of {} write half failed: {}", label, e);
        }
    })
}

async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, data: &[u8]) -> std::io::Result<()> {
    writer.write_all(data).await?;
    writer.flush().await
}

/// Write whatever is left in a closed queue
async fn drain_queue<W: AsyncWrite + Unpin>(
    writer: &mut W,
    outbound: &mut mpsc::Receiver<Bytes>,
) -> std::io::Result<()> {
    while let Some(data) = outbound.recv().await {
        write_frame(writer, &data).await?;
    }
    Ok(())
}
