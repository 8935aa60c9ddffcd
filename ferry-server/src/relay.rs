//! File relay
//!
//! Streams the raw payload that follows a `file:` directive from the sender
//! to one recipient, chunk by chunk, without reframing. Relays are
//! best-effort and never retried: an aborted transfer leaves both streams
//! wherever the abort happened.

use tokio::io::AsyncRead;
use tracing::{debug, error, info, warn};

use ferry_protocol::TransferDescriptor;

use crate::connection::InboundStream;
use crate::handler::HandlerContext;

/// Relay failures
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("{0} is not connected")]
    RecipientNotFound(String),

    #[error("{recipient} went away after {forwarded} bytes")]
    RecipientGone { recipient: String, forwarded: u64 },

    #[error("sender connection closed after {forwarded} bytes")]
    SenderClosed { forwarded: u64 },

    #[error("reading file data failed after {forwarded} bytes: {source}")]
    Read {
        forwarded: u64,
        #[source]
        source: std::io::Error,
    },
}

/// Result of a relay that ran to the end of its loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOutcome {
    pub forwarded: u64,
    pub expected: u64,
}

impl TransferOutcome {
    /// False when the sender's stream ended before `expected` bytes
    pub fn is_complete(&self) -> bool {
        self.forwarded >= self.expected
    }
}

/// Integer percentage of `forwarded` out of `total`, capped at 100
pub fn transfer_progress(forwarded: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = (u128::from(forwarded) * 100 / u128::from(total)).min(100);
    percent as u8
}

impl HandlerContext {
    /// Forward `transfer.byte_count` raw bytes from `inbound` to the recipient
    ///
    /// The recipient first receives the directive line as a notice, then the
    /// payload. Never forwards more than `byte_count` bytes.
    pub async fn handle_file_forward<R>(
        &self,
        inbound: &mut InboundStream<R>,
        transfer: &TransferDescriptor,
    ) -> Result<TransferOutcome, RelayError>
    where
        R: AsyncRead + Unpin,
    {
        let Some(recipient) = self.registry.find_by_name(&transfer.recipient) else {
            error!(
                "Cannot forward {} from {}: {} is not connected",
                transfer.file_name,
                self.name(),
                transfer.recipient
            );
            return Err(RelayError::RecipientNotFound(transfer.recipient.clone()));
        };

        let notice = self.frame_text(&transfer.to_string());
        if !self.deliver(&recipient, notice).await {
            return Err(RelayError::RecipientGone {
                recipient: transfer.recipient.clone(),
                forwarded: 0,
            });
        }

        let chunk_size = self.config.protocol.file_chunk_bytes;
        let mut forwarded: u64 = 0;
        debug!(
            "Forwarding {} bytes of {} from {} to {} ({} already buffered)",
            transfer.byte_count,
            transfer.file_name,
            self.name(),
            transfer.recipient,
            inbound.buffered()
        );

        while forwarded < transfer.byte_count {
            let remaining = transfer.byte_count - forwarded;
            let want = usize::try_from(remaining).unwrap_or(usize::MAX).min(chunk_size);

            let chunk = tokio::select! {
                biased;
                _ = self.connection.closed() => {
                    return Err(RelayError::SenderClosed { forwarded });
                }
                read = inbound.read_raw(want) => {
                    read.map_err(|source| RelayError::Read { forwarded, source })?
                }
            };
            if chunk.is_empty() {
                break;
            }

            forwarded += chunk.len() as u64;
            if !self.deliver(&recipient, chunk).await {
                return Err(RelayError::RecipientGone {
                    recipient: transfer.recipient.clone(),
                    forwarded,
                });
            }

            debug!(
                "File forwarding to {}: {}%",
                transfer.recipient,
                transfer_progress(forwarded, transfer.byte_count)
            );
        }

        let outcome = TransferOutcome {
            forwarded,
            expected: transfer.byte_count,
        };
        if outcome.is_complete() {
            info!(
                "File {} forwarded from {} to {} ({} bytes)",
                transfer.file_name,
                self.name(),
                transfer.recipient,
                forwarded
            );
        } else {
            warn!(
                "File {} from {} truncated: {}/{} bytes forwarded to {}",
                transfer.file_name,
                self.name(),
                forwarded,
                transfer.byte_count,
                transfer.recipient
            );
        }

        Ok(outcome)
    }
}
