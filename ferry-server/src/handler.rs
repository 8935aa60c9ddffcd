//! Per-connection protocol handler
//!
//! Each accepted connection runs [`handle_client`]: read the join frame,
//! register the display name, then classify every control frame and
//! dispatch it to the router or the file relay until the connection closes.

use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use ferry_protocol::{parse_display_name, CodecError, ControlCodec, Inbound};

use crate::clock::Clock;
use crate::config::AppConfig;
use crate::connection::{spawn_writer, InboundStream};
use crate::registry::{ConnectionHandle, ConnectionRegistry};
use crate::SharedState;

/// Why a connection left the listening state
#[derive(Debug)]
pub enum CloseReason {
    /// Peer closed its write half
    Eof,
    /// Reading from the peer failed
    Error(std::io::Error),
    /// Closed by the server (sibling cleanup or a failed write)
    Forced,
}

/// Everything a handler needs to route one connection's traffic
pub struct HandlerContext {
    pub registry: Arc<ConnectionRegistry>,
    pub config: Arc<AppConfig>,
    pub clock: Arc<dyn Clock>,
    /// The connection this handler owns
    pub connection: ConnectionHandle,
}

impl HandlerContext {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        config: Arc<AppConfig>,
        clock: Arc<dyn Clock>,
        connection: ConnectionHandle,
    ) -> Self {
        Self {
            registry,
            config,
            clock,
            connection,
        }
    }

    /// Display name of the owned connection
    pub fn name(&self) -> &str {
        self.connection.name()
    }

    /// Frame outbound text for the configured framing mode
    pub fn frame_text(&self, text: &str) -> Bytes {
        self.config.protocol.framing.frame(text)
    }

    /// Read and dispatch control frames until the connection closes
    pub async fn listen<R>(&self, inbound: &mut InboundStream<R>) -> CloseReason
    where
        R: AsyncRead + Unpin,
    {
        loop {
            let frame = tokio::select! {
                biased;
                _ = self.connection.closed() => return CloseReason::Forced,
                frame = inbound.next_frame() => frame,
            };

            match frame {
                Ok(Some(frame)) => self.dispatch(&frame, inbound).await,
                Ok(None) => return CloseReason::Eof,
                Err(CodecError::FrameTooLong { max }) => {
                    warn!("Dropping control frame from {} longer than {} bytes", self.name(), max);
                }
                Err(CodecError::Io(e)) => return CloseReason::Error(e),
            }
        }
    }

    /// Route one control frame
    async fn dispatch<R>(&self, frame: &[u8], inbound: &mut InboundStream<R>)
    where
        R: AsyncRead + Unpin,
    {
        if frame.is_empty() {
            return;
        }

        match Inbound::classify(frame) {
            Ok(Inbound::Broadcast(text)) => {
                self.handle_broadcast(&text).await;
            }
            Ok(Inbound::Private { recipient, body }) => {
                self.handle_private(&recipient, &body).await;
            }
            Ok(Inbound::FileForward(transfer)) => {
                if let Err(e) = self.handle_file_forward(inbound, &transfer).await {
                    error!("Error forwarding file {} from {}: {}", transfer.file_name, self.name(), e);
                }
            }
            Err(e) => {
                warn!("Dropping malformed message from {}: {}", self.name(), e);
            }
        }
    }
}

/// Run the full lifecycle of one client connection
pub async fn handle_client<R, W>(reader: R, mut writer: W, state: SharedState)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let protocol = &state.config.protocol;
    let mut inbound = InboundStream::new(
        reader,
        ControlCodec::new(protocol.framing, protocol.name_max_bytes),
    );

    let name = match inbound.next_frame().await {
        Ok(Some(frame)) => match parse_display_name(&frame) {
            Ok(name) => name,
            Err(e) => {
                warn!("Rejecting connection with invalid display name: {}", e);
                shutdown_quietly(&mut writer).await;
                return;
            }
        },
        Ok(None) => {
            debug!("Connection closed before sending a display name");
            return;
        }
        Err(e) => {
            warn!("Failed to read display name: {}", e);
            shutdown_quietly(&mut writer).await;
            return;
        }
    };

    let (outbound_tx, outbound_rx) = mpsc::channel(state.config.server.outbound_queue);
    let close = CancellationToken::new();
    let connection = match state.registry.register(&name, outbound_tx, close.clone()) {
        Ok(connection) => connection,
        Err(e) => {
            warn!("Rejecting connection: {}", e);
            shutdown_quietly(&mut writer).await;
            return;
        }
    };

    let writer_task = spawn_writer(
        writer,
        outbound_rx,
        close.clone(),
        format!("{} ({})", name, connection.id()),
    );
    info!("{} joined the room ({})", name, connection.id());
    debug!("Connected: {:?}", state.registry.all());

    let ctx = HandlerContext::new(
        Arc::clone(&state.registry),
        Arc::clone(&state.config),
        Arc::clone(&state.clock),
        connection,
    );

    inbound.set_frame_limit(protocol.control_max_bytes);
    let reason = ctx.listen(&mut inbound).await;
    ctx.handle_disconnect(&reason);

    close.cancel();
    if let Err(e) = writer_task.await {
        debug!("Writer task for {} ended abnormally: {}", name, e);
    }
}

async fn shutdown_quietly<W: AsyncWrite + Unpin>(writer: &mut W) {
    if let Err(e) = writer.shutdown().await {
        debug!("Shutdown of rejected connection failed: {}", e);
    }
}
