//! TCP listener

use tokio::net::TcpListener;
use tracing::{debug, error, info};

use ferry_utils::{FerryError, Result};

use crate::handler::handle_client;
use crate::SharedState;

/// Bind the relay's TCP listener
pub async fn bind_listener(addr: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr).await.map_err(|e| FerryError::Bind {
        addr: addr.to_string(),
        source: e,
    })?;
    info!("Starting up on {}", listener.local_addr().map_err(FerryError::Io)?);
    Ok(listener)
}

/// Run the TCP accept loop, one task per connection, until shutdown
pub async fn run_tcp_accept_loop(listener: TcpListener, shared_state: SharedState) {
    let mut shutdown_rx = shared_state.subscribe_shutdown();

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, peer_addr)) => {
                        debug!("New TCP connection from {}", peer_addr);
                        let state_clone = shared_state.clone();
                        tokio::spawn(async move {
                            let (reader, writer) = stream.into_split();
                            handle_client(reader, writer, state_clone).await;
                        });
                    }
                    Err(e) => {
                        error!("TCP accept error: {}", e);
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received, stopping TCP accept loop");
                break;
            }
        }
    }
}
