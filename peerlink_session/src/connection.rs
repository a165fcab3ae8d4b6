//! Establishing TCP channels between peers

use crate::error::{Result, SessionError};
use peerlink_config::PeerConfig;
use peerlink_network::TcpChannel;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

/// Accepts inbound peer connections
#[derive(Debug)]
pub struct PeerListener {
    listener: TcpListener,
    config: PeerConfig,
}

impl PeerListener {
    /// Validate `config` and bind to its listen address
    pub async fn bind(config: PeerConfig) -> Result<Self> {
        config.validate()?;

        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| SessionError::ConnectionFailed(format!("Failed to bind {}: {}", addr, e)))?;

        info!(addr = %addr, "listening for peers");
        Ok(Self { listener, config })
    }

    /// Actual bound address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| SessionError::ConnectionFailed(e.to_string()))
    }

    /// Wait for the next peer and wrap its stream in a channel
    pub async fn accept(&self) -> Result<(TcpChannel, SocketAddr)> {
        let (stream, peer_addr) = self
            .listener
            .accept()
            .await
            .map_err(|e| SessionError::ConnectionFailed(e.to_string()))?;

        info!(peer = %peer_addr, "peer connected");
        Ok((open_channel(stream, &self.config), peer_addr))
    }
}

/// Connect to the configured remote peer
pub async fn connect(config: &PeerConfig) -> Result<TcpChannel> {
    config.validate()?;

    let remote = config
        .remote_address
        .as_deref()
        .ok_or_else(|| SessionError::ConnectionFailed("No remote address configured".to_string()))?;

    let stream = tokio::time::timeout(config.connect_timeout(), TcpStream::connect(remote))
        .await
        .map_err(|_| SessionError::Timeout("Connection timed out".to_string()))?
        .map_err(|e| SessionError::ConnectionFailed(e.to_string()))?;

    info!(peer = %remote, "connected to peer");
    Ok(open_channel(stream, config))
}

fn open_channel(stream: TcpStream, config: &PeerConfig) -> TcpChannel {
    // Frames are small relative to a round trip; don't let Nagle hold them back
    if let Err(err) = stream.set_nodelay(true) {
        debug!(error = %err, "failed to set TCP_NODELAY");
    }
    TcpChannel::from_tcp_with_config(stream, &config.channel)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback_config() -> PeerConfig {
        PeerConfig::default()
            .with_bind_address("127.0.0.1")
            .with_port(0)
    }

    #[tokio::test]
    async fn test_bind_accept_connect() {
        let listener = PeerListener::bind(loopback_config()).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let config = loopback_config().with_remote_address(addr.to_string());
        let (accepted, connected) = tokio::join!(listener.accept(), connect(&config));

        let (server_side, _) = accepted.unwrap();
        let client_side = connected.unwrap();

        client_side.send("ping").await.unwrap();
        assert_eq!(&server_side.receive().await.unwrap()[..], b"ping");
    }

    #[tokio::test]
    async fn test_connect_without_remote() {
        let result = connect(&loopback_config()).await;
        assert!(matches!(result, Err(SessionError::ConnectionFailed(_))));
    }

    #[tokio::test]
    async fn test_bind_rejects_invalid_config() {
        let config = loopback_config().with_remote_address("no-port");
        let result = PeerListener::bind(config).await;
        assert!(matches!(result, Err(SessionError::Config(_))));
    }
}
