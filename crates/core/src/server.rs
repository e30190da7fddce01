use std::io::Read;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crate::error::{Result, RtspError};
use crate::session::SessionRegistry;
use crate::transport::tcp;

/// Opens a fresh media source for a PLAY request.
///
/// The media source is supplied by the embedding application — typically
/// standard input or a file. Invoked once per PLAY, since each producer
/// consumes its source to exhaustion.
pub type SourceFactory = Arc<dyn Fn() -> std::io::Result<Box<dyn Read + Send>> + Send + Sync>;

/// Server-level configuration used by protocol handlers.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Public host advertised in SDP `o=` and `c=` lines.
    /// When `None`, host is inferred from request URI/client address.
    pub public_host: Option<String>,
    /// RTP payload type for the H.264 stream (dynamic range, RFC 3551).
    pub payload_type: u8,
    /// SDP origin username field (`o=<username> ...`).
    pub sdp_username: String,
    /// SDP origin session id field (`o=... <session-id> ...`).
    pub sdp_session_id: String,
    /// SDP origin session version field (`o=... ... <session-version> ...`).
    pub sdp_session_version: String,
    /// SDP session name (`s=`).
    pub sdp_session_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            public_host: None,
            payload_type: 96,
            sdp_username: "-".to_string(),
            sdp_session_id: "0".to_string(),
            sdp_session_version: "0".to_string(),
            sdp_session_name: "Stream".to_string(),
        }
    }
}

/// High-level RTSP server orchestrator.
///
/// Owns the session registry and the media source factory. Delegates TCP
/// connection handling to [`tcp::accept_loop`]; per-session RTP delivery
/// happens inside the producer threads the registry spawns on PLAY.
pub struct Server {
    registry: SessionRegistry,
    running: Arc<AtomicBool>,
    bind_addr: String,
    local_addr: Option<SocketAddr>,
    source_factory: SourceFactory,
    config: Arc<ServerConfig>,
}

impl Server {
    /// Create a server streaming from standard input.
    pub fn new(bind_addr: &str) -> Self {
        Self::with_source(
            bind_addr,
            Arc::new(|| Ok(Box::new(std::io::stdin()) as Box<dyn Read + Send>)),
        )
    }

    /// Create a server with a custom media source factory.
    pub fn with_source(bind_addr: &str, source_factory: SourceFactory) -> Self {
        Self::with_source_and_config(bind_addr, source_factory, ServerConfig::default())
    }

    /// Create a server with a custom media source and protocol/SDP
    /// configuration.
    pub fn with_source_and_config(
        bind_addr: &str,
        source_factory: SourceFactory,
        config: ServerConfig,
    ) -> Self {
        Self {
            registry: SessionRegistry::new(),
            running: Arc::new(AtomicBool::new(false)),
            bind_addr: bind_addr.to_string(),
            local_addr: None,
            source_factory,
            config: Arc::new(config),
        }
    }

    pub fn start(&mut self) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(RtspError::AlreadyRunning);
        }

        let listener = TcpListener::bind(&self.bind_addr)?;
        listener.set_nonblocking(true)?;
        self.local_addr = Some(listener.local_addr()?);

        self.running.store(true, Ordering::SeqCst);

        let running = self.running.clone();
        let registry = self.registry.clone();
        let config = self.config.clone();
        let source_factory = self.source_factory.clone();

        tracing::info!(addr = %self.bind_addr, "RTSP server listening");

        thread::spawn(move || {
            tcp::accept_loop(listener, registry, config, source_factory, running);
        });

        Ok(())
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        tracing::info!("server stopping");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Actual bound address once started (useful with a `:0` bind address).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Returns the server's protocol configuration.
    pub fn config(&self) -> Arc<ServerConfig> {
        self.config.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_twice_fails() {
        let mut server = Server::new("127.0.0.1:0");
        server.start().unwrap();
        assert!(matches!(server.start(), Err(RtspError::AlreadyRunning)));
        server.stop();
        assert!(!server.is_running());
    }

    #[test]
    fn local_addr_reports_bound_port() {
        let mut server = Server::new("127.0.0.1:0");
        assert!(server.local_addr().is_none());
        server.start().unwrap();
        assert!(server.local_addr().unwrap().port() != 0);
        server.stop();
    }
}
