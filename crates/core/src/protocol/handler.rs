use std::net::SocketAddr;
use std::sync::Arc;

use crate::error::RtspError;
use crate::protocol::request::RtspRequest;
use crate::protocol::response::RtspResponse;
use crate::protocol::sdp;
use crate::server::{ServerConfig, SourceFactory};
use crate::session::SessionRegistry;

/// Handles RTSP method requests for a single TCP connection.
///
/// Pure request -> response mapping: all session state lives in the shared
/// [`SessionRegistry`]. Sessions deliberately outlive the connection that
/// created them — playback is decoupled from the control channel, and only
/// TEARDOWN ends it.
pub struct MethodHandler {
    registry: SessionRegistry,
    client_addr: SocketAddr,
    config: Arc<ServerConfig>,
    source_factory: SourceFactory,
}

impl MethodHandler {
    pub fn new(
        registry: SessionRegistry,
        client_addr: SocketAddr,
        config: Arc<ServerConfig>,
        source_factory: SourceFactory,
    ) -> Self {
        MethodHandler {
            registry,
            client_addr,
            config,
            source_factory,
        }
    }

    pub fn handle(&mut self, request: &RtspRequest) -> RtspResponse {
        let cseq = request.cseq().unwrap_or("0");

        match request.method.as_str() {
            "OPTIONS" => self.handle_options(cseq),
            "DESCRIBE" => self.handle_describe(cseq, &request.uri),
            "SETUP" => self.handle_setup(cseq, request),
            "PLAY" => self.handle_play(cseq, request),
            "TEARDOWN" => self.handle_teardown(cseq, request),
            _ => {
                tracing::warn!(method = %request.method, %cseq, "unsupported RTSP method");
                RtspResponse::new(501, "Not Implemented").add_header("CSeq", cseq)
            }
        }
    }

    fn handle_options(&self, cseq: &str) -> RtspResponse {
        tracing::debug!(%cseq, "OPTIONS");
        RtspResponse::ok()
            .add_header("CSeq", cseq)
            .add_header("Public", "OPTIONS, DESCRIBE, SETUP, PLAY, TEARDOWN")
    }

    /// Parses the host from an RTSP URI (e.g. `rtsp://host:8554/stream` ->
    /// `host`). Falls back to the client's IP if the URI is unusable.
    fn host_from_uri_or_client(&self, uri: &str) -> String {
        if let Some(host) = &self.config.public_host {
            return host.clone();
        }

        if let Some(after_scheme) = uri.strip_prefix("rtsp://") {
            let host = after_scheme
                .split('/')
                .next()
                .and_then(|host_port| host_port.split(':').next())
                .unwrap_or("")
                .trim();
            if !host.is_empty() {
                return host.to_string();
            }
        }
        self.client_addr.ip().to_string()
    }

    fn handle_describe(&self, cseq: &str, uri: &str) -> RtspResponse {
        tracing::debug!(%cseq, uri, "DESCRIBE");

        let host = self.host_from_uri_or_client(uri);
        let sdp = sdp::generate_sdp(&self.config, &host);

        RtspResponse::ok()
            .add_header("CSeq", cseq)
            .add_header("Content-Type", "application/sdp")
            .add_header("Content-Base", uri)
            .with_body(sdp)
    }

    fn handle_setup(&mut self, cseq: &str, request: &RtspRequest) -> RtspResponse {
        let transport_header = match request.get_header("Transport") {
            Some(t) => t,
            None => {
                tracing::warn!(%cseq, "SETUP missing Transport header");
                return RtspResponse::bad_request().add_header("CSeq", cseq);
            }
        };

        let session = match self.registry.create(
            transport_header,
            self.client_addr.ip(),
            self.config.payload_type,
        ) {
            Ok(session) => session,
            Err(RtspError::InvalidTransport(desc)) => {
                tracing::warn!(%cseq, transport = %desc, "SETUP with unusable Transport header");
                return RtspResponse::bad_request().add_header("CSeq", cseq);
            }
            Err(e) => {
                tracing::error!(%cseq, error = %e, "SETUP failed");
                return RtspResponse::new(500, "Internal Server Error").add_header("CSeq", cseq);
            }
        };

        tracing::info!(
            session_id = %session.id,
            uri = %request.uri,
            client = %self.client_addr,
            server_port = session.server_port(),
            "session created via SETUP"
        );

        RtspResponse::ok()
            .add_header("CSeq", cseq)
            .add_header("Transport", &session.transport_header_value())
            .add_header("Session", &session.id)
    }

    fn handle_play(&mut self, cseq: &str, request: &RtspRequest) -> RtspResponse {
        let session_id = match request.session_id() {
            Some(id) => id.to_string(),
            None => {
                tracing::warn!(%cseq, "PLAY missing Session header");
                return RtspResponse::session_not_found().add_header("CSeq", cseq);
            }
        };

        // Resolve the session before touching the source factory: opening
        // the media source can block (e.g. a FIFO with no writer), and an
        // unknown session must be rejected without it.
        if self.registry.get(&session_id).is_err() {
            tracing::warn!(session_id, "PLAY for unknown session");
            return RtspResponse::session_not_found().add_header("CSeq", cseq);
        }

        let source = match (self.source_factory)() {
            Ok(source) => source,
            Err(e) => {
                tracing::error!(%cseq, error = %e, "failed to open media source");
                return RtspResponse::new(500, "Internal Server Error").add_header("CSeq", cseq);
            }
        };

        match self.registry.play(&session_id, source) {
            Ok(()) => RtspResponse::ok()
                .add_header("CSeq", cseq)
                .add_header("Session", &session_id),
            Err(RtspError::SessionNotFound(_)) => {
                tracing::warn!(session_id, "PLAY for unknown session");
                RtspResponse::session_not_found().add_header("CSeq", cseq)
            }
            Err(RtspError::SessionAlreadyPlaying(_)) => {
                tracing::warn!(session_id, "PLAY for session already playing");
                RtspResponse::new(455, "Method Not Valid in This State")
                    .add_header("CSeq", cseq)
                    .add_header("Session", &session_id)
            }
            Err(e) => {
                tracing::error!(session_id, error = %e, "PLAY failed");
                RtspResponse::new(500, "Internal Server Error").add_header("CSeq", cseq)
            }
        }
    }

    fn handle_teardown(&mut self, cseq: &str, request: &RtspRequest) -> RtspResponse {
        let session_id = match request.session_id() {
            Some(id) => id.to_string(),
            None => {
                tracing::warn!(%cseq, "TEARDOWN missing Session header");
                return RtspResponse::session_not_found().add_header("CSeq", cseq);
            }
        };

        match self.registry.destroy(&session_id) {
            Ok(()) => {
                tracing::info!(session_id, "session terminated via TEARDOWN");
                RtspResponse::ok()
                    .add_header("CSeq", cseq)
                    .add_header("Session", &session_id)
            }
            Err(_) => {
                tracing::warn!(session_id, "TEARDOWN for unknown session");
                RtspResponse::session_not_found().add_header("CSeq", cseq)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::net::UdpSocket;

    fn make_handler() -> MethodHandler {
        let factory: SourceFactory = Arc::new(|| {
            let stream = vec![0u8, 0, 0, 1, 0x67, 0x42];
            Ok(Box::new(Cursor::new(stream)) as Box<dyn std::io::Read + Send>)
        });
        MethodHandler::new(
            SessionRegistry::new(),
            "127.0.0.1:9999".parse().unwrap(),
            Arc::new(ServerConfig::default()),
            factory,
        )
    }

    fn parse(raw: &str) -> RtspRequest {
        RtspRequest::parse(raw).unwrap()
    }

    #[test]
    fn options_lists_supported_methods() {
        let mut h = make_handler();
        let resp = h.handle(&parse("OPTIONS rtsp://localhost/stream RTSP/1.0\r\nCSeq: 1\r\n\r\n"));
        assert_eq!(resp.status_code, 200);
        let s = resp.serialize();
        assert!(s.contains("CSeq: 1\r\n"));
        assert!(s.contains("Public: OPTIONS, DESCRIBE, SETUP, PLAY, TEARDOWN\r\n"));
    }

    #[test]
    fn describe_returns_sdp() {
        let mut h = make_handler();
        let resp =
            h.handle(&parse("DESCRIBE rtsp://10.1.2.3/stream RTSP/1.0\r\nCSeq: 2\r\n\r\n"));
        assert_eq!(resp.status_code, 200);
        let s = resp.serialize();
        assert!(s.contains("Content-Type: application/sdp\r\n"));
        assert!(s.contains("c=IN IP4 10.1.2.3\r\n"), "host from URI");
        assert!(s.contains("m=video 0 RTP/AVP 96\r\n"));
    }

    #[test]
    fn setup_without_transport_is_bad_request() {
        let mut h = make_handler();
        let resp = h.handle(&parse("SETUP rtsp://localhost/stream RTSP/1.0\r\nCSeq: 3\r\n\r\n"));
        assert_eq!(resp.status_code, 400);
    }

    #[test]
    fn setup_with_malformed_transport_is_bad_request() {
        let mut h = make_handler();
        let resp = h.handle(&parse(
            "SETUP rtsp://localhost/stream RTSP/1.0\r\nCSeq: 3\r\nTransport: RTP/AVP;unicast\r\n\r\n",
        ));
        assert_eq!(resp.status_code, 400);
    }

    #[test]
    fn setup_creates_session_and_echoes_transport() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = receiver.local_addr().unwrap().port();

        let mut h = make_handler();
        let raw = format!(
            "SETUP rtsp://localhost/stream RTSP/1.0\r\nCSeq: 3\r\nTransport: RTP/AVP;unicast;client_port={}-{}\r\n\r\n",
            port,
            port + 1
        );
        let resp = h.handle(&parse(&raw));
        assert_eq!(resp.status_code, 200);
        let s = resp.serialize();
        assert!(s.contains("Session: "));
        assert!(s.contains(&format!("client_port={}-{}", port, port + 1)));
        assert!(s.contains("server_port="));
    }

    #[test]
    fn play_unknown_session_is_454() {
        let mut h = make_handler();
        let resp = h.handle(&parse(
            "PLAY rtsp://localhost/stream RTSP/1.0\r\nCSeq: 4\r\nSession: FFFF\r\n\r\n",
        ));
        assert_eq!(resp.status_code, 454);
    }

    #[test]
    fn play_unknown_session_leaves_source_unopened() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let opened = Arc::new(AtomicBool::new(false));
        let flag = opened.clone();
        let factory: SourceFactory = Arc::new(move || {
            flag.store(true, Ordering::SeqCst);
            Ok(Box::new(Cursor::new(Vec::new())) as Box<dyn std::io::Read + Send>)
        });
        let mut h = MethodHandler::new(
            SessionRegistry::new(),
            "127.0.0.1:9999".parse().unwrap(),
            Arc::new(ServerConfig::default()),
            factory,
        );

        let resp = h.handle(&parse(
            "PLAY rtsp://localhost/stream RTSP/1.0\r\nCSeq: 4\r\nSession: FFFF\r\n\r\n",
        ));
        assert_eq!(resp.status_code, 454);
        assert!(
            !opened.load(Ordering::SeqCst),
            "source must stay closed when the session does not exist"
        );
    }

    #[test]
    fn teardown_unknown_session_is_454() {
        let mut h = make_handler();
        let resp = h.handle(&parse(
            "TEARDOWN rtsp://localhost/stream RTSP/1.0\r\nCSeq: 5\r\nSession: FFFF\r\n\r\n",
        ));
        assert_eq!(resp.status_code, 454);
    }

    #[test]
    fn play_missing_session_header_is_454() {
        let mut h = make_handler();
        let resp = h.handle(&parse("PLAY rtsp://localhost/stream RTSP/1.0\r\nCSeq: 4\r\n\r\n"));
        assert_eq!(resp.status_code, 454);
    }

    #[test]
    fn unsupported_method_is_501() {
        let mut h = make_handler();
        let resp =
            h.handle(&parse("PAUSE rtsp://localhost/stream RTSP/1.0\r\nCSeq: 6\r\n\r\n"));
        assert_eq!(resp.status_code, 501);
    }

    #[test]
    fn second_play_is_455() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = receiver.local_addr().unwrap().port();

        let mut h = make_handler();
        let setup = format!(
            "SETUP rtsp://localhost/stream RTSP/1.0\r\nCSeq: 3\r\nTransport: RTP/AVP;unicast;client_port={}-{}\r\n\r\n",
            port,
            port + 1
        );
        let setup_resp = h.handle(&parse(&setup)).serialize();
        let session_id = setup_resp
            .lines()
            .find(|l| l.starts_with("Session:"))
            .and_then(|l| l.split(':').nth(1))
            .map(|v| v.trim().to_string())
            .unwrap();

        let play = format!(
            "PLAY rtsp://localhost/stream RTSP/1.0\r\nCSeq: 4\r\nSession: {}\r\n\r\n",
            session_id
        );
        assert_eq!(h.handle(&parse(&play)).status_code, 200);
        assert_eq!(h.handle(&parse(&play)).status_code, 455);
    }
}
