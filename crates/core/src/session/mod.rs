//! RTSP session lifecycle and registry.
//!
//! A session is created by SETUP, starts streaming on PLAY, and is
//! destroyed by TEARDOWN:
//!
//! ```text
//! SETUP    -> Created
//! PLAY     -> Playing   (spawns the producer thread)
//! TEARDOWN -> removed   (terminal; the ID no longer resolves)
//! ```
//!
//! There is no transition out of the destroyed state — TEARDOWN removes
//! the registry entry outright, so a destroyed ID is indistinguishable
//! from one that never existed. Operations on such an ID fail with
//! [`RtspError::SessionNotFound`] instead of silently no-opping.
//!
//! Each session owns its UDP socket, its start instant (the zero point of
//! the RTP clock), and its sequence counter. The counter is monotonic
//! modulo 2^16 for the session's lifetime and is mutated only by
//! packetization.

pub mod transport;

use std::collections::HashMap;
use std::io::Read;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};

use crate::error::{Result, RtspError};
use crate::media::rtp::RtpHeader;
use crate::media::{annexb, h264, rtp};
use crate::transport::udp::RtpSocket;
pub use transport::TransportDescriptor;

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Playback state of a session. Destroyed sessions have no state — they
/// are removed from the registry entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created via SETUP, not yet playing.
    Created,
    /// A producer thread is delivering RTP packets to the client.
    Playing,
}

/// One client's negotiated RTP stream.
///
/// Exclusively owned by the [`SessionRegistry`] from creation; shared with
/// the producer thread via `Arc` while playing. The UDP socket is closed
/// when the last `Arc` drops, which is always after the producer has
/// observed the stop flag — no send can race a closed socket.
#[derive(Debug)]
pub struct Session {
    /// Unique session identifier (16-char hex string).
    pub id: String,
    /// Transport type from the SETUP descriptor, e.g. `RTP/AVP`.
    pub transport_type: String,
    /// Delivery mode from the SETUP descriptor, e.g. `unicast`.
    pub mode: String,
    /// Client's negotiated RTP port.
    pub client_rtp_port: u16,
    /// Client's RTCP port (echoed only; RTCP is not implemented).
    pub client_rtcp_port: u16,
    socket: RtpSocket,
    /// Zero point of this session's RTP clock.
    started: Instant,
    rtp: Mutex<RtpHeader>,
    state: RwLock<SessionState>,
    stop: AtomicBool,
}

impl Session {
    /// Build a session from a parsed transport descriptor: connect a UDP
    /// socket toward the client and assign a unique ID.
    fn connect(
        descriptor: TransportDescriptor,
        client_ip: IpAddr,
        payload_type: u8,
    ) -> Result<Self> {
        let client_addr = SocketAddr::new(client_ip, descriptor.client_rtp_port);
        let socket = RtpSocket::connect(client_addr)?;

        let id = SESSION_COUNTER.fetch_add(1, Ordering::SeqCst);
        Ok(Session {
            id: format!("{:016X}", id),
            transport_type: descriptor.transport_type,
            mode: descriptor.mode,
            client_rtp_port: descriptor.client_rtp_port,
            client_rtcp_port: descriptor.client_rtcp_port,
            socket,
            started: Instant::now(),
            rtp: Mutex::new(RtpHeader::with_random_ssrc(payload_type)),
            state: RwLock::new(SessionState::Created),
            stop: AtomicBool::new(false),
        })
    }

    /// Allocated server-side UDP port (local port of the RTP socket).
    pub fn server_port(&self) -> u16 {
        self.socket.local_port()
    }

    /// Current playback state.
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Next sequence number to be consumed (for observability and tests).
    pub fn sequence(&self) -> u16 {
        self.rtp.lock().sequence()
    }

    /// Transition Created -> Playing. A session has at most one producer;
    /// a second PLAY is rejected.
    fn begin_playing(&self) -> Result<()> {
        let mut state = self.state.write();
        match *state {
            SessionState::Playing => Err(RtspError::SessionAlreadyPlaying(self.id.clone())),
            SessionState::Created => {
                *state = SessionState::Playing;
                tracing::debug!(session_id = %self.id, "state transition Created -> Playing");
                Ok(())
            }
        }
    }

    /// Ask the producer to stop. Checked between unit emissions.
    pub fn signal_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Packetize one NAL unit and send every resulting RTP packet to the
    /// client, in order.
    ///
    /// The unit's timestamp is the session-relative elapsed time on the
    /// ~90 kHz clock; fragments of the unit all carry it. Each packet
    /// consumes one sequence number. The first failed send aborts the
    /// remaining fragments of this unit and propagates.
    pub fn send_unit(&self, unit: &[u8]) -> Result<()> {
        let timestamp = rtp::media_timestamp(self.started.elapsed());
        let packets = {
            let mut header = self.rtp.lock();
            h264::packetize(&mut header, unit, timestamp)
        };

        for packet in &packets {
            self.socket.send(packet)?;
        }

        tracing::trace!(
            session_id = %self.id,
            unit_size = unit.len(),
            rtp_packets = packets.len(),
            timestamp,
            "NAL unit sent"
        );
        Ok(())
    }

    /// `Transport` response header value with resolved ports, e.g.
    /// `RTP/AVP;unicast;client_port=5000-5001;server_port=41000-41001`.
    pub fn transport_header_value(&self) -> String {
        let server_port = self.server_port();
        format!(
            "{};{};client_port={}-{};server_port={}-{}",
            self.transport_type,
            self.mode,
            self.client_rtp_port,
            self.client_rtcp_port,
            server_port,
            server_port.wrapping_add(1)
        )
    }
}

/// Thread-safe registry of active sessions.
///
/// All Create/Play/Destroy operations serialize through one
/// `parking_lot::RwLock`; there is no global mutable session table.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Arc<Session>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a session from a SETUP request.
    ///
    /// Parses the transport descriptor, connects a UDP socket toward
    /// `client_ip` on the negotiated port (the socket's ephemeral local
    /// port becomes the server port), and registers the session in the
    /// Created state.
    pub fn create(
        &self,
        transport_header: &str,
        client_ip: IpAddr,
        payload_type: u8,
    ) -> Result<Arc<Session>> {
        let descriptor = TransportDescriptor::parse(transport_header)?;
        let session = Arc::new(Session::connect(descriptor, client_ip, payload_type)?);

        let mut sessions = self.sessions.write();
        sessions.insert(session.id.clone(), session.clone());

        tracing::info!(
            session_id = %session.id,
            %client_ip,
            client_rtp_port = session.client_rtp_port,
            server_port = session.server_port(),
            total_sessions = sessions.len(),
            "session created"
        );
        Ok(session)
    }

    /// Look up a session by ID. Unknown and destroyed IDs both fail with
    /// [`RtspError::SessionNotFound`].
    pub fn get(&self, id: &str) -> Result<Arc<Session>> {
        self.sessions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| RtspError::SessionNotFound(id.to_string()))
    }

    /// Start playback: transition the session to Playing and spawn its
    /// producer thread over `source`.
    ///
    /// The producer scans the source for NAL units and sends each one via
    /// [`Session::send_unit`], checking the stop flag between units. It
    /// runs until the source ends, a send fails, or the session is
    /// destroyed — independently of the control connection that issued
    /// PLAY. Errors inside the producer stop this session's playback only.
    pub fn play(&self, id: &str, source: Box<dyn Read + Send>) -> Result<()> {
        let session = self.get(id)?;
        session.begin_playing()?;

        tracing::info!(session_id = %session.id, "playback started");

        let sess = session.clone();
        thread::Builder::new()
            .name(format!("rtp-producer-{}", sess.id))
            .spawn(move || {
                let result = annexb::scan(source, |unit| {
                    if sess.stopped() {
                        return Err(RtspError::PlaybackStopped);
                    }
                    sess.send_unit(unit)
                });

                match result {
                    Ok(()) => {
                        tracing::info!(session_id = %sess.id, "media source ended, playback finished")
                    }
                    Err(RtspError::PlaybackStopped) => {
                        tracing::debug!(session_id = %sess.id, "playback stopped by teardown")
                    }
                    Err(e) => {
                        tracing::warn!(session_id = %sess.id, error = %e, "playback aborted")
                    }
                }
            })?;

        Ok(())
    }

    /// Destroy a session: remove it from the registry (the ID no longer
    /// resolves) and signal its producer to stop.
    ///
    /// Safe to call on a session that never played — there is simply no
    /// producer to stop. The UDP socket closes when the last reference
    /// (the producer's, if any) drops.
    pub fn destroy(&self, id: &str) -> Result<()> {
        let session = self
            .sessions
            .write()
            .remove(id)
            .ok_or_else(|| RtspError::SessionNotFound(id.to_string()))?;

        session.signal_stop();
        tracing::info!(session_id = %session.id, "session destroyed");
        Ok(())
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
