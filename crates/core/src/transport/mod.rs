//! Network transport layer for RTSP signaling and RTP media delivery.
//!
//! RTSP uses a split transport model:
//!
//! - **TCP** ([`tcp`]): carries RTSP request/response signaling. One TCP
//!   connection per client with a thread per connection; requests on a
//!   connection are handled strictly sequentially (no pipelining).
//!
//! - **UDP** ([`udp`]): carries RTP media packets. Each session owns one
//!   socket connected to its client's negotiated endpoint.
//!
//! Closing a control connection does not stop playback — a session's
//! producer runs until the source ends, a send fails, or TEARDOWN.

pub mod tcp;
pub mod udp;

pub use udp::RtpSocket;
