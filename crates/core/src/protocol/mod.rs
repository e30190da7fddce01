//! RTSP control protocol (RFC 2326).
//!
//! The control plane is text over TCP: requests are parsed into a method,
//! URI, and header map, dispatched to session operations, and answered
//! with HTTP-shaped responses.
//!
//! ```text
//! SETUP rtsp://server/stream RTSP/1.0\r\n
//! CSeq: 3\r\n
//! Transport: RTP/AVP;unicast;client_port=5000-5001\r\n
//! \r\n
//! ```
//!
//! ## Supported methods
//!
//! | Method | Session operation | Purpose |
//! |--------|-------------------|---------|
//! | OPTIONS | none | Capability discovery |
//! | DESCRIBE | none | SDP session description |
//! | SETUP | create | Negotiate UDP transport, allocate a session |
//! | PLAY | play | Start the media producer |
//! | TEARDOWN | destroy | Stop playback and free the session |
//!
//! Everything else answers 501 Not Implemented.

pub mod handler;
pub mod request;
pub mod response;
pub mod sdp;

pub use handler::MethodHandler;
pub use request::RtspRequest;
pub use response::RtspResponse;
