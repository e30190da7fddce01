//! Error types for the RTSP streaming library.

use std::fmt;

/// Errors that can occur in the RTSP streaming library.
///
/// Variants map to specific failure modes across the stack:
///
/// - **Protocol**: [`Parse`](Self::Parse) — malformed RTSP messages;
///   [`InvalidTransport`](Self::InvalidTransport) — unusable `Transport` header.
/// - **Transport**: [`Io`](Self::Io) — socket/network/source failures.
/// - **Session**: [`SessionNotFound`](Self::SessionNotFound),
///   [`SessionAlreadyPlaying`](Self::SessionAlreadyPlaying).
/// - **Server**: [`NotStarted`](Self::NotStarted),
///   [`AlreadyRunning`](Self::AlreadyRunning).
/// - **Playback**: [`PlaybackStopped`](Self::PlaybackStopped) — cooperative
///   cancellation, not a real failure.
#[derive(Debug, thiserror::Error)]
pub enum RtspError {
    /// Underlying I/O error, from the control socket, the RTP socket, or
    /// the media source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No session with the given ID exists in the
    /// [`SessionRegistry`](crate::session::SessionRegistry). Also returned
    /// after TEARDOWN — a destroyed ID is indistinguishable from one that
    /// never existed.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// PLAY was issued for a session that already has a live producer.
    #[error("session already playing: {0}")]
    SessionAlreadyPlaying(String),

    /// The `Transport` header could not be parsed into a usable
    /// descriptor (wrong shape, or no parseable `client_port`).
    #[error("invalid transport descriptor: {0}")]
    InvalidTransport(String),

    /// The session's producer was asked to stop (TEARDOWN during playback).
    /// Used to break out of the NAL scan; treated as a graceful end.
    #[error("playback stopped")]
    PlaybackStopped,

    /// [`Server::start`](crate::Server::start) has not been called yet.
    #[error("server not started")]
    NotStarted,

    /// [`Server::start`](crate::Server::start) was called while already running.
    #[error("server already running")]
    AlreadyRunning,

    /// Failed to parse an RTSP request message (RFC 2326 §6).
    #[error("RTSP parse error: {kind}")]
    Parse { kind: ParseErrorKind },
}

/// Specific kind of RTSP parse failure.
#[derive(Debug)]
pub enum ParseErrorKind {
    /// Input was empty (no request line).
    EmptyRequest,
    /// Request line did not have the expected `Method URI Version` format.
    InvalidRequestLine,
    /// A header line did not contain a colon separator.
    InvalidHeader,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyRequest => write!(f, "empty request"),
            Self::InvalidRequestLine => write!(f, "invalid request line"),
            Self::InvalidHeader => write!(f, "invalid header"),
        }
    }
}

/// Convenience alias for `Result<T, RtspError>`.
pub type Result<T> = std::result::Result<T, RtspError>;
