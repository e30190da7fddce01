//! Media-plane engines: NAL extraction and RTP packetization.
//!
//! The media path has three stages, applied per session:
//!
//! 1. [`annexb`] — scans the raw H.264 elementary stream and emits one
//!    complete NAL unit at a time (start codes stripped).
//! 2. [`h264`] — wraps each NAL unit into one or more RTP packets,
//!    fragmenting with FU-A (RFC 6184 §5.8) when the unit payload exceeds
//!    [`h264::FRAGMENT_THRESHOLD`].
//! 3. [`rtp`] — serializes the 12-byte fixed RTP header (RFC 3550 §5.1)
//!    and owns the per-session sequence number and SSRC.
//!
//! Everything here treats NAL payload bytes as opaque: the only H.264
//! fields read are the start codes and the one-byte NAL header needed to
//! build FU-A fragments.

pub mod annexb;
pub mod h264;
pub mod rtp;

pub use annexb::{NalScanner, scan};
pub use rtp::RtpHeader;
