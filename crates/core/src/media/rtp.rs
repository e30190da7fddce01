use std::time::Duration;

use rand::RngExt;

/// Nanoseconds per RTP clock tick used by [`media_timestamp`].
///
/// The session clock runs at roughly 90 kHz (RFC 3551 §4 for video):
/// elapsed nanoseconds are divided by 11111, i.e. microsecond granularity
/// scaled toward a 90 kHz tick. The precision loss is intentional and
/// bounded.
const NANOS_PER_TICK: u128 = 11_111;

/// Generic RTP fixed header builder (RFC 3550 §5.1).
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|  CC   |M|     PT      |       Sequence Number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           Timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             SSRC                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// One instance lives inside each session. It owns:
/// - **Sequence number**: 16-bit, wrapping — every [`write`](Self::write)
///   consumes exactly one, so packets of one session are gap-free.
/// - **SSRC**: randomly generated per RFC 3550 §8.1 to avoid collisions.
///
/// The timestamp is not stored here: it is the session-relative elapsed
/// clock, computed per coded unit and passed to [`write`](Self::write)
/// (fragments of one unit all carry the same value).
///
/// Version is always 2. Padding, extension, and CSRC count are always 0.
#[derive(Debug)]
pub struct RtpHeader {
    /// RTP payload type (7-bit, RFC 3551).
    pub pt: u8,
    /// Synchronization source identifier (RFC 3550 §8.1).
    pub ssrc: u32,
    sequence: u16,
}

impl RtpHeader {
    /// Create a new RTP header state with explicit SSRC.
    pub fn new(pt: u8, ssrc: u32) -> Self {
        tracing::debug!(
            pt,
            ssrc = format_args!("{:#010X}", ssrc),
            "RTP header state created"
        );
        Self {
            pt,
            ssrc,
            sequence: 0,
        }
    }

    /// Create with a random SSRC.
    ///
    /// Per RFC 3550 §8.1, the SSRC should be chosen randomly to minimize
    /// the probability of collisions between independent sessions.
    pub fn with_random_ssrc(pt: u8) -> Self {
        let ssrc = rand::rng().random::<u32>();
        Self::new(pt, ssrc)
    }

    /// Current sequence number (before the next [`write`](Self::write) call).
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    /// Serialize a 12-byte RTP fixed header and advance the sequence number.
    ///
    /// The marker bit is carried through for completeness; this server's
    /// packetizer leaves it unset on every packet.
    pub fn write(&mut self, marker: bool, timestamp: u32) -> [u8; 12] {
        let first_byte: u8 = 2 << 6;
        let second_byte: u8 = ((marker as u8) << 7) | self.pt;

        let mut header = [0u8; 12];
        header[0] = first_byte;
        header[1] = second_byte;
        header[2..4].copy_from_slice(&self.sequence.to_be_bytes());
        header[4..8].copy_from_slice(&timestamp.to_be_bytes());
        header[8..12].copy_from_slice(&self.ssrc.to_be_bytes());

        self.sequence = self.sequence.wrapping_add(1);
        header
    }
}

/// Convert session-relative elapsed time to an RTP timestamp.
///
/// Wraps modulo 2^32 like any RTP timestamp.
pub fn media_timestamp(elapsed: Duration) -> u32 {
    (elapsed.as_nanos() / NANOS_PER_TICK) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_header() -> RtpHeader {
        RtpHeader::new(96, 0xAABBCCDD)
    }

    #[test]
    fn version_is_2() {
        let mut h = make_header();
        let buf = h.write(false, 0);
        assert_eq!(buf[0] >> 6, 2);
    }

    #[test]
    fn padding_extension_csrc_are_zero() {
        let mut h = make_header();
        let buf = h.write(false, 0);
        assert_eq!(buf[0] & 0x3f, 0);
    }

    #[test]
    fn marker_bit() {
        let mut h = make_header();
        let no_marker = h.write(false, 0);
        assert_eq!(no_marker[1] & 0x80, 0);

        let with_marker = h.write(true, 0);
        assert_eq!(with_marker[1] & 0x80, 0x80);
    }

    #[test]
    fn payload_type() {
        let mut h = make_header();
        let buf = h.write(false, 0);
        assert_eq!(buf[1] & 0x7f, 96);
    }

    #[test]
    fn sequence_increments() {
        let mut h = make_header();
        let b1 = h.write(false, 0);
        let seq1 = u16::from_be_bytes([b1[2], b1[3]]);
        let b2 = h.write(false, 0);
        let seq2 = u16::from_be_bytes([b2[2], b2[3]]);
        assert_eq!(seq2, seq1 + 1);
    }

    #[test]
    fn sequence_wraps() {
        let mut h = make_header();
        h.sequence = u16::MAX;
        let buf = h.write(false, 0);
        let seq = u16::from_be_bytes([buf[2], buf[3]]);
        assert_eq!(seq, u16::MAX);
        assert_eq!(h.sequence(), 0);
    }

    #[test]
    fn timestamp_written_from_argument() {
        let mut h = make_header();
        let buf = h.write(false, 0xDEADBEEF);
        let ts = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        assert_eq!(ts, 0xDEADBEEF);
    }

    #[test]
    fn ssrc_written() {
        let mut h = make_header();
        let buf = h.write(false, 0);
        let ssrc = u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]);
        assert_eq!(ssrc, 0xAABBCCDD);
    }

    #[test]
    fn random_ssrc_differs() {
        let h1 = RtpHeader::with_random_ssrc(96);
        let h2 = RtpHeader::with_random_ssrc(96);
        assert_ne!(h1.ssrc, h2.ssrc);
    }

    #[test]
    fn media_timestamp_conversion() {
        assert_eq!(media_timestamp(Duration::ZERO), 0);
        // 1 second = 1e9 ns / 11111 = 90000 ticks (truncated).
        assert_eq!(media_timestamp(Duration::from_secs(1)), 90_000);
        // Sub-tick elapsed truncates to zero.
        assert_eq!(media_timestamp(Duration::from_nanos(11_110)), 0);
        assert_eq!(media_timestamp(Duration::from_nanos(11_111)), 1);
    }
}
