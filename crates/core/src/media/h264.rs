//! H.264 RTP packetization (RFC 6184).
//!
//! Two packetization modes are used:
//!
//! - **Single NAL Unit** (§5.6): units whose payload (NAL header byte
//!   excluded) fits in [`FRAGMENT_THRESHOLD`] bytes are sent in one RTP
//!   packet, NAL header byte first.
//!
//! - **FU-A fragmentation** (§5.8): larger units are split across multiple
//!   RTP packets. Each fragment carries a 2-byte FU header before its
//!   chunk of the payload:
//!
//!   ```text
//!   FU indicator:  [F|NRI|Type=28]     (1 byte)
//!   FU header:     [S|E|R|NAL_Type]    (1 byte)
//!   Fragment data: [...]               (up to FRAGMENT_THRESHOLD bytes)
//!   ```
//!
//!   - **S** (start): set on the first fragment only
//!   - **E** (end): set on the last fragment only
//!   - **NAL_Type**: the original NAL unit type from the NAL header byte
//!
//! Every fragment of one unit carries the same RTP timestamp; timestamps
//! change only across distinct units. The marker bit is never set.

use crate::media::rtp::RtpHeader;

/// Maximum unit payload (NAL header byte excluded) sent as a single
/// packet; also the maximum FU-A fragment size.
pub const FRAGMENT_THRESHOLD: usize = 1024;

/// FU-A NAL unit type (RFC 6184 §5.4).
const FU_A_TYPE: u8 = 28;

/// Packetize one NAL unit into framed RTP packets.
///
/// `unit` starts with its one-byte NAL header. Each returned `Vec<u8>` is
/// a complete RTP packet: 12-byte header followed by the payload. Every
/// packet consumes exactly one sequence number from `header`; all packets
/// carry `timestamp`. An empty unit produces no packets.
pub fn packetize(header: &mut RtpHeader, unit: &[u8], timestamp: u32) -> Vec<Vec<u8>> {
    let mut packets = Vec::new();

    if unit.is_empty() {
        return packets;
    }

    let nal_header = unit[0];
    let payload = &unit[1..];

    if payload.len() <= FRAGMENT_THRESHOLD {
        // Single NAL Unit mode (RFC 6184 §5.6)
        let hdr = header.write(false, timestamp);
        let mut packet = Vec::with_capacity(12 + unit.len());
        packet.extend_from_slice(&hdr);
        packet.extend_from_slice(unit);
        packets.push(packet);
    } else {
        // FU-A fragmentation (RFC 6184 §5.8)
        let nal_type = nal_header & 0x1f;
        let nri = nal_header & 0x60;

        // FU indicator: NRI from original NAL, type = 28 (FU-A)
        let fu_indicator = nri | FU_A_TYPE;

        let mut offset = 0usize;
        let mut first = true;

        while offset < payload.len() {
            let remaining = payload.len() - offset;
            let last_fragment = remaining <= FRAGMENT_THRESHOLD;
            let chunk_size = FRAGMENT_THRESHOLD.min(remaining);
            let chunk = &payload[offset..offset + chunk_size];

            // A payload at or below the threshold never enters this loop,
            // so no fragment can be both first and last.
            assert!(
                !(first && last_fragment),
                "FU-A fragment with both start and end flags"
            );

            // FU header: S=start, E=end, R=0, Type=original NAL type
            let start_bit = if first { 0x80 } else { 0x00 };
            let end_bit = if last_fragment { 0x40 } else { 0x00 };
            let fu_header = start_bit | end_bit | nal_type;

            let hdr = header.write(false, timestamp);
            let mut packet = Vec::with_capacity(12 + 2 + chunk.len());
            packet.extend_from_slice(&hdr);
            packet.push(fu_indicator);
            packet.push(fu_header);
            packet.extend_from_slice(chunk);
            packets.push(packet);

            offset += chunk_size;
            first = false;
        }

        tracing::trace!(
            nal_type,
            unit_size = unit.len(),
            fragments = packets.len(),
            "FU-A fragmented NAL unit"
        );
    }

    packets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_header() -> RtpHeader {
        RtpHeader::new(96, 0xAABBCCDD)
    }

    fn seq_of(packet: &[u8]) -> u16 {
        u16::from_be_bytes([packet[2], packet[3]])
    }

    fn ts_of(packet: &[u8]) -> u32 {
        u32::from_be_bytes([packet[4], packet[5], packet[6], packet[7]])
    }

    #[test]
    fn small_unit_single_packet() {
        let mut h = make_header();
        let unit = vec![0x65, 0xAA, 0xBB, 0xCC];
        let packets = packetize(&mut h, &unit, 1234);
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].len(), 12 + 4);
        // Payload starts with the original NAL header byte.
        assert_eq!(packets[0][12], 0x65);
        assert_eq!(&packets[0][12..], &unit[..]);
        assert_eq!(ts_of(&packets[0]), 1234);
        // Marker bit unset.
        assert_eq!(packets[0][1] & 0x80, 0);
    }

    #[test]
    fn payload_at_threshold_stays_single() {
        let mut h = make_header();
        let mut unit = vec![0x65];
        unit.extend(vec![0xAA; FRAGMENT_THRESHOLD]);
        let packets = packetize(&mut h, &unit, 0);
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0][12], 0x65);
    }

    #[test]
    fn payload_just_over_threshold_fragments() {
        let mut h = make_header();
        let mut unit = vec![0x65];
        unit.extend(vec![0xAA; FRAGMENT_THRESHOLD + 1]);
        let packets = packetize(&mut h, &unit, 0);
        assert_eq!(packets.len(), 2);

        // First: start bit, no end bit.
        assert_eq!(packets[0][13] & 0x80, 0x80);
        assert_eq!(packets[0][13] & 0x40, 0);
        // Last: end bit, no start bit — and a single trailing byte.
        assert_eq!(packets[1][13] & 0x40, 0x40);
        assert_eq!(packets[1][13] & 0x80, 0);
        assert_eq!(packets[1].len(), 12 + 2 + 1);
    }

    #[test]
    fn fragment_count_is_payload_ceil_div_threshold() {
        for payload_len in [1025, 2048, 2049, 5000] {
            let mut h = make_header();
            let mut unit = vec![0x65];
            unit.extend(vec![0x11; payload_len]);
            let packets = packetize(&mut h, &unit, 0);
            let expected = payload_len.div_ceil(FRAGMENT_THRESHOLD);
            assert_eq!(packets.len(), expected, "payload {payload_len}");
        }
    }

    #[test]
    fn fu_indicator_and_type_bits() {
        let mut h = make_header();
        // NAL header 0x65: forbidden=0, nri=3, type=5 (IDR slice).
        let mut unit = vec![0x65];
        unit.extend(vec![0x22; FRAGMENT_THRESHOLD * 2]);
        let packets = packetize(&mut h, &unit, 0);

        for p in &packets {
            // FU indicator: original NRI bits, type 28.
            assert_eq!(p[12], 0x60 | 28);
            // FU header carries the original NAL type.
            assert_eq!(p[13] & 0x1f, 5);
            // Marker bit never set.
            assert_eq!(p[1] & 0x80, 0);
        }

        // Middle fragments carry neither S nor E.
        for p in &packets[1..packets.len() - 1] {
            assert_eq!(p[13] & 0xc0, 0);
        }
    }

    #[test]
    fn fragments_reassemble_to_original_payload() {
        let mut h = make_header();
        let payload: Vec<u8> = (0..2500u32).map(|i| (i % 256) as u8).collect();
        let mut unit = vec![0x41];
        unit.extend_from_slice(&payload);

        let packets = packetize(&mut h, &unit, 0);
        let mut reassembled = Vec::new();
        for p in &packets {
            reassembled.extend_from_slice(&p[14..]);
        }
        assert_eq!(reassembled, payload);
    }

    #[test]
    fn every_packet_consumes_one_sequence_number() {
        let mut h = make_header();
        let mut unit = vec![0x65];
        unit.extend(vec![0x33; 3000]);
        let packets = packetize(&mut h, &unit, 0);
        assert!(packets.len() > 1);

        let first = seq_of(&packets[0]);
        for (i, p) in packets.iter().enumerate() {
            assert_eq!(seq_of(p), first.wrapping_add(i as u16));
        }
        assert_eq!(h.sequence(), first.wrapping_add(packets.len() as u16));
    }

    #[test]
    fn fragments_share_one_timestamp() {
        let mut h = make_header();
        let mut unit = vec![0x65];
        unit.extend(vec![0x44; 4000]);
        let packets = packetize(&mut h, &unit, 777_777);
        for p in &packets {
            assert_eq!(ts_of(p), 777_777);
        }
    }

    #[test]
    fn sequence_continues_across_units() {
        let mut h = make_header();
        packetize(&mut h, &[0x65, 0x01], 0);
        let packets = packetize(&mut h, &[0x41, 0x02], 10);
        assert_eq!(seq_of(&packets[0]), 1);
    }

    #[test]
    fn empty_unit_no_packets() {
        let mut h = make_header();
        assert!(packetize(&mut h, &[], 0).is_empty());
        assert_eq!(h.sequence(), 0);
    }
}
