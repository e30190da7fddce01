//! SDP (Session Description Protocol) generation (RFC 4566 / RFC 8866).
//!
//! Produces the SDP body returned by DESCRIBE responses:
//!
//! ```text
//! v=0                                          ← protocol version
//! o=<user> <sess-id> <sess-ver> IN IP4 <addr>  ← origin
//! s=<session-name>                             ← session name
//! c=IN IP4 <addr>                              ← connection address
//! t=0 0                                        ← timing (live stream)
//! a=tool:rtspipe                               ← server software
//! a=sendonly                                   ← direction
//! m=video 0 RTP/AVP 96                         ← media description
//! a=rtpmap:96 H264/90000                       ← codec/clock rate
//! a=fmtp:96 packetization-mode=1               ← codec parameters
//! ```
//!
//! The codec parameters are static: packetization-mode=1 matches the
//! single-NAL/FU-A wire format the packetizer produces, and the clock
//! rate is the 90 kHz video clock. All session/origin fields come from
//! [`ServerConfig`](crate::ServerConfig).

use crate::server::ServerConfig;

/// Generate the SDP session description for the server's stream.
pub fn generate_sdp(config: &ServerConfig, host: &str) -> String {
    let pt = config.payload_type;
    let mut sdp: Vec<String> = Vec::new();

    sdp.push("v=0".to_string());
    sdp.push(format!(
        "o={} {} {} IN IP4 {}",
        config.sdp_username, config.sdp_session_id, config.sdp_session_version, host
    ));
    sdp.push(format!("s={}", config.sdp_session_name));
    sdp.push(format!("c=IN IP4 {}", host));
    sdp.push("t=0 0".to_string());
    sdp.push("a=tool:rtspipe".to_string());
    sdp.push("a=sendonly".to_string());
    sdp.push(format!("m=video 0 RTP/AVP {}", pt));
    sdp.push(format!("a=rtpmap:{} H264/90000", pt));
    sdp.push(format!("a=fmtp:{} packetization-mode=1", pt));

    tracing::debug!("SDP: {}", sdp.join("\r\n"));

    format!("{}\r\n", sdp.join("\r\n"))
}
