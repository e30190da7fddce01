use crate::error::{Result, RtspError};

/// Parsed client `Transport` header (RFC 2326 §12.39).
///
/// The descriptor is semicolon-delimited: a transport type, a mode, then
/// `key=value` parameters:
///
/// ```text
/// RTP/AVP;unicast;client_port=5000-5001
/// ```
///
/// Only the `client_port` parameter is consumed; everything else is
/// ignored. Parsing fails (rather than silently defaulting) when the
/// descriptor does not have the `type;mode;...` shape or when no usable
/// `client_port` is present.
#[derive(Debug, Clone)]
pub struct TransportDescriptor {
    /// Transport type, e.g. `RTP/AVP`.
    pub transport_type: String,
    /// Delivery mode, e.g. `unicast`.
    pub mode: String,
    /// Client's RTP receive port.
    pub client_rtp_port: u16,
    /// Client's RTCP port (second port of the range, or RTP + 1 when the
    /// client sent a single port). Not used for delivery — RTCP is out of
    /// scope — but echoed back in the SETUP response.
    pub client_rtcp_port: u16,
}

impl TransportDescriptor {
    /// Parse a client transport descriptor.
    ///
    /// ## Examples
    ///
    /// ```
    /// use rtspipe::session::transport::TransportDescriptor;
    ///
    /// let td = TransportDescriptor::parse("RTP/AVP;unicast;client_port=5000-5001").unwrap();
    /// assert_eq!(td.transport_type, "RTP/AVP");
    /// assert_eq!(td.mode, "unicast");
    /// assert_eq!(td.client_rtp_port, 5000);
    /// assert_eq!(td.client_rtcp_port, 5001);
    ///
    /// assert!(TransportDescriptor::parse("RTP/AVP;unicast").is_err());
    /// ```
    pub fn parse(header: &str) -> Result<Self> {
        let invalid = || RtspError::InvalidTransport(header.to_string());

        let mut parts = header.split(';').map(str::trim);
        let transport_type = parts.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
        let mode = parts.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;

        for part in parts {
            if let Some(ports) = part.strip_prefix("client_port=") {
                let mut range = ports.split('-');
                let rtp: u16 = range
                    .next()
                    .and_then(|p| p.parse().ok())
                    .ok_or_else(invalid)?;
                let rtcp: u16 = match range.next() {
                    Some(p) => p.parse().map_err(|_| invalid())?,
                    None => rtp.wrapping_add(1),
                };
                return Ok(TransportDescriptor {
                    transport_type: transport_type.to_string(),
                    mode: mode.to_string(),
                    client_rtp_port: rtp,
                    client_rtcp_port: rtcp,
                });
            }
        }

        Err(invalid())
    }
}
