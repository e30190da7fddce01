use std::net::{SocketAddr, UdpSocket};

use crate::error::Result;

/// Per-session UDP socket for outbound RTP delivery.
///
/// Bound to an ephemeral local port and connected to the client's
/// negotiated RTP endpoint during SETUP. The local port doubles as the
/// session's advertised `server_port`. The socket lives exactly as long
/// as its session.
#[derive(Debug)]
pub struct RtpSocket {
    socket: UdpSocket,
    local_port: u16,
}

impl RtpSocket {
    /// Bind an ephemeral socket and connect it to the client endpoint.
    pub fn connect(client: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect(client)?;
        let local_port = socket.local_addr()?.port();
        tracing::debug!(%client, local_port, "RTP socket connected");
        Ok(Self { socket, local_port })
    }

    /// Send one RTP packet to the connected client.
    pub fn send(&self, packet: &[u8]) -> Result<usize> {
        Ok(self.socket.send(packet)?)
    }

    /// Local port of the socket, advertised as the session's server port.
    pub fn local_port(&self) -> u16 {
        self.local_port
    }
}
