use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

/// Public address used only to make the OS pick a source interface. No
/// packet is sent: connecting a UDP socket just sets its default peer.
pub const PROBE_TARGET: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), 80);

/// This machine's LAN address as a dotted string, `127.0.0.1` when unknown.
pub fn get_local_address() -> String {
    local_ipv4().to_string()
}

pub fn local_ipv4() -> Ipv4Addr {
    local_ipv4_via(PROBE_TARGET)
}

pub fn local_ipv4_via(target: SocketAddr) -> Ipv4Addr {
    match probe(target) {
        Ok(IpAddr::V4(ip)) if !ip.is_unspecified() => ip,
        Ok(other) => {
            tracing::debug!("Ignoring non-LAN local address {}, using loopback", other);
            Ipv4Addr::LOCALHOST
        }
        Err(e) => {
            tracing::debug!("LAN address lookup failed ({}), using loopback", e);
            Ipv4Addr::LOCALHOST
        }
    }
}

fn probe(target: SocketAddr) -> std::io::Result<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.connect(target)?;
    Ok(socket.local_addr()?.ip())
}

pub fn server_url(ip: Ipv4Addr, port: u16) -> String {
    format!("http://{}:{}", ip, port)
}
