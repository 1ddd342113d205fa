//! Wake-on-LAN magic packets

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tvlink_core::prelude::*;
use tvlink_core::MacAddress;

/// Default broadcast target for magic packets (UDP discard port)
pub const DEFAULT_WOL_TARGET: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::BROADCAST), 9);

const PACKET_REPEAT: usize = 3;
const PACKET_INTERVAL: Duration = Duration::from_millis(100);

/// Sends a wake-on-LAN magic packet and reports whether it went out
#[trait_variant::make(WakeOnLan: Send)]
pub trait LocalWakeOnLan {
    async fn send_magic_packet(&self, mac: MacAddress) -> bool;
}

/// Build the 102-byte magic packet: six `0xFF` then the MAC sixteen times
pub fn magic_packet(mac: MacAddress) -> [u8; 102] {
    let mut packet = [0xFFu8; 102];
    let octets = mac.octets();
    for chunk in packet[6..].chunks_exact_mut(6) {
        chunk.copy_from_slice(&octets);
    }
    packet
}

/// Broadcasts magic packets over UDP
#[derive(Debug, Clone)]
pub struct UdpWakeOnLan {
    target: SocketAddr,
}

impl Default for UdpWakeOnLan {
    fn default() -> Self {
        Self::new(DEFAULT_WOL_TARGET)
    }
}

impl UdpWakeOnLan {
    pub fn new(target: SocketAddr) -> Self {
        Self { target }
    }

    async fn broadcast(&self, mac: MacAddress) -> std::io::Result<()> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        socket.set_broadcast(true)?;

        let packet = magic_packet(mac);
        for i in 0..PACKET_REPEAT {
            if i > 0 {
                tokio::time::sleep(PACKET_INTERVAL).await;
            }
            socket.send_to(&packet, self.target).await?;
        }
        Ok(())
    }
}

impl WakeOnLan for UdpWakeOnLan {
    async fn send_magic_packet(&self, mac: MacAddress) -> bool {
        match self.broadcast(mac).await {
            Ok(()) => {
                debug!(%mac, target = %self.target, "Magic packet sent");
                true
            }
            Err(e) => {
                warn!(%mac, target = %self.target, "Failed to send magic packet: {}", e);
                false
            }
        }
    }
}
