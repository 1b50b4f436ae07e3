//! Multicast side channel for accepted bids.
//!
//! The server end is fire-and-forget: handlers enqueue events onto a bounded
//! channel and a dedicated sender thread turns each one into a single UDP
//! datagram on the group, TTL 1 (link-local). No acknowledgment, no retry,
//! no ordering guarantee.
//!
//! The listener end ([`join_group`]) binds the group port with
//! `SO_REUSEADDR` so several clients on one host can all join.

use anyhow::{Context, Result, bail};
use crossbeam_channel::{Sender, bounded};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::thread;
use tracing::{error, info, warn};

use crate::wire::NotificationEvent;

/// Default group for accepted-bid notifications.
pub const DEFAULT_GROUP: &str = "239.0.0.1:5000";

/// Events waiting for the sender thread; beyond this they are dropped.
const PUBLISH_QUEUE: usize = 1024;

/// Parse and validate a `addr:port` multicast group argument.
pub fn parse_group(s: &str) -> Result<SocketAddrV4> {
    let addr: SocketAddrV4 = s
        .parse()
        .with_context(|| format!("invalid multicast group {s:?} (expected addr:port)"))?;
    if !addr.ip().is_multicast() {
        bail!("{} is not a multicast address", addr.ip());
    }
    Ok(addr)
}

/// Handle shared by all connection handlers. Cloning is cheap; dropping the
/// last clone stops the sender thread.
#[derive(Clone)]
pub struct Publisher {
    tx: Sender<NotificationEvent>,
}

impl Publisher {
    /// Open the UDP send socket and start the sender thread.
    ///
    /// A failure to set the TTL is a warning only; failing to open the
    /// socket at all is fatal.
    pub fn spawn(group: SocketAddrV4) -> Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .context("open multicast send socket")?;
        if let Err(e) = socket.set_multicast_ttl_v4(1) {
            warn!("could not set multicast TTL: {e}");
        }

        let (tx, rx) = bounded::<NotificationEvent>(PUBLISH_QUEUE);
        thread::spawn(move || {
            let group = SocketAddr::V4(group);
            for ev in rx {
                let line = ev.to_line();
                match socket.send_to(line.as_bytes(), group) {
                    Ok(_) => info!("multicast: {line}"),
                    Err(e) => error!("multicast send failed: {e}"),
                }
            }
        });

        Ok(Self { tx })
    }

    /// Fire-and-forget. A full or closed queue drops the event silently.
    pub fn publish(&self, event: NotificationEvent) {
        let _ = self.tx.try_send(event);
    }
}

/// Join `group` on an independent receive socket bound to `0.0.0.0:<port>`.
///
/// `SO_REUSEADDR` must be set before bind so multiple listeners on the same
/// host can share the group port.
pub fn join_group(group: SocketAddrV4) -> Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .context("create multicast receive socket")?;
    socket
        .set_reuse_address(true)
        .context("set SO_REUSEADDR on multicast socket")?;
    let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, group.port());
    socket
        .bind(&bind_addr.into())
        .with_context(|| format!("bind multicast socket on {bind_addr}"))?;
    socket
        .join_multicast_v4(group.ip(), &Ipv4Addr::UNSPECIFIED)
        .with_context(|| format!("join multicast group {}", group.ip()))?;
    Ok(socket.into())
}
