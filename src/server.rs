//! TCP accept loop and the per-connection identify/bid handler.
//!
//! The server owns the single [`AuctionState`] and the multicast
//! [`Publisher`]; every accepted connection gets its own thread holding a
//! reference to both. There is no upper bound on simultaneous connections
//! and no timeout on blocking reads.

use anyhow::{Context, Result};
use std::io::{Read, Write};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use tracing::{error, info, warn};

use crate::notify::Publisher;
use crate::state::AuctionState;
use crate::wire::{self, BidMessage, Identity, MAX_IDENTITY_LINE, NotificationEvent};

/// Default TCP listen port.
pub const DEFAULT_PORT: u16 = 9000;

#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    pub port: u16,
    pub multicast: SocketAddrV4,
}

/// A bound auction server, ready to accept bidders.
pub struct AuctionServer {
    listener: TcpListener,
    state: Arc<AuctionState>,
    publisher: Publisher,
}

impl AuctionServer {
    /// Bind the TCP port and open the multicast send socket. Any failure
    /// here is fatal to the process.
    pub fn bind(config: &ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, config.port))
            .with_context(|| format!("bind TCP port {}", config.port))?;
        let publisher = Publisher::spawn(config.multicast)?;
        Ok(Self {
            listener,
            state: Arc::new(AuctionState::new()),
            publisher,
        })
    }

    /// Address actually bound (useful when configured with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().context("listener local_addr")
    }

    /// Handle to the shared auction record.
    pub fn state(&self) -> Arc<AuctionState> {
        Arc::clone(&self.state)
    }

    /// Accept loop: one thread per connection, forever. Accept errors are
    /// logged and the loop continues.
    pub fn serve(&self) -> Result<()> {
        loop {
            let (stream, peer) = match self.listener.accept() {
                Ok(conn) => conn,
                Err(e) => {
                    error!("accept failed: {e}");
                    continue;
                }
            };
            info!("new connection from {peer}");
            let state = Arc::clone(&self.state);
            let publisher = self.publisher.clone();
            thread::spawn(move || handle_connection(stream, &state, &publisher));
        }
    }
}

/// Per-connection state machine: await identity, then loop over bid frames
/// until EOF or an I/O error. Nothing here propagates to other handlers.
fn handle_connection(mut stream: TcpStream, state: &AuctionState, publisher: &Publisher) {
    let identity = match read_line_bounded(&mut stream, MAX_IDENTITY_LINE) {
        Ok(Some(line)) => Identity::parse(&line),
        Ok(None) => {
            info!("peer closed before identifying");
            return;
        }
        Err(e) => {
            warn!("could not read identity line: {e}");
            return;
        }
    };
    info!("bidder identified: {} ({})", identity.name, identity.city);

    let mut buf = [0u8; BidMessage::ENCODED_LEN];
    loop {
        let n = match stream.read(&mut buf) {
            Ok(n) => n,
            Err(e) => {
                warn!("recv failed for {}: {e}", identity.name);
                break;
            }
        };
        if n == 0 {
            info!("{} disconnected", identity.name);
            break;
        }
        if n != BidMessage::ENCODED_LEN {
            // tolerated: log and keep reading
            warn!("unexpected frame length {n} from {}", identity.name);
            continue;
        }

        let bid = BidMessage::decode(&buf);
        let outcome = state.submit_bid(bid.bidder_id, bid.amount);
        if outcome.accepted {
            info!(
                "new highest bid: {} by bidder {} ({}, {})",
                outcome.highest, outcome.winner_id, identity.name, identity.city
            );
            publisher.publish(NotificationEvent {
                bidder_id: bid.bidder_id,
                name: identity.name.clone(),
                city: identity.city.clone(),
                amount: bid.amount,
            });
        }

        let reply = wire::response_line(outcome.accepted, outcome.highest, outcome.winner_id);
        if let Err(e) = stream.write_all(reply.as_bytes()) {
            warn!("send failed for {}: {e}", identity.name);
            break;
        }
    }
}

/// Read up to and including `\n` (excluded from the result), or until `max`
/// bytes. Single-byte reads so nothing past the newline is consumed; binary
/// bid frames follow on the same stream. `Ok(None)` means the peer closed
/// before finishing a line.
fn read_line_bounded(stream: &mut TcpStream, max: usize) -> std::io::Result<Option<String>> {
    let mut raw = Vec::with_capacity(64);
    let mut byte = [0u8; 1];
    loop {
        if stream.read(&mut byte)? == 0 {
            return Ok(None);
        }
        if byte[0] == b'\n' {
            return Ok(Some(String::from_utf8_lossy(&raw).into_owned()));
        }
        raw.push(byte[0]);
        if raw.len() >= max {
            return Ok(Some(String::from_utf8_lossy(&raw).into_owned()));
        }
    }
}
