//! Wire formats shared by the auction server and the bidder client.
//!
//! Three things cross the network:
//! - a `"name|city\n"` identity line, sent once per connection ([`Identity`])
//! - the fixed 8-byte bid frame, both fields big-endian ([`BidMessage`])
//! - one-line text payloads going back: the per-bid TCP response
//!   ([`response_line`]) and the multicast notification ([`NotificationEvent`])
//!
//! Encoding and decoding never perform I/O; the transport layer hands in the
//! exact bytes.

/// City used when the identity line carries no `|` separator.
pub const DEFAULT_CITY: &str = "unknown";

/// Upper bound on the identity line read from the socket, in bytes.
pub const MAX_IDENTITY_LINE: usize = 128;

/// Name and city are each truncated to this many bytes.
const MAX_FIELD_LEN: usize = 63;

/// A single bid as it travels over TCP: 8 bytes, big-endian `bidder_id`
/// followed by big-endian `amount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BidMessage {
    pub bidder_id: i32,
    pub amount: i32,
}

impl BidMessage {
    /// Frame size on the wire.
    pub const ENCODED_LEN: usize = 8;

    pub fn encode(&self) -> [u8; Self::ENCODED_LEN] {
        let mut buf = [0u8; Self::ENCODED_LEN];
        buf[..4].copy_from_slice(&self.bidder_id.to_be_bytes());
        buf[4..].copy_from_slice(&self.amount.to_be_bytes());
        buf
    }

    pub fn decode(buf: &[u8; Self::ENCODED_LEN]) -> Self {
        Self {
            bidder_id: i32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
            amount: i32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
        }
    }
}

/// Who is bidding, as announced on connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub city: String,
}

impl Identity {
    /// Parse one identity line (newline already stripped).
    ///
    /// Splits on the first `|`; a line without a separator becomes the name
    /// with [`DEFAULT_CITY`] as the city. Both fields are truncated to the
    /// fixed buffer size; excess bytes are dropped silently.
    pub fn parse(line: &str) -> Self {
        match line.split_once('|') {
            Some((name, city)) => Self {
                name: truncate_field(name),
                city: truncate_field(city),
            },
            None => Self {
                name: truncate_field(line),
                city: DEFAULT_CITY.to_string(),
            },
        }
    }
}

fn truncate_field(s: &str) -> String {
    if s.len() <= MAX_FIELD_LEN {
        return s.to_string();
    }
    let mut end = MAX_FIELD_LEN;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

/// The single-line TCP response sent back after every bid, carrying the
/// current highest amount and winner id.
pub fn response_line(accepted: bool, highest: i32, winner_id: i32) -> String {
    if accepted {
        format!("Bid accepted. Current highest = {highest} (bidder {winner_id})\n")
    } else {
        format!("Bid rejected. Current highest still = {highest} (bidder {winner_id})\n")
    }
}

/// An accepted bid as broadcast on the multicast group. Built only to be
/// serialized into one datagram; never retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub bidder_id: i32,
    pub name: String,
    pub city: String,
    pub amount: i32,
}

impl NotificationEvent {
    /// Human-readable datagram payload, one line, no trailing newline.
    pub fn to_line(&self) -> String {
        format!(
            "NEW_BID bidder={} name={} city={} amount={}",
            self.bidder_id, self.name, self.city, self.amount
        )
    }
}
