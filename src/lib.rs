//! Distributed auction: TCP bid server with UDP multicast notifications.
//!
//! This crate provides the core types and logic used by the `leilao` server
//! binary and the `bidder` client:
//!
//! - `wire`: the messages that cross the network (8-byte big-endian bid
//!   frame, `"name|city"` identity line, per-bid response line, multicast
//!   notification text)
//! - `state`: the single shared highest-bid record and its strict
//!   greater-than acceptance rule
//! - `notify`: fire-and-forget multicast publishing of accepted bids, plus
//!   the group-join helper used by listeners
//! - `server`: TCP accept loop and the per-connection identify/bid handler
//!
//! The binaries in this repository (`src/main.rs` and `src/bin/bidder.rs`)
//! wire these modules together into the server and the interactive client.
pub mod notify;
pub mod server;
pub mod state;
pub mod wire;
