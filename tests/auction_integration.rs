use leilao::notify;
use leilao::server::{AuctionServer, ServerConfig};
use leilao::state::AuctionState;
use leilao::wire::BidMessage;
use std::io::{BufRead, BufReader, Write};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Bind a server on an ephemeral port. Each test gets its own multicast port
/// so the observation test does not pick up traffic from siblings.
fn start_server(mcast_port: u16) -> (SocketAddr, Arc<AuctionState>) {
    let server = AuctionServer::bind(&ServerConfig {
        port: 0,
        multicast: SocketAddrV4::new(Ipv4Addr::new(239, 0, 0, 1), mcast_port),
    })
    .expect("bind server");
    let addr = server.local_addr().expect("local addr");
    let state = server.state();
    thread::spawn(move || {
        let _ = server.serve();
    });
    (addr, state)
}

struct Bidder {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
}

impl Bidder {
    fn connect(addr: SocketAddr, identity: &str) -> Self {
        let mut stream = TcpStream::connect(addr).expect("connect");
        stream
            .write_all(format!("{identity}\n").as_bytes())
            .expect("send identity");
        let reader = BufReader::new(stream.try_clone().expect("clone stream"));
        Self { stream, reader }
    }

    fn bid(&mut self, id: i32, amount: i32) -> String {
        let frame = BidMessage { bidder_id: id, amount }.encode();
        self.stream.write_all(&frame).expect("send bid");
        let mut line = String::new();
        self.reader.read_line(&mut line).expect("read response");
        line
    }
}

#[test]
fn accepted_bid_reports_new_highest() {
    let (addr, state) = start_server(15001);
    let mut ana = Bidder::connect(addr, "Ana|Recife");

    let reply = ana.bid(1, 50);
    assert_eq!(reply, "Bid accepted. Current highest = 50 (bidder 1)\n");
    assert_eq!(state.snapshot(), (50, 1));
}

#[test]
fn equal_bid_is_rejected_and_state_unchanged() {
    let (addr, state) = start_server(15002);
    let mut ana = Bidder::connect(addr, "Ana|Recife");
    let mut bob = Bidder::connect(addr, "Bob|Olinda");

    assert_eq!(ana.bid(1, 50), "Bid accepted. Current highest = 50 (bidder 1)\n");
    assert_eq!(
        bob.bid(2, 50),
        "Bid rejected. Current highest still = 50 (bidder 1)\n"
    );
    assert_eq!(state.snapshot(), (50, 1));
}

#[test]
fn two_bidders_highest_wins() {
    let (addr, state) = start_server(15003);
    let mut first = Bidder::connect(addr, "Ana|Recife");
    let mut second = Bidder::connect(addr, "Bob|Olinda");

    assert!(first.bid(1, 100).starts_with("Bid accepted"));
    assert!(second.bid(2, 150).starts_with("Bid accepted"));
    assert!(first.bid(1, 120).starts_with("Bid rejected"));
    assert_eq!(state.snapshot(), (150, 2));
}

#[test]
fn disconnect_only_affects_its_own_handler() {
    let (addr, state) = start_server(15004);

    {
        let mut quitter = Bidder::connect(addr, "Ana|Recife");
        assert!(quitter.bid(1, 100).starts_with("Bid accepted"));
        // dropped here: socket closes mid-session
    }
    // a peer that never identifies and leaves is also just a local close
    drop(TcpStream::connect(addr).expect("connect"));

    thread::sleep(Duration::from_millis(100));
    assert_eq!(state.snapshot(), (100, 1));

    let mut survivor = Bidder::connect(addr, "Bob|Olinda");
    assert_eq!(
        survivor.bid(2, 150),
        "Bid accepted. Current highest = 150 (bidder 2)\n"
    );
    assert_eq!(state.snapshot(), (150, 2));
}

#[test]
fn malformed_frame_is_tolerated_and_connection_stays_up() {
    let (addr, state) = start_server(15005);
    let mut ana = Bidder::connect(addr, "Ana|Recife");

    // a short garbage write: logged by the server, connection kept open
    ana.stream.write_all(&[0xAB, 0xCD, 0xEF]).expect("send garbage");
    // let the server consume the fragment before the real frame arrives,
    // so the two writes cannot coalesce into one read
    thread::sleep(Duration::from_millis(150));

    assert_eq!(ana.bid(1, 50), "Bid accepted. Current highest = 50 (bidder 1)\n");
    assert_eq!(state.snapshot(), (50, 1));
}

#[test]
fn identity_without_separator_still_bids() {
    let (addr, state) = start_server(15006);
    let mut anon = Bidder::connect(addr, "Bob");

    assert_eq!(anon.bid(7, 30), "Bid accepted. Current highest = 30 (bidder 7)\n");
    assert_eq!(state.snapshot(), (30, 7));
}

#[test]
fn accepted_bid_is_broadcast_on_the_group() {
    let group = SocketAddrV4::new(Ipv4Addr::new(239, 0, 0, 1), 15007);

    // join before bidding so the datagram cannot be missed
    let listener = match notify::join_group(group) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("skipping multicast test: cannot join group: {e:#}");
            return;
        }
    };
    listener
        .set_read_timeout(Some(Duration::from_secs(2)))
        .expect("set read timeout");

    let (addr, _state) = start_server(group.port());
    let mut ana = Bidder::connect(addr, "Ana|Recife");
    assert!(ana.bid(1, 50).starts_with("Bid accepted"));

    let mut buf = [0u8; 256];
    match listener.recv_from(&mut buf) {
        Ok((n, _)) => {
            let msg = String::from_utf8_lossy(&buf[..n]).into_owned();
            assert_eq!(msg, "NEW_BID bidder=1 name=Ana city=Recife amount=50");
        }
        Err(e) => {
            // loopback multicast is not routable in every test environment
            eprintln!("skipping multicast assertion: no datagram received: {e}");
        }
    }
}
