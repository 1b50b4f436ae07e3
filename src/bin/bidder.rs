use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use leilao::notify;
use leilao::server::DEFAULT_PORT;
use leilao::wire::BidMessage;
use std::io::{self, BufRead, Read, Write};
use std::net::{TcpStream, UdpSocket};
use std::thread;

#[derive(Debug, Parser)]
#[command(version, about = "Interactive auction bidder")]
struct Args {
    /// Server address (IP or hostname)
    server: String,

    /// Numeric bidder id sent with every bid
    id: i32,

    /// Server TCP port
    #[arg(env = "LEILAO_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Multicast group carrying accepted-bid broadcasts (addr:port)
    #[arg(long, env = "LEILAO_MULTICAST", default_value = notify::DEFAULT_GROUP)]
    multicast: String,
}

fn main() -> Result<()> {
    let _ = dotenv();
    let args = Args::parse();

    let mut stream = TcpStream::connect((args.server.as_str(), args.port))
        .with_context(|| format!("connect to {}:{}", args.server, args.port))?;
    println!("Connected to {}:{} as bidder {}.", args.server, args.port, args.id);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    let name = match prompt(&mut lines, "Your name: ")? {
        Some(s) => s,
        None => return Ok(()),
    };
    let city = match prompt(&mut lines, "Your city: ")? {
        Some(s) => s,
        None => return Ok(()),
    };
    stream
        .write_all(format!("{name}|{city}\n").as_bytes())
        .context("send identity line")?;

    // Broadcast feed runs on its own socket and thread; it never blocks the
    // bid loop and is not correlated with our own bids.
    let group = notify::parse_group(&args.multicast)?;
    let udp = notify::join_group(group)?;
    thread::spawn(move || listen_multicast(&udp));

    loop {
        let line = match prompt(&mut lines, "Bid amount (integer, -1 to quit): ")? {
            Some(l) => l,
            None => break, // stdin closed
        };
        let line = line.trim();
        if line.is_empty() {
            println!("Empty input, try again.");
            continue;
        }
        let amount: i32 = match line.parse() {
            Ok(v) => v,
            Err(_) => {
                println!("Invalid amount, integers only.");
                continue;
            }
        };
        if amount < 0 {
            // local quit sentinel, never transmitted
            println!("Leaving the auction.");
            break;
        }

        let bid = BidMessage {
            bidder_id: args.id,
            amount,
        };
        stream.write_all(&bid.encode()).context("send bid frame")?;

        let mut buf = [0u8; 256];
        let n = stream.read(&mut buf).context("read server response")?;
        if n == 0 {
            println!("Server closed the connection.");
            break;
        }
        print!("[server] {}", String::from_utf8_lossy(&buf[..n]));
        io::stdout().flush().ok();
    }

    Ok(())
}

/// Print every datagram from the group until a receive error.
fn listen_multicast(socket: &UdpSocket) {
    println!("[multicast] listening for auction broadcasts");
    let mut buf = [0u8; 256];
    loop {
        match socket.recv_from(&mut buf) {
            Ok((n, _)) => println!("[multicast] {}", String::from_utf8_lossy(&buf[..n])),
            Err(e) => {
                eprintln!("[multicast] receive failed: {e}");
                break;
            }
        }
    }
}

/// One line from stdin; `Ok(None)` on EOF.
fn prompt(
    lines: &mut io::Lines<io::StdinLock<'_>>,
    msg: &str,
) -> Result<Option<String>> {
    print!("{msg}");
    io::stdout().flush().ok();
    match lines.next() {
        Some(line) => Ok(Some(line.context("read stdin")?)),
        None => Ok(None),
    }
}
