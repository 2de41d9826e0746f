//! Random-mover Ataxx engine.
//!
//! Exists so the harness can be exercised against a real subprocess: the
//! integration tests spawn it, and the misbehavior flags let them trigger
//! the illegal-move and timeout paths on demand.
//!
//! Usage:
//!   cargo run --release --bin uai_random
//!   cargo run --release --bin uai_random -- --delay-ms 200

use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;

use clap::Parser;
use rand::seq::SliceRandom;

use ataxx_arena::board::{Move, Position};

#[derive(Parser, Debug)]
#[command(about = "Random-mover Ataxx engine for harness testing")]
struct Args {
    /// Engine name reported in the handshake
    #[arg(long, default_value = "uai-random")]
    name: String,

    /// Speak UGI tokens instead of UAI
    #[arg(long, default_value_t = false)]
    ugi: bool,

    /// Sleep this long before every bestmove (ms)
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,

    /// Always answer searches with a bogus move token
    #[arg(long, default_value_t = false)]
    illegal: bool,

    /// Exit instead of answering the first search
    #[arg(long, default_value_t = false)]
    crash: bool,
}

fn main() -> io::Result<()> {
    let args = Args::parse();
    let (handshake, handshake_ok, newgame) = if args.ugi {
        ("ugi", "ugiok", "uginewgame")
    } else {
        ("uai", "uaiok", "uainewgame")
    };

    let stdin = io::stdin();
    let mut pos = Position::startpos();
    let mut rng = rand::thread_rng();

    for line in stdin.lock().lines() {
        let line = line?;
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else { continue };

        match command {
            c if c == handshake => {
                println!("id name {}", args.name);
                println!("id author ataxx-arena");
                println!("{}", handshake_ok);
            }
            c if c == newgame => pos = Position::startpos(),
            "isready" => println!("readyok"),
            "setoption" => {}
            "position" => {
                let rest: Vec<&str> = words.collect();
                let (spec, moves) = match rest.iter().position(|&w| w == "moves") {
                    Some(i) => (&rest[..i], &rest[i + 1..]),
                    None => (&rest[..], &[][..]),
                };
                let mut next = match spec.first() {
                    Some(&"startpos") => Position::startpos(),
                    Some(&"fen") => match Position::from_fen(&spec[1..].join(" ")) {
                        Ok(parsed) => parsed,
                        Err(_) => continue,
                    },
                    _ => continue,
                };
                for token in moves {
                    match Move::from_uai(token) {
                        Ok(mv) if next.is_legal_move(mv) => next.make_move(mv),
                        _ => break,
                    }
                }
                pos = next;
            }
            "go" => {
                if args.crash {
                    std::process::exit(1);
                }
                if args.delay_ms > 0 {
                    thread::sleep(Duration::from_millis(args.delay_ms));
                }
                if args.illegal {
                    println!("bestmove xyz");
                } else {
                    println!("info nodes 1");
                    match pos.legal_moves().choose(&mut rng) {
                        Some(mv) => println!("bestmove {}", mv),
                        None => println!("bestmove 0000"),
                    }
                }
            }
            "stop" => {}
            "quit" => break,
            _ => {}
        }
        io::stdout().flush()?;
    }
    Ok(())
}
