use std::path::PathBuf;
use std::sync::atomic::Ordering;

use clap::Parser;
use color_eyre::eyre::Result;

use ataxx_arena::callbacks::Callbacks;
use ataxx_arena::config::TournamentConfig;
use ataxx_arena::results::sprt_llr;
use ataxx_arena::tournament::Tournament;

/// Run an Ataxx engine tournament described by a JSON settings file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the tournament settings file
    config: PathBuf,

    /// Override the number of concurrent games
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Override the number of games per pairing
    #[arg(short, long)]
    games: Option<u64>,

    /// Echo raw engine protocol traffic
    #[arg(long, default_value_t = false)]
    debug: bool,
}

fn printing_callbacks(debug: bool) -> Callbacks {
    let mut callbacks = Callbacks {
        on_game_started: Box::new(|id, fen, name1, name2| {
            log::info!("game {} started: {} vs {} from {}", id, name1, name2, fen);
        }),
        on_game_finished: Box::new(|id, result, name1, name2| {
            println!("Game {}: {} vs {}: {}", id, name1, name2, result);
        }),
        ..Callbacks::default()
    };

    if debug {
        callbacks.on_info_send = Box::new(|line| println!("> {}", line));
        callbacks.on_info_recv = Box::new(|line| println!("< {}", line));
    }
    callbacks
}

fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::init();

    let args = Args::parse();
    let mut config = TournamentConfig::load(&args.config)?;
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(games) = args.games {
        config.games = games;
    }

    let tournament = Tournament::new(&config, printing_callbacks(args.debug))?;
    println!(
        "Running {} games with {} workers",
        tournament.expected_games(),
        config.concurrency
    );

    let stop = tournament.stop_flag();
    ctrlc::set_handler(move || {
        eprintln!("\nStopping after the games in progress finish...");
        stop.store(true, Ordering::Relaxed);
    })?;

    let results = tournament.run();
    println!("\n{}", results);

    // A two-engine match gets the usual is-it-actually-stronger verdict.
    if results.names().len() == 2 {
        if let Some(pair) = results.pair(0, 1) {
            let llr = sprt_llr(pair.b_wins as f64, pair.a_wins as f64, pair.draws as f64);
            let verdict = if llr > 2.94 {
                "significantly stronger"
            } else if llr < -2.94 {
                "significantly weaker"
            } else {
                "inconclusive"
            };
            println!(
                "SPRT: {} vs {}: LLR {:.2} ({})",
                results.names()[1],
                results.names()[0],
                llr,
                verdict
            );
        }
    }

    Ok(())
}
