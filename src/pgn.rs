//! PGN assembly and file output for finished games.
//!
//! Ataxx PGN lists the Black engine first since Black moves first. The
//! headers carry everything needed to reconstruct the game offline: start
//! and final FEN, ply count, signed material balance and the adjudication
//! reason when a game did not end over the board.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use chrono::prelude::*;

use crate::board::{GameResult, Side};
use crate::clock::GameClock;
use crate::driver::{GameOutcome, ResultReason};
use crate::settings::{GameSettings, SearchSettings};

/// Renders one finished game as PGN text.
pub fn render(
    event: &str,
    verbose: bool,
    tc: &SearchSettings,
    game: &GameSettings,
    outcome: &GameOutcome,
) -> String {
    let mut out = String::new();

    header(&mut out, "Event", event);
    header(&mut out, "Site", "ataxx-arena");
    header(
        &mut out,
        "Date",
        &Local::now().format("%Y.%m.%d").to_string(),
    );
    header(&mut out, "Black", &game.engine1.name);
    header(&mut out, "White", &game.engine2.name);
    header(&mut out, "FEN", &game.fen);
    header(&mut out, "Result", &outcome.result.to_string());

    match outcome.result {
        GameResult::BlackWin => {
            header(&mut out, "Winner", &game.engine1.name);
            header(&mut out, "Loser", &game.engine2.name);
        }
        GameResult::WhiteWin => {
            header(&mut out, "Winner", &game.engine2.name);
            header(&mut out, "Loser", &game.engine1.name);
        }
        GameResult::Draw | GameResult::None => {}
    }

    let adjudicated = match outcome.reason {
        ResultReason::OutOfTime => Some("Out of time".to_string()),
        ResultReason::MaterialImbalance => Some("Material imbalance".to_string()),
        ResultReason::EasyFill => Some("Easy fill".to_string()),
        ResultReason::Gamelength => Some("Max game length reached".to_string()),
        ResultReason::IllegalMove => Some(format!(
            "Illegal move {}",
            outcome.illegal_token.as_deref().unwrap_or("?")
        )),
        ResultReason::Normal | ResultReason::EngineCrash | ResultReason::None => None,
    };
    if let Some(text) = adjudicated {
        header(&mut out, "Adjudicated", &text);
    }

    header(&mut out, "PlyCount", &outcome.ply_count.to_string());
    header(&mut out, "Final FEN", &outcome.endpos.fen());
    let sign = if outcome.final_material >= 0 { "+" } else { "" };
    header(
        &mut out,
        "Material",
        &format!("{}{}", sign, outcome.final_material),
    );
    out.push('\n');

    out.push_str(&movetext(verbose, tc, outcome));
    out
}

fn header(out: &mut String, key: &str, value: &str) {
    out.push_str(&format!("[{} \"{}\"]\n", key, value));
}

fn movetext(verbose: bool, tc: &SearchSettings, outcome: &GameOutcome) -> String {
    let mut out = String::new();
    // Replay the clock so verbose output can annotate remaining time.
    let mut clock = GameClock::new(*tc, 0);
    let mut mover = outcome.startpos.turn();

    for (i, (mv, elapsed)) in outcome.history.iter().enumerate() {
        if i % 2 == 0 {
            out.push_str(&format!("{}. ", i / 2 + 1));
        }
        out.push_str(&mv.to_string());
        out.push(' ');

        clock.after_move(mover, *elapsed);
        if verbose {
            out.push_str(&format!("{{ movetime {} }} ", elapsed));
            if let SearchSettings::Time { btime, wtime, .. } = clock.settings() {
                let left = match mover {
                    Side::Black => btime,
                    Side::White => wtime,
                };
                out.push_str(&format!("{{ time left {}ms }} ", left));
            }
        }
        mover = mover.other();
    }

    out.push_str(&outcome.result.to_string());
    out.push('\n');
    out
}

/// Serializes finished games to a single file, in completion order. Safe to
/// share between workers.
pub struct PgnWriter {
    file: Mutex<BufWriter<File>>,
}

impl PgnWriter {
    pub fn append(path: &Path) -> io::Result<PgnWriter> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(PgnWriter {
            file: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn write(&self, pgn: &str) -> io::Result<()> {
        let mut file = self.file.lock().unwrap();
        writeln!(file, "{}", pgn)?;
        file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Move, Position};
    use crate::settings::{EngineConfig, Protocol};
    use std::collections::BTreeMap;

    fn engine(id: usize, name: &str) -> EngineConfig {
        EngineConfig {
            id,
            name: name.to_string(),
            path: format!("./{}", name),
            args: Vec::new(),
            protocol: Protocol::Uai,
            options: BTreeMap::new(),
        }
    }

    fn game() -> GameSettings {
        GameSettings {
            engine1: engine(0, "alpha"),
            engine2: engine(1, "beta"),
            fen: crate::board::STARTPOS_FEN.to_string(),
        }
    }

    fn outcome(result: GameResult, reason: ResultReason) -> GameOutcome {
        let startpos = Position::startpos();
        GameOutcome {
            result,
            reason,
            endpos: startpos.clone(),
            startpos,
            history: Vec::new(),
            ply_count: 0,
            final_material: 0,
            illegal_token: None,
        }
    }

    #[test]
    fn black_win_headers() {
        let tc = SearchSettings::Movetime { ms: 100 };
        let pgn = render("test", false, &tc, &game(), &outcome(GameResult::BlackWin, ResultReason::Normal));

        assert!(pgn.contains("[Black \"alpha\"]"));
        assert!(pgn.contains("[White \"beta\"]"));
        assert!(pgn.contains("[Result \"1-0\"]"));
        assert!(pgn.contains("[Winner \"alpha\"]"));
        assert!(pgn.contains("[Loser \"beta\"]"));
        assert!(pgn.contains("[Material \"+0\"]"));
        assert!(!pgn.contains("[Adjudicated"));
    }

    #[test]
    fn illegal_move_header_names_the_token() {
        let mut out = outcome(GameResult::WhiteWin, ResultReason::IllegalMove);
        out.illegal_token = Some("xyz".to_string());
        let tc = SearchSettings::Movetime { ms: 100 };
        let pgn = render("test", false, &tc, &game(), &out);

        assert!(pgn.contains("[Result \"0-1\"]"));
        assert!(pgn.contains("[Adjudicated \"Illegal move xyz\"]"));
        assert!(pgn.contains("[PlyCount \"0\"]"));
    }

    #[test]
    fn negative_material_keeps_its_sign() {
        let mut out = outcome(GameResult::WhiteWin, ResultReason::MaterialImbalance);
        out.final_material = -7;
        let tc = SearchSettings::Movetime { ms: 100 };
        let pgn = render("test", false, &tc, &game(), &out);

        assert!(pgn.contains("[Material \"-7\"]"));
        assert!(pgn.contains("[Adjudicated \"Material imbalance\"]"));
    }

    #[test]
    fn movetext_numbers_move_pairs() {
        let mut out = outcome(GameResult::Draw, ResultReason::Gamelength);
        out.history = vec![
            (Move::from_uai("g2").unwrap(), 10),
            (Move::from_uai("b6").unwrap(), 20),
            (Move::from_uai("f2").unwrap(), 30),
        ];
        out.ply_count = 3;
        let tc = SearchSettings::Movetime { ms: 100 };
        let pgn = render("test", false, &tc, &game(), &out);

        assert!(pgn.contains("1. g2 b6 2. f2 1/2-1/2"));
    }

    #[test]
    fn verbose_movetext_annotates_times() {
        let mut out = outcome(GameResult::None, ResultReason::None);
        out.history = vec![
            (Move::from_uai("g2").unwrap(), 40),
            (Move::from_uai("b6").unwrap(), 60),
        ];
        let tc = SearchSettings::Time {
            btime: 100,
            wtime: 100,
            binc: 0,
            winc: 0,
        };
        let pgn = render("test", true, &tc, &game(), &out);

        assert!(pgn.contains("{ movetime 40 }"));
        assert!(pgn.contains("{ time left 60ms }"));
        assert!(pgn.contains("{ movetime 60 }"));
        assert!(pgn.contains("{ time left 40ms }"));
    }
}
