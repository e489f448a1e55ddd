use anyhow::{anyhow, bail, Result};
use log::info;

use fianchetto::{print_split_perft, Board, Move, MoveGenerator};

/// Split-perft runner for debugging against a reference engine: prints
/// one `<move>: <count>` line per root move and a final total, the same
/// format `stockfish`'s `go perft` emits.
fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        println!("Usage: {} <depth> <fen> [moves]", args[0]);
        std::process::exit(1);
    }

    let depth: usize = args[1]
        .parse()
        .map_err(|_| anyhow!("Failed to parse {:?} as depth value", args[1]))?;

    let mut board = Board::from_fen(&args[2])?;
    let mut movegen = MoveGenerator::new();

    // Apply moves, if any were provided
    if let Some(moves) = args.get(3) {
        for mv_str in moves.split_ascii_whitespace() {
            let parsed = Move::from_uci(mv_str)?;

            // match the bare coordinates against the legal moves so that
            // castling and en passant get their flags
            let legal = movegen.generate_all_moves(&board);
            let Some(mv) = legal.iter().find(|mv| mv.same_base_move(&parsed)).cloned() else {
                bail!("{mv_str} is not legal in position {}", board.to_fen());
            };
            board.apply_move(&mv);
        }
    }

    info!("running perft({depth}) on {}", board.to_fen());
    print_split_perft(&mut board, &mut movegen, depth);

    Ok(())
}
