use log::debug;

use crate::{Board, Move, MoveGenerator};

/// What a perft run saw: total leaf nodes, plus how many pseudo-legal
/// moves the generator rejected across the whole tree (diagnostic).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct PerftSummary {
    pub nodes: u64,
    pub filtered_out: u64,
}

/// Counts the leaf positions reachable in exactly `depth` half-moves.
///
/// Every move is applied to the board, recursed into and rewound, so the
/// board is back in its original state when this returns.
pub fn perft(board: &mut Board, movegen: &mut MoveGenerator, depth: usize) -> u64 {
    let mut filtered_out = 0;
    perft_nodes(board, movegen, depth, &mut filtered_out)
}

fn perft_nodes(
    board: &mut Board,
    movegen: &mut MoveGenerator,
    depth: usize,
    filtered_out: &mut u64,
) -> u64 {
    if depth == 0 {
        return 1;
    }

    let moves = movegen.generate_all_moves(board);
    *filtered_out += movegen.filtered_out();

    if depth == 1 {
        return moves.len() as u64;
    }

    let mut nodes = 0;
    for mv in &moves {
        board.apply_move(mv);
        nodes += perft_nodes(board, movegen, depth - 1, filtered_out);
        let rewound = board.rewind_move();
        debug_assert!(rewound.is_ok(), "apply_move pushed a snapshot");
    }

    nodes
}

/// Runs perft and reports each top-level move's subtree count through
/// `on_move` before accumulating it.
pub fn split_perft_with<F>(
    board: &mut Board,
    movegen: &mut MoveGenerator,
    depth: usize,
    mut on_move: F,
) -> PerftSummary
where
    F: FnMut(&Move, u64),
{
    if depth == 0 {
        return PerftSummary {
            nodes: 1,
            filtered_out: 0,
        };
    }

    let mut summary = PerftSummary::default();
    let moves = movegen.generate_all_moves(board);
    summary.filtered_out += movegen.filtered_out();

    for mv in &moves {
        board.apply_move(mv);
        let subtree = perft_nodes(board, movegen, depth - 1, &mut summary.filtered_out);
        let rewound = board.rewind_move();
        debug_assert!(rewound.is_ok(), "apply_move pushed a snapshot");

        on_move(mv, subtree);
        summary.nodes += subtree;
    }

    summary
}

/// Prints the split perft in the format external engines emit and the
/// differential debugger consumes: one `<move>: <count>` line per
/// top-level move, then `Nodes searched: <total>`.
pub fn print_split_perft(board: &mut Board, movegen: &mut MoveGenerator, depth: usize) -> u64 {
    let summary = split_perft_with(board, movegen, depth, |mv, nodes| {
        println!("{mv}: {nodes}");
    });

    println!("Nodes searched: {}", summary.nodes);
    if summary.filtered_out > 0 {
        debug!(
            "legality filter rejected {} pseudo-legal moves",
            summary.filtered_out
        );
    }

    summary.nodes
}
