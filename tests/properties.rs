//! Property-based tests using proptest.

use fianchetto::{Board, Move, MoveGenerator, Piece, Square, FEN_STARTPOS};
use proptest::prelude::*;
use rand::prelude::*;
use rand::Rng;

/// Strategy to generate a random legal move sequence length
fn move_count_strategy() -> impl Strategy<Value = usize> {
    1..=24usize
}

/// Strategy to generate a random seed for move selection
fn seed_strategy() -> impl Strategy<Value = u64> {
    any::<u64>()
}

/// Plays up to `num_moves` random legal moves from the starting position.
fn random_walk(seed: u64, num_moves: usize) -> (Board, usize) {
    let mut board = Board::standard_setup();
    let mut movegen = MoveGenerator::new();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut played = 0;

    for _ in 0..num_moves {
        let moves = movegen.generate_all_moves(&board);
        if moves.is_empty() {
            break;
        }
        let mv = moves[rng.gen_range(0..moves.len())].clone();
        board.apply_move(&mv);
        played += 1;
    }

    (board, played)
}

/// Asserts that the mailbox and the bitboards agree on every square.
fn assert_coherent(board: &Board) {
    let mut population_sum = 0;

    for square in Square::iter() {
        let piece = board.at(square);
        assert_eq!(
            piece.is_some(),
            board.occupied().get(square),
            "mailbox and occupancy disagree on {square}"
        );
        assert_eq!(piece.is_some(), board.is_occupied(square));

        if let Some(piece) = piece {
            assert!(
                board.bitboard(piece).get(square),
                "{piece} at {square} missing from its bitboard"
            );
        }
    }

    for color in [fianchetto::Color::White, fianchetto::Color::Black] {
        for kind in [
            fianchetto::PieceKind::Pawn,
            fianchetto::PieceKind::Knight,
            fianchetto::PieceKind::Bishop,
            fianchetto::PieceKind::Rook,
            fianchetto::PieceKind::Queen,
            fianchetto::PieceKind::King,
        ] {
            let piece = Piece::new(color, kind);
            for square in board.bitboard(piece) {
                assert_eq!(board.at(square), Some(piece));
            }
            population_sum += board.bitboard(piece).population();
        }
    }

    assert_eq!(population_sum, board.occupied().population());
}

proptest! {
    /// Property: the mailbox and the union of all piece bitboards agree
    /// on occupancy after any sequence of legal moves
    #[test]
    fn prop_mailbox_and_bitboards_agree(seed in seed_strategy(), num_moves in move_count_strategy()) {
        let (board, _) = random_walk(seed, num_moves);
        assert_coherent(&board);
    }

    /// Property: apply_move followed by rewind_move restores the board to
    /// bitwise-equal state, all the way back to the starting position
    #[test]
    fn prop_apply_rewind_restores_state(seed in seed_strategy(), num_moves in move_count_strategy()) {
        let (mut board, played) = random_walk(seed, num_moves);

        for _ in 0..played {
            board.rewind_move().unwrap();
        }

        prop_assert_eq!(&board, &Board::standard_setup());
        prop_assert_eq!(board.to_fen(), FEN_STARTPOS);
    }

    /// Property: FEN round-trips through any reachable position
    #[test]
    fn prop_fen_round_trip(seed in seed_strategy(), num_moves in move_count_strategy()) {
        let (board, _) = random_walk(seed, num_moves);

        let fen = board.to_fen();
        let restored = Board::from_fen(&fen).unwrap();

        prop_assert_eq!(&restored, &board);
        prop_assert_eq!(restored.to_fen(), fen);
    }

    /// Property: generated moves contain no duplicates under base-move
    /// equality, and each one moves a piece of the side to move
    #[test]
    fn prop_move_list_hygiene(seed in seed_strategy(), num_moves in move_count_strategy()) {
        let (board, _) = random_walk(seed, num_moves);
        let moves = MoveGenerator::new().generate_all_moves(&board);

        for (i, mv) in moves.iter().enumerate() {
            let piece = board.at(mv.from());
            prop_assert!(piece.is_some(), "{mv} moves from an empty square");
            prop_assert_eq!(piece.unwrap().color(), board.color_to_move());

            for other in &moves[i + 1..] {
                prop_assert!(!mv.same_base_move(other), "duplicate {mv}");
            }
        }
    }

    /// Property: the check flag agrees with the attack data; a legal move
    /// never leaves the mover's own king attacked
    #[test]
    fn prop_check_flag_matches_attack_data(seed in seed_strategy(), num_moves in move_count_strategy()) {
        let (mut board, _) = random_walk(seed, num_moves);
        let mut movegen = MoveGenerator::new();

        movegen.generate_attack_data(&board);
        let king = board.king_square(board.color_to_move()).unwrap();
        prop_assert_eq!(movegen.is_check(), movegen.attacked_squares().get(king));

        let color = board.color_to_move();
        let moves = movegen.generate_all_moves(&board);
        for mv in &moves {
            board.apply_move(mv);

            // from the opponent's perspective, our king must be safe
            board.switch_perspective();
            movegen.generate_attack_data(&board);
            let our_king = board.king_square(color).unwrap();
            prop_assert!(
                !movegen.attacked_squares().get(our_king),
                "{} left its own king attacked", mv
            );
            board.switch_perspective();

            board.rewind_move().unwrap();
        }
    }

    /// Property: parsed move text round-trips through the generator's
    /// base-move matching
    #[test]
    fn prop_uci_round_trip_via_matching(seed in seed_strategy(), num_moves in move_count_strategy()) {
        let (board, _) = random_walk(seed, num_moves);
        let moves = MoveGenerator::new().generate_all_moves(&board);

        for mv in &moves {
            let parsed = Move::from_uci(&mv.to_uci()).unwrap();
            prop_assert!(parsed.same_base_move(mv));
        }
    }
}
