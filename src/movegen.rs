use crate::{tables, Bitboard, Board, Color, Direction, Move, Piece, PieceKind, Rank, Square};

/// Upper bound on the number of moves in any reachable position.
///
/// https://www.chessprogramming.org/Chess_Position#cite_note-4
pub const MAX_MOVES_PER_POSITION: usize = 218;

/// Produces the exact set of legal moves for a position's side to move.
///
/// Generation runs in two phases. [`MoveGenerator::generate_attack_data`]
/// computes the opponent's attacked squares (with the friendly king
/// treated as transparent), the absolutely pinned pieces and the checking
/// pieces. [`MoveGenerator::generate_all_moves`] then emits pseudo-legal
/// moves and filters them against that data, counting every rejection in
/// [`MoveGenerator::filtered_out`].
///
/// The generator never fails: a position with no friendly king simply
/// yields whatever pseudo-legal moves exist, and an empty board yields an
/// empty list.
#[derive(Clone, Debug, Default)]
pub struct MoveGenerator {
    /// Squares the opponent attacks, king-transparent.
    attacked: Bitboard,

    /// Squares attacked by enemy sliders along orthogonals.
    attacked_by_rook: Bitboard,

    /// Squares attacked by enemy sliders along diagonals.
    attacked_by_bishop: Bitboard,

    /// Friendly pieces absolutely pinned to the friendly king.
    pinned: Bitboard,

    /// Enemy pieces currently giving check.
    checkers: Bitboard,

    /// When in single check: the checker plus the squares between it and
    /// the king. Full board otherwise.
    check_mask: Bitboard,

    king_square: Option<Square>,

    filtered_out: u64,

    /// Scratch board for UI display. The generator never reads it.
    pub debug_bitboard: Bitboard,
}

impl MoveGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the attack, pin and check data for `board`'s side to move.
    ///
    /// Called by [`MoveGenerator::generate_all_moves`]; exposed separately
    /// so callers can inspect attack data without generating moves.
    pub fn generate_attack_data(&mut self, board: &Board) {
        let us = board.color_to_move();
        let them = us.opponent();

        self.attacked = Bitboard::EMPTY;
        self.attacked_by_rook = Bitboard::EMPTY;
        self.attacked_by_bishop = Bitboard::EMPTY;
        self.checkers = Bitboard::EMPTY;
        self.pinned = Bitboard::EMPTY;
        self.king_square = board.king_square(us);

        let king_bb = Bitboard::from(self.king_square);

        // The friendly king is transparent to enemy rays, so squares
        // x-rayed through him stay marked and he cannot retreat along a
        // ray he is checked on.
        let blockers = board.occupied() ^ king_bb;

        for pawn in board.bitboard(Piece::new(them, PieceKind::Pawn)) {
            let attacks = pawn_attack_targets(pawn, them);
            self.attacked |= attacks;
            if attacks.intersects(king_bb) {
                self.checkers.set(pawn);
            }
        }

        for knight in board.bitboard(Piece::new(them, PieceKind::Knight)) {
            let attacks = tables::knight_targets(knight);
            self.attacked |= attacks;
            if attacks.intersects(king_bb) {
                self.checkers.set(knight);
            }
        }

        for king in board.bitboard(Piece::new(them, PieceKind::King)) {
            self.attacked |= tables::king_targets(king);
        }

        let queens = board.bitboard(Piece::new(them, PieceKind::Queen));
        for slider in board.bitboard(Piece::new(them, PieceKind::Rook)) | queens {
            self.walk_slider_attacks(slider, &Direction::ROOK, blockers, king_bb);
        }
        for slider in board.bitboard(Piece::new(them, PieceKind::Bishop)) | queens {
            self.walk_slider_attacks(slider, &Direction::BISHOP, blockers, king_bb);
        }

        self.find_pins(board, us);

        self.check_mask = if self.checkers.is_empty() {
            Bitboard::FULL
        } else {
            // capture the checker or interpose between it and the king
            let mut mask = self.checkers;
            if let Some(king) = self.king_square {
                for checker in self.checkers {
                    mask |= tables::obstructed(king, checker);
                }
            }
            mask
        };
    }

    fn walk_slider_attacks(
        &mut self,
        slider: Square,
        directions: &[Direction],
        blockers: Bitboard,
        king_bb: Bitboard,
    ) {
        for &dir in directions {
            let mut ray_attacks = Bitboard::EMPTY;

            for square in tables::ray(slider, dir).squares() {
                ray_attacks.set(square);
                if king_bb.get(square) {
                    self.checkers.set(slider);
                }
                if blockers.get(square) {
                    break;
                }
            }

            self.attacked |= ray_attacks;
            if dir.is_orthogonal() {
                self.attacked_by_rook |= ray_attacks;
            } else {
                self.attacked_by_bishop |= ray_attacks;
            }
        }
    }

    /// A piece is pinned iff it is the only piece on the segment between
    /// the king and an enemy slider attacking along that segment's axis.
    fn find_pins(&mut self, board: &Board, us: Color) {
        let Some(king) = self.king_square else {
            return;
        };

        for dir in Direction::ALL {
            let mut shield: Option<Square> = None;

            for square in tables::ray(king, dir).squares() {
                let Some(piece) = board.at(square) else {
                    continue;
                };

                if piece.color() == us {
                    if shield.is_some() {
                        break;
                    }
                    shield = Some(square);
                } else {
                    let pins_along = match piece.kind() {
                        PieceKind::Queen => true,
                        PieceKind::Rook => dir.is_orthogonal(),
                        PieceKind::Bishop => !dir.is_orthogonal(),
                        _ => false,
                    };
                    if pins_along {
                        if let Some(pinned) = shield {
                            self.pinned.set(pinned);
                        }
                    }
                    break;
                }
            }
        }
    }

    /// Generates every legal move for `board`'s side to move.
    pub fn generate_all_moves(&mut self, board: &Board) -> Vec<Move> {
        self.generate_attack_data(board);

        let mut moves = Vec::with_capacity(MAX_MOVES_PER_POSITION);
        let color = board.color_to_move();
        let friendly = board.color_occupancy(color);

        self.generate_sliding_moves(board, color, &mut moves);
        self.generate_knight_moves(board, color, friendly, &mut moves);
        self.generate_king_moves(board, color, friendly, &mut moves);
        self.generate_pawn_moves(board, color, &mut moves);

        let pseudo_legal = moves.len();
        moves.retain(|mv| self.is_legal(board, mv));
        self.filtered_out = (pseudo_legal - moves.len()) as u64;

        moves
    }

    fn generate_sliding_moves(&self, board: &Board, color: Color, moves: &mut Vec<Move>) {
        let pieces: [(PieceKind, &[Direction]); 3] = [
            (PieceKind::Rook, &Direction::ROOK),
            (PieceKind::Bishop, &Direction::BISHOP),
            (PieceKind::Queen, &Direction::ALL),
        ];

        for (kind, directions) in pieces {
            for from in board.bitboard(Piece::new(color, kind)) {
                for &dir in directions {
                    for to in tables::ray(from, dir).squares() {
                        match board.at(to) {
                            None => moves.push(Move::new(from, to)),
                            Some(target) if target.color() != color => {
                                moves.push(Move::new(from, to));
                                break;
                            }
                            Some(_) => break,
                        }
                    }
                }
            }
        }
    }

    fn generate_knight_moves(
        &self,
        board: &Board,
        color: Color,
        friendly: Bitboard,
        moves: &mut Vec<Move>,
    ) {
        for from in board.bitboard(Piece::new(color, PieceKind::Knight)) {
            for to in tables::knight_targets(from) & !friendly {
                moves.push(Move::new(from, to));
            }
        }
    }

    fn generate_king_moves(
        &self,
        board: &Board,
        color: Color,
        friendly: Bitboard,
        moves: &mut Vec<Move>,
    ) {
        for from in board.bitboard(Piece::new(color, PieceKind::King)) {
            for to in tables::king_targets(from) & !friendly {
                moves.push(Move::new(from, to));
            }
        }

        // Castling, anchored to the standard home squares. Emission only
        // checks the geometric preconditions (right still held, rook in
        // place, nothing in between); attacked-square rules are applied
        // by the legality filter.
        let king = Piece::new(color, PieceKind::King);
        let rook = Piece::new(color, PieceKind::Rook);

        let (king_home, kingside, queenside) = match color {
            Color::White => (Square::E1, Square::H1, Square::A1),
            Color::Black => (Square::E8, Square::H8, Square::A8),
        };
        if board.at(king_home) != Some(king) {
            return;
        }

        if board.castling_rights().kingside(color)
            && board.at(kingside) == Some(rook)
            && !board
                .occupied()
                .intersects(tables::obstructed(king_home, kingside))
        {
            let (to, rook_to) = match color {
                Color::White => (Square::G1, Square::F1),
                Color::Black => (Square::G8, Square::F8),
            };
            moves.push(Move::castling(king_home, to, kingside, rook_to));
        }

        if board.castling_rights().queenside(color)
            && board.at(queenside) == Some(rook)
            && !board
                .occupied()
                .intersects(tables::obstructed(king_home, queenside))
        {
            let (to, rook_to) = match color {
                Color::White => (Square::C1, Square::D1),
                Color::Black => (Square::C8, Square::D8),
            };
            moves.push(Move::castling(king_home, to, queenside, rook_to));
        }
    }

    fn generate_pawn_moves(&self, board: &Board, color: Color, moves: &mut Vec<Move>) {
        for from in board.bitboard(Piece::new(color, PieceKind::Pawn)) {
            let Some(ahead) = from.forward_by(color, 1) else {
                continue;
            };

            if !board.is_occupied(ahead) {
                push_pawn_move(moves, color, from, ahead);

                if from.rank() == Rank::second(color) {
                    if let Some(two_ahead) = from.forward_by(color, 2) {
                        if !board.is_occupied(two_ahead) {
                            moves.push(Move::double_push(from, two_ahead));
                        }
                    }
                }
            }

            for to in [ahead.west(), ahead.east()].into_iter().flatten() {
                if let Some(target) = board.at(to) {
                    if target.color() != color {
                        push_pawn_move(moves, color, from, to);
                    }
                } else if Some(to) == board.en_passant_square() {
                    moves.push(Move::en_passant(from, to));
                }
            }
        }
    }

    /// Applies the legality rules to one pseudo-legal move.
    fn is_legal(&self, board: &Board, mv: &Move) -> bool {
        let Some(king) = self.king_square else {
            // no king to endanger
            return true;
        };
        let Some(piece) = board.at(mv.from()) else {
            return false;
        };
        let in_check = self.checkers.is_nonempty();

        if piece.kind() == PieceKind::King {
            if mv.is_castling() {
                if in_check {
                    return false;
                }
                // every square the king crosses, start and end inclusive
                let path = tables::obstructed(mv.from(), mv.to())
                    | mv.from().bitboard()
                    | mv.to().bitboard();
                return !path.intersects(self.attacked);
            }
            return !self.attacked.get(mv.to());
        }

        // in double check only the king may move
        if self.checkers.population() > 1 {
            return false;
        }

        if mv.is_en_passant() {
            // removing two pawns at once can expose the king in ways
            // ordinary pin detection misses, so simulate the capture
            return self.en_passant_leaves_king_safe(board, mv, king);
        }

        if in_check && !self.check_mask.get(mv.to()) {
            return false;
        }

        if self.pinned.get(mv.from()) {
            return tables::line_through(king, mv.from()).get(mv.to());
        }

        true
    }

    /// Probes every attack axis to the king over the occupancy that would
    /// result from the en passant capture.
    fn en_passant_leaves_king_safe(&self, board: &Board, mv: &Move, king: Square) -> bool {
        let Some(victim) = board.en_passant_victim() else {
            return false;
        };
        let us = board.color_to_move();
        let them = us.opponent();

        let occupied =
            (board.occupied() ^ mv.from().bitboard() ^ victim.bitboard()) | mv.to().bitboard();

        for dir in Direction::ALL {
            for square in tables::ray(king, dir).squares() {
                if !occupied.get(square) {
                    continue;
                }
                if square == mv.to() {
                    // the capturing pawn now blocks this ray
                    break;
                }
                let Some(piece) = board.at(square) else {
                    break;
                };
                if piece.color() == them {
                    let attacks_along = match piece.kind() {
                        PieceKind::Queen => true,
                        PieceKind::Rook => dir.is_orthogonal(),
                        PieceKind::Bishop => !dir.is_orthogonal(),
                        _ => false,
                    };
                    if attacks_along {
                        return false;
                    }
                }
                break;
            }
        }

        // knight and pawn checks survive the capture untouched, except by
        // the removal of the victim itself
        if tables::knight_targets(king)
            .intersects(board.bitboard(Piece::new(them, PieceKind::Knight)))
        {
            return false;
        }
        let enemy_pawns = board.bitboard(Piece::new(them, PieceKind::Pawn)) ^ victim.bitboard();
        if pawn_attack_targets(king, us).intersects(enemy_pawns) {
            return false;
        }

        true
    }

    /// Squares the opponent attacks, computed with the friendly king
    /// transparent to slider rays.
    pub const fn attacked_squares(&self) -> Bitboard {
        self.attacked
    }

    /// The orthogonal subset of [`MoveGenerator::attacked_squares`].
    pub const fn attacked_squares_rook(&self) -> Bitboard {
        self.attacked_by_rook
    }

    /// The diagonal subset of [`MoveGenerator::attacked_squares`].
    pub const fn attacked_squares_bishop(&self) -> Bitboard {
        self.attacked_by_bishop
    }

    /// Friendly pieces absolutely pinned to the friendly king.
    pub const fn pinned_pieces(&self) -> Bitboard {
        self.pinned
    }

    /// The enemy pieces currently giving check.
    pub const fn checkers(&self) -> Bitboard {
        self.checkers
    }

    pub const fn is_check(&self) -> bool {
        self.checkers.is_nonempty()
    }

    pub const fn is_double_check(&self) -> bool {
        self.checkers.population() > 1
    }

    /// How many pseudo-legal moves the last
    /// [`MoveGenerator::generate_all_moves`] call rejected during
    /// legality filtering. Diagnostic only.
    pub const fn filtered_out(&self) -> u64 {
        self.filtered_out
    }
}

/// The two squares a pawn of `color` on `square` attacks.
fn pawn_attack_targets(square: Square, color: Color) -> Bitboard {
    let forward = match color {
        Color::White => Direction::North,
        Color::Black => Direction::South,
    };

    let mut attacks = Bitboard::EMPTY;
    let padded = square.to_padded();
    for delta in [forward.padded_delta() - 1, forward.padded_delta() + 1] {
        if let Some(target) = padded.offset(delta).to_square() {
            attacks.set(target);
        }
    }
    attacks
}

/// Pushes a pawn move, fanning out into the four promotions when it
/// reaches the last rank.
fn push_pawn_move(moves: &mut Vec<Move>, color: Color, from: Square, to: Square) {
    if to.rank() == Rank::eighth(color) {
        for kind in PieceKind::PROMOTIONS {
            moves.push(Move::promoting(from, to, kind));
        }
    } else {
        moves.push(Move::new(from, to));
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sq(s: &str) -> Square {
        Square::from_uci(s).unwrap()
    }

    #[test]
    fn test_check_detection() {
        let board = Board::from_fen("4k3/8/8/8/8/8/4R3/4K3 b - - 0 1").unwrap();
        let mut movegen = MoveGenerator::new();
        movegen.generate_attack_data(&board);

        assert!(movegen.is_check());
        assert!(!movegen.is_double_check());
        assert!(movegen.attacked_squares().get(Square::E8));
        assert_eq!(movegen.checkers(), sq("e2").bitboard());
    }

    #[test]
    fn test_double_check_detection() {
        // rook on e2 and bishop on b5 both hit the king on e8
        let board = Board::from_fen("4k3/8/8/1B6/8/8/4R3/4K3 b - - 0 1").unwrap();
        let mut movegen = MoveGenerator::new();
        movegen.generate_attack_data(&board);

        assert!(movegen.is_double_check());
        assert_eq!(movegen.checkers().population(), 2);

        // only king moves are generated, and none along the checking ray
        let moves = movegen.generate_all_moves(&board);
        assert!(moves.iter().all(|mv| mv.from() == Square::E8));
        assert!(!moves.iter().any(|mv| mv.to() == sq("e7")));
    }

    #[test]
    fn test_pin_detection() {
        // knight on e4 shields the black king from the rook on e1
        let board = Board::from_fen("4k3/8/8/8/4n3/8/8/4RK2 b - - 0 1").unwrap();
        let mut movegen = MoveGenerator::new();
        movegen.generate_attack_data(&board);

        assert_eq!(movegen.pinned_pieces(), sq("e4").bitboard());

        // a pinned knight has no legal moves at all
        let moves = movegen.generate_all_moves(&board);
        assert!(!moves.iter().any(|mv| mv.from() == sq("e4")));
    }

    #[test]
    fn test_xray_keeps_king_off_the_checking_ray() {
        // king in check from the west must not retreat east along the rank
        let board = Board::from_fen("8/8/8/r3K3/8/8/8/7k w - - 0 1").unwrap();
        let mut movegen = MoveGenerator::new();
        let moves = movegen.generate_all_moves(&board);

        assert!(!moves.iter().any(|mv| mv.to() == sq("f5")));
        assert!(moves.iter().any(|mv| mv.to() == sq("e6")));
    }

    #[test]
    fn test_filtered_out_counts_rejections() {
        let board = Board::from_fen("4k3/8/8/8/4n3/8/8/4RK2 b - - 0 1").unwrap();
        let mut movegen = MoveGenerator::new();
        let _ = movegen.generate_all_moves(&board);

        // the pinned knight's pseudo-legal moves were all rejected
        assert!(movegen.filtered_out() >= 8);
    }

    #[test]
    fn test_kingless_side_yields_no_moves_quietly() {
        let board = Board::from_fen("8/8/8/8/8/8/8/7K b - - 0 1").unwrap();
        let mut movegen = MoveGenerator::new();
        assert!(movegen.generate_all_moves(&board).is_empty());
    }
}
