use std::fmt;

use anyhow::{anyhow, bail, Result};
use log::debug;

use crate::{
    square::{OFF_BOARD, PADDED_TO_COMPACT},
    Bitboard, ChessError, Color, File, Move, PaddedSquare, Piece, PieceKind, Rank, Square,
    NUM_PIECES,
};

pub const FEN_STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// One entry of the padded 10x12 mailbox.
///
/// Guard squares hold [`Slot::OffBoard`], which is distinct from an empty
/// playing square: a mailbox walk detects the edge of the board with a
/// single read.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Slot {
    OffBoard,
    Empty,
    Occupied(Piece),
}

const EMPTY_MAILBOX: [Slot; PaddedSquare::COUNT] = {
    let mut mailbox = [Slot::OffBoard; PaddedSquare::COUNT];
    let mut i = 0;
    while i < PaddedSquare::COUNT {
        if PADDED_TO_COMPACT[i] != OFF_BOARD {
            mailbox[i] = Slot::Empty;
        }
        i += 1;
    }
    mailbox
};

/// The castling rights of both players.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Default)]
pub struct CastlingRights {
    kingside: [bool; 2],
    queenside: [bool; 2],
}

impl CastlingRights {
    const fn none() -> Self {
        Self {
            kingside: [false; 2],
            queenside: [false; 2],
        }
    }

    fn from_uci(castling: &str) -> Result<Self> {
        if castling.is_empty() {
            bail!("Invalid castling rights: got empty string");
        }

        if castling != "-" && castling.chars().any(|ch| !"KQkq".contains(ch)) {
            bail!("Invalid castling rights: {castling}");
        }

        let mut kingside = [false; 2];
        let mut queenside = [false; 2];
        kingside[Color::White] = castling.contains('K');
        queenside[Color::White] = castling.contains('Q');
        kingside[Color::Black] = castling.contains('k');
        queenside[Color::Black] = castling.contains('q');
        Ok(Self {
            kingside,
            queenside,
        })
    }

    fn to_uci(self) -> String {
        let mut castling = String::with_capacity(4);

        if self.kingside[Color::White] {
            castling.push('K');
        }
        if self.queenside[Color::White] {
            castling.push('Q');
        }
        if self.kingside[Color::Black] {
            castling.push('k');
        }
        if self.queenside[Color::Black] {
            castling.push('q');
        }

        if castling.is_empty() {
            String::from("-")
        } else {
            castling
        }
    }

    pub const fn kingside(&self, color: Color) -> bool {
        self.kingside[color.index()]
    }

    pub const fn queenside(&self, color: Color) -> bool {
        self.queenside[color.index()]
    }
}

impl fmt::Display for CastlingRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uci())
    }
}

/// Everything that changes when a move is applied: the full snapshot the
/// undo stack stores.
#[derive(Clone, PartialEq, Eq)]
struct BoardState {
    /// The padded mailbox: piece-by-square, guard squares included.
    mailbox: [Slot; PaddedSquare::COUNT],

    /// One bitboard per (kind, color), indexed by [`Piece::index`].
    pieces: [Bitboard; NUM_PIECES],

    /// Union of the twelve piece bitboards, kept in lockstep with them.
    occupied: Bitboard,

    color_to_move: Color,
    castling: CastlingRights,

    /// The square a pawn would land on when capturing en passant.
    ep_target: Option<Square>,

    /// The square the capturable pawn actually occupies.
    ep_victim: Option<Square>,

    halfmove: u32,
    fullmove: u32,
}

impl BoardState {
    const fn empty() -> Self {
        Self {
            mailbox: EMPTY_MAILBOX,
            pieces: [Bitboard::EMPTY; NUM_PIECES],
            occupied: Bitboard::EMPTY,
            color_to_move: Color::White,
            castling: CastlingRights::none(),
            ep_target: None,
            ep_victim: None,
            halfmove: 0,
            fullmove: 1,
        }
    }

    fn place(&mut self, square: Square, piece: Piece) {
        self.mailbox[square.to_padded().index()] = Slot::Occupied(piece);
        self.pieces[piece].set(square);
        self.occupied.set(square);
    }

    fn remove(&mut self, square: Square) -> Option<Piece> {
        let padded = square.to_padded().index();
        let Slot::Occupied(piece) = self.mailbox[padded] else {
            return None;
        };

        self.mailbox[padded] = Slot::Empty;
        self.pieces[piece].clear(square);
        self.occupied.clear(square);
        Some(piece)
    }
}

/// A chess position: the padded mailbox and the per-piece bitboards,
/// maintained in lockstep, plus side to move, castling rights, the en
/// passant state and the undo stack.
///
/// The board is the single source of truth. It is constructed empty,
/// populated by [`Board::load_from_fen`] or [`Board::place_piece`],
/// mutated in place by [`Board::apply_move`] and rewound by
/// [`Board::rewind_move`].
#[derive(Clone)]
pub struct Board {
    state: BoardState,
    history: Vec<BoardState>,
}

impl Board {
    /// An empty board: no pieces, White to move, no castling rights.
    pub fn new() -> Self {
        Self {
            state: BoardState::empty(),
            history: Vec::new(),
        }
    }

    /// The standard starting position.
    pub fn standard_setup() -> Self {
        // Safe unwrap because the FEN for startpos is always valid
        Self::from_fen(FEN_STARTPOS).unwrap()
    }

    pub fn from_fen(fen: &str) -> Result<Self> {
        let mut board = Self::new();
        board.load_from_fen(fen)?;
        Ok(board)
    }

    /// Replaces the position with the one described by `fen` and resets
    /// the undo stack. On a parse error the board is left unchanged.
    pub fn load_from_fen(&mut self, fen: &str) -> Result<()> {
        let mut state = BoardState::empty();
        let mut parts = fen.split_ascii_whitespace();

        let placements = parts
            .next()
            .ok_or_else(|| anyhow!("Invalid FEN string: missing piece placements"))?;
        if placements.matches('/').count() != 7 {
            bail!("Invalid FEN string: expected placements for all 8 ranks");
        }

        // FEN lists rank 8 first, so reverse to keep White at low indices
        for (rank, row) in placements.split('/').rev().enumerate() {
            let mut file: u8 = 0;

            for ch in row.chars() {
                if let Some(skipped) = ch.to_digit(10) {
                    file += skipped as u8;
                } else {
                    let piece = Piece::from_char(ch)?;
                    if file >= 8 {
                        bail!("Invalid FEN string: too many placements on rank {rank}");
                    }
                    let square =
                        Square::new(File::new_unchecked(file), Rank::new_unchecked(rank as u8));
                    state.place(square, piece);
                    file += 1;
                }
            }

            if file != 8 {
                bail!("Invalid FEN string: rank {rank} describes {file} files, expected 8");
            }
        }

        state.color_to_move = Color::from_str(parts.next().unwrap_or("w"))?;
        state.castling = CastlingRights::from_uci(parts.next().unwrap_or("-"))?;

        state.ep_target = match parts.next().unwrap_or("-") {
            "-" => None,
            square => Some(Square::from_uci(square)?),
        };
        state.ep_victim = match state.ep_target {
            Some(target) => Some(
                target
                    .backward_by(state.color_to_move, 1)
                    .ok_or_else(|| anyhow!("Invalid FEN string: bad en passant square"))?,
            ),
            None => None,
        };

        let halfmove = parts.next().unwrap_or("0");
        state.halfmove = halfmove
            .parse()
            .map_err(|_| anyhow!("Invalid FEN string: bad halfmove counter {halfmove}"))?;

        let fullmove = parts.next().unwrap_or("1");
        state.fullmove = fullmove
            .parse()
            .map_err(|_| anyhow!("Invalid FEN string: bad fullmove counter {fullmove}"))?;

        self.state = state;
        self.history.clear();
        debug!("loaded position {}", self.to_fen());
        Ok(())
    }

    /// Writes the position as a FEN string. Inverse of
    /// [`Board::load_from_fen`] for every position this crate can reach.
    pub fn to_fen(&self) -> String {
        let mut placements: [String; 8] = Default::default();

        for rank in Rank::iter() {
            let mut empty_squares = 0;
            for file in File::iter() {
                if let Some(piece) = self.at(Square::new(file, rank)) {
                    if empty_squares != 0 {
                        placements[rank.index()] += &empty_squares.to_string();
                        empty_squares = 0;
                    }
                    placements[rank.index()].push(piece.char());
                } else {
                    empty_squares += 1;
                }
            }

            if empty_squares != 0 {
                placements[rank.index()] += &empty_squares.to_string();
            }
        }
        placements.reverse();

        let placements = placements.join("/");
        let color = self.state.color_to_move;
        let castling = self.state.castling.to_uci();
        let ep = match self.state.ep_target {
            Some(square) => square.to_string(),
            None => String::from("-"),
        };
        let halfmove = self.state.halfmove;
        let fullmove = self.state.fullmove;

        format!("{placements} {color} {castling} {ep} {halfmove} {fullmove}")
    }

    /// The piece at `square`, if any.
    pub fn at(&self, square: Square) -> Option<Piece> {
        match self.state.mailbox[square.to_padded().index()] {
            Slot::Occupied(piece) => Some(piece),
            _ => None,
        }
    }

    /// Direct mailbox access in the padded form, guard squares included.
    pub fn at_padded(&self, square: PaddedSquare) -> Slot {
        self.state.mailbox[square.index()]
    }

    pub fn is_occupied(&self, square: Square) -> bool {
        self.state.occupied.get(square)
    }

    /// Whether the piece on `square` belongs to the side to move.
    ///
    /// Must only be called on occupied squares; the answer for an empty
    /// square is meaningless.
    pub fn is_friendly(&self, square: Square) -> bool {
        debug_assert!(
            self.is_occupied(square),
            "is_friendly queried on empty square {square}"
        );
        match self.at(square) {
            Some(piece) => piece.color() == self.state.color_to_move,
            None => false,
        }
    }

    /// Places `piece` on an empty square, updating mailbox and bitboards.
    pub fn place_piece(&mut self, square: Square, piece: Piece) {
        debug_assert!(
            !self.is_occupied(square),
            "place_piece onto occupied square {square}"
        );
        self.state.place(square, piece);
    }

    /// Removes the piece on `square`, updating mailbox and bitboards.
    pub fn remove_piece(&mut self, square: Square) {
        debug_assert!(
            self.is_occupied(square),
            "remove_piece from empty square {square}"
        );
        self.state.remove(square);
    }

    /// Applies `mv`, pushing the pre-move state onto the undo stack.
    ///
    /// Legality is not enforced here; feed this only moves produced by the
    /// generator (or matched against them).
    pub fn apply_move(&mut self, mv: &Move) {
        self.history.push(self.state.clone());
        self.apply_move_inner(mv);
    }

    fn apply_move_inner(&mut self, mv: &Move) {
        let Some(piece) = self.at(mv.from()) else {
            return;
        };
        let color = piece.color();
        let mut resets_halfmove = piece.kind() == PieceKind::Pawn;

        if mv.is_en_passant() {
            if let Some(victim) = self.state.ep_victim {
                self.state.remove(victim);
                resets_halfmove = true;
            }
        } else if self.is_occupied(mv.to()) {
            self.state.remove(mv.to());
            // a rook captured on its home corner forfeits that right
            self.revoke_castling(mv.to());
            resets_halfmove = true;
        }

        self.state.remove(mv.from());
        let placed = match mv.promotion() {
            Some(kind) => piece.promoted(kind),
            None => piece,
        };
        self.state.place(mv.to(), placed);

        if mv.is_castling() {
            // the rook shift shares this move's snapshot
            if let Some(rook_shift) = mv.auxiliary() {
                if let Some(rook) = self.at(rook_shift.from()) {
                    self.state.remove(rook_shift.from());
                    self.state.place(rook_shift.to(), rook);
                }
            }
        }

        self.revoke_castling(mv.from());

        if mv.is_double_pawn_push() {
            self.state.ep_target = mv.from().forward_by(color, 1);
            self.state.ep_victim = Some(mv.to());
        } else {
            self.state.ep_target = None;
            self.state.ep_victim = None;
        }

        if resets_halfmove {
            self.state.halfmove = 0;
        } else {
            self.state.halfmove += 1;
        }
        if color.is_black() {
            self.state.fullmove += 1;
        }
        self.state.color_to_move = color.opponent();
    }

    /// Moves pieces without touching side-to-move, castling rights, en
    /// passant state or the undo stack. For hypothetical placement only;
    /// [`Board::rewind_move`] cannot undo it.
    pub fn apply_move_static(&mut self, mv: &Move) {
        let Some(piece) = self.at(mv.from()) else {
            return;
        };

        if mv.is_en_passant() {
            if let Some(victim) = self.state.ep_victim {
                self.state.remove(victim);
            }
        } else if self.is_occupied(mv.to()) {
            self.state.remove(mv.to());
        }

        self.state.remove(mv.from());
        let placed = match mv.promotion() {
            Some(kind) => piece.promoted(kind),
            None => piece,
        };
        self.state.place(mv.to(), placed);

        if let Some(aux) = mv.auxiliary() {
            self.apply_move_static(aux);
        }
    }

    /// Pops the undo stack, restoring the position before the last
    /// [`Board::apply_move`].
    pub fn rewind_move(&mut self) -> Result<(), ChessError> {
        self.state = self.history.pop().ok_or(ChessError::NothingToRewind)?;
        Ok(())
    }

    /// Flips the side to move without moving any pieces.
    pub fn switch_perspective(&mut self) {
        self.state.color_to_move = self.state.color_to_move.opponent();
    }

    fn revoke_castling(&mut self, square: Square) {
        let rights = &mut self.state.castling;
        match square {
            Square::E1 => {
                rights.kingside[Color::White] = false;
                rights.queenside[Color::White] = false;
            }
            Square::H1 => rights.kingside[Color::White] = false,
            Square::A1 => rights.queenside[Color::White] = false,
            Square::E8 => {
                rights.kingside[Color::Black] = false;
                rights.queenside[Color::Black] = false;
            }
            Square::H8 => rights.kingside[Color::Black] = false,
            Square::A8 => rights.queenside[Color::Black] = false,
            _ => {}
        }
    }

    pub const fn color_to_move(&self) -> Color {
        self.state.color_to_move
    }

    pub const fn castling_rights(&self) -> &CastlingRights {
        &self.state.castling
    }

    /// The square a pawn would move to when capturing en passant, or
    /// `None` when the previous half-move was not a double push.
    pub const fn en_passant_square(&self) -> Option<Square> {
        self.state.ep_target
    }

    /// The square the en-passant-capturable pawn occupies.
    pub const fn en_passant_victim(&self) -> Option<Square> {
        self.state.ep_victim
    }

    pub const fn halfmove(&self) -> u32 {
        self.state.halfmove
    }

    pub const fn fullmove(&self) -> u32 {
        self.state.fullmove
    }

    /// The bitboard holding every piece equal to `piece`.
    pub const fn bitboard(&self, piece: Piece) -> Bitboard {
        self.state.pieces[piece.index()]
    }

    /// The union of all twelve piece bitboards.
    pub const fn occupied(&self) -> Bitboard {
        self.state.occupied
    }

    /// All squares occupied by `color`.
    pub fn color_occupancy(&self, color: Color) -> Bitboard {
        let base = if color.is_white() { 0 } else { 6 };
        self.state.pieces[base..base + 6]
            .iter()
            .fold(Bitboard::EMPTY, |acc, bb| acc | *bb)
    }

    /// Where `color`'s king stands, or `None` on a kingless board.
    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.bitboard(Piece::new(color, PieceKind::King)).lsb()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Board {
    /// Two boards are equal when their current positions are bitwise
    /// equal; their histories are not compared.
    fn eq(&self, other: &Self) -> bool {
        self.state == other.state
    }
}

impl Eq for Board {}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut board = String::with_capacity(198);

        for rank in Rank::iter().rev() {
            board += &format!("{rank}| ");

            for file in File::iter() {
                let occupant = match self.at(Square::new(file, rank)) {
                    Some(piece) => piece.char(),
                    None => '.',
                };
                board.push(occupant);
                board.push(' ');
            }

            board.push('\n');
        }
        board += " +";
        for _ in File::iter() {
            board += "--";
        }
        board += "\n   ";
        for file in File::iter() {
            board += &format!("{file} ");
        }

        write!(f, "{board}")
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}\nFEN: {}", self.to_fen())
    }
}
