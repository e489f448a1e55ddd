use std::fmt;

use crate::{ChessError, File, PieceKind, Square};

/// A move on the board.
///
/// The base fields are `from`, `to` and `promotion`; the flags record how
/// the move must be applied (castling, en passant, double pawn push).
/// Castling moves own the rook half of the maneuver as an
/// [`auxiliary`](Move::auxiliary) move, a value-owned box: destroying a
/// `Move` destroys its auxiliary with it.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct Move {
    from: Square,
    to: Square,
    promotion: Option<PieceKind>,
    is_castling: bool,
    is_en_passant: bool,
    is_double_pawn_push: bool,
    en_passant_file: Option<File>,
    auxiliary: Option<Box<Move>>,
}

impl Move {
    /// A plain move or capture with no special behavior.
    pub fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
            is_castling: false,
            is_en_passant: false,
            is_double_pawn_push: false,
            en_passant_file: None,
            auxiliary: None,
        }
    }

    /// A pawn move onto the last rank, becoming `promotion`.
    pub fn promoting(from: Square, to: Square, promotion: PieceKind) -> Self {
        Self {
            promotion: Some(promotion),
            ..Self::new(from, to)
        }
    }

    /// An en passant capture: the captured pawn is *not* on `to`.
    pub fn en_passant(from: Square, to: Square) -> Self {
        Self {
            is_en_passant: true,
            ..Self::new(from, to)
        }
    }

    /// A double pawn push, making the destination file capturable en
    /// passant on the next half-move.
    pub fn double_push(from: Square, to: Square) -> Self {
        Self {
            is_double_pawn_push: true,
            en_passant_file: Some(to.file()),
            ..Self::new(from, to)
        }
    }

    /// A castling move: `from`/`to` describe the king, the auxiliary move
    /// the rook.
    pub fn castling(from: Square, to: Square, rook_from: Square, rook_to: Square) -> Self {
        Self {
            is_castling: true,
            auxiliary: Some(Box::new(Self::new(rook_from, rook_to))),
            ..Self::new(from, to)
        }
    }

    pub const fn from(&self) -> Square {
        self.from
    }

    pub const fn to(&self) -> Square {
        self.to
    }

    pub const fn promotion(&self) -> Option<PieceKind> {
        self.promotion
    }

    pub const fn is_castling(&self) -> bool {
        self.is_castling
    }

    pub const fn is_en_passant(&self) -> bool {
        self.is_en_passant
    }

    pub const fn is_double_pawn_push(&self) -> bool {
        self.is_double_pawn_push
    }

    pub const fn en_passant_file(&self) -> Option<File> {
        self.en_passant_file
    }

    /// The rook half of a castling move, if any.
    pub fn auxiliary(&self) -> Option<&Move> {
        self.auxiliary.as_deref()
    }

    /// Equality over the base fields (`from`, `to`, `promotion`) only,
    /// ignoring flags. This is the predicate for matching user input
    /// against generated moves: a parsed `e1g1` matches the generated
    /// castling move even though the parsed form carries no flags.
    pub fn same_base_move(&self, other: &Self) -> bool {
        self.from == other.from && self.to == other.to && self.promotion == other.promotion
    }

    /// Parses a base move from coordinate notation: `<from><to>[promotion]`,
    /// e.g. `e2e4` or `a7a8q`. Flags are never set on a parsed move.
    pub fn from_uci(uci: &str) -> Result<Self, ChessError> {
        let from = uci.get(0..2).ok_or(ChessError::InvalidMoveNotation)?;
        let to = uci.get(2..4).ok_or(ChessError::InvalidMoveNotation)?;

        let from = Square::from_uci(from)?;
        let to = Square::from_uci(to)?;

        let mut mv = Self::new(from, to);
        match uci.get(4..) {
            None | Some("") => {}
            Some(promo) if promo.len() == 1 => {
                let kind = PieceKind::from_char(promo.chars().next().unwrap_or_default())?;
                if !matches!(
                    kind,
                    PieceKind::Queen | PieceKind::Rook | PieceKind::Bishop | PieceKind::Knight
                ) {
                    return Err(ChessError::InvalidMoveNotation);
                }
                mv.promotion = Some(kind);
            }
            Some(_) => return Err(ChessError::InvalidMoveNotation),
        }

        Ok(mv)
    }

    /// Writes this move in coordinate notation with a lowercase promotion
    /// character, the format used by perft output and external engines.
    pub fn to_uci(&self) -> String {
        if let Some(promotion) = self.promotion {
            format!(
                "{}{}{}",
                self.from,
                self.to,
                promotion.char().to_ascii_lowercase()
            )
        } else {
            format!("{}{}", self.from, self.to)
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uci())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_uci_round_trip() {
        let e2e4 = Move::from_uci("e2e4").unwrap();
        assert_eq!(e2e4.from(), Square::from_uci("e2").unwrap());
        assert_eq!(e2e4.to(), Square::from_uci("e4").unwrap());
        assert_eq!(e2e4.to_uci(), "e2e4");

        let promo = Move::from_uci("a7a8q").unwrap();
        assert_eq!(promo.promotion(), Some(PieceKind::Queen));
        assert_eq!(promo.to_uci(), "a7a8q");

        assert!(Move::from_uci("e2").is_err());
        assert!(Move::from_uci("e2e4k").is_err());
        assert!(Move::from_uci("e2e4qq").is_err());
    }

    #[test]
    fn test_base_move_equality_ignores_flags() {
        let parsed = Move::from_uci("e1g1").unwrap();
        let castle = Move::castling(Square::E1, Square::G1, Square::H1, Square::F1);

        assert!(parsed.same_base_move(&castle));
        assert_ne!(parsed, castle);

        let push = Move::double_push(
            Square::from_uci("e2").unwrap(),
            Square::from_uci("e4").unwrap(),
        );
        assert!(Move::from_uci("e2e4").unwrap().same_base_move(&push));

        // differing promotions are different base moves
        let q = Move::from_uci("a7a8q").unwrap();
        let n = Move::from_uci("a7a8n").unwrap();
        assert!(!q.same_base_move(&n));
    }

    #[test]
    fn test_castling_owns_its_auxiliary() {
        let castle = Move::castling(Square::E1, Square::C1, Square::A1, Square::D1);
        let rook = castle.auxiliary().unwrap();
        assert_eq!(rook.from(), Square::A1);
        assert_eq!(rook.to(), Square::D1);
        assert!(rook.auxiliary().is_none());
    }
}
