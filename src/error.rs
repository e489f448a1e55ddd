use std::{error::Error, fmt};

/// Errors the caller is expected to recover from: malformed notation and
/// rewinding past the start of the game.
///
/// Invariant violations (desynced bitboards, placing onto an occupied
/// square) are not represented here; those are programmer errors and are
/// caught by `debug_assert!` in debug builds.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum ChessError {
    InvalidFileChar { val: char },
    InvalidRankChar { val: char },
    InvalidSquareNotation,
    InvalidPieceChar { val: char },
    InvalidColorStr,
    InvalidMoveNotation,
    NothingToRewind,
}

impl fmt::Display for ChessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFileChar { val } => write!(f, "file chars must be [a, h]. found {val}"),
            Self::InvalidRankChar { val } => write!(f, "rank chars must be [1, 8]. found {val}"),
            Self::InvalidSquareNotation => {
                write!(f, "square is not valid notation. notation must be <file><rank>")
            }
            Self::InvalidPieceChar { val } => write!(
                f,
                "pieces must be [p | n | b | r | q | k] or uppercase equivalent. found {val}"
            ),
            Self::InvalidColorStr => write!(f, "color strings must be `w` or `b`"),
            Self::InvalidMoveNotation => write!(
                f,
                "moves must be written as <from><to>[promotion], e.g. e2e4 or a7a8q"
            ),
            Self::NothingToRewind => write!(f, "no move to undo"),
        }
    }
}

impl Error for ChessError {}
