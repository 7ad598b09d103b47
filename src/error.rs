//! Error type shared by move input, move execution and search.
//!
//! Illegal or malformed input is reported through `ChessError` and never
//! mutates the board. Broken internal invariants (a missing king, a history
//! stack that does not match the number of applied moves) are bugs and panic
//! instead of surfacing here.

use thiserror::Error;

use crate::moves::Square;
use crate::piece::Color;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChessError {
    /// Square index outside 0..=63.
    #[error("invalid square index: {0} (must be 0-63)")]
    InvalidSquare(usize),

    /// Text that is not a square name or a move in `e2e4` form.
    #[error("invalid notation: {0:?}")]
    InvalidNotation(String),

    #[error("no piece at {0}")]
    EmptySquare(Square),

    #[error("piece at {square} belongs to {owner}, but {to_move} is to move")]
    NotYourPiece {
        square: Square,
        owner: Color,
        to_move: Color,
    },

    #[error("illegal move: {from} to {to}")]
    IllegalMove { from: Square, to: Square },

    /// A move or search was requested for a side that is not to move.
    #[error("{0} is not the side to move")]
    NotToMove(Color),

    #[error("{0} has no legal moves")]
    NoLegalMoves(Color),

    #[error("the game is already over")]
    GameOver,

    #[error("invalid FEN: {0}")]
    InvalidFen(String),

    /// Promotion to a pawn or a king.
    #[error("cannot promote to {0}")]
    InvalidPromotion(crate::piece::PieceKind),
}

pub type Result<T> = std::result::Result<T, ChessError>;
