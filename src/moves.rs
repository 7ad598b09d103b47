use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ChessError, Result};
use crate::piece::PieceKind;

/// Index into the 64-cell board, row-major from a8 (0) to h1 (63).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct Square(u8);

impl Square {
    pub fn new(index: usize) -> Result<Square> {
        if index < 64 {
            Ok(Square(index as u8))
        } else {
            Err(ChessError::InvalidSquare(index))
        }
    }

    pub fn from_coords(row: usize, col: usize) -> Option<Square> {
        (row < 8 && col < 8).then(|| Square((row * 8 + col) as u8))
    }

    /// All squares in index order.
    pub fn all() -> impl Iterator<Item = Square> {
        (0..64u8).map(Square)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Row on the visual board, 0 being rank 8.
    pub fn row(self) -> usize {
        self.index() / 8
    }

    pub fn col(self) -> usize {
        self.index() % 8
    }

    /// Step by whole rows and columns. Returns `None` instead of wrapping
    /// onto the next row when the column leaves the board.
    pub fn offset(self, drow: i32, dcol: i32) -> Option<Square> {
        let row = self.row() as i32 + drow;
        let col = self.col() as i32 + dcol;
        if (0..8).contains(&row) && (0..8).contains(&col) {
            Some(Square((row * 8 + col) as u8))
        } else {
            None
        }
    }

    /// Same square seen from the other side of the board (rank reflected).
    pub fn mirror(self) -> Square {
        Square(((7 - self.row()) * 8 + self.col()) as u8)
    }

    /// Parse a square name such as `e2`.
    pub fn parse(s: &str) -> Result<Square> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(ChessError::InvalidNotation(s.to_string()));
        }
        let (file, rank) = (bytes[0], bytes[1]);
        if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
            return Err(ChessError::InvalidNotation(s.to_string()));
        }
        let col = (file - b'a') as usize;
        let row = 7 - (rank - b'1') as usize;
        Ok(Square((row * 8 + col) as u8))
    }
}

impl TryFrom<usize> for Square {
    type Error = ChessError;

    fn try_from(index: usize) -> Result<Square> {
        Square::new(index)
    }
}

impl From<Square> for usize {
    fn from(sq: Square) -> usize {
        sq.index()
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = (b'a' + self.col() as u8) as char;
        let rank = 8 - self.row();
        write!(f, "{file}{rank}")
    }
}

/// A move as a pair of squares. Castling is a two-square king move, and
/// promotion and en passant are implied by the position it is played in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub from: Square,
    pub to: Square,
}

impl Move {
    pub fn new(from: Square, to: Square) -> Self {
        Move { from, to }
    }

    /// Convert to UCI notation, e.g. "e2e4".
    pub fn to_uci(&self) -> String {
        self.to_string()
    }

    /// Parse from UCI notation. A trailing promotion letter (`e7e8n`) is
    /// returned separately since the move itself does not carry it.
    pub fn from_uci(s: &str) -> Result<(Move, Option<PieceKind>)> {
        let s = s.trim();
        if !(4..=5).contains(&s.len()) || !s.is_ascii() {
            return Err(ChessError::InvalidNotation(s.to_string()));
        }
        let from = Square::parse(&s[0..2])?;
        let to = Square::parse(&s[2..4])?;
        let promotion = match s[4..].chars().next() {
            Some(c) => Some(
                PieceKind::from_char(c).ok_or_else(|| ChessError::InvalidNotation(s.to_string()))?,
            ),
            None => None,
        };
        Ok((Move { from, to }, promotion))
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)
    }
}
