use std::fmt;

use serde::Serialize;

use crate::board::Board;
use crate::piece::{Color, PieceKind};

/// What a move did to the game, as seen from the side that has to answer it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Ongoing,
    /// The named side is in check but has a way out.
    Check(Color),
    Checkmate { winner: Color },
    Stalemate,
    InsufficientMaterial,
    ThreefoldRepetition,
}

impl Outcome {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Outcome::Ongoing | Outcome::Check(_))
    }

    /// Terminal outcomes that end the game without a winner.
    pub fn is_draw(self) -> bool {
        matches!(
            self,
            Outcome::Stalemate | Outcome::InsufficientMaterial | Outcome::ThreefoldRepetition
        )
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Ongoing => write!(f, "Game in progress"),
            Outcome::Check(color) => write!(f, "{color} is in check"),
            Outcome::Checkmate { winner } => write!(f, "{winner} wins by checkmate"),
            Outcome::Stalemate => write!(f, "Draw by stalemate"),
            Outcome::InsufficientMaterial => write!(f, "Draw by insufficient material"),
            Outcome::ThreefoldRepetition => write!(f, "Draw by threefold repetition"),
        }
    }
}

impl Board {
    /// Status of the game after `mover` has played, judged from the
    /// opponent's side. Checked in order: check (and mate), stalemate,
    /// insufficient material, threefold repetition. A side in check that can
    /// escape is reported as `Check` and the draw rules are not consulted.
    pub fn status_after(&self, mover: Color) -> Outcome {
        let defender = mover.opposite();
        let can_move = self.has_legal_move(defender);

        if self.is_in_check(defender) {
            return if can_move {
                Outcome::Check(defender)
            } else {
                Outcome::Checkmate { winner: mover }
            };
        }
        if !can_move {
            Outcome::Stalemate
        } else if self.has_insufficient_material() {
            Outcome::InsufficientMaterial
        } else if self.is_threefold_repetition() {
            Outcome::ThreefoldRepetition
        } else {
            Outcome::Ongoing
        }
    }

    /// Status after the last move, i.e. judged for the side to move now.
    pub fn status(&self) -> Outcome {
        self.status_after(self.current_player().opposite())
    }

    /// At most three occupied squares and none of them a pawn, rook or
    /// queen: king vs king, or king and one minor piece vs king.
    pub fn has_insufficient_material(&self) -> bool {
        let mut count = 0;
        for (_, piece) in self.pieces() {
            count += 1;
            if count > 3 || matches!(piece.kind, PieceKind::Pawn | PieceKind::Rook | PieceKind::Queen) {
                return false;
            }
        }
        true
    }

    /// The exact current position, flags included, has stood on the board
    /// at least three times.
    pub fn is_threefold_repetition(&self) -> bool {
        self.occurrences(&self.snapshot()) >= 3
    }
}
