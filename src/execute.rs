//! Applying and reverting moves.
//!
//! `apply` and `undo` work as a stack: every successful `apply` pushes the
//! position it started from, and `undo` pops that snapshot and copies it back
//! wholesale. No move is ever reversed piece by piece, so castling, en
//! passant and promotion revert exactly like a quiet move.
//!
//! `play` wraps the pair in a guard that undoes on drop. Recursive callers
//! use it so that an early `return`, `?` or `break` still restores the board.

use std::ops::{Deref, DerefMut};

use tracing::trace;

use crate::board::Board;
use crate::error::{ChessError, Result};
use crate::moves::{Move, Square};
use crate::piece::{Piece, PieceKind};
use crate::status::Outcome;

impl Board {
    /// Play `mv` for the side to move, promoting pawns to a queen.
    pub fn apply(&mut self, mv: Move) -> Result<Outcome> {
        self.apply_with_promotion(mv, PieceKind::Queen)
    }

    /// Play `mv`, promoting to `promotion` if it is a pawn reaching the last
    /// rank. On error nothing has been changed.
    pub fn apply_with_promotion(&mut self, mv: Move, promotion: PieceKind) -> Result<Outcome> {
        if !promotion.is_promotion_choice() {
            return Err(ChessError::InvalidPromotion(promotion));
        }
        let piece = self.get(mv.from).ok_or(ChessError::EmptySquare(mv.from))?;
        let mover = self.current_player();
        if piece.color != mover {
            return Err(ChessError::NotYourPiece {
                square: mv.from,
                owner: piece.color,
                to_move: mover,
            });
        }
        if !self.is_legal(mv) {
            trace!(%mv, "rejected illegal move");
            return Err(ChessError::IllegalMove {
                from: mv.from,
                to: mv.to,
            });
        }

        let en_passant = self.is_en_passant_capture(mv);
        self.push_snapshot();

        if piece.kind == PieceKind::King && mv.from.col().abs_diff(mv.to.col()) == 2 {
            self.relocate_castling_rook(mv);
        }

        if en_passant {
            if let Some(victim) = mv.to.offset(-mover.forward(), 0) {
                self.set(victim, None);
            }
        }

        let mut moved = piece;
        moved.moved = true;
        if piece.kind == PieceKind::Pawn && mv.to.row() == mover.opposite().home_row() {
            moved.kind = promotion;
        }
        self.set(mv.from, None);
        self.set(mv.to, Some(moved));

        for p in self.cells_mut().iter_mut().flatten() {
            p.en_passant = false;
        }
        if piece.kind == PieceKind::Pawn && mv.from.row().abs_diff(mv.to.row()) == 2 {
            if let Some(pawn) = self.cells_mut()[mv.to.index()].as_mut() {
                pawn.en_passant = true;
            }
        }

        self.set_current_player(mover.opposite());
        let outcome = self.status_after(mover);
        if outcome.is_terminal() {
            trace!(%mv, %outcome, "move ends the game");
        }
        Ok(outcome)
    }

    fn relocate_castling_rook(&mut self, mv: Move) {
        let row = mv.from.row();
        let (rook_col, rook_to_col) = if mv.to.col() > mv.from.col() {
            (7, 5)
        } else {
            (0, 3)
        };
        let (Some(from), Some(to)) = (
            Square::from_coords(row, rook_col),
            Square::from_coords(row, rook_to_col),
        ) else {
            return;
        };
        let rook = self.get(from).map(|r| Piece { moved: true, ..r });
        self.set(from, None);
        self.set(to, rook);
    }

    /// Revert the most recent `apply`.
    ///
    /// Panics when nothing has been applied: an unmatched undo means the
    /// apply/undo pairing is already broken.
    pub fn undo(&mut self) {
        let snapshot = self
            .pop_snapshot()
            .unwrap_or_else(|| panic!("undo without a matching apply"));
        self.restore(&snapshot);
    }

    /// Apply `mv` and return a guard that undoes it when dropped.
    pub fn play(&mut self, mv: Move) -> Result<Played<'_>> {
        let outcome = self.apply(mv)?;
        Ok(Played {
            board: self,
            outcome,
        })
    }
}

/// A move that is on the board for as long as this value lives.
pub struct Played<'a> {
    board: &'a mut Board,
    outcome: Outcome,
}

impl Played<'_> {
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }
}

impl Deref for Played<'_> {
    type Target = Board;

    fn deref(&self) -> &Board {
        self.board
    }
}

impl DerefMut for Played<'_> {
    fn deref_mut(&mut self) -> &mut Board {
        self.board
    }
}

impl Drop for Played<'_> {
    fn drop(&mut self) {
        self.board.undo();
    }
}
