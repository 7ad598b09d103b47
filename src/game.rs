//! A game between a human and the engine.
//!
//! `Game` owns the board for the whole game and is the only place moves are
//! committed outside a search. Human input arrives as raw square indices, as
//! a front end would deliver them, and a pawn reaching the last rank is not
//! played until the promotion piece has been chosen.

use serde::Serialize;
use tracing::{debug, info};

use crate::board::Board;
use crate::engine::{select_move, EngineConfig};
use crate::error::{ChessError, Result};
use crate::moves::{Move, Square};
use crate::piece::{Color, PieceKind};
use crate::status::Outcome;
use crate::tree::SearchObserver;

/// Result of a human move request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HumanMove {
    /// The move is on the board.
    Played(Outcome),
    /// The move is legal but needs a promotion piece. Nothing has been
    /// played yet; pass this to `Game::complete_promotion`.
    AwaitingPromotion(PendingPromotion),
}

/// A legal pawn move to the last rank, waiting for its promotion piece.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingPromotion {
    mv: Move,
}

impl PendingPromotion {
    pub fn mv(&self) -> Move {
        self.mv
    }
}

/// Pieces taken so far, by the side that took them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Captured {
    pub white: Vec<PieceKind>,
    pub black: Vec<PieceKind>,
}

impl Captured {
    pub fn by(&self, color: Color) -> &[PieceKind] {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    fn push(&mut self, color: Color, kind: PieceKind) {
        match color {
            Color::White => self.white.push(kind),
            Color::Black => self.black.push(kind),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Game {
    board: Board,
    ai_color: Color,
    config: EngineConfig,
    outcome: Outcome,
    captured: Captured,
    last_move: Option<Move>,
}

impl Game {
    pub fn new(ai_color: Color, config: EngineConfig) -> Self {
        Self::from_board(Board::new(), ai_color, config)
    }

    /// Continue a game from an arbitrary position.
    pub fn from_board(board: Board, ai_color: Color, config: EngineConfig) -> Self {
        let outcome = board.status();
        Game {
            board,
            ai_color,
            config,
            outcome,
            captured: Captured::default(),
            last_move: None,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn ai_color(&self) -> Color {
        self.ai_color
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_depth(&mut self, depth: u32) {
        self.config.depth = depth;
    }

    pub fn captured(&self) -> &Captured {
        &self.captured
    }

    pub fn last_move(&self) -> Option<Move> {
        self.last_move
    }

    pub fn is_ai_turn(&self) -> bool {
        !self.outcome.is_terminal() && self.board.current_player() == self.ai_color
    }

    /// Play the human's move from `from` to `to` (board indices 0..64).
    ///
    /// A pawn move to the last rank is validated but not played; the caller
    /// gets a `PendingPromotion` back and the board is unchanged.
    pub fn apply_human_move(&mut self, from: usize, to: usize) -> Result<HumanMove> {
        if self.outcome.is_terminal() {
            return Err(ChessError::GameOver);
        }
        let human = self.ai_color.opposite();
        if self.board.current_player() != human {
            return Err(ChessError::NotToMove(human));
        }

        let mv = Move::new(Square::new(from)?, Square::new(to)?);
        let piece = self.board.get(mv.from).ok_or(ChessError::EmptySquare(mv.from))?;
        if piece.color != human {
            return Err(ChessError::NotYourPiece {
                square: mv.from,
                owner: piece.color,
                to_move: human,
            });
        }
        if !self.board.is_legal(mv) {
            return Err(ChessError::IllegalMove {
                from: mv.from,
                to: mv.to,
            });
        }

        if piece.kind == PieceKind::Pawn && mv.to.row() == human.opposite().home_row() {
            debug!(%mv, "waiting for promotion choice");
            return Ok(HumanMove::AwaitingPromotion(PendingPromotion { mv }));
        }
        self.commit(mv, PieceKind::Queen).map(HumanMove::Played)
    }

    /// Finish a promotion started by `apply_human_move`.
    pub fn complete_promotion(&mut self, pending: PendingPromotion, kind: PieceKind) -> Result<Outcome> {
        if self.outcome.is_terminal() {
            return Err(ChessError::GameOver);
        }
        if !kind.is_promotion_choice() {
            return Err(ChessError::InvalidPromotion(kind));
        }
        self.commit(pending.mv, kind)
    }

    /// Let the engine choose and play a move. `observer`, when given, sees
    /// the whole search.
    pub fn play_ai_move(&mut self, observer: Option<&mut dyn SearchObserver>) -> Result<(Move, Outcome)> {
        if self.outcome.is_terminal() {
            return Err(ChessError::GameOver);
        }
        let result = select_move(&mut self.board, self.ai_color, self.config.depth, observer)?;
        let outcome = self.commit(result.mv, PieceKind::Queen)?;
        Ok((result.mv, outcome))
    }

    fn commit(&mut self, mv: Move, promotion: PieceKind) -> Result<Outcome> {
        let mover = self.board.current_player();
        let taken = if self.board.is_en_passant_capture(mv) {
            Some(PieceKind::Pawn)
        } else {
            self.board.get(mv.to).map(|p| p.kind)
        };
        let notation = self.board.notation(mv);

        let outcome = self.board.apply_with_promotion(mv, promotion)?;
        if let Some(kind) = taken {
            self.captured.push(mover, kind);
        }
        self.outcome = outcome;
        self.last_move = Some(mv);

        if outcome.is_terminal() {
            info!(%mover, %notation, %outcome, "game over");
        } else {
            debug!(%mover, %notation, "move played");
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx(name: &str) -> usize {
        Square::parse(name).unwrap().index()
    }

    fn shallow() -> EngineConfig {
        EngineConfig {
            depth: 1,
            record_tree: false,
        }
    }

    #[test]
    fn human_and_engine_alternate() {
        let mut game = Game::new(Color::Black, shallow());
        assert!(!game.is_ai_turn());
        assert!(matches!(game.play_ai_move(None), Err(ChessError::NotToMove(Color::Black))));

        let played = game.apply_human_move(idx("e2"), idx("e4")).unwrap();
        assert_eq!(played, HumanMove::Played(Outcome::Ongoing));
        assert!(game.is_ai_turn());
        assert_eq!(
            game.apply_human_move(idx("d2"), idx("d4")),
            Err(ChessError::NotToMove(Color::White))
        );

        let (mv, _) = game.play_ai_move(None).unwrap();
        assert_eq!(game.last_move(), Some(mv));
        assert_eq!(game.board().current_player(), Color::White);
        assert_eq!(game.board().history_len(), 2);
    }

    #[test]
    fn bad_human_input_is_rejected() {
        let mut game = Game::new(Color::Black, shallow());
        assert_eq!(game.apply_human_move(64, 0), Err(ChessError::InvalidSquare(64)));
        assert!(matches!(
            game.apply_human_move(idx("e4"), idx("e5")),
            Err(ChessError::EmptySquare(_))
        ));
        assert!(matches!(
            game.apply_human_move(idx("e7"), idx("e5")),
            Err(ChessError::NotYourPiece { .. })
        ));
        assert!(matches!(
            game.apply_human_move(idx("e2"), idx("e5")),
            Err(ChessError::IllegalMove { .. })
        ));
        assert_eq!(game.board().history_len(), 0);
    }

    #[test]
    fn promotion_waits_for_a_choice() {
        let board = Board::from_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1").unwrap();
        let mut game = Game::from_board(board, Color::Black, shallow());
        let before = game.board().snapshot();

        let pending = match game.apply_human_move(idx("a7"), idx("a8")).unwrap() {
            HumanMove::AwaitingPromotion(pending) => pending,
            other => panic!("expected a promotion prompt, got {other:?}"),
        };
        assert_eq!(game.board().snapshot(), before);
        assert_eq!(pending.mv().to, Square::parse("a8").unwrap());

        assert_eq!(
            game.complete_promotion(pending, PieceKind::King),
            Err(ChessError::InvalidPromotion(PieceKind::King))
        );
        assert_eq!(game.complete_promotion(pending, PieceKind::Rook), Ok(Outcome::Ongoing));
        let promoted = game.board().get(Square::parse("a8").unwrap()).unwrap();
        assert_eq!((promoted.kind, promoted.color), (PieceKind::Rook, Color::White));
        assert!(game.is_ai_turn());
    }

    #[test]
    fn captures_are_recorded() {
        let board = Board::from_fen("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1").unwrap();
        let mut game = Game::from_board(board, Color::Black, shallow());
        game.apply_human_move(idx("e4"), idx("d5")).unwrap();
        assert_eq!(game.captured().by(Color::White), &[PieceKind::Pawn]);
        assert!(game.captured().by(Color::Black).is_empty());
    }

    #[test]
    fn en_passant_capture_is_recorded() {
        let board = Board::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").unwrap();
        let mut game = Game::from_board(board, Color::Black, shallow());
        game.apply_human_move(idx("e5"), idx("d6")).unwrap();
        assert_eq!(game.captured().by(Color::White), &[PieceKind::Pawn]);
    }

    #[test]
    fn finished_game_accepts_no_moves() {
        // Fool's mate, White to move and mated.
        let board = Board::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3").unwrap();
        let mut game = Game::from_board(board, Color::Black, shallow());
        assert_eq!(game.outcome(), Outcome::Checkmate { winner: Color::Black });
        assert!(!game.is_ai_turn());
        assert_eq!(game.apply_human_move(idx("a2"), idx("a3")), Err(ChessError::GameOver));
        assert!(matches!(game.play_ai_move(None), Err(ChessError::GameOver)));
    }

    #[test]
    fn engine_delivers_mate_in_one() {
        let board = Board::from_fen("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1").unwrap();
        let mut game = Game::from_board(board, Color::White, shallow());
        let (mv, outcome) = game.play_ai_move(None).unwrap();
        assert_eq!(mv.to_uci(), "a1a8");
        assert_eq!(outcome, Outcome::Checkmate { winner: Color::White });
        assert_eq!(game.outcome(), outcome);
    }
}
