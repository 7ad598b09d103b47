// =============================================================================
// Chess AI Engine
//
// Depth-limited minimax with alpha-beta pruning. The engine maximizes for the
// colour it plays and minimizes on the opponent's plies; every score is from
// the engine colour's perspective. Moves are searched in generator order
// (origin square, then destination square) with no reordering, so the result
// is fully determined by the position and the depth.
//
// The board is searched in place. Each move is applied through the scoped
// `Board::play` guard, which undoes it when the guard goes out of scope,
// including on a pruning `break` or an error return.
// =============================================================================

use tracing::debug;

use crate::board::Board;
use crate::error::{ChessError, Result};
use crate::eval::{evaluate, Score};
use crate::moves::Move;
use crate::piece::Color;
use crate::status::Outcome;
use crate::tree::{SearchNode, SearchObserver, TreeRecorder};

/// Score of a node where the side to move has no legal move, from the point
/// of view of the side that is stuck. Mate and stalemate are not told apart.
pub const INFINITY: Score = 1_000_000;

/// Score of a position drawn by rule (insufficient material, repetition).
pub const DRAW: Score = 0;

// =============================================================================
// Configuration
// =============================================================================

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Search depth in plies. Zero is treated as one.
    pub depth: u32,
    /// Record the search tree for a visualizer.
    pub record_tree: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            depth: 3,
            record_tree: false,
        }
    }
}

/// The chosen move, its minimax score and the number of positions visited.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchResult {
    pub mv: Move,
    pub score: Score,
    pub nodes: u64,
}

// =============================================================================
// Search
// =============================================================================

struct Search<'o> {
    color: Color,
    nodes: u64,
    observer: Option<&'o mut dyn SearchObserver>,
}

impl Search<'_> {
    /// Value of the position on `board`, with `maximizing` telling whether
    /// the side to move is the engine.
    fn node(&mut self, board: &mut Board, depth: u32, mut alpha: Score, mut beta: Score, maximizing: bool) -> Result<Score> {
        if depth == 0 {
            return Ok(evaluate(board, self.color));
        }

        let moves = board.legal_moves(board.current_player());
        if moves.is_empty() {
            return Ok(stuck_score(maximizing));
        }

        let mut best = if maximizing { -INFINITY } else { INFINITY };
        let mut best_index = None;
        for (i, mv) in moves.into_iter().enumerate() {
            let score = self.child(board, mv, depth - 1, alpha, beta, !maximizing)?;
            let improves = if maximizing { score > best } else { score < best };
            if improves || best_index.is_none() {
                best = score;
                best_index = Some(i);
            }

            if maximizing {
                alpha = alpha.max(best);
            } else {
                beta = beta.min(best);
            }
            if beta <= alpha {
                break;
            }
        }

        if let (Some(i), Some(obs)) = (best_index, self.observer.as_deref_mut()) {
            obs.mark_best(i);
        }
        Ok(best)
    }

    /// Play `mv`, score the resulting position and take the move back.
    /// `maximizing` describes the side to move after `mv`.
    fn child(&mut self, board: &mut Board, mv: Move, depth: u32, alpha: Score, beta: Score, maximizing: bool) -> Result<Score> {
        if let Some(obs) = self.observer.as_deref_mut() {
            obs.enter(&board.notation(mv));
        }
        self.nodes += 1;

        let score = {
            let mut played = board.play(mv)?;
            match played.outcome() {
                Outcome::Checkmate { .. } | Outcome::Stalemate => stuck_score(maximizing),
                Outcome::InsufficientMaterial | Outcome::ThreefoldRepetition => DRAW,
                Outcome::Ongoing | Outcome::Check(_) => {
                    self.node(&mut played, depth, alpha, beta, maximizing)?
                }
            }
        };

        if let Some(obs) = self.observer.as_deref_mut() {
            obs.exit(score);
        }
        Ok(score)
    }
}

fn stuck_score(maximizing: bool) -> Score {
    if maximizing {
        -INFINITY
    } else {
        INFINITY
    }
}

/// Pick a move for `color`, which must be the side to move, searching
/// `depth` plies. The board is returned exactly as it was given.
///
/// When `observer` is supplied it sees every node the search visits; the
/// search itself never reads anything back from it.
pub fn select_move(
    board: &mut Board,
    color: Color,
    depth: u32,
    observer: Option<&mut dyn SearchObserver>,
) -> Result<SearchResult> {
    if board.current_player() != color {
        return Err(ChessError::NotToMove(color));
    }
    let moves = board.legal_moves(color);
    if moves.is_empty() {
        return Err(ChessError::NoLegalMoves(color));
    }

    let depth = depth.max(1);
    let history_before = board.history_len();
    let mut search = Search {
        color,
        nodes: 0,
        observer,
    };

    let mut alpha = -INFINITY;
    let beta = INFINITY;
    let mut best: Option<(usize, Move, Score)> = None;
    for (i, mv) in moves.into_iter().enumerate() {
        let score = search.child(board, mv, depth - 1, alpha, beta, false)?;
        if best.map_or(true, |(_, _, b)| score > b) {
            best = Some((i, mv, score));
        }
        if let Some((_, _, b)) = best {
            alpha = alpha.max(b);
        }
    }
    assert_eq!(
        board.history_len(),
        history_before,
        "search left moves on the board"
    );

    let (index, mv, score) = best.ok_or(ChessError::NoLegalMoves(color))?;
    if let Some(obs) = search.observer.as_deref_mut() {
        obs.mark_best(index);
        obs.finish(score);
    }
    let nodes = search.nodes;
    debug!(%color, depth, %mv, score, nodes, "search complete");
    Ok(SearchResult { mv, score, nodes })
}

/// `select_move` driven by an `EngineConfig`, returning the recorded tree
/// when the config asks for one.
pub fn select_move_with(board: &mut Board, color: Color, config: &EngineConfig) -> Result<(SearchResult, Option<SearchNode>)> {
    if config.record_tree {
        let mut recorder = TreeRecorder::new();
        let result = select_move(board, color, config.depth, Some(&mut recorder))?;
        Ok((result, Some(recorder.into_tree())))
    } else {
        let result = select_move(board, color, config.depth, None)?;
        Ok((result, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::Square;
    use crate::piece::{Piece, PieceKind};

    fn sq(name: &str) -> Square {
        Square::parse(name).unwrap()
    }

    fn put(board: &mut Board, name: &str, kind: PieceKind, color: Color) {
        board.set(sq(name), Some(Piece::new(kind, color)));
    }

    /// Plain minimax without pruning, sharing the engine's scoring rules.
    fn minimax(board: &mut Board, color: Color, depth: u32, maximizing: bool) -> Score {
        if depth == 0 {
            return evaluate(board, color);
        }
        let moves = board.legal_moves(board.current_player());
        if moves.is_empty() {
            return stuck_score(maximizing);
        }
        let mut best = if maximizing { -INFINITY } else { INFINITY };
        for mv in moves {
            let score = match board.apply(mv).unwrap() {
                Outcome::Checkmate { .. } | Outcome::Stalemate => stuck_score(!maximizing),
                Outcome::InsufficientMaterial | Outcome::ThreefoldRepetition => DRAW,
                _ => minimax(board, color, depth - 1, !maximizing),
            };
            board.undo();
            best = if maximizing { best.max(score) } else { best.min(score) };
        }
        best
    }

    fn exhaustive_root(board: &mut Board, depth: u32) -> (Move, Score) {
        let color = board.current_player();
        let mut best: Option<(Move, Score)> = None;
        for mv in board.legal_moves(color) {
            let score = match board.apply(mv).unwrap() {
                Outcome::Checkmate { .. } | Outcome::Stalemate => stuck_score(false),
                Outcome::InsufficientMaterial | Outcome::ThreefoldRepetition => DRAW,
                _ => minimax(board, color, depth - 1, false),
            };
            board.undo();
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((mv, score));
            }
        }
        best.unwrap()
    }

    #[test]
    fn pruning_matches_exhaustive_minimax() {
        let positions = [
            "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R b KQkq - 3 3",
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "6k1/5ppp/8/8/8/8/3q1PPP/R5K1 w - - 0 1",
        ];
        for fen in positions {
            let mut board = Board::from_fen(fen).unwrap();
            let color = board.current_player();
            let expected = exhaustive_root(&mut board, 2);
            let result = select_move(&mut board, color, 2, None).unwrap();
            assert_eq!((result.mv, result.score), expected, "mismatch on {fen}");
        }
    }

    #[test]
    fn pruning_matches_exhaustive_minimax_at_depth_three() {
        let mut board = Board::from_fen("4k3/8/3p4/2p5/1P6/8/3Q4/4K3 w - - 0 1").unwrap();
        let expected = exhaustive_root(&mut board, 3);
        let result = select_move(&mut board, Color::White, 3, None).unwrap();
        assert_eq!((result.mv, result.score), expected);
    }

    #[test]
    fn finds_back_rank_mate() {
        let mut board = Board::from_fen("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1").unwrap();
        let result = select_move(&mut board, Color::White, 2, None).unwrap();
        assert_eq!(result.mv, Move::new(sq("a1"), sq("a8")));
        assert_eq!(result.score, INFINITY);
    }

    #[test]
    fn takes_a_hanging_queen() {
        let mut board = Board::empty();
        put(&mut board, "e1", PieceKind::King, Color::White);
        put(&mut board, "d1", PieceKind::Rook, Color::White);
        put(&mut board, "h8", PieceKind::King, Color::Black);
        put(&mut board, "d5", PieceKind::Queen, Color::Black);
        board.set_current_player(Color::White);
        let result = select_move(&mut board, Color::White, 2, None).unwrap();
        assert_eq!(result.mv, Move::new(sq("d1"), sq("d5")));
        assert!(result.score > 0);
    }

    #[test]
    fn black_engine_maximizes_for_black() {
        let mut board = Board::empty();
        put(&mut board, "a1", PieceKind::King, Color::White);
        put(&mut board, "d4", PieceKind::Rook, Color::White);
        put(&mut board, "h8", PieceKind::King, Color::Black);
        put(&mut board, "e6", PieceKind::Knight, Color::Black);
        board.set_current_player(Color::Black);
        let result = select_move(&mut board, Color::Black, 1, None).unwrap();
        assert_eq!(result.mv, Move::new(sq("e6"), sq("d4")));
        assert!(result.score > 0);
    }

    #[test]
    fn search_leaves_board_untouched() {
        let mut board = Board::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1").unwrap();
        let before = board.snapshot();
        let history = board.history_len();
        select_move(&mut board, Color::White, 2, None).unwrap();
        assert_eq!(board.snapshot(), before);
        assert_eq!(board.history_len(), history);
    }

    #[test]
    fn rejects_wrong_side_and_finished_positions() {
        let mut board = Board::new();
        assert_eq!(
            select_move(&mut board, Color::Black, 2, None),
            Err(ChessError::NotToMove(Color::Black))
        );

        let mut board = Board::new();
        for (from, to) in [("f2", "f3"), ("e7", "e5"), ("g2", "g4"), ("d8", "h4")] {
            board.apply(Move::new(sq(from), sq(to))).unwrap();
        }
        assert_eq!(
            select_move(&mut board, Color::White, 2, None),
            Err(ChessError::NoLegalMoves(Color::White))
        );
    }

    #[test]
    fn depth_zero_searches_one_ply() {
        let mut board = Board::new();
        let zero = select_move(&mut board, Color::White, 0, None).unwrap();
        let one = select_move(&mut board, Color::White, 1, None).unwrap();
        assert_eq!(zero, one);
        assert_eq!(one.nodes, 20);
    }

    #[test]
    fn recorded_tree_mirrors_the_search() {
        let mut board = Board::new();
        let mut recorder = TreeRecorder::new();
        let result = select_move(&mut board, Color::White, 2, Some(&mut recorder)).unwrap();
        let tree = recorder.into_tree();

        assert_eq!(tree.children.len(), 20);
        assert_eq!(tree.score, result.score);
        assert_eq!(tree.children.iter().filter(|c| c.is_best).count(), 1);
        let best = tree.best_child().unwrap();
        assert_eq!(best.notation, board.notation(result.mv));
        assert_eq!(best.score, result.score);
        assert_eq!(tree.size() as u64, result.nodes + 1);

        // Observing must not change the answer.
        let plain = select_move(&mut board, Color::White, 2, None).unwrap();
        assert_eq!(plain, result);
    }

    #[test]
    fn config_controls_tree_recording() {
        let mut board = Board::new();
        let config = EngineConfig {
            depth: 1,
            record_tree: true,
        };
        let (result, tree) = select_move_with(&mut board, Color::White, &config).unwrap();
        assert_eq!(tree.map(|t| t.children.len()), Some(20));
        assert_eq!(result.nodes, 20);

        let (_, tree) = select_move_with(&mut board, Color::White, &EngineConfig::default()).unwrap();
        assert!(tree.is_none());
    }
}
