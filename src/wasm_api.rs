use crate::board::Board;
use crate::engine::EngineConfig;
use crate::game::{Game, HumanMove, PendingPromotion};
use crate::moves::{Move, Square};
use crate::piece::{Color, PieceKind};
use crate::tree::{SearchNode, SearchObserver, TreeRecorder};
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[derive(Serialize)]
struct SquarePiece {
    piece_type: String,
    color: String,
}

#[derive(Serialize)]
struct MoveJson {
    from: usize,
    to: usize,
    notation: String,
}

#[derive(Serialize)]
struct BoardState {
    squares: Vec<Option<SquarePiece>>,
    current_turn: String,
    ai_color: String,
    game_over: bool,
    result: Option<String>,
    is_in_check: bool,
    legal_moves: Vec<MoveJson>,
    captured_white: Vec<String>,
    captured_black: Vec<String>,
    last_move: Option<[usize; 2]>,
    awaiting_promotion: bool,
}

#[derive(Serialize)]
struct MoveResult {
    #[serde(flatten)]
    board_state: Option<BoardState>,
    error: Option<String>,
}

#[derive(Serialize)]
struct AiMoveResult {
    #[serde(flatten)]
    board_state: BoardState,
    ai_move: [usize; 2],
    tree: Option<SearchNode>,
}

fn piece_type_to_string(kind: PieceKind) -> String {
    match kind {
        PieceKind::King => "King".to_string(),
        PieceKind::Queen => "Queen".to_string(),
        PieceKind::Rook => "Rook".to_string(),
        PieceKind::Bishop => "Bishop".to_string(),
        PieceKind::Knight => "Knight".to_string(),
        PieceKind::Pawn => "Pawn".to_string(),
    }
}

fn color_to_string(c: Color) -> String {
    match c {
        Color::White => "White".to_string(),
        Color::Black => "Black".to_string(),
    }
}

fn string_to_piece_type(s: &str) -> Option<PieceKind> {
    match s {
        "Queen" => Some(PieceKind::Queen),
        "Rook" => Some(PieceKind::Rook),
        "Bishop" => Some(PieceKind::Bishop),
        "Knight" => Some(PieceKind::Knight),
        _ => None,
    }
}

fn move_json(board: &Board, mv: Move) -> MoveJson {
    MoveJson {
        from: mv.from.index(),
        to: mv.to.index(),
        notation: board.notation(mv),
    }
}

fn build_board_state(game: &Game, pending: Option<PendingPromotion>) -> BoardState {
    let board = game.board();
    let outcome = game.outcome();
    let squares = Square::all()
        .map(|sq| {
            board.get(sq).map(|p| SquarePiece {
                piece_type: piece_type_to_string(p.kind),
                color: color_to_string(p.color),
            })
        })
        .collect();

    let legal_moves = if outcome.is_terminal() {
        Vec::new()
    } else {
        board
            .legal_moves(board.current_player())
            .into_iter()
            .map(|mv| move_json(board, mv))
            .collect()
    };

    let captured = game.captured();
    BoardState {
        squares,
        current_turn: color_to_string(board.current_player()),
        ai_color: color_to_string(game.ai_color()),
        game_over: outcome.is_terminal(),
        result: outcome.is_terminal().then(|| outcome.to_string()),
        is_in_check: board.is_in_check(board.current_player()),
        legal_moves,
        captured_white: captured.white.iter().map(|k| piece_type_to_string(*k)).collect(),
        captured_black: captured.black.iter().map(|k| piece_type_to_string(*k)).collect(),
        last_move: game.last_move().map(|mv| [mv.from.index(), mv.to.index()]),
        awaiting_promotion: pending.is_some(),
    }
}

fn to_js<T: Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or(JsValue::NULL)
}

#[wasm_bindgen]
pub struct WebGame {
    game: Game,
    pending: Option<PendingPromotion>,
}

impl WebGame {
    fn move_result(&self, error: Option<String>) -> JsValue {
        let board_state = error.is_none().then(|| build_board_state(&self.game, self.pending));
        to_js(&MoveResult { board_state, error })
    }
}

#[wasm_bindgen]
impl WebGame {
    /// New game with the engine on a random side.
    #[wasm_bindgen(constructor)]
    pub fn new() -> WebGame {
        let ai_color = if js_sys::Math::random() < 0.5 {
            Color::White
        } else {
            Color::Black
        };
        WebGame {
            game: Game::new(ai_color, EngineConfig::default()),
            pending: None,
        }
    }

    pub fn set_depth(&mut self, depth: u32) {
        self.game.set_depth(depth.clamp(1, 5));
    }

    pub fn is_ai_turn(&self) -> bool {
        self.pending.is_none() && self.game.is_ai_turn()
    }

    pub fn get_board_state(&self) -> JsValue {
        to_js(&build_board_state(&self.game, self.pending))
    }

    pub fn make_move(&mut self, from: usize, to: usize) -> JsValue {
        if self.pending.is_some() {
            return self.move_result(Some("Choose a promotion piece first".to_string()));
        }
        match self.game.apply_human_move(from, to) {
            Ok(HumanMove::Played(_)) => self.move_result(None),
            Ok(HumanMove::AwaitingPromotion(pending)) => {
                self.pending = Some(pending);
                self.move_result(None)
            }
            Err(e) => self.move_result(Some(e.to_string())),
        }
    }

    pub fn choose_promotion(&mut self, piece: &str) -> JsValue {
        let Some(pending) = self.pending else {
            return self.move_result(Some("No promotion pending".to_string()));
        };
        let Some(kind) = string_to_piece_type(piece) else {
            return self.move_result(Some(format!("Cannot promote to {piece}")));
        };
        match self.game.complete_promotion(pending, kind) {
            Ok(_) => {
                self.pending = None;
                self.move_result(None)
            }
            Err(e) => self.move_result(Some(e.to_string())),
        }
    }

    /// Let the engine move. With `record_tree` the full search tree comes
    /// back alongside the new board state.
    pub fn make_ai_move(&mut self, record_tree: bool) -> JsValue {
        let mut recorder = record_tree.then(TreeRecorder::new);
        let observer = recorder.as_mut().map(|r| r as &mut dyn SearchObserver);
        match self.game.play_ai_move(observer) {
            Ok((mv, _)) => {
                let result = AiMoveResult {
                    board_state: build_board_state(&self.game, self.pending),
                    ai_move: [mv.from.index(), mv.to.index()],
                    tree: recorder.map(TreeRecorder::into_tree),
                };
                to_js(&result)
            }
            Err(e) => self.move_result(Some(e.to_string())),
        }
    }

    pub fn get_legal_moves_for_square(&self, index: usize) -> JsValue {
        let board = self.game.board();
        let Ok(from) = Square::new(index) else {
            return JsValue::NULL;
        };
        let movable = board.get(from).is_some_and(|p| p.color == board.current_player());
        if !movable || self.game.outcome().is_terminal() {
            return to_js(&Vec::<MoveJson>::new());
        }
        let moves: Vec<MoveJson> = board
            .legal_targets(from)
            .into_iter()
            .map(|to| move_json(board, Move::new(from, to)))
            .collect();
        to_js(&moves)
    }
}
