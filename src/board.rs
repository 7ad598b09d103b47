use std::fmt;

use crate::moves::{Move, Square};
use crate::piece::{Color, Piece, PieceKind};

/// The 64 cells plus the side to move: everything repetition and undo need.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Snapshot {
    pub squares: [Option<Piece>; 64],
    pub side_to_move: Color,
}

/// Board state: the current position and the stack of positions that
/// preceded each applied move.
///
/// `history` holds one snapshot per applied move that has not been undone,
/// taken just before the move changed anything. Its length is therefore the
/// number of moves on the apply/undo stack, and `undo` restores the top entry
/// verbatim.
#[derive(Clone, Debug)]
pub struct Board {
    squares: [Option<Piece>; 64],
    side_to_move: Color,
    history: Vec<Snapshot>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

impl Board {
    /// Create an empty board with no pieces. Useful for setting up test positions.
    pub fn empty() -> Self {
        Board {
            squares: [None; 64],
            side_to_move: Color::White,
            history: Vec::new(),
        }
    }

    /// Standard starting position, White to move. Black occupies rows 0-1.
    pub fn new() -> Self {
        let mut board = Board::empty();
        for (col, &kind) in BACK_RANK.iter().enumerate() {
            board.squares[col] = Some(Piece::new(kind, Color::Black));
            board.squares[8 + col] = Some(Piece::new(PieceKind::Pawn, Color::Black));
            board.squares[48 + col] = Some(Piece::new(PieceKind::Pawn, Color::White));
            board.squares[56 + col] = Some(Piece::new(kind, Color::White));
        }
        board
    }

    pub fn get(&self, sq: Square) -> Option<Piece> {
        self.squares[sq.index()]
    }

    /// Raw cell assignment for setting up positions. Moves go through
    /// `apply`, which is the only place that maintains the flags.
    pub fn set(&mut self, sq: Square, piece: Option<Piece>) {
        self.squares[sq.index()] = piece;
    }

    pub(crate) fn cells(&self) -> &[Option<Piece>; 64] {
        &self.squares
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [Option<Piece>; 64] {
        &mut self.squares
    }

    pub fn current_player(&self) -> Color {
        self.side_to_move
    }

    pub fn set_current_player(&mut self, color: Color) {
        self.side_to_move = color;
    }

    /// The square a pawn may capture onto en passant: the one passed over by
    /// the pawn currently flagged as vulnerable.
    pub fn en_passant_target(&self) -> Option<Square> {
        self.pieces()
            .find(|(_, p)| p.kind == PieceKind::Pawn && p.en_passant)
            .and_then(|(sq, p)| sq.offset(-p.color.forward(), 0))
    }

    /// Occupied squares in index order.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| self.get(sq).map(|p| (sq, p)))
    }

    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces()
            .find(|(_, p)| p.kind == PieceKind::King && p.color == color)
            .map(|(sq, _)| sq)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            squares: self.squares,
            side_to_move: self.side_to_move,
        }
    }

    pub fn push_snapshot(&mut self) {
        let snapshot = self.snapshot();
        self.history.push(snapshot);
    }

    pub fn pop_snapshot(&mut self) -> Option<Snapshot> {
        self.history.pop()
    }

    /// Overwrite the whole position with `snapshot`. History is untouched.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.squares = snapshot.squares;
        self.side_to_move = snapshot.side_to_move;
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// How many times `snapshot` has stood on the board: the entries in
    /// history plus the current position.
    pub fn occurrences(&self, snapshot: &Snapshot) -> usize {
        let current = usize::from(self.snapshot() == *snapshot);
        current + self.history.iter().filter(|&s| s == snapshot).count()
    }

    /// Long algebraic label for `mv` in the current position, e.g. `Ng1-f3`
    /// or `e4xd5`. Must be called before the move is applied.
    pub fn notation(&self, mv: Move) -> String {
        let symbol = self.get(mv.from).map(|p| p.kind.symbol()).unwrap_or("");
        let capture = self.get(mv.to).is_some() || self.is_en_passant_capture(mv);
        let sep = if capture { 'x' } else { '-' };
        format!("{symbol}{}{sep}{}", mv.from, mv.to)
    }

    pub(crate) fn is_en_passant_capture(&self, mv: Move) -> bool {
        matches!(self.get(mv.from), Some(p) if p.kind == PieceKind::Pawn)
            && self.get(mv.to).is_none()
            && mv.from.col() != mv.to.col()
            && self.en_passant_target() == Some(mv.to)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..8 {
            write!(f, "{} ", 8 - row)?;
            for col in 0..8 {
                let c = Square::from_coords(row, col)
                    .and_then(|sq| self.get(sq))
                    .map(Piece::to_char)
                    .unwrap_or('.');
                write!(f, "{c} ")?;
            }
            writeln!(f)?;
        }
        write!(f, "  a b c d e f g h")
    }
}
