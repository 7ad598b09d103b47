// =============================================================================
// Move generation
//
// Pseudo-legal targets follow each piece's movement rule only. Legal targets
// additionally pass a cheap self-check filter: the piece is dropped onto the
// destination in a scratch copy of the cells and the mover's king is tested
// for attack. No move semantics (flags, rook relocation, history) are run.
//
// All geometry uses (row, col) steps through `Square::offset`, which refuses
// to leave the board instead of wrapping to a neighbouring file.
// =============================================================================

use crate::board::Board;
use crate::moves::{Move, Square};
use crate::piece::{Color, Piece, PieceKind};

type Cells = [Option<Piece>; 64];

const KNIGHT_OFFSETS: [(i32, i32); 8] = [
    (-2, -1), (-2, 1), (-1, -2), (-1, 2),
    (1, -2), (1, 2), (2, -1), (2, 1),
];

const KING_OFFSETS: [(i32, i32); 8] = [
    (-1, -1), (-1, 0), (-1, 1), (0, -1),
    (0, 1), (1, -1), (1, 0), (1, 1),
];

const STRAIGHT_DIRS: [(i32, i32); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];
const DIAGONAL_DIRS: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

/// Where a castling king lands, given the direction it moves in.
struct CastleSide {
    rook_col: usize,
    between: &'static [usize],
    king_to_col: usize,
}

const KINGSIDE: CastleSide = CastleSide {
    rook_col: 7,
    between: &[5, 6],
    king_to_col: 6,
};

const QUEENSIDE: CastleSide = CastleSide {
    rook_col: 0,
    between: &[1, 2, 3],
    king_to_col: 2,
};

fn is_enemy(cells: &Cells, sq: Square, color: Color) -> bool {
    matches!(cells[sq.index()], Some(p) if p.color != color)
}

fn is_empty(cells: &Cells, sq: Square) -> bool {
    cells[sq.index()].is_none()
}

/// True if any piece of `attacker` could capture on `target`.
///
/// Scans outward from the target for each kind of attacker, which gives the
/// same answer as generating every enemy move and looking for `target`.
fn attacked_by(cells: &Cells, target: Square, attacker: Color) -> bool {
    let holds = |sq: Square, kinds: &[PieceKind]| {
        matches!(cells[sq.index()], Some(p) if p.color == attacker && kinds.contains(&p.kind))
    };

    for &(dr, dc) in &KNIGHT_OFFSETS {
        if target.offset(dr, dc).is_some_and(|sq| holds(sq, &[PieceKind::Knight])) {
            return true;
        }
    }

    for &(dr, dc) in &KING_OFFSETS {
        if target.offset(dr, dc).is_some_and(|sq| holds(sq, &[PieceKind::King])) {
            return true;
        }
    }

    // A pawn one row behind the target (from the attacker's point of view)
    // on an adjacent file.
    let behind = -attacker.forward();
    for dc in [-1, 1] {
        if target.offset(behind, dc).is_some_and(|sq| holds(sq, &[PieceKind::Pawn])) {
            return true;
        }
    }

    let rays = [
        (&STRAIGHT_DIRS, [PieceKind::Rook, PieceKind::Queen]),
        (&DIAGONAL_DIRS, [PieceKind::Bishop, PieceKind::Queen]),
    ];
    for (dirs, kinds) in rays {
        for &(dr, dc) in dirs {
            let mut cur = target.offset(dr, dc);
            while let Some(sq) = cur {
                if cells[sq.index()].is_some() {
                    if holds(sq, &kinds) {
                        return true;
                    }
                    break;
                }
                cur = sq.offset(dr, dc);
            }
        }
    }

    false
}

fn king_on(cells: &Cells, color: Color) -> Square {
    Square::all()
        .find(|sq| matches!(cells[sq.index()], Some(p) if p.kind == PieceKind::King && p.color == color))
        .unwrap_or_else(|| panic!("board has no {color} king"))
}

impl Board {
    /// Destinations allowed by the movement rule of the piece on `from`,
    /// ignoring whether the mover's king ends up in check. Empty if `from`
    /// is empty.
    pub fn pseudo_legal_targets(&self, from: Square) -> Vec<Square> {
        let mut targets = Vec::new();
        let Some(piece) = self.get(from) else {
            return targets;
        };
        match piece.kind {
            PieceKind::Pawn => self.pawn_targets(from, piece.color, &mut targets),
            PieceKind::Knight => self.step_targets(from, piece.color, &KNIGHT_OFFSETS, &mut targets),
            PieceKind::Bishop => self.ray_targets(from, piece.color, &DIAGONAL_DIRS, &mut targets),
            PieceKind::Rook => self.ray_targets(from, piece.color, &STRAIGHT_DIRS, &mut targets),
            PieceKind::Queen => {
                self.ray_targets(from, piece.color, &DIAGONAL_DIRS, &mut targets);
                self.ray_targets(from, piece.color, &STRAIGHT_DIRS, &mut targets);
            }
            PieceKind::King => {
                self.step_targets(from, piece.color, &KING_OFFSETS, &mut targets);
                self.castle_targets(from, piece, &mut targets);
            }
        }
        targets
    }

    fn pawn_targets(&self, from: Square, color: Color, targets: &mut Vec<Square>) {
        let cells = self.cells();
        let dir = color.forward();
        let start_row = match color {
            Color::White => 6,
            Color::Black => 1,
        };

        if let Some(one) = from.offset(dir, 0).filter(|&sq| is_empty(cells, sq)) {
            targets.push(one);
            if from.row() == start_row {
                if let Some(two) = one.offset(dir, 0).filter(|&sq| is_empty(cells, sq)) {
                    targets.push(two);
                }
            }
        }

        for dc in [-1, 1] {
            let Some(diag) = from.offset(dir, dc) else {
                continue;
            };
            if is_enemy(cells, diag, color) {
                targets.push(diag);
                continue;
            }
            // En passant: the pawn beside us just double-stepped past `diag`.
            let passed = from
                .offset(0, dc)
                .and_then(|sq| self.get(sq))
                .is_some_and(|p| p.kind == PieceKind::Pawn && p.color != color && p.en_passant);
            if passed && is_empty(cells, diag) {
                targets.push(diag);
            }
        }
    }

    fn step_targets(&self, from: Square, color: Color, offsets: &[(i32, i32)], targets: &mut Vec<Square>) {
        let cells = self.cells();
        for &(dr, dc) in offsets {
            if let Some(sq) = from.offset(dr, dc) {
                if is_empty(cells, sq) || is_enemy(cells, sq, color) {
                    targets.push(sq);
                }
            }
        }
    }

    fn ray_targets(&self, from: Square, color: Color, dirs: &[(i32, i32)], targets: &mut Vec<Square>) {
        let cells = self.cells();
        for &(dr, dc) in dirs {
            let mut cur = from.offset(dr, dc);
            while let Some(sq) = cur {
                if !is_empty(cells, sq) {
                    if is_enemy(cells, sq, color) {
                        targets.push(sq);
                    }
                    break;
                }
                targets.push(sq);
                cur = sq.offset(dr, dc);
            }
        }
    }

    /// Castling geometry only: unmoved king on its start square, unmoved
    /// rook of the same colour in the corner, nothing in between. Whether
    /// the king passes through check is left to the legality filter.
    fn castle_targets(&self, from: Square, king: Piece, targets: &mut Vec<Square>) {
        let row = king.color.home_row();
        if king.moved || Square::from_coords(row, 4) != Some(from) {
            return;
        }
        for side in [&KINGSIDE, &QUEENSIDE] {
            let rook_ok = Square::from_coords(row, side.rook_col)
                .and_then(|sq| self.get(sq))
                .is_some_and(|p| p.kind == PieceKind::Rook && p.color == king.color && !p.moved);
            let clear = side
                .between
                .iter()
                .filter_map(|&col| Square::from_coords(row, col))
                .all(|sq| self.get(sq).is_none());
            if rook_ok && clear {
                if let Some(to) = Square::from_coords(row, side.king_to_col) {
                    targets.push(to);
                }
            }
        }
    }

    /// Pseudo-legal targets that do not leave the mover's king in check,
    /// in ascending square order.
    pub fn legal_targets(&self, from: Square) -> Vec<Square> {
        let Some(piece) = self.get(from) else {
            return Vec::new();
        };
        let mut targets: Vec<Square> = self
            .pseudo_legal_targets(from)
            .into_iter()
            .filter(|&to| self.keeps_king_safe(Move::new(from, to), piece))
            .collect();
        targets.sort();
        targets
    }

    fn keeps_king_safe(&self, mv: Move, piece: Piece) -> bool {
        let color = piece.color;
        let enemy = color.opposite();

        if piece.kind == PieceKind::King && mv.from.col().abs_diff(mv.to.col()) == 2 {
            // No castling out of, or through, check.
            let step = if mv.to.col() > mv.from.col() { 1 } else { -1 };
            let transit = mv.from.offset(0, step);
            if attacked_by(self.cells(), mv.from, enemy)
                || transit.is_some_and(|sq| attacked_by(self.cells(), sq, enemy))
            {
                return false;
            }
        }

        let mut scratch = *self.cells();
        if self.is_en_passant_capture(mv) {
            if let Some(victim) = mv.to.offset(-color.forward(), 0) {
                scratch[victim.index()] = None;
            }
        }
        scratch[mv.to.index()] = scratch[mv.from.index()].take();
        !attacked_by(&scratch, king_on(&scratch, color), enemy)
    }

    /// Every legal move for `color`, ordered by origin square then
    /// destination square.
    pub fn legal_moves(&self, color: Color) -> Vec<Move> {
        self.pieces()
            .filter(|(_, p)| p.color == color)
            .flat_map(|(from, _)| {
                self.legal_targets(from)
                    .into_iter()
                    .map(move |to| Move::new(from, to))
            })
            .collect()
    }

    pub fn has_legal_move(&self, color: Color) -> bool {
        self.pieces()
            .filter(|(_, p)| p.color == color)
            .any(|(from, _)| !self.legal_targets(from).is_empty())
    }

    /// Legal by piece movement and king safety. Turn order is not checked
    /// here; `apply` does that.
    pub fn is_legal(&self, mv: Move) -> bool {
        match self.get(mv.from) {
            Some(piece) => {
                self.pseudo_legal_targets(mv.from).contains(&mv.to) && self.keeps_king_safe(mv, piece)
            }
            None => false,
        }
    }

    pub fn is_square_attacked(&self, sq: Square, by: Color) -> bool {
        attacked_by(self.cells(), sq, by)
    }

    /// Panics if `color` has no king: no legal sequence of moves removes one.
    pub fn is_in_check(&self, color: Color) -> bool {
        let king = king_on(self.cells(), color);
        attacked_by(self.cells(), king, color.opposite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> Square {
        Square::parse(name).unwrap()
    }

    fn put(board: &mut Board, name: &str, kind: PieceKind, color: Color) {
        board.set(sq(name), Some(Piece::new(kind, color)));
    }

    fn targets(board: &Board, from: &str) -> Vec<String> {
        let mut names: Vec<String> = board.legal_targets(sq(from)).iter().map(|s| s.to_string()).collect();
        names.sort();
        names
    }

    #[test]
    fn start_position_has_twenty_moves() {
        let board = Board::new();
        assert_eq!(board.legal_moves(Color::White).len(), 20);
        assert_eq!(board.legal_moves(Color::Black).len(), 20);
        assert!(!board.is_in_check(Color::White));
    }

    #[test]
    fn moves_are_in_square_order() {
        let moves = Board::new().legal_moves(Color::White);
        let keys: Vec<(Square, Square)> = moves.iter().map(|m| (m.from, m.to)).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn knight_on_the_rim_does_not_wrap() {
        let mut board = Board::empty();
        put(&mut board, "a1", PieceKind::King, Color::White);
        put(&mut board, "h8", PieceKind::King, Color::Black);
        put(&mut board, "h4", PieceKind::Knight, Color::White);
        assert_eq!(targets(&board, "h4"), vec!["f3", "f5", "g2", "g6"]);
    }

    #[test]
    fn rook_ray_stops_at_first_piece() {
        let mut board = Board::empty();
        put(&mut board, "a1", PieceKind::King, Color::White);
        put(&mut board, "h8", PieceKind::King, Color::Black);
        put(&mut board, "d4", PieceKind::Rook, Color::White);
        put(&mut board, "d6", PieceKind::Pawn, Color::Black);
        put(&mut board, "f4", PieceKind::Pawn, Color::White);
        let t = board.pseudo_legal_targets(sq("d4"));
        assert!(t.contains(&sq("d6")));
        assert!(!t.contains(&sq("d7")));
        assert!(t.contains(&sq("e4")));
        assert!(!t.contains(&sq("f4")));
        assert!(t.contains(&sq("d1")));
        assert!(t.contains(&sq("a4")));
        assert!(!t.iter().any(|s| s.row() != 4 && s.col() != 3));
    }

    #[test]
    fn pawn_pushes_and_captures() {
        let mut board = Board::new();
        put(&mut board, "d3", PieceKind::Knight, Color::Black);
        assert_eq!(targets(&board, "e2"), vec!["d3", "e3", "e4"]);
        assert!(targets(&board, "d2").is_empty());
    }

    #[test]
    fn pinned_piece_cannot_leave_the_line() {
        let mut board = Board::empty();
        put(&mut board, "e1", PieceKind::King, Color::White);
        put(&mut board, "e2", PieceKind::Bishop, Color::White);
        put(&mut board, "e8", PieceKind::Rook, Color::Black);
        put(&mut board, "a8", PieceKind::King, Color::Black);
        assert!(targets(&board, "e2").is_empty());
        assert!(!board.pseudo_legal_targets(sq("e2")).is_empty());
    }

    #[test]
    fn castling_requires_clear_and_safe_path() {
        let mut board = Board::empty();
        put(&mut board, "e1", PieceKind::King, Color::White);
        put(&mut board, "h1", PieceKind::Rook, Color::White);
        put(&mut board, "a1", PieceKind::Rook, Color::White);
        put(&mut board, "e8", PieceKind::King, Color::Black);
        let t = targets(&board, "e1");
        assert!(t.contains(&"g1".to_string()));
        assert!(t.contains(&"c1".to_string()));

        // A rook eyeing f1 forbids passing through it.
        put(&mut board, "f8", PieceKind::Rook, Color::Black);
        let t = targets(&board, "e1");
        assert!(!t.contains(&"g1".to_string()));
        assert!(t.contains(&"c1".to_string()));

        // A blocker on b1 forbids queenside castling.
        put(&mut board, "b1", PieceKind::Knight, Color::White);
        assert!(!targets(&board, "e1").contains(&"c1".to_string()));
    }

    #[test]
    fn no_castling_out_of_check_or_after_moving() {
        let mut board = Board::empty();
        put(&mut board, "e1", PieceKind::King, Color::White);
        put(&mut board, "h1", PieceKind::Rook, Color::White);
        put(&mut board, "a8", PieceKind::King, Color::Black);
        put(&mut board, "e5", PieceKind::Rook, Color::Black);
        assert!(!targets(&board, "e1").contains(&"g1".to_string()));

        board.set(sq("e5"), None);
        let mut rook = Piece::new(PieceKind::Rook, Color::White);
        rook.moved = true;
        board.set(sq("h1"), Some(rook));
        assert!(!targets(&board, "e1").contains(&"g1".to_string()));
    }

    #[test]
    fn en_passant_needs_the_flag() {
        let mut board = Board::empty();
        put(&mut board, "e1", PieceKind::King, Color::White);
        put(&mut board, "e8", PieceKind::King, Color::Black);
        put(&mut board, "e5", PieceKind::Pawn, Color::White);
        put(&mut board, "d5", PieceKind::Pawn, Color::Black);
        assert_eq!(targets(&board, "e5"), vec!["e6"]);

        let mut pawn = Piece::new(PieceKind::Pawn, Color::Black);
        pawn.en_passant = true;
        board.set(sq("d5"), Some(pawn));
        assert_eq!(targets(&board, "e5"), vec!["d6", "e6"]);
    }

    #[test]
    fn en_passant_cannot_expose_the_king() {
        let mut board = Board::empty();
        put(&mut board, "a5", PieceKind::King, Color::White);
        put(&mut board, "b5", PieceKind::Pawn, Color::White);
        put(&mut board, "e8", PieceKind::King, Color::Black);
        put(&mut board, "h5", PieceKind::Rook, Color::Black);
        let mut pawn = Piece::new(PieceKind::Pawn, Color::Black);
        pawn.en_passant = true;
        pawn.moved = true;
        board.set(sq("c5"), Some(pawn));

        // Both pawns leave the fifth rank, opening it to the rook.
        assert_eq!(targets(&board, "b5"), vec!["b6"]);
        assert!(!board.is_legal(Move::new(sq("b5"), sq("c6"))));

        board.set(sq("h5"), None);
        assert_eq!(targets(&board, "b5"), vec!["b6", "c6"]);
    }

    #[test]
    fn check_detection() {
        let mut board = Board::empty();
        put(&mut board, "e1", PieceKind::King, Color::White);
        put(&mut board, "e8", PieceKind::King, Color::Black);
        put(&mut board, "d2", PieceKind::Pawn, Color::White);
        put(&mut board, "b4", PieceKind::Bishop, Color::Black);
        assert!(!board.is_in_check(Color::White));
        board.set(sq("d2"), None);
        assert!(board.is_in_check(Color::White));

        board.set(sq("b4"), None);
        put(&mut board, "f2", PieceKind::Pawn, Color::Black);
        assert!(board.is_in_check(Color::White));
        assert!(board.is_square_attacked(sq("g1"), Color::Black));
        assert!(!board.is_square_attacked(sq("f1"), Color::Black));
    }

    #[test]
    #[should_panic(expected = "no White king")]
    fn check_without_king_is_fatal() {
        let mut board = Board::empty();
        put(&mut board, "e8", PieceKind::King, Color::Black);
        board.is_in_check(Color::White);
    }
}
