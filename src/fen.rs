//! Reading and writing positions in Forsyth-Edwards Notation.
//!
//! Only the first four fields carry information for this board. Castling
//! availability is stored on the pieces themselves, so a missing right marks
//! the matching rook as moved (and the king too once both rights are gone).
//! The en passant square flags the pawn that just passed over it. Move
//! clocks are accepted and ignored. A placement without exactly one king per
//! side is rejected.

use crate::board::Board;
use crate::error::{ChessError, Result};
use crate::moves::Square;
use crate::piece::{Color, Piece, PieceKind};

fn invalid(msg: impl Into<String>) -> ChessError {
    ChessError::InvalidFen(msg.into())
}

/// Castling letter, rook column, for each side.
const RIGHTS: [(char, Color, usize); 4] = [
    ('K', Color::White, 7),
    ('Q', Color::White, 0),
    ('k', Color::Black, 7),
    ('q', Color::Black, 0),
];

impl Board {
    pub fn from_fen(fen: &str) -> Result<Board> {
        let mut fields = fen.split_whitespace();
        let placement = fields.next().ok_or_else(|| invalid("empty string"))?;
        let side = fields.next().unwrap_or("w");
        let castling = fields.next().unwrap_or("-");
        let en_passant = fields.next().unwrap_or("-");

        let mut board = Board::empty();
        let rows: Vec<&str> = placement.split('/').collect();
        if rows.len() != 8 {
            return Err(invalid(format!("expected 8 ranks, found {}", rows.len())));
        }
        for (row, text) in rows.iter().enumerate() {
            let mut col = 0usize;
            for c in text.chars() {
                if let Some(skip) = c.to_digit(10) {
                    if !(1..=8).contains(&skip) {
                        return Err(invalid(format!("bad empty-square count {c:?}")));
                    }
                    col += skip as usize;
                    continue;
                }
                let piece = Piece::from_char(c).ok_or_else(|| invalid(format!("unknown piece {c:?}")))?;
                let sq = Square::from_coords(row, col)
                    .ok_or_else(|| invalid(format!("rank {} is too long", 8 - row)))?;
                board.set(sq, Some(piece));
                col += 1;
            }
            if col != 8 {
                return Err(invalid(format!("rank {} has {col} files", 8 - row)));
            }
        }

        for color in [Color::White, Color::Black] {
            let kings = board
                .pieces()
                .filter(|(_, p)| p.kind == PieceKind::King && p.color == color)
                .count();
            if kings != 1 {
                return Err(invalid(format!("expected one {color} king, found {kings}")));
            }
        }

        let side = match side {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(invalid(format!("bad side to move {other:?}"))),
        };
        board.set_current_player(side);

        board.mark_moved_pieces(castling)?;

        if en_passant != "-" {
            let target = Square::parse(en_passant)?;
            let pawn_sq = target
                .offset(side.opposite().forward(), 0)
                .ok_or_else(|| invalid(format!("bad en passant square {en_passant}")))?;
            match board.get(pawn_sq) {
                Some(mut pawn) if pawn.kind == PieceKind::Pawn && pawn.color != side => {
                    pawn.en_passant = true;
                    board.set(pawn_sq, Some(pawn));
                }
                _ => return Err(invalid(format!("no pawn behind en passant square {en_passant}"))),
            }
        }

        Ok(board)
    }

    fn mark_moved_pieces(&mut self, castling: &str) -> Result<()> {
        if castling != "-" {
            if let Some(c) = castling.chars().find(|c| !"KQkq".contains(*c)) {
                return Err(invalid(format!("bad castling field character {c:?}")));
            }
        }

        let squares: Vec<Square> = self.pieces().map(|(sq, _)| sq).collect();
        for sq in squares {
            let Some(mut piece) = self.get(sq) else {
                continue;
            };
            let home = piece.color.home_row();
            piece.moved = match piece.kind {
                PieceKind::Pawn => {
                    let pawn_row = if piece.color == Color::White { 6 } else { 1 };
                    sq.row() != pawn_row
                }
                PieceKind::Rook => !RIGHTS.iter().any(|&(c, color, col)| {
                    color == piece.color && castling.contains(c) && sq.row() == home && sq.col() == col
                }),
                PieceKind::King => !RIGHTS.iter().any(|&(c, color, _)| {
                    color == piece.color && castling.contains(c) && sq.row() == home && sq.col() == 4
                }),
                _ => false,
            };
            self.set(sq, Some(piece));
        }
        Ok(())
    }

    pub fn to_fen(&self) -> String {
        let mut placement = String::new();
        for row in 0..8 {
            let mut empty = 0;
            for col in 0..8 {
                match Square::from_coords(row, col).and_then(|sq| self.get(sq)) {
                    Some(p) => {
                        if empty > 0 {
                            placement.push_str(&empty.to_string());
                            empty = 0;
                        }
                        placement.push(p.to_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                placement.push_str(&empty.to_string());
            }
            if row < 7 {
                placement.push('/');
            }
        }

        let side = match self.current_player() {
            Color::White => "w",
            Color::Black => "b",
        };

        let castling: String = RIGHTS
            .iter()
            .filter(|&&(_, color, col)| self.can_still_castle(color, col))
            .map(|&(c, _, _)| c)
            .collect();
        let castling = if castling.is_empty() { "-".to_string() } else { castling };

        let en_passant = self
            .en_passant_target()
            .map(|sq| sq.to_string())
            .unwrap_or_else(|| "-".to_string());

        format!("{placement} {side} {castling} {en_passant} 0 1")
    }

    fn can_still_castle(&self, color: Color, rook_col: usize) -> bool {
        let home = color.home_row();
        let unmoved = |col: usize, kind: PieceKind| {
            Square::from_coords(home, col)
                .and_then(|sq| self.get(sq))
                .is_some_and(|p| p.kind == kind && p.color == color && !p.moved)
        };
        unmoved(4, PieceKind::King) && unmoved(rook_col, PieceKind::Rook)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn start_position_matches_new() {
        let board = Board::from_fen(START).unwrap();
        assert_eq!(board.snapshot(), Board::new().snapshot());
        assert_eq!(Board::new().to_fen(), START);
    }

    #[test]
    fn fen_round_trips() {
        for fen in [
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1",
            "r3k3/8/8/8/8/8/8/4K2R b Kq - 0 1",
        ] {
            assert_eq!(Board::from_fen(fen).unwrap().to_fen(), fen);
        }
    }

    #[test]
    fn missing_rights_mark_pieces_moved() {
        let board = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w Kq - 0 1").unwrap();
        let at = |name: &str| board.get(Square::parse(name).unwrap()).unwrap();
        assert!(!at("h1").moved);
        assert!(at("a1").moved);
        assert!(!at("e1").moved);
        assert!(at("h8").moved);
        assert!(!at("a8").moved);

        let board = Board::from_fen("4k3/8/8/8/8/8/8/R3K2R w - - 0 1").unwrap();
        assert!(board.get(Square::parse("e1").unwrap()).unwrap().moved);
        assert!(!board.legal_targets(Square::parse("e1").unwrap()).contains(&Square::parse("g1").unwrap()));
    }

    #[test]
    fn en_passant_field_flags_the_pawn() {
        let board = Board::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").unwrap();
        assert!(board.get(Square::parse("d5").unwrap()).unwrap().en_passant);
        assert_eq!(board.en_passant_target(), Square::parse("d6").ok());
    }

    #[test]
    fn malformed_input_is_rejected() {
        for fen in [
            "",
            "8/8/8/8 w - - 0 1",
            "rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnx/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQz - 0 1",
            "4k3/8/8/8/8/8/8/4K3 w - e6 0 1",
            "4k3/8/8/08/8/8/8/4K3 w - - 0 1",
            "8/8/8/8/8/8/8/4K3 w - - 0 1",
            "4k3/8/8/8/8/8/8/K3K3 w - - 0 1",
        ] {
            assert!(Board::from_fen(fen).is_err(), "accepted {fen:?}");
        }
    }
}
