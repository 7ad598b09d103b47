pub mod board;
pub mod engine;
pub mod error;
pub mod eval;
pub mod execute;
pub mod fen;
pub mod game;
pub mod movegen;
pub mod moves;
pub mod piece;
pub mod status;
pub mod tree;

#[cfg(target_arch = "wasm32")]
mod wasm_api;
