use std::io::{self, BufRead, Write};

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;
use treechess::board::Board;
use treechess::engine::EngineConfig;
use treechess::game::{Game, HumanMove};
use treechess::moves::Move;
use treechess::piece::{Color, PieceKind};
use treechess::tree::{SearchObserver, TreeRecorder};

#[derive(Clone, Copy, ValueEnum)]
enum Side {
    White,
    Black,
}

impl From<Side> for Color {
    fn from(side: Side) -> Color {
        match side {
            Side::White => Color::White,
            Side::Black => Color::Black,
        }
    }
}

/// Play against the engine in the terminal, entering moves like `e2e4`.
#[derive(Parser)]
#[command(name = "play", about = "Human vs engine", long_about = None)]
struct Args {
    /// Engine search depth in plies
    #[arg(short, long, default_value = "3")]
    depth: u32,

    /// Colour the engine plays; picked at random when omitted
    #[arg(short, long, value_enum)]
    ai_color: Option<Side>,

    /// Print the engine's search tree as JSON after each of its moves
    #[arg(short, long)]
    tree: bool,

    /// Start from this position instead of the initial one
    #[arg(long)]
    fen: Option<String>,
}

fn read_line(lines: &mut impl Iterator<Item = io::Result<String>>, prompt: &str) -> Option<String> {
    print!("{prompt}");
    io::stdout().flush().ok()?;
    lines.next()?.ok().map(|l| l.trim().to_string())
}

fn ask_promotion(lines: &mut impl Iterator<Item = io::Result<String>>) -> Option<PieceKind> {
    loop {
        let answer = read_line(lines, "Promote to (q/r/b/n): ")?;
        match answer.chars().next().and_then(PieceKind::from_char) {
            Some(kind) if kind.is_promotion_choice() => return Some(kind),
            _ => println!("Choose one of q, r, b, n"),
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let ai_color = match args.ai_color {
        Some(side) => side.into(),
        None if rand::random::<bool>() => Color::White,
        None => Color::Black,
    };
    let board = match args.fen.as_deref().map(Board::from_fen).transpose() {
        Ok(board) => board.unwrap_or_default(),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };
    let config = EngineConfig {
        depth: args.depth,
        record_tree: args.tree,
    };
    let mut game = Game::from_board(board, ai_color, config);
    println!("You play {}. Enter moves like e2e4, or quit.", ai_color.opposite());

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        println!("\n{}\n", game.board());
        if game.outcome().is_terminal() {
            println!("{}", game.outcome());
            break;
        }

        if game.is_ai_turn() {
            let mut recorder = game.config().record_tree.then(TreeRecorder::new);
            let observer = recorder.as_mut().map(|r| r as &mut dyn SearchObserver);
            let notation = match game.play_ai_move(observer) {
                Ok((mv, _)) => mv.to_uci(),
                Err(e) => {
                    eprintln!("{e}");
                    break;
                }
            };
            println!("Engine plays {notation}");
            if let Some(tree) = recorder.map(TreeRecorder::into_tree) {
                match tree.to_json() {
                    Ok(json) => println!("{json}"),
                    Err(e) => eprintln!("could not serialize tree: {e}"),
                }
            }
            continue;
        }

        let Some(input) = read_line(&mut lines, &format!("{} to move: ", game.board().current_player())) else {
            break;
        };
        if input == "quit" {
            break;
        }
        let (mv, promotion): (Move, Option<PieceKind>) = match Move::from_uci(&input) {
            Ok(parsed) => parsed,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        match game.apply_human_move(mv.from.index(), mv.to.index()) {
            Ok(HumanMove::Played(_)) => {}
            Ok(HumanMove::AwaitingPromotion(pending)) => {
                let Some(kind) = promotion.or_else(|| ask_promotion(&mut lines)) else {
                    break;
                };
                if let Err(e) = game.complete_promotion(pending, kind) {
                    println!("{e}");
                }
            }
            Err(e) => println!("{e}"),
        }
    }
}
