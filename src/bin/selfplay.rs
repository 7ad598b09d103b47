use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use treechess::board::Board;
use treechess::engine::{select_move_with, EngineConfig};

/// Let the engine play both sides from the starting position (or a FEN).
#[derive(Parser)]
#[command(name = "selfplay", about = "Engine vs engine", long_about = None)]
struct Args {
    /// Search depth in plies for both sides
    #[arg(short, long, default_value = "2")]
    depth: u32,

    /// Stop after this many plies if the game is still going
    #[arg(short, long, default_value = "60")]
    max_moves: usize,

    /// Print each search tree as JSON
    #[arg(short, long)]
    tree: bool,

    /// Start from this position instead of the initial one
    #[arg(long)]
    fen: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = EngineConfig {
        depth: args.depth,
        record_tree: args.tree,
    };

    let mut board = match args.fen.as_deref().map(Board::from_fen).transpose() {
        Ok(board) => board.unwrap_or_default(),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    let mut outcome = board.status();
    let mut move_count = 0;
    while !outcome.is_terminal() && move_count < args.max_moves {
        let color = board.current_player();
        let (result, tree) = match select_move_with(&mut board, color, &config) {
            Ok(found) => found,
            Err(e) => {
                eprintln!("{e}");
                break;
            }
        };
        let notation = board.notation(result.mv);
        if let Some(tree) = tree {
            match tree.to_json() {
                Ok(json) => println!("{json}"),
                Err(e) => eprintln!("could not serialize tree: {e}"),
            }
        }
        outcome = match board.apply(result.mv) {
            Ok(outcome) => outcome,
            Err(e) => {
                eprintln!("{e}");
                break;
            }
        };
        move_count += 1;
        info!(ply = move_count, %color, %notation, score = result.score, nodes = result.nodes);
    }

    eprintln!("{board}");
    let result = if outcome.is_terminal() {
        outcome.to_string()
    } else {
        "ongoing".to_string()
    };
    eprintln!("Game over after {move_count} moves: {result}");
    eprintln!("{}", board.to_fen());
}
