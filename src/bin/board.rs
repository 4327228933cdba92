use anyhow::{Context, Result};
use clap::Parser;
use gobench::board::{build_engine, placements_for, EngineKind, EngineParams};
use gobench::render::parse_move_record;
use gobench::Move;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "gobench-board", about = "Play a move sequence on a board engine and print the result")]
struct Args {
    /// Moves, either `Q16 D4 ...` or a numbered record `1.X-Q16 2.O-D4 ...`
    #[arg(required = true)]
    moves: Vec<String>,
    #[arg(long, value_enum, default_value_t = EngineKind::Native)]
    engine: EngineKind,
    #[arg(long, default_value = ".")]
    node_dir: PathBuf,
    #[arg(long, default_value_t = 30)]
    node_timeout_secs: u64,
    /// Print the nested-list grid used in prompts
    #[arg(long)]
    list: bool,
}

fn parse_moves(args: &[String]) -> Result<Vec<Move>> {
    let joined = args.join(" ");
    let record = parse_move_record(&joined);
    if !record.is_empty() {
        return Ok(record.into_iter().map(|(_, m)| m).collect());
    }
    joined
        .split_whitespace()
        .map(|s| s.parse::<Move>().with_context(|| format!("bad move '{s}'")))
        .collect()
}

fn main() -> Result<()> {
    env_logger::init();
    let a = Args::parse();
    let moves = parse_moves(&a.moves)?;
    let params = EngineParams {
        kind: a.engine,
        node_dir: a.node_dir,
        node_timeout: Duration::from_secs(a.node_timeout_secs),
    };
    let engine = build_engine(&params)?;
    let outcome = engine.apply(&placements_for(&moves))?;

    for (s, mv) in outcome.steps.iter().zip(&moves) {
        let color = if s.sign > 0 { "black" } else { "white" };
        if s.success {
            println!("{:>3}. {color} {mv}", s.step);
        } else {
            println!("{:>3}. {color} {mv}  ILLEGAL: {}", s.step, s.message.as_deref().unwrap_or("rejected"));
        }
    }
    println!();
    print!("{}", outcome.board);
    println!(
        "black stones: {}  white stones: {}",
        outcome.board.stone_count(1),
        outcome.board.stone_count(-1)
    );
    if a.list {
        println!("{}", outcome.board.to_list_string());
    }
    if let Some(m) = &outcome.message {
        eprintln!("{m}");
    }
    Ok(())
}
