use anyhow::{Context, Result};
use clap::Parser;
use gobench::{score_detailed, GroundTruth};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gobench-score", about = "Score saved model responses with the reward function")]
struct Args {
    /// JSONL file of {"response": ..., "ground_truth": {...}} records
    #[arg(long)]
    input: PathBuf,
    /// Print one JSON breakdown per line instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Deserialize)]
struct Sample {
    response: String,
    ground_truth: GroundTruth,
}

fn main() -> Result<()> {
    env_logger::init();
    let a = Args::parse();
    let f = File::open(&a.input).with_context(|| format!("opening {}", a.input.display()))?;
    let mut total = 0.0;
    let mut n = 0usize;
    for (i, line) in BufReader::new(f).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let sample: Sample = match serde_json::from_str(&line) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("line {}: {e}", i + 1);
                continue;
            }
        };
        let b = score_detailed(&sample.response, &sample.ground_truth);
        if a.json {
            println!("{}", serde_json::json!({"line": i + 1, "reward": b.total(), "breakdown": b}));
        } else {
            println!("{:>5}  {:>7.4}  {:?}", i + 1, b.total(), b.outcome);
        }
        total += b.total();
        n += 1;
    }
    if n > 0 {
        eprintln!("scored {n} responses, mean reward {:.4}", total / n as f64);
    } else {
        eprintln!("no responses scored");
    }
    Ok(())
}
