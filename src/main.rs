use anyhow::{Context, Result};
use clap::Parser;
use gobench::board::{build_engine, EngineKind, EngineParams};
use gobench::client::{ClientParams, OpenAiClient};
use gobench::config::{api_key_from_env, EvalConfig, API_KEY_ENV};
use gobench::eval;
use gobench::render::{InputMode, TaskType};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "gobench", version, about = "Evaluate a chat model's next-move predictions against KataGo")]
struct Args {
    /// Base URL of the OpenAI-compatible API
    #[arg(long, default_value = "http://localhost:8000/v1")]
    api_base: String,

    /// Model name sent with every request
    #[arg(long)]
    model_name: String,

    /// API key; falls back to the GOBENCH_API_KEY environment variable
    #[arg(long)]
    api_key: Option<String>,

    /// Dataset of positions, one JSON record per line
    #[arg(long, default_value = "KataGo-Bench-1K/eval-files/KataGo-Bench-1k-eval.jsonl")]
    input_file: PathBuf,

    /// Results go to <output_dir>/<model>/<timestamp>/
    #[arg(long, default_value = "KataGo-Bench-1K/eval-results")]
    output_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = InputMode::Numbered)]
    input_mode: InputMode,

    #[arg(long, value_enum, default_value_t = TaskType::AddboardKatagoEval)]
    task_type: TaskType,

    /// Concurrent requests
    #[arg(long, default_value_t = 64)]
    num_threads: usize,

    #[arg(long, default_value_t = 4096)]
    max_tokens: u32,

    #[arg(long, default_value_t = 0.0)]
    temperature: f32,

    /// Extra attempts for transient request failures
    #[arg(long, default_value_t = 3)]
    retries: usize,

    /// Initial backoff between attempts
    #[arg(long, default_value_t = 1000)]
    retry_delay_ms: u64,

    #[arg(long, default_value_t = 600)]
    request_timeout_secs: u64,

    /// Board engine used to render positions
    #[arg(long, value_enum, default_value_t = EngineKind::Native)]
    engine: EngineKind,

    /// Node project holding @sabaki/go-board (node engine only)
    #[arg(long, default_value = ".")]
    node_dir: PathBuf,

    #[arg(long, default_value_t = 30)]
    node_timeout_secs: u64,

    /// Evaluate only the first N positions
    #[arg(long)]
    limit: Option<usize>,
}

impl Args {
    fn into_config(self) -> EvalConfig {
        let api_key = self.api_key.filter(|k| !k.trim().is_empty()).or_else(api_key_from_env);
        EvalConfig {
            input_file: self.input_file,
            output_dir: self.output_dir,
            input_mode: self.input_mode,
            task_type: self.task_type,
            threads: self.num_threads.max(1),
            limit: self.limit,
            client: ClientParams {
                api_base: self.api_base,
                api_key,
                model: self.model_name,
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                retries: self.retries,
                retry_delay: Duration::from_millis(self.retry_delay_ms),
                request_timeout: Duration::from_secs(self.request_timeout_secs),
            },
            engine: EngineParams {
                kind: self.engine,
                node_dir: self.node_dir,
                node_timeout: Duration::from_secs(self.node_timeout_secs),
            },
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let config = Args::parse().into_config();
    if config.client.api_key.is_none() {
        log::info!("no API key given (--api-key or {API_KEY_ENV}); sending unauthenticated requests");
    }

    let engine = build_engine(&config.engine).context("setting up board engine")?;
    let client = OpenAiClient::new(config.client.clone()).context("setting up HTTP client")?;
    let report = eval::run(&config, &client, engine.as_ref())?;

    let s = &report.stats;
    println!("Total moves: {}", s.total_moves);
    println!("Matched moves: {}", s.matched_moves);
    println!("Match rate: {:.2}%", s.match_rate * 100.0);
    match s.average_win_rate_gap {
        Some(g) => println!("Average win rate gap: {g:.4}"),
        None => println!("Average win rate gap: n/a"),
    }
    println!("Average reward: {:.4}", s.average_reward);
    if s.failed_positions > 0 || s.skipped_records > 0 {
        println!("Failed positions: {}  skipped records: {}", s.failed_positions, s.skipped_records);
    }
    println!("Elapsed: {:.2}s", report.elapsed.as_secs_f64());
    println!("Results: {}", report.results_path.display());
    println!("Summary: {}", report.summary_path.display());
    Ok(())
}
