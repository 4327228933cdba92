//! Benchmark driver: prompt the model on every dataset position and compare
//! its move with the KataGo candidates.
//!
//! Positions run on a fixed-size rayon pool. Each finished position is written
//! to the result log straight away; aggregate statistics are reduced from the
//! returned results once the pool is done.

use crate::board::{placements_for, BoardEngine, BoardError};
use crate::client::{ChatClient, ChatMessage};
use crate::config::{results_path, summary_path, EvalConfig};
use crate::coord::{CoordError, Move};
use crate::parse::{extract_move, extract_win_rate};
use crate::render::{render_position, InputMode, PromptTemplate, TaskType};
use crate::reward;
use crate::types::{best_candidate, find_candidate, PositionRecord};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PositionError {
    #[error("bad move '{0}' in history: {1}")]
    BadMove(String, CoordError),
    #[error(transparent)]
    Board(#[from] BoardError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WinRateInfo {
    /// Model's own estimate, as a fraction.
    pub predicted_win_rate: Option<f64>,
    pub curr_move_win_rate: Option<f64>,
    pub best_move_win_rate: Option<f64>,
}

/// One output line per dataset record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub index: usize,
    pub board_moves: Vec<String>,
    pub predicted_move: String,
    pub predicted_win_rate_info: WinRateInfo,
    pub matched: bool,
    pub rank: Option<usize>,
    pub win_rate_gap: Option<f64>,
    pub score_lead_gap: Option<f64>,
    pub best_move: Option<String>,
    pub best_win_rate: Option<f64>,
    pub reward: f64,
    pub raw_prompt: Vec<ChatMessage>,
    pub raw_response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvalStats {
    pub total_moves: usize,
    pub matched_moves: usize,
    pub match_rate: f64,
    /// Mean over matched positions that reported a win rate.
    pub average_win_rate_gap: Option<f64>,
    pub average_reward: f64,
    pub failed_positions: usize,
    pub skipped_records: usize,
}

impl EvalStats {
    pub fn from_results(results: &[EvaluationResult], skipped_records: usize) -> Self {
        let total_moves = results.len();
        let matched_moves = results.iter().filter(|r| r.matched).count();
        let gaps: Vec<f64> = results.iter().filter(|r| r.matched).filter_map(|r| r.win_rate_gap).collect();
        let mean = |sum: f64, n: usize| if n > 0 { sum / n as f64 } else { 0.0 };
        Self {
            total_moves,
            matched_moves,
            match_rate: mean(matched_moves as f64, total_moves),
            average_win_rate_gap: (!gaps.is_empty()).then(|| mean(gaps.iter().sum(), gaps.len())),
            average_reward: mean(results.iter().map(|r| r.reward).sum(), total_moves),
            failed_positions: results.iter().filter(|r| r.error.is_some()).count(),
            skipped_records,
        }
    }
}

/// Append-only JSONL writer shared by the workers. Each record becomes one
/// complete, flushed line.
pub struct ResultLog {
    writer: Mutex<BufWriter<File>>,
}

impl ResultLog {
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self { writer: Mutex::new(BufWriter::new(File::create(path)?)) })
    }

    pub fn append<T: Serialize>(&self, record: &T) -> io::Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut w = self.writer.lock().map_err(|_| io::Error::new(io::ErrorKind::Other, "result log poisoned"))?;
        w.write_all(line.as_bytes())?;
        w.flush()
    }
}

pub struct Dataset {
    pub records: Vec<PositionRecord>,
    /// Lines that failed to parse.
    pub skipped: usize,
}

pub fn load_dataset<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("opening dataset {}", path.display()))?;
    let mut records = Vec::new();
    let mut skipped = 0usize;
    for (lineno, line) in BufReader::new(f).lines().enumerate() {
        let line = line.with_context(|| format!("reading {}", path.display()))?;
        let l = line.trim();
        if l.is_empty() { continue; }
        match serde_json::from_str::<PositionRecord>(l) {
            Ok(r) => records.push(r),
            Err(e) => {
                warn!("{}:{}: skipping malformed record: {e}", path.display(), lineno + 1);
                skipped += 1;
            }
        }
    }
    Ok(Dataset { records, skipped })
}

pub struct Evaluator<'a> {
    client: &'a dyn ChatClient,
    engine: &'a dyn BoardEngine,
    template: PromptTemplate,
    mode: InputMode,
}

impl<'a> Evaluator<'a> {
    pub fn new(client: &'a dyn ChatClient, engine: &'a dyn BoardEngine, task: TaskType, mode: InputMode) -> Self {
        Self { client, engine, template: PromptTemplate::for_task(task), mode }
    }

    /// Chat messages for a position: move history plus the engine's board.
    pub fn build_prompt(&self, board_moves: &[String]) -> Result<Vec<ChatMessage>, PositionError> {
        let moves = board_moves
            .iter()
            .map(|m| m.parse::<Move>().map_err(|e| PositionError::BadMove(m.clone(), e)))
            .collect::<Result<Vec<_>, _>>()?;
        let outcome = self.engine.apply(&placements_for(&moves))?;
        if !outcome.success {
            warn!("{} engine: {}", self.engine.name(), outcome.message.as_deref().unwrap_or("illegal move in history"));
        }
        Ok(self.template.messages(&render_position(&moves, &outcome.board, self.mode)))
    }

    pub fn evaluate_position(&self, index: usize, record: &PositionRecord) -> EvaluationResult {
        let best = best_candidate(&record.candidates);
        let mut result = EvaluationResult {
            index,
            board_moves: record.board_moves.clone(),
            predicted_move: String::new(),
            predicted_win_rate_info: WinRateInfo { best_move_win_rate: best.map(|b| b.win_rate), ..Default::default() },
            matched: false,
            rank: None,
            win_rate_gap: None,
            score_lead_gap: None,
            best_move: best.map(|b| b.mv.clone()),
            best_win_rate: best.map(|b| b.win_rate),
            reward: 0.0,
            raw_prompt: Vec::new(),
            raw_response: String::new(),
            error: None,
        };

        match self.build_prompt(&record.board_moves) {
            Ok(p) => result.raw_prompt = p,
            Err(e) => {
                warn!("position {index}: {e}");
                result.error = Some(e.to_string());
                return result;
            }
        }
        match self.client.complete(&result.raw_prompt) {
            Ok(text) => result.raw_response = text,
            Err(e) => {
                warn!("position {index}: {} request failed: {e}", self.client.model());
                result.error = Some(e.to_string());
                return result;
            }
        }

        let predicted = extract_move(&result.raw_response).map(|m| m.to_string()).unwrap_or_default();
        let predicted_wr = extract_win_rate(&result.raw_response);
        result.predicted_win_rate_info.predicted_win_rate = predicted_wr;
        if let Some((rank, hit)) = find_candidate(&record.candidates, &predicted) {
            result.matched = true;
            result.rank = Some(rank);
            result.predicted_win_rate_info.curr_move_win_rate = Some(hit.win_rate);
            result.win_rate_gap = predicted_wr.map(|p| (p - hit.win_rate).abs());
            result.score_lead_gap = best.map(|b| (b.score_lead - hit.score_lead).abs());
        }
        result.predicted_move = predicted;
        result.reward = reward::score(&result.raw_response, &record.ground_truth());
        result
    }

    /// Evaluate every record on `threads` workers, appending each result to `log`
    /// as it completes. Results come back in dataset order.
    pub fn evaluate_all(
        &self,
        records: &[PositionRecord],
        threads: usize,
        log: &ResultLog,
        progress: &ProgressBar,
    ) -> Result<Vec<EvaluationResult>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .build()
            .context("building worker pool")?;
        let results = pool.install(|| {
            records
                .par_iter()
                .enumerate()
                .map(|(i, rec)| {
                    let r = self.evaluate_position(i, rec);
                    log.append(&r)?;
                    progress.inc(1);
                    Ok(r)
                })
                .collect::<io::Result<Vec<_>>>()
        });
        results.context("writing evaluation results")
    }
}

pub struct RunReport {
    pub stats: EvalStats,
    pub results_path: PathBuf,
    pub summary_path: PathBuf,
    pub elapsed: Duration,
}

pub fn format_summary(
    config: &EvalConfig,
    engine: &str,
    timestamp: &str,
    stats: &EvalStats,
    elapsed: Duration,
    results: &Path,
) -> String {
    let gap = stats.average_win_rate_gap.map_or_else(|| "n/a".to_string(), |g| format!("{g:.4}"));
    let mut s = String::new();
    s.push_str("Go evaluation summary\n");
    s.push_str(&"=".repeat(50));
    s.push_str("\n\n");
    s.push_str(&format!("Model: {}\n", config.client.model));
    s.push_str(&format!("API base: {}\n", config.client.api_base));
    s.push_str(&format!("Task type: {}\n", config.task_type));
    s.push_str(&format!("Input mode: {}\n", config.input_mode));
    s.push_str(&format!("Board engine: {engine}\n"));
    s.push_str(&format!("Evaluated at: {timestamp}\n\n"));
    s.push_str("Results:\n");
    s.push_str(&format!("Total moves: {}\n", stats.total_moves));
    s.push_str(&format!("Matched moves: {}\n", stats.matched_moves));
    s.push_str(&format!("Match rate: {:.2}%\n", stats.match_rate * 100.0));
    s.push_str(&format!("Average win rate gap: {gap}\n"));
    s.push_str(&format!("Average reward: {:.4}\n", stats.average_reward));
    s.push_str(&format!("Failed positions: {}\n", stats.failed_positions));
    s.push_str(&format!("Skipped records: {}\n", stats.skipped_records));
    s.push_str(&format!("Elapsed: {:.2}s\n\n", elapsed.as_secs_f64()));
    s.push_str(&format!("Detailed results: {}\n", results.display()));
    s
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::with_template("{msg} [{elapsed_precise}] {bar:40} {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb.set_message("evaluating");
    pb
}

/// Run the whole benchmark: load, evaluate, write results and summary.
pub fn run(config: &EvalConfig, client: &dyn ChatClient, engine: &dyn BoardEngine) -> Result<RunReport> {
    let now = chrono::Local::now();
    let run_dir = config.run_dir(&now.format("%Y%m%d_%H%M%S").to_string());
    create_dir_all(&run_dir).with_context(|| format!("creating {}", run_dir.display()))?;
    let results_file = results_path(&run_dir);
    let summary_file = summary_path(&run_dir);

    let mut dataset = load_dataset(&config.input_file)?;
    if let Some(n) = config.limit {
        dataset.records.truncate(n);
    }
    info!(
        "evaluating {} positions with {} on {} threads (engine={}, task={}, mode={})",
        dataset.records.len(), config.client.model, config.threads, engine.name(), config.task_type, config.input_mode
    );

    let log = ResultLog::create(&results_file).with_context(|| format!("creating {}", results_file.display()))?;
    let progress = progress_bar(dataset.records.len());
    let evaluator = Evaluator::new(client, engine, config.task_type, config.input_mode);
    let start = Instant::now();
    let results = evaluator.evaluate_all(&dataset.records, config.threads, &log, &progress)?;
    let elapsed = start.elapsed();
    progress.finish_and_clear();

    let stats = EvalStats::from_results(&results, dataset.skipped);
    let summary = format_summary(
        config,
        engine.name(),
        &now.format("%Y-%m-%d %H:%M:%S").to_string(),
        &stats,
        elapsed,
        &results_file,
    );
    std::fs::write(&summary_file, summary).with_context(|| format!("writing {}", summary_file.display()))?;
    info!("matched {}/{} positions in {:.2}s", stats.matched_moves, stats.total_moves, elapsed.as_secs_f64());

    Ok(RunReport { stats, results_path: results_file, summary_path: summary_file, elapsed })
}
