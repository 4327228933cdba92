use crate::board::EngineParams;
use crate::client::ClientParams;
use crate::render::{InputMode, TaskType};
use std::path::{Path, PathBuf};

/// Environment variable consulted when no API key is given on the command line.
pub const API_KEY_ENV: &str = "GOBENCH_API_KEY";

/// Parameters of one evaluation run.
#[derive(Debug, Clone)]
pub struct EvalConfig {
    pub input_file: PathBuf,
    pub output_dir: PathBuf,
    pub input_mode: InputMode,
    pub task_type: TaskType,
    pub threads: usize,
    /// Evaluate only the first N records.
    pub limit: Option<usize>,
    pub client: ClientParams,
    pub engine: EngineParams,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            input_file: PathBuf::from("KataGo-Bench-1K/eval-files/KataGo-Bench-1k-eval.jsonl"),
            output_dir: PathBuf::from("KataGo-Bench-1K/eval-results"),
            input_mode: InputMode::Numbered,
            task_type: TaskType::AddboardKatagoEval,
            threads: 64,
            limit: None,
            client: ClientParams::default(),
            engine: EngineParams::default(),
        }
    }
}

impl EvalConfig {
    /// Model name without any `org/` path prefix.
    pub fn model_short_name(&self) -> &str {
        self.client.model.rsplit('/').next().unwrap_or(&self.client.model)
    }

    /// `<output_dir>/<model>/<timestamp>`
    pub fn run_dir(&self, timestamp: &str) -> PathBuf {
        self.output_dir.join(self.model_short_name()).join(timestamp)
    }
}

/// Non-empty API key from the environment.
pub fn api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty())
}

pub fn results_path(run_dir: &Path) -> PathBuf { run_dir.join("eval_results.jsonl") }

pub fn summary_path(run_dir: &Path) -> PathBuf { run_dir.join("summary.txt") }
