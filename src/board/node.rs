//! `@sabaki/go-board` driven through a Node.js subprocess.
//!
//! Each call spawns `node -e <script>` inside the module directory, writes the
//! placements as JSON on stdin and reads a single JSON object from stdout.

use super::{BoardEngine, BoardError, BoardOutcome, Placement};
use log::debug;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

const SCRIPT: &str = r#"
const Board = require('@sabaki/go-board');
let input = '';
process.stdin.setEncoding('utf8');
process.stdin.on('data', chunk => { input += chunk; });
process.stdin.on('end', () => {
  try {
    const moves = JSON.parse(input);
    let board = Board.fromDimensions(19);
    const steps = [];
    moves.forEach((m, i) => {
      try {
        if (!board.has(m.vertex)) throw new Error('vertex is off the board');
        board = board.makeMove(m.sign, m.vertex, {preventOverwrite: true, preventSuicide: true, preventKo: true});
        steps.push({step: i + 1, sign: m.sign, vertex: m.vertex, success: true, message: null});
      } catch (err) {
        steps.push({step: i + 1, sign: m.sign, vertex: m.vertex, success: false, message: err.message});
      }
    });
    const failed = steps.find(s => !s.success);
    console.log(JSON.stringify({
      success: !failed,
      board: board.signMap,
      steps,
      message: failed ? `step ${failed.step} failed: ${failed.message}` : null,
    }));
  } catch (err) {
    console.log(JSON.stringify({success: false, error: err.message}));
  }
});
"#;

#[derive(Debug, Clone)]
pub struct NodeEngine {
    module_dir: PathBuf,
    node_bin: String,
    timeout: Duration,
}

/// Check that the Node project and its `@sabaki/go-board` dependency are in place.
pub fn check_requirements(module_dir: &Path) -> Result<(), BoardError> {
    if !module_dir.is_dir() {
        return Err(BoardError::Unavailable(format!("module directory {} not found", module_dir.display())));
    }
    let package_json = module_dir.join("package.json");
    if !package_json.is_file() {
        return Err(BoardError::Unavailable(format!("{} not found", package_json.display())));
    }
    let node_modules = module_dir.join("node_modules");
    if !node_modules.is_dir() {
        return Err(BoardError::Unavailable(format!(
            "{} not found; run 'npm install'",
            node_modules.display()
        )));
    }
    if !node_modules.join("@sabaki").join("go-board").is_dir() {
        return Err(BoardError::Unavailable(
            "@sabaki/go-board is not installed; run 'npm install @sabaki/go-board'".to_string(),
        ));
    }
    Ok(())
}

/// Decode the script's stdout into an outcome.
pub fn parse_output(stdout: &str) -> Result<BoardOutcome, BoardError> {
    let value: serde_json::Value = serde_json::from_str(stdout.trim())
        .map_err(|e| BoardError::Malformed(format!("{e}; output: {}", stdout.trim())))?;
    if let Some(err) = value.get("error").and_then(|e| e.as_str()) {
        return Err(BoardError::Engine(err.to_string()));
    }
    let outcome: BoardOutcome =
        serde_json::from_value(value).map_err(|e| BoardError::Malformed(e.to_string()))?;
    outcome.board.validate()?;
    Ok(outcome)
}

fn drain<R: Read + Send + 'static>(mut r: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut s = String::new();
        let _ = r.read_to_string(&mut s);
        s
    })
}

/// Kill the child and collect its exit status.
fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn wait_with_deadline(child: &mut Child, timeout: Duration) -> Result<std::process::ExitStatus, BoardError> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if Instant::now() >= deadline => {
                reap(child);
                return Err(BoardError::Timeout(timeout));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                reap(child);
                return Err(BoardError::Unavailable(format!("waiting on node: {e}")));
            }
        }
    }
}

impl NodeEngine {
    pub fn new(module_dir: impl AsRef<Path>, timeout: Duration) -> Result<Self, BoardError> {
        let module_dir = module_dir.as_ref().to_path_buf();
        check_requirements(&module_dir)?;
        Ok(Self { module_dir, node_bin: "node".to_string(), timeout })
    }

    /// Use a different Node executable.
    pub fn with_node_bin(mut self, bin: impl Into<String>) -> Self {
        self.node_bin = bin.into();
        self
    }

    fn run(&self, payload: &str) -> Result<String, BoardError> {
        let mut child = Command::new(&self.node_bin)
            .arg("-e")
            .arg(SCRIPT)
            .current_dir(&self.module_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BoardError::Unavailable(format!("failed to start {}: {e}", self.node_bin)))?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(payload.as_bytes()) {
                drop(stdin);
                reap(&mut child);
                return Err(BoardError::Unavailable(format!("writing to node: {e}")));
            }
        }

        let status = wait_with_deadline(&mut child, self.timeout)?;
        let out = stdout.and_then(|h| h.join().ok()).unwrap_or_default();
        let err = stderr.and_then(|h| h.join().ok()).unwrap_or_default();
        if !status.success() {
            return Err(BoardError::Engine(format!("node exited with {status}: {}", err.trim())));
        }
        Ok(out)
    }
}

impl BoardEngine for NodeEngine {
    fn name(&self) -> &str { "node" }

    fn apply(&self, moves: &[Placement]) -> Result<BoardOutcome, BoardError> {
        let payload = serde_json::to_string(moves).map_err(|e| BoardError::Malformed(e.to_string()))?;
        debug!("node engine: {} placements", moves.len());
        let stdout = self.run(&payload)?;
        parse_output(&stdout)
    }
}
