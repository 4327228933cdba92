// Go move-prediction benchmark for chat models: prompt rendering, answer
// parsing, reward scoring and the threaded evaluation driver.
pub mod board;
pub mod client;
pub mod config;
pub mod coord;
pub mod eval;
pub mod parse;
pub mod render;
pub mod reward;
pub mod types;

pub use coord::{Color, Move};
pub use reward::{score, score_detailed, RewardBreakdown};
pub use types::{Candidate, GroundTruth, PositionRecord};
