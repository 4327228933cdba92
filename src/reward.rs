//! Scalar reward for a model answer against KataGo candidates.
//!
//! The policy is applied in order and stops at the first failing gate:
//! unparseable answer (0), missing reasoning (0), wrong color (0.1 - 0.1).
//! Past the gates the answer earns a tier bonus for where its move sits among
//! the candidates, plus two smooth bonuses: closeness of the move's true win
//! rate to the best one, and closeness of the self-reported win rate to the
//! move's true win rate. A move outside the candidate list is penalised.

use crate::coord::Color;
use crate::parse::parse_response;
use crate::types::{best_candidate, find_candidate, GroundTruth};
use log::debug;
use rand::Rng;
use serde::Serialize;

pub const FORMAT_BONUS: f64 = 0.1;
pub const TOP1_BONUS: f64 = 0.6;
pub const NEAR_TOP_BONUS: f64 = 0.4;
pub const MATCH_BONUS: f64 = 0.2;
pub const PROXIMITY_WEIGHT: f64 = 0.1;
pub const CALIBRATION_WEIGHT: f64 = 0.2;
pub const COLOR_PENALTY: f64 = 0.1;
pub const MISS_PENALTY: f64 = 0.1;
/// A non-best candidate within this fraction of the best win rate is "near top".
pub const NEAR_TOP_RATIO: f64 = 0.9;
const SHARPNESS: f64 = 10.0;
const DEBUG_SAMPLE_RATE: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    ParseFailure,
    NoReasoning,
    ColorMismatch,
    NotInCandidates,
    Top1,
    NearTop,
    Matched,
}

/// Per-component view of a reward.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardBreakdown {
    pub outcome: Outcome,
    pub format: f64,
    pub tier: f64,
    pub proximity: f64,
    pub calibration: f64,
    pub penalty: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

impl RewardBreakdown {
    fn gated(outcome: Outcome) -> Self {
        Self { outcome, format: 0.0, tier: 0.0, proximity: 0.0, calibration: 0.0, penalty: 0.0, parse_error: None }
    }

    pub fn total(&self) -> f64 {
        self.format + self.tier + self.proximity + self.calibration - self.penalty
    }
}

/// Smooth closeness bonus in (0, 1].
fn closeness(diff: f64) -> f64 { 1.0 / (1.0 + SHARPNESS * diff.abs()) }

pub fn score(response: &str, truth: &GroundTruth) -> f64 { score_detailed(response, truth).total() }

pub fn score_detailed(response: &str, truth: &GroundTruth) -> RewardBreakdown {
    if rand::thread_rng().gen_bool(DEBUG_SAMPLE_RATE) {
        debug!("sampled response:\n{response}");
    }

    let parsed = match parse_response(response) {
        Ok(p) => p,
        Err(e) => {
            debug!("reward: unparseable answer: {e}");
            return RewardBreakdown { parse_error: Some(e.to_string()), ..RewardBreakdown::gated(Outcome::ParseFailure) };
        }
    };
    if !parsed.has_reasoning_content() {
        return RewardBreakdown::gated(Outcome::NoReasoning);
    }

    let mut out = RewardBreakdown { format: FORMAT_BONUS, ..RewardBreakdown::gated(Outcome::NotInCandidates) };

    let expected = Color::to_play_after(truth.former_moves.len());
    if parsed.color != expected {
        debug!("reward: color mismatch, expected {expected} got {}", parsed.color);
        out.outcome = Outcome::ColorMismatch;
        out.penalty = COLOR_PENALTY;
        return out;
    }

    let mv = parsed.mv.to_string();
    let (best, (_, hit)) = match (best_candidate(&truth.candidates), find_candidate(&truth.candidates, &mv)) {
        (Some(best), Some(hit)) => (best, hit),
        _ => {
            debug!("reward: {mv} not among {} candidates", truth.candidates.len());
            out.penalty = MISS_PENALTY;
            return out;
        }
    };

    if hit.mv == best.mv {
        out.outcome = Outcome::Top1;
        out.tier = TOP1_BONUS;
    } else if hit.win_rate > best.win_rate * NEAR_TOP_RATIO {
        out.outcome = Outcome::NearTop;
        out.tier = NEAR_TOP_BONUS;
    } else {
        out.outcome = Outcome::Matched;
        out.tier = MATCH_BONUS;
    }
    out.proximity = PROXIMITY_WEIGHT * closeness(hit.win_rate - best.win_rate);
    out.calibration = CALIBRATION_WEIGHT * closeness(hit.win_rate - parsed.predicted_win_rate / 100.0);

    debug!(
        "reward: {mv} {:?} win_rate={:.2} best={:.2} predicted={:.2} score={:.2}",
        out.outcome, hit.win_rate, best.win_rate, parsed.predicted_win_rate / 100.0, out.total()
    );
    out
}

