use serde::{Deserialize, Serialize};

/// One engine-ranked alternative for a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "move")]
    pub mv: String,
    /// Probability in 0..=1 for the side to move.
    pub win_rate: f64,
    pub score_lead: f64,
}

/// Ground truth a response is scored against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    pub former_moves: Vec<String>,
    pub candidates: Vec<Candidate>,
}

/// One line of the benchmark dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub board_moves: Vec<String>,
    pub candidates: Vec<Candidate>,
}

impl PositionRecord {
    pub fn ground_truth(&self) -> GroundTruth {
        GroundTruth { former_moves: self.board_moves.clone(), candidates: self.candidates.clone() }
    }
}

/// Highest win rate candidate; the earliest one wins ties. NaN win rates are ignored.
pub fn best_candidate(candidates: &[Candidate]) -> Option<&Candidate> {
    candidates.iter().fold(None, |best: Option<&Candidate>, c| {
        if c.win_rate.is_nan() { return best; }
        match best {
            Some(b) if b.win_rate >= c.win_rate => Some(b),
            _ => Some(c),
        }
    })
}

/// First candidate whose move string equals `mv`, with its 1-based rank.
pub fn find_candidate<'a>(candidates: &'a [Candidate], mv: &str) -> Option<(usize, &'a Candidate)> {
    candidates.iter().enumerate().find(|(_, c)| c.mv == mv).map(|(i, c)| (i + 1, c))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(mv: &str, win_rate: f64) -> Candidate {
        Candidate { mv: mv.to_string(), win_rate, score_lead: 0.0 }
    }

    #[test]
    fn best_keeps_first_on_ties() {
        let c = vec![cand("D4", 0.5), cand("Q16", 0.6), cand("C3", 0.6)];
        assert_eq!(best_candidate(&c).unwrap().mv, "Q16");
        assert!(best_candidate(&[]).is_none());
        let with_nan = vec![cand("A1", f64::NAN), cand("B2", 0.1)];
        assert_eq!(best_candidate(&with_nan).unwrap().mv, "B2");
    }

    #[test]
    fn find_reports_rank() {
        let c = vec![cand("D4", 0.5), cand("Q16", 0.6)];
        assert_eq!(find_candidate(&c, "Q16").map(|(r, _)| r), Some(2));
        assert!(find_candidate(&c, "R4").is_none());
    }

    #[test]
    fn record_deserializes_move_field() {
        let line = r#"{"board_moves":["Q16","D4"],"candidates":[{"move":"Q4","win_rate":0.52,"score_lead":1.5}]}"#;
        let rec: PositionRecord = serde_json::from_str(line).unwrap();
        assert_eq!(rec.candidates[0].mv, "Q4");
        assert_eq!(rec.ground_truth().former_moves.len(), 2);
    }
}
