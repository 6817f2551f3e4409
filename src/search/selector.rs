//! Policy-guided move selection.
//!
//! Masks the policy output down to the legal moves supplied by the host and
//! picks the highest-scoring one. Every failure short of an empty move list
//! degrades to the first legal descriptor, so the agent always answers with
//! a move the host offered.

use std::fmt;

use log::{debug, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::state::BoardState;
use crate::eval::neural::PolicyEngine;
use crate::nn::action::descriptor_to_action;
use crate::nn::encoding::encode_board;

/// Errors returned by the selector.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectError {
    #[error("no legal moves supplied")]
    NoLegalMoves,
}

/// Why the selector did not use the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// None of the descriptors mapped to an action index.
    Unencodable,
    /// The engine has no model loaded.
    NotReady,
    /// The model was loaded but inference failed.
    InferenceFailed,
}

/// How a selection was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    Policy,
    Fallback(FallbackReason),
    Exploration,
}

impl fmt::Display for SelectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionSource::Policy => f.write_str("policy"),
            SelectionSource::Fallback(FallbackReason::Unencodable) => {
                f.write_str("fallback (unencodable)")
            }
            SelectionSource::Fallback(FallbackReason::NotReady) => {
                f.write_str("fallback (not ready)")
            }
            SelectionSource::Fallback(FallbackReason::InferenceFailed) => {
                f.write_str("fallback (inference failed)")
            }
            SelectionSource::Exploration => f.write_str("exploration"),
        }
    }
}

/// The chosen move.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// The caller's descriptor, exactly as supplied.
    pub descriptor: String,
    /// Position of the descriptor in the caller's list.
    pub position: usize,
    pub action: Option<usize>,
    /// Raw policy score of the chosen action.
    pub score: Option<f32>,
    /// Score renormalized over the legal set.
    pub confidence: Option<f32>,
    pub source: SelectionSource,
}

impl Selection {
    fn fallback<S: AsRef<str>>(legal: &[S], reason: FallbackReason) -> Selection {
        Selection {
            descriptor: legal[0].as_ref().to_string(),
            position: 0,
            action: descriptor_to_action(legal[0].as_ref()),
            score: None,
            confidence: None,
            source: SelectionSource::Fallback(reason),
        }
    }
}

/// A legal descriptor that maps to an action index.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    position: usize,
    action: usize,
}

/// Maps descriptors to action indices, dropping the ones that do not parse
/// or touch light squares. Caller order and duplicates are preserved.
fn encode_candidates<S: AsRef<str>>(legal: &[S]) -> Vec<Candidate> {
    legal
        .iter()
        .enumerate()
        .filter_map(|(position, d)| match descriptor_to_action(d.as_ref()) {
            Some(action) => Some(Candidate { position, action }),
            None => {
                debug!("skipping unencodable move descriptor '{}'", d.as_ref());
                None
            }
        })
        .collect()
}

/// Selects the legal move with the highest policy score.
///
/// Ties go to the candidate that appears first in `legal`, which makes the
/// choice reproducible for a fixed model, board and move list. NaN scores
/// never win. Returns the caller's original descriptor string.
///
/// Falls back to `legal[0]` when no descriptor encodes, when the engine is
/// not ready, or when inference fails. Only an empty list is an error.
pub fn select_move<S: AsRef<str>>(
    engine: &PolicyEngine,
    board: &BoardState,
    legal: &[S],
) -> Result<Selection, SelectError> {
    if legal.is_empty() {
        return Err(SelectError::NoLegalMoves);
    }

    let candidates = encode_candidates(legal);
    if candidates.is_empty() {
        warn!("no legal move descriptor could be encoded, using first");
        return Ok(Selection::fallback(legal, FallbackReason::Unencodable));
    }

    if !engine.is_ready() {
        return Ok(Selection::fallback(legal, FallbackReason::NotReady));
    }

    let scores = match engine.predict(&encode_board(board)) {
        Ok(s) => s,
        Err(e) => {
            warn!("policy inference failed, using first legal move: {}", e);
            return Ok(Selection::fallback(legal, FallbackReason::InferenceFailed));
        }
    };

    let mut best: Option<(Candidate, f32)> = None;
    for &c in &candidates {
        let score = scores[c.action];
        if score.is_nan() {
            continue;
        }
        // Strictly greater: the earliest candidate keeps a tie.
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((c, score));
        }
    }

    let (chosen, score) = match best {
        Some(b) => b,
        None => (candidates[0], scores[candidates[0].action]),
    };

    let total: f32 = candidates
        .iter()
        .map(|c| scores[c.action])
        .filter(|s| s.is_finite())
        .sum();
    let confidence = if total > 0.0 && score.is_finite() {
        Some(score / total)
    } else {
        None
    };

    Ok(Selection {
        descriptor: legal[chosen.position].as_ref().to_string(),
        position: chosen.position,
        action: Some(chosen.action),
        score: Some(score),
        confidence,
        source: SelectionSource::Policy,
    })
}

/// Selector tuning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Probability of playing a random encodable legal move instead of the
    /// policy's choice. Zero keeps selection fully deterministic.
    pub exploration_rate: f64,
    /// Seed for the exploration RNG. Entropy-seeded when absent.
    pub seed: Option<u64>,
}

/// [`select_move`] with optional epsilon exploration.
pub struct MoveSelector {
    exploration_rate: f64,
    rng: SmallRng,
}

impl MoveSelector {
    pub fn new(config: &SelectorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        MoveSelector {
            exploration_rate: config.exploration_rate.clamp(0.0, 1.0),
            rng,
        }
    }

    pub fn exploration_rate(&self) -> f64 {
        self.exploration_rate
    }

    pub fn set_exploration_rate(&mut self, rate: f64) {
        self.exploration_rate = rate.clamp(0.0, 1.0);
    }

    /// Selects a move, exploring only when the policy produced the pick and
    /// more than one candidate is available.
    pub fn select<S: AsRef<str>>(
        &mut self,
        engine: &PolicyEngine,
        board: &BoardState,
        legal: &[S],
    ) -> Result<Selection, SelectError> {
        let selection = select_move(engine, board, legal)?;
        if selection.source != SelectionSource::Policy || self.exploration_rate <= 0.0 {
            return Ok(selection);
        }

        let candidates = encode_candidates(legal);
        if candidates.len() < 2 || !self.rng.gen_bool(self.exploration_rate) {
            return Ok(selection);
        }

        let pick = candidates[self.rng.gen_range(0..candidates.len())];
        debug!(
            "exploring: {} instead of {}",
            legal[pick.position].as_ref(),
            selection.descriptor
        );
        Ok(Selection {
            descriptor: legal[pick.position].as_ref().to_string(),
            position: pick.position,
            action: Some(pick.action),
            score: None,
            confidence: None,
            source: SelectionSource::Exploration,
        })
    }
}

impl Default for MoveSelector {
    fn default() -> Self {
        Self::new(&SelectorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::neural::tests::FixedModel;
    use crate::nn::action::ACTION_SPACE;

    fn engine_with(scores: &[(&str, f32)]) -> PolicyEngine {
        let mut v = vec![0.0f32; ACTION_SPACE];
        for &(d, s) in scores {
            v[descriptor_to_action(d).unwrap()] = s;
        }
        PolicyEngine::with_model(Box::new(FixedModel(v)))
    }

    #[test]
    fn empty_list_is_an_error() {
        let engine = PolicyEngine::new();
        let legal: [&str; 0] = [];
        assert_eq!(
            select_move(&engine, &BoardState::empty(), &legal),
            Err(SelectError::NoLegalMoves)
        );
    }

    #[test]
    fn not_ready_returns_first_legal() {
        let engine = PolicyEngine::new();
        let legal = ["6,1->5,2", "6,3->5,4"];
        let sel = select_move(&engine, &BoardState::empty(), &legal).unwrap();
        assert_eq!(sel.descriptor, "6,1->5,2");
        assert_eq!(sel.source, SelectionSource::Fallback(FallbackReason::NotReady));
    }

    #[test]
    fn picks_highest_scoring_legal_move() {
        let engine = engine_with(&[("6,1->5,2", 0.1), ("6,3->5,4", 0.7), ("6,5->5,6", 0.2)]);
        let legal = ["6,1->5,2", "6,3->5,4", "6,5->5,6"];
        let sel = select_move(&engine, &BoardState::empty(), &legal).unwrap();
        assert_eq!(sel.descriptor, "6,3->5,4");
        assert_eq!(sel.position, 1);
        assert_eq!(sel.source, SelectionSource::Policy);
        assert_eq!(sel.score, Some(0.7));
        let conf = sel.confidence.unwrap();
        assert!((conf - 0.7).abs() < 1e-6);
    }

    #[test]
    fn illegal_high_scores_are_masked() {
        // 7,0->6,1 scores highest but is not offered.
        let engine = engine_with(&[("7,0->6,1", 0.9), ("6,1->5,2", 0.05), ("6,3->5,4", 0.04)]);
        let legal = ["6,3->5,4", "6,1->5,2"];
        let sel = select_move(&engine, &BoardState::empty(), &legal).unwrap();
        assert_eq!(sel.descriptor, "6,1->5,2");
    }

    #[test]
    fn ties_go_to_first_encountered() {
        let engine = engine_with(&[("6,1->5,2", 0.5), ("6,3->5,4", 0.5)]);
        let legal = ["6,3->5,4", "6,1->5,2"];
        let sel = select_move(&engine, &BoardState::empty(), &legal).unwrap();
        assert_eq!(sel.descriptor, "6,3->5,4");

        let legal = ["6,1->5,2", "6,3->5,4"];
        let sel = select_move(&engine, &BoardState::empty(), &legal).unwrap();
        assert_eq!(sel.descriptor, "6,1->5,2");
    }

    #[test]
    fn malformed_descriptors_are_skipped() {
        let engine = engine_with(&[("6,3->5,4", 0.3)]);
        let legal = ["junk", "6,3->5,4", "1,1->2,2"];
        let sel = select_move(&engine, &BoardState::empty(), &legal).unwrap();
        assert_eq!(sel.descriptor, "6,3->5,4");
        assert_eq!(sel.position, 1);
    }

    #[test]
    fn all_malformed_returns_first_raw() {
        let engine = engine_with(&[]);
        let legal = ["junk", "also junk"];
        let sel = select_move(&engine, &BoardState::empty(), &legal).unwrap();
        assert_eq!(sel.descriptor, "junk");
        assert_eq!(
            sel.source,
            SelectionSource::Fallback(FallbackReason::Unencodable)
        );
        assert_eq!(sel.action, None);
    }

    #[test]
    fn original_string_is_preserved() {
        let engine = engine_with(&[("6,3->5,4", 0.9)]);
        let legal = ["6,1->5,2".to_string(), " 6,3 -> 5,4".to_string()];
        let sel = select_move(&engine, &BoardState::empty(), &legal).unwrap();
        assert_eq!(sel.descriptor, " 6,3 -> 5,4");
    }

    #[test]
    fn duplicates_keep_first_position() {
        let engine = engine_with(&[("6,3->5,4", 0.9)]);
        let legal = ["6,1->5,2", "6,3->5,4", "6,3->5,4"];
        let sel = select_move(&engine, &BoardState::empty(), &legal).unwrap();
        assert_eq!(sel.position, 1);
    }

    #[test]
    fn nan_scores_never_win() {
        let engine = engine_with(&[("6,1->5,2", f32::NAN), ("6,3->5,4", 0.2)]);
        let legal = ["6,1->5,2", "6,3->5,4"];
        let sel = select_move(&engine, &BoardState::empty(), &legal).unwrap();
        assert_eq!(sel.descriptor, "6,3->5,4");
    }

    #[test]
    fn inference_failure_falls_back() {
        let engine = PolicyEngine::with_model(Box::new(FixedModel(vec![1.0; 10])));
        let legal = ["6,1->5,2", "6,3->5,4"];
        let sel = select_move(&engine, &BoardState::empty(), &legal).unwrap();
        assert_eq!(sel.descriptor, "6,1->5,2");
        assert_eq!(
            sel.source,
            SelectionSource::Fallback(FallbackReason::InferenceFailed)
        );
    }

    #[test]
    fn result_is_always_a_member_of_legal() {
        let scores: Vec<(&str, f32)> = vec![("0,1->1,2", 0.3), ("9,8->8,9", 0.6)];
        let engine = engine_with(&scores);
        let legal = ["3,2->4,3", "9,8->8,9", "0,1->1,2", "bad"];
        for n in 1..=legal.len() {
            let sel = select_move(&engine, &BoardState::empty(), &legal[..n]).unwrap();
            assert!(legal[..n].contains(&sel.descriptor.as_str()));
        }
    }

    #[test]
    fn zero_exploration_matches_select_move() {
        let engine = engine_with(&[("6,1->5,2", 0.1), ("6,3->5,4", 0.7)]);
        let legal = ["6,1->5,2", "6,3->5,4"];
        let mut selector = MoveSelector::new(&SelectorConfig {
            exploration_rate: 0.0,
            seed: Some(7),
        });
        for _ in 0..20 {
            let sel = selector.select(&engine, &BoardState::empty(), &legal).unwrap();
            assert_eq!(sel.descriptor, "6,3->5,4");
        }
    }

    #[test]
    fn full_exploration_stays_within_legal() {
        let engine = engine_with(&[("6,1->5,2", 0.1), ("6,3->5,4", 0.7)]);
        let legal = ["6,1->5,2", "6,3->5,4", "junk"];
        let mut selector = MoveSelector::new(&SelectorConfig {
            exploration_rate: 1.0,
            seed: Some(42),
        });
        for _ in 0..50 {
            let sel = selector.select(&engine, &BoardState::empty(), &legal).unwrap();
            assert_eq!(sel.source, SelectionSource::Exploration);
            assert!(sel.descriptor == "6,1->5,2" || sel.descriptor == "6,3->5,4");
        }
    }

    #[test]
    fn exploration_never_overrides_fallback() {
        let engine = PolicyEngine::new();
        let legal = ["6,1->5,2", "6,3->5,4"];
        let mut selector = MoveSelector::new(&SelectorConfig {
            exploration_rate: 1.0,
            seed: Some(1),
        });
        let sel = selector.select(&engine, &BoardState::empty(), &legal).unwrap();
        assert_eq!(sel.descriptor, "6,1->5,2");
    }
}
