//! Defensive health evaluation.
//!
//! Scores one side's position from occupancy alone: cohesion holes,
//! unsupported pieces, next-ply capture threats and back-rank cover. The
//! weighted result drives risk logging; it never influences move choice.
//!
//! All coefficients live in [`DefenseConfig`]. The defaults (threat cap 20,
//! the 0.30/0.35/0.20/0.15 weights) were tuned by hand and are kept as-is
//! until they are recalibrated against game data.

use std::fmt;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::history::SnapshotHistory;
use crate::board::piece::Color;
use crate::board::square::{Square, PLAYABLE_SQUARES};
use crate::board::threats::BoardQuery;

/// Evaluator coefficients and thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefenseConfig {
    /// Pieces per side at the start of a game.
    pub starting_pieces: u32,
    pub formation_weight: f64,
    pub threat_weight: f64,
    pub material_weight: f64,
    pub back_rank_weight: f64,
    /// Formation points lost per gap.
    pub gap_penalty: f64,
    /// Threat-term points lost per threat.
    pub threat_penalty: f64,
    /// Upper bound on the summed per-piece threat count.
    pub threat_cap: u32,
    /// Back-rank piece count that earns the full back-rank term.
    pub back_rank_full: f64,
    /// How many rows from the home edge count as the back rank.
    pub back_rank_rows: usize,
    /// Health change needed to report a trend.
    pub trend_threshold: f64,
    pub low_risk_min: f64,
    pub medium_risk_min: f64,
    pub high_risk_min: f64,
    /// Evaluate every this many plies.
    pub interval: u32,
}

impl Default for DefenseConfig {
    fn default() -> Self {
        DefenseConfig {
            starting_pieces: 12,
            formation_weight: 0.30,
            threat_weight: 0.35,
            material_weight: 0.20,
            back_rank_weight: 0.15,
            gap_penalty: 5.0,
            threat_penalty: 10.0,
            threat_cap: 20,
            back_rank_full: 10.0,
            back_rank_rows: 2,
            trend_threshold: 5.0,
            low_risk_min: 80.0,
            medium_risk_min: 60.0,
            high_risk_min: 40.0,
            interval: 5,
        }
    }
}

/// Direction of defensive health between consecutive evaluations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

impl Trend {
    /// Classifies a health change against the threshold.
    pub fn from_delta(delta: f64, threshold: f64) -> Trend {
        if delta > threshold {
            Trend::Improving
        } else if delta < -threshold {
            Trend::Declining
        } else {
            Trend::Stable
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Trend::Improving => "improving",
            Trend::Declining => "declining",
            Trend::Stable => "stable",
        })
    }
}

/// Risk bucket, ordered from safest to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        })
    }
}

/// Raw counts measured from the board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefenseMetrics {
    pub piece_count: u32,
    pub king_count: u32,
    pub gap_count: u32,
    pub isolated_count: u32,
    pub threatened_count: u32,
    /// Summed per-piece threat counts, already capped.
    pub total_threat_count: u32,
    pub back_rank_strength: u32,
}

/// One evaluation tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefenseSnapshot {
    pub move_number: u32,
    pub timestamp: DateTime<Utc>,
    pub piece_count: u32,
    pub king_count: u32,
    pub gap_count: u32,
    pub isolated_count: u32,
    pub threatened_count: u32,
    pub total_threat_count: u32,
    pub safety_score: f64,
    pub back_rank_strength: u32,
    pub formation_score: f64,
    pub defensive_health: f64,
    pub trend: Trend,
    pub risk_level: RiskLevel,
}

#[inline]
fn clamp_score(x: f64) -> f64 {
    x.clamp(0.0, 100.0)
}

/// Returns true if `square` lies within `rows` rows of `side`'s home edge.
#[inline]
fn in_back_rank(square: Square, side: Color, rows: usize) -> bool {
    (square.row as usize).abs_diff(side.home_row()) < rows
}

/// Counts own pieces among a square's diagonal neighbours.
fn own_neighbors<Q: BoardQuery>(query: &Q, square: Square, side: Color) -> usize {
    square
        .diagonal_neighbors()
        .filter(|&n| matches!(query.piece_at(n), Some(p) if p.color == side))
        .count()
}

/// Measures the raw defensive counts for `side`.
pub fn measure<Q: BoardQuery>(query: &Q, side: Color, config: &DefenseConfig) -> DefenseMetrics {
    let mut m = DefenseMetrics::default();
    let mut total_threats = 0u32;

    for &sq in PLAYABLE_SQUARES.iter() {
        match query.piece_at(sq) {
            None => {
                if own_neighbors(query, sq, side) >= 2 {
                    m.gap_count += 1;
                }
            }
            Some(p) if p.color == side => {
                m.piece_count += 1;
                if p.king {
                    m.king_count += 1;
                }
                if own_neighbors(query, sq, side) == 0 {
                    m.isolated_count += 1;
                }
                if query.is_threatened(sq) {
                    m.threatened_count += 1;
                }
                total_threats = total_threats.saturating_add(query.threat_count(sq));
                if in_back_rank(sq, side, config.back_rank_rows) {
                    m.back_rank_strength += 1;
                }
            }
            Some(_) => {}
        }
    }

    m.total_threat_count = total_threats.min(config.threat_cap);
    m
}

/// `(pieces - threatened) / pieces * 100`, or 0 with no pieces left.
pub fn safety_score(m: &DefenseMetrics) -> f64 {
    if m.piece_count == 0 {
        return 0.0;
    }
    let safe = m.piece_count.saturating_sub(m.threatened_count);
    safe as f64 / m.piece_count as f64 * 100.0
}

pub fn formation_score(m: &DefenseMetrics, config: &DefenseConfig) -> f64 {
    clamp_score(100.0 - m.gap_count as f64 * config.gap_penalty)
}

/// Weighted defensive health in [0, 100].
pub fn defensive_health(m: &DefenseMetrics, config: &DefenseConfig) -> f64 {
    let formation = formation_score(m, config);
    let threat = clamp_score(100.0 - m.total_threat_count as f64 * config.threat_penalty);
    let material = if config.starting_pieces == 0 {
        0.0
    } else {
        m.piece_count as f64 / config.starting_pieces as f64 * 100.0
    };
    let back_rank = if config.back_rank_full > 0.0 {
        clamp_score(m.back_rank_strength as f64 / config.back_rank_full * 100.0)
    } else {
        0.0
    };

    clamp_score(
        config.formation_weight * formation
            + config.threat_weight * threat
            + config.material_weight * material
            + config.back_rank_weight * back_rank,
    )
}

/// Trend relative to the previous snapshot's health; stable without one.
pub fn trend(health: f64, previous: Option<&DefenseSnapshot>, config: &DefenseConfig) -> Trend {
    match previous {
        Some(prev) => Trend::from_delta(health - prev.defensive_health, config.trend_threshold),
        None => Trend::Stable,
    }
}

pub fn risk_level(health: f64, config: &DefenseConfig) -> RiskLevel {
    if health >= config.low_risk_min {
        RiskLevel::Low
    } else if health >= config.medium_risk_min {
        RiskLevel::Medium
    } else if health >= config.high_risk_min {
        RiskLevel::High
    } else {
        RiskLevel::Critical
    }
}

/// Evaluates `side`'s position. Pure: the result depends only on the
/// arguments.
pub fn evaluate<Q: BoardQuery>(
    query: &Q,
    side: Color,
    move_number: u32,
    previous: Option<&DefenseSnapshot>,
    config: &DefenseConfig,
    timestamp: DateTime<Utc>,
) -> DefenseSnapshot {
    let m = measure(query, side, config);
    let health = defensive_health(&m, config);

    DefenseSnapshot {
        move_number,
        timestamp,
        piece_count: m.piece_count,
        king_count: m.king_count,
        gap_count: m.gap_count,
        isolated_count: m.isolated_count,
        threatened_count: m.threatened_count,
        total_threat_count: m.total_threat_count,
        safety_score: safety_score(&m),
        back_rank_strength: m.back_rank_strength,
        formation_score: formation_score(&m, config),
        defensive_health: health,
        trend: trend(health, previous, config),
        risk_level: risk_level(health, config),
    }
}

/// Stateful evaluator for one side of one game session. Owns the snapshot
/// history and appends to it on every evaluation.
#[derive(Debug, Clone)]
pub struct DefensiveEvaluator {
    side: Color,
    config: DefenseConfig,
    history: SnapshotHistory,
}

impl DefensiveEvaluator {
    pub fn new(side: Color, config: DefenseConfig) -> Self {
        DefensiveEvaluator {
            side,
            config,
            history: SnapshotHistory::new(),
        }
    }

    pub fn side(&self) -> Color {
        self.side
    }

    pub fn set_side(&mut self, side: Color) {
        self.side = side;
    }

    pub fn config(&self) -> &DefenseConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut DefenseConfig {
        &mut self.config
    }

    pub fn history(&self) -> &SnapshotHistory {
        &self.history
    }

    /// Returns true when `move_number` falls on the evaluation interval.
    pub fn is_due(&self, move_number: u32) -> bool {
        self.config.interval > 0 && move_number % self.config.interval == 0
    }

    /// Evaluates the position and appends the snapshot to the history.
    pub fn evaluate<Q: BoardQuery>(&mut self, query: &Q, move_number: u32) -> &DefenseSnapshot {
        self.evaluate_at(query, move_number, Utc::now())
    }

    /// [`DefensiveEvaluator::evaluate`] with an explicit timestamp.
    pub fn evaluate_at<Q: BoardQuery>(
        &mut self,
        query: &Q,
        move_number: u32,
        timestamp: DateTime<Utc>,
    ) -> &DefenseSnapshot {
        let snapshot = evaluate(
            query,
            self.side,
            move_number,
            self.history.latest(),
            &self.config,
            timestamp,
        );
        debug!(
            "defense move {}: health {:.1} gaps {} isolated {} threatened {}",
            move_number,
            snapshot.defensive_health,
            snapshot.gap_count,
            snapshot.isolated_count,
            snapshot.threatened_count
        );
        if snapshot.risk_level >= RiskLevel::High {
            info!(
                "{} defense at move {} is {} risk (health {:.1}, {})",
                self.side.name(),
                move_number,
                snapshot.risk_level,
                snapshot.defensive_health,
                snapshot.trend
            );
        }
        self.history.push(snapshot)
    }

    /// Clears the history for a new game.
    pub fn reset(&mut self) {
        self.history.clear();
    }
}
