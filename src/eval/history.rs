//! Per-game record of defensive snapshots.

use serde::Serialize;

use super::defense::{DefenseSnapshot, RiskLevel, Trend};

/// Append-only, chronologically ordered snapshot log.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct SnapshotHistory {
    snapshots: Vec<DefenseSnapshot>,
}

/// Aggregate view over a whole history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySummary {
    pub count: usize,
    pub first_health: f64,
    pub last_health: f64,
    pub min_health: f64,
    pub max_health: f64,
    pub mean_health: f64,
    pub worst_risk: RiskLevel,
    /// Trend from the first snapshot to the last.
    pub net_trend: Trend,
}

impl SnapshotHistory {
    pub fn new() -> Self {
        SnapshotHistory::default()
    }

    /// Appends a snapshot and returns a reference to it.
    pub fn push(&mut self, snapshot: DefenseSnapshot) -> &DefenseSnapshot {
        self.snapshots.push(snapshot);
        &self.snapshots[self.snapshots.len() - 1]
    }

    pub fn latest(&self) -> Option<&DefenseSnapshot> {
        self.snapshots.last()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DefenseSnapshot> {
        self.snapshots.iter()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    /// Summarizes the history, or `None` if it is empty.
    pub fn summary(&self, trend_threshold: f64) -> Option<HistorySummary> {
        let first = self.snapshots.first()?;
        let last = self.snapshots.last()?;

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut worst = RiskLevel::Low;
        for s in &self.snapshots {
            min = min.min(s.defensive_health);
            max = max.max(s.defensive_health);
            sum += s.defensive_health;
            worst = worst.max(s.risk_level);
        }

        Some(HistorySummary {
            count: self.snapshots.len(),
            first_health: first.defensive_health,
            last_health: last.defensive_health,
            min_health: min,
            max_health: max,
            mean_health: sum / self.snapshots.len() as f64,
            worst_risk: worst,
            net_trend: Trend::from_delta(
                last.defensive_health - first.defensive_health,
                trend_threshold,
            ),
        })
    }
}

impl<'a> IntoIterator for &'a SnapshotHistory {
    type Item = &'a DefenseSnapshot;
    type IntoIter = std::slice::Iter<'a, DefenseSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.snapshots.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn snapshot(move_number: u32, health: f64, risk: RiskLevel) -> DefenseSnapshot {
        DefenseSnapshot {
            move_number,
            timestamp: Utc.timestamp_opt(1_700_000_000 + move_number as i64, 0).unwrap(),
            piece_count: 12,
            king_count: 0,
            gap_count: 0,
            isolated_count: 0,
            threatened_count: 0,
            total_threat_count: 0,
            safety_score: 100.0,
            back_rank_strength: 4,
            formation_score: 100.0,
            defensive_health: health,
            trend: Trend::Stable,
            risk_level: risk,
        }
    }

    #[test]
    fn empty_history() {
        let h = SnapshotHistory::new();
        assert!(h.is_empty());
        assert!(h.latest().is_none());
        assert!(h.summary(5.0).is_none());
    }

    #[test]
    fn push_keeps_order() {
        let mut h = SnapshotHistory::new();
        let pushed = h.push(snapshot(5, 90.0, RiskLevel::Low)).move_number;
        assert_eq!(pushed, 5);
        h.push(snapshot(10, 70.0, RiskLevel::Medium));
        assert_eq!(h.len(), 2);
        assert_eq!(h.latest().map(|s| s.move_number), Some(10));
        let moves: Vec<u32> = (&h).into_iter().map(|s| s.move_number).collect();
        assert_eq!(moves, vec![5, 10]);
    }

    #[test]
    fn summary_aggregates() {
        let mut h = SnapshotHistory::new();
        h.push(snapshot(5, 90.0, RiskLevel::Low));
        h.push(snapshot(10, 50.0, RiskLevel::High));
        h.push(snapshot(15, 70.0, RiskLevel::Medium));

        let s = h.summary(5.0).unwrap();
        assert_eq!(s.count, 3);
        assert_eq!(s.first_health, 90.0);
        assert_eq!(s.last_health, 70.0);
        assert_eq!(s.min_health, 50.0);
        assert_eq!(s.max_health, 90.0);
        assert!((s.mean_health - 70.0).abs() < 1e-9);
        assert_eq!(s.worst_risk, RiskLevel::High);
        assert_eq!(s.net_trend, Trend::Declining);
    }

    #[test]
    fn single_snapshot_is_stable() {
        let mut h = SnapshotHistory::new();
        h.push(snapshot(5, 42.0, RiskLevel::High));
        let s = h.summary(5.0).unwrap();
        assert_eq!(s.count, 1);
        assert_eq!(s.net_trend, Trend::Stable);
        assert_eq!(s.min_health, s.max_health);
    }

    #[test]
    fn clear_empties() {
        let mut h = SnapshotHistory::new();
        h.push(snapshot(5, 90.0, RiskLevel::Low));
        h.clear();
        assert!(h.is_empty());
    }

    #[test]
    fn serializes_as_array() {
        let mut h = SnapshotHistory::new();
        h.push(snapshot(5, 90.0, RiskLevel::Low));
        let json = serde_json::to_value(&h).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["move_number"], 5);
    }
}
