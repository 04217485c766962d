//! Noise filter stages
//!
//! Every stage walks the positions comparing each candidate with the last
//! position it kept, never with the last raw one. A rejected candidate is
//! never used as the reference for the next ones.

use serde::Deserialize;

use super::distance::haversine_km;
use crate::Position;

/// Keep the first position and every candidate accepted by `keep` when
/// compared to the last kept position (the anchor).
pub fn retain_against_anchor<F>(positions: &[Position], mut keep: F) -> Vec<Position>
where
    F: FnMut(&Position, &Position) -> bool,
{
    let mut iter = positions.iter();

    let mut kept = match iter.next() {
        Some(first) => vec![first.clone()],
        None => return vec![],
    };

    for candidate in iter {
        let anchor = &kept[kept.len() - 1];
        if keep(anchor, candidate) {
            kept.push(candidate.clone());
        }
    }

    kept
}

/// Seconds from the anchor to the candidate, when both times are known
fn elapsed_seconds(anchor: &Position, candidate: &Position) -> Option<f64> {
    match (anchor.time, candidate.time) {
        (Some(from), Some(to)) => Some((to - from).as_seconds_f64()),
        _ => None,
    }
}

/// Distance in km from the anchor to the candidate, when both are located
fn distance_km(anchor: &Position, candidate: &Position) -> Option<f64> {
    match (anchor.coordinates, candidate.coordinates) {
        (Some(from), Some(to)) => Some(haversine_km(&from, &to)),
        _ => None,
    }
}

/// Drops fixes whose accuracy radius is worse than the limit
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct AccuracyFilter {
    pub max_accuracy_m: f64,
}

impl Default for AccuracyFilter {
    fn default() -> Self {
        Self {
            max_accuracy_m: 50.0,
        }
    }
}

impl AccuracyFilter {
    pub fn apply(&self, positions: &[Position]) -> Vec<Position> {
        retain_against_anchor(positions, |_, candidate| match candidate.accuracy {
            Some(accuracy) => accuracy <= self.max_accuracy_m,
            None => true,
        })
    }
}

/// Drops ghost jumps: fixes implying a speed no device could reach
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct GhostJumpFilter {
    pub max_speed_kmh: f64,
}

impl Default for GhostJumpFilter {
    fn default() -> Self {
        Self {
            max_speed_kmh: 200.0,
        }
    }
}

impl GhostJumpFilter {
    pub fn apply(&self, positions: &[Position]) -> Vec<Position> {
        retain_against_anchor(positions, |anchor, candidate| {
            let (distance, seconds) = match (
                distance_km(anchor, candidate),
                elapsed_seconds(anchor, candidate),
            ) {
                (Some(d), Some(s)) => (d, s),
                _ => return true,
            };

            // duplicated or out of order times give no speed to judge
            if seconds <= 0.0 {
                return true;
            }

            distance / (seconds / 3600.0) <= self.max_speed_kmh
        })
    }
}

/// False for a candidate that moved a short distance at a low reported speed
fn still_moving(
    anchor: &Position,
    candidate: &Position,
    max_distance_km: f64,
    max_speed_kmh: f64,
) -> bool {
    match (distance_km(anchor, candidate), candidate.speed) {
        (Some(distance), Some(speed)) => !(distance <= max_distance_km && speed <= max_speed_kmh),
        _ => true,
    }
}

/// Drops slow, short moves: the drift of a stopped device
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct DriftFilter {
    pub max_distance_km: f64,
    pub max_speed_kmh: f64,
}

impl Default for DriftFilter {
    fn default() -> Self {
        Self {
            max_distance_km: 0.05,
            max_speed_kmh: 5.0,
        }
    }
}

impl DriftFilter {
    pub fn apply(&self, positions: &[Position]) -> Vec<Position> {
        retain_against_anchor(positions, |anchor, candidate| {
            still_moving(anchor, candidate, self.max_distance_km, self.max_speed_kmh)
        })
    }
}

/// Second, tighter pass of the drift heuristic for the receiver jitter
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct JitterFilter {
    pub max_distance_km: f64,
    pub max_speed_kmh: f64,
}

impl Default for JitterFilter {
    fn default() -> Self {
        Self {
            max_distance_km: 0.01,
            max_speed_kmh: 2.0,
        }
    }
}

impl JitterFilter {
    pub fn apply(&self, positions: &[Position]) -> Vec<Position> {
        retain_against_anchor(positions, |anchor, candidate| {
            still_moving(anchor, candidate, self.max_distance_km, self.max_speed_kmh)
        })
    }
}

/// Drops fixes that didn't move far enough from the last kept one
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct StationaryFilter {
    pub min_distance_m: f64,
}

impl Default for StationaryFilter {
    fn default() -> Self {
        Self {
            min_distance_m: 5.0,
        }
    }
}

impl StationaryFilter {
    pub fn apply(&self, positions: &[Position]) -> Vec<Position> {
        retain_against_anchor(positions, |anchor, candidate| {
            match distance_km(anchor, candidate) {
                Some(distance) => distance * 1000.0 >= self.min_distance_m,
                None => true,
            }
        })
    }
}

/// Thins over-dense sampling to one fix per interval
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct MinIntervalFilter {
    pub min_seconds: f64,
}

impl Default for MinIntervalFilter {
    fn default() -> Self {
        Self { min_seconds: 10.0 }
    }
}

impl MinIntervalFilter {
    pub fn apply(&self, positions: &[Position]) -> Vec<Position> {
        retain_against_anchor(positions, |anchor, candidate| {
            match elapsed_seconds(anchor, candidate) {
                Some(seconds) => seconds <= 0.0 || seconds >= self.min_seconds,
                None => true,
            }
        })
    }
}
