//! Position cleaning pipeline API

use serde::Deserialize;
use tracing::{debug, info};

use crate::{Error, Position, Result};

pub mod distance;
pub mod stages;


pub use stages::{
    AccuracyFilter, DriftFilter, GhostJumpFilter, JitterFilter, MinIntervalFilter,
    StationaryFilter,
};

/// One noise filter with its thresholds
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Stage {
    Accuracy(AccuracyFilter),
    GhostJump(GhostJumpFilter),
    Drift(DriftFilter),
    Jitter(JitterFilter),
    Stationary(StationaryFilter),
    MinInterval(MinIntervalFilter),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Accuracy(_) => "accuracy",
            Stage::GhostJump(_) => "ghost_jump",
            Stage::Drift(_) => "drift",
            Stage::Jitter(_) => "jitter",
            Stage::Stationary(_) => "stationary",
            Stage::MinInterval(_) => "min_interval",
        }
    }

    /// Run the filter over the positions, returning the survivors
    pub fn apply(&self, positions: &[Position]) -> Vec<Position> {
        match self {
            Stage::Accuracy(f) => f.apply(positions),
            Stage::GhostJump(f) => f.apply(positions),
            Stage::Drift(f) => f.apply(positions),
            Stage::Jitter(f) => f.apply(positions),
            Stage::Stationary(f) => f.apply(positions),
            Stage::MinInterval(f) => f.apply(positions),
        }
    }

    /// Every threshold must be a finite, positive number
    pub fn validate(&self) -> Result<()> {
        let thresholds = match self {
            Stage::Accuracy(f) => vec![("max_accuracy_m", f.max_accuracy_m)],
            Stage::GhostJump(f) => vec![("max_speed_kmh", f.max_speed_kmh)],
            Stage::Drift(f) => vec![
                ("max_distance_km", f.max_distance_km),
                ("max_speed_kmh", f.max_speed_kmh),
            ],
            Stage::Jitter(f) => vec![
                ("max_distance_km", f.max_distance_km),
                ("max_speed_kmh", f.max_speed_kmh),
            ],
            Stage::Stationary(f) => vec![("min_distance_m", f.min_distance_m)],
            Stage::MinInterval(f) => vec![("min_seconds", f.min_seconds)],
        };

        for (field, value) in thresholds {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::Config(format!(
                    "`{}.{}` must be a positive number, got {}",
                    self.name(),
                    field,
                    value
                )));
            }
        }

        Ok(())
    }
}

fn enabled_by_default() -> bool {
    true
}

/// A stage of the pipeline, which can be switched off
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct StageConfig {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(flatten)]
    pub stage: Stage,
}

impl StageConfig {
    pub fn enabled(stage: Stage) -> Self {
        Self {
            enabled: true,
            stage,
        }
    }

    pub fn disabled(stage: Stage) -> Self {
        Self {
            enabled: false,
            stage,
        }
    }
}

/// Removed positions by one stage run
#[derive(Clone, Debug, PartialEq)]
pub struct StageReport {
    pub stage: &'static str,
    pub input: usize,
    pub removed: usize,
}

/// What the pipeline did, stage by stage
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PipelineReport {
    pub input: usize,
    pub stages: Vec<StageReport>,
}

impl PipelineReport {
    pub fn removed(&self) -> usize {
        self.stages.iter().map(|s| s.removed).sum()
    }

    pub fn output(&self) -> usize {
        self.input - self.removed()
    }
}

/// Ordered chain of filters. Each enabled stage consumes the output of the
/// previous one, so the order changes the result.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct FilterPipeline {
    pub stages: Vec<StageConfig>,
}

impl Default for FilterPipeline {
    /// Every filter with its default thresholds: the cheap accuracy check
    /// first, the stationary and interval thinning last.
    fn default() -> Self {
        Self::new(vec![
            StageConfig::enabled(Stage::Accuracy(AccuracyFilter::default())),
            StageConfig::enabled(Stage::GhostJump(GhostJumpFilter::default())),
            StageConfig::enabled(Stage::Drift(DriftFilter::default())),
            StageConfig::enabled(Stage::Jitter(JitterFilter::default())),
            StageConfig::enabled(Stage::Stationary(StationaryFilter::default())),
            StageConfig::enabled(Stage::MinInterval(MinIntervalFilter::default())),
        ])
    }
}

impl FilterPipeline {
    pub fn new(stages: Vec<StageConfig>) -> Self {
        Self { stages }
    }

    /// Pipeline that lets everything through
    pub fn passthrough() -> Self {
        Self::new(vec![])
    }

    pub fn validate(&self) -> Result<()> {
        for sc in self.stages.iter().filter(|sc| sc.enabled) {
            sc.stage.validate()?;
        }

        Ok(())
    }

    /// Validate the thresholds, then run the enabled stages in order
    pub fn run(&self, positions: &[Position]) -> Result<(Vec<Position>, PipelineReport)> {
        self.validate()?;

        let mut report = PipelineReport {
            input: positions.len(),
            stages: vec![],
        };
        let mut current = positions.to_vec();

        for sc in &self.stages {
            if !sc.enabled {
                debug!(stage = sc.stage.name(), "Filter stage disabled");
                continue;
            }

            let input = current.len();
            current = sc.stage.apply(&current);
            let removed = input - current.len();

            info!(stage = sc.stage.name(), input, removed, "Filter stage applied");

            report.stages.push(StageReport {
                stage: sc.stage.name(),
                input,
                removed,
            });
        }

        Ok((current, report))
    }
}
