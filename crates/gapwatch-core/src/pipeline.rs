// Pipeline entry point: raw batch → enriched batch → leaderboards.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::normalize::{self, OutcomeBounds};
use crate::ranking::{self, Leaderboards, DEFAULT_LEADERBOARD_SIZE};
use crate::record::{EnrichedRecord, RawPlateAppearance};
use crate::rolling::{self, DEFAULT_WINDOW};

/// Tunables for one pipeline pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Plate appearances per rolling window.
    pub window: usize,
    /// Players per date on each leaderboard.
    pub leaderboard_size: usize,
    #[serde(default)]
    pub bounds: OutcomeBounds,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            leaderboard_size: DEFAULT_LEADERBOARD_SIZE,
            bounds: OutcomeBounds::default(),
        }
    }
}

/// Everything one pass produces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineOutput {
    pub enriched: Vec<EnrichedRecord>,
    pub leaderboards: Leaderboards,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        if config.window == 0 {
            return Err(PipelineError::InvalidWindow);
        }
        if config.leaderboard_size == 0 {
            return Err(PipelineError::InvalidLeaderboardSize);
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Normalize a raw batch and attach rolling statistics.
    pub fn enrich(&self, raw: &[RawPlateAppearance]) -> Result<Vec<EnrichedRecord>> {
        let normalized = normalize::normalize(raw, self.config.bounds)?;
        rolling::compute_rolling(normalized, self.config.window)
    }

    /// Rank an already-enriched batch.
    pub fn rank(&self, enriched: &[EnrichedRecord]) -> Result<Leaderboards> {
        ranking::rank(enriched, self.config.leaderboard_size)
    }

    /// Full pass over a raw batch.
    pub fn run(&self, raw: &[RawPlateAppearance]) -> Result<PipelineOutput> {
        let enriched = self.enrich(raw)?;
        let leaderboards = self.rank(&enriched)?;
        info!(
            records = enriched.len(),
            underestimated = leaderboards.underestimated.len(),
            overestimated = leaderboards.overestimated.len(),
            "pipeline pass complete"
        );
        Ok(PipelineOutput {
            enriched,
            leaderboards,
        })
    }
}
