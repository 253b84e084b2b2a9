// Rolling statistics engine.
//
// Each player's plate appearances are walked in date order through a
// fixed-capacity window that keeps running sums, so every record costs O(1)
// regardless of window size. The window expands until it holds `capacity`
// records and slides from then on; a record is never left without a value.

use std::collections::{BTreeMap, VecDeque};

use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::record::{EnrichedRecord, NormalizedRecord, PlayerId};

/// Number of plate appearances in the rolling window.
pub const DEFAULT_WINDOW: usize = 100;

// ---------------------------------------------------------------------------
// Window state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Sample {
    estimated: f64,
    actual: f64,
    divergence: f64,
}

/// Snapshot of the window averages after a push.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowAverages {
    pub estimated: f64,
    pub actual: f64,
    pub divergence: f64,
}

impl WindowAverages {
    /// Smoothed estimate minus smoothed outcome.
    pub fn gap(&self) -> f64 {
        self.estimated - self.actual
    }
}

/// Sliding window over one player's most recent plate appearances.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    samples: VecDeque<Sample>,
    sum_estimated: f64,
    sum_actual: f64,
    sum_divergence: f64,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(PipelineError::InvalidWindow);
        }
        Ok(Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
            sum_estimated: 0.0,
            sum_actual: 0.0,
            sum_divergence: 0.0,
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Add one plate appearance, evicting the oldest if the window is full,
    /// and return the averages over the current contents.
    pub fn push(&mut self, estimated: f64, actual: f64, divergence: f64) -> WindowAverages {
        if self.samples.len() == self.capacity {
            if let Some(old) = self.samples.pop_front() {
                self.sum_estimated -= old.estimated;
                self.sum_actual -= old.actual;
                self.sum_divergence -= old.divergence;
            }
        }

        self.samples.push_back(Sample {
            estimated,
            actual,
            divergence,
        });
        self.sum_estimated += estimated;
        self.sum_actual += actual;
        self.sum_divergence += divergence;

        let n = self.samples.len() as f64;
        WindowAverages {
            estimated: self.sum_estimated / n,
            actual: self.sum_actual / n,
            divergence: self.sum_divergence / n,
        }
    }
}

// ---------------------------------------------------------------------------
// Batch computation
// ---------------------------------------------------------------------------

/// Compute rolling statistics for every record in a normalized batch.
///
/// Records are grouped by player and each group is stably sorted by game
/// date, so same-day plate appearances keep their input order. The output
/// lists players in ascending id order, each in chronological order.
pub fn compute_rolling(batch: Vec<NormalizedRecord>, window: usize) -> Result<Vec<EnrichedRecord>> {
    if window == 0 {
        return Err(PipelineError::InvalidWindow);
    }

    let mut by_player: BTreeMap<PlayerId, Vec<NormalizedRecord>> = BTreeMap::new();
    for rec in batch {
        by_player.entry(rec.record.player_id).or_default().push(rec);
    }

    let players = by_player.len();
    let mut enriched = Vec::new();
    for (_, mut records) in by_player {
        records.sort_by_key(|r| r.record.game_date);
        let mut state = RollingWindow::new(window)?;
        enriched.extend(records.into_iter().map(|rec| {
            let avg = state.push(
                rec.record.estimated_outcome,
                rec.record.actual_outcome,
                rec.point_divergence,
            );
            EnrichedRecord {
                rolling_divergence_avg: avg.divergence,
                rolling_estimated_avg: avg.estimated,
                rolling_actual_avg: avg.actual,
                rolling_gap: avg.gap(),
                point_divergence: rec.point_divergence,
                record: rec.record,
            }
        }));
    }

    debug!(
        "computed rolling stats for {} records across {} players",
        enriched.len(),
        players
    );
    Ok(enriched)
}

/// One player's enriched records in date order.
///
/// `enriched` is expected to come from [`compute_rolling`], which already
/// orders each player chronologically; this just filters.
pub fn player_series(enriched: &[EnrichedRecord], player_id: PlayerId) -> Vec<&EnrichedRecord> {
    enriched.iter().filter(|r| r.player_id() == player_id).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
