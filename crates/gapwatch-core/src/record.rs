// Plate appearance records at each stage of the pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Stable numeric batter identifier (MLBAM id).
pub type PlayerId = i64;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A plate appearance as handed over by the upstream data source.
///
/// Numeric stats are optional: a cell may be empty or unparseable in the
/// source file. The normalizer turns those into `DataType` errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPlateAppearance {
    pub game_date: NaiveDate,
    pub batter: PlayerId,
    pub first_name: String,
    pub last_name: String,
    pub estimated_woba_using_speedangle: Option<f64>,
    pub woba_value: Option<f64>,
    pub woba_denom: Option<i64>,
    /// 0-based data row of the source file, when the record came from one.
    /// Validation errors report this instead of the position in the batch.
    #[serde(skip)]
    pub source_row: Option<usize>,
}

/// A validated plate appearance.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateAppearance {
    pub game_date: NaiveDate,
    pub player_id: PlayerId,
    pub first_name: String,
    pub last_name: String,
    /// Model-estimated wOBA (xwOBA) for this plate appearance.
    pub estimated_outcome: f64,
    /// Realized wOBA for this plate appearance.
    pub actual_outcome: f64,
    pub outcome_denom: i64,
}

impl PlateAppearance {
    /// Display name: first and last name joined by a single space.
    pub fn player_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// ---------------------------------------------------------------------------
// Derived stages
// ---------------------------------------------------------------------------

/// A validated plate appearance with its single-event divergence.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub record: PlateAppearance,
    /// `estimated_outcome - actual_outcome`
    pub point_divergence: f64,
}

/// A plate appearance with the player's rolling statistics at that point.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub record: PlateAppearance,
    pub point_divergence: f64,
    /// Mean of `point_divergence` over the window. Diagnostic only.
    pub rolling_divergence_avg: f64,
    pub rolling_estimated_avg: f64,
    pub rolling_actual_avg: f64,
    /// `rolling_estimated_avg - rolling_actual_avg`. Not the same number as
    /// `rolling_divergence_avg` once floating point gets involved.
    pub rolling_gap: f64,
}

impl EnrichedRecord {
    pub fn player_id(&self) -> PlayerId {
        self.record.player_id
    }

    pub fn game_date(&self) -> NaiveDate {
        self.record.game_date
    }

    pub fn player_name(&self) -> String {
        self.record.player_name()
    }
}
