// Record normalizer: schema check, value validation, and point divergence.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::record::{NormalizedRecord, PlateAppearance, RawPlateAppearance};

/// Columns every input table must carry, in canonical order.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "game_date",
    "batter",
    "first_name",
    "last_name",
    "estimated_woba_using_speedangle",
    "woba_value",
    "woba_denom",
];

/// Inclusive range accepted for estimated and actual outcome values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for OutcomeBounds {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

impl OutcomeBounds {
    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Check a table header against [`REQUIRED_COLUMNS`].
///
/// Reports every missing column at once, in canonical order. Extra columns
/// are fine.
pub fn validate_columns<S: AsRef<str>>(headers: &[S]) -> Result<()> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|required| !headers.iter().any(|h| h.as_ref().trim() == **required))
        .map(|c| c.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::Schema { missing })
    }
}

/// Validate a raw batch and compute `point_divergence` for every record.
///
/// Any absent or out-of-range value fails the whole batch. Output order
/// matches input order.
pub fn normalize(batch: &[RawPlateAppearance], bounds: OutcomeBounds) -> Result<Vec<NormalizedRecord>> {
    let normalized = batch
        .iter()
        .enumerate()
        .map(|(row, raw)| normalize_one(row, raw, bounds))
        .collect::<Result<Vec<_>>>()?;
    debug!("normalized {} plate appearances", normalized.len());
    Ok(normalized)
}

fn normalize_one(row: usize, raw: &RawPlateAppearance, bounds: OutcomeBounds) -> Result<NormalizedRecord> {
    let row = raw.source_row.unwrap_or(row);
    let estimated = outcome(row, "estimated_woba_using_speedangle", raw.estimated_woba_using_speedangle, bounds)?;
    let actual = outcome(row, "woba_value", raw.woba_value, bounds)?;

    let denom = raw.woba_denom.ok_or_else(|| PipelineError::DataType {
        row,
        field: "woba_denom",
        reason: "value is missing or not an integer".into(),
    })?;
    if denom < 0 {
        return Err(PipelineError::DataType {
            row,
            field: "woba_denom",
            reason: format!("must be non-negative, got {denom}"),
        });
    }

    Ok(NormalizedRecord {
        point_divergence: estimated - actual,
        record: PlateAppearance {
            game_date: raw.game_date,
            player_id: raw.batter,
            first_name: raw.first_name.clone(),
            last_name: raw.last_name.clone(),
            estimated_outcome: estimated,
            actual_outcome: actual,
            outcome_denom: denom,
        },
    })
}

fn outcome(row: usize, field: &'static str, value: Option<f64>, bounds: OutcomeBounds) -> Result<f64> {
    let Some(value) = value else {
        return Err(PipelineError::DataType {
            row,
            field,
            reason: "value is missing or not numeric".into(),
        });
    };
    if !value.is_finite() {
        return Err(PipelineError::DataType {
            row,
            field,
            reason: format!("non-finite value {value}"),
        });
    }
    if !bounds.contains(value) {
        return Err(PipelineError::DataType {
            row,
            field,
            reason: format!("{value} is outside [{}, {}]", bounds.min, bounds.max),
        });
    }
    Ok(value)
}
