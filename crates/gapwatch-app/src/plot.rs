// Per-player chart data: rolling xwOBA/wOBA lines over plate appearances and
// the rolling gap as signed bars underneath. Rendering is left to whatever
// consumes the JSON.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use gapwatch_core::{EnrichedRecord, PipelineError, PlayerId};
use serde::{Deserialize, Serialize};

/// Fixed y-axis range of the rolling-average panel.
pub const ROLLING_AXIS: (f64, f64) = (0.0, 0.9);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotPoint {
    /// 1-based plate appearance index within the series.
    pub pa_number: usize,
    pub game_date: NaiveDate,
    pub rolling_xwoba: f64,
    pub rolling_woba: f64,
    pub diff_rolling_oba: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotSeries {
    pub player_id: PlayerId,
    pub player_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rolling_axis: (f64, f64),
    /// Symmetric limit for the gap panel: max |gap| rounded up to 0.1.
    pub gap_bound: f64,
    pub points: Vec<PlotPoint>,
}

impl PlotSeries {
    /// Build a series from one player's enriched records, already in date
    /// order (as returned by `rolling::player_series`).
    pub fn from_records(records: &[&EnrichedRecord]) -> Result<Self, PipelineError> {
        let (Some(first), Some(last)) = (records.first(), records.last()) else {
            return Err(PipelineError::EmptyInput {
                context: "plot series needs at least one plate appearance".into(),
            });
        };

        let points: Vec<PlotPoint> = records
            .iter()
            .enumerate()
            .map(|(i, r)| PlotPoint {
                pa_number: i + 1,
                game_date: r.game_date(),
                rolling_xwoba: r.rolling_estimated_avg,
                rolling_woba: r.rolling_actual_avg,
                diff_rolling_oba: r.rolling_gap,
            })
            .collect();

        let max_abs = points
            .iter()
            .map(|p| p.diff_rolling_oba.abs())
            .fold(0.0_f64, f64::max);

        Ok(Self {
            player_id: first.player_id(),
            player_name: format!(
                "{} {}",
                title_case(&first.record.first_name),
                title_case(&first.record.last_name)
            ),
            start_date: first.game_date(),
            end_date: last.game_date(),
            rolling_axis: ROLLING_AXIS,
            gap_bound: (max_abs * 10.0).ceil() / 10.0,
            points,
        })
    }

    /// Points drawn above the axis (estimate at or above outcome).
    pub fn positive_bars(&self) -> impl Iterator<Item = &PlotPoint> {
        self.points.iter().filter(|p| p.diff_rolling_oba >= 0.0)
    }

    pub fn negative_bars(&self) -> impl Iterator<Item = &PlotPoint> {
        self.points.iter().filter(|p| p.diff_rolling_oba < 0.0)
    }

    /// `First_Last_<id>_stats.json`. The id keeps namesakes apart; name
    /// characters that could form a path are replaced with `_`.
    pub fn file_name(first_name: &str, last_name: &str, player_id: PlayerId) -> String {
        format!(
            "{}_{}_{player_id}_stats.json",
            file_safe(first_name),
            file_safe(last_name)
        )
    }
}

/// Capitalize the first letter of every word and lowercase the rest, where
/// a word starts after any non-alphabetic character ("o'neil" → "O'Neil").
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

fn file_safe(part: &str) -> String {
    part.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '\'' { c } else { '_' })
        .collect()
}

/// Write a series as pretty JSON into `dir` and return the file path.
pub fn write_series(dir: &Path, file_name: &str, series: &PlotSeries) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    let json = serde_json::to_string_pretty(series).map_err(std::io::Error::other)?;
    std::fs::write(&path, json)?;
    Ok(path)
}
