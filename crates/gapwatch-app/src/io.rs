// CSV input and output for plate appearance batches and leaderboards.
//
// Raw files follow the Statcast column names. Enriched files add the rolling
// columns after the input columns and can be read back without re-running
// the rolling engine.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use gapwatch_core::normalize::validate_columns;
use gapwatch_core::ranking::{DailyLeaderboardEntry, EstimationType};
use gapwatch_core::{EnrichedRecord, PipelineError, PlateAppearance, PlayerId, RawPlateAppearance};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const UNDERESTIMATED_FILE: &str = "underestimated_players.csv";
pub const OVERESTIMATED_FILE: &str = "overestimated_players.csv";
const PROCESSED_PREFIX: &str = "processed_";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("no processed batch found in {dir}")]
    NoProcessedData { dir: String },

    #[error("{path}: {source}")]
    Pipeline { path: String, source: PipelineError },
}

// ---------------------------------------------------------------------------
// Row structs (private)
// ---------------------------------------------------------------------------

/// Raw Statcast row. Numeric cells that are empty or unparseable become
/// `None`; the normalizer decides what to do with them.
#[derive(Debug, Deserialize)]
struct RawRow {
    game_date: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    batter: Option<i64>,
    first_name: String,
    last_name: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    estimated_woba_using_speedangle: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    woba_value: Option<f64>,
    /// Read as float: pandas writes integer columns with gaps as `1.0`.
    #[serde(deserialize_with = "csv::invalid_option")]
    woba_denom: Option<f64>,
}

/// Enriched row, column names as written by the processing step.
#[derive(Debug, Serialize, Deserialize)]
struct EnrichedRow {
    game_date: NaiveDate,
    batter: PlayerId,
    first_name: String,
    last_name: String,
    estimated_woba_using_speedangle: f64,
    woba_value: f64,
    woba_denom: i64,
    #[serde(rename = "diff_OBA")]
    diff_oba: f64,
    #[serde(rename = "rolling_100PA_diff_OBA")]
    rolling_diff_oba: f64,
    #[serde(rename = "rolling_100PA_xwOBA")]
    rolling_xwoba: f64,
    #[serde(rename = "rolling_100PA_wOBA")]
    rolling_woba: f64,
    #[serde(rename = "diff_rolling_OBA")]
    diff_rolling_oba: f64,
}

#[derive(Debug, Serialize)]
struct LeaderboardRow<'a> {
    game_date: NaiveDate,
    player_id: PlayerId,
    player_name: &'a str,
    #[serde(rename = "diff_rolling_OBA")]
    rolling_gap_pct: f64,
    rank: usize,
    estimation_type: EstimationType,
}

impl From<&EnrichedRecord> for EnrichedRow {
    fn from(rec: &EnrichedRecord) -> Self {
        Self {
            game_date: rec.record.game_date,
            batter: rec.record.player_id,
            first_name: rec.record.first_name.clone(),
            last_name: rec.record.last_name.clone(),
            estimated_woba_using_speedangle: rec.record.estimated_outcome,
            woba_value: rec.record.actual_outcome,
            woba_denom: rec.record.outcome_denom,
            diff_oba: rec.point_divergence,
            rolling_diff_oba: rec.rolling_divergence_avg,
            rolling_xwoba: rec.rolling_estimated_avg,
            rolling_woba: rec.rolling_actual_avg,
            diff_rolling_oba: rec.rolling_gap,
        }
    }
}

impl From<EnrichedRow> for EnrichedRecord {
    fn from(row: EnrichedRow) -> Self {
        Self {
            record: PlateAppearance {
                game_date: row.game_date,
                player_id: row.batter,
                first_name: row.first_name,
                last_name: row.last_name,
                estimated_outcome: row.estimated_woba_using_speedangle,
                actual_outcome: row.woba_value,
                outcome_denom: row.woba_denom,
            },
            point_divergence: row.diff_oba,
            rolling_divergence_avg: row.rolling_diff_oba,
            rolling_estimated_avg: row.rolling_xwoba,
            rolling_actual_avg: row.rolling_woba,
            rolling_gap: row.diff_rolling_oba,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse `YYYY-MM-DD`, ignoring a trailing time part (`2024-04-01 00:00:00`).
fn parse_game_date(text: &str) -> Option<NaiveDate> {
    let day = text.trim().split([' ', 'T']).next()?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn csv_err(origin: &str) -> impl Fn(csv::Error) -> IoError + '_ {
    move |source| IoError::Csv {
        path: origin.to_string(),
        source,
    }
}

fn pipeline_err(origin: &str, source: PipelineError) -> IoError {
    IoError::Pipeline {
        path: origin.to_string(),
        source,
    }
}

fn denom_to_int(value: Option<f64>) -> Option<i64> {
    value
        .filter(|v| v.is_finite() && v.fract() == 0.0)
        .map(|v| v as i64)
}

// ---------------------------------------------------------------------------
// Reader-based loaders
// ---------------------------------------------------------------------------

/// Read a raw Statcast batch. The header is checked against the required
/// columns first; a row with an unreadable date or batter id fails the load.
///
/// With `countable_only`, rows whose `woba_denom` is not 1 are dropped.
pub fn read_raw_batch<R: Read>(
    rdr: R,
    origin: &str,
    countable_only: bool,
) -> Result<Vec<RawPlateAppearance>, IoError> {
    let mut reader = csv::Reader::from_reader(rdr);
    let headers = reader.headers().map_err(csv_err(origin))?.clone();
    let names: Vec<&str> = headers.iter().collect();
    validate_columns(&names).map_err(|e| pipeline_err(origin, e))?;

    let mut batch = Vec::new();
    let mut dropped = 0usize;
    for (row, result) in reader.deserialize::<RawRow>().enumerate() {
        let raw = result.map_err(csv_err(origin))?;

        let game_date = parse_game_date(&raw.game_date).ok_or_else(|| {
            pipeline_err(
                origin,
                PipelineError::DataType {
                    row,
                    field: "game_date",
                    reason: format!("'{}' is not a YYYY-MM-DD date", raw.game_date),
                },
            )
        })?;
        let batter = raw.batter.ok_or_else(|| {
            pipeline_err(
                origin,
                PipelineError::DataType {
                    row,
                    field: "batter",
                    reason: "value is missing or not an integer".into(),
                },
            )
        })?;

        if countable_only && raw.woba_denom != Some(1.0) {
            dropped += 1;
            continue;
        }

        batch.push(RawPlateAppearance {
            game_date,
            batter,
            first_name: raw.first_name.trim().to_string(),
            last_name: raw.last_name.trim().to_string(),
            estimated_woba_using_speedangle: raw.estimated_woba_using_speedangle,
            woba_value: raw.woba_value,
            woba_denom: denom_to_int(raw.woba_denom),
            source_row: Some(row),
        });
    }

    debug!("{origin}: read {} rows, dropped {dropped} non-countable", batch.len());
    Ok(batch)
}

pub fn write_raw_batch<W: Write>(wtr: W, batch: &[RawPlateAppearance]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(wtr);
    for rec in batch {
        writer.serialize(rec)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_enriched<R: Read>(rdr: R) -> Result<Vec<EnrichedRecord>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    reader
        .deserialize::<EnrichedRow>()
        .map(|row| row.map(EnrichedRecord::from))
        .collect()
}

pub fn write_enriched<W: Write>(wtr: W, enriched: &[EnrichedRecord]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(wtr);
    for rec in enriched {
        writer.serialize(EnrichedRow::from(rec))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_leaderboard<W: Write>(wtr: W, entries: &[DailyLeaderboardEntry]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(wtr);
    for e in entries {
        writer.serialize(LeaderboardRow {
            game_date: e.game_date,
            player_id: e.player_id,
            player_name: &e.player_name,
            rolling_gap_pct: e.rolling_gap_pct,
            rank: e.rank,
            estimation_type: e.estimation_type,
        })?;
    }
    writer.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Path-based wrappers
// ---------------------------------------------------------------------------

fn open(path: &Path) -> Result<std::fs::File, IoError> {
    std::fs::File::open(path).map_err(|e| IoError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

fn create(path: &Path) -> Result<std::fs::File, IoError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| IoError::Io {
            path: parent.display().to_string(),
            source: e,
        })?;
    }
    std::fs::File::create(path).map_err(|e| IoError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load a raw Statcast CSV file.
pub fn load_raw_batch(path: &Path, countable_only: bool) -> Result<Vec<RawPlateAppearance>, IoError> {
    let origin = path.display().to_string();
    read_raw_batch(open(path)?, &origin, countable_only)
}

pub fn save_raw_batch(path: &Path, batch: &[RawPlateAppearance]) -> Result<(), IoError> {
    let origin = path.display().to_string();
    write_raw_batch(create(path)?, batch).map_err(csv_err(&origin))?;
    info!("wrote {} raw plate appearances to {origin}", batch.len());
    Ok(())
}

pub fn load_enriched(path: &Path) -> Result<Vec<EnrichedRecord>, IoError> {
    let origin = path.display().to_string();
    read_enriched(open(path)?).map_err(csv_err(&origin))
}

pub fn save_enriched(path: &Path, enriched: &[EnrichedRecord]) -> Result<(), IoError> {
    let origin = path.display().to_string();
    write_enriched(create(path)?, enriched).map_err(csv_err(&origin))?;
    info!("wrote {} enriched plate appearances to {origin}", enriched.len());
    Ok(())
}

pub fn save_leaderboard(path: &Path, entries: &[DailyLeaderboardEntry]) -> Result<(), IoError> {
    let origin = path.display().to_string();
    write_leaderboard(create(path)?, entries).map_err(csv_err(&origin))
}

/// Name of the processed file derived from a raw input file.
pub fn processed_file_name(raw: &Path) -> String {
    let name = raw
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "batch.csv".into());
    format!("{PROCESSED_PREFIX}{name}")
}

/// Most recently modified `processed_*.csv` in `dir`.
pub fn latest_processed_file(dir: &Path) -> Result<PathBuf, IoError> {
    let entries = std::fs::read_dir(dir).map_err(|e| IoError::Io {
        path: dir.display().to_string(),
        source: e,
    })?;

    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_processed = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(PROCESSED_PREFIX) && n.ends_with(".csv"));
        if !is_processed {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(std::time::UNIX_EPOCH);
        // Ties on mtime go to the lexically larger name (later date range).
        let newer = match &newest {
            None => true,
            Some((t, p)) => modified > *t || (modified == *t && path > *p),
        };
        if newer {
            newest = Some((modified, path));
        }
    }

    newest
        .map(|(_, path)| path)
        .ok_or_else(|| IoError::NoProcessedData {
            dir: dir.display().to_string(),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
