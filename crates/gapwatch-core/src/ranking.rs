// Daily leaderboards of the most under- and overestimated hitters.
//
// Rolling gaps are first collapsed to one value per (date, player) by
// averaging that player's plate appearances on the day. Each date is then
// ranked on its own, at full precision, with ties broken by first appearance
// in the aggregated table.

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::record::{EnrichedRecord, PlayerId};

/// Players per date in each leaderboard direction.
pub const DEFAULT_LEADERBOARD_SIZE: usize = 5;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which end of the gap distribution a leaderboard covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EstimationType {
    /// Largest positive gaps: the model expects more than the player produced.
    Underestimated,
    /// Most negative gaps: the player produced more than the model expects.
    Overestimated,
}

impl EstimationType {
    pub fn label(&self) -> &'static str {
        match self {
            EstimationType::Underestimated => "Underestimated",
            EstimationType::Overestimated => "Overestimated",
        }
    }
}

impl fmt::Display for EstimationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Mean rolling gap for one player on one date.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyPlayerGap {
    pub game_date: NaiveDate,
    pub player_id: PlayerId,
    pub player_name: String,
    pub daily_gap: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLeaderboardEntry {
    pub game_date: NaiveDate,
    pub player_id: PlayerId,
    pub player_name: String,
    /// Gap in percentage points, rounded to two decimals. Display only.
    #[serde(rename = "diff_rolling_OBA")]
    pub rolling_gap_pct: f64,
    /// Full-precision value the entry was ranked by.
    pub daily_gap: f64,
    pub rank: usize,
    pub estimation_type: EstimationType,
}

/// Both leaderboards, each ordered by date then rank.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Leaderboards {
    pub underestimated: Vec<DailyLeaderboardEntry>,
    pub overestimated: Vec<DailyLeaderboardEntry>,
}

impl Leaderboards {
    pub fn is_empty(&self) -> bool {
        self.underestimated.is_empty() && self.overestimated.is_empty()
    }

    pub fn board(&self, estimation_type: EstimationType) -> &[DailyLeaderboardEntry] {
        match estimation_type {
            EstimationType::Underestimated => &self.underestimated,
            EstimationType::Overestimated => &self.overestimated,
        }
    }

    /// Most recent date present on either board.
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.underestimated
            .iter()
            .chain(&self.overestimated)
            .map(|e| e.game_date)
            .max()
    }

    /// Entries of one board for one date, in rank order.
    pub fn for_date(&self, date: NaiveDate, estimation_type: EstimationType) -> Vec<&DailyLeaderboardEntry> {
        self.board(estimation_type)
            .iter()
            .filter(|e| e.game_date == date)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Average `rolling_gap` per (date, player), keeping first-seen order.
pub fn aggregate_daily(enriched: &[EnrichedRecord]) -> Vec<DailyPlayerGap> {
    let mut index: HashMap<(NaiveDate, PlayerId), usize> = HashMap::new();
    let mut groups: Vec<(DailyPlayerGap, f64, usize)> = Vec::new();

    for rec in enriched {
        let key = (rec.game_date(), rec.player_id());
        match index.get(&key) {
            Some(&slot) => {
                let (_, sum, count) = &mut groups[slot];
                *sum += rec.rolling_gap;
                *count += 1;
            }
            None => {
                index.insert(key, groups.len());
                groups.push((
                    DailyPlayerGap {
                        game_date: key.0,
                        player_id: key.1,
                        player_name: rec.player_name(),
                        daily_gap: 0.0,
                    },
                    rec.rolling_gap,
                    1,
                ));
            }
        }
    }

    groups
        .into_iter()
        .map(|(mut gap, sum, count)| {
            gap.daily_gap = sum / count as f64;
            gap
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// Scale a gap to percentage points rounded to two decimals.
pub fn to_display_pct(gap: f64) -> f64 {
    (gap * 100.0 * 100.0).round() / 100.0
}

/// Rank one date's players in one direction.
///
/// `values` must all belong to `date`. The sort is stable, so equal gaps keep
/// the order they have in `values`.
pub fn rank_date(
    date: NaiveDate,
    values: &[&DailyPlayerGap],
    size: usize,
    estimation_type: EstimationType,
) -> Result<Vec<DailyLeaderboardEntry>> {
    if size == 0 {
        return Err(PipelineError::InvalidLeaderboardSize);
    }
    if values.is_empty() {
        return Err(PipelineError::EmptyInput {
            context: format!("no players to rank on {date}"),
        });
    }

    let mut sorted = values.to_vec();
    match estimation_type {
        EstimationType::Underestimated => sorted.sort_by(|a, b| b.daily_gap.total_cmp(&a.daily_gap)),
        EstimationType::Overestimated => sorted.sort_by(|a, b| a.daily_gap.total_cmp(&b.daily_gap)),
    }

    Ok(sorted
        .into_iter()
        .take(size)
        .enumerate()
        .map(|(i, gap)| DailyLeaderboardEntry {
            game_date: date,
            player_id: gap.player_id,
            player_name: gap.player_name.clone(),
            rolling_gap_pct: to_display_pct(gap.daily_gap),
            daily_gap: gap.daily_gap,
            rank: i + 1,
            estimation_type,
        })
        .collect())
}

/// Build both leaderboards for every date in the enriched batch.
pub fn rank(enriched: &[EnrichedRecord], size: usize) -> Result<Leaderboards> {
    if size == 0 {
        return Err(PipelineError::InvalidLeaderboardSize);
    }

    let daily = aggregate_daily(enriched);

    let mut dates: Vec<NaiveDate> = daily.iter().map(|d| d.game_date).collect();
    dates.sort_unstable();
    dates.dedup();

    let mut boards = Leaderboards::default();
    for date in dates {
        let on_date: Vec<&DailyPlayerGap> = daily.iter().filter(|d| d.game_date == date).collect();
        boards
            .underestimated
            .extend(rank_date(date, &on_date, size, EstimationType::Underestimated)?);
        boards
            .overestimated
            .extend(rank_date(date, &on_date, size, EstimationType::Overestimated)?);
    }

    debug!(
        "ranked {} player-days into {} underestimated / {} overestimated entries",
        daily.len(),
        boards.underestimated.len(),
        boards.overestimated.len()
    );
    Ok(boards)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
