// Text and HTML reports built from the leaderboards.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use gapwatch_core::ranking::{DailyLeaderboardEntry, EstimationType, Leaderboards};
use gapwatch_core::rolling::player_series;
use gapwatch_core::{EnrichedRecord, PipelineError, PlayerId};

use crate::plot::PlotSeries;

// ---------------------------------------------------------------------------
// Leaderboard text
// ---------------------------------------------------------------------------

/// Console layout of a leaderboard: a block per date, one line per rank.
pub fn format_leaderboard(entries: &[DailyLeaderboardEntry]) -> String {
    let mut out = String::new();
    let mut current: Option<NaiveDate> = None;
    for e in entries {
        if current != Some(e.game_date) {
            let _ = write!(out, "\nDate: {}\n{}\n", e.game_date, "-".repeat(50));
            current = Some(e.game_date);
        }
        let _ = writeln!(out, "Rank {}: {} ({:+.2}%)", e.rank, e.player_name, e.rolling_gap_pct);
    }
    out
}

// ---------------------------------------------------------------------------
// Daily report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    pub rank: usize,
    pub player_id: PlayerId,
    pub player_name: String,
    /// Player's rolling wOBA as of the report date.
    pub rolling_woba: f64,
    /// Full-precision daily rolling gap.
    pub diff_oba: f64,
    pub plot: PlotSeries,
}

/// The underestimated players of one date, with their chart data.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub entries: Vec<ReportEntry>,
}

impl DailyReport {
    /// Assemble the report for `date` from the underestimated leaderboard.
    ///
    /// Each entry is joined to its player's enriched records up to and
    /// including `date`.
    pub fn build(
        date: NaiveDate,
        leaderboards: &Leaderboards,
        enriched: &[EnrichedRecord],
    ) -> Result<Self, PipelineError> {
        let board = leaderboards.for_date(date, EstimationType::Underestimated);
        if board.is_empty() {
            return Err(PipelineError::EmptyInput {
                context: format!("no leaderboard entries on {date}"),
            });
        }

        let entries = board
            .into_iter()
            .map(|entry| {
                let history: Vec<&EnrichedRecord> = player_series(enriched, entry.player_id)
                    .into_iter()
                    .filter(|r| r.game_date() <= date)
                    .collect();
                let plot = PlotSeries::from_records(&history)?;
                let rolling_woba = history
                    .last()
                    .map(|r| r.rolling_actual_avg)
                    .unwrap_or_default();
                Ok(ReportEntry {
                    rank: entry.rank,
                    player_id: entry.player_id,
                    player_name: entry.player_name.clone(),
                    rolling_woba,
                    diff_oba: entry.daily_gap,
                    plot,
                })
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;

        Ok(Self { date, entries })
    }

    pub fn subject(&self) -> String {
        format!("MLB Underestimated Players Report - {}", self.date)
    }

    /// HTML body. Chart images are referenced as `cid:player_plot_<n>` for
    /// whatever attaches them.
    pub fn html(&self) -> String {
        let mut html = format!(
            "<html>\n<body>\n<h1>MLB underestimated players – {}</h1>\n",
            self.date
        );
        for (i, e) in self.entries.iter().enumerate() {
            let n = i + 1;
            let _ = write!(
                html,
                "<div style=\"margin-bottom: 30px;\">\n\
                 <h2>{n}. Player name: {}</h2>\n\
                 <p>100PA rolling wOBA: {:.3}</p>\n\
                 <p>diff_rolling_OBA: {:.3}</p>\n\
                 <img src=\"cid:player_plot_{n}\" style=\"max-width: 800px;\"><br>\n\
                 </div>\n",
                escape_html(&e.player_name),
                e.rolling_woba,
                e.diff_oba,
            );
        }
        html.push_str("</body></html>\n");
        html
    }

    /// Write the HTML body to `<dir>/report_<date>.html`.
    pub fn write_html(&self, dir: &Path) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("report_{}.html", self.date));
        std::fs::write(&path, self.html())?;
        Ok(path)
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
