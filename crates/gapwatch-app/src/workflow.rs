// Batch workflow: raw CSV → enriched CSV → leaderboards → plots → report.
//
// Each step reads what the previous one wrote under the configured data
// directories, so steps can be run individually from the CLI or chained by
// `run`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::NaiveDate;
use gapwatch_core::rolling::player_series;
use gapwatch_core::{EnrichedRecord, Leaderboards, Pipeline, PlayerId};
use tracing::{info, warn};

use crate::config::Config;
use crate::io;
use crate::plot::{self, PlotSeries};
use crate::report::DailyReport;
use crate::synth;

/// What a full `run` produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub processed_file: PathBuf,
    pub leaderboards: Leaderboards,
    pub plot_files: Vec<PathBuf>,
    /// `None` when there was nothing to report on.
    pub report_file: Option<PathBuf>,
}

pub struct Workflow {
    config: Config,
    pipeline: Pipeline,
}

impl Workflow {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let pipeline =
            Pipeline::new(config.pipeline_config()).context("invalid pipeline settings")?;
        Ok(Self { config, pipeline })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Create every configured data directory.
    pub fn ensure_dirs(&self) -> anyhow::Result<()> {
        let paths = &self.config.paths;
        for dir in [
            &paths.raw_dir,
            &paths.processed_dir,
            &paths.plots_dir,
            &paths.reports_dir,
        ] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }

    // -- Steps ---------------------------------------------------------------

    /// Normalize and enrich a raw file, writing `processed_<name>` into the
    /// processed directory.
    pub fn process(&self, input: &Path) -> anyhow::Result<(PathBuf, Vec<EnrichedRecord>)> {
        info!("Processing {}", input.display());
        let raw = io::load_raw_batch(input, self.config.pipeline.countable_only)?;
        let enriched = self
            .pipeline
            .enrich(&raw)
            .with_context(|| format!("failed to enrich {}", input.display()))?;

        let output = self
            .config
            .paths
            .processed_dir
            .join(io::processed_file_name(input));
        io::save_enriched(&output, &enriched)?;
        info!(
            "Processed {} plate appearances into {}",
            enriched.len(),
            output.display()
        );
        Ok((output, enriched))
    }

    /// Most recent processed batch.
    pub fn latest_enriched(&self) -> anyhow::Result<(PathBuf, Vec<EnrichedRecord>)> {
        let path = io::latest_processed_file(&self.config.paths.processed_dir)?;
        let enriched = io::load_enriched(&path)?;
        Ok((path, enriched))
    }

    /// Rank the latest processed batch and write both leaderboard CSVs.
    pub fn rank(&self) -> anyhow::Result<Leaderboards> {
        let (_, enriched) = self.latest_enriched()?;
        self.rank_batch(&enriched)
    }

    pub fn rank_batch(&self, enriched: &[EnrichedRecord]) -> anyhow::Result<Leaderboards> {
        let boards = self.pipeline.rank(enriched).context("ranking failed")?;
        let dir = &self.config.paths.processed_dir;
        io::save_leaderboard(&dir.join(io::UNDERESTIMATED_FILE), &boards.underestimated)?;
        io::save_leaderboard(&dir.join(io::OVERESTIMATED_FILE), &boards.overestimated)?;
        info!(
            "Leaderboards saved: {} underestimated, {} overestimated entries",
            boards.underestimated.len(),
            boards.overestimated.len()
        );
        Ok(boards)
    }

    /// Write one plot series per player of the latest processed batch.
    pub fn plots(&self) -> anyhow::Result<Vec<PathBuf>> {
        let (_, enriched) = self.latest_enriched()?;
        self.plots_for(&enriched)
    }

    pub fn plots_for(&self, enriched: &[EnrichedRecord]) -> anyhow::Result<Vec<PathBuf>> {
        let mut players: BTreeMap<PlayerId, &EnrichedRecord> = BTreeMap::new();
        for rec in enriched {
            players.entry(rec.player_id()).or_insert(rec);
        }

        let mut written = Vec::with_capacity(players.len());
        for (player_id, first) in players {
            let series = PlotSeries::from_records(&player_series(enriched, player_id))?;
            let name = PlotSeries::file_name(
                &first.record.first_name,
                &first.record.last_name,
                player_id,
            );
            let path = plot::write_series(&self.config.paths.plots_dir, &name, &series)
                .with_context(|| format!("failed to write plot for {}", series.player_name))?;
            written.push(path);
        }
        info!("Wrote {} plot series", written.len());
        Ok(written)
    }

    /// Build and save the daily report. Without a date, the latest date on
    /// the leaderboards is used.
    pub fn report(&self, date: Option<NaiveDate>) -> anyhow::Result<PathBuf> {
        let (_, enriched) = self.latest_enriched()?;
        let boards = self.pipeline.rank(&enriched).context("ranking failed")?;
        self.report_for(date, &boards, &enriched)
    }

    pub fn report_for(
        &self,
        date: Option<NaiveDate>,
        boards: &Leaderboards,
        enriched: &[EnrichedRecord],
    ) -> anyhow::Result<PathBuf> {
        let Some(date) = date.or_else(|| boards.latest_date()) else {
            bail!("no leaderboard data to report on");
        };
        if !self.config.schedule().is_game_day(date) {
            warn!("{date} is outside the configured season");
        }

        let report = DailyReport::build(date, boards, enriched)
            .with_context(|| format!("failed to build report for {date}"))?;
        let path = report
            .write_html(&self.config.paths.reports_dir)
            .context("failed to write report")?;
        info!("{} ({} players) written to {}", report.subject(), report.entries.len(), path.display());
        Ok(path)
    }

    /// Write a synthetic season into the raw directory.
    pub fn generate(&self, year: i32, seed: u64) -> anyhow::Result<PathBuf> {
        let (start, end, rows) = synth::generate_season(year, seed);
        let path = self
            .config
            .paths
            .raw_dir
            .join(synth::raw_file_name(start, end));
        io::save_raw_batch(&path, &rows)?;
        Ok(path)
    }

    /// Process, rank, plot and report in one go.
    pub fn run(&self, input: &Path) -> anyhow::Result<RunSummary> {
        self.ensure_dirs()?;
        let (processed_file, enriched) = self.process(input)?;
        if enriched.is_empty() {
            warn!("{} contained no countable plate appearances", input.display());
        }
        let leaderboards = self.rank_batch(&enriched)?;
        let plot_files = self.plots_for(&enriched)?;
        let report_file = if leaderboards.is_empty() {
            None
        } else {
            Some(self.report_for(None, &leaderboards, &enriched)?)
        };
        Ok(RunSummary {
            processed_file,
            leaderboards,
            plot_files,
            report_file,
        })
    }
}
