// Integration tests for gapwatch.
//
// These exercise the batch workflow end-to-end through the library crate's
// public API (raw CSV in, processed CSV, leaderboards, plot series and report
// out) and the HTTP handlers reading what the workflow wrote.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::{Path as UrlPath, Query, State};
use axum::http::StatusCode;
use chrono::NaiveDate;
use gapwatch_app::api::{self, AppState, LeaderboardQuery};
use gapwatch_app::config::{Config, DataPaths, CONFIG_FILE};
use gapwatch_app::io;
use gapwatch_app::plot::PlotSeries;
use gapwatch_app::workflow::Workflow;
use gapwatch_core::{EstimationType, Pipeline, RawPlateAppearance};

// ===========================================================================
// Test helpers
// ===========================================================================

/// Fresh scratch directory under the system temp dir.
fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("gapwatch_it_{name}"));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Shipped defaults with every data directory moved under `root`.
fn config_in(root: &Path) -> Config {
    let defaults = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("defaults")
        .join(CONFIG_FILE);
    let text = std::fs::read_to_string(defaults).unwrap();
    let mut config: Config = toml::from_str(&text).unwrap();
    config.paths = DataPaths {
        raw_dir: root.join("raw"),
        processed_dir: root.join("processed"),
        plots_dir: root.join("plots"),
        reports_dir: root.join("reports"),
    };
    config
}

fn d(m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, day).unwrap()
}

fn pa(batter: i64, first: &str, last: &str, date: NaiveDate, xwoba: f64, woba: f64) -> RawPlateAppearance {
    RawPlateAppearance {
        game_date: date,
        batter,
        first_name: first.into(),
        last_name: last.into(),
        estimated_woba_using_speedangle: Some(xwoba),
        woba_value: Some(woba),
        woba_denom: Some(1),
        source_row: None,
    }
}

/// Three hitters over three days; Soto sits out the last day.
fn small_batch() -> Vec<RawPlateAppearance> {
    vec![
        pa(621043, "Juan", "Soto", d(6, 1), 0.5, 0.25),
        pa(624413, "Mookie", "Betts", d(6, 1), 0.25, 0.5),
        pa(514888, "Mike", "Trout", d(6, 1), 0.5, 0.5),
        pa(621043, "Juan", "Soto", d(6, 2), 0.5, 0.0),
        pa(624413, "Mookie", "Betts", d(6, 2), 0.5, 0.5),
        pa(514888, "Mike", "Trout", d(6, 2), 0.75, 0.5),
        pa(624413, "Mookie", "Betts", d(6, 3), 0.5, 0.25),
        pa(514888, "Mike", "Trout", d(6, 3), 0.25, 0.5),
    ]
}

/// Run the whole workflow over `small_batch()` inside `root`.
fn run_small(root: &Path) -> (Workflow, gapwatch_app::workflow::RunSummary) {
    let workflow = Workflow::new(config_in(root)).unwrap();
    let input = root.join("raw").join("statcast_2024-06-01_to_2024-06-03.csv");
    io::save_raw_batch(&input, &small_batch()).unwrap();
    let summary = workflow.run(&input).unwrap();
    (workflow, summary)
}

fn state_for(workflow: &Workflow) -> Arc<AppState> {
    Arc::new(AppState {
        processed_dir: workflow.config().paths.processed_dir.clone(),
        pipeline: Pipeline::new(workflow.config().pipeline_config()).unwrap(),
    })
}

// ===========================================================================
// Workflow
// ===========================================================================

#[test]
fn run_writes_every_artifact() {
    let root = scratch("run_artifacts");
    let (workflow, summary) = run_small(&root);
    let paths = &workflow.config().paths;

    assert_eq!(
        summary.processed_file,
        paths
            .processed_dir
            .join("processed_statcast_2024-06-01_to_2024-06-03.csv")
    );
    assert!(paths.processed_dir.join(io::UNDERESTIMATED_FILE).exists());
    assert!(paths.processed_dir.join(io::OVERESTIMATED_FILE).exists());
    assert_eq!(summary.plot_files.len(), 3);
    assert!(paths.plots_dir.join("Juan_Soto_621043_stats.json").exists());

    let report = summary.report_file.expect("report written");
    assert_eq!(report, paths.reports_dir.join("report_2024-06-03.html"));
    let html = std::fs::read_to_string(report).unwrap();
    assert!(html.contains("MLB underestimated players – 2024-06-03"));
    assert!(!html.contains("Juan Soto"));

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn processed_batch_reloads_identically() {
    let root = scratch("reload");
    let (workflow, _) = run_small(&root);

    let (path, reloaded) = workflow.latest_enriched().unwrap();
    assert!(path.ends_with("processed_statcast_2024-06-01_to_2024-06-03.csv"));
    let direct = Pipeline::new(workflow.config().pipeline_config())
        .unwrap()
        .enrich(&small_batch())
        .unwrap();
    assert_eq!(reloaded, direct);

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn leaderboards_follow_rolling_gaps() {
    let root = scratch("boards");
    let (_, summary) = run_small(&root);
    let boards = &summary.leaderboards;

    // June 2: Soto 0.5 - 0.125 = 0.375, Trout 0.625 - 0.5 = 0.125,
    // Betts 0.375 - 0.5 = -0.125.
    let under = boards.for_date(d(6, 2), EstimationType::Underestimated);
    let names: Vec<&str> = under.iter().map(|e| e.player_name.as_str()).collect();
    assert_eq!(names, vec!["Juan Soto", "Mike Trout", "Mookie Betts"]);
    assert_eq!(under[0].rolling_gap_pct, 37.5);

    let over = boards.for_date(d(6, 2), EstimationType::Overestimated);
    assert_eq!(over[0].player_name, "Mookie Betts");
    assert_eq!(over[0].rank, 1);

    // Soto did not play on June 3.
    for t in [EstimationType::Underestimated, EstimationType::Overestimated] {
        let day3 = boards.for_date(d(6, 3), t);
        assert_eq!(day3.len(), 2);
        assert!(day3.iter().all(|e| e.player_id != 621043));
    }

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn report_for_explicit_date() {
    let root = scratch("report_date");
    let (workflow, _) = run_small(&root);

    let path = workflow.report(Some(d(6, 1))).unwrap();
    let html = std::fs::read_to_string(&path).unwrap();
    assert!(path.ends_with("report_2024-06-01.html"));
    assert!(html.contains("<h2>1. Player name: Juan Soto</h2>"));
    assert!(html.contains("<p>100PA rolling wOBA: 0.250</p>"));

    assert!(workflow.report(Some(d(7, 4))).is_err());

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn namesakes_get_separate_plot_files() {
    let root = scratch("namesakes");
    let workflow = Workflow::new(config_in(&root)).unwrap();
    let input = root.join("raw").join("statcast_2024-06-01_to_2024-06-02.csv");
    let batch = vec![
        pa(1, "Luis", "Garcia", d(6, 1), 0.5, 0.25),
        pa(2, "Luis", "Garcia", d(6, 1), 0.25, 0.5),
        pa(1, "Luis", "Garcia", d(6, 2), 0.5, 0.5),
    ];
    io::save_raw_batch(&input, &batch).unwrap();

    let summary = workflow.run(&input).unwrap();
    let plots = &workflow.config().paths.plots_dir;
    assert_eq!(summary.plot_files.len(), 2);
    assert!(summary.plot_files.iter().all(|p| p.exists()));
    assert_eq!(std::fs::read_dir(plots).unwrap().count(), 2);

    let one: PlotSeries =
        serde_json::from_str(&std::fs::read_to_string(plots.join("Luis_Garcia_1_stats.json")).unwrap()).unwrap();
    let two: PlotSeries =
        serde_json::from_str(&std::fs::read_to_string(plots.join("Luis_Garcia_2_stats.json")).unwrap()).unwrap();
    assert_eq!(one.points.len(), 2);
    assert_eq!(two.points.len(), 1);

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn bad_value_after_dropped_rows_names_its_file_row() {
    let root = scratch("file_row");
    let workflow = Workflow::new(config_in(&root)).unwrap();
    let input = root.join("raw").join("gaps.csv");
    std::fs::create_dir_all(input.parent().unwrap()).unwrap();
    std::fs::write(
        &input,
        "game_date,batter,first_name,last_name,estimated_woba_using_speedangle,woba_value,woba_denom\n\
         2024-06-01,1,A,B,0.3,0.3,0\n\
         2024-06-01,2,C,D,0.3,0.3,0\n\
         2024-06-01,3,E,F,0.3,,1\n",
    )
    .unwrap();

    let err = workflow.process(&input).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("row 2"), "unexpected error: {msg}");
    assert!(msg.contains("woba_value"), "unexpected error: {msg}");

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn missing_column_fails_processing() {
    let root = scratch("missing_column");
    let workflow = Workflow::new(config_in(&root)).unwrap();
    let input = root.join("raw").join("broken.csv");
    std::fs::create_dir_all(input.parent().unwrap()).unwrap();
    std::fs::write(
        &input,
        "game_date,batter,first_name,last_name,woba_value,woba_denom\n2024-06-01,1,A,B,0.3,1\n",
    )
    .unwrap();

    let err = workflow.process(&input).unwrap_err();
    assert!(
        format!("{err:#}").contains("estimated_woba_using_speedangle"),
        "unexpected error: {err:#}"
    );

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn out_of_range_value_fails_whole_batch() {
    let root = scratch("out_of_range");
    let workflow = Workflow::new(config_in(&root)).unwrap();
    let mut batch = small_batch();
    batch[4].woba_value = Some(1.5);
    let input = root.join("raw").join("bad.csv");
    io::save_raw_batch(&input, &batch).unwrap();

    assert!(workflow.process(&input).is_err());
    assert!(io::latest_processed_file(&workflow.config().paths.processed_dir).is_err());

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn synthetic_season_runs_end_to_end() {
    let root = scratch("synthetic");
    let workflow = Workflow::new(config_in(&root)).unwrap();
    workflow.ensure_dirs().unwrap();

    let raw = workflow.generate(2024, 7).unwrap();
    assert!(raw.ends_with("statcast_2024-03-20_to_2024-09-29.csv"));

    let summary = workflow.run(&raw).unwrap();
    let boards = &summary.leaderboards;
    assert!(!boards.is_empty());
    for t in [EstimationType::Underestimated, EstimationType::Overestimated] {
        let board = boards.board(t);
        for w in board.windows(2) {
            assert!(w[0].game_date <= w[1].game_date);
            if w[0].game_date == w[1].game_date {
                assert_eq!(w[1].rank, w[0].rank + 1);
            }
        }
        assert!(board.iter().all(|e| (1..=5).contains(&e.rank)));
    }
    assert!(summary.plot_files.len() <= 10);
    assert!(summary.report_file.is_some());

    let _ = std::fs::remove_dir_all(&root);
}

// ===========================================================================
// HTTP handlers
// ===========================================================================

#[tokio::test]
async fn health_is_ok() {
    assert_eq!(api::health().await, "OK");
}

#[tokio::test]
async fn stats_report_latest_date_with_numeric_ids() {
    let root = scratch("api_stats");
    let (workflow, _) = run_small(&root);

    let stats = api::baseball_stats(State(state_for(&workflow))).await.unwrap().0;
    let ids: Vec<i64> = stats.iter().map(|s| s.player_id).collect();
    // June 3: Betts 0.4167 - 0.4167 = 0, Trout 0.5 - 0.5 = 0; tie keeps id order.
    assert_eq!(ids, vec![514888, 624413]);
    assert_eq!(stats[0].rank, 1);
    assert!((stats[0].rolling_woba - 0.5).abs() < 1e-12);

    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test]
async fn leaderboards_by_date() {
    let root = scratch("api_boards");
    let (workflow, _) = run_small(&root);
    let state = state_for(&workflow);

    let boards = api::leaderboards(State(state.clone()), Query(LeaderboardQuery { date: Some(d(6, 1)) }))
        .await
        .unwrap()
        .0;
    assert_eq!(boards.date, d(6, 1));
    assert_eq!(boards.underestimated[0].player_name, "Juan Soto");
    assert_eq!(boards.overestimated[0].player_name, "Mookie Betts");

    let latest = api::leaderboards(State(state.clone()), Query(LeaderboardQuery { date: None }))
        .await
        .unwrap()
        .0;
    assert_eq!(latest.date, d(6, 3));

    let err = api::leaderboards(State(state), Query(LeaderboardQuery { date: Some(d(8, 1)) }))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);

    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test]
async fn plot_for_known_and_unknown_player() {
    let root = scratch("api_plot");
    let (workflow, _) = run_small(&root);
    let state = state_for(&workflow);

    let series: PlotSeries = api::baseball_plot(State(state.clone()), UrlPath(624413))
        .await
        .unwrap()
        .0;
    assert_eq!(series.player_name, "Mookie Betts");
    assert_eq!(series.points.len(), 3);
    assert_eq!(series.end_date, d(6, 3));

    let err = api::baseball_plot(State(state), UrlPath(1)).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);

    let _ = std::fs::remove_dir_all(&root);
}
