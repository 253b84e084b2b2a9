// Synthetic Statcast-like season for demos and offline runs.

use chrono::NaiveDate;
use gapwatch_core::RawPlateAppearance;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::season::SeasonSchedule;

pub const SAMPLE_PLAYERS: &[(i64, &str, &str)] = &[
    (660271, "Shohei", "Ohtani"),
    (641343, "Max", "Muncy"),
    (624413, "Mookie", "Betts"),
    (665487, "Trea", "Turner"),
    (514888, "Mike", "Trout"),
    (592450, "Marcus", "Semien"),
    (605141, "Manny", "Machado"),
    (621043, "Juan", "Soto"),
    (545361, "Mike", "Zunino"),
    (543939, "Kyle", "Tucker"),
];

const WOBA_MEAN: f64 = 0.320;
const WOBA_SD: f64 = 0.050;
const XWOBA_SD: f64 = 0.030;

/// Standard normal draw via Box-Muller.
fn standard_normal(rng: &mut StdRng) -> f64 {
    // Shift away from 0 so ln() stays finite.
    let u1 = 1.0 - rng.random::<f64>();
    let u2 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// One plate appearance per sample player per day from `start` to `end`
/// inclusive. Outcomes are drawn around a league-average wOBA with the
/// expected value scattered around the actual one, both clamped to [0, 1].
pub fn generate(start: NaiveDate, end: NaiveDate, seed: u64) -> Vec<RawPlateAppearance> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = Vec::new();

    for game_date in start.iter_days().take_while(|d| *d <= end) {
        for &(batter, first, last) in SAMPLE_PLAYERS {
            let woba = WOBA_MEAN + WOBA_SD * standard_normal(&mut rng);
            let xwoba = woba + XWOBA_SD * standard_normal(&mut rng);
            rows.push(RawPlateAppearance {
                game_date,
                batter,
                first_name: first.to_string(),
                last_name: last.to_string(),
                estimated_woba_using_speedangle: Some(xwoba.clamp(0.0, 1.0)),
                woba_value: Some(woba.clamp(0.0, 1.0)),
                woba_denom: Some(rng.random_range(1..=4)),
                source_row: None,
            });
        }
    }
    rows
}

/// A full season ending the day before the calendar's last day, matching
/// the range Statcast exports are usually pulled for.
pub fn generate_season(year: i32, seed: u64) -> (NaiveDate, NaiveDate, Vec<RawPlateAppearance>) {
    let schedule = SeasonSchedule::for_year(year);
    let end = schedule.end.pred_opt().unwrap_or(schedule.end);
    (schedule.start, end, generate(schedule.start, end, seed))
}

/// `statcast_<start>_to_<end>.csv`
pub fn raw_file_name(start: NaiveDate, end: NaiveDate) -> String {
    format!("statcast_{start}_to_{end}.csv")
}
