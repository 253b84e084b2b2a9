// Transform-and-rank core: per-player rolling xwOBA/wOBA windows and daily
// leaderboards of the players whose results diverge most from expectation.

pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod ranking;
pub mod record;
pub mod rolling;

pub use error::PipelineError;
pub use normalize::OutcomeBounds;
pub use pipeline::{Pipeline, PipelineConfig, PipelineOutput};
pub use ranking::{DailyLeaderboardEntry, EstimationType, Leaderboards};
pub use record::{EnrichedRecord, NormalizedRecord, PlateAppearance, PlayerId, RawPlateAppearance};
