pub mod batch;
/// Monthly forecast calendar.
pub mod clock;
pub mod engine;
/// Noise, year variation, and climatology blending.
pub mod perturb;
pub mod types;
/// Pseudo-history carried between simulated months.
pub mod window;

pub use batch::{BatchReport, BatchRunner, ForecastRequest, RunFailure, RunForecast};
pub use engine::{Simulator, simulate};
pub use types::{ForecastPoint, ForecastTable, SimConfig, StepRecord};
