pub mod report;
pub mod retry;
pub mod runner;
pub mod throttle;
pub mod universe;
pub mod yahoo;

pub use retry::{RetryPolicy, Retrying};
pub use runner::{AnalysisReport, BatchRunner, RunSummary, ScreenReport};
pub use throttle::Throttle;
pub use universe::StaticUniverse;
pub use yahoo::YahooClient;
