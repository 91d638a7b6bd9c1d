pub mod driver;

pub use driver::{ProgressTracker, ScanOutcome, Scanner};
