//! Conversion job orchestration.
//!
//! # Architecture
//!
//! ```text
//! RateChanger (service, one per process)
//!     └── convert(job)
//!             ├── Chart worker  x N charts       -> ChartOutcome (excluded on failure)
//!             ├── Audio worker  x M audio tracks -> AssetOutcome (fatal on failure)
//!             ├── Storyboard worker x K          -> AssetOutcome (fatal on failure)
//!             └── Packager (after the join barrier)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use rate_core::config::Settings;
//! use rate_core::models::ConversionJob;
//! use rate_core::orchestrator::RateChanger;
//!
//! let changer = RateChanger::new(Settings::default());
//! let job = ConversionJob::new("sets/123 Artist - Title", 1.5, "out");
//! match changer.convert(&job) {
//!     Ok(result) => println!("{}", result.artifact_path.display()),
//!     Err(e) => eprintln!("{}", e.user_message()),
//! }
//! ```

mod coordinator;
mod errors;
mod inventory;
mod types;
pub mod workers;

pub use coordinator::RateChanger;
pub use errors::{ConvertResult, JobError};
pub use inventory::SetInventory;
pub use types::{CancelHandle, JobContext, ProgressCallback};
