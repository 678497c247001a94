//! Data models shared across the conversion pipeline.

mod job;
mod outcome;

pub use job::ConversionJob;
pub use outcome::{
    AssetKind, AssetOutcome, ChartOutcome, ExcludedChart, JobResult, StagedFile,
};
