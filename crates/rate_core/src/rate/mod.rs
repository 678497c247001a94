//! Rate transform: rescales every time value of a chart.
//!
//! This module is pure. It never touches the filesystem; the workers in
//! [`crate::orchestrator`] load, transform and save.
//!
//! # Usage
//!
//! ```ignore
//! use rate_core::rate::{rescale_chart, converted_chart_name, RateTag};
//!
//! let tag = RateTag::new(1.5, false)?;
//! let faster = rescale_chart(&chart, &tag)?;
//! let file_name = converted_chart_name(&chart, &tag);
//! ```

mod error;
mod naming;
mod transform;

pub use error::{TransformError, TransformResult};
pub use naming::{
    chart_file_name, converted_version, format_rate, output_dir_name, sanitize_file_name,
    suffixed_file_name, RateTag,
};
pub use transform::{
    converted_chart_name, rescale_chart, rescale_events, rescale_hit_object,
    rescale_storyboard, rescale_timing_point, scale_duration, scale_time,
};
