//! Plain data types shared across the pipeline and the runtime.

pub mod errors;
pub mod model;
