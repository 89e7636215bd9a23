//! Pipelines.
//!
//! The module provides a light [pipeline::Pipeline] trait, along with the shard preprocessing pipelines.
#[allow(clippy::module_inception)]
pub mod pipeline;
mod preprocess;

pub use pipeline::Pipeline;
pub use preprocess::{map_shard, MapShard, Preprocess};
