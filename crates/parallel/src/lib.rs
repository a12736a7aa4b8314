//! # OpenRES Parallel
//!
//! Worker-pool strategies for the per-segment pipeline.
//!
//! Segment computations are independent, so they are dispatched as a
//! parallel map. A [`CancelToken`] stops dispatching new items; items that
//! already started run to completion.
//!
//! Without the `parallel` feature every mode runs sequentially.

pub mod strategy;

pub use strategy::{CancelToken, ParallelStrategy, ProcessingMode};
