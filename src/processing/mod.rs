pub mod engine;
pub mod normalize;
pub mod sweeper;

pub use engine::CorrelationEngine;
pub use sweeper::{CleanupSweeper, SweepReport};
