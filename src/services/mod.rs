pub mod generator;
pub mod lifecycle;
pub mod media;
pub mod sweeper;
pub mod usage;
pub mod workflow;
