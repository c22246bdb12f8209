pub mod control;
pub mod task;
