pub mod task_scheduler;

pub use task_scheduler::*;
