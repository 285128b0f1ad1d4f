mod setup;

pub use setup::{init_test_logging, setup_logging, LogConfig};
