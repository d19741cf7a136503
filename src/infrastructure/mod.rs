//! Process-wide infrastructure shared by the module and its host bridge

pub mod logging;

pub use logging::{init_logging, init_once, LogConfig, LogFormat, LogOutput};
