pub mod config;
pub mod duration;

pub use config::Config;
pub use duration::{format_duration, parse_duration};
