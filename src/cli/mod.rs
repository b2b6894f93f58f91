pub mod commands;
pub mod runtime;

pub use commands::{run_check, run_current, run_fuse, run_listing, run_strength, show_log};
pub use runtime::{Cli, Commands};
