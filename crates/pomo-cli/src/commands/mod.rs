//! CLI subcommand implementations.

pub mod cancel;
pub mod pause;
pub mod report;
pub mod start;
pub mod status;
pub mod summary;
pub mod util;
