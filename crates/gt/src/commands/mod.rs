//! Command handlers, one module per top-level subcommand.

pub mod completion;
pub mod formula;
pub mod version;
