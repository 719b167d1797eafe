/// Serve command handler
pub mod serve;

/// One-shot sync command handler
pub mod sync;

/// Version command handlers
pub mod version;
