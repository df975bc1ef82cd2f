//! CLI command handlers, one per file.

mod build;
mod checksum;
mod fetch;
mod list;

pub use build::run_build;
pub use checksum::run_checksum;
pub use fetch::run_fetch;
pub use list::run_list;
