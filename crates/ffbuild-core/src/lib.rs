pub mod config;
pub mod logging;

pub mod archive;
pub mod builder;
pub mod checksum;
pub mod command;
pub mod fetch;
pub mod package;
pub mod pipeline;
pub mod platform;
pub mod postprocess;
pub mod retry;
pub mod sources;
pub mod tools;
