pub mod cache;
pub mod cli;
pub mod collect;
pub mod config;
pub mod error;
pub mod git;
pub mod model;
pub mod parse;
pub mod resolve;
pub mod snapshot;
pub mod util;
