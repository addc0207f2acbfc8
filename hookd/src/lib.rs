//! hookd library
//!
//! A small webhook deploy agent. Listens for GitHub push webhooks (or manual
//! trigger calls), matches them against a static repository map, and runs the
//! repository's shell deploy pipeline, journaling every step.

pub mod app;
pub mod deploy;
pub mod errors;
pub mod journal;
pub mod logs;
pub mod server;
pub mod settings;
pub mod utils;
