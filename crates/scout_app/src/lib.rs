//! Terminal front end for the scout engine: CLI, config file, logger setup
//! and text rendering of a live session.
pub mod cli;
pub mod config;
pub mod logging;
pub mod render;
