pub mod cli;
pub mod config;
pub mod delivery;
pub mod pipeline;
pub mod sink;
pub mod source;
