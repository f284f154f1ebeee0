pub mod config;
pub mod tally;
