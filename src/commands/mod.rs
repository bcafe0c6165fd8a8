pub mod config;
pub mod host;
pub mod serve;
pub mod status;
