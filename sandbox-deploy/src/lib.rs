pub mod auth;
pub mod cli;
pub mod load_config;
pub mod upload;

pub use cli::{deploy, fetch, run, Cli, Commands, DeployTarget};
