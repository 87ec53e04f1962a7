pub mod api;
pub mod cli;
pub mod config;
pub mod local;
pub mod migrate;
pub mod resolver;
pub mod roles;
pub mod stores;
