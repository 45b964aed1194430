pub mod config;
pub mod delete;
pub mod export;
pub mod import;
pub mod migrate;
pub mod operations;
pub mod run;
pub mod validate;
