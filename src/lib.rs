pub mod api;
pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod gledger;
pub mod storage;

pub use domain::*;
pub use storage::Repository;
