pub mod archive;
pub mod config;
pub mod console;
pub mod core;
pub mod error;
pub mod ledger;
pub mod models;
pub mod providers;
