pub mod chunk;
pub mod config;
pub mod dedup;
pub mod error;
pub mod hash;
pub mod keys;
mod macros;
pub mod store;
pub mod types;
