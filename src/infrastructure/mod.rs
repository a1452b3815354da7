pub mod config;
pub mod directory;
pub mod state;
pub mod store;
