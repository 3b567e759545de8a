pub mod config;
pub mod payload;
pub mod slug;
pub mod types;
