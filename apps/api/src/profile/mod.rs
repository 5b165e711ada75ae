pub mod cache;
pub mod generator;
pub mod handlers;
pub mod prompts;
