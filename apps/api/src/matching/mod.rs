pub mod handlers;
pub mod retriever;
pub mod scorer;
