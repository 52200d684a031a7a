pub mod analysis;
pub mod chat;
pub mod config;
pub mod llm;
pub mod models;
pub mod repos;
