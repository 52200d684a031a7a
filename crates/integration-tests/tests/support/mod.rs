#![allow(dead_code)]

pub mod api_app;
pub mod identity;
pub mod llm_mock;
pub mod store;
