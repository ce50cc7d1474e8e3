pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod email;
pub mod error;
pub mod global;
pub mod summarizer;
