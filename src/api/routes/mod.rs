//! API route modules.

pub mod email;
pub mod summarize;
