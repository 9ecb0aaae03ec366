pub mod acquire;
pub mod arxiv;
pub mod config;
pub mod embed;
pub mod fetch;
pub mod gemini;
pub mod index;
pub mod lang;
pub mod pipeline;
pub mod synthesize;
pub mod translate;

pub const USER_AGENT: &str = concat!("paperqa/", env!("CARGO_PKG_VERSION"));
