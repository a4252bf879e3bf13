//! draftdesk: an editorial assistant that turns pasted or fetched source material
//! into blog posts, copy edits, headline sets and fact-check reports through a
//! hosted language model, plus a small companion server for drafting and
//! publishing posts from scraped pages.

pub mod classify;
pub mod cli;
pub mod config;
pub mod errors;
pub mod followup;
pub mod generate;
pub mod log;
pub mod prompt;
pub mod provider;
pub mod publish;
pub mod render;
pub mod scrape;
pub mod server;
pub mod session;
pub mod ux;
pub mod wire;
