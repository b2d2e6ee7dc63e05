//! Fire-station vehicle status server.
//!
//! Scrapes the status pages of a fixed set of fire stations, normalizes
//! the state of each vehicle, and serves the result as a cached JSON
//! snapshot that is refreshed in the background when it goes stale.

pub mod cache;
pub mod config;
pub mod domain;
pub mod fetch;
pub mod scrape;
pub mod web;
