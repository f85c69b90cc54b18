#![doc = "event-digest-core: core logic library for event-digest."]

//! This crate contains all scraping, rendering and publishing logic for
//! event-digest. CLI argument handling and config-file loading live in the
//! `event-digest` binary crate.
//!
//! # Usage
//! Add this as a dependency for the event record model, the Meetup scraper,
//! the digest renderer and the dual-backend pull-request publish workflow.

pub mod config;
pub mod contract;
pub mod digest;
pub mod error;
pub mod event;
pub mod github;
pub mod local;
pub mod month;
pub mod remote;
pub mod render;
pub mod scrape;
pub mod select;
