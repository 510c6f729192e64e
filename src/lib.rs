//! bloxbuddy: content pipeline for the Blox Buddy curriculum
//!
//! Fetches YouTube transcripts for curriculum videos, chunks them into
//! timed windows, embeds the chunks and stores everything in Supabase.
//! Also maintains the curriculum JSON file itself: validation, backups,
//! Markdown round trips, playlist imports and the resumable video search.

pub mod checkpoint;
pub mod chunk;
pub mod commands;
pub mod config;
pub mod curriculum;
pub mod embed;
pub mod error;
pub mod progress;
pub mod store;
pub mod throttle;
pub mod transcript;
pub mod youtube;
