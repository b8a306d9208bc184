//! Yelp reviews analytics dashboard.
//!
//! Pages are rendered per request from read-only SQL over a pre-populated
//! store. Each chart or table is a guarded block: a failed query or a bad
//! frame shows an error in that block and leaves the rest of the page alone.

pub mod block;
pub mod chart;
pub mod config;
pub mod error;
pub mod frame;
pub mod gateway;
pub mod logging;
pub mod pages;
pub mod render;
pub mod server;
pub mod transform;
pub mod wordfreq;
