//! Pagehost: a cross-context messaging host for custom content pages.
//!
//! A host session shows one content page at a time, either in an embedded
//! frame or in a detached tab reached over a named broadcast channel, and
//! pushes the selected variable set to it. Every message crossing the
//! boundary lands in an append-only event log.

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod event_log;
pub mod logging;
pub mod pages;
pub mod platform;
pub mod preferences;
pub mod protocol;
pub mod state;
pub mod store;
pub mod tabs;
pub mod transport;
pub mod viewer;
