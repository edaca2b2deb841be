//! Cast Bridge
//!
//! Bridges a network casting receiver to a desktop media-control surface.
//!
//! This library provides:
//! - Device discovery over mDNS and lookup by name, host or UUID
//! - A resolver that turns raw receiver status into titles, times, artwork,
//!   volume and capabilities
//! - A listener that re-announces changed properties on every status update
//! - A supervisor that retries discovery and reconnects after drops
//! - A background service with persisted connection args

pub mod adapter;
pub mod bus;
pub mod cli;
pub mod config;
pub mod content;
pub mod daemon;
pub mod device;
pub mod error;
pub mod listener;
pub mod logging;
pub mod resolver;
pub mod resources;
pub mod supervisor;
pub mod surface;
