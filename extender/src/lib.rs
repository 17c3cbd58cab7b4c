//! Node-balance scheduler extender.
//!
//! An external priority-scoring service consulted by a cluster orchestrator
//! during scheduling, kept separate from feasibility filtering. Two
//! algorithms are available:
//!
//! - BNP (Balance Net-load Priority): single-resource, variance-minimising
//!   scoring over normalised network load ratios.
//! - CMDN (Composite Multi-Dimensional Node priority): multi-resource
//!   scoring via TOPSIS over a node × resource matrix.
//!
//! A cron-driven refresh loop keeps an in-process cache of upstream metrics
//! current; the HTTP scoring endpoint only ever reads that cache, so a slow
//! or unavailable metrics backend degrades refresh freshness rather than
//! request latency.

pub mod algo;
pub mod cache;
pub mod config;
pub mod driver;
pub mod http;
pub mod metrics;
pub mod model;
pub mod refresh;
pub mod topsis;
