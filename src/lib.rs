//! # hanalyzer
//!
//! A concurrent probe for high-availability and load-balanced HTTP
//! endpoints. It fires many requests at a URL from a pool of worker
//! threads, works out which backend node served each response, and keeps
//! a live table of per-node status code counts on screen.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  ┌────────────┐    ┌───────────┐    ┌──────────┐    ┌──────────┐  │
//! │  │ dispatcher │───▶│   pool    │───▶│  probe   │───▶│ ui::     │  │
//! │  │ (produce,  │    │ (queue,   │    │ (HTTP,   │    │ LiveTable│  │
//! │  │  shutdown) │    │  workers) │    │  node id)│    │ (1 lock) │  │
//! │  └─────┬──────┘    └───────────┘    └──────────┘    └────┬─────┘  │
//! │        │                                                 │        │
//! │        ▼                                                 ▼        │
//! │  ┌────────────┐                               ┌───────────────┐   │
//! │  │  events    │ Ctrl-C / q / SIGINT           │ data + grid   │   │
//! │  └────────────┘                               └───────────────┘   │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`config`]**: command-line arguments and layered settings
//! - **[`pool`]**: bounded [`TaskQueue`] and the [`WorkerPool`] draining it
//! - **[`probe`]**: one HTTP request per task, classified into an [`Observation`]
//! - **[`data`]**: the [`Aggregator`] with first-seen row and column order
//! - **[`ui`]**: incremental grid drawing onto a ratatui-backed canvas
//! - **[`events`]**: interrupt sources
//! - **[`logging`]**: stderr logging held back while the table is on screen
//! - **[`dispatcher`]**: the run loop and shutdown protocol
//!
//! ## Usage
//!
//! ```bash
//! # 10 000 probes (the default) from 8 workers
//! hanalyzer -t 8 http://lb.example.com/health
//!
//! # Run until interrupted, telling nodes apart by a custom header
//! hanalyzer -r -1 -H X-Backend-Server http://lb.example.com/
//! ```
//!
//! ### As a library
//!
//! ```
//! use hanalyzer::data::Aggregator;
//!
//! let mut aggregator = Aggregator::new();
//! aggregator.record("web-1", 200);
//! aggregator.record("web-2", 503);
//! aggregator.record("web-1", 200);
//!
//! assert_eq!(aggregator.node_row("web-2"), Some(1));
//! assert_eq!(aggregator.total(200), 2);
//! ```

pub mod config;
pub mod data;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod logging;
pub mod pool;
pub mod probe;
pub mod ui;

pub use config::{Args, RequestBudget, Settings};
pub use data::Aggregator;
pub use dispatcher::{run, Dispatcher, ShutdownMode};
pub use error::{Error, Result};
pub use pool::{Task, TaskHandler, TaskQueue, WorkerPool};
pub use probe::{Observation, ProbeExecutor, ProbeRequest};
