// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HDDS File Adapter
//!
//! File-backed stream discovery for the HDDS routing service. Each configured
//! stream is backed by a CSV file of shape samples; the adapter announces the
//! streams whose files exist and retires each one once its file is exhausted.
//!
//! # Features
//!
//! - **Discovery**: Announce file-backed streams to a routing engine
//! - **Loans**: Generation-checked take / return-loan of discovery records
//! - **Disposal**: End of file retires the stream and tears its route down
//! - **Engine**: Minimal tokio routing engine forwarding samples to a sink
//!
//! # Quick Start
//!
//! ```bash
//! # Route two files, print samples as JSON lines
//! hdds-file-adapter --stream Square=square.csv --stream Circle=circle.csv
//!
//! # Using config file
//! hdds-file-adapter --config adapter.toml
//! ```
//!
//! # Configuration File
//!
//! ```toml
//! [adapter]
//! name = "shapes-file-adapter"
//! poll_interval_ms = 1000
//! sample_period_ms = 100
//!
//! [[streams]]
//! stream_name = "Square"
//! file_path = "square.csv"
//! type_name = "ShapeType"
//! ```
//!
//! # Library Usage
//!
//! ```rust,ignore
//! use hdds_file_adapter::{AdapterConfig, DiscoveryStreamReader, FileDiscoveryStreamReader};
//!
//! let config = AdapterConfig::from_file("adapter.toml")?;
//! let discovery = FileDiscoveryStreamReader::new(&config, None)?;
//!
//! let loans = discovery.take();
//! for loan in &loans {
//!     println!("{}", loan.info());
//! }
//! discovery.return_loan(loans)?;
//! ```

pub mod config;
pub mod discovery;
pub mod engine;
pub mod loan;
pub mod reader;
pub mod route;
pub mod stream_info;

pub use config::{AdapterConfig, AdapterSettings, ConfigError, PropertySet, StreamSource};
pub use discovery::{
    AdapterError, DiscoveryListener, DiscoveryStreamReader, FileDiscoveryStreamReader,
};
pub use engine::{EngineError, EngineHandle, RoutingEngine, SampleSink};
pub use loan::{Loan, LoanToken};
pub use reader::{FileStreamReader, ReaderError, ShapeSample};
pub use route::{RouteStats, RouteStatsSnapshot};
pub use stream_info::{StreamInfo, StreamState, TypeInfo};
