// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! File-backed discovery stream reader.
//!
//! Announces every configured stream whose backing file exists when the
//! reader is created, and announces a stream's disposal once its file reader
//! reports end of file. The routing engine polls [`DiscoveryStreamReader::take`]
//! and must hand every record back through
//! [`DiscoveryStreamReader::return_loan`].
//!
//! # Thread Safety
//!
//! `take`, `return_loan` and `dispose` may be called from different threads.
//! A single mutex serializes them. The listener is always invoked after the
//! mutex is released, so it may call back into the reader.

use crate::config::{AdapterConfig, ConfigError, PropertySet, StreamSource};
use crate::loan::{Loan, LoanArena, LoanToken};
use crate::stream_info::{StreamEvent, StreamInfo, StreamState, TypeInfo};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs::File;
use std::path::Path;
use std::sync::Weak;
use thiserror::Error;

/// Adapter errors.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Caller misuse (double return, unknown stream). Not retried.
    #[error("Contract violation: {0}")]
    ContractViolation(String),
}

/// Notified when discovery data becomes available outside the polling cycle.
pub trait DiscoveryListener: Send + Sync {
    /// Called after new records were queued; the engine should poll `take`.
    fn on_discovery_changed(&self);
}

/// Source of discovery records consumed by the routing engine.
pub trait DiscoveryStreamReader: Send + Sync {
    /// Take all pending records. Never blocks waiting for data.
    fn take(&self) -> Vec<Loan>;

    /// Hand taken records back to the reader.
    fn return_loan(&self, loans: Vec<Loan>) -> Result<(), AdapterError>;
}

struct DiscoveryState {
    pending: VecDeque<LoanToken>,
    streams: HashMap<String, StreamState>,
    arena: LoanArena,
}

/// Discovery stream reader over a fixed set of files.
pub struct FileDiscoveryStreamReader {
    sources: Vec<StreamSource>,
    state: Mutex<DiscoveryState>,
    listener: Option<Weak<dyn DiscoveryListener>>,
}

impl FileDiscoveryStreamReader {
    /// Create the reader and queue an announcement for every stream whose
    /// file exists.
    ///
    /// The listener is held weakly; the reader never keeps the engine alive.
    pub fn new(
        config: &AdapterConfig,
        listener: Option<Weak<dyn DiscoveryListener>>,
    ) -> Result<Self, AdapterError> {
        config.validate()?;

        for source in &config.streams {
            if source.file_path.is_dir() {
                return Err(ConfigError::Invalid(format!(
                    "Stream '{}' file_path {} is a directory",
                    source.stream_name,
                    source.file_path.display()
                ))
                .into());
            }
        }

        let mut state = DiscoveryState {
            pending: VecDeque::new(),
            streams: HashMap::new(),
            arena: LoanArena::new(),
        };

        for source in &config.streams {
            let mut stream_state = StreamState::Unseen;

            if Self::resource_exists(&source.file_path) {
                if let Some(next) = stream_state.transition(StreamEvent::Announce) {
                    stream_state = next;
                    let info = StreamInfo::new(
                        source.stream_name.clone(),
                        TypeInfo::new(source.type_name.clone()),
                    );
                    let token = state.arena.insert(info);
                    state.pending.push_back(token);
                    tracing::info!(
                        "Announcing stream {} ({}) from {}",
                        source.stream_name,
                        source.type_name,
                        source.file_path.display()
                    );
                }
            } else {
                tracing::info!(
                    "Skipping stream {}: {} not found",
                    source.stream_name,
                    source.file_path.display()
                );
            }

            state
                .streams
                .insert(source.stream_name.clone(), stream_state);
        }

        Ok(Self {
            sources: config.streams.clone(),
            state: Mutex::new(state),
            listener,
        })
    }

    /// Create the reader from a flat property set.
    pub fn from_properties(
        properties: &PropertySet,
        listener: Option<Weak<dyn DiscoveryListener>>,
    ) -> Result<Self, AdapterError> {
        let config = AdapterConfig::from_properties(properties)?;
        Self::new(&config, listener)
    }

    /// Check whether a backing file is present and openable.
    ///
    /// Absence is an expected outcome, not an error.
    pub fn resource_exists<P: AsRef<Path>>(path: P) -> bool {
        let path = path.as_ref();
        path.is_file() && File::open(path).is_ok()
    }

    /// Retire a stream.
    ///
    /// Called by a file reader once its file is exhausted. Queues a copy of
    /// `stream_info` with `disposed` set and notifies the listener. Disposing
    /// a stream twice is a no-op.
    pub fn dispose(&self, stream_info: &StreamInfo) -> Result<(), AdapterError> {
        let queued = {
            let mut state = self.state.lock();
            let name = &stream_info.stream_name;

            let current = state.streams.get(name).copied().ok_or_else(|| {
                AdapterError::ContractViolation(format!("dispose of unknown stream '{}'", name))
            })?;

            match current.transition(StreamEvent::Dispose) {
                Some(next) => {
                    state.streams.insert(name.clone(), next);
                    let token = state.arena.insert(stream_info.to_disposed());
                    state.pending.push_back(token);
                    true
                }
                None if current.is_terminal() => false,
                None => {
                    return Err(AdapterError::ContractViolation(format!(
                        "dispose of stream '{}' that was never announced",
                        name
                    )));
                }
            }
        };

        if queued {
            tracing::info!("Stream {} disposed", stream_info.stream_name);
            self.notify_listener();
        } else {
            tracing::debug!("Stream {} already disposed", stream_info.stream_name);
        }

        Ok(())
    }

    /// Current lifecycle state of a configured stream.
    pub fn stream_state(&self, stream_name: &str) -> Option<StreamState> {
        self.state.lock().streams.get(stream_name).copied()
    }

    /// Configured sources, in configuration order.
    pub fn sources(&self) -> &[StreamSource] {
        &self.sources
    }

    /// Configured source for a stream.
    pub fn source(&self, stream_name: &str) -> Option<&StreamSource> {
        self.sources.iter().find(|s| s.stream_name == stream_name)
    }

    /// Records queued but not yet taken.
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Records taken but not yet returned.
    pub fn loaned_count(&self) -> usize {
        self.state.lock().arena.loaned()
    }

    fn notify_listener(&self) {
        if let Some(listener) = self.listener.as_ref().and_then(Weak::upgrade) {
            listener.on_discovery_changed();
        }
    }
}

impl DiscoveryStreamReader for FileDiscoveryStreamReader {
    fn take(&self) -> Vec<Loan> {
        let mut state = self.state.lock();
        let DiscoveryState { pending, arena, .. } = &mut *state;

        let loans: Vec<Loan> = pending
            .drain(..)
            .filter_map(|token| arena.lend(token))
            .collect();

        if !loans.is_empty() {
            tracing::debug!("Lending {} discovery record(s)", loans.len());
        }
        loans
    }

    fn return_loan(&self, loans: Vec<Loan>) -> Result<(), AdapterError> {
        let mut state = self.state.lock();

        // Validate the whole batch first so a bad batch frees nothing.
        let mut seen = HashSet::with_capacity(loans.len());
        for loan in &loans {
            let token = loan.token();
            if !seen.insert(token) {
                return Err(AdapterError::ContractViolation(format!(
                    "loan for stream '{}' returned twice in one batch",
                    loan.stream_name
                )));
            }
            state.arena.check_loaned(token).map_err(|reason| {
                AdapterError::ContractViolation(format!(
                    "returned loan for stream '{}' is not on loan ({:?})",
                    loan.stream_name, reason
                ))
            })?;
        }

        for loan in &loans {
            state.arena.release(loan.token()).map_err(|reason| {
                AdapterError::ContractViolation(format!("{:?}", reason))
            })?;
        }

        Ok(())
    }
}
