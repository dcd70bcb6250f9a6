// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Routing engine driving the file adapter.
//!
//! A discovery task polls the discovery reader, starts one route per
//! announced stream and tears the route down once the stream is disposed.
//! Each route paces reads from its file and hands batches to a [`SampleSink`].

use crate::config::AdapterConfig;
use crate::discovery::{
    AdapterError, DiscoveryListener, DiscoveryStreamReader, FileDiscoveryStreamReader,
};
use crate::reader::{FileStreamReader, ReaderError, ShapeSample};
use crate::route::{RouteStats, RouteStatsSnapshot};
use crate::stream_info::{StreamInfo, StreamState};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Reader error: {0}")]
    Reader(#[from] ReaderError),

    #[error("Engine already running")]
    AlreadyRunning,

    #[error("Engine not running")]
    NotRunning,
}

/// Destination of routed samples.
pub trait SampleSink: Send + Sync {
    /// Called from the route task with every non-empty batch.
    fn on_samples(&self, stream: &StreamInfo, samples: &[ShapeSample]);
}

/// Wakes the discovery task when the reader queues records.
#[derive(Default)]
struct DiscoveryNotifier {
    notify: Notify,
}

impl DiscoveryListener for DiscoveryNotifier {
    fn on_discovery_changed(&self) {
        self.notify.notify_one();
    }
}

struct ActiveRoute {
    stop: Arc<Notify>,
    task: JoinHandle<()>,
}

struct EngineShared {
    config: AdapterConfig,
    discovery: Arc<FileDiscoveryStreamReader>,
    notifier: Arc<DiscoveryNotifier>,
    sink: Arc<dyn SampleSink>,
    running: AtomicBool,
    routes: Mutex<HashMap<String, ActiveRoute>>,
    stats: Mutex<Vec<Arc<RouteStats>>>,
}

/// Handle to control a running engine.
#[derive(Clone)]
pub struct EngineHandle {
    shared: Arc<EngineShared>,
    discovery_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl EngineHandle {
    /// Check if the engine is running.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Relaxed)
    }

    /// Request the engine to stop.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::Relaxed);
        self.shared.notifier.notify.notify_one();
    }

    /// Stop the engine and wait for every task to exit.
    ///
    /// Fails with [`EngineError::NotRunning`] once the engine has already
    /// been shut down through this handle or one of its clones.
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        let task = self
            .discovery_task
            .lock()
            .take()
            .ok_or(EngineError::NotRunning)?;

        self.stop();
        if let Err(err) = task.await {
            tracing::warn!("Discovery task ended abnormally: {}", err);
        }
        Ok(())
    }

    /// Get route statistics, one entry per route ever started.
    pub fn stats(&self) -> Vec<RouteStatsSnapshot> {
        self.shared.stats.lock().iter().map(|s| s.snapshot()).collect()
    }

    /// Names of streams with a live route, sorted.
    pub fn active_routes(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shared.routes.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// True when no stream is live and no discovery record is in flight.
    pub fn is_idle(&self) -> bool {
        let discovery = &self.shared.discovery;
        self.shared.routes.lock().is_empty()
            && discovery.pending_count() == 0
            && discovery.loaned_count() == 0
            && discovery
                .sources()
                .iter()
                .all(|s| discovery.stream_state(&s.stream_name) != Some(StreamState::Announced))
    }

    /// Discovery reader used by the engine.
    pub fn discovery(&self) -> &Arc<FileDiscoveryStreamReader> {
        &self.shared.discovery
    }
}

/// File adapter routing engine.
pub struct RoutingEngine {
    shared: Arc<EngineShared>,
    start_time: Option<Instant>,
}

impl RoutingEngine {
    /// Create the engine and its discovery reader.
    pub fn new(config: AdapterConfig, sink: Arc<dyn SampleSink>) -> Result<Self, EngineError> {
        let notifier = Arc::new(DiscoveryNotifier::default());
        let listener: Arc<dyn DiscoveryListener> = notifier.clone();
        let discovery = Arc::new(FileDiscoveryStreamReader::new(
            &config,
            Some(Arc::downgrade(&listener)),
        )?);

        Ok(Self {
            shared: Arc::new(EngineShared {
                config,
                discovery,
                notifier,
                sink,
                running: AtomicBool::new(false),
                routes: Mutex::new(HashMap::new()),
                stats: Mutex::new(Vec::new()),
            }),
            start_time: None,
        })
    }

    /// Get the engine configuration.
    pub fn config(&self) -> &AdapterConfig {
        &self.shared.config
    }

    /// Discovery reader used by the engine.
    pub fn discovery(&self) -> &Arc<FileDiscoveryStreamReader> {
        &self.shared.discovery
    }

    /// Start the engine.
    ///
    /// Spawns the discovery task on the current tokio runtime.
    pub async fn run(&mut self) -> Result<EngineHandle, EngineError> {
        if self.shared.running.swap(true, Ordering::Relaxed) {
            return Err(EngineError::AlreadyRunning);
        }
        self.start_time = Some(Instant::now());

        tracing::info!(
            "File adapter '{}' started with {} streams",
            self.shared.config.adapter.name,
            self.shared.config.streams.len()
        );

        let task = tokio::spawn(run_discovery(Arc::clone(&self.shared)));

        Ok(EngineHandle {
            shared: Arc::clone(&self.shared),
            discovery_task: Arc::new(Mutex::new(Some(task))),
        })
    }

    /// Check if the engine is running.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Relaxed)
    }

    /// Get uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0)
    }
}

async fn run_discovery(shared: Arc<EngineShared>) {
    let poll_interval = shared.config.adapter.poll_interval();

    while shared.running.load(Ordering::Relaxed) {
        let loans = shared.discovery.take();

        for loan in &loans {
            if loan.disposed {
                retire_route(&shared, loan.info()).await;
            } else {
                start_route(&shared, loan.info());
            }
        }

        if let Err(err) = shared.discovery.return_loan(loans) {
            tracing::error!("Failed to return discovery loans: {}", err);
        }

        tokio::select! {
            _ = shared.notifier.notify.notified() => {}
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }

    let routes: Vec<(String, ActiveRoute)> = shared.routes.lock().drain().collect();
    for (name, route) in routes {
        route.stop.notify_one();
        if let Err(err) = route.task.await {
            tracing::warn!("Route {} ended abnormally: {}", name, err);
        }
    }

    tracing::info!("File adapter '{}' stopped", shared.config.adapter.name);
}

fn start_route(shared: &Arc<EngineShared>, info: &StreamInfo) {
    if shared.routes.lock().contains_key(&info.stream_name) {
        tracing::debug!("Route for {} already active", info.stream_name);
        return;
    }

    let source = match shared.discovery.source(&info.stream_name) {
        Some(source) => source,
        None => {
            tracing::warn!("No source configured for stream {}", info.stream_name);
            return;
        }
    };

    let reader = match FileStreamReader::open(
        info.clone(),
        &source.file_path,
        Arc::clone(&shared.discovery),
    ) {
        Ok(reader) => reader,
        Err(err) => {
            // The file vanished after it was announced: retire the stream.
            tracing::warn!("Cannot start route for {}: {}", info.stream_name, err);
            if let Err(err) = shared.discovery.dispose(info) {
                tracing::warn!("Failed to dispose {}: {}", info.stream_name, err);
            }
            return;
        }
    };

    let stats = Arc::new(RouteStats::new(info.stream_name.clone()));
    shared.stats.lock().push(Arc::clone(&stats));

    let stop = Arc::new(Notify::new());
    let task = tokio::spawn(run_route(
        Arc::clone(shared),
        reader,
        stats,
        Arc::clone(&stop),
    ));

    tracing::info!(
        "Route started: {} ({})",
        info.stream_name,
        info.type_info.type_name
    );
    shared
        .routes
        .lock()
        .insert(info.stream_name.clone(), ActiveRoute { stop, task });
}

async fn retire_route(shared: &Arc<EngineShared>, info: &StreamInfo) {
    let route = shared.routes.lock().remove(&info.stream_name);
    match route {
        Some(route) => {
            route.stop.notify_one();
            if let Err(err) = route.task.await {
                tracing::warn!("Route {} ended abnormally: {}", info.stream_name, err);
            }
            tracing::info!("Route torn down: {}", info.stream_name);
        }
        None => {
            tracing::debug!("No active route for disposed stream {}", info.stream_name);
        }
    }
}

async fn run_route(
    shared: Arc<EngineShared>,
    mut reader: FileStreamReader,
    stats: Arc<RouteStats>,
    stop: Arc<Notify>,
) {
    let batch_size = shared.config.adapter.batch_size;
    let mut interval = tokio::time::interval(shared.config.adapter.sample_period());

    while shared.running.load(Ordering::Relaxed) && !reader.is_finished() {
        tokio::select! {
            _ = interval.tick() => {}
            _ = stop.notified() => break,
        }

        match reader.take(batch_size) {
            Ok(samples) => {
                if !samples.is_empty() {
                    shared.sink.on_samples(reader.stream_info(), &samples);
                    stats.record_batch(samples.len() as u64);
                }
            }
            Err(err) => {
                stats.record_error();
                let name = &reader.stream_info().stream_name;
                tracing::warn!("Route {} read failed: {}", name, err);
                if let Err(err) = shared.discovery.dispose(reader.stream_info()) {
                    tracing::debug!("Dispose after read failure for {}: {}", name, err);
                }
                break;
            }
        }
    }

    stats.mark_finished();
}
