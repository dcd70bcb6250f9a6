// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests panic on failure

//! Discovery stream reader scenarios
//!
//! Exercises the file adapter the way a routing engine does: a polling
//! context calling take/return_loan and data-path contexts disposing streams
//! concurrently.

use hdds_file_adapter::{
    AdapterConfig, AdapterError, DiscoveryListener, DiscoveryStreamReader,
    FileDiscoveryStreamReader, FileStreamReader, PropertySet, StreamInfo, StreamSource,
    StreamState, TypeInfo,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

struct CountingListener {
    calls: AtomicUsize,
}

impl DiscoveryListener for CountingListener {
    fn on_discovery_changed(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

fn write_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("write fixture");
    path
}

#[test]
fn square_present_circle_absent() {
    let dir = TempDir::new().expect("tempdir");
    write_file(&dir, "square.csv", "BLUE,10,10,30\n");

    let mut props = PropertySet::new();
    props.insert(
        "square.file_path".into(),
        dir.path().join("square.csv").display().to_string(),
    );
    props.insert(
        "circle.file_path".into(),
        dir.path().join("circle.csv").display().to_string(),
    );

    let reader = FileDiscoveryStreamReader::from_properties(&props, None).expect("reader");
    assert!(!FileDiscoveryStreamReader::resource_exists(
        dir.path().join("circle.csv")
    ));

    let loans = reader.take();
    assert_eq!(loans.len(), 1);
    assert_eq!(loans[0].stream_name, "square");
    assert_eq!(loans[0].type_info.type_name, "ShapeType");
    assert!(!loans[0].disposed);
    let square = loans[0].info().clone();
    reader.return_loan(loans).expect("return");

    reader.dispose(&square).expect("dispose");
    let loans = reader.take();
    assert_eq!(loans.len(), 1);
    assert_eq!(loans[0].stream_name, "square");
    assert!(loans[0].disposed);
    reader.return_loan(loans).expect("return");

    assert_eq!(reader.stream_state("square"), Some(StreamState::Disposed));
    assert_eq!(reader.stream_state("circle"), Some(StreamState::Unseen));

    // Retried take without a new dispose yields nothing
    assert!(reader.take().is_empty());
}

#[test]
fn loaned_records_are_stable_until_returned() {
    let dir = TempDir::new().expect("tempdir");
    let mut config = AdapterConfig::default();
    config.add_stream(StreamSource::new(
        "Square",
        write_file(&dir, "square.csv", ""),
    ));
    let reader = FileDiscoveryStreamReader::new(&config, None).expect("reader");

    let announced = reader.take();
    reader
        .dispose(&StreamInfo::new("Square", TypeInfo::new("ShapeType")))
        .expect("dispose");

    // The announcement on loan is untouched by the disposal
    assert!(!announced[0].disposed);
    assert_eq!(reader.loaned_count(), 1);

    let disposed = reader.take();
    assert!(disposed[0].disposed);
    assert_eq!(reader.loaned_count(), 2);

    reader.return_loan(disposed).expect("return");
    reader.return_loan(announced.clone()).expect("return");
    assert!(matches!(
        reader.return_loan(announced),
        Err(AdapterError::ContractViolation(_))
    ));
}

#[test]
fn concurrent_disposals_are_not_lost() {
    const STREAMS: usize = 16;

    let dir = TempDir::new().expect("tempdir");
    let mut config = AdapterConfig::default();
    for i in 0..STREAMS {
        let path = write_file(&dir, &format!("shape{}.csv", i), "BLUE,1,1,1\n");
        config.add_stream(StreamSource::new(format!("Shape{}", i), path));
    }

    let listener = Arc::new(CountingListener {
        calls: AtomicUsize::new(0),
    });
    let handle: Arc<dyn DiscoveryListener> = listener.clone();
    let reader = Arc::new(
        FileDiscoveryStreamReader::new(&config, Some(Arc::downgrade(&handle))).expect("reader"),
    );

    let announced = reader.take();
    assert_eq!(announced.len(), STREAMS);
    reader.return_loan(announced).expect("return");

    let barrier = Arc::new(Barrier::new(STREAMS));
    let threads: Vec<_> = (0..STREAMS)
        .map(|i| {
            let reader = Arc::clone(&reader);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let info = StreamInfo::new(format!("Shape{}", i), TypeInfo::new("ShapeType"));
                reader.dispose(&info).expect("dispose");
            })
        })
        .collect();
    for t in threads {
        t.join().expect("join");
    }

    let disposed = reader.take();
    assert_eq!(disposed.len(), STREAMS);
    assert!(disposed.iter().all(|l| l.disposed));

    let mut names: Vec<_> = disposed.iter().map(|l| l.stream_name.clone()).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), STREAMS);
    assert_eq!(listener.calls.load(Ordering::SeqCst), STREAMS);

    reader.return_loan(disposed).expect("return");
    assert_eq!(reader.loaned_count(), 0);
}

#[test]
fn poller_and_file_readers_run_in_parallel() {
    let dir = TempDir::new().expect("tempdir");
    let mut config = AdapterConfig::default();
    for name in ["Square", "Circle", "Triangle"] {
        let content: String = (0..50).map(|i| format!("RED,{},{},30\n", i, i)).collect();
        let path = write_file(&dir, &format!("{}.csv", name.to_lowercase()), &content);
        config.add_stream(StreamSource::new(name, path));
    }
    let reader = Arc::new(FileDiscoveryStreamReader::new(&config, None).expect("reader"));

    let announced = reader.take();
    let workers: Vec<_> = announced
        .iter()
        .map(|loan| {
            let info = loan.info().clone();
            let path = reader
                .source(&info.stream_name)
                .expect("source")
                .file_path
                .clone();
            let discovery = Arc::clone(&reader);
            thread::spawn(move || {
                let mut file = FileStreamReader::open(info, path, discovery).expect("open");
                let mut total = 0;
                while !file.is_finished() {
                    total += file.take(7).expect("take").len();
                }
                total
            })
        })
        .collect();
    reader.return_loan(announced).expect("return");

    // Poll while the data-path threads run
    let mut disposed = Vec::new();
    while disposed.len() < 3 {
        let loans = reader.take();
        disposed.extend(
            loans
                .iter()
                .filter(|l| l.disposed)
                .map(|l| l.stream_name.clone()),
        );
        reader.return_loan(loans).expect("return");
        thread::yield_now();
    }

    for worker in workers {
        assert_eq!(worker.join().expect("join"), 50);
    }
    disposed.sort();
    assert_eq!(disposed, vec!["Circle", "Square", "Triangle"]);
}

#[test]
fn bundled_config_parses() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/adapter.toml");
    let config = AdapterConfig::from_file(path).expect("bundled config");

    assert_eq!(config.adapter.name, "shapes-file-adapter");
    let names: Vec<_> = config
        .streams
        .iter()
        .map(|s| s.stream_name.as_str())
        .collect();
    assert_eq!(names, vec!["Square", "Circle", "Triangle"]);
}
