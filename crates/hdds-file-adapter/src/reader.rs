// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-stream file reader.
//!
//! Reads shape samples from a CSV file, one `color,x,y,shapesize` record per
//! line. When the file is exhausted the reader disposes its stream through the
//! discovery reader, which lets the engine tear the route down.

use crate::discovery::{AdapterError, FileDiscoveryStreamReader};
use crate::stream_info::StreamInfo;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// File reader errors.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),
}

/// Malformed CSV record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected 4 fields, found {0}")]
    FieldCount(usize),

    #[error("invalid integer in field '{field}': {value}")]
    InvalidInteger { field: &'static str, value: String },

    #[error("empty color")]
    EmptyColor,
}

/// One shape sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShapeSample {
    pub color: String,
    pub x: i32,
    pub y: i32,
    pub shapesize: i32,
}

impl FromStr for ShapeSample {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 4 {
            return Err(ParseError::FieldCount(fields.len()));
        }

        let color = fields[0];
        if color.is_empty() {
            return Err(ParseError::EmptyColor);
        }

        let int = |field: &'static str, value: &str| {
            value.parse::<i32>().map_err(|_| ParseError::InvalidInteger {
                field,
                value: value.to_string(),
            })
        };

        Ok(Self {
            color: color.to_string(),
            x: int("x", fields[1])?,
            y: int("y", fields[2])?,
            shapesize: int("shapesize", fields[3])?,
        })
    }
}

/// Reads samples of one stream from its backing file.
pub struct FileStreamReader {
    info: StreamInfo,
    path: PathBuf,
    lines: std::io::Lines<BufReader<File>>,
    discovery: Arc<FileDiscoveryStreamReader>,
    line_number: u64,
    malformed: u64,
    finished: bool,
}

impl FileStreamReader {
    /// Open the backing file of `info`.
    pub fn open<P: AsRef<Path>>(
        info: StreamInfo,
        path: P,
        discovery: Arc<FileDiscoveryStreamReader>,
    ) -> Result<Self, ReaderError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| ReaderError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::debug!("Opened {} for stream {}", path.display(), info.stream_name);

        Ok(Self {
            info,
            path,
            lines: BufReader::new(file).lines(),
            discovery,
            line_number: 0,
            malformed: 0,
            finished: false,
        })
    }

    /// Read up to `max` samples.
    ///
    /// On end of file the stream is disposed once; later calls return an
    /// empty batch.
    pub fn take(&mut self, max: usize) -> Result<Vec<ShapeSample>, ReaderError> {
        let mut samples = Vec::new();

        while !self.finished && samples.len() < max {
            let line = match self.lines.next() {
                Some(line) => line.map_err(|source| ReaderError::Io {
                    path: self.path.clone(),
                    source,
                })?,
                None => {
                    self.finish()?;
                    break;
                }
            };
            self.line_number += 1;

            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match line.parse::<ShapeSample>() {
                Ok(sample) => samples.push(sample),
                Err(err) => {
                    self.malformed += 1;
                    tracing::warn!(
                        "{}:{}: skipping malformed record: {}",
                        self.path.display(),
                        self.line_number,
                        err
                    );
                }
            }
        }

        Ok(samples)
    }

    fn finish(&mut self) -> Result<(), ReaderError> {
        self.finished = true;
        tracing::info!(
            "Reached end of {} for stream {}",
            self.path.display(),
            self.info.stream_name
        );
        self.discovery.dispose(&self.info)?;
        Ok(())
    }

    /// True once the file is exhausted and the stream disposed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Records skipped because they could not be parsed.
    pub fn malformed_lines(&self) -> u64 {
        self.malformed
    }

    pub fn stream_info(&self) -> &StreamInfo {
        &self.info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AdapterConfig, StreamSource};
    use crate::discovery::DiscoveryStreamReader;
    use crate::stream_info::StreamState;
    use tempfile::TempDir;

    fn setup(content: &str) -> (TempDir, Arc<FileDiscoveryStreamReader>, StreamInfo, PathBuf) {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("square.csv");
        std::fs::write(&path, content).expect("write fixture");

        let mut config = AdapterConfig::default();
        config.add_stream(StreamSource::new("Square", &path));
        let discovery = Arc::new(FileDiscoveryStreamReader::new(&config, None).expect("reader"));

        let loans = discovery.take();
        let info = loans[0].info().clone();
        discovery.return_loan(loans).expect("return");
        (dir, discovery, info, path)
    }

    #[test]
    fn test_parse_sample() {
        let sample: ShapeSample = "BLUE, 10, 20, 30".parse().expect("parse");
        assert_eq!(
            sample,
            ShapeSample {
                color: "BLUE".into(),
                x: 10,
                y: 20,
                shapesize: 30
            }
        );

        assert_eq!(
            "BLUE,1,2".parse::<ShapeSample>(),
            Err(ParseError::FieldCount(3))
        );
        assert_eq!(",1,2,3".parse::<ShapeSample>(), Err(ParseError::EmptyColor));
        assert!(matches!(
            "RED,1,two,3".parse::<ShapeSample>(),
            Err(ParseError::InvalidInteger { field: "y", .. })
        ));
    }

    #[test]
    fn test_reads_in_batches_then_disposes() {
        let (_dir, discovery, info, path) =
            setup("BLUE,1,1,30\nRED,2,2,30\n\n# comment\nGREEN,3,3,30\n");
        let mut reader = FileStreamReader::open(info, &path, discovery.clone()).expect("open");

        let first = reader.take(2).expect("take");
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].color, "BLUE");
        assert!(!reader.is_finished());

        let second = reader.take(2).expect("take");
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].color, "GREEN");
        assert!(reader.is_finished());
        assert_eq!(discovery.stream_state("Square"), Some(StreamState::Disposed));

        let loans = discovery.take();
        assert_eq!(loans.len(), 1);
        assert!(loans[0].disposed);
        discovery.return_loan(loans).expect("return");

        // Nothing more, and no second disposal
        assert!(reader.take(10).expect("take").is_empty());
        assert!(discovery.take().is_empty());
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let (_dir, discovery, info, path) = setup("BLUE,1,1,30\nnot a record\nRED,x,2,30\n");
        let mut reader = FileStreamReader::open(info, &path, discovery).expect("open");

        let samples = reader.take(10).expect("take");
        assert_eq!(samples.len(), 1);
        assert_eq!(reader.malformed_lines(), 2);
        assert!(reader.is_finished());
    }

    #[test]
    fn test_open_missing_file() {
        let (dir, discovery, info, _path) = setup("");
        let missing = dir.path().join("missing.csv");
        assert!(matches!(
            FileStreamReader::open(info, missing, discovery),
            Err(ReaderError::Io { .. })
        ));
    }
}
