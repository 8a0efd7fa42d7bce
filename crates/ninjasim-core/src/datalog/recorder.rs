//! Telemetry recorder
//!
//! Keeps the most recent frames in a bounded buffer.

use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::time::Duration;

use super::{format, LogEntry};
use crate::simulation::Telemetry;

/// Bounded telemetry recorder
#[derive(Debug, Clone)]
pub struct TelemetryLogger {
    buffer: VecDeque<LogEntry>,
    capacity: usize,
    /// Timestamp of the first frame since `start`
    start_nanos: Option<i64>,
    is_recording: bool,
}

impl TelemetryLogger {
    /// Create a logger keeping at most `capacity` frames
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: VecDeque::with_capacity(capacity.min(10_000)),
            capacity,
            start_nanos: None,
            is_recording: false,
        }
    }

    /// Start a new recording, discarding previous frames
    pub fn start(&mut self) {
        self.buffer.clear();
        self.start_nanos = None;
        self.is_recording = true;
    }

    /// Stop recording; frames are kept
    pub fn stop(&mut self) {
        self.is_recording = false;
    }

    /// Whether frames are being captured
    pub fn is_recording(&self) -> bool {
        self.is_recording
    }

    /// Record a frame; the oldest frame is dropped when full
    pub fn record(&mut self, telemetry: &Telemetry) {
        if !self.is_recording {
            return;
        }

        let start = *self.start_nanos.get_or_insert(telemetry.timestamp_nanos);
        let elapsed = telemetry.timestamp_nanos.saturating_sub(start).max(0);
        let entry = LogEntry::new(Duration::from_nanos(elapsed as u64), telemetry.clone());

        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(entry);
    }

    /// Maximum entries kept
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries currently buffered
    pub fn entry_count(&self) -> usize {
        self.buffer.len()
    }

    /// Buffered entries, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.buffer.iter()
    }

    /// Time between the first and last retained frames
    pub fn duration(&self) -> Duration {
        match (self.buffer.front(), self.buffer.back()) {
            (Some(first), Some(last)) => last.timestamp.saturating_sub(first.timestamp),
            _ => Duration::ZERO,
        }
    }

    /// Clear all recorded data
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.start_nanos = None;
    }

    /// Export the retained frames as CSV
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        format::write_csv(path, self.buffer.iter())?;
        tracing::info!(frames = self.buffer.len(), "telemetry exported");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn frame(nanos: i64, rpm: f64) -> Telemetry {
        Telemetry {
            rpm,
            timestamp_nanos: nanos,
            ..Telemetry::default()
        }
    }

    #[test]
    fn test_logger_basic() {
        let mut logger = TelemetryLogger::new(100);
        assert!(!logger.is_recording());

        logger.record(&frame(0, 900.0));
        assert_eq!(logger.entry_count(), 0);

        logger.start();
        logger.record(&frame(1_000_000_000, 900.0));
        logger.record(&frame(1_050_000_000, 950.0));
        assert_eq!(logger.entry_count(), 2);
        assert_eq!(logger.duration(), Duration::from_millis(50));

        logger.stop();
        logger.record(&frame(1_100_000_000, 1000.0));
        assert_eq!(logger.entry_count(), 2);
    }

    #[test]
    fn test_buffer_drops_oldest() {
        let mut logger = TelemetryLogger::new(3);
        logger.start();
        for i in 0..5 {
            logger.record(&frame(i * 1_000, 1000.0 + i as f64));
        }
        let rpms: Vec<f64> = logger.entries().map(|e| e.telemetry.rpm).collect();
        assert_eq!(rpms, vec![1002.0, 1003.0, 1004.0]);

        logger.clear();
        assert_eq!(logger.entry_count(), 0);
        assert_eq!(logger.duration(), Duration::ZERO);
    }

    #[test]
    fn test_write_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.csv");

        let mut logger = TelemetryLogger::new(10);
        logger.start();
        logger.record(&frame(0, 900.0));
        logger.record(&frame(500_000_000, 1200.0));
        logger.write_csv(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Time,RPM,Throttle"));
        assert_eq!(lines[0].split(',').count(), 13);
        assert!(lines[2].starts_with("0.500,1200.0000"));
    }
}
