//! Progress reporting and cancellation checks for copy operations.

use serde::Serialize;
use std::{
    io::Read,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use tracing::debug;

use crate::tasks::CancelToken;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct CopyProgressPayload {
    pub bytes: u64,
    pub total: u64,
    pub finished: bool,
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, payload: CopyProgressPayload);
}

/// Sink that forwards every payload to the log.
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn emit(&self, payload: CopyProgressPayload) {
        debug!(
            bytes = payload.bytes,
            total = payload.total,
            finished = payload.finished,
            "copy progress"
        );
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ProgressThrottle {
    pub step_bytes: u64,
    pub interval: Duration,
}

impl Default for ProgressThrottle {
    fn default() -> Self {
        Self {
            step_bytes: 64 * 1024,
            interval: Duration::from_millis(200),
        }
    }
}

struct Counters {
    done: u64,
    total: u64,
    last_emit: u64,
    last_time: Instant,
}

/// Handed through a paste run: carries the cancel token and, optionally,
/// somewhere to send byte progress.
#[derive(Clone)]
pub struct ProgressMonitor {
    cancel: Option<CancelToken>,
    sink: Option<Arc<dyn ProgressSink>>,
    throttle: ProgressThrottle,
    counters: Arc<Mutex<Counters>>,
}

impl Default for ProgressMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressMonitor {
    pub fn new() -> Self {
        Self {
            cancel: None,
            sink: None,
            throttle: ProgressThrottle::default(),
            counters: Arc::new(Mutex::new(Counters {
                done: 0,
                total: 0,
                last_emit: 0,
                last_time: Instant::now(),
            })),
        }
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_throttle(mut self, throttle: ProgressThrottle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(CancelToken::is_cancelled)
            .unwrap_or(false)
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    pub fn begin(&self, total: u64) {
        if let Ok(mut c) = self.counters.lock() {
            c.total = total;
            c.done = 0;
            c.last_emit = 0;
            c.last_time = Instant::now();
        }
        self.emit(CopyProgressPayload {
            bytes: 0,
            total,
            finished: false,
        });
    }

    pub fn worked(&self, bytes: u64) {
        let payload = {
            let Ok(mut c) = self.counters.lock() else {
                return;
            };
            c.done = c.done.saturating_add(bytes);
            let due = c.done.saturating_sub(c.last_emit) >= self.throttle.step_bytes
                || c.last_time.elapsed() >= self.throttle.interval;
            if !due {
                return;
            }
            c.last_emit = c.done;
            c.last_time = Instant::now();
            CopyProgressPayload {
                bytes: c.done,
                total: c.total.max(c.done),
                finished: false,
            }
        };
        self.emit(payload);
    }

    pub fn done(&self) {
        let payload = match self.counters.lock() {
            Ok(c) => CopyProgressPayload {
                bytes: c.done,
                total: c.total.max(c.done),
                finished: true,
            },
            Err(_) => return,
        };
        self.emit(payload);
    }

    fn emit(&self, payload: CopyProgressPayload) {
        if let Some(sink) = &self.sink {
            sink.emit(payload);
        }
    }
}

/// Counts bytes flowing through `inner` into the monitor.
pub struct ProgressReader<'a, R: ?Sized> {
    inner: &'a mut R,
    monitor: &'a ProgressMonitor,
}

impl<'a, R: Read + ?Sized> ProgressReader<'a, R> {
    pub fn new(inner: &'a mut R, monitor: &'a ProgressMonitor) -> Self {
        Self { inner, monitor }
    }
}

impl<R: Read + ?Sized> Read for ProgressReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.monitor.worked(n as u64);
        }
        Ok(n)
    }
}
