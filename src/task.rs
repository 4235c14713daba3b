//! Cooperative progress reporting and cancellation.
//!
//! Readers never spawn threads. Long loops are cut into chunks with
//! [`chunked_subtask`]; between chunks the [`RuntimeContext`] reports progress
//! and checks whether the host asked to cancel. A chunk that has started always
//! runs to completion, so cancellation is coarse-grained.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;

use crate::result::ReaderError;

/// Default minimum time between two progress reports
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(250);

/// A cloneable cancellation flag shared between the host and a running parse
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Safe to call from any thread.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// A progress snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// What is being done
    pub message: String,
    /// Work done so far (usually a byte offset into the input)
    pub current: usize,
    /// Total amount of work
    pub max: usize,
}

impl Progress {
    /// Create a progress snapshot
    pub fn new(message: impl Into<String>, current: usize, max: usize) -> Self {
        Self {
            message: message.into(),
            current,
            max,
        }
    }

    /// The standard "Parsing..." snapshot used by the readers
    pub fn parsing(current: usize, max: usize) -> Self {
        Self::new("Parsing...", current, max)
    }
}

/// Callback receiving progress snapshots
pub type ProgressObserver = Box<dyn FnMut(&Progress) + Send>;

/// Host-side context of a parse: progress sink, cancellation flag and throttle
pub struct RuntimeContext {
    cancellation: Option<CancellationToken>,
    observer: Option<ProgressObserver>,
    update_interval: Duration,
    last_update: Option<Instant>,
    updates: usize,
}

impl Default for RuntimeContext {
    fn default() -> Self {
        Self {
            cancellation: None,
            observer: None,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            last_update: None,
            updates: 0,
        }
    }
}

impl std::fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeContext")
            .field("cancellation", &self.cancellation)
            .field("has_observer", &self.observer.is_some())
            .field("update_interval", &self.update_interval)
            .field("updates", &self.updates)
            .finish()
    }
}

impl RuntimeContext {
    /// A synchronous context with no observer and no cancellation
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe the given cancellation token between chunks
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Forward progress snapshots to a callback
    pub fn with_observer(mut self, observer: impl FnMut(&Progress) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Set the minimum time between two progress reports
    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    /// Whether enough time has passed since the last report
    pub fn should_update(&self) -> bool {
        match self.last_update {
            None => true,
            Some(last) => last.elapsed() >= self.update_interval,
        }
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .map(CancellationToken::is_cancelled)
            .unwrap_or(false)
    }

    /// Number of progress reports delivered so far
    pub fn update_count(&self) -> usize {
        self.updates
    }

    /// Report progress and check for cancellation.
    ///
    /// Returns [`ReaderError::Cancelled`] when the host requested cancellation.
    pub fn update(&mut self, progress: Progress) -> Result<(), ReaderError> {
        if self.is_cancelled() {
            debug!("Cancellation observed at {}/{}", progress.current, progress.max);
            return Err(ReaderError::Cancelled);
        }

        if !self.should_update() {
            return Ok(());
        }

        self.last_update = Some(Instant::now());
        self.updates += 1;
        debug!("{} {}/{}", progress.message, progress.current, progress.max);
        if let Some(observer) = self.observer.as_mut() {
            observer(&progress);
        }
        Ok(())
    }
}

/// Tuning knobs accepted by the chunked readers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseOptions {
    /// Items per chunk; `None` uses the reader's own default
    pub chunk_size: Option<usize>,
}

impl ParseOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of items processed between two progress checkpoints
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size.max(1));
        self
    }

    /// The configured chunk size, or `default`
    pub fn chunk_size_or(&self, default: usize) -> usize {
        self.chunk_size.unwrap_or(default)
    }
}

/// Run `step` repeatedly until it reports zero processed items.
///
/// `step(chunk_size, state)` processes at most `chunk_size` items and returns
/// how many it processed. Between chunks `update(ctx, state)` is called to
/// report progress; an error from it (typically cancellation) aborts the loop.
pub fn chunked_subtask<S>(
    ctx: &mut RuntimeContext,
    chunk_size: usize,
    state: &mut S,
    mut step: impl FnMut(usize, &mut S) -> usize,
    mut update: impl FnMut(&mut RuntimeContext, &S) -> Result<(), ReaderError>,
) -> Result<(), ReaderError> {
    let chunk_size = chunk_size.max(1);
    loop {
        let processed = step(chunk_size, state);
        if processed == 0 {
            return Ok(());
        }
        update(ctx, state)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_chunked_subtask_processes_everything() {
        let mut ctx = RuntimeContext::new();
        let mut remaining = 25usize;
        let mut chunks = 0;
        chunked_subtask(
            &mut ctx,
            10,
            &mut remaining,
            |size, left| {
                let n = size.min(*left);
                *left -= n;
                n
            },
            |_, _| {
                chunks += 1;
                Ok(())
            },
        )
        .unwrap();
        assert_eq!(remaining, 0);
        assert_eq!(chunks, 3);
    }

    #[test]
    fn test_cancellation_between_chunks() {
        let token = CancellationToken::new();
        let mut ctx = RuntimeContext::new()
            .with_cancellation(token.clone())
            .with_update_interval(Duration::ZERO);
        let mut processed = 0usize;
        let result = chunked_subtask(
            &mut ctx,
            5,
            &mut processed,
            |size, done| {
                *done += size;
                // the host cancels while the first chunk is running
                token.cancel();
                size
            },
            |ctx, done| ctx.update(Progress::parsing(*done, 100)),
        );
        assert!(matches!(result, Err(ReaderError::Cancelled)));
        // the running chunk completes before cancellation takes effect
        assert_eq!(processed, 5);
    }

    #[test]
    fn test_observer_receives_progress() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut ctx = RuntimeContext::new()
            .with_update_interval(Duration::ZERO)
            .with_observer(move |p| sink.lock().unwrap().push(p.current));
        ctx.update(Progress::parsing(10, 100)).unwrap();
        ctx.update(Progress::parsing(20, 100)).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![10, 20]);
        assert_eq!(ctx.update_count(), 2);
    }

    #[test]
    fn test_updates_are_throttled() {
        let mut ctx = RuntimeContext::new().with_update_interval(Duration::from_secs(3600));
        ctx.update(Progress::parsing(1, 2)).unwrap();
        ctx.update(Progress::parsing(2, 2)).unwrap();
        assert_eq!(ctx.update_count(), 1);
    }
}
