//! Progress reporting for generation runs
//!
//! A run knows its step count up front. Each finished unit of work bumps a
//! counter and emits one [`ProgressEvent`] with `round(step / total * 100)`.
//! Events travel over an unbounded channel and can be consumed as a
//! [`Stream`], polled with [`ProgressStream::drain`], or ignored entirely.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;

/// One progress notification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Overall completion, 0-100
    pub percent: u8,
    /// Human-readable description of the unit of work just started
    pub status: String,
}

impl ProgressEvent {
    pub fn new(percent: u8, status: impl Into<String>) -> Self {
        Self {
            percent: percent.min(100),
            status: status.into(),
        }
    }
}

/// Sending half handed to a pipeline run
pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

/// Receiving half, usable as a `Stream` of events
#[derive(Debug)]
pub struct ProgressStream {
    inner: UnboundedReceiverStream<ProgressEvent>,
}

impl ProgressStream {
    /// Wait for the next event; `None` once every sender is gone
    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        self.inner.next().await
    }

    /// Everything already delivered, without waiting
    pub fn drain(&mut self) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.inner.as_mut().try_recv() {
            events.push(event);
        }
        events
    }
}

impl Stream for ProgressStream {
    type Item = ProgressEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Create a connected sender/stream pair
pub fn progress_channel() -> (ProgressSender, ProgressStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        tx,
        ProgressStream {
            inner: UnboundedReceiverStream::new(rx),
        },
    )
}

/// `round(step / total * 100)`, capped at 100
pub fn percent_for(step: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = (step as f64 / total as f64 * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}

/// Step counter scoped to one run
#[derive(Debug)]
pub struct ProgressReporter {
    sender: Option<ProgressSender>,
    current: usize,
    total: usize,
}

impl ProgressReporter {
    pub fn new(total: usize, sender: Option<ProgressSender>) -> Self {
        Self {
            sender,
            current: 0,
            total,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Count one step and announce it
    pub fn report(&mut self, status: impl Into<String>) -> ProgressEvent {
        self.current += 1;
        let event = ProgressEvent::new(percent_for(self.current, self.total), status);
        self.emit(event.clone());
        event
    }

    /// Announce that the run ended with an error. Always reports 100%.
    pub fn fail(&self, status: impl Into<String>) -> ProgressEvent {
        let event = ProgressEvent::new(100, status);
        self.emit(event.clone());
        event
    }

    fn emit(&self, event: ProgressEvent) {
        log::info!("[{:>3}%] {}", event.percent, event.status);
        if let Some(tx) = &self.sender {
            if tx.send(event).is_err() {
                log::debug!("Progress receiver dropped, event discarded");
            }
        }
    }
}
