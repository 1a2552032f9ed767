// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trailing-edge throttle and debounce for high-frequency inputs.
//!
//! Both run a small task that owns the timer and forwards the latest value
//! to a callback. Dropping the handle flushes nothing: pending values are
//! discarded.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

/// Emits at most once per interval, always with the latest value.
///
/// The first call opens a window; calls inside it replace the pending value;
/// the pending value is emitted when the window closes.
pub struct Throttle<T> {
    tx: mpsc::UnboundedSender<T>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Throttle<T> {
    pub fn new<F>(interval: Duration, mut emit: F) -> Self
    where
        F: FnMut(T) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<T>();

        let task = tokio::spawn(async move {
            while let Some(first) = rx.recv().await {
                let mut latest = first;
                let deadline = Instant::now() + interval;
                let mut closed = false;

                loop {
                    tokio::select! {
                        biased;
                        _ = sleep_until(deadline) => break,
                        next = rx.recv() => match next {
                            Some(value) => latest = value,
                            None => {
                                closed = true;
                                break;
                            }
                        },
                    }
                }

                if closed {
                    break;
                }
                emit(latest);
            }
        });

        Self { tx, task }
    }

    /// Schedule `value`; it replaces anything still pending in this window.
    pub fn call(&self, value: T) {
        if self.tx.send(value).is_err() {
            tracing::debug!("Throttle task stopped, dropping value");
        }
    }
}

impl<T> Drop for Throttle<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Emits the latest value once no new value has arrived for `delay`.
pub struct Debouncer<T> {
    tx: mpsc::UnboundedSender<T>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new<F>(delay: Duration, mut emit: F) -> Self
    where
        F: FnMut(T) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<T>();

        let task = tokio::spawn(async move {
            while let Some(first) = rx.recv().await {
                let mut latest = first;
                let mut deadline = Instant::now() + delay;
                let mut closed = false;

                loop {
                    tokio::select! {
                        biased;
                        _ = sleep_until(deadline) => break,
                        next = rx.recv() => match next {
                            Some(value) => {
                                latest = value;
                                deadline = Instant::now() + delay;
                            }
                            None => {
                                closed = true;
                                break;
                            }
                        },
                    }
                }

                if closed {
                    break;
                }
                emit(latest);
            }
        });

        Self { tx, task }
    }

    /// Restart the quiet period with `value` as the pending value.
    pub fn call(&self, value: T) {
        if self.tx.send(value).is_err() {
            tracing::debug!("Debounce task stopped, dropping value");
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
