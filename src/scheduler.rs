// Copyright © 2024 SiteWizard. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Scheduler Module
//!
//! Delayed and periodic callbacks as tokio tasks. Each scheduled task hands
//! back a [`TaskHandle`] that can cancel it; dropping the handle leaves the
//! task running.
//!
//! All timing goes through `tokio::time`, so a runtime with a paused clock
//! drives these tasks deterministically.

use std::future::Future;
use std::time::Duration;

use log::debug;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Cancellation handle of a scheduled task.
#[derive(Debug)]
pub struct TaskHandle {
    name: &'static str,
    join: JoinHandle<()>,
}

impl TaskHandle {
    /// Stops the task. A task that already ran is unaffected.
    pub fn cancel(&self) {
        debug!("cancelling scheduled task `{}`", self.name);
        self.join.abort();
    }

    /// `true` once the task completed or was cancelled.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Name given when the task was scheduled.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Waits until the task has run or was cancelled.
    pub async fn finished(self) {
        if let Err(err) = self.join.await {
            debug!("scheduled task `{}` ended early: {}", self.name, err);
        }
    }
}

/// Runs `task` once, `delay` from now.
///
/// Must be called from within a tokio runtime.
pub fn schedule_after<F>(name: &'static str, delay: Duration, task: F) -> TaskHandle
where
    F: Future<Output = ()> + Send + 'static,
{
    debug!("scheduling `{}` in {:?}", name, delay);
    let join = tokio::spawn(async move {
        time::sleep(delay).await;
        task.await;
    });
    TaskHandle { name, join }
}

/// Runs `tick` every `period`, the first run one full period from now.
///
/// A tick that overruns delays the following ones instead of bursting.
/// Must be called from within a tokio runtime.
pub fn schedule_every<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> TaskHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    debug!("scheduling `{}` every {:?}", name, period);
    let join = tokio::spawn(async move {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            _ = interval.tick().await;
            tick().await;
        }
    });
    TaskHandle { name, join }
}
