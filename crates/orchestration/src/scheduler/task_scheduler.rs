use std::collections::HashMap;
use std::future::Future;

use anyhow::{bail, Result};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

pub const MIN_TASK_INTERVAL: Duration = Duration::from_millis(100);

/// Owns the periodic cycles and their cancellation.
///
/// Each task runs its body inline in its own loop, so one task never overlaps
/// itself; ticks missed while a body is still running are skipped. Shutdown
/// lets an in-flight body finish, then ends every loop.
pub struct TaskScheduler {
    periodic_tasks: HashMap<String, JoinHandle<()>>,
    shutdown_sender: broadcast::Sender<()>,
}

impl TaskScheduler {
    pub fn new() -> Self {
        let (shutdown_sender, _) = broadcast::channel(16);
        Self {
            periodic_tasks: HashMap::new(),
            shutdown_sender,
        }
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskScheduler {
    /// Runs `task_fn` every `every`, first after `first_delay`
    pub fn add_periodic_task<F, Fut>(
        &mut self,
        name: impl Into<String>,
        every: Duration,
        first_delay: Duration,
        task_fn: F,
    ) -> Result<()>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        if every < MIN_TASK_INTERVAL {
            bail!(
                "task {} interval {:?} below minimum {:?}",
                name,
                every,
                MIN_TASK_INTERVAL
            );
        }
        if self.periodic_tasks.contains_key(&name) {
            bail!("task {} already scheduled", name);
        }

        let mut interval_timer = interval_at(Instant::now() + first_delay, every);
        interval_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut shutdown_receiver = self.shutdown_sender.subscribe();
        let task_name = name.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_receiver.recv() => {
                        debug!("periodic task {} is shutting down", task_name);
                        break;
                    }
                    _ = interval_timer.tick() => {
                        task_fn().await;
                    }
                }
            }
        });
        info!("scheduled {} every {:?}", name, every);
        self.periodic_tasks.insert(name, handle);
        Ok(())
    }

    pub fn task_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.periodic_tasks.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn task_count(&self) -> usize {
        self.periodic_tasks.len()
    }

    /// Signals every task and waits for it to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown_sender.send(());

        for (name, handle) in self.periodic_tasks {
            if let Err(e) = handle.await {
                warn!("periodic task {} ended abnormally: {}", name, e);
            }
        }
    }
}
