use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// Boxed async shutdown callback
pub type ShutdownHook =
    Box<dyn Fn() -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + Sync>;

struct NamedHook {
    name: String,
    hook: ShutdownHook,
}

#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Budget for the whole shutdown sequence
    pub total_timeout: Duration,
    /// Budget for a single hook
    pub hook_timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            total_timeout: Duration::from_secs(30),
            hook_timeout: Duration::from_secs(10),
        }
    }
}

/// Runs registered hooks in order when the process is asked to stop.
///
/// A failing or slow hook is logged and skipped; the remaining hooks still run.
pub struct ShutdownManager {
    is_shutting_down: Arc<AtomicBool>,
    hooks: RwLock<Vec<NamedHook>>,
    config: ShutdownConfig,
}

impl ShutdownManager {
    pub fn new(config: ShutdownConfig) -> Self {
        Self {
            is_shutting_down: Arc::new(AtomicBool::new(false)),
            hooks: RwLock::new(Vec::new()),
            config,
        }
    }

    pub fn new_default() -> Self {
        Self::new(ShutdownConfig::default())
    }

    pub fn is_shutting_down(&self) -> bool {
        self.is_shutting_down.load(Ordering::Acquire)
    }

    /// Shared flag other components can poll
    pub fn shutdown_signal(&self) -> Arc<AtomicBool> {
        self.is_shutting_down.clone()
    }

    pub async fn register_shutdown_hook<F, Fut>(&self, name: impl Into<String>, hook: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let name = name.into();
        let boxed: ShutdownHook = Box::new(move || Box::pin(hook()));
        info!("registered shutdown hook: {}", name);
        self.hooks.write().await.push(NamedHook { name, hook: boxed });
    }

    /// Runs every hook once. A second call is a no-op.
    pub async fn shutdown(&self) -> Result<()> {
        if self
            .is_shutting_down
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("shutdown already in progress");
            return Ok(());
        }

        info!(
            "graceful shutdown started, total timeout {:?}",
            self.config.total_timeout
        );
        let started = Instant::now();

        match tokio::time::timeout(self.config.total_timeout, self.execute_shutdown_hooks()).await
        {
            Ok(failed) => {
                info!(
                    "graceful shutdown finished in {:?} ({} hook(s) failed)",
                    started.elapsed(),
                    failed
                );
                Ok(())
            }
            Err(_) => {
                error!("shutdown timed out after {:?}", self.config.total_timeout);
                Err(anyhow::anyhow!(
                    "shutdown timed out after {:?}",
                    self.config.total_timeout
                ))
            }
        }
    }

    /// Returns the number of hooks that failed or timed out
    async fn execute_shutdown_hooks(&self) -> usize {
        let hooks = self.hooks.read().await;
        let total = hooks.len();
        if total == 0 {
            info!("no shutdown hooks registered");
            return 0;
        }

        let mut failed = 0;
        for (index, named) in hooks.iter().enumerate() {
            let started = Instant::now();
            info!("running shutdown hook {}/{}: {}", index + 1, total, named.name);

            match tokio::time::timeout(self.config.hook_timeout, (named.hook)()).await {
                Ok(Ok(())) => {
                    info!("shutdown hook {} done in {:?}", named.name, started.elapsed());
                }
                Ok(Err(e)) => {
                    failed += 1;
                    error!("shutdown hook {} failed: {}", named.name, e);
                }
                Err(_) => {
                    failed += 1;
                    error!(
                        "shutdown hook {} timed out ({:?})",
                        named.name, self.config.hook_timeout
                    );
                }
            }
        }
        failed
    }

    /// Resolves with the name of the first termination signal received
    pub async fn wait_for_shutdown_signal() -> Result<&'static str> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigterm = signal(SignalKind::terminate())?;
            let mut sigint = signal(SignalKind::interrupt())?;
            let mut sigquit = signal(SignalKind::quit())?;

            let name = tokio::select! {
                _ = sigterm.recv() => "SIGTERM",
                _ = sigint.recv() => "SIGINT",
                _ = sigquit.recv() => "SIGQUIT",
            };
            Ok(name)
        }

        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await?;
            Ok("CTRL+C")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn fast_config() -> ShutdownConfig {
        ShutdownConfig {
            total_timeout: Duration::from_secs(5),
            hook_timeout: Duration::from_millis(200),
        }
    }

    #[tokio::test]
    async fn test_hooks_run_in_order() {
        let manager = ShutdownManager::new(fast_config());
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        for label in ["scheduler", "liquidation"] {
            let order = order.clone();
            manager
                .register_shutdown_hook(label, move || {
                    let order = order.clone();
                    async move {
                        order.lock().unwrap().push(label);
                        Ok(())
                    }
                })
                .await;
        }

        assert!(manager.shutdown().await.is_ok());
        assert!(manager.is_shutting_down());
        assert_eq!(*order.lock().unwrap(), vec!["scheduler", "liquidation"]);
    }

    #[tokio::test]
    async fn test_failing_and_slow_hooks_do_not_block_others() {
        let manager = ShutdownManager::new(fast_config());
        let ran = Arc::new(AtomicUsize::new(0));

        manager
            .register_shutdown_hook("broken", || async { Err(anyhow::anyhow!("boom")) })
            .await;
        manager
            .register_shutdown_hook("slow", || async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Ok(())
            })
            .await;
        let counter = ran.clone();
        manager
            .register_shutdown_hook("last", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;

        assert!(manager.shutdown().await.is_ok());
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_shutdown_is_noop() {
        let manager = ShutdownManager::new(fast_config());
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = ran.clone();
        manager
            .register_shutdown_hook("count", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;

        manager.shutdown().await.unwrap();
        manager.shutdown().await.unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
