//! Hooks for reacting to engine activity
//!
//! Hooks run after the engine has released its lock, so they may call back
//! into the engine. A failing hook is logged and skipped; it never affects
//! the operation that triggered it or the hooks after it.
//!
//! # Example
//!
//! ```rust,ignore
//! use lethe_core::events::{HookRegistry, LoggingHook};
//!
//! let mut registry = HookRegistry::new();
//! registry.register(Arc::new(LoggingHook));
//!
//! registry.trigger_eviction(&result).await;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::Result;
use crate::eviction::EvictionResult;
use crate::pressure::MemoryPressureEvent;

/// Result type for hooks
pub type HookResult = Result<()>;

/// Trait for engine activity hooks
#[async_trait]
pub trait EvictionHook: Send + Sync {
    /// Called for every pressure sample taken by the monitor
    async fn on_pressure(&self, _event: &MemoryPressureEvent) -> HookResult {
        Ok(())
    }

    /// Called after an eviction cycle that applied a policy
    async fn on_eviction(&self, _result: &EvictionResult) -> HookResult {
        Ok(())
    }

    /// Called when a recovery point is created
    async fn on_checkpoint(&self, _recovery_point_id: &str, _context_id: &str) -> HookResult {
        Ok(())
    }

    /// Called after an entry is restored from a recovery point
    async fn on_restored(&self, _recovery_point_id: &str, _context_id: &str) -> HookResult {
        Ok(())
    }
}

/// Registry for managing hooks
#[derive(Default)]
pub struct HookRegistry {
    hooks: Vec<Arc<dyn EvictionHook>>,
}

impl HookRegistry {
    /// Create a new hook registry
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Register a hook
    pub fn register(&mut self, hook: Arc<dyn EvictionHook>) {
        self.hooks.push(hook);
    }

    /// Number of registered hooks
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Whether no hooks are registered
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Trigger pressure sample event
    pub async fn trigger_pressure(&self, event: &MemoryPressureEvent) {
        for hook in &self.hooks {
            if let Err(e) = hook.on_pressure(event).await {
                warn!(error = %e, "Pressure hook failed");
            }
        }
    }

    /// Trigger eviction cycle event
    pub async fn trigger_eviction(&self, result: &EvictionResult) {
        for hook in &self.hooks {
            if let Err(e) = hook.on_eviction(result).await {
                warn!(error = %e, "Eviction hook failed");
            }
        }
    }

    /// Trigger recovery point created event
    pub async fn trigger_checkpoint(&self, recovery_point_id: &str, context_id: &str) {
        for hook in &self.hooks {
            if let Err(e) = hook.on_checkpoint(recovery_point_id, context_id).await {
                warn!(error = %e, "Checkpoint hook failed");
            }
        }
    }

    /// Trigger restore event
    pub async fn trigger_restored(&self, recovery_point_id: &str, context_id: &str) {
        for hook in &self.hooks {
            if let Err(e) = hook.on_restored(recovery_point_id, context_id).await {
                warn!(error = %e, "Restore hook failed");
            }
        }
    }
}

/// Hook that logs engine activity through `tracing`
pub struct LoggingHook;

#[async_trait]
impl EvictionHook for LoggingHook {
    async fn on_pressure(&self, event: &MemoryPressureEvent) -> HookResult {
        info!(
            level = ?event.pressure_level,
            usage = event.current_usage,
            predicted = event.predicted_usage,
            "Memory pressure sampled"
        );
        Ok(())
    }

    async fn on_eviction(&self, result: &EvictionResult) -> HookResult {
        info!(
            evicted = ?result.evicted,
            compressed = ?result.compressed,
            memory_freed = result.memory_freed,
            "Contexts evicted"
        );
        Ok(())
    }

    async fn on_checkpoint(&self, recovery_point_id: &str, context_id: &str) -> HookResult {
        info!(recovery_point_id, context_id, "Recovery point created");
        Ok(())
    }

    async fn on_restored(&self, recovery_point_id: &str, context_id: &str) -> HookResult {
        info!(recovery_point_id, context_id, "Context restored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LetheError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHook {
        evictions: AtomicUsize,
    }

    #[async_trait]
    impl EvictionHook for CountingHook {
        async fn on_eviction(&self, _result: &EvictionResult) -> HookResult {
            self.evictions.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingHook;

    #[async_trait]
    impl EvictionHook for FailingHook {
        async fn on_eviction(&self, _result: &EvictionResult) -> HookResult {
            Err(LetheError::Other("hook exploded".into()))
        }
    }

    #[tokio::test]
    async fn test_failing_hook_does_not_stop_others() {
        let counter = Arc::new(CountingHook {
            evictions: AtomicUsize::new(0),
        });

        let mut registry = HookRegistry::new();
        registry.register(Arc::new(FailingHook));
        registry.register(counter.clone());
        registry.register(Arc::new(LoggingHook));
        assert_eq!(registry.len(), 3);

        registry.trigger_eviction(&EvictionResult::empty(0)).await;
        registry.trigger_eviction(&EvictionResult::empty(1)).await;

        assert_eq!(counter.evictions.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_default_methods_are_no_ops() {
        let mut registry = HookRegistry::new();
        registry.register(Arc::new(FailingHook));

        registry
            .trigger_pressure(&MemoryPressureEvent::new(0, 0.2, 0.0))
            .await;
        registry.trigger_checkpoint("a-1", "a").await;
        registry.trigger_restored("a-1", "a").await;
    }
}
