//! Context eviction engine
//!
//! [`ContextEvictionEngine`] is the caller-facing surface. It owns the store,
//! the eviction coordinator, the recovery point manager and the pressure
//! monitor behind one async lock, so store mutations and eviction cycles
//! never interleave.
//!
//! The pressure monitor is driven either by [`ContextEvictionEngine::start`],
//! which spawns a timer task, or by calling [`ContextEvictionEngine::tick`]
//! directly. Ticks never overlap: a tick requested while another is running
//! is skipped.
//!
//! # Example
//!
//! ```rust,no_run
//! use lethe_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let engine = ContextEvictionEngine::builder(LetheConfig::default())
//!         .capacity(FixedCapacity(64 * 1024 * 1024))
//!         .hook(std::sync::Arc::new(LoggingHook))
//!         .build()?;
//!
//!     engine
//!         .add_context(ContextEntry::new("turn-1", "hello", 5).with_importance(0.9))
//!         .await;
//!
//!     engine.start().await?;
//!     // ...
//!     engine.stop().await;
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::compression::CompressionResult;
use crate::config::LetheConfig;
use crate::context::{ContextEntry, ContextStore};
use crate::error::{LetheError, Result};
use crate::events::{EvictionHook, HookRegistry};
use crate::eviction::{EvictionCoordinator, EvictionResult};
use crate::pressure::{
    usage_fraction, CapacityProvider, FixedCapacity, MemoryPressureEvent, PressureLevel,
    PressureMonitor,
};
use crate::recovery::{RecoveryPoint, RecoveryPointManager, RecoveryReason};

/// Engine statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Live entries
    pub total_contexts: usize,

    /// Sum of live entry sizes (bytes)
    pub total_size: u64,

    /// Entries evicted over the engine's lifetime
    pub eviction_count: u64,

    /// Entries compressed over the engine's lifetime
    pub compression_count: u64,

    /// Stored recovery points
    pub recovery_point_count: usize,

    /// Current usage fraction
    pub current_usage: f64,

    /// Classification of `current_usage`
    pub pressure_level: PressureLevel,
}

/// What a single monitor tick did
#[derive(Debug, Clone)]
pub struct TickOutcome {
    /// The pressure sample taken
    pub event: MemoryPressureEvent,

    /// Eviction cycle result, if pressure was above low
    pub eviction: Option<EvictionResult>,

    /// Recovery points created automatically
    pub checkpoints: Vec<String>,
}

/// State guarded by the engine lock
struct EngineState {
    store: ContextStore,
    coordinator: EvictionCoordinator,
    recovery: RecoveryPointManager,
    monitor: PressureMonitor,
}

impl EngineState {
    fn usage(&self, capacity: &dyn CapacityProvider) -> f64 {
        usage_fraction(self.store.total_size(), capacity.capacity_bytes())
    }
}

struct MonitorTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct EngineInner {
    config: LetheConfig,
    state: Mutex<EngineState>,
    clock: Arc<dyn Clock>,
    capacity: Arc<dyn CapacityProvider>,
    hooks: HookRegistry,
    /// Held for the duration of a tick
    tick_lock: Mutex<()>,
    monitor_task: Mutex<Option<MonitorTask>>,
}

impl EngineInner {
    async fn tick(&self) -> Option<TickOutcome> {
        let Ok(_guard) = self.tick_lock.try_lock() else {
            debug!("Previous monitor tick still running, skipping");
            return None;
        };

        let now = self.clock.now_millis();
        let (event, eviction, checkpoints) = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;

            let usage = state.usage(self.capacity.as_ref());
            let event = state.monitor.sample(usage, now);

            let checkpoints: Vec<(String, String)> = state
                .recovery
                .auto_checkpoint(&state.store, now)
                .into_iter()
                .filter_map(|point_id| {
                    let context_id = state.recovery.get(&point_id)?.metadata.context_id.clone();
                    Some((point_id, context_id))
                })
                .collect();

            let eviction = event
                .pressure_level
                .requires_eviction()
                .then(|| state.coordinator.handle(&event, &mut state.store, now));

            (event, eviction, checkpoints)
        };

        self.hooks.trigger_pressure(&event).await;
        for (point_id, context_id) in &checkpoints {
            self.hooks.trigger_checkpoint(point_id, context_id).await;
        }
        if let Some(result) = eviction.as_ref().filter(|r| r.strategy.is_some()) {
            self.hooks.trigger_eviction(result).await;
        }

        Some(TickOutcome {
            event,
            eviction,
            checkpoints: checkpoints.into_iter().map(|(point_id, _)| point_id).collect(),
        })
    }
}

/// Bounded context store with pressure-driven eviction
#[derive(Clone)]
pub struct ContextEvictionEngine {
    inner: Arc<EngineInner>,
}

impl ContextEvictionEngine {
    /// Create an engine with the system clock and `config.max_bytes` capacity
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration fails validation.
    pub fn new(config: LetheConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    /// Start building an engine
    pub fn builder(config: LetheConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    /// Engine configuration
    pub fn config(&self) -> &LetheConfig {
        &self.inner.config
    }

    /// Insert or overwrite an entry
    pub async fn add_context(&self, entry: ContextEntry) {
        let mut state = self.inner.state.lock().await;
        debug!(context_id = %entry.id, size = entry.size, "Adding context");
        state.store.add(entry);
    }

    /// Remove an entry; false if it did not exist
    pub async fn remove_context(&self, id: &str) -> bool {
        let mut state = self.inner.state.lock().await;
        state.store.remove(id).is_some()
    }

    /// Read an entry, updating access bookkeeping
    pub async fn get_context(&self, id: &str) -> Option<ContextEntry> {
        let mut state = self.inner.state.lock().await;
        state.store.get(id)
    }

    /// Read an entry and return a decompressed copy
    ///
    /// The stored entry stays compressed.
    pub async fn get_decompressed_context(&self, id: &str) -> Option<ContextEntry> {
        let mut state = self.inner.state.lock().await;
        let entry = state.store.get(id)?;
        Some(state.coordinator.compressor().decompress(&entry))
    }

    /// Set an entry's importance (clamped to `[0, 1]`); false if unknown
    pub async fn update_context_importance(&self, id: &str, importance: f64) -> bool {
        let mut state = self.inner.state.lock().await;
        state.store.update_importance(id, importance)
    }

    /// Compress one entry now
    ///
    /// Returns `None` when compression is disabled or the entry is unknown.
    pub async fn compress_context(&self, id: &str) -> Option<CompressionResult> {
        if !self.inner.config.enable_compression {
            return None;
        }
        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;
        state.coordinator.compress_entry(&mut state.store, id)
    }

    /// Snapshot an entry, returning the recovery point id
    ///
    /// Returns `None` when recovery is disabled or the entry is unknown.
    pub async fn create_recovery_point(&self, id: &str) -> Option<String> {
        let now = self.inner.clock.now_millis();
        let point_id = {
            let mut guard = self.inner.state.lock().await;
            let state = &mut *guard;
            state
                .recovery
                .create(&state.store, id, RecoveryReason::ManualCheckpoint, now)?
        };

        self.inner.hooks.trigger_checkpoint(&point_id, id).await;
        Some(point_id)
    }

    /// Replace the live entry with a recovery point's snapshot
    ///
    /// Returns false when recovery is disabled or the point is unknown.
    pub async fn restore_context(&self, recovery_point_id: &str) -> bool {
        let restored = {
            let mut guard = self.inner.state.lock().await;
            let state = &mut *guard;
            state.recovery.restore(recovery_point_id, &mut state.store)
        };

        match restored {
            Some(context_id) => {
                info!(recovery_point_id, context_id = %context_id, "Context restored");
                self.inner
                    .hooks
                    .trigger_restored(recovery_point_id, &context_id)
                    .await;
                true
            }
            None => false,
        }
    }

    /// Recovery points for one entry, oldest first
    pub async fn list_recovery_points(&self, context_id: &str) -> Vec<RecoveryPoint> {
        let state = self.inner.state.lock().await;
        state.recovery.list(context_id)
    }

    /// Delete a recovery point; false if unknown
    pub async fn delete_recovery_point(&self, recovery_point_id: &str) -> bool {
        let mut state = self.inner.state.lock().await;
        state.recovery.delete(recovery_point_id)
    }

    /// Run an eviction cycle for an externally produced pressure event
    pub async fn handle_memory_pressure(&self, event: &MemoryPressureEvent) -> EvictionResult {
        let now = self.inner.clock.now_millis();
        let result = {
            let mut guard = self.inner.state.lock().await;
            let state = &mut *guard;
            state.coordinator.handle(event, &mut state.store, now)
        };

        if result.strategy.is_some() {
            self.inner.hooks.trigger_eviction(&result).await;
        }
        result
    }

    /// Current usage fraction of the capacity
    pub async fn current_usage(&self) -> f64 {
        let state = self.inner.state.lock().await;
        state.usage(self.inner.capacity.as_ref())
    }

    /// Classification of current usage
    pub async fn get_memory_pressure_level(&self) -> PressureLevel {
        PressureLevel::from_usage(self.current_usage().await)
    }

    /// Usage extrapolated from recent pressure samples
    pub async fn predict_memory_usage(&self) -> f64 {
        let state = self.inner.state.lock().await;
        state.monitor.predict()
    }

    /// Engine statistics
    pub async fn get_stats(&self) -> EngineStats {
        let state = self.inner.state.lock().await;
        let current_usage = state.usage(self.inner.capacity.as_ref());

        EngineStats {
            total_contexts: state.store.len(),
            total_size: state.store.total_size(),
            eviction_count: state.coordinator.evicted_total(),
            compression_count: state.coordinator.compressed_total(),
            recovery_point_count: state.recovery.len(),
            current_usage,
            pressure_level: PressureLevel::from_usage(current_usage),
        }
    }

    /// Recorded eviction cycles, oldest first
    pub async fn eviction_history(&self) -> Vec<EvictionResult> {
        let state = self.inner.state.lock().await;
        state.coordinator.history()
    }

    /// Recorded pressure samples, oldest first
    pub async fn pressure_history(&self) -> Vec<MemoryPressureEvent> {
        let state = self.inner.state.lock().await;
        state.monitor.history()
    }

    /// Run one monitor tick inline
    ///
    /// Samples usage, records the sample, runs automatic checkpoints and, if
    /// pressure is above low, an eviction cycle. Returns `None` when another
    /// tick is still in progress.
    pub async fn tick(&self) -> Option<TickOutcome> {
        self.inner.tick().await
    }

    /// Spawn the periodic pressure monitor
    ///
    /// # Errors
    ///
    /// Returns an error if the monitor is already running.
    pub async fn start(&self) -> Result<()> {
        let mut slot = self.inner.monitor_task.lock().await;
        if slot.as_ref().is_some_and(|task| !task.handle.is_finished()) {
            return Err(LetheError::Monitor(
                "pressure monitor already running".to_string(),
            ));
        }

        let period = self.inner.config.monitoring_interval;
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let engine: Weak<EngineInner> = Arc::downgrade(&self.inner);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        let Some(inner) = engine.upgrade() else { break };
                        inner.tick().await;
                    }
                }
            }

            debug!("Pressure monitor loop exited");
        });

        info!(interval = ?period, "Pressure monitor started");
        *slot = Some(MonitorTask { cancel, handle });
        Ok(())
    }

    /// Stop the pressure monitor and wait for it to exit
    pub async fn stop(&self) {
        let task = self.inner.monitor_task.lock().await.take();
        let Some(task) = task else {
            return;
        };

        task.cancel.cancel();
        if let Err(e) = task.handle.await {
            warn!(error = %e, "Pressure monitor task ended abnormally");
        }
        info!("Pressure monitor stopped");
    }

    /// Whether the pressure monitor task is running
    pub async fn is_running(&self) -> bool {
        self.inner
            .monitor_task
            .lock()
            .await
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }
}

/// Builder for [`ContextEvictionEngine`]
pub struct EngineBuilder {
    config: LetheConfig,
    clock: Option<Arc<dyn Clock>>,
    capacity: Option<Arc<dyn CapacityProvider>>,
    hooks: HookRegistry,
}

impl EngineBuilder {
    /// Create a builder for `config`
    pub fn new(config: LetheConfig) -> Self {
        Self {
            config,
            clock: None,
            capacity: None,
            hooks: HookRegistry::new(),
        }
    }

    /// Use a custom time source
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Measure usage against a custom capacity
    pub fn capacity(mut self, capacity: impl CapacityProvider + 'static) -> Self {
        self.capacity = Some(Arc::new(capacity));
        self
    }

    /// Register a hook
    pub fn hook(mut self, hook: Arc<dyn EvictionHook>) -> Self {
        self.hooks.register(hook);
        self
    }

    /// Build the engine
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration fails validation.
    pub fn build(self) -> Result<ContextEvictionEngine> {
        self.config.validate()?;

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()) as Arc<dyn Clock>);
        let capacity = self
            .capacity
            .unwrap_or_else(|| {
                Arc::new(FixedCapacity(self.config.max_bytes)) as Arc<dyn CapacityProvider>
            });

        let state = EngineState {
            store: ContextStore::new(clock.clone()),
            coordinator: EvictionCoordinator::new(
                self.config.policies.clone(),
                self.config.enable_compression,
                self.config.eviction_history_limit,
            ),
            recovery: RecoveryPointManager::new(self.config.recovery_settings()),
            monitor: PressureMonitor::new(self.config.pressure_history_limit),
        };

        Ok(ContextEvictionEngine {
            inner: Arc::new(EngineInner {
                config: self.config,
                state: Mutex::new(state),
                clock,
                capacity,
                hooks: self.hooks,
                tick_lock: Mutex::new(()),
                monitor_task: Mutex::new(None),
            }),
        })
    }
}
