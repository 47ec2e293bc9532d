//! Public entry point: keeps a set of named text fields translated into every
//! configured language.
//!
//! ```rust,ignore
//! let sync = TranslationSync::new(context, SyncConfig::default(), translator, &RawData::new());
//! sync.translate("title", "你好");
//! sync.settle().await;
//! assert_eq!(sync.snapshot().value("title", "en_US"), Some("Hello"));
//! ```

use crate::config::SyncConfig;
use crate::debounce::{self, DebounceRegistry, Ticket};
use crate::error::SyncError;
use crate::i18n::LanguageContext;
use crate::metrics::{MetricsReport, SyncMetrics};
use crate::orchestrator::{Callback, Orchestrator, Payload, SyncEvent};
use crate::store::{FieldSnapshot, FieldStore, LanguageRecord, RawData};
use crate::translation::Translator;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::debug;

/// Capacity of the event channel; slow subscribers observe `Lagged`.
const EVENT_CAPACITY: usize = 256;

/// A direct, non-debounced correction of stored data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    /// Replace the field's whole record
    Record(LanguageRecord),
    /// Replace a single language entry of an existing field
    Language { language: String, value: String },
}

impl FieldUpdate {
    pub fn language(language: impl Into<String>, value: impl Into<String>) -> Self {
        FieldUpdate::Language {
            language: language.into(),
            value: value.into(),
        }
    }
}

/// Debounced translation sync for one session.
///
/// Owns its field store and debounce registry; two instances never share
/// state, even for identical field names.
pub struct TranslationSync {
    context: LanguageContext,
    orchestrator: Arc<Orchestrator>,
    store: Arc<FieldStore>,
    registry: DebounceRegistry<Payload>,
    metrics: Arc<SyncMetrics>,
    events: broadcast::Sender<SyncEvent>,
}

impl TranslationSync {
    /// Create an engine seeded with `initial` raw data.
    pub fn new(
        context: LanguageContext,
        config: SyncConfig,
        translator: Arc<dyn Translator>,
        initial: &RawData,
    ) -> Self {
        let store = Arc::new(FieldStore::new(FieldSnapshot::initialize(&context, initial)));
        let metrics = Arc::new(SyncMetrics::new());
        let (events, _rx) = broadcast::channel(EVENT_CAPACITY);
        let debounce_window = config.debounce;

        let orchestrator = Arc::new(Orchestrator::new(
            context.clone(),
            config,
            translator,
            Arc::clone(&store),
            Arc::clone(&metrics),
            events.clone(),
        ));

        let resolver = Arc::clone(&orchestrator);
        let registry = DebounceRegistry::new(
            debounce_window,
            debounce::handler(move |field: String, payload: Payload, ticket: Ticket| {
                let resolver = Arc::clone(&resolver);
                async move {
                    // Failures are already reported through events and metrics.
                    let _ = resolver.resolve(&field, payload, &ticket).await;
                }
            }),
        );

        Self {
            context,
            orchestrator,
            store,
            registry,
            metrics,
            events,
        }
    }

    /// Schedule a debounced translation of `value` into `name`.
    ///
    /// Returns the call's sequence number for this field.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn translate(&self, name: &str, value: impl Into<String>) -> u64 {
        self.schedule(name, value.into(), None)
    }

    /// Like [`translate`](Self::translate), calling `callback` with the new
    /// record once the translation has been merged.
    ///
    /// Only the callback of the last call inside a debounce window runs. It
    /// does not run for empty input or when the translation fails.
    pub fn translate_with<F>(&self, name: &str, value: impl Into<String>, callback: F) -> u64
    where
        F: FnOnce(&LanguageRecord) + Send + 'static,
    {
        self.schedule(name, value.into(), Some(Box::new(callback)))
    }

    fn schedule(&self, name: &str, value: String, callback: Option<Callback>) -> u64 {
        let (debouncer, created) = self.registry.register(name);
        if self
            .store
            .ensure_field(name, LanguageRecord::empty(&self.context))
        {
            debug!("Initialized empty record for field '{}'", name);
        }

        // Observers see `Scheduled` before the timer for this call is armed.
        let scheduled = debouncer.schedule_then(Payload::new(value, callback), |scheduled| {
            self.metrics.record_scheduled();
            if scheduled.superseded {
                self.metrics.record_coalesced();
                debug!(
                    "Superseded pending edit for field '{}' (sequence {})",
                    name, scheduled.sequence
                );
            } else if created {
                debug!("First edit for field '{}'", name);
            }

            self.orchestrator.emit(SyncEvent::Scheduled {
                field: name.to_string(),
                sequence: scheduled.sequence,
                superseded: scheduled.superseded,
            });
        });

        scheduled.sequence
    }

    /// Apply a direct correction, bypassing debounce and translation.
    pub fn update_data(&self, name: &str, update: FieldUpdate) -> Result<(), SyncError> {
        match update {
            FieldUpdate::Record(record) => {
                self.store.set_field(name, record);
            }
            FieldUpdate::Language { language, value } => {
                self.store.set_language_value(name, &language, &value)?;
            }
        }
        Ok(())
    }

    /// Register `name` and reset its record to all-empty.
    ///
    /// Any data already stored for the field is overwritten.
    pub fn add_name(&self, name: &str) {
        let (_, created) = self.registry.register(name);
        self.store
            .set_field(name, LanguageRecord::empty(&self.context));
        debug!("Added field '{}' (new invoker: {})", name, created);
    }

    /// Replace the whole store with normalized `data`.
    pub fn init_data(&self, data: &RawData) {
        self.store
            .replace(FieldSnapshot::initialize(&self.context, data));
        debug!("Reinitialized store with {} fields", data.len());
    }

    /// The current snapshot of every field.
    pub fn snapshot(&self) -> Arc<FieldSnapshot> {
        self.store.snapshot()
    }

    /// The current record of a single field.
    pub fn record(&self, name: &str) -> Option<LanguageRecord> {
        self.store.snapshot().get(name).cloned()
    }

    /// Receiver notified on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<FieldSnapshot>> {
        self.store.subscribe()
    }

    /// Receiver of lifecycle events, starting from now.
    pub fn events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Wait until every pending edit has resolved.
    pub async fn settle(&self) {
        self.registry.settle().await;
    }

    /// Number of armed debounce timers plus running resolutions.
    ///
    /// A field can count twice while its previous resolution is still running
    /// and a newer edit has armed another timer.
    pub fn in_flight(&self) -> usize {
        self.registry.in_flight()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    pub fn registered_fields(&self) -> Vec<String> {
        self.registry.fields()
    }

    pub fn context(&self) -> &LanguageContext {
        &self.context
    }

    pub fn metrics(&self) -> MetricsReport {
        self.metrics.report()
    }
}

impl std::fmt::Debug for TranslationSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationSync")
            .field("context", &self.context)
            .field("registry", &self.registry)
            .field("fields", &self.store.snapshot().len())
            .finish()
    }
}
