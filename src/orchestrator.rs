//! Resolution of a field once its debounce window has elapsed.
//!
//! Empty input clears every language without calling the translation service.
//! Anything else is translated once; the canonical slot receives the service's
//! result, the current language keeps the raw input, and every other language
//! gets the `"<value>-<lang>"` placeholder. The resulting record replaces the
//! field's record in the store in a single publish.

use crate::config::SyncConfig;
use crate::debounce::Ticket;
use crate::error::SyncError;
use crate::i18n::LanguageContext;
use crate::metrics::SyncMetrics;
use crate::store::{FieldStore, LanguageRecord};
use crate::translation::Translator;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Called with a field's new record after a successful translation.
pub type Callback = Box<dyn FnOnce(&LanguageRecord) + Send>;

/// Latest edit waiting for its debounce window.
pub struct Payload {
    pub value: String,
    pub callback: Option<Callback>,
}

impl Payload {
    pub fn new(value: impl Into<String>, callback: Option<Callback>) -> Self {
        Self {
            value: value.into(),
            callback,
        }
    }
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Payload")
            .field("value", &self.value)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// Lifecycle notifications for observers of the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A translate call armed (or re-armed) the field's timer
    Scheduled {
        field: String,
        sequence: u64,
        superseded: bool,
    },
    /// Translation succeeded and the record was merged
    Resolved { field: String, sequence: u64 },
    /// Empty input cleared the field
    Cleared { field: String, sequence: u64 },
    /// The translation service failed; the store is unchanged
    Failed {
        field: String,
        sequence: u64,
        error: String,
    },
    /// The result arrived after a newer call and was dropped
    Discarded { field: String, sequence: u64 },
}

impl SyncEvent {
    pub fn field(&self) -> &str {
        match self {
            SyncEvent::Scheduled { field, .. }
            | SyncEvent::Resolved { field, .. }
            | SyncEvent::Cleared { field, .. }
            | SyncEvent::Failed { field, .. }
            | SyncEvent::Discarded { field, .. } => field,
        }
    }

    pub fn sequence(&self) -> u64 {
        match self {
            SyncEvent::Scheduled { sequence, .. }
            | SyncEvent::Resolved { sequence, .. }
            | SyncEvent::Cleared { sequence, .. }
            | SyncEvent::Failed { sequence, .. }
            | SyncEvent::Discarded { sequence, .. } => *sequence,
        }
    }

    /// `true` for events that end a resolution.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SyncEvent::Scheduled { .. })
    }
}

/// What a resolution did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Cleared(LanguageRecord),
    Translated(LanguageRecord),
    Discarded,
}

/// Spread a translation result across every configured language.
pub fn distribute(
    context: &LanguageContext,
    canonical_slot: &str,
    raw: &str,
    translated: &str,
) -> LanguageRecord {
    context
        .languages()
        .iter()
        .map(|lang| {
            let value = if lang == canonical_slot {
                translated.to_string()
            } else if context.is_current(lang) {
                raw.to_string()
            } else {
                // Placeholder until non-canonical languages get real translations.
                format!("{}-{}", raw, lang)
            };
            (lang.clone(), value)
        })
        .collect()
}

/// Runs resolutions for one engine instance.
pub struct Orchestrator {
    context: LanguageContext,
    config: SyncConfig,
    translator: Arc<dyn Translator>,
    store: Arc<FieldStore>,
    metrics: Arc<SyncMetrics>,
    events: broadcast::Sender<SyncEvent>,
}

impl Orchestrator {
    pub fn new(
        context: LanguageContext,
        config: SyncConfig,
        translator: Arc<dyn Translator>,
        store: Arc<FieldStore>,
        metrics: Arc<SyncMetrics>,
        events: broadcast::Sender<SyncEvent>,
    ) -> Self {
        Self {
            context,
            config,
            translator,
            store,
            metrics,
            events,
        }
    }

    pub fn context(&self) -> &LanguageContext {
        &self.context
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub(crate) fn emit(&self, event: SyncEvent) {
        // No subscribers is fine; events are best-effort.
        let _ = self.events.send(event);
    }

    /// Resolve `payload` for `field` and merge the result into the store.
    pub async fn resolve(
        &self,
        field: &str,
        payload: Payload,
        ticket: &Ticket,
    ) -> Result<Resolution, SyncError> {
        let sequence = ticket.sequence();
        let Payload { value, callback } = payload;

        if value.is_empty() {
            let record = LanguageRecord::empty(&self.context);
            self.store.set_field(field, record.clone());
            self.metrics.record_cleared();
            info!("Cleared field '{}' (sequence {})", field, sequence);
            self.emit(SyncEvent::Cleared {
                field: field.to_string(),
                sequence,
            });
            return Ok(Resolution::Cleared(record));
        }

        self.metrics.record_api_call();
        let translated = match self
            .translator
            .translate_once(&value, &self.config.translate_hint)
            .await
        {
            Ok(translated) => translated,
            Err(e) => {
                self.metrics.record_api_failure();
                let error = SyncError::translation(field, &e);
                warn!("{} (sequence {})", error, sequence);
                self.emit(SyncEvent::Failed {
                    field: field.to_string(),
                    sequence,
                    error: error.to_string(),
                });
                return Err(error);
            }
        };

        if self.config.discard_stale_results && ticket.is_superseded() {
            self.metrics.record_stale_discard();
            warn!(
                "Discarding stale translation for field '{}' (sequence {})",
                field, sequence
            );
            self.emit(SyncEvent::Discarded {
                field: field.to_string(),
                sequence,
            });
            return Ok(Resolution::Discarded);
        }

        let record = distribute(
            &self.context,
            &self.config.canonical_slot,
            &value,
            &translated,
        );
        self.store.set_field(field, record.clone());
        info!(
            "Translated field '{}' into {} languages (sequence {})",
            field,
            record.len(),
            sequence
        );

        if let Some(callback) = callback {
            callback(&record);
        }

        self.emit(SyncEvent::Resolved {
            field: field.to_string(),
            sequence,
        });

        Ok(Resolution::Translated(record))
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("context", &self.context)
            .field("config", &self.config)
            .finish()
    }
}
