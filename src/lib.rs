//! Debounced translation sync for multi-language text fields.
//!
//! A [`TranslationSync`] keeps a set of named fields populated in every
//! configured language. Edits are coalesced per field; once a field has been
//! quiet for the debounce window, its latest value is translated once and the
//! per-language result replaces the field in an immutable snapshot.

pub mod config;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod i18n;
pub mod metrics;
pub mod orchestrator;
pub mod store;
pub mod translation;

#[cfg(test)]
mod test_utils;

pub use config::{Config, SyncConfig};
pub use engine::{FieldUpdate, TranslationSync};
pub use error::SyncError;
pub use i18n::LanguageContext;
pub use metrics::MetricsReport;
pub use orchestrator::{Resolution, SyncEvent};
pub use store::{FieldSnapshot, LanguageRecord, RawData, RawRecord};
pub use translation::{HttpTranslator, Translator};
