//! Field state store: immutable snapshots of every field's per-language values.
//!
//! Every mutation is a pure function from the current snapshot to a new one.
//! `FieldStore` publishes the latest snapshot through a `watch` channel, so a
//! reader either sees the whole of a write or none of it.

use crate::error::SyncError;
use crate::i18n::LanguageContext;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;

/// Raw values for one field as supplied by a caller; `None` entries count as empty.
pub type RawRecord = BTreeMap<String, Option<String>>;

/// Raw initial data: field name to an optional raw record (`null` for "no data yet").
pub type RawData = BTreeMap<String, Option<RawRecord>>;

/// A field's values across all configured languages.
///
/// Entries iterate and serialize sorted by language code, independent of the
/// order in which languages were configured.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageRecord(BTreeMap<String, String>);

impl LanguageRecord {
    /// Record with every configured language mapped to `""`.
    pub fn empty(context: &LanguageContext) -> Self {
        context
            .languages()
            .iter()
            .map(|lang| (lang.clone(), String::new()))
            .collect()
    }

    /// Normalize a raw record over the configured languages.
    ///
    /// Languages missing from `raw` (or `null`) become `""`; raw entries for
    /// languages that are not configured are dropped.
    pub fn from_raw(context: &LanguageContext, raw: Option<&RawRecord>) -> Self {
        context
            .languages()
            .iter()
            .map(|lang| {
                let value = raw
                    .and_then(|r| r.get(lang))
                    .and_then(|v| v.clone())
                    .unwrap_or_default();
                (lang.clone(), value)
            })
            .collect()
    }

    pub fn get(&self, lang: &str) -> Option<&str> {
        self.0.get(lang).map(String::as_str)
    }

    pub fn insert(&mut self, lang: impl Into<String>, value: impl Into<String>) {
        self.0.insert(lang.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `true` when every language maps to an empty string.
    pub fn is_blank(&self) -> bool {
        self.0.values().all(String::is_empty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for LanguageRecord
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Immutable view of every field in the store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct FieldSnapshot {
    fields: BTreeMap<String, LanguageRecord>,
}

impl FieldSnapshot {
    /// Build a snapshot from raw data, normalizing every field over the
    /// configured languages.
    pub fn initialize(context: &LanguageContext, raw: &RawData) -> Self {
        let fields = raw
            .iter()
            .map(|(name, record)| {
                (
                    name.clone(),
                    LanguageRecord::from_raw(context, record.as_ref()),
                )
            })
            .collect();

        Self { fields }
    }

    /// New snapshot with `name`'s record replaced wholesale.
    pub fn with_field(&self, name: &str, record: LanguageRecord) -> Self {
        let mut fields = self.fields.clone();
        fields.insert(name.to_string(), record);
        Self { fields }
    }

    /// New snapshot with a single language entry of an existing field replaced.
    ///
    /// Fails with `FieldNotFound` when the field was never initialized.
    pub fn with_language_value(
        &self,
        name: &str,
        lang: &str,
        value: &str,
    ) -> Result<Self, SyncError> {
        let mut fields = self.fields.clone();
        let record = fields
            .get_mut(name)
            .ok_or_else(|| SyncError::FieldNotFound(name.to_string()))?;
        record.insert(lang, value);
        Ok(Self { fields })
    }

    pub fn get(&self, name: &str) -> Option<&LanguageRecord> {
        self.fields.get(name)
    }

    /// Shortcut for a single field/language value.
    pub fn value(&self, name: &str, lang: &str) -> Option<&str> {
        self.get(name).and_then(|record| record.get(lang))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Holder of the current snapshot for one engine instance.
#[derive(Debug)]
pub struct FieldStore {
    tx: watch::Sender<Arc<FieldSnapshot>>,
}

impl FieldStore {
    pub fn new(snapshot: FieldSnapshot) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(snapshot));
        Self { tx }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<FieldSnapshot> {
        self.tx.borrow().clone()
    }

    /// Receiver that is notified every time a new snapshot is published.
    pub fn subscribe(&self) -> watch::Receiver<Arc<FieldSnapshot>> {
        self.tx.subscribe()
    }

    /// Apply a transformation to the current snapshot and publish the result.
    ///
    /// The transformation runs under the channel's write lock, so concurrent
    /// updates are serialized. On error nothing is published.
    pub fn update<F>(&self, transform: F) -> Result<Arc<FieldSnapshot>, SyncError>
    where
        F: FnOnce(&FieldSnapshot) -> Result<FieldSnapshot, SyncError>,
    {
        let mut outcome = Ok(Arc::default());
        self.tx.send_if_modified(|current| match transform(&**current) {
            Ok(next) => {
                *current = Arc::new(next);
                outcome = Ok(Arc::clone(current));
                true
            }
            Err(e) => {
                outcome = Err(e);
                false
            }
        });
        outcome
    }

    /// Apply an infallible transformation and publish the result.
    fn apply<F>(&self, transform: F) -> Arc<FieldSnapshot>
    where
        F: FnOnce(&FieldSnapshot) -> FieldSnapshot,
    {
        let mut published = Arc::default();
        self.tx.send_modify(|current| {
            *current = Arc::new(transform(&**current));
            published = Arc::clone(current);
        });
        published
    }

    /// Replace the entire record of `name`.
    pub fn set_field(&self, name: &str, record: LanguageRecord) -> Arc<FieldSnapshot> {
        self.apply(|current| current.with_field(name, record))
    }

    /// Insert `record` for `name` unless the field already exists.
    ///
    /// Returns `true` when the record was inserted.
    pub fn ensure_field(&self, name: &str, record: LanguageRecord) -> bool {
        self.tx.send_if_modified(|current| {
            if current.contains(name) {
                return false;
            }
            *current = Arc::new(current.with_field(name, record));
            true
        })
    }

    /// Replace one language entry of an existing field.
    pub fn set_language_value(
        &self,
        name: &str,
        lang: &str,
        value: &str,
    ) -> Result<Arc<FieldSnapshot>, SyncError> {
        self.update(|current| current.with_language_value(name, lang, value))
    }

    /// Publish a whole new snapshot, discarding the previous one.
    pub fn replace(&self, snapshot: FieldSnapshot) -> Arc<FieldSnapshot> {
        let next = Arc::new(snapshot);
        self.tx.send_replace(Arc::clone(&next));
        next
    }
}

impl Default for FieldStore {
    fn default() -> Self {
        Self::new(FieldSnapshot::default())
    }
}
