//! Language context consumed by the sync engine.
//!
//! The set of configured languages and the currently active one are owned by
//! an external configuration source. The engine reads them once when it is
//! constructed and never observes later changes.
//!
//! # Example
//!
//! ```rust,ignore
//! use field_translate_sync::i18n::LanguageContext;
//!
//! let context = LanguageContext::new(["en_US", "fr_FR"], "fr_FR");
//! assert!(context.is_current("fr_FR"));
//! ```

mod language;

pub use language::{LanguageContext, CANONICAL_SLOT, TRANSLATE_HINT};
