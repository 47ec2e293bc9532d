//! Language context: the ordered language codes a field is kept in, plus the
//! language the user is currently editing in.

/// Language code that receives the real external translation result.
pub const CANONICAL_SLOT: &str = "en_US";

/// Target hint passed to the external translation operation.
pub const TRANSLATE_HINT: &str = "en";

/// Read-only snapshot of the externally configured languages.
///
/// Codes are opaque strings (e.g. "en_US", "zh_CN"). Order is preserved and
/// used for deterministic iteration, but carries no other meaning.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LanguageContext {
    languages: Vec<String>,
    current: String,
}

impl LanguageContext {
    /// Create a context from language codes and the active language code.
    ///
    /// Duplicate codes are dropped, keeping the first occurrence. The current
    /// language does not have to be one of the configured languages; if it is
    /// not, no slot receives the raw input unchanged.
    pub fn new<I, S>(languages: I, current: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut codes: Vec<String> = Vec::new();
        for code in languages {
            let code = code.into();
            if !codes.contains(&code) {
                codes.push(code);
            }
        }

        Self {
            languages: codes,
            current: current.into(),
        }
    }

    /// Configured language codes, in configuration order.
    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// The currently active language code.
    pub fn current(&self) -> &str {
        &self.current
    }

    /// Check if `code` is the currently active language.
    pub fn is_current(&self, code: &str) -> bool {
        self.current == code
    }

    /// Check if `code` is one of the configured languages.
    pub fn contains(&self, code: &str) -> bool {
        self.languages.iter().any(|l| l == code)
    }

    /// `true` when no languages are configured. Every record is then empty.
    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}
