//! Test helpers shared by unit tests.

use crate::translation::Translator;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// In-process translator that records every call.
///
/// Translates `text` to `"[en] text"`. Individual inputs can be delayed to
/// simulate slow service responses, and the whole translator can be switched
/// into a failing mode.
#[derive(Debug, Default)]
pub(crate) struct FakeTranslator {
    calls: Mutex<Vec<(String, String)>>,
    delays: Mutex<HashMap<String, Duration>>,
    failing: AtomicBool,
}

impl FakeTranslator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Delay the response for `text`.
    pub(crate) fn delay(&self, text: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .insert(text.to_string(), delay);
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Texts passed to the translator, in call order.
    pub(crate) fn texts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }

    pub(crate) fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Translator for FakeTranslator {
    fn translate_once<'a>(
        &'a self,
        text: &'a str,
        hint: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<String>> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), hint.to_string()));
        let delay = self.delays.lock().unwrap().get(text).copied();
        let failing = self.failing.load(Ordering::SeqCst);

        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if failing {
                anyhow::bail!("Translation service error (503): unavailable");
            }
            Ok(format!("[en] {}", text))
        }
        .boxed()
    }
}
