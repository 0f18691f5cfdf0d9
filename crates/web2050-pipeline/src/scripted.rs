//! Scripted generator for testing.
//!
//! Provides [`ScriptedGenerator`] for exercising the pipeline without an
//! upstream model.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::watch;
use web2050_store::AssetList;

use crate::generator::{ByteStream, ContentGenerator, GenerationError};

/// Replays a fixed event stream on every call.
///
/// The stream can be held open by a gate until [`Gate::open`] is called,
/// which lets tests stack up concurrent requests behind one generation.
///
/// # Example
///
/// ```ignore
/// use web2050_pipeline::ScriptedGenerator;
///
/// let generator = ScriptedGenerator::from_tokens(&["<_out>", "hello", "</_out>"]);
/// ```
#[derive(Debug)]
pub struct ScriptedGenerator {
    items: Vec<Result<Vec<u8>, GenerationError>>,
    start_error: Option<GenerationError>,
    gate: Option<watch::Receiver<bool>>,
    calls: AtomicUsize,
    last_context: Mutex<Option<AssetList>>,
}

/// Releases a gated [`ScriptedGenerator`].
#[derive(Debug)]
pub struct Gate(watch::Sender<bool>);

impl Gate {
    pub fn open(&self) {
        self.0.send_replace(true);
    }
}

/// Frame a token delta as one event line.
#[must_use]
pub fn event_line(content: &str) -> String {
    format!(
        "data: {}\n",
        serde_json::json!({ "choices": [{ "delta": { "content": content } }] })
    )
}

impl ScriptedGenerator {
    /// One event per token, followed by the termination sentinel.
    #[must_use]
    pub fn from_tokens(tokens: &[&str]) -> Self {
        let mut items: Vec<_> = tokens
            .iter()
            .map(|token| Ok(event_line(token).into_bytes()))
            .collect();
        items.push(Ok(b"data: [DONE]\n".to_vec()));
        Self::from_items(items)
    }

    /// Exact transport chunks, including injected stream errors.
    #[must_use]
    pub fn from_items(items: Vec<Result<Vec<u8>, GenerationError>>) -> Self {
        Self {
            items,
            start_error: None,
            gate: None,
            calls: AtomicUsize::new(0),
            last_context: Mutex::new(None),
        }
    }

    /// Fail every call before streaming.
    #[must_use]
    pub fn failing(error: GenerationError) -> Self {
        Self {
            start_error: Some(error),
            ..Self::from_items(Vec::new())
        }
    }

    /// Hold each stream open until the returned gate is opened.
    #[must_use]
    pub fn gated(mut self) -> (Self, Gate) {
        let (tx, rx) = watch::channel(false);
        self.gate = Some(rx);
        (self, Gate(tx))
    }

    /// Number of `generate` calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Context passed to the most recent call.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn last_context(&self) -> Option<AssetList> {
        self.last_context.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        _key: &str,
        context: &AssetList,
    ) -> Result<ByteStream, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_context.lock().unwrap() = Some(context.clone());

        let gate = self.gate.clone();
        let opened = async move {
            if let Some(mut gate) = gate {
                let _ = gate.wait_for(|open| *open).await;
            }
        };
        if let Some(error) = &self.start_error {
            opened.await;
            return Err(error.clone());
        }

        let items = self.items.clone();
        let stream =
            futures::stream::once(opened).flat_map(move |()| futures::stream::iter(items.clone()));
        Ok(Box::pin(stream))
    }
}
