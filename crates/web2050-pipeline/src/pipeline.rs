//! Request orchestration: normalize, look up, generate, persist.
//!
//! ```text
//! Normalize -> Lookup -> Hit                                  -> Stored
//!                     -> Miss -> Busy     -> Wait -> Lookup   -> Stored | Unavailable
//!                             -> Acquired -> Generate -> Extract -> Persist -> Release
//! ```
//!
//! The owner's generation runs in its own task holding the slot guard, so
//! it drains and persists even when the requesting client goes away.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use web2050_store::{AssetContextProvider, Page, PageStore};

use crate::coordinator::{Acquisition, GenerationCoordinator, GenerationGuard};
use crate::error::PipelineError;
use crate::extractor::TagExtractor;
use crate::framing::EventDecoder;
use crate::generator::{ContentGenerator, GenerationError};
use crate::path::PagePath;

type ChunkSender = mpsc::UnboundedSender<Result<String, GenerationError>>;

/// Result of [`GenerationPipeline::resolve`].
#[derive(Debug)]
pub enum Resolution {
    /// Page served from the store.
    Stored(Page),
    /// Page being generated now.
    Generated(PageStream),
}

impl Resolution {
    /// Canonical key of the resolved page.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Stored(page) => &page.key,
            Self::Generated(stream) => stream.key(),
        }
    }
}

/// Extracted content of an in-progress generation.
///
/// The first chunk is already available. An `Err` item means the
/// generation broke off and nothing was persisted.
#[derive(Debug)]
pub struct PageStream {
    key: String,
    first: Option<String>,
    rest: mpsc::UnboundedReceiver<Result<String, GenerationError>>,
}

impl PageStream {
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Next extracted chunk, or `None` once the generation finished.
    pub async fn next_chunk(&mut self) -> Option<Result<String, GenerationError>> {
        if let Some(first) = self.first.take() {
            return Some(Ok(first));
        }
        self.rest.recv().await
    }

    /// Drain the remaining chunks into one string.
    pub async fn collect(mut self) -> Result<String, GenerationError> {
        let mut content = String::new();
        while let Some(chunk) = self.next_chunk().await {
            content.push_str(&chunk?);
        }
        Ok(content)
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<String, GenerationError>> + Send {
        futures::stream::unfold(self, |mut stream| async move {
            stream.next_chunk().await.map(|chunk| (chunk, stream))
        })
    }
}

/// Serves pages from the store and generates missing ones, one generation
/// per group at a time.
#[derive(Clone)]
pub struct GenerationPipeline {
    store: Arc<dyn PageStore>,
    context: Arc<dyn AssetContextProvider>,
    generator: Arc<dyn ContentGenerator>,
    coordinator: Arc<GenerationCoordinator>,
    output_tag: Arc<str>,
}

impl GenerationPipeline {
    #[must_use]
    pub fn new(
        store: Arc<dyn PageStore>,
        context: Arc<dyn AssetContextProvider>,
        generator: Arc<dyn ContentGenerator>,
        output_tag: &str,
    ) -> Self {
        Self {
            store,
            context,
            generator,
            coordinator: Arc::new(GenerationCoordinator::new()),
            output_tag: Arc::from(output_tag),
        }
    }

    #[cfg(test)]
    pub(crate) fn coordinator(&self) -> &GenerationCoordinator {
        &self.coordinator
    }

    /// Resolve a raw request path to stored or freshly generated content.
    ///
    /// Returns once the page is known to exist or the first chunk of a new
    /// generation has been extracted.
    pub async fn resolve(&self, raw: &str) -> Result<Resolution, PipelineError> {
        let path = PagePath::parse(raw)?;
        if let Some(page) = self.store.get(path.key()).await? {
            tracing::debug!(key = %page.key, "Serving stored page");
            return Ok(Resolution::Stored(page));
        }

        match self.coordinator.try_acquire(path.group()) {
            Acquisition::Busy(handle) => {
                tracing::debug!(
                    key = %path.key(),
                    group = %path.group(),
                    waiters = self.coordinator.waiters(path.group()),
                    "Waiting for in-flight generation"
                );
                handle.wait().await;
                tracing::debug!(key = %path.key(), "Woke after generation");
                match self.store.get(path.key()).await? {
                    Some(page) => Ok(Resolution::Stored(page)),
                    None => Err(GenerationError::Unavailable {
                        key: path.into_key(),
                    }
                    .into()),
                }
            }
            Acquisition::Acquired(guard) => {
                // The previous owner may have finished between lookup and acquire.
                if let Some(page) = self.store.get(path.key()).await? {
                    return Ok(Resolution::Stored(page));
                }
                self.spawn_generation(path, guard).await
            }
        }
    }

    /// Delete the page a raw path normalizes to. Returns its canonical key.
    pub async fn delete(&self, raw: &str) -> Result<String, PipelineError> {
        let path = PagePath::parse(raw)?;
        self.store.delete(path.key()).await?;
        tracing::info!(key = %path.key(), "Page deleted");
        Ok(path.into_key())
    }

    async fn spawn_generation(
        &self,
        path: PagePath,
        guard: GenerationGuard,
    ) -> Result<Resolution, PipelineError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let key = path.key().to_owned();

        let pipeline = self.clone();
        tokio::spawn(async move { pipeline.run_generation(path, guard, tx).await });

        match rx.recv().await {
            Some(Ok(first)) => Ok(Resolution::Generated(PageStream {
                key,
                first: Some(first),
                rest: rx,
            })),
            Some(Err(e)) => Err(e.into()),
            None => Err(GenerationError::Stream(
                "generation task ended unexpectedly".to_owned(),
            )
            .into()),
        }
    }

    /// Owner side of a generation: drain, persist, release.
    async fn run_generation(self, path: PagePath, guard: GenerationGuard, tx: ChunkSender) {
        match self.extract(&path, &tx).await {
            Ok(content) => {
                match self.store.upsert(path.key(), &content).await {
                    Ok(_) => {
                        tracing::info!(
                            key = %path.key(),
                            group = %guard.group(),
                            bytes = content.len(),
                            "Page generated"
                        );
                    }
                    Err(e) => {
                        tracing::error!(
                            key = %path.key(),
                            error = %e,
                            "Failed to persist generated page"
                        );
                    }
                }
            }
            Err(e) => {
                match &e {
                    GenerationError::Empty { .. } => {
                        tracing::warn!(key = %path.key(), "Generation produced no content");
                    }
                    _ => tracing::error!(key = %path.key(), error = %e, "Generation failed"),
                }
                let _ = tx.send(Err(e));
            }
        }
        guard.release();
    }

    /// Stream extracted chunks to `tx` and return the full content.
    async fn extract(&self, path: &PagePath, tx: &ChunkSender) -> Result<String, GenerationError> {
        let assets = self.context.fetch(path.group()).await;
        tracing::info!(
            key = %path.key(),
            group = %path.group(),
            assets = assets.len(),
            in_flight = self.coordinator.in_flight(),
            "Generating page"
        );

        let mut events = self.generator.generate(path.key(), &assets).await?;
        let mut decoder = EventDecoder::new();
        let mut extractor = TagExtractor::new(self.output_tag.as_ref());
        let mut content = String::new();

        let mut emit = |delta: &str| {
            let out = extractor.feed(delta);
            if !out.is_empty() {
                content.push_str(&out);
                // A closed receiver means the client left; keep generating.
                let _ = tx.send(Ok(out));
            }
        };

        while let Some(chunk) = events.next().await {
            for delta in decoder.push(&chunk?) {
                emit(&delta);
            }
        }
        if let Some(delta) = decoder.finish() {
            emit(&delta);
        }

        if content.is_empty() {
            return Err(GenerationError::Empty {
                key: path.key().to_owned(),
            });
        }
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::scripted::ScriptedGenerator;
    use pretty_assertions::assert_eq;
    use web2050_store::{MemoryPageStore, StoreAssetProvider};

    fn pipeline(
        store: &Arc<MemoryPageStore>,
        generator: &Arc<ScriptedGenerator>,
    ) -> GenerationPipeline {
        let store: Arc<dyn PageStore> = Arc::clone(store) as Arc<dyn PageStore>;
        GenerationPipeline::new(
            Arc::clone(&store),
            Arc::new(StoreAssetProvider::new(store)),
            Arc::clone(generator) as Arc<dyn ContentGenerator>,
            "_out",
        )
    }

    async fn eventually(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    async fn generated(resolution: Resolution) -> String {
        match resolution {
            Resolution::Generated(stream) => stream.collect().await.unwrap(),
            Resolution::Stored(page) => panic!("expected generation, got stored {}", page.key),
        }
    }

    #[tokio::test]
    async fn test_store_hit_skips_generation() {
        let store = Arc::new(MemoryPageStore::new().with_page("a.com/index.html", "cached"));
        let generator = Arc::new(ScriptedGenerator::from_tokens(&["<_out>new</_out>"]));

        let resolution = pipeline(&store, &generator).resolve("/a.com").await.unwrap();

        match resolution {
            Resolution::Stored(page) => assert_eq!(page.content, "cached"),
            Resolution::Generated(_) => panic!("expected stored page"),
        }
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_miss_generates_and_persists() {
        let store = Arc::new(MemoryPageStore::new());
        let generator = Arc::new(ScriptedGenerator::from_tokens(&[
            "<think>hmm</think>",
            "<_o",
            "ut><h1>Hi",
            "</h1></_out> bye",
        ]));
        let pipeline = pipeline(&store, &generator);

        let resolution = pipeline.resolve("a.com/page").await.unwrap();
        assert_eq!(resolution.key(), "a.com/page/index.html");
        assert_eq!(generated(resolution).await, "<h1>Hi</h1>");

        let page = store.get("a.com/page/index.html").await.unwrap().unwrap();
        assert_eq!(page.content, "<h1>Hi</h1>");
        assert!(!pipeline.coordinator().is_generating("a.com"));

        // Second request is a store hit.
        assert!(matches!(
            pipeline.resolve("a.com/page/").await.unwrap(),
            Resolution::Stored(_)
        ));
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_path_rejected_before_store() {
        let store = Arc::new(MemoryPageStore::new());
        let generator = Arc::new(ScriptedGenerator::from_tokens(&[]));

        let err = pipeline(&store, &generator)
            .resolve("a.com/app.js.map")
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 400);
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_generate_once() {
        let store = Arc::new(MemoryPageStore::new());
        let (generator, gate) =
            ScriptedGenerator::from_tokens(&["<_out>shared</_out>"]).gated();
        let generator = Arc::new(generator);
        let pipeline = pipeline(&store, &generator);

        let requests: Vec<_> = (0..8)
            .map(|_| {
                let pipeline = pipeline.clone();
                tokio::spawn(async move { pipeline.resolve("a.com").await })
            })
            .collect();

        eventually(|| pipeline.coordinator().waiters("a.com") == 7).await;
        gate.open();

        let mut bodies = Vec::new();
        for request in requests {
            bodies.push(match request.await.unwrap().unwrap() {
                Resolution::Generated(stream) => stream.collect().await.unwrap(),
                Resolution::Stored(page) => page.content,
            });
        }

        assert_eq!(generator.calls(), 1);
        assert!(bodies.iter().all(|b| b == "shared"));
        assert_eq!(store.upsert_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_distinct_keys_in_group_share_one_generation() {
        let store = Arc::new(MemoryPageStore::new());
        let (generator, gate) = ScriptedGenerator::from_tokens(&["<_out>home</_out>"]).gated();
        let generator = Arc::new(generator);
        let pipeline = pipeline(&store, &generator);

        let owner = tokio::spawn({
            let pipeline = pipeline.clone();
            async move { pipeline.resolve("a.com").await }
        });
        eventually(|| generator.calls() == 1).await;

        let waiters: Vec<_> = ["a.com/about", "a.com/style.css"]
            .into_iter()
            .map(|raw| {
                let pipeline = pipeline.clone();
                tokio::spawn(async move { pipeline.resolve(raw).await })
            })
            .collect();
        eventually(|| pipeline.coordinator().waiters("a.com") == 2).await;
        gate.open();

        assert_eq!(generated(owner.await.unwrap().unwrap()).await, "home");
        let mut unavailable = Vec::new();
        for waiter in waiters {
            match waiter.await.unwrap() {
                Err(PipelineError::Generation(GenerationError::Unavailable { key })) => {
                    unavailable.push(key);
                }
                other => panic!("expected unavailable, got {other:?}"),
            }
        }
        unavailable.sort();
        assert_eq!(
            unavailable,
            vec!["a.com/about/index.html", "a.com/style.css"]
        );
        assert_eq!(generator.calls(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_waiter_fails_when_owner_fails() {
        let store = Arc::new(MemoryPageStore::new());
        let (generator, gate) = ScriptedGenerator::failing(GenerationError::Status {
            status: 503,
            body: "overloaded".to_owned(),
        })
        .gated();
        let generator = Arc::new(generator);
        let pipeline = pipeline(&store, &generator);

        let owner = tokio::spawn({
            let pipeline = pipeline.clone();
            async move { pipeline.resolve("a.com/index.html").await }
        });
        eventually(|| generator.calls() == 1).await;
        let waiter = tokio::spawn({
            let pipeline = pipeline.clone();
            async move { pipeline.resolve("a.com/about.html").await }
        });
        eventually(|| pipeline.coordinator().waiters("a.com") == 1).await;
        gate.open();

        let owner_err = owner.await.unwrap().unwrap_err();
        let waiter_err = waiter.await.unwrap().unwrap_err();

        assert!(matches!(
            owner_err,
            PipelineError::Generation(GenerationError::Status { status: 503, .. })
        ));
        assert!(matches!(
            waiter_err,
            PipelineError::Generation(GenerationError::Unavailable { ref key }) if key == "a.com/about.html"
        ));
        assert_eq!(waiter_err.status_code(), 500);
        assert_eq!(generator.calls(), 1);
        assert!(!pipeline.coordinator().is_generating("a.com"));
    }

    #[tokio::test]
    async fn test_empty_output_not_cached() {
        let store = Arc::new(MemoryPageStore::new());
        let generator = Arc::new(ScriptedGenerator::from_tokens(&["no markers at all"]));
        let pipeline = pipeline(&store, &generator);

        let err = pipeline.resolve("a.com").await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Generation(GenerationError::Empty { .. })
        ));
        assert_eq!(store.upsert_count(), 0);
        eventually(|| !pipeline.coordinator().is_generating("a.com")).await;
    }

    #[tokio::test]
    async fn test_stream_error_after_content_not_persisted() {
        let store = Arc::new(MemoryPageStore::new());
        let generator = Arc::new(ScriptedGenerator::from_items(vec![
            Ok(crate::scripted::event_line("<_out>partial").into_bytes()),
            Err(GenerationError::Stream("connection reset".to_owned())),
        ]));
        let pipeline = pipeline(&store, &generator);

        let Resolution::Generated(mut stream) = pipeline.resolve("a.com").await.unwrap() else {
            panic!("expected generation");
        };

        assert_eq!(stream.next_chunk().await, Some(Ok("partial".to_owned())));
        assert!(matches!(
            stream.next_chunk().await,
            Some(Err(GenerationError::Stream(_)))
        ));
        assert_eq!(stream.next_chunk().await, None);
        assert!(store.is_empty());
        assert!(!pipeline.coordinator().is_generating("a.com"));
    }

    #[tokio::test]
    async fn test_persistence_failure_still_streams() {
        let store = Arc::new(MemoryPageStore::new());
        store.fail_upserts(true);
        let generator = Arc::new(ScriptedGenerator::from_tokens(&["<_out>fresh</_out>"]));
        let pipeline = pipeline(&store, &generator);

        let body = generated(pipeline.resolve("a.com").await.unwrap()).await;

        assert_eq!(body, "fresh");
        assert_eq!(store.upsert_count(), 1);
        assert!(store.is_empty());
        assert!(!pipeline.coordinator().is_generating("a.com"));

        // Nothing was cached, so the next request generates again.
        store.fail_upserts(false);
        generated(pipeline.resolve("a.com").await.unwrap()).await;
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test]
    async fn test_disconnected_client_still_persists() {
        let store = Arc::new(MemoryPageStore::new());
        let generator = Arc::new(ScriptedGenerator::from_tokens(&[
            "<_out>one ",
            "two ",
            "three</_out>",
        ]));
        let pipeline = pipeline(&store, &generator);

        let resolution = pipeline.resolve("a.com").await.unwrap();
        drop(resolution);

        eventually(|| !store.is_empty()).await;
        eventually(|| !pipeline.coordinator().is_generating("a.com")).await;
        let page = store.get("a.com/index.html").await.unwrap().unwrap();
        assert_eq!(page.content, "one two three");
    }

    #[tokio::test]
    async fn test_context_comes_from_group() {
        let store = Arc::new(
            MemoryPageStore::new()
                .with_page("a.com/index.html", "home")
                .with_page("b.com/index.html", "other"),
        );
        let generator = Arc::new(ScriptedGenerator::from_tokens(&["<_out>about</_out>"]));

        generated(pipeline(&store, &generator).resolve("a.com/about").await.unwrap()).await;

        let context = generator.last_context().unwrap();
        let paths: Vec<&str> = context.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(paths, vec!["a.com/index.html"]);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_delete_normalizes_path() {
        let store = Arc::new(MemoryPageStore::new().with_page("a.com/blog/index.html", "x"));
        let generator = Arc::new(ScriptedGenerator::from_tokens(&[]));
        let pipeline = pipeline(&store, &generator);

        let key = pipeline.delete("/a.com/blog/").await.unwrap();

        assert_eq!(key, "a.com/blog/index.html");
        assert!(store.is_empty());
        assert_eq!(pipeline.delete("").await.unwrap_err().status_code(), 404);
    }

    #[tokio::test]
    async fn test_into_stream_yields_all_chunks() {
        let store = Arc::new(MemoryPageStore::new());
        let generator = Arc::new(ScriptedGenerator::from_tokens(&[
            "<_out>a",
            "b",
            "c</_out>",
        ]));

        let resolution = pipeline(&store, &generator).resolve("a.com").await.unwrap();
        let Resolution::Generated(stream) = resolution else {
            panic!("expected generation");
        };
        let chunks: Vec<String> = stream.into_stream().map(Result::unwrap).collect().await;

        assert_eq!(chunks.concat(), "abc");
    }
}
