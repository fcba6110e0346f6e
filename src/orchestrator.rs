//! Fans one uploaded image out to every catalog style and collects what succeeds.
//!
//! Each style runs as its own task. A branch always resolves to a tagged
//! [`GenerationOutcome`]: provider errors, missing images, deadline expiry and
//! panics are caught at the branch boundary so siblings keep running. The
//! batch only fails as a whole when no style produced an image.

use crate::{
    catalog::StyleCatalog,
    encoding::{Base64Encoder, ImageEncoder},
    error::{CaricatureError, Result},
    logger::Timer,
    models::{
        BatchState, FailureKind, GeneratedImage, GenerationBatchResult, GenerationOutcome,
        GenerationRequest, DEFAULT_MEDIA_TYPE,
    },
    providers::ImageProvider,
};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use uuid::Uuid;

#[derive(Clone)]
pub struct GenerationOrchestrator {
    provider: Arc<dyn ImageProvider>,
    catalog: Arc<StyleCatalog>,
    encoder: Arc<dyn ImageEncoder>,
    deadline: Option<Duration>,
}

impl GenerationOrchestrator {
    pub fn new(provider: Arc<dyn ImageProvider>, catalog: StyleCatalog) -> Self {
        Self {
            provider,
            catalog: Arc::new(catalog),
            encoder: Arc::new(Base64Encoder),
            deadline: None,
        }
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn ImageEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    /// Every branch still running when the deadline passes fails with
    /// [`FailureKind::DeadlineExceeded`].
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn catalog(&self) -> &StyleCatalog {
        &self.catalog
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn generate_styled_images(
        &self,
        image_bytes: &[u8],
        media_type: Option<&str>,
    ) -> Result<GenerationBatchResult> {
        let batch_id = Uuid::new_v4();
        let timer = Timer::new(format!("batch {}", batch_id));
        log_state(batch_id, BatchState::Received);

        if image_bytes.is_empty() {
            return Err(CaricatureError::NoImageProvided);
        }
        if !self.provider.is_configured() {
            return Err(CaricatureError::MissingCredentials(
                self.provider.name().to_string(),
            ));
        }

        let media_type = media_type
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MEDIA_TYPE);

        log_state(batch_id, BatchState::Encoding);
        let image = Arc::new(self.encoder.encode(image_bytes, media_type));

        let styles = self.catalog.list_styles();
        let deadline = self.deadline.map(|d| Instant::now() + d);

        // Dropping the set aborts whatever is still in flight.
        let mut branches = JoinSet::new();
        for (index, style) in styles.iter().enumerate() {
            let request = GenerationRequest::new(Arc::clone(&image), style.clone());
            let provider = Arc::clone(&self.provider);
            branches.spawn(async move { (index, run_branch(provider, request, deadline).await) });
        }
        log::info!(
            "Batch {} dispatched {} styles to {} ({} bytes, {})",
            batch_id,
            styles.len(),
            self.provider.name(),
            image.byte_len,
            image.media_type
        );
        log_state(batch_id, BatchState::Dispatched);

        log_state(batch_id, BatchState::Settling);
        let mut settled: Vec<Option<GenerationOutcome>> = styles.iter().map(|_| None).collect();
        while let Some(joined) = branches.join_next().await {
            match joined {
                Ok((index, outcome)) => settled[index] = Some(outcome),
                Err(e) => log::error!("Batch {} lost a branch task: {}", batch_id, e),
            }
        }

        let outcomes = settled
            .into_iter()
            .zip(styles)
            .map(|(outcome, style)| {
                outcome.unwrap_or_else(|| {
                    GenerationOutcome::failure(style, FailureKind::Panicked, "branch did not complete")
                })
            })
            .collect();

        let result = collect_batch(batch_id, outcomes, timer.elapsed());
        drop(timer);
        result
    }
}

async fn run_branch(
    provider: Arc<dyn ImageProvider>,
    request: GenerationRequest,
    deadline: Option<Instant>,
) -> GenerationOutcome {
    let call = AssertUnwindSafe(provider.generate(&request)).catch_unwind();
    let result = match deadline {
        Some(deadline) => match tokio::time::timeout_at(deadline, call).await {
            Ok(result) => result,
            Err(_) => Ok(Err(CaricatureError::DeadlineExceeded)),
        },
        None => call.await,
    };

    let style = &request.style;
    let outcome = match result {
        Ok(Ok(Some(image))) => GenerationOutcome::Success {
            style_id: style.id.clone(),
            display_name: style.display_name.clone(),
            image_data: image.to_data_uri(),
        },
        Ok(Ok(None)) => GenerationOutcome::failure(style, FailureKind::NoImage, "no image returned"),
        Ok(Err(e)) => GenerationOutcome::failure(style, FailureKind::from_error(&e), e.to_string()),
        Err(panic) => GenerationOutcome::failure(style, FailureKind::Panicked, panic_message(&panic)),
    };
    log::debug!(
        "Style {} settled with {}",
        outcome.style_id(),
        if outcome.is_success() { "an image" } else { "a failure" }
    );
    outcome
}

/// Keeps successes in catalog order and decides whether the batch as a whole failed.
fn collect_batch(
    batch_id: Uuid,
    outcomes: Vec<GenerationOutcome>,
    elapsed: Duration,
) -> Result<GenerationBatchResult> {
    let mut failed = 0;
    let mut all_transport = true;
    let mut first_reason = None;
    let mut images: Vec<GeneratedImage> = Vec::with_capacity(outcomes.len());

    for outcome in outcomes {
        if let GenerationOutcome::Failure {
            style_id,
            kind,
            reason,
        } = &outcome
        {
            log::warn!(
                "Batch {} style {} failed ({:?}): {}",
                batch_id,
                style_id,
                kind,
                reason
            );
            failed += 1;
            all_transport &= *kind == FailureKind::Transport;
            first_reason.get_or_insert_with(|| reason.clone());
        }
        images.extend(outcome.into_generated_image());
    }

    if images.is_empty() {
        log_state(batch_id, BatchState::AllFailed);
        return Err(match first_reason {
            Some(reason) if all_transport => CaricatureError::ProviderUnavailable(reason),
            _ => CaricatureError::AllStylesFailed { failed },
        });
    }

    log_state(batch_id, BatchState::Complete);
    log::info!(
        "Batch {} generated {} of {} styles",
        batch_id,
        images.len(),
        images.len() + failed
    );

    Ok(GenerationBatchResult {
        batch_id,
        images,
        failed,
        elapsed_ms: elapsed.as_millis() as u64,
    })
}

fn log_state(batch_id: Uuid, state: BatchState) {
    log::debug!("Batch {} -> {}", batch_id, state);
}

fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("branch panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("branch panicked: {}", message)
    } else {
        "branch panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EncodedImage, ProviderImage, StyleDefinition};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy)]
    enum Reply {
        Image,
        TextOnly,
        NetworkError,
        QuotaError,
        Panic,
    }

    struct ScriptedProvider {
        default: Reply,
        replies: HashMap<String, Reply>,
        delays: HashMap<String, Duration>,
        configured: bool,
        calls: AtomicUsize,
        completed: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(default: Reply) -> Self {
            Self {
                default,
                replies: HashMap::new(),
                delays: HashMap::new(),
                configured: true,
                calls: AtomicUsize::new(0),
                completed: AtomicUsize::new(0),
            }
        }

        fn reply(mut self, style_id: &str, reply: Reply) -> Self {
            self.replies.insert(style_id.to_string(), reply);
            self
        }

        fn delay(mut self, style_id: &str, delay: Duration) -> Self {
            self.delays.insert(style_id.to_string(), delay);
            self
        }

        fn unconfigured(mut self) -> Self {
            self.configured = false;
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ImageProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn generate(&self, request: &GenerationRequest) -> Result<Option<ProviderImage>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let style_id = request.style.id.as_str();
            if let Some(delay) = self.delays.get(style_id) {
                tokio::time::sleep(*delay).await;
            }
            self.completed.fetch_add(1, Ordering::SeqCst);

            match self.replies.get(style_id).copied().unwrap_or(self.default) {
                Reply::Image => Ok(Some(ProviderImage::new(
                    "image/png",
                    format!("{}-{}", style_id, request.image.data),
                ))),
                Reply::TextOnly => Ok(None),
                Reply::NetworkError => Err(CaricatureError::TransportError(
                    "error trying to connect: dns error".into(),
                )),
                Reply::QuotaError => Err(CaricatureError::ProviderError {
                    status: 429,
                    message: "RESOURCE_EXHAUSTED".into(),
                }),
                Reply::Panic => panic!("provider exploded on {}", style_id),
            }
        }
    }

    #[derive(Default)]
    struct CountingEncoder {
        calls: AtomicUsize,
    }

    impl ImageEncoder for CountingEncoder {
        fn encode(&self, bytes: &[u8], media_type: &str) -> EncodedImage {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Base64Encoder.encode(bytes, media_type)
        }
    }

    fn catalog_of(k: usize) -> StyleCatalog {
        StyleCatalog::new(
            (0..k)
                .map(|i| {
                    StyleDefinition::new(
                        format!("style-{}", i),
                        format!("Style {}", i),
                        format!("Render as style {}", i),
                    )
                })
                .collect(),
        )
        .unwrap()
    }

    fn orchestrator(provider: &Arc<ScriptedProvider>, catalog: StyleCatalog) -> GenerationOrchestrator {
        GenerationOrchestrator::new(provider.clone() as Arc<dyn ImageProvider>, catalog)
    }

    const PHOTO: &[u8] = b"\x89PNG\r\n\x1a\nfake-photo";

    #[tokio::test]
    async fn all_styles_succeed_in_catalog_order() {
        for k in [1, 2, 5, 14] {
            let provider = Arc::new(ScriptedProvider::new(Reply::Image));
            let catalog = catalog_of(k);
            let expected: Vec<String> = catalog.ids().iter().map(|id| id.to_string()).collect();

            let batch = orchestrator(&provider, catalog)
                .generate_styled_images(PHOTO, Some("image/png"))
                .await
                .unwrap();

            let ids: Vec<String> = batch.images.iter().map(|i| i.style_id.clone()).collect();
            assert_eq!(ids, expected);
            assert_eq!(batch.failed, 0);
            assert_eq!(provider.calls(), k);
            assert!(batch.images[0].image_data.starts_with("data:image/png;base64,"));
        }
    }

    #[tokio::test]
    async fn order_follows_catalog_not_completion() {
        // Earlier styles finish last.
        let provider = Arc::new(
            ScriptedProvider::new(Reply::Image)
                .delay("style-0", Duration::from_millis(120))
                .delay("style-1", Duration::from_millis(60)),
        );
        let batch = orchestrator(&provider, catalog_of(3))
            .generate_styled_images(PHOTO, None)
            .await
            .unwrap();

        let ids: Vec<&str> = batch.images.iter().map(|i| i.style_id.as_str()).collect();
        assert_eq!(ids, vec!["style-0", "style-1", "style-2"]);
    }

    #[tokio::test]
    async fn one_failure_still_yields_partial_success() {
        for k in [2, 4, 14] {
            let provider =
                Arc::new(ScriptedProvider::new(Reply::Image).reply("style-1", Reply::QuotaError));
            let batch = orchestrator(&provider, catalog_of(k))
                .generate_styled_images(PHOTO, Some("image/jpeg"))
                .await
                .unwrap();

            assert_eq!(batch.images.len(), k - 1);
            assert_eq!(batch.failed, 1);
            assert!(batch.is_partial());
            assert_eq!(batch.total(), k);
            assert!(batch.images.iter().all(|i| i.style_id != "style-1"));
        }
    }

    #[tokio::test]
    async fn every_style_failing_is_total_failure() {
        for k in [1, 3, 14] {
            let provider = Arc::new(ScriptedProvider::new(Reply::QuotaError));
            let err = orchestrator(&provider, catalog_of(k))
                .generate_styled_images(PHOTO, None)
                .await
                .unwrap_err();
            assert!(err.is_total_failure());
            match err {
                CaricatureError::AllStylesFailed { failed } => assert_eq!(failed, k),
                other => panic!("expected AllStylesFailed, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn mixed_failures_without_images_are_all_styles_failed() {
        let provider = Arc::new(
            ScriptedProvider::new(Reply::NetworkError).reply("style-0", Reply::TextOnly),
        );
        let err = orchestrator(&provider, catalog_of(3))
            .generate_styled_images(PHOTO, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CaricatureError::AllStylesFailed { failed: 3 }));
    }

    #[tokio::test]
    async fn network_errors_everywhere_mean_provider_unavailable() {
        let provider = Arc::new(ScriptedProvider::new(Reply::NetworkError));
        let result = orchestrator(&provider, catalog_of(3))
            .generate_styled_images(PHOTO, None)
            .await;

        match result {
            Err(CaricatureError::ProviderUnavailable(reason)) => {
                assert!(reason.contains("dns error"))
            }
            other => panic!("expected ProviderUnavailable, got {:?}", other),
        }
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn empty_image_is_rejected_before_any_call() {
        let provider = Arc::new(ScriptedProvider::new(Reply::Image));
        let err = orchestrator(&provider, catalog_of(4))
            .generate_styled_images(&[], Some("image/png"))
            .await
            .unwrap_err();
        assert!(matches!(err, CaricatureError::NoImageProvided));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn missing_credentials_are_rejected_before_any_call() {
        let provider = Arc::new(ScriptedProvider::new(Reply::Image).unconfigured());
        let err = orchestrator(&provider, catalog_of(4))
            .generate_styled_images(PHOTO, None)
            .await
            .unwrap_err();
        match err {
            CaricatureError::MissingCredentials(name) => assert_eq!(name, "scripted"),
            other => panic!("expected MissingCredentials, got {:?}", other),
        }
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn image_is_encoded_once_per_batch() {
        for k in [1, 14] {
            let provider = Arc::new(ScriptedProvider::new(Reply::Image));
            let encoder = Arc::new(CountingEncoder::default());
            let batch = orchestrator(&provider, catalog_of(k))
                .with_encoder(encoder.clone())
                .generate_styled_images(PHOTO, None)
                .await
                .unwrap();

            assert_eq!(batch.images.len(), k);
            assert_eq!(encoder.calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn text_only_style_is_dropped_silently() {
        let catalog = StyleCatalog::new(vec![
            StyleDefinition::new("classic", "Classic", "Classic colored caricature"),
            StyleDefinition::new("anime", "Anime", "Anime caricature"),
        ])
        .unwrap();
        let provider = Arc::new(ScriptedProvider::new(Reply::Image).reply("anime", Reply::TextOnly));

        let batch = orchestrator(&provider, catalog)
            .generate_styled_images(PHOTO, Some("image/png"))
            .await
            .unwrap();

        assert_eq!(batch.images.len(), 1);
        assert_eq!(batch.images[0].style_id, "classic");
        assert_eq!(batch.images[0].display_name, "Classic");
        assert_eq!(batch.failed, 1);
    }

    #[tokio::test]
    async fn panicking_branch_does_not_take_down_siblings() {
        let provider = Arc::new(ScriptedProvider::new(Reply::Image).reply("style-2", Reply::Panic));
        let batch = orchestrator(&provider, catalog_of(4))
            .generate_styled_images(PHOTO, None)
            .await
            .unwrap();

        assert_eq!(batch.images.len(), 3);
        assert_eq!(batch.failed, 1);
    }

    #[tokio::test]
    async fn deadline_fails_slow_styles_only() {
        let provider = Arc::new(
            ScriptedProvider::new(Reply::Image).delay("style-1", Duration::from_secs(30)),
        );
        let started = std::time::Instant::now();
        let batch = orchestrator(&provider, catalog_of(3))
            .with_deadline(Duration::from_millis(100))
            .generate_styled_images(PHOTO, None)
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        let ids: Vec<&str> = batch.images.iter().map(|i| i.style_id.as_str()).collect();
        assert_eq!(ids, vec!["style-0", "style-2"]);
        assert_eq!(batch.failed, 1);
    }

    #[tokio::test]
    async fn dropping_the_batch_aborts_outstanding_branches() {
        let provider = Arc::new(
            ScriptedProvider::new(Reply::Image)
                .delay("style-0", Duration::from_millis(200))
                .delay("style-1", Duration::from_millis(200)),
        );
        let orchestrator = orchestrator(&provider, catalog_of(2));

        let outer = tokio::time::timeout(
            Duration::from_millis(20),
            orchestrator.generate_styled_images(PHOTO, None),
        )
        .await;
        assert!(outer.is_err());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(provider.calls(), 2);
        assert_eq!(provider.completed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_media_type_falls_back_to_png() {
        let provider = Arc::new(ScriptedProvider::new(Reply::Image));
        let encoder = Arc::new(RecordingEncoder::default());
        orchestrator(&provider, catalog_of(1))
            .with_encoder(encoder.clone())
            .generate_styled_images(PHOTO, Some("  "))
            .await
            .unwrap();
        assert_eq!(
            encoder.media_type.lock().unwrap().as_deref(),
            Some(DEFAULT_MEDIA_TYPE)
        );
    }

    #[derive(Default)]
    struct RecordingEncoder {
        media_type: std::sync::Mutex<Option<String>>,
    }

    impl ImageEncoder for RecordingEncoder {
        fn encode(&self, bytes: &[u8], media_type: &str) -> EncodedImage {
            *self.media_type.lock().unwrap() = Some(media_type.to_string());
            Base64Encoder.encode(bytes, media_type)
        }
    }
}
