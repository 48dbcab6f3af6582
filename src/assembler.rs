use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::document::{Document, DocumentMetadata, PackSections};
use crate::document_configuration::DocumentConfiguration;
use crate::error::{ContextError, ErrorKind};
use crate::measure::TextPainter;
use crate::render::PageRenderer;

/// Everything a generation is computed from, apart from the layout configuration.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub content: String,
    pub metadata: DocumentMetadata,
    pub sections: PackSections,
}

/// A rasterized page, keyed by the generation which produced it and its position.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub generation: u64,
    pub index: usize,
    pub image: RgbaImage,
}

/// The complete set of pages of one generation. Once published it is only ever replaced as a whole.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub generation: u64,
    pub metadata: DocumentMetadata,
    pub sections: PackSections,
    pub pages: Vec<RenderedPage>,
}

impl RenderedDocument {
    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn images(&self) -> impl Iterator<Item = &RgbaImage> {
        self.pages.iter().map(|page| &page.image)
    }
}

/// What became of a generation which ran to completion.
#[derive(Debug, Clone)]
pub enum GenerationOutcome {
    /// The pages replaced the previously published ones.
    Published(Arc<RenderedDocument>),
    /// A newer generation was requested in the meantime, so the pages were dropped.
    Discarded { generation: u64, superseded_by: u64 },
}

impl GenerationOutcome {
    pub fn published(&self) -> Option<&Arc<RenderedDocument>> {
        match self {
            GenerationOutcome::Published(document) => Some(document),
            GenerationOutcome::Discarded { .. } => None,
        }
    }
}

/// Decrements the in-flight counter however the generation ends, including cancellation.
struct InFlightGuard<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> InFlightGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        InFlightGuard { counter }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Turns requests into published page sets. Every request takes a new generation number and
/// only the pages of the latest generation are ever published: a generation which completes
/// after a newer one was requested is discarded instead.
pub struct DocumentAssembler {
    painter: Arc<dyn TextPainter>,
    configuration: RwLock<Arc<DocumentConfiguration>>,
    generation: AtomicU64,
    in_flight: AtomicUsize,
    published: RwLock<Option<Arc<RenderedDocument>>>,
}

impl DocumentAssembler {
    pub fn new(
        configuration: DocumentConfiguration,
        painter: Arc<dyn TextPainter>,
    ) -> Result<Self, ContextError> {
        configuration.validate()?;

        Ok(DocumentAssembler {
            painter,
            configuration: RwLock::new(Arc::new(configuration)),
            generation: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            published: RwLock::new(None),
        })
    }

    /// Swaps the layout configuration. Generations already running keep the one they started with.
    pub async fn reconfigure(
        &self,
        configuration: DocumentConfiguration,
    ) -> Result<(), ContextError> {
        configuration.validate()?;
        *self.configuration.write().await = Arc::new(configuration);
        log::debug!("Swapped the layout configuration");

        Ok(())
    }

    pub async fn configuration(&self) -> Arc<DocumentConfiguration> {
        self.configuration.read().await.clone()
    }

    /// The latest generation number handed out, 0 before the first request.
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn is_generating(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub async fn published(&self) -> Option<Arc<RenderedDocument>> {
        self.published.read().await.clone()
    }

    /// Lays out and renders the request, then publishes the pages unless a newer request arrived
    /// in the meantime. On failure nothing is published and the previous pages stay in place.
    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationOutcome, ContextError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlightGuard::new(&self.in_flight);
        let configuration = self.configuration().await;
        log::debug!("Started generation {}", generation);

        let pages = match self.render_pages(generation, &request, &configuration).await {
            Ok(pages) => pages,
            Err(error) => {
                log::error!("Generation {} failed: {}", generation, error);
                return Err(error);
            }
        };

        // The token is compared under the publication lock, so a stale set can never overwrite a newer one
        let mut published = self.published.write().await;
        let current_generation = self.current_generation();
        if current_generation != generation {
            log::warn!(
                "Discarded generation {}, superseded by generation {}",
                generation,
                current_generation
            );
            return Ok(GenerationOutcome::Discarded {
                generation,
                superseded_by: current_generation,
            });
        }

        let document = Arc::new(RenderedDocument {
            generation,
            metadata: request.metadata,
            sections: request.sections,
            pages,
        });
        *published = Some(document.clone());
        log::info!(
            "Published generation {} with {} pages",
            generation,
            document.total_pages()
        );

        Ok(GenerationOutcome::Published(document))
    }

    /// Like `generate`, but gives up once the deadline passes. A generation which timed out
    /// publishes nothing.
    pub async fn generate_with_timeout(
        &self,
        request: GenerationRequest,
        deadline: Duration,
    ) -> Result<GenerationOutcome, ContextError> {
        tokio::time::timeout(deadline, self.generate(request))
            .await
            .map_err(|error| {
                log::error!("A generation did not complete within {:?}", deadline);
                ContextError::with_error(
                    ErrorKind::Timeout,
                    format!("The generation did not complete within {:?}", deadline),
                    &error,
                )
            })?
    }

    /// Renders the pages strictly in index order, yielding to the other tasks between two pages.
    async fn render_pages(
        &self,
        generation: u64,
        request: &GenerationRequest,
        configuration: &DocumentConfiguration,
    ) -> Result<Vec<RenderedPage>, ContextError> {
        let document = Document::lay_out(
            &request.content,
            request.metadata.clone(),
            configuration,
            self.painter.as_ref(),
        )?;
        let renderer = PageRenderer::new(configuration, self.painter.as_ref());
        let total_pages = document.total_pages();

        let mut rendered_pages = Vec::with_capacity(total_pages);
        for page in &document.pages {
            let image = renderer.render(page, total_pages, &document.metadata)?;
            rendered_pages.push(RenderedPage {
                generation,
                index: page.index,
                image,
            });
            tokio::task::yield_now().await;
        }

        Ok(rendered_pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::{FixedAdvanceMetrics, FontSpec, TextMeasurer};
    use image::Rgba;
    use std::sync::atomic::AtomicBool;

    fn assembler() -> DocumentAssembler {
        DocumentAssembler::new(
            DocumentConfiguration::default(),
            Arc::new(FixedAdvanceMetrics::default()),
        )
        .unwrap()
    }

    /// Draws like `FixedAdvanceMetrics` until it is told to fail every measurement.
    #[derive(Default)]
    struct BreakablePainter {
        metrics: FixedAdvanceMetrics,
        broken: AtomicBool,
    }

    impl TextMeasurer for BreakablePainter {
        fn measure(&self, font: FontSpec, text: &str) -> Result<f32, ContextError> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(ContextError::with_context(
                    ErrorKind::Measurement,
                    "The font metrics are unavailable",
                ));
            }
            self.metrics.measure(font, text)
        }
    }

    impl TextPainter for BreakablePainter {
        fn paint_text(
            &self,
            canvas: &mut RgbaImage,
            font: FontSpec,
            text: &str,
            origin: [f32; 2],
            color: Rgba<u8>,
        ) -> Result<f32, ContextError> {
            self.metrics.paint_text(canvas, font, text, origin, color)
        }
    }

    fn request(content: &str) -> GenerationRequest {
        GenerationRequest {
            content: content.into(),
            metadata: DocumentMetadata {
                title: "Mr. Wise Legit Source".into(),
                board: "neco".into(),
                year: "2025".into(),
                subject: "Biology".into(),
            },
            sections: PackSections::all(),
        }
    }

    #[tokio::test]
    async fn a_completed_generation_is_published() {
        let assembler = assembler();
        assert!(assembler.published().await.is_none());

        let outcome = assembler.generate(request("Hello world")).await.unwrap();

        let document = outcome.published().unwrap().clone();
        assert_eq!(document.generation, 1);
        assert_eq!(document.total_pages(), 1);
        assert_eq!(document.pages[0].image.dimensions(), (1000, 1414));
        assert!(Arc::ptr_eq(&assembler.published().await.unwrap(), &document));
        assert!(!assembler.is_generating());
    }

    #[tokio::test]
    async fn a_superseded_generation_is_discarded() {
        let assembler = assembler();

        let (older, newer) = tokio::join!(
            assembler.generate(request("first version")),
            assembler.generate(request("second version")),
        );

        match older.unwrap() {
            GenerationOutcome::Discarded {
                generation,
                superseded_by,
            } => {
                assert_eq!(generation, 1);
                assert_eq!(superseded_by, 2);
            }
            GenerationOutcome::Published(_) => panic!("the older generation was published"),
        }
        assert!(newer.unwrap().published().is_some());
        assert_eq!(assembler.published().await.unwrap().generation, 2);
    }

    #[tokio::test]
    async fn a_failed_generation_keeps_the_previous_pages() {
        let assembler = assembler();
        assembler.generate(request("kept")).await.unwrap();

        let mut configuration = DocumentConfiguration::default();
        configuration.page_geometry.page_width = 0;
        assembler.reconfigure(configuration).await.unwrap();
        let error = assembler.generate(request("lost")).await.unwrap_err();

        assert_eq!(error.kind, ErrorKind::SurfaceCreation);
        assert_eq!(assembler.published().await.unwrap().generation, 1);
        assert_eq!(assembler.current_generation(), 2);
        assert!(!assembler.is_generating());
    }

    #[tokio::test]
    async fn a_measurement_failure_keeps_the_previous_pages() {
        let painter = Arc::new(BreakablePainter::default());
        let assembler =
            DocumentAssembler::new(DocumentConfiguration::default(), painter.clone()).unwrap();
        assembler.generate(request("kept")).await.unwrap();

        painter.broken.store(true, Ordering::SeqCst);
        let error = assembler.generate(request("lost")).await.unwrap_err();

        assert_eq!(error.kind, ErrorKind::Measurement);
        assert_eq!(assembler.published().await.unwrap().generation, 1);
        assert!(!assembler.is_generating());
    }

    #[test]
    fn an_invalid_initial_configuration_is_refused() {
        let mut configuration = DocumentConfiguration::default();
        configuration.page_geometry.line_height = f32::NAN;

        let error = DocumentAssembler::new(configuration, Arc::new(FixedAdvanceMetrics::default()))
            .err()
            .unwrap();

        assert_eq!(error.kind, ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn an_invalid_configuration_is_refused() {
        let assembler = assembler();
        let mut configuration = DocumentConfiguration::default();
        configuration.page_geometry.line_height = -1.0;

        let error = assembler.reconfigure(configuration).await.unwrap_err();

        assert_eq!(error.kind, ErrorKind::Configuration);
        assert_eq!(assembler.configuration().await.page_geometry.line_height, 34.0);
    }

    #[tokio::test]
    async fn identical_requests_render_identical_pages() {
        let assembler = assembler();
        let content = "*QUESTIONS*\n*1.* What is 2+2?\n```\nlet answer = 4;\n```";

        let first = assembler.generate(request(content)).await.unwrap();
        let second = assembler.generate(request(content)).await.unwrap();

        let first_images: Vec<_> = first.published().unwrap().images().cloned().collect();
        let second_images: Vec<_> = second.published().unwrap().images().cloned().collect();
        assert_eq!(first_images.len(), second_images.len());
        assert!(first_images
            .iter()
            .zip(&second_images)
            .all(|(first, second)| first.as_raw() == second.as_raw()));
    }

    #[tokio::test]
    async fn a_generation_past_its_deadline_times_out() {
        let assembler = assembler();
        let content = vec!["a line of content"; 100].join("\n");

        let error = assembler
            .generate_with_timeout(request(&content), Duration::ZERO)
            .await
            .unwrap_err();

        assert_eq!(error.kind, ErrorKind::Timeout);
        assert!(assembler.published().await.is_none());
        assert!(!assembler.is_generating());
    }
}
