mod prompt;
mod types;

pub use prompt::{build_prompt, SYSTEM_INSTRUCTION};
pub use types::{BatchReport, MessageOutcome, MessageStatus, PipelineOptions};

use crate::model::{ModelError, TextGenerator};
use extractors::{CountryDetector, ResponseParser};
use futures::stream::{self, StreamExt};
use shared_types::{truncate_chars, VisaRecord};
use std::sync::Arc;
use tracing::Instrument;
use types::BatchAggregator;

/// Characters of a message kept in failure logs.
const LOG_PREVIEW_CHARS: usize = 80;

/// Messages that survived country filtering, and what the model made of them
#[derive(Debug)]
pub struct Extraction<M> {
    pub filtered: Vec<(M, Vec<String>)>,
    pub report: BatchReport,
}

/// Drives one model call and one parse per message and deduplicates by country.
///
/// Holds no state between batches besides the model handle and the parser.
pub struct ExtractionPipeline {
    generator: Arc<dyn TextGenerator>,
    parser: ResponseParser,
    options: PipelineOptions,
}

impl ExtractionPipeline {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        parser: ResponseParser,
        options: PipelineOptions,
    ) -> Self {
        Self {
            generator,
            parser,
            options,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// The prompt asks for whichever shape the parser tries first.
    pub fn prompt_for(&self, message: &str) -> String {
        let shape = self.parser.shapes()[0];
        build_prompt(message, shape)
    }

    /// Run one message through the model and the parser.
    ///
    /// Model errors, timeouts and unparseable responses are logged and
    /// returned as outcomes; nothing here fails the batch.
    pub async fn process_message(&self, message: &str) -> MessageOutcome {
        let prompt = self.prompt_for(message);
        let timeout = self.options.call_timeout;

        let call = self.generator.generate(&prompt, &self.options.generation);
        let response = match tokio::time::timeout(timeout, call).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return self.model_call_failed(message, e),
            Err(_) => return self.model_call_failed(message, ModelError::Timeout(timeout)),
        };

        match self.parser.parse(&response) {
            Ok(record) => {
                tracing::debug!(country = %record.country, "Parsed visa record");
                MessageOutcome::Parsed(record)
            }
            Err(failure) => {
                tracing::warn!(
                    message = %truncate_chars(message, LOG_PREVIEW_CHARS),
                    raw_response = %response,
                    "Failed to parse model response: {}",
                    failure
                );
                MessageOutcome::ParseFailed(failure)
            }
        }
    }

    /// `process_message`, collapsed to the record or nothing
    pub async fn process_message_record(&self, message: &str) -> Option<VisaRecord> {
        self.process_message(message).await.into_record()
    }

    /// Records unique by country, in the order countries were first extracted.
    pub async fn process_batch<M: AsRef<str>>(&self, messages: &[M]) -> Vec<VisaRecord> {
        self.run_batch(messages).await.records
    }

    /// Like `process_batch`, also reporting what happened to every message.
    ///
    /// With `max_concurrent_calls > 1` model calls overlap, but outcomes are
    /// consumed in message order so the result matches a sequential run.
    pub async fn run_batch<M: AsRef<str>>(&self, messages: &[M]) -> BatchReport {
        let span = tracing::info_span!(
            "batch",
            messages = messages.len(),
            model = self.generator.model_name()
        );

        async move {
            let mut aggregator = BatchAggregator::default();
            let mut outcomes = stream::iter(messages.iter().enumerate())
                .map(|(index, message)| {
                    self.process_message(message.as_ref())
                        .instrument(tracing::info_span!("message", index))
                })
                .buffered(self.options.max_concurrent_calls.max(1));

            while let Some(outcome) = outcomes.next().await {
                aggregator.push(outcome);
            }

            let report = aggregator.finish();
            tracing::info!(
                processed = report.processed(),
                accepted = report.accepted(),
                skipped = report.skipped(),
                "Batch complete"
            );
            report
        }
        .instrument(span)
        .await
    }

    /// Filter `messages` through the detector, then run the survivors as one batch.
    pub async fn extract<M: AsRef<str>>(
        &self,
        detector: &CountryDetector,
        messages: Vec<M>,
    ) -> Extraction<M> {
        let filtered = detector.filter(messages);
        let texts: Vec<&str> = filtered
            .iter()
            .map(|(message, _)| AsRef::<str>::as_ref(message))
            .collect();
        let report = self.run_batch(&texts).await;

        Extraction { filtered, report }
    }

    fn model_call_failed(&self, message: &str, error: ModelError) -> MessageOutcome {
        tracing::warn!(
            message = %truncate_chars(message, LOG_PREVIEW_CHARS),
            "Model call failed: {}",
            error
        );
        MessageOutcome::ModelCallFailed(error.to_string())
    }
}
