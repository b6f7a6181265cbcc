use crate::model::GenerationOptions;
use extractors::ParseFailure;
use serde::Serialize;
use shared_types::VisaRecord;
use std::collections::HashSet;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub generation: GenerationOptions,
    /// Upper bound for one model call, including the HTTP round trip
    pub call_timeout: Duration,
    /// Model calls in flight at once; 1 means strictly sequential
    pub max_concurrent_calls: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            generation: GenerationOptions::default(),
            call_timeout: Duration::from_secs(120),
            max_concurrent_calls: 1,
        }
    }
}

/// Result of running one message through the model and the parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    Parsed(VisaRecord),
    ModelCallFailed(String),
    ParseFailed(ParseFailure),
}

impl MessageOutcome {
    pub fn into_record(self) -> Option<VisaRecord> {
        match self {
            MessageOutcome::Parsed(record) => Some(record),
            _ => None,
        }
    }
}

/// Terminal state of a message within a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageStatus {
    Accepted,
    SkippedDuplicate,
    ModelCallFailed,
    ParseFailed,
}

/// Deduplicated records plus the fate of every message in the batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub records: Vec<VisaRecord>,
    pub statuses: Vec<MessageStatus>,
}

impl BatchReport {
    fn count(&self, status: MessageStatus) -> usize {
        self.statuses.iter().filter(|s| **s == status).count()
    }

    pub fn processed(&self) -> usize {
        self.statuses.len()
    }

    pub fn accepted(&self) -> usize {
        self.count(MessageStatus::Accepted)
    }

    pub fn duplicates(&self) -> usize {
        self.count(MessageStatus::SkippedDuplicate)
    }

    pub fn model_failures(&self) -> usize {
        self.count(MessageStatus::ModelCallFailed)
    }

    pub fn parse_failures(&self) -> usize {
        self.count(MessageStatus::ParseFailed)
    }

    /// Messages that contributed no record
    pub fn skipped(&self) -> usize {
        self.processed() - self.accepted()
    }
}

/// Single-writer dedup over outcomes arriving in message order.
#[derive(Debug, Default)]
pub(crate) struct BatchAggregator {
    seen_countries: HashSet<String>,
    report: BatchReport,
}

impl BatchAggregator {
    pub(crate) fn push(&mut self, outcome: MessageOutcome) -> MessageStatus {
        let status = match outcome {
            MessageOutcome::Parsed(record) if record.country.trim().is_empty() => {
                MessageStatus::ParseFailed
            }
            MessageOutcome::Parsed(record) => {
                if self.seen_countries.insert(record.country.clone()) {
                    self.report.records.push(record);
                    MessageStatus::Accepted
                } else {
                    tracing::debug!(country = %record.country, "Skipping duplicate country");
                    MessageStatus::SkippedDuplicate
                }
            }
            MessageOutcome::ModelCallFailed(_) => MessageStatus::ModelCallFailed,
            MessageOutcome::ParseFailed(_) => MessageStatus::ParseFailed,
        };

        self.report.statuses.push(status);
        status
    }

    pub(crate) fn finish(self) -> BatchReport {
        self.report
    }
}
