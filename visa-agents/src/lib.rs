pub mod config;
pub mod model;
pub mod pipeline;
pub mod sources;

pub use config::AppConfig;
pub use model::{GenerationOptions, ModelError, OllamaClient, TextGenerator};
pub use pipeline::{BatchReport, Extraction, ExtractionPipeline, MessageOutcome, PipelineOptions};
pub use sources::{MessageSource, SourceError, TelegramExportSource};
