//! Extractors Crate
//!
//! The two pure stages of RTD visa extraction: finding country references in
//! chat text, and turning a generative model's answer into a [`VisaRecord`].
//!
//! # Available Extractors
//!
//! - `CountryDetector`: word-bounded alias matching over ISO names and colloquial aliases
//! - `ResponseParser`: JSON-shape and key-value-shape parsing of model responses
//!
//! # Example
//!
//! ```rust,ignore
//! use extractors::{CountryDetector, ResponseParser};
//!
//! let detector = CountryDetector::new()?;
//! let countries = detector.detect("UK requires visa application through VFS");
//! let record = ResponseParser::default().parse(&model_response)?;
//! ```
//!
//! [`VisaRecord`]: shared_types::VisaRecord

pub mod country_detector;
pub mod response_parser;

// Re-export commonly used types
pub use country_detector::{CountryDetector, DetectorError};
pub use response_parser::{
    parse_json_shape, parse_key_value_shape, NoShapesConfigured, ParseFailure, RawFields,
    ResponseParser, ResponseShape,
};
