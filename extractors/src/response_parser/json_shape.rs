use super::{ParseFailure, RawFields};
use serde_json::Value;
use shared_types::VisaRecord;

/// Parse the span from the first `{` to the last `}` as a JSON object.
///
/// Anything around the span is ignored, so a model that wraps its answer in
/// commentary still parses. Numbers and booleans are kept as their JSON text;
/// nulls, arrays and nested objects count as absent.
pub fn parse_json_shape(response: &str) -> Result<VisaRecord, ParseFailure> {
    let span = json_span(response).ok_or(ParseFailure::NoJsonObject)?;

    let value: Value =
        serde_json::from_str(span).map_err(|e| ParseFailure::InvalidJson(e.to_string()))?;
    let Value::Object(object) = value else {
        return Err(ParseFailure::InvalidJson("expected a JSON object".to_string()));
    };

    let fields: RawFields = object
        .into_iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((key, text))
        })
        .collect();

    fields.into_record()
}

fn json_span(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (end > start).then(|| &response[start..=end])
}
