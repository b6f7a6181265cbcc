use super::{ParseFailure, RawFields};
use regex::Regex;
use shared_types::VisaRecord;
use std::sync::OnceLock;

fn pair_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"([A-Za-z_][A-Za-z0-9_]*)\s*=\s*"([^"]*)""#)
            .expect("key-value pattern is valid")
    })
}

/// Collect every `identifier="value"` pair in the response.
///
/// Values are taken verbatim. Keys that never appear are left out rather than
/// defaulted; the record conversion decides what a missing key means.
pub fn parse_key_value_shape(response: &str) -> Result<VisaRecord, ParseFailure> {
    let fields: RawFields = pair_pattern()
        .captures_iter(response)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect();

    if fields.is_empty() {
        return Err(ParseFailure::NoKeyValuePairs);
    }

    fields.into_record()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::VisaRequirement;

    #[test]
    fn test_plain_pairs() {
        let record = parse_key_value_shape(
            r#"country="Japan" visaRequirement="Visa required" duration="N/A" notes="N/A""#,
        )
        .unwrap();

        assert_eq!(
            record,
            VisaRecord {
                country: "Japan".to_string(),
                visa_requirement: VisaRequirement::VisaRequired,
                duration: "N/A".to_string(),
                notes: "N/A".to_string(),
            }
        );
    }

    #[test]
    fn test_pairs_across_lines_with_spacing() {
        let response = "Sure!\ncountry = \"Georgia\"\nvisaRequirement = \"E-Visa\"\nduration = \"1 year\"\n";
        let record = parse_key_value_shape(response).unwrap();
        assert_eq!(record.country, "Georgia");
        assert_eq!(record.visa_requirement, VisaRequirement::EVisa);
        assert_eq!(record.duration, "1 year");
        assert_eq!(record.notes, "N/A");
    }

    #[test]
    fn test_value_case_preserved() {
        let record = parse_key_value_shape(
            r#"country="south KOREA" visaRequirement="Visa required" notes="K-ETA Not Accepted""#,
        )
        .unwrap();
        assert_eq!(record.country, "south KOREA");
        assert_eq!(record.notes, "K-ETA Not Accepted");
    }

    #[test]
    fn test_no_pairs() {
        assert_eq!(
            parse_key_value_shape("I could not find any visa information."),
            Err(ParseFailure::NoKeyValuePairs)
        );
    }

    #[test]
    fn test_pairs_without_country() {
        assert_eq!(
            parse_key_value_shape(r#"visaRequirement="Visa required""#),
            Err(ParseFailure::MissingCountry)
        );
    }
}
