use super::ParseFailure;
use shared_types::{VisaRecord, VisaRequirement, NOT_AVAILABLE};
use std::collections::BTreeMap;

/// Field name → raw string value, exactly as a shape parser found them.
///
/// Missing keys stay missing here. Sentinels are filled in only by
/// [`RawFields::into_record`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFields(BTreeMap<String, String>);

impl RawFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later values for the same key overwrite earlier ones.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First non-blank value among `keys`, trimmed.
    fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|key| self.get(key))
            .map(str::trim)
            .find(|value| !value.is_empty())
    }

    pub fn into_record(self) -> Result<VisaRecord, ParseFailure> {
        let country = self
            .first_of(&["country"])
            .ok_or(ParseFailure::MissingCountry)?
            .to_string();

        let requirement_text = self
            .first_of(&["visaRequirement", "visa_requirement", "visarequirement"])
            .ok_or(ParseFailure::MissingField("visaRequirement"))?;
        let visa_requirement = requirement_text
            .parse::<VisaRequirement>()
            .map_err(|e| ParseFailure::UnknownVisaRequirement(e.0))?;

        let duration = self
            .first_of(&["duration"])
            .unwrap_or(NOT_AVAILABLE)
            .to_string();
        let notes = self.first_of(&["notes"]).unwrap_or(NOT_AVAILABLE).to_string();

        Ok(VisaRecord {
            country,
            visa_requirement,
            duration,
            notes,
        })
    }
}

impl FromIterator<(String, String)> for RawFields {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> RawFields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_sentinels_filled_for_missing_duration_and_notes() {
        let record = fields(&[("country", "Japan"), ("visaRequirement", "Visa required")])
            .into_record()
            .unwrap();
        assert_eq!(record.duration, "N/A");
        assert_eq!(record.notes, "N/A");
    }

    #[test]
    fn test_blank_country_is_missing() {
        let result = fields(&[("country", "   "), ("visaRequirement", "E-Visa")]).into_record();
        assert_eq!(result, Err(ParseFailure::MissingCountry));
    }

    #[test]
    fn test_missing_requirement() {
        let result = fields(&[("country", "Chile")]).into_record();
        assert_eq!(result, Err(ParseFailure::MissingField("visaRequirement")));
    }

    #[test]
    fn test_snake_case_requirement_key_accepted() {
        let record = fields(&[("country", "Chile"), ("visa_requirement", "visa free")])
            .into_record()
            .unwrap();
        assert_eq!(record.visa_requirement, VisaRequirement::VisaNotRequired);
    }

    #[test]
    fn test_unknown_requirement_keeps_raw_text() {
        let result = fields(&[("country", "Chile"), ("visaRequirement", "maybe")]).into_record();
        assert_eq!(
            result,
            Err(ParseFailure::UnknownVisaRequirement("maybe".to_string()))
        );
    }
}
