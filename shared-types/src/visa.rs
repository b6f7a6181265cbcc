use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Sentinel used for duration and notes when the model gave nothing usable.
pub const NOT_AVAILABLE: &str = "N/A";

/// Entry requirement for an RTD holder, as reported for one country
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum VisaRequirement {
    #[serde(rename = "Visa required")]
    VisaRequired,
    #[serde(rename = "Visa not required")]
    VisaNotRequired,
    #[serde(rename = "E-Visa")]
    EVisa,
    #[serde(rename = "Does not recognize RTD")]
    DoesNotRecognizeRtd,
}

impl VisaRequirement {
    pub const ALL: [VisaRequirement; 4] = [
        VisaRequirement::VisaRequired,
        VisaRequirement::VisaNotRequired,
        VisaRequirement::EVisa,
        VisaRequirement::DoesNotRecognizeRtd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VisaRequirement::VisaRequired => "Visa required",
            VisaRequirement::VisaNotRequired => "Visa not required",
            VisaRequirement::EVisa => "E-Visa",
            VisaRequirement::DoesNotRecognizeRtd => "Does not recognize RTD",
        }
    }
}

impl std::fmt::Display for VisaRequirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown visa requirement: {0:?}")]
pub struct UnknownVisaRequirement(pub String);

/// Lenient parse of model output.
///
/// Models rarely reproduce the exact label, so casing, punctuation and a few
/// common paraphrases ("visa-free", "eVisa", the long "does not recognize US
/// issued Refugee Travel Document" wording) are accepted.
impl FromStr for VisaRequirement {
    type Err = UnknownVisaRequirement;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .trim_end_matches('.')
            .to_lowercase()
            .replace(['-', '_'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        let requirement = match normalized.as_str() {
            "visa required" | "visa needed" | "required" => VisaRequirement::VisaRequired,
            "visa not required" | "no visa required" | "visa not needed" | "no visa needed"
            | "not required" | "visa free" => VisaRequirement::VisaNotRequired,
            "e visa" | "evisa" | "electronic visa" | "e visa required" => VisaRequirement::EVisa,
            other
                if other.starts_with("does not recognize")
                    || other.starts_with("doesn't recognize")
                    || other.starts_with("not recognized") =>
            {
                VisaRequirement::DoesNotRecognizeRtd
            }
            _ => return Err(UnknownVisaRequirement(s.to_string())),
        };

        Ok(requirement)
    }
}

/// Visa information for RTD holders, extracted from a single chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VisaRecord {
    pub country: String,
    #[serde(rename = "visaRequirement")]
    pub visa_requirement: VisaRequirement,
    pub duration: String,
    pub notes: String,
}

impl VisaRecord {
    pub fn has_notes(&self) -> bool {
        !self.notes.trim().is_empty() && self.notes != NOT_AVAILABLE
    }
}
