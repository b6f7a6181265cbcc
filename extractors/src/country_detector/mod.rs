mod countries;
mod detector;

pub use countries::{COMMON_NAMES, ISO_COUNTRY_NAMES};
pub use detector::{CountryDetector, DetectorError};

/// Colloquial aliases per country group, on top of the ISO names.
///
/// Groups are only for readability. Matching never maps an alias back to its
/// group: "uk" and "britain" are reported as the literal text that matched.
pub const MANUAL_ALIASES: &[(&str, &[&str])] = &[
    ("uk", &["uk", "united kingdom", "britain", "great britain"]),
    (
        "usa",
        &["usa", "united states", "united states of america", "america"],
    ),
    ("uae", &["uae", "united arab emirates", "emirates", "dubai"]),
    ("korea", &["south korea", "north korea"]),
    ("russia", &["russia", "russian federation"]),
    ("china", &["china", "mainland china"]),
    ("taiwan", &["taiwan"]),
    ("vietnam", &["vietnam"]),
    ("laos", &["laos"]),
    ("iran", &["iran"]),
    ("myanmar", &["myanmar", "burma"]),
];

/// Generic words that must never count as a country reference.
pub const STOPLIST: &[&str] = &["country", "nation", "foreign"];

/// Every built-in alias: ISO names, common names and the manual table, lowercased.
pub fn builtin_aliases() -> impl Iterator<Item = String> {
    ISO_COUNTRY_NAMES
        .iter()
        .chain(COMMON_NAMES.iter())
        .chain(MANUAL_ALIASES.iter().flat_map(|(_, aliases)| aliases.iter()))
        .map(|alias| alias.to_lowercase())
}
