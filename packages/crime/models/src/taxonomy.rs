//! Crime description taxonomy.
//!
//! Maps free-text crime descriptions to a coarse [`CrimeCategory`]. The
//! category is an auxiliary modelling feature only; the violence label is
//! always taken from the crime domain through
//! [`DomainViolenceMap`](crate::DomainViolenceMap).

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Top-level crime category groupings.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CrimeCategory {
    /// Crimes against persons (homicide, assault, robbery, kidnapping)
    Violent,
    /// Crimes against property (burglary, theft, arson, vandalism)
    Property,
    /// Drug and narcotics offenses
    DrugNarcotics,
    /// Public order offenses (weapons, intoxication, traffic)
    PublicOrder,
    /// Fraud, counterfeiting, extortion, cybercrime
    FraudFinancial,
    /// Descriptions not matching any other category
    Other,
}

/// Keyword table checked in order; the first match wins. Violent terms come
/// first because descriptions like "armed robbery of vehicle" overlap.
const KEYWORDS: &[(CrimeCategory, &[&str])] = &[
    (
        CrimeCategory::Violent,
        &[
            "homicide",
            "murder",
            "manslaughter",
            "sexual assault",
            "rape",
            "kidnap",
            "abduction",
            "robbery",
            "assault",
            "battery",
            "domestic violence",
        ],
    ),
    (
        CrimeCategory::Property,
        &[
            "burglary",
            "vehicle - stolen",
            "vehicle theft",
            "shoplifting",
            "theft",
            "larceny",
            "arson",
            "vandalism",
        ],
    ),
    (
        CrimeCategory::DrugNarcotics,
        &["drug", "narcotic", "controlled substance"],
    ),
    (
        CrimeCategory::FraudFinancial,
        &[
            "fraud",
            "counterfeit",
            "forgery",
            "embezzlement",
            "identity theft",
            "extortion",
            "cybercrime",
        ],
    ),
    (
        CrimeCategory::PublicOrder,
        &[
            "firearm",
            "weapon",
            "illegal possession",
            "intoxication",
            "traffic",
            "disorderly",
            "trespass",
        ],
    ),
];

impl CrimeCategory {
    /// Classifies a crime description by case-insensitive keyword match.
    ///
    /// Returns [`CrimeCategory::Other`] when nothing matches.
    #[must_use]
    pub fn from_description(description: &str) -> Self {
        let lower = description.to_lowercase();

        // Identity theft contains "theft" but is a fraud offense.
        if lower.contains("identity theft") {
            return Self::FraudFinancial;
        }

        KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
            .map_or(Self::Other, |(category, _)| *category)
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Violent,
            Self::Property,
            Self::DrugNarcotics,
            Self::PublicOrder,
            Self::FraudFinancial,
            Self::Other,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_descriptions() {
        assert_eq!(
            CrimeCategory::from_description("HOMICIDE"),
            CrimeCategory::Violent
        );
        assert_eq!(
            CrimeCategory::from_description("VEHICLE - STOLEN"),
            CrimeCategory::Property
        );
        assert_eq!(
            CrimeCategory::from_description("DRUG OFFENSE"),
            CrimeCategory::DrugNarcotics
        );
        assert_eq!(
            CrimeCategory::from_description("FIREARM OFFENSE"),
            CrimeCategory::PublicOrder
        );
        assert_eq!(
            CrimeCategory::from_description("COUNTERFEITING"),
            CrimeCategory::FraudFinancial
        );
    }

    #[test]
    fn identity_theft_is_fraud_not_property() {
        assert_eq!(
            CrimeCategory::from_description("Identity Theft"),
            CrimeCategory::FraudFinancial
        );
    }

    #[test]
    fn unmatched_description_is_other() {
        assert_eq!(
            CrimeCategory::from_description("LOST PROPERTY REPORT"),
            CrimeCategory::Other
        );
        assert_eq!(CrimeCategory::from_description(""), CrimeCategory::Other);
    }

    #[test]
    fn every_keyword_category_is_listed() {
        for (category, _) in KEYWORDS {
            assert!(CrimeCategory::all().contains(category));
        }
    }
}
