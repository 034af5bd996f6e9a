//! Crime-domain to violence-label classification.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::NormalizedIncident;

/// Configurable lookup from crime-domain text to the binary violence label.
///
/// Keys are matched case-insensitively after trimming whitespace. Domains
/// absent from the table label as non-violent; callers that need to audit
/// this use [`DomainViolenceMap::is_mapped`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, bool>", into = "BTreeMap<String, bool>")]
pub struct DomainViolenceMap {
    entries: BTreeMap<String, bool>,
}

fn domain_key(domain: &str) -> String {
    domain.trim().to_lowercase()
}

impl DomainViolenceMap {
    /// Builds a map from `(domain, is_violent)` pairs.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: AsRef<str>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(domain, violent)| (domain_key(domain.as_ref()), violent))
                .collect(),
        }
    }

    /// Returns the configured label for `domain`, or `None` if unmapped.
    #[must_use]
    pub fn lookup(&self, domain: &str) -> Option<bool> {
        self.entries.get(&domain_key(domain)).copied()
    }

    /// Returns whether `domain` has an explicit entry.
    #[must_use]
    pub fn is_mapped(&self, domain: &str) -> bool {
        self.lookup(domain).is_some()
    }

    /// Returns the violence label for `domain`.
    #[must_use]
    pub fn is_violent(&self, domain: &str) -> bool {
        self.lookup(domain).unwrap_or(false)
    }

    /// Number of configured domains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no domains are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Attaches the violence label to an incident.
    ///
    /// This is the only way to construct a [`CrimeRecord`], so the label is
    /// always a function of the crime domain alone.
    #[must_use]
    pub fn label(&self, incident: NormalizedIncident) -> CrimeRecord {
        let is_violent = self.is_violent(&incident.crime_domain);
        CrimeRecord {
            incident,
            is_violent,
        }
    }
}

impl Default for DomainViolenceMap {
    fn default() -> Self {
        Self::new([
            ("Violent Crime", true),
            ("Other Crime", false),
            ("Fire Accident", false),
            ("Traffic Fatality", false),
        ])
    }
}

impl From<BTreeMap<String, bool>> for DomainViolenceMap {
    fn from(entries: BTreeMap<String, bool>) -> Self {
        Self::new(entries)
    }
}

impl From<DomainViolenceMap> for BTreeMap<String, bool> {
    fn from(map: DomainViolenceMap) -> Self {
        map.entries
    }
}

/// A normalized incident together with its derived violence label.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrimeRecord {
    #[serde(flatten)]
    incident: NormalizedIncident,
    is_violent: bool,
}

impl CrimeRecord {
    /// The underlying normalized incident.
    #[must_use]
    pub const fn incident(&self) -> &NormalizedIncident {
        &self.incident
    }

    /// Whether the incident's crime domain is classified as violent.
    #[must_use]
    pub const fn is_violent(&self) -> bool {
        self.is_violent
    }

    /// Consumes the record and returns the incident without its label.
    #[must_use]
    pub fn into_incident(self) -> NormalizedIncident {
        self.incident
    }
}

impl std::ops::Deref for CrimeRecord {
    type Target = NormalizedIncident;

    fn deref(&self) -> &Self::Target {
        &self.incident
    }
}
