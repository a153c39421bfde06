//! Provider reference-data lookup.

use plancheck_types::{ProviderKey, SpecialtyCategory};
use std::collections::HashMap;

/// Supplies the specialty category of a provider.
///
/// Backed by external reference data; `None` means the provider is not
/// categorised and the standard decay policy applies.
pub trait SpecialtyDirectory: Send + Sync {
    fn specialty_of(&self, provider: &ProviderKey) -> Option<SpecialtyCategory>;
}

/// A fixed in-memory directory, loaded from configuration or built in tests.
#[derive(Clone, Debug, Default)]
pub struct StaticSpecialtyDirectory {
    entries: HashMap<ProviderKey, SpecialtyCategory>,
}

impl StaticSpecialtyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: impl Into<ProviderKey>, specialty: SpecialtyCategory) -> Self {
        self.insert(provider, specialty);
        self
    }

    pub fn insert(&mut self, provider: impl Into<ProviderKey>, specialty: SpecialtyCategory) {
        self.entries.insert(provider.into(), specialty);
    }

    /// Build from raw `provider -> label` pairs; labels are parsed leniently.
    pub fn from_labels<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let entries = pairs
            .into_iter()
            .map(|(provider, label)| (ProviderKey::new(provider), SpecialtyCategory::from_label(label)))
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SpecialtyDirectory for StaticSpecialtyDirectory {
    fn specialty_of(&self, provider: &ProviderKey) -> Option<SpecialtyCategory> {
        self.entries.get(provider).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_labels_parses_leniently() {
        let dir = StaticSpecialtyDirectory::from_labels([
            ("npi-1", "Mental Health"),
            ("npi-2", "not a specialty"),
        ]);
        assert_eq!(
            dir.specialty_of(&ProviderKey::new("npi-1")),
            Some(SpecialtyCategory::MentalHealth)
        );
        assert_eq!(
            dir.specialty_of(&ProviderKey::new("npi-2")),
            Some(SpecialtyCategory::Other)
        );
        assert_eq!(dir.specialty_of(&ProviderKey::new("npi-3")), None);
    }
}
