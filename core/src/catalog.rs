//! Experience catalog: the configured set of bookable experiences and slots.
//!
//! Experience ids are deliberately not unique - one row per language variant
//! shares the same id, and all variants share the same physical slots and
//! capacity pool. The catalog is read-only at runtime; capacity accounting
//! lives in the ledger and store.

use crate::types::{Experience, ExperienceId, SlotKey, TimeSlot};
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while loading a catalog definition.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The definition file was not valid JSON for the expected shape.
    #[error("invalid catalog definition: {0}")]
    Parse(#[from] serde_json::Error),

    /// An experience row declares no slots.
    #[error("experience {0} has no slots")]
    EmptyExperience(ExperienceId),

    /// Two language variants of the same experience disagree on slots.
    #[error("experience {0} has variants with diverging slots")]
    DivergingVariants(ExperienceId),
}

/// On-disk catalog definition: experience rows plus the alias remappings the
/// resolver applies to legacy CRM custom-object ids.
#[derive(Debug, Deserialize)]
pub struct CatalogDefinition {
    /// Experience rows (one per language variant).
    pub experiences: Vec<Experience>,
    /// Alias source id → canonical experience id.
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

impl CatalogDefinition {
    /// Parses a catalog definition from JSON.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` when the JSON does not match the
    /// expected shape.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// In-memory index over the experience rows.
pub struct ExperienceCatalog {
    experiences: Vec<Experience>,
    // Variant row indices per experience id, insertion order preserved.
    by_id: HashMap<ExperienceId, Vec<usize>>,
    // Unique ids in first-seen order, for stable listings.
    ordered_ids: Vec<ExperienceId>,
}

impl ExperienceCatalog {
    /// Builds the catalog index from experience rows.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyExperience` for a row without slots and
    /// `CatalogError::DivergingVariants` when language variants of one id
    /// disagree on slot ids or capacities (slots are physical and shared).
    pub fn new(experiences: Vec<Experience>) -> Result<Self, CatalogError> {
        let mut by_id: HashMap<ExperienceId, Vec<usize>> = HashMap::new();
        let mut ordered_ids = Vec::new();

        for (idx, experience) in experiences.iter().enumerate() {
            if experience.slots.is_empty() {
                return Err(CatalogError::EmptyExperience(experience.id.clone()));
            }
            let variants = by_id.entry(experience.id.clone()).or_default();
            if let Some(&first) = variants.first() {
                let reference = &experiences[first].slots;
                let same = reference.len() == experience.slots.len()
                    && reference.iter().zip(&experience.slots).all(|(a, b)| {
                        a.id == b.id && a.max_participants == b.max_participants
                    });
                if !same {
                    return Err(CatalogError::DivergingVariants(experience.id.clone()));
                }
            } else {
                ordered_ids.push(experience.id.clone());
            }
            variants.push(idx);
        }

        Ok(Self {
            experiences,
            by_id,
            ordered_ids,
        })
    }

    /// Whether the catalog knows the experience id.
    #[must_use]
    pub fn contains(&self, id: &ExperienceId) -> bool {
        self.by_id.contains_key(id)
    }

    /// All language variant rows for an experience id.
    pub fn variants(&self, id: &ExperienceId) -> impl Iterator<Item = &Experience> {
        self.by_id
            .get(id)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.experiences[idx])
    }

    /// The first variant row for an id; the authoritative slot source.
    #[must_use]
    pub fn primary(&self, id: &ExperienceId) -> Option<&Experience> {
        self.by_id
            .get(id)
            .and_then(|variants| variants.first())
            .map(|&idx| &self.experiences[idx])
    }

    /// The variant row matching a language, falling back to the first one.
    #[must_use]
    pub fn variant_for_language(&self, id: &ExperienceId, language: &str) -> Option<&Experience> {
        self.variants(id)
            .find(|e| e.language == language)
            .or_else(|| self.primary(id))
    }

    /// Slots of an experience, shared across its variants.
    #[must_use]
    pub fn slots(&self, id: &ExperienceId) -> Option<&[TimeSlot]> {
        self.primary(id).map(|e| e.slots.as_slice())
    }

    /// The slot a canonical key points at, if the key is valid.
    #[must_use]
    pub fn slot(&self, key: &SlotKey) -> Option<&TimeSlot> {
        self.slots(&key.experience_id)?
            .iter()
            .find(|slot| slot.id == key.slot_id)
    }

    /// Unique experience ids in catalog order.
    pub fn experience_ids(&self) -> impl Iterator<Item = &ExperienceId> {
        self.ordered_ids.iter()
    }

    /// All experience rows, variants included, in catalog order.
    #[must_use]
    pub fn rows(&self) -> &[Experience] {
        &self.experiences
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::types::SlotId;
    use chrono::{TimeZone, Utc};

    pub(crate) fn slot(id: &ExperienceId, number: u32, max: u32) -> TimeSlot {
        let start = Utc.with_ymd_and_hms(2026, 3, 14, 9 + number, 0, 0).single().unwrap();
        TimeSlot {
            id: SlotId::from_number(id, number),
            max_participants: max,
            start_time: start,
            end_time: start + chrono::Duration::minutes(45),
        }
    }

    pub(crate) fn experience(id: &str, language: &str, slot_caps: &[u32]) -> Experience {
        let experience_id = ExperienceId::new(id);
        let slots = slot_caps
            .iter()
            .enumerate()
            .map(|(i, &max)| slot(&experience_id, u32::try_from(i).unwrap() + 1, max))
            .collect();
        Experience {
            id: experience_id,
            title: format!("{id} ({language})"),
            course: "Engineering".to_string(),
            location: "Building A".to_string(),
            language: language.to_string(),
            slots,
        }
    }

    pub(crate) fn catalog_with(rows: Vec<Experience>) -> ExperienceCatalog {
        ExperienceCatalog::new(rows).unwrap()
    }

    #[test]
    fn language_variants_share_one_id() {
        let catalog = catalog_with(vec![
            experience("robotics", "it", &[5, 5]),
            experience("robotics", "en", &[5, 5]),
        ]);
        let id = ExperienceId::new("robotics");
        assert_eq!(catalog.variants(&id).count(), 2);
        assert_eq!(catalog.experience_ids().count(), 1);
        assert_eq!(catalog.slots(&id).unwrap().len(), 2);
    }

    #[test]
    fn variant_for_language_falls_back_to_primary() {
        let catalog = catalog_with(vec![
            experience("robotics", "it", &[5]),
            experience("robotics", "en", &[5]),
        ]);
        let id = ExperienceId::new("robotics");
        assert_eq!(catalog.variant_for_language(&id, "en").unwrap().language, "en");
        assert_eq!(catalog.variant_for_language(&id, "de").unwrap().language, "it");
    }

    #[test]
    fn slot_lookup_by_canonical_key() {
        let catalog = catalog_with(vec![experience("X", "it", &[3, 7])]);
        let key = SlotKey::new(ExperienceId::new("X"), SlotId::new("X-2"));
        assert_eq!(catalog.slot(&key).unwrap().max_participants, 7);
        let missing = SlotKey::new(ExperienceId::new("X"), SlotId::new("X-9"));
        assert!(catalog.slot(&missing).is_none());
    }

    #[test]
    fn diverging_variants_are_rejected() {
        let result = ExperienceCatalog::new(vec![
            experience("X", "it", &[3]),
            experience("X", "en", &[4]),
        ]);
        assert!(matches!(result, Err(CatalogError::DivergingVariants(_))));
    }

    #[test]
    fn definition_parses_aliases() {
        let json = r#"{
            "experiences": [{
                "id": "1437",
                "title": "Robotics Lab",
                "course": "Engineering",
                "location": "Building A",
                "language": "it",
                "slots": [{
                    "id": "1437-1",
                    "max_participants": 20,
                    "start_time": "2026-03-14T10:00:00Z",
                    "end_time": "2026-03-14T10:45:00Z"
                }]
            }],
            "aliases": {"9001": "1437"}
        }"#;
        let definition = CatalogDefinition::from_json(json).unwrap();
        assert_eq!(definition.aliases.get("9001").map(String::as_str), Some("1437"));
        assert_eq!(definition.experiences.len(), 1);
    }
}
