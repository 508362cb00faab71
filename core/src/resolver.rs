//! Experience catalog resolver: reconciles CRM custom-object ids with
//! internal experience ids.
//!
//! The CRM side is loosely typed - ids arrive as numbers or strings - so
//! every comparison goes through this one place: string equality first,
//! numeric equality only when both sides parse as integers. Legacy
//! custom-object ids that denote the same course are folded together by a
//! configurable alias map before matching.

use crate::types::{CustomObjectId, ExperienceId};
use std::collections::HashMap;

/// Pure resolver from CRM custom-object ids to eligible experience ids.
#[derive(Clone, Debug, Default)]
pub struct CatalogResolver {
    // Alias source id → canonical id, applied before matching.
    aliases: HashMap<String, String>,
}

impl CatalogResolver {
    /// Creates a resolver with an alias remapping table.
    #[must_use]
    pub fn new(aliases: HashMap<String, String>) -> Self {
        Self { aliases }
    }

    /// Applies the alias table to one raw id.
    fn remap<'a>(&'a self, raw: &'a str) -> &'a str {
        self.aliases.get(raw).map_or(raw, String::as_str)
    }

    /// Matches one custom-object id against the course ids.
    ///
    /// Exact string equality wins; the numeric comparison only runs when
    /// both sides parse as integers. First match wins.
    fn match_course<'a>(candidate: &str, course_ids: &'a [ExperienceId]) -> Option<&'a ExperienceId> {
        if let Some(found) = course_ids.iter().find(|id| id.as_str() == candidate) {
            return Some(found);
        }
        let candidate_num: i64 = candidate.parse().ok()?;
        course_ids
            .iter()
            .find(|id| id.as_str().parse::<i64>() == Ok(candidate_num))
    }

    /// Resolves the experiences a contact may book from its CRM
    /// custom-object associations.
    ///
    /// Unmatched ids are dropped, not errors - a contact may be associated
    /// with custom objects irrelevant to this event. After alias remapping,
    /// duplicate canonical ids collapse to their first occurrence.
    #[must_use]
    pub fn resolve_eligible_experiences(
        &self,
        custom_object_ids: &[CustomObjectId],
        course_ids: &[ExperienceId],
    ) -> Vec<ExperienceId> {
        let mut matched = Vec::new();
        for raw in custom_object_ids {
            let candidate = self.remap(raw.as_str());
            if let Some(found) = Self::match_course(candidate, course_ids) {
                if !matched.contains(found) {
                    matched.push(found.clone());
                }
            }
        }
        matched
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<CustomObjectId> {
        raw.iter().map(|s| CustomObjectId::new(*s)).collect()
    }

    fn courses(raw: &[&str]) -> Vec<ExperienceId> {
        raw.iter().map(|s| ExperienceId::new(*s)).collect()
    }

    #[test]
    fn exact_string_match_wins_before_numeric() {
        let resolver = CatalogResolver::default();
        // "007" equals 7 numerically, but "7" matches "7" exactly first.
        let eligible = resolver
            .resolve_eligible_experiences(&ids(&["7"]), &courses(&["7", "007"]));
        assert_eq!(eligible, courses(&["7"]));
    }

    #[test]
    fn numeric_fallback_requires_both_sides_to_parse() {
        let resolver = CatalogResolver::default();
        let eligible = resolver
            .resolve_eligible_experiences(&ids(&["0042"]), &courses(&["42", "robotics"]));
        assert_eq!(eligible, courses(&["42"]));

        let none = resolver
            .resolve_eligible_experiences(&ids(&["42x"]), &courses(&["42"]));
        assert!(none.is_empty());
    }

    #[test]
    fn unmatched_ids_are_dropped_silently() {
        let resolver = CatalogResolver::default();
        let eligible = resolver.resolve_eligible_experiences(
            &ids(&["unrelated", "1437"]),
            &courses(&["1437"]),
        );
        assert_eq!(eligible, courses(&["1437"]));
    }

    #[test]
    fn aliases_collapse_to_a_single_canonical_entry() {
        let aliases = HashMap::from([
            ("A".to_string(), "C".to_string()),
            ("B".to_string(), "C".to_string()),
        ]);
        let resolver = CatalogResolver::new(aliases);
        let eligible = resolver
            .resolve_eligible_experiences(&ids(&["A", "B", "A"]), &courses(&["C", "D"]));
        assert_eq!(eligible, courses(&["C"]));
    }

    #[test]
    fn order_of_first_occurrence_is_preserved() {
        let resolver = CatalogResolver::default();
        let eligible = resolver.resolve_eligible_experiences(
            &ids(&["20", "10", "20"]),
            &courses(&["10", "20"]),
        );
        assert_eq!(eligible, courses(&["20", "10"]));
    }
}
