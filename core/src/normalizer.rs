//! Identity normalizer: the sole translation boundary from legacy slot
//! reference formats to the canonical [`SlotKey`].
//!
//! Three input shapes survive from earlier generations of the system:
//!
//! - `"<experienceId>_<slotId>"` - legacy composite keys,
//! - `"<experienceId>:<slotNumber>"` - direct 1-based index form,
//! - an explicit `(experienceId, slotId)` pair (also produced by parsing the
//!   canonical `"<experienceId>/<slotId>"` serialization).
//!
//! Resolution tries an exact match against the experience's slot ids first
//! and only then falls back to reading the trailing component as a 1-based
//! slot index. Unresolvable input is an error for the caller - it is never
//! silently defaulted to an empty slot, which is how the historical
//! double-counting bugs started.

use crate::catalog::ExperienceCatalog;
use crate::error::BookingError;
use crate::types::{ExperienceId, SlotId, SlotKey};

/// A raw slot reference in any of the supported formats.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlotRef {
    /// Legacy `"<experienceId>_<slotId>"` composite string.
    Composite(String),
    /// `"<experienceId>:<slotNumber>"` direct form.
    Indexed(String),
    /// Explicit pair; the most specific shape, wins over parsed guesses.
    Pair {
        /// Experience component.
        experience_id: ExperienceId,
        /// Slot component; exact id or a bare slot number.
        slot_id: SlotId,
    },
}

impl SlotRef {
    /// Classifies a raw string into its reference shape.
    ///
    /// The canonical `/` separator maps to [`SlotRef::Pair`]; `:` to the
    /// indexed form; anything else is treated as a legacy composite.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if let Some(pos) = raw.rfind('/') {
            let (experience, slot) = raw.split_at(pos);
            return Self::Pair {
                experience_id: ExperienceId::new(experience),
                slot_id: SlotId::new(&slot[1..]),
            };
        }
        if raw.contains(':') {
            return Self::Indexed(raw.to_string());
        }
        Self::Composite(raw.to_string())
    }
}

impl std::fmt::Display for SlotRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Composite(raw) | Self::Indexed(raw) => write!(f, "{raw}"),
            Self::Pair {
                experience_id,
                slot_id,
            } => write!(f, "{experience_id}/{slot_id}"),
        }
    }
}

/// Normalizes a raw slot reference into the canonical key.
///
/// Pure function of the catalog and the input.
///
/// # Errors
///
/// `UnknownExperience` when no prefix of the input names a catalogued
/// experience; `UnknownSlot` when the slot component resolves to nothing.
pub fn normalize(catalog: &ExperienceCatalog, slot_ref: &SlotRef) -> Result<SlotKey, BookingError> {
    match slot_ref {
        SlotRef::Pair {
            experience_id,
            slot_id,
        } => {
            if !catalog.contains(experience_id) {
                return Err(BookingError::UnknownExperience(experience_id.clone()));
            }
            resolve_component(catalog, experience_id, slot_id.as_str()).ok_or_else(|| {
                BookingError::UnknownSlot {
                    experience: experience_id.clone(),
                    slot: slot_id.as_str().to_string(),
                }
            })
        }
        SlotRef::Indexed(raw) => resolve_with_separator(catalog, raw, ':'),
        SlotRef::Composite(raw) => resolve_with_separator(catalog, raw, '_'),
    }
}

/// Splits `raw` on the last occurring `separator` and resolves the trailing
/// component against the prefix experience.
///
/// Experience ids may themselves contain the separator, so when the last
/// split does not name a known experience, earlier split points are tried
/// right to left before giving up.
fn resolve_with_separator(
    catalog: &ExperienceCatalog,
    raw: &str,
    separator: char,
) -> Result<SlotKey, BookingError> {
    let mut unresolved_slot: Option<BookingError> = None;

    for (pos, _) in raw.rmatch_indices(separator) {
        let prefix = &raw[..pos];
        let component = &raw[pos + separator.len_utf8()..];
        let experience_id = ExperienceId::new(prefix);
        if !catalog.contains(&experience_id) {
            continue;
        }
        match resolve_component(catalog, &experience_id, component) {
            Some(key) => return Ok(key),
            None => {
                if unresolved_slot.is_none() {
                    unresolved_slot = Some(BookingError::UnknownSlot {
                        experience: experience_id,
                        slot: component.to_string(),
                    });
                }
            }
        }
    }

    if let Some(err) = unresolved_slot {
        return Err(err);
    }

    let whole = ExperienceId::new(raw);
    if catalog.contains(&whole) {
        // A bare experience id carries no slot component at all.
        Err(BookingError::UnknownSlot {
            experience: whole,
            slot: String::new(),
        })
    } else {
        Err(BookingError::UnknownExperience(whole))
    }
}

/// Resolves one slot component: exact id match first, then the trailing
/// numeric suffix read as a 1-based slot index.
fn resolve_component(
    catalog: &ExperienceCatalog,
    experience_id: &ExperienceId,
    component: &str,
) -> Option<SlotKey> {
    let slots = catalog.slots(experience_id)?;

    if let Some(slot) = slots.iter().find(|slot| slot.id.as_str() == component) {
        return Some(SlotKey::new(experience_id.clone(), slot.id.clone()));
    }

    let index: usize = component.parse().ok()?;
    if index == 0 {
        return None;
    }
    slots
        .get(index - 1)
        .map(|slot| SlotKey::new(experience_id.clone(), slot.id.clone()))
}
