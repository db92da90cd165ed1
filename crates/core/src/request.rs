//! Generation request types, defaults, and normalization.
//!
//! A [`GenerationRequest`] is transient: it is never persisted as its own
//! entity. The pipeline snapshots it into the generation log and derives a
//! cache key from its normalized form.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Option defaults
// ---------------------------------------------------------------------------

/// Cuisine used when the requester expresses no preference.
pub const DEFAULT_CUISINE: &str = "Any";
/// Difficulty used when the requester expresses no preference.
pub const DEFAULT_DIFFICULTY: &str = "medium";
/// Time constraint used when the requester expresses no preference.
pub const DEFAULT_TIME: &str = "Any";
/// Servings used when the requester expresses no preference.
pub const DEFAULT_SERVINGS: i32 = 2;

/// Smallest accepted servings value.
pub const MIN_SERVINGS: i32 = 1;
/// Largest accepted servings value.
pub const MAX_SERVINGS: i32 = 10;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// User-supplied generation constraints. Every field is optional; defaults
/// are applied by [`GenerationOptions::normalized`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub cuisine: Option<String>,
    pub difficulty: Option<String>,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    pub time: Option<String>,
    pub servings: Option<i32>,
}

/// A [`GenerationOptions`] with defaults applied and dietary restrictions
/// sorted ascending. Two equivalent option sets (omitted vs. explicit
/// defaults, shuffled restrictions) normalize to the same value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedOptions {
    pub cuisine: String,
    pub difficulty: String,
    pub dietary_restrictions: Vec<String>,
    pub time: String,
    pub servings: i32,
}

impl GenerationOptions {
    /// Apply defaults and sort the dietary restrictions.
    pub fn normalized(&self) -> NormalizedOptions {
        let mut dietary = self.dietary_restrictions.clone();
        dietary.sort();

        NormalizedOptions {
            cuisine: self
                .cuisine
                .clone()
                .unwrap_or_else(|| DEFAULT_CUISINE.to_string()),
            difficulty: self
                .difficulty
                .clone()
                .unwrap_or_else(|| DEFAULT_DIFFICULTY.to_string()),
            dietary_restrictions: dietary,
            time: self.time.clone().unwrap_or_else(|| DEFAULT_TIME.to_string()),
            servings: self.servings.unwrap_or(DEFAULT_SERVINGS),
        }
    }
}

// ---------------------------------------------------------------------------
// Requester identity
// ---------------------------------------------------------------------------

/// Who is asking for a generation.
///
/// Guests are identified solely by IP address; a guest without an IP
/// cannot be constructed, so it can never reach the quota gate unkeyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requester {
    /// An authenticated user.
    User { id: DbId },
    /// An unauthenticated visitor, keyed by client IP.
    Guest { ip: IpAddr },
}

impl Requester {
    /// The user id to record on persisted rows (`None` for guests).
    pub fn user_id(&self) -> Option<DbId> {
        match self {
            Requester::User { id } => Some(*id),
            Requester::Guest { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// One request to synthesize a recipe from pantry ingredients.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Ingredient names in the order the requester supplied them. The
    /// original order is kept for prompting; keying sorts a copy.
    pub ingredients: Vec<String>,
    pub options: GenerationOptions,
    pub requester: Requester,
    /// Optional client-supplied id, carried through to the generation log
    /// for correlation. It does not deduplicate runs.
    pub request_id: Option<String>,
}

impl GenerationRequest {
    /// Check the request is well-formed: at least one non-blank ingredient
    /// and servings (when given) within bounds.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.ingredients.iter().any(|i| !i.trim().is_empty()) {
            return Err(CoreError::Validation(
                "At least one ingredient is required".to_string(),
            ));
        }
        if let Some(servings) = self.options.servings {
            if !(MIN_SERVINGS..=MAX_SERVINGS).contains(&servings) {
                return Err(CoreError::Validation(format!(
                    "Servings must be between {MIN_SERVINGS} and {MAX_SERVINGS}"
                )));
            }
        }
        Ok(())
    }

    /// Ingredients with blank entries dropped and whitespace trimmed,
    /// original order preserved.
    pub fn trimmed_ingredients(&self) -> Vec<String> {
        self.ingredients
            .iter()
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn guest() -> Requester {
        Requester::Guest {
            ip: "203.0.113.7".parse().unwrap(),
        }
    }

    #[test]
    fn normalization_applies_defaults() {
        let normalized = GenerationOptions::default().normalized();
        assert_eq!(normalized.cuisine, "Any");
        assert_eq!(normalized.difficulty, "medium");
        assert_eq!(normalized.time, "Any");
        assert_eq!(normalized.servings, 2);
        assert!(normalized.dietary_restrictions.is_empty());
    }

    #[test]
    fn normalization_sorts_dietary_restrictions() {
        let options = GenerationOptions {
            dietary_restrictions: vec!["vegan".to_string(), "gluten-free".to_string()],
            ..Default::default()
        };
        assert_eq!(
            options.normalized().dietary_restrictions,
            vec!["gluten-free", "vegan"],
        );
    }

    #[test]
    fn explicit_defaults_normalize_to_same_value() {
        let explicit = GenerationOptions {
            cuisine: Some("Any".to_string()),
            difficulty: Some("medium".to_string()),
            dietary_restrictions: vec![],
            time: Some("Any".to_string()),
            servings: Some(2),
        };
        assert_eq!(explicit.normalized(), GenerationOptions::default().normalized());
    }

    #[test]
    fn empty_ingredients_rejected() {
        let request = GenerationRequest {
            ingredients: vec![],
            options: GenerationOptions::default(),
            requester: guest(),
            request_id: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn blank_only_ingredients_rejected() {
        let request = GenerationRequest {
            ingredients: vec!["  ".to_string(), String::new()],
            options: GenerationOptions::default(),
            requester: guest(),
            request_id: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn servings_out_of_range_rejected() {
        let request = GenerationRequest {
            ingredients: vec!["egg".to_string()],
            options: GenerationOptions {
                servings: Some(11),
                ..Default::default()
            },
            requester: guest(),
            request_id: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn trimmed_ingredients_keeps_order() {
        let request = GenerationRequest {
            ingredients: vec![" milk ".to_string(), String::new(), "egg".to_string()],
            options: GenerationOptions::default(),
            requester: guest(),
            request_id: None,
        };
        assert_eq!(request.trimmed_ingredients(), vec!["milk", "egg"]);
    }

    #[test]
    fn guest_has_no_user_id() {
        assert_eq!(guest().user_id(), None);
        assert_eq!(Requester::User { id: 9 }.user_id(), Some(9));
    }
}
