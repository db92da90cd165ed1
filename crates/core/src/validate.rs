//! Structural validation of model output.
//!
//! The inference provider returns semi-structured JSON. Nothing downstream
//! is allowed to touch that raw payload: it crosses exactly one boundary,
//! here, and comes out as a strongly-typed [`RecipeDraft`] or a typed
//! failure. Validation is purely structural: presence and shape of fields,
//! never whether the recipe is edible or the macros add up.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Failure
// ---------------------------------------------------------------------------

/// Why a model payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationFailure {
    #[error("model output is not a JSON object")]
    NotAnObject,

    #[error("model output is missing required field \"{0}\"")]
    MissingField(&'static str),

    #[error("model output field \"{field}\" is not {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("model output field \"{0}\" must not be empty")]
    EmptyList(&'static str),
}

// ---------------------------------------------------------------------------
// Draft
// ---------------------------------------------------------------------------

/// A structurally-verified recipe, ready to persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDraft {
    pub title: String,
    pub description: String,
    pub cuisine: String,
    pub difficulty: String,
    /// Preparation time in minutes.
    pub prep_time: i32,
    /// Cooking time in minutes.
    pub cook_time: i32,
    pub servings: i32,
    /// Ingredient entries as returned by the model (`{item, amount, unit}`
    /// objects). Only presence is enforced, not per-item schema.
    pub ingredients: Vec<serde_json::Value>,
    pub instructions: Vec<String>,
    /// Structured macro estimate, when the model supplied one.
    pub nutritional_estimate: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub tags: Vec<String>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Verify a raw model payload and lift it into a [`RecipeDraft`].
pub fn validate(payload: &serde_json::Value) -> Result<RecipeDraft, ValidationFailure> {
    let object = payload.as_object().ok_or(ValidationFailure::NotAnObject)?;

    let title = require_string(object, "title")?;
    let description = require_string(object, "description")?;
    let cuisine = require_string(object, "cuisine")?;
    let difficulty = require_string(object, "difficulty")?;
    let prep_time = require_minutes(object, "prep_time")?;
    let cook_time = require_minutes(object, "cook_time")?;
    let servings = require_minutes(object, "servings")?;

    let ingredients = require_non_empty_array(object, "ingredients")?.to_vec();

    let instructions_raw = require_non_empty_array(object, "instructions")?;
    let mut instructions = Vec::with_capacity(instructions_raw.len());
    for step in instructions_raw {
        let text = step.as_str().ok_or(ValidationFailure::WrongType {
            field: "instructions",
            expected: "an array of strings",
        })?;
        instructions.push(text.to_string());
    }

    let nutritional_estimate = match object.get("nutritional_estimate") {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::Object(map)) => Some(map.clone()),
        Some(_) => {
            return Err(ValidationFailure::WrongType {
                field: "nutritional_estimate",
                expected: "an object",
            })
        }
    };

    // Tags are advisory metadata; non-string entries are dropped rather
    // than failing the whole payload.
    let tags = object
        .get("tags")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|t| t.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    Ok(RecipeDraft {
        title,
        description,
        cuisine,
        difficulty,
        prep_time,
        cook_time,
        servings,
        ingredients,
        instructions,
        nutritional_estimate,
        tags,
    })
}

// ---- field helpers ----

fn require_string(
    object: &serde_json::Map<String, serde_json::Value>,
    field: &'static str,
) -> Result<String, ValidationFailure> {
    match object.get(field) {
        None | Some(serde_json::Value::Null) => Err(ValidationFailure::MissingField(field)),
        Some(serde_json::Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ValidationFailure::WrongType {
            field,
            expected: "a string",
        }),
    }
}

/// Accept integer or float minute counts; models are inconsistent about
/// numeric types.
fn require_minutes(
    object: &serde_json::Map<String, serde_json::Value>,
    field: &'static str,
) -> Result<i32, ValidationFailure> {
    match object.get(field) {
        None | Some(serde_json::Value::Null) => Err(ValidationFailure::MissingField(field)),
        Some(value) => value
            .as_i64()
            .or_else(|| value.as_f64().map(|f| f as i64))
            .map(|v| v as i32)
            .ok_or(ValidationFailure::WrongType {
                field,
                expected: "a number",
            }),
    }
}

fn require_non_empty_array<'a>(
    object: &'a serde_json::Map<String, serde_json::Value>,
    field: &'static str,
) -> Result<&'a Vec<serde_json::Value>, ValidationFailure> {
    match object.get(field) {
        None | Some(serde_json::Value::Null) => Err(ValidationFailure::MissingField(field)),
        Some(serde_json::Value::Array(items)) => {
            if items.is_empty() {
                Err(ValidationFailure::EmptyList(field))
            } else {
                Ok(items)
            }
        }
        Some(_) => Err(ValidationFailure::WrongType {
            field,
            expected: "an array",
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn complete_payload() -> serde_json::Value {
        json!({
            "title": "Tomato Basil Pasta",
            "description": "A quick weeknight pasta.",
            "cuisine": "Italian",
            "difficulty": "easy",
            "prep_time": 10,
            "cook_time": 20,
            "servings": 2,
            "ingredients": [
                {"item": "pasta", "amount": "200", "unit": "g"},
                {"item": "tomato", "amount": "3", "unit": "pieces"}
            ],
            "instructions": ["Boil the pasta.", "Simmer the sauce.", "Combine."],
            "nutritional_estimate": {"calories": 520, "protein": 18, "carbs": 80, "fat": 12},
            "tags": ["pasta", "quick"]
        })
    }

    #[test]
    fn complete_payload_is_valid() {
        let draft = validate(&complete_payload()).expect("payload should validate");
        assert_eq!(draft.title, "Tomato Basil Pasta");
        assert_eq!(draft.ingredients.len(), 2);
        assert_eq!(draft.instructions.len(), 3);
        assert_eq!(draft.tags, vec!["pasta", "quick"]);
        assert!(draft.nutritional_estimate.is_some());
    }

    #[test]
    fn missing_instructions_is_invalid() {
        let mut payload = complete_payload();
        payload.as_object_mut().unwrap().remove("instructions");
        assert_eq!(
            validate(&payload),
            Err(ValidationFailure::MissingField("instructions")),
        );
    }

    #[test]
    fn missing_title_is_invalid() {
        let mut payload = complete_payload();
        payload.as_object_mut().unwrap().remove("title");
        assert_eq!(validate(&payload), Err(ValidationFailure::MissingField("title")));
    }

    #[test]
    fn empty_ingredients_is_invalid() {
        let mut payload = complete_payload();
        payload["ingredients"] = json!([]);
        assert_eq!(
            validate(&payload),
            Err(ValidationFailure::EmptyList("ingredients")),
        );
    }

    #[test]
    fn empty_instructions_is_invalid() {
        let mut payload = complete_payload();
        payload["instructions"] = json!([]);
        assert_eq!(
            validate(&payload),
            Err(ValidationFailure::EmptyList("instructions")),
        );
    }

    #[test]
    fn scalar_nutritional_estimate_is_invalid() {
        let mut payload = complete_payload();
        payload["nutritional_estimate"] = json!("520 kcal");
        assert_eq!(
            validate(&payload),
            Err(ValidationFailure::WrongType {
                field: "nutritional_estimate",
                expected: "an object",
            }),
        );
    }

    #[test]
    fn absent_nutritional_estimate_is_fine() {
        let mut payload = complete_payload();
        payload.as_object_mut().unwrap().remove("nutritional_estimate");
        let draft = validate(&payload).expect("payload should validate");
        assert!(draft.nutritional_estimate.is_none());
    }

    #[test]
    fn float_minute_counts_are_accepted() {
        let mut payload = complete_payload();
        payload["prep_time"] = json!(12.5);
        let draft = validate(&payload).expect("payload should validate");
        assert_eq!(draft.prep_time, 12);
    }

    #[test]
    fn non_object_payload_is_invalid() {
        assert_eq!(validate(&json!("a recipe")), Err(ValidationFailure::NotAnObject));
        assert_eq!(validate(&json!([1, 2])), Err(ValidationFailure::NotAnObject));
    }

    #[test]
    fn non_string_instruction_is_invalid() {
        let mut payload = complete_payload();
        payload["instructions"] = json!(["Boil.", 7]);
        assert_eq!(
            validate(&payload),
            Err(ValidationFailure::WrongType {
                field: "instructions",
                expected: "an array of strings",
            }),
        );
    }

    #[test]
    fn missing_tags_defaults_to_empty() {
        let mut payload = complete_payload();
        payload.as_object_mut().unwrap().remove("tags");
        let draft = validate(&payload).expect("payload should validate");
        assert!(draft.tags.is_empty());
    }
}
