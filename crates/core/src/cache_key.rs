//! Deterministic cache-key derivation for generation requests.
//!
//! Two requests with the same ingredient multiset (regardless of input
//! order) and equivalent normalized options map to the same key. The key is
//! a performance optimization, not a security boundary, so a plain SHA-256
//! over the canonical encoding is plenty.

use serde::Serialize;

use crate::hashing;
use crate::request::{GenerationOptions, NormalizedOptions};

/// Canonical structure hashed into the key. Field order is fixed by the
/// struct definition, which makes the serialized form stable.
#[derive(Serialize)]
struct CanonicalRequest<'a> {
    ingredients: &'a [String],
    options: &'a NormalizedOptions,
}

/// Derive the cache key for a generation request.
///
/// Ingredients are sorted ascending (case-sensitive, no lowercasing) and
/// options are normalized before hashing. Pure and total: never fails,
/// never touches the outside world.
pub fn derive_key(ingredients: &[String], options: &GenerationOptions) -> String {
    let mut sorted: Vec<String> = ingredients.to_vec();
    sorted.sort();
    let normalized = options.normalized();

    let canonical = CanonicalRequest {
        ingredients: &sorted,
        options: &normalized,
    };
    // Serialization of a plain struct with string/int fields cannot fail.
    let encoded = serde_json::to_string(&canonical).unwrap_or_default();
    hashing::sha256_hex(encoded.as_bytes())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ingredients(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn ingredient_order_does_not_matter() {
        let a = derive_key(&ingredients(&["egg", "milk"]), &GenerationOptions::default());
        let b = derive_key(&ingredients(&["milk", "egg"]), &GenerationOptions::default());
        assert_eq!(a, b);
    }

    #[test]
    fn omitted_and_explicit_defaults_are_equivalent() {
        let explicit = GenerationOptions {
            cuisine: Some("Any".to_string()),
            difficulty: Some("medium".to_string()),
            dietary_restrictions: vec![],
            time: Some("Any".to_string()),
            servings: Some(2),
        };
        let a = derive_key(&ingredients(&["egg", "milk"]), &GenerationOptions::default());
        let b = derive_key(&ingredients(&["milk", "egg"]), &explicit);
        assert_eq!(a, b);
    }

    #[test]
    fn dietary_restriction_order_does_not_matter() {
        let forward = GenerationOptions {
            dietary_restrictions: vec!["vegan".to_string(), "gluten-free".to_string()],
            ..Default::default()
        };
        let backward = GenerationOptions {
            dietary_restrictions: vec!["gluten-free".to_string(), "vegan".to_string()],
            ..Default::default()
        };
        let items = ingredients(&["tofu"]);
        assert_eq!(derive_key(&items, &forward), derive_key(&items, &backward));
    }

    #[test]
    fn different_ingredients_produce_different_keys() {
        let a = derive_key(&ingredients(&["egg"]), &GenerationOptions::default());
        let b = derive_key(&ingredients(&["milk"]), &GenerationOptions::default());
        assert_ne!(a, b);
    }

    #[test]
    fn different_options_produce_different_keys() {
        let vegan = GenerationOptions {
            dietary_restrictions: vec!["vegan".to_string()],
            ..Default::default()
        };
        let items = ingredients(&["rice"]);
        assert_ne!(
            derive_key(&items, &GenerationOptions::default()),
            derive_key(&items, &vegan),
        );
    }

    #[test]
    fn case_is_significant() {
        let a = derive_key(&ingredients(&["Egg"]), &GenerationOptions::default());
        let b = derive_key(&ingredients(&["egg"]), &GenerationOptions::default());
        assert_ne!(a, b);
    }

    #[test]
    fn key_is_a_sha256_hex_digest() {
        let key = derive_key(&ingredients(&["egg"]), &GenerationOptions::default());
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
