//! Prompt construction for the model provider.
//!
//! The provider is asked for `json_object` completions, so every prompt
//! spells out the exact JSON shape expected back. Only the shape is part of
//! the contract; wording can evolve freely.

use ladle_core::request::NormalizedOptions;

/// System message for recipe generation.
pub const GENERATE_SYSTEM: &str =
    "You are a professional chef who provides high-quality recipes in JSON format.";

/// System message for recipe modification.
pub const MODIFY_SYSTEM: &str =
    "You are a professional chef who modifies recipes in JSON format.";

/// User message for image-based ingredient detection.
pub const DETECT_INGREDIENTS: &str = "Identify all food ingredients in this image. \
    Return a JSON array with ingredient names and confidence scores. \
    Format: {\"ingredients\": [{\"name\": \"item\", \"confidence\": 0.9}]}";

/// Build the user message for recipe generation.
pub fn recipe_prompt(ingredients: &[String], options: &NormalizedOptions) -> String {
    format!(
        "Generate a detailed recipe using these ingredients: {ingredients}.\n\
         \n\
         Requirements:\n\
         - Dietary restrictions: {dietary}\n\
         - Cuisine preference: {cuisine}\n\
         - Difficulty: {difficulty}\n\
         - Time constraint: {time}\n\
         - Servings: {servings}\n\
         \n\
         Return a JSON object with this exact structure:\n\
         {{\n\
           \"title\": \"Recipe name\",\n\
           \"description\": \"Brief description\",\n\
           \"cuisine\": \"Cuisine type\",\n\
           \"difficulty\": \"easy|medium|hard\",\n\
           \"prep_time\": minutes,\n\
           \"cook_time\": minutes,\n\
           \"servings\": number,\n\
           \"ingredients\": [\n\
             {{\"item\": \"ingredient name\", \"amount\": \"quantity\", \"unit\": \"measurement\"}}\n\
           ],\n\
           \"instructions\": [\n\
             \"Step 1 text\",\n\
             \"Step 2 text\"\n\
           ],\n\
           \"nutritional_estimate\": {{\n\
             \"calories\": per_serving,\n\
             \"protein\": grams,\n\
             \"carbs\": grams,\n\
             \"fat\": grams\n\
           }},\n\
           \"tags\": [\"tag1\", \"tag2\"]\n\
         }}",
        ingredients = ingredients.join(", "),
        dietary = options.dietary_restrictions.join(", "),
        cuisine = options.cuisine,
        difficulty = options.difficulty,
        time = options.time,
        servings = options.servings,
    )
}

/// Build the user message for modifying an existing recipe.
pub fn modify_prompt(original_json: &str, modification_request: &str) -> String {
    format!(
        "Original recipe: {original_json}\n\
         \n\
         User request: {modification_request}\n\
         \n\
         Modify the recipe according to the request while maintaining:\n\
         - Similar taste profile\n\
         - Reasonable ingredient substitutions\n\
         - Clear cooking instructions\n\
         - Accurate nutritional recalculation\n\
         \n\
         Return the modified recipe in the same JSON format."
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ladle_core::request::GenerationOptions;

    #[test]
    fn recipe_prompt_embeds_ingredients_and_constraints() {
        let options = GenerationOptions {
            cuisine: Some("Thai".to_string()),
            dietary_restrictions: vec!["vegan".to_string()],
            servings: Some(4),
            ..Default::default()
        }
        .normalized();
        let prompt = recipe_prompt(
            &["tofu".to_string(), "rice".to_string()],
            &options,
        );

        assert!(prompt.contains("tofu, rice"));
        assert!(prompt.contains("Cuisine preference: Thai"));
        assert!(prompt.contains("Dietary restrictions: vegan"));
        assert!(prompt.contains("Servings: 4"));
    }

    #[test]
    fn recipe_prompt_names_every_required_field() {
        let prompt = recipe_prompt(&["egg".to_string()], &GenerationOptions::default().normalized());
        for field in [
            "\"title\"",
            "\"description\"",
            "\"cuisine\"",
            "\"difficulty\"",
            "\"prep_time\"",
            "\"cook_time\"",
            "\"servings\"",
            "\"ingredients\"",
            "\"instructions\"",
            "\"nutritional_estimate\"",
        ] {
            assert!(prompt.contains(field), "prompt should mention {field}");
        }
    }

    #[test]
    fn modify_prompt_carries_original_and_request() {
        let prompt = modify_prompt("{\"title\":\"Stew\"}", "make it spicier");
        assert!(prompt.contains("{\"title\":\"Stew\"}"));
        assert!(prompt.contains("make it spicier"));
    }
}
