//! Recipe slug generation.
//!
//! Slugs are derived from the recipe title plus a short random suffix so
//! that repeated generations of similarly-titled recipes stay unique.

use rand::distr::Alphanumeric;
use rand::Rng;

/// Length of the random slug suffix.
const SUFFIX_LEN: usize = 5;

/// Lowercase a title into a URL-safe slug: alphanumerics kept, everything
/// else collapsed into single hyphens, no leading/trailing hyphen.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_hyphen = true;
    for c in title.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    if slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Slugify a title and append a random 5-character suffix.
pub fn slug_with_suffix(title: &str) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect();
    let base = slugify(title);
    if base.is_empty() {
        suffix
    } else {
        format!("{base}-{suffix}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_lowercases_and_hyphenates() {
        assert_eq!(slugify("Tomato Basil Pasta"), "tomato-basil-pasta");
    }

    #[test]
    fn slugify_collapses_punctuation_runs() {
        assert_eq!(slugify("Chef's  Special!! Stew"), "chef-s-special-stew");
    }

    #[test]
    fn slugify_trims_edges() {
        assert_eq!(slugify("  Soup  "), "soup");
    }

    #[test]
    fn slugify_empty_title() {
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn suffix_has_expected_shape() {
        let slug = slug_with_suffix("Pad Thai");
        assert!(slug.starts_with("pad-thai-"));
        let suffix = slug.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn empty_title_still_produces_a_slug() {
        let slug = slug_with_suffix("???");
        assert_eq!(slug.len(), SUFFIX_LEN);
    }
}
