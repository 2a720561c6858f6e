//! Deterministic `shortname` slugging: lowercase, non-alphanumerics
//! collapse to a single `-`, trimmed to 64 chars.
//! Collision disambiguation against active siblings is layered on top by
//! `slugify_unique`, since only the caller (the add/rename service) knows
//! the sibling set.

const MAX_LEN: usize = 64;

/// Slugify `name` alone, with no collision check.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_dash = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash && !slug.is_empty() {
            slug.push('-');
            last_was_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug.truncate(MAX_LEN);
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "item".to_string()
    } else {
        slug
    }
}

/// Slugify `name`, appending a numeric suffix (`-2`, `-3`, ...) until the
/// result is absent from `existing` (the active siblings' current
/// shortnames).
pub fn slugify_unique<'a>(name: &str, existing: impl Iterator<Item = &'a str>) -> String {
    let base = slugify(name);
    let taken: std::collections::HashSet<&str> = existing.collect();
    if !taken.contains(base.as_str()) {
        return base;
    }
    let mut n = 2usize;
    loop {
        let candidate = format!("{base}-{n}");
        if !taken.contains(candidate.as_str()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_collapses_non_alphanumerics() {
        assert_eq!(slugify("Hello, World!!"), "hello-world");
        assert_eq!(slugify("  already   slug-like  "), "already-slug-like");
    }

    #[test]
    fn trims_to_64_chars_without_trailing_dash() {
        let long = "a".repeat(100);
        let slug = slugify(&long);
        assert_eq!(slug.len(), MAX_LEN);

        let long_with_break = format!("{}-{}", "a".repeat(63), "b".repeat(10));
        let slug = slugify(&long_with_break);
        assert!(slug.len() <= MAX_LEN);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn empty_input_falls_back_to_item() {
        assert_eq!(slugify("!!!"), "item");
        assert_eq!(slugify(""), "item");
    }

    #[test]
    fn disambiguates_against_existing_siblings() {
        let existing = vec!["alpha", "alpha-2"];
        assert_eq!(
            slugify_unique("Alpha", existing.into_iter()),
            "alpha-3"
        );
    }

    #[test]
    fn no_collision_keeps_base_slug() {
        let existing: Vec<&str> = vec!["beta"];
        assert_eq!(slugify_unique("Alpha", existing.into_iter()), "alpha");
    }
}
