//! Code generation for folders and units.
//!
//! Folder codes are built from the title by:
//! 1. Converting ASCII letters to lowercase
//! 2. Replacing runs of other characters with a single hyphen
//! 3. Trimming leading/trailing hyphens and truncating
//! 4. Appending 8 random hex characters
//!
//! Unit codes come from a monotonic counter kept in the store.

/// Prefix of every unit code.
pub const UNIT_CODE_PREFIX: &str = "STUB";

/// Longest slug kept in a folder code.
const MAX_SLUG_LEN: usize = 32;

/// Convert a folder title to a slug.
#[must_use]
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len().min(MAX_SLUG_LEN));
    let mut pending_hyphen = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        while slug.ends_with('-') {
            slug.pop();
        }
    }

    slug
}

/// Generate a folder code from its title.
#[must_use]
pub fn folder_code(title: &str) -> String {
    let suffix = &uuid::Uuid::new_v4().simple().to_string()[..8];
    let slug = slugify(title);

    if slug.is_empty() {
        format!("folder-{suffix}")
    } else {
        format!("{slug}-{suffix}")
    }
}

/// Format the unit code for counter value `n`.
#[must_use]
pub fn unit_code(n: i64) -> String {
    format!("{UNIT_CODE_PREFIX}-{n}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("postgres datasource"), "postgres-datasource");
        assert_eq!(slugify("Abyss DataSource"), "abyss-datasource");
    }

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("  a -- b  "), "a-b");
        assert_eq!(slugify("Explore: SQL (table)!"), "explore-sql-table");
    }

    #[test]
    fn test_slugify_non_ascii_only() {
        assert_eq!(slugify("Все тест-кейсы"), "");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn test_slugify_truncates() {
        let slug = slugify(&"word ".repeat(20));
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn test_folder_code_shape() {
        let code = folder_code("prometheus datasource");
        assert!(code.starts_with("prometheus-datasource-"));
        assert_eq!(code.len(), "prometheus-datasource-".len() + 8);
    }

    #[test]
    fn test_folder_code_empty_slug() {
        let code = folder_code("Новая папка");
        assert!(code.starts_with("folder-"));
    }

    #[test]
    fn test_folder_codes_differ() {
        assert_ne!(folder_code("same"), folder_code("same"));
    }

    #[test]
    fn test_unit_code() {
        assert_eq!(unit_code(1), "STUB-1");
        assert_eq!(unit_code(42), "STUB-42");
    }
}
