//! URL-safe slugs for entity display names
//!
//! A slug is the lowercase ASCII-alphanumeric rendering of a name with every
//! other run of characters collapsed to a single `-`. Within one collection
//! slugs are unique: a collision is resolved by appending a prefix of the
//! entity id.

use indexmap::IndexMap;

/// Default number of id characters appended on a slug collision.
pub const DEFAULT_DISAMBIGUATOR_LEN: usize = 5;

/// Render `name` as a URL-safe slug.
///
/// Lowercases ASCII letters, turns every run of non-alphanumeric characters
/// into one `-`, and trims `-` from both ends. May return an empty string.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// First `len` characters of `id` (char boundary safe).
fn id_prefix(id: &str, len: usize) -> &str {
    match id.char_indices().nth(len) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// Slug → id index for a single collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlugIndex {
    slugs: IndexMap<String, String>,
    disambiguator_len: usize,
}

impl SlugIndex {
    /// Create an empty index using the default disambiguator length.
    pub fn new() -> Self {
        Self::with_disambiguator_len(DEFAULT_DISAMBIGUATOR_LEN)
    }

    /// Create an empty index appending `len` id characters on collision.
    pub fn with_disambiguator_len(len: usize) -> Self {
        Self {
            slugs: IndexMap::new(),
            disambiguator_len: len.max(1),
        }
    }

    /// Assign a unique slug for `id` derived from `name` and return it.
    ///
    /// Resolution order on collision: `{slug}-{id prefix}`, then
    /// `{slug}-{id}`, then `{slug}-{id}-{n}` for n = 2, 3, ...
    pub fn assign(&mut self, id: &str, name: &str) -> String {
        let mut base = slugify(name);
        if base.is_empty() {
            base = slugify(id_prefix(id, self.disambiguator_len));
        }

        let slug = if !self.slugs.contains_key(&base) {
            base
        } else {
            let short = format!("{base}-{}", id_prefix(id, self.disambiguator_len));
            let full = format!("{base}-{id}");
            if !self.slugs.contains_key(&short) {
                short
            } else if !self.slugs.contains_key(&full) {
                full
            } else {
                let mut n = 2usize;
                loop {
                    let candidate = format!("{full}-{n}");
                    if !self.slugs.contains_key(&candidate) {
                        break candidate;
                    }
                    n += 1;
                }
            }
        };

        self.slugs.insert(slug.clone(), id.to_string());
        slug
    }

    /// Look up the id registered under `slug`.
    pub fn resolve(&self, slug: &str) -> Option<&str> {
        self.slugs.get(slug).map(String::as_str)
    }

    /// Consume the index, yielding the slug → id map in assignment order.
    pub fn into_map(self) -> IndexMap<String, String> {
        self.slugs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Foo"), "foo");
        assert_eq!(slugify("  Hello,   World!  "), "hello-world");
        assert_eq!(slugify("a--b__c"), "a-b-c");
        assert_eq!(slugify("Café Ünïcode"), "caf-n-code");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_collision_appends_id_prefix() {
        let mut index = SlugIndex::new();
        assert_eq!(index.assign("11111", "Foo"), "foo");
        assert_eq!(index.assign("22222", "Foo"), "foo-22222");
        assert_eq!(index.resolve("foo"), Some("11111"));
        assert_eq!(index.resolve("foo-22222"), Some("22222"));
    }

    #[test]
    fn test_collision_with_shared_prefix_falls_back_to_full_id() {
        let mut index = SlugIndex::new();
        index.assign("abcdefgh-1", "Room");
        assert_eq!(index.assign("abcdefgh-2", "Room"), "room-abcde");
        assert_eq!(index.assign("abcdefgh-3", "Room"), "room-abcdefgh-3");
    }

    #[test]
    fn test_empty_slug_uses_id_prefix() {
        let mut index = SlugIndex::new();
        assert_eq!(index.assign("XYZ123456", "???"), "xyz12");
    }
}
