//! # Resource identity used to group tasks.
//!
//! A [`ResourceKey`] names the resource (usually a document) a task works on.
//! The queue never compares keys by their raw spelling; it compares their
//! **canonical form**, so that the same file reached through differently
//! encoded identifiers lands in the same slot.
//!
//! ## Canonicalization
//! ```text
//! "file:///tmp/a%20b.erb"  ─► "/tmp/a b.erb"        (percent-decoded file path)
//! "/tmp/a b.erb"           ─► "/tmp/a b.erb"        (not a URL: taken verbatim)
//! "UNTITLED:Untitled-1"    ─► "untitled:Untitled-1" (normalized URL serialization)
//! ```
//!
//! ## Rules
//! - `file:` URLs are reduced to their filesystem path.
//! - Other URLs use the serialization produced by [`url::Url`] (lower-case scheme/host).
//! - Anything that does not parse as an absolute URL is treated as a path as-is.
//! - Single-letter schemes are drive letters (`C:\...`), never URL schemes.
//! - No case folding is applied; `A.erb` and `a.erb` are different keys.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use url::Url;

/// Identity of the resource a task operates on.
///
/// Cheap to clone. Equality and hashing use only the canonical form.
#[derive(Clone)]
pub struct ResourceKey {
    raw: Arc<str>,
    canonical: Arc<str>,
    is_file: bool,
}

impl ResourceKey {
    /// Creates a key from any textual identifier (URL or path).
    pub fn new(raw: impl Into<String>) -> Self {
        let raw: String = raw.into();
        let (canonical, is_file) = canonicalize(&raw);
        Self {
            raw: raw.into(),
            canonical: canonical.into(),
            is_file,
        }
    }

    /// Creates a key from a filesystem path.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self::new(path.as_ref().to_string_lossy().into_owned())
    }

    /// Canonical form used for comparison.
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// Identifier exactly as it was supplied.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// True for `file:` URLs and bare paths.
    pub fn is_file(&self) -> bool {
        self.is_file
    }

    /// Filesystem path for file keys, `None` otherwise.
    pub fn to_file_path(&self) -> Option<PathBuf> {
        self.is_file.then(|| PathBuf::from(&*self.canonical))
    }
}

fn canonicalize(raw: &str) -> (String, bool) {
    match Url::parse(raw) {
        Ok(url) if url.scheme().len() > 1 => {
            if url.scheme() == "file" {
                match url.to_file_path() {
                    Ok(path) => (path.to_string_lossy().into_owned(), true),
                    Err(()) => (url.as_str().to_owned(), true),
                }
            } else {
                (url.as_str().to_owned(), false)
            }
        }
        _ => (raw.to_owned(), true),
    }
}

impl PartialEq for ResourceKey {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for ResourceKey {}

impl Hash for ResourceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl fmt::Debug for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResourceKey").field(&&*self.canonical).finish()
    }
}

impl From<&str> for ResourceKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ResourceKey {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&Path> for ResourceKey {
    fn from(path: &Path) -> Self {
        Self::from_path(path)
    }
}

impl From<PathBuf> for ResourceKey {
    fn from(path: PathBuf) -> Self {
        Self::from_path(path)
    }
}

impl From<Url> for ResourceKey {
    fn from(url: Url) -> Self {
        Self::new(String::from(url))
    }
}

impl From<&Url> for ResourceKey {
    fn from(url: &Url) -> Self {
        Self::new(url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_file_url_and_path_are_the_same_key() {
        let a = ResourceKey::new("file:///tmp/views/a%20b.html.erb");
        let b = ResourceKey::from_path("/tmp/views/a b.html.erb");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "/tmp/views/a b.html.erb");
        assert_eq!(a.raw(), "file:///tmp/views/a%20b.html.erb");
        assert!(a.is_file() && b.is_file());
    }

    #[test]
    fn test_untitled_documents_are_not_files() {
        let k = ResourceKey::new("untitled:Untitled-1");
        assert!(!k.is_file());
        assert!(k.to_file_path().is_none());
    }

    #[test]
    fn test_scheme_case_is_normalized() {
        assert_eq!(
            ResourceKey::new("UNTITLED:Untitled-1"),
            ResourceKey::new("untitled:Untitled-1")
        );
    }

    #[test]
    fn test_path_case_is_preserved() {
        assert_ne!(ResourceKey::new("/tmp/A.erb"), ResourceKey::new("/tmp/a.erb"));
    }

    #[test]
    fn test_drive_letters_are_not_schemes() {
        let k = ResourceKey::new(r"C:\views\a.erb");
        assert!(k.is_file());
        assert_eq!(k.as_str(), r"C:\views\a.erb");
    }

    #[test]
    fn test_equal_keys_hash_equally() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(ResourceKey::new("untitled:x"));
        assert!(set.contains(&ResourceKey::new("UNTITLED:x")));
    }
}
