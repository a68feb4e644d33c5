use std::fmt;

/// Roots whose cached data is not tied to a session and survives logout.
pub const PUBLIC_ROOTS: &[&str] = &["pets", "pet"];

// ---------------------------------------------------------------------------
// ResourceKey
// ---------------------------------------------------------------------------

/// Identifies a cached resource by an ordered list of segments.
///
/// The first segment is the key's root; the public allow-list is matched
/// against the root only, so `["pets", "dog", "page=0"]` is public and
/// `["accounts", "me"]` is not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    segments: Vec<String>,
}

impl ResourceKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Key for a request path: `/accounts/me?x=1` becomes
    /// `["accounts", "me?x=1"]`.
    pub fn from_path(path: &str) -> Self {
        Self::new(path.split('/').filter(|s| !s.is_empty()))
    }

    /// Append a segment.
    pub fn child(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn root(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether the root is in `allow_list`.
    pub fn is_public_in<S: AsRef<str>>(&self, allow_list: &[S]) -> bool {
        self.root()
            .is_some_and(|root| allow_list.iter().any(|p| p.as_ref() == root))
    }

    /// Whether the root is in [`PUBLIC_ROOTS`].
    pub fn is_public(&self) -> bool {
        self.is_public_in(PUBLIC_ROOTS)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_roots() {
        assert!(ResourceKey::new(["pets"]).is_public());
        assert!(ResourceKey::new(["pet", "42"]).is_public());
        assert!(ResourceKey::new(["pets"]).child("dog").child("page=0").is_public());
        assert!(!ResourceKey::new(["accounts", "me"]).is_public());
        assert!(!ResourceKey::new(["adoptions"]).is_public());
        assert!(!ResourceKey::new(Vec::<String>::new()).is_public());
    }

    #[test]
    fn test_only_root_is_matched() {
        assert!(!ResourceKey::new(["shelter", "pets"]).is_public());
    }

    #[test]
    fn test_custom_allow_list() {
        let key = ResourceKey::new(["shelters", "7"]);
        assert!(key.is_public_in(&["shelters"]));
        assert!(!key.is_public_in(PUBLIC_ROOTS));
    }

    #[test]
    fn test_from_path() {
        let key = ResourceKey::from_path("/accounts/me");
        assert_eq!(key, ResourceKey::new(["accounts", "me"]));
        assert!(!key.is_public());
        assert!(ResourceKey::from_path("pets//dog/").is_public());
        assert_eq!(ResourceKey::from_path("/").root(), None);
    }

    #[test]
    fn test_display() {
        let key = ResourceKey::new(["pets", "dog"]).child("page=1");
        assert_eq!(key.to_string(), "pets/dog/page=1");
        assert_eq!(key.root(), Some("pets"));
    }
}
