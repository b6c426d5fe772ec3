// ── Cache-key namespaces ──
//
// Hierarchical keys scoping cached reads. A key is an ordered list of
// segments; namespace membership is a segment-wise prefix test, so
// invalidating `["entities"]` reaches every entity list, detail, member
// list and entity invitation list at once.
//
//   entities
//   ├── list
//   └── detail/{slug}
//       ├── members
//       └── invitations
//   invitations
//   ├── my
//   └── entity/{slug}

use std::fmt;

const DISABLED: &str = "__disabled__";

/// Identity of one cached read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Sentinel for a query whose required parameter is missing.
    ///
    /// Lives outside both trees: it never matches a real prefix, is never
    /// matched by one, and is never cached.
    pub fn disabled() -> Self {
        Self(vec![DISABLED.to_owned()])
    }

    pub fn is_disabled(&self) -> bool {
        self.0.as_slice() == [DISABLED]
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Extend this key by one segment.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Whether `self` lies in the namespace rooted at `prefix`.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        if self.is_disabled() || prefix.is_disabled() {
            return false;
        }
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// Keys for entity records and everything scoped to one entity.
pub mod entity_keys {
    use super::QueryKey;

    pub fn all() -> QueryKey {
        QueryKey::new(["entities"])
    }

    pub fn list() -> QueryKey {
        all().child("list")
    }

    pub fn detail(slug: &str) -> QueryKey {
        all().child("detail").child(slug)
    }

    pub fn members(slug: &str) -> QueryKey {
        detail(slug).child("members")
    }

    pub fn invitations(slug: &str) -> QueryKey {
        detail(slug).child("invitations")
    }
}

/// Keys for invitation lists.
pub mod invitation_keys {
    use super::QueryKey;

    pub fn all() -> QueryKey {
        QueryKey::new(["invitations"])
    }

    /// Invitations addressed to the signed-in user.
    pub fn my() -> QueryKey {
        all().child("my")
    }

    /// Invitations issued by one entity.
    pub fn entity(slug: &str) -> QueryKey {
        all().child("entity").child(slug)
    }
}
