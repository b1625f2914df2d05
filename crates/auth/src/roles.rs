use std::borrow::Cow;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

const ROLE_PREFIX: &str = "ROLE_";
const ADMIN: &str = "ADMIN";

/// Role tag carried in a decoded credential.
///
/// Roles are opaque strings; the only one the client interprets is the
/// administrator role, which the remote issues as `ROLE_ADMIN`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: Role = Role(Cow::Borrowed("ROLE_ADMIN"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Parse a single tag, trimming whitespace. Blank tags are not roles.
    pub fn parse(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        if tag.is_empty() {
            None
        } else {
            Some(Self(Cow::Owned(tag.to_string())))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `ADMIN`, with or without the `ROLE_` prefix, ASCII case-insensitive.
    pub fn is_admin(&self) -> bool {
        let tag = self.as_str();
        let bare = match tag.get(..ROLE_PREFIX.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(ROLE_PREFIX) => &tag[ROLE_PREFIX.len()..],
            _ => tag,
        };
        bare.eq_ignore_ascii_case(ADMIN)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalized set of roles: no duplicates, no blank entries, stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from a pre-split collection of tags.
    pub fn from_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(tags.into_iter().filter_map(|t| Role::parse(t.as_ref())).collect())
    }

    /// Build from a comma-delimited string (`"ROLE_USER, ROLE_ADMIN"`).
    pub fn from_delimited(raw: &str) -> Self {
        Self::from_tags(raw.split(','))
    }

    pub fn contains(&self, role: &Role) -> bool {
        self.0.contains(role)
    }

    pub fn is_admin(&self) -> bool {
        self.0.iter().any(Role::is_admin)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<T: IntoIterator<Item = Role>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn delimited_and_list_forms_normalize_identically() {
        let from_list = RoleSet::from_tags(["ROLE_USER", " ROLE_ADMIN ", "", "ROLE_USER"]);
        let from_str = RoleSet::from_delimited("ROLE_USER,ROLE_ADMIN, ,ROLE_USER,");

        assert_eq!(from_list, from_str);
        assert_eq!(from_list.len(), 2);
    }

    #[test]
    fn admin_detection_accepts_prefixed_and_bare_tags() {
        assert!(RoleSet::from_tags(["ROLE_ADMIN"]).is_admin());
        assert!(RoleSet::from_tags(["admin"]).is_admin());
        assert!(RoleSet::from_tags(["Role_Admin"]).is_admin());
        assert!(!RoleSet::from_tags(["ROLE_USER", "ADMINISTRATOR"]).is_admin());
        assert!(!RoleSet::empty().is_admin());
    }

    #[test]
    fn admin_constant_is_admin() {
        assert!(Role::ADMIN.is_admin());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 500,
            ..ProptestConfig::default()
        })]

        /// Property: joining tags with commas and re-splitting yields the same set.
        #[test]
        fn delimited_round_trip_matches_list(tags in proptest::collection::vec("[A-Z_ ]{0,12}", 0..8)) {
            let list = RoleSet::from_tags(&tags);
            let joined = RoleSet::from_delimited(&tags.join(","));
            prop_assert_eq!(&list, &joined);
            prop_assert!(list.iter().all(|r| !r.as_str().trim().is_empty()));
        }
    }
}
