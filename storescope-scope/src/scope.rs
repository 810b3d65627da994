//! The scope hierarchy and scope permission sets.

use crate::ScopeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A level in the configuration hierarchy.
///
/// The discriminant order is the hierarchy depth: a deeper scope overrides a
/// shallower one. `Default` is the single global scope and never carries a
/// numeric ID.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum Scope {
    /// No scope at all; also the decoded form of invalid identifiers.
    #[default]
    #[serde(rename = "absent")]
    Absent = 0,
    #[serde(rename = "default")]
    Default = 1,
    #[serde(rename = "websites", alias = "website")]
    Website = 2,
    #[serde(rename = "groups", alias = "group")]
    Group = 3,
    #[serde(rename = "stores", alias = "store")]
    Store = 4,
}

impl Scope {
    /// All scopes in hierarchy order.
    pub const ALL: [Scope; 5] = [
        Scope::Absent,
        Scope::Default,
        Scope::Website,
        Scope::Group,
        Scope::Store,
    ];

    /// Converts a raw tag byte back into a scope.
    #[must_use]
    pub const fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Scope::Absent),
            1 => Some(Scope::Default),
            2 => Some(Scope::Website),
            3 => Some(Scope::Group),
            4 => Some(Scope::Store),
            _ => None,
        }
    }

    /// Returns the raw tag byte.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Name used in persisted configuration rows.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Scope::Absent => "absent",
            Scope::Default => "default",
            Scope::Website => "websites",
            Scope::Group => "groups",
            Scope::Store => "stores",
        }
    }

    /// True for every scope except `Absent`.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        !matches!(self, Scope::Absent)
    }

    #[must_use]
    pub const fn is_website_or_store(self) -> bool {
        matches!(self, Scope::Website | Scope::Store)
    }

    /// True if identifiers of this scope carry a numeric ID.
    #[must_use]
    pub const fn has_id(self) -> bool {
        self as u8 >= Scope::Website as u8
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "absent" => Ok(Scope::Absent),
            "default" => Ok(Scope::Default),
            "websites" | "website" => Ok(Scope::Website),
            "groups" | "group" => Ok(Scope::Group),
            "stores" | "store" => Ok(Scope::Store),
            other => Err(ScopeError::NotValid(format!("unknown scope name {other:?}"))),
        }
    }
}

/// Set of scopes at which a configuration value may be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Perm(u8);

impl Perm {
    /// Only the global scope.
    pub const DEFAULT: Perm = Perm(1 << Scope::Default as u8);
    /// Global and website scopes.
    pub const WEBSITE: Perm = Perm(Self::DEFAULT.0 | 1 << Scope::Website as u8);
    /// Global, website and store scopes.
    pub const STORE: Perm = Perm(Self::WEBSITE.0 | 1 << Scope::Store as u8);

    /// Builds a permission set from a list of scopes.
    #[must_use]
    pub fn new(scopes: &[Scope]) -> Self {
        scopes.iter().fold(Perm(0), |perm, scope| perm.set(*scope))
    }

    /// Returns a copy with `scope` added. `Absent` is never stored.
    #[must_use]
    pub const fn set(self, scope: Scope) -> Self {
        if scope.is_valid() {
            Perm(self.0 | 1 << scope as u8)
        } else {
            self
        }
    }

    #[must_use]
    pub const fn has(self, scope: Scope) -> bool {
        scope.is_valid() && self.0 & (1 << scope as u8) != 0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns the deepest permitted scope; an empty set falls back to `Default`.
    #[must_use]
    pub const fn top(self) -> Scope {
        if self.has(Scope::Store) {
            Scope::Store
        } else if self.has(Scope::Group) {
            Scope::Group
        } else if self.has(Scope::Website) {
            Scope::Website
        } else {
            Scope::Default
        }
    }

    /// Iterates the permitted scopes in hierarchy order.
    pub fn scopes(self) -> impl Iterator<Item = Scope> {
        Scope::ALL.into_iter().filter(move |scope| self.has(*scope))
    }
}

impl fmt::Display for Perm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, scope) in self.scopes().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(scope.as_str())?;
        }
        Ok(())
    }
}
