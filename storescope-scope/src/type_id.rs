//! Packed scope identifiers.
//!
//! A [`TypeId`] stores a [`Scope`] in the high byte and a numeric ID in the
//! low 24 bits of a single `u32`:
//!
//! ```text
//!  31      24 23                     0
//! +----------+------------------------+
//! |  scope   |           id           |
//! +----------+------------------------+
//! ```
//!
//! Only 23 bits of the ID are usable ([`MAX_ID`]), so a valid ID never sets
//! bit 23 and the raw values sort by scope first, then by ID.

use crate::{Scope, ScopeError, ScopeResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest numeric ID representable in a [`TypeId`] (2^23 − 1).
pub const MAX_ID: i64 = (1 << 23) - 1;

/// The global scope, `(Default, 0)`.
pub const DEFAULT_TYPE_ID: TypeId = TypeId((Scope::Default as u32) << ID_BITS);

const ID_BITS: u32 = 24;
const ID_MASK: u32 = (1 << ID_BITS) - 1;

/// A scope and a numeric ID packed into a `u32`.
///
/// The zero value is both `(Absent, 0)` and the result of a failed
/// [`TypeId::pack`]. Use [`TypeId::checked_pack`] when the two must be told
/// apart.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(u32);

impl TypeId {
    /// Packs a scope and an ID.
    ///
    /// `Absent` and `Default` drop any ID to 0. An ID above [`MAX_ID`] or a
    /// negative ID for an ID-carrying scope yields the zero sentinel.
    #[must_use]
    pub const fn pack(scope: Scope, id: i64) -> Self {
        if !scope.has_id() {
            return Self((scope as u32) << ID_BITS);
        }
        if id < 0 || id > MAX_ID {
            return Self(0);
        }
        Self(((scope as u32) << ID_BITS) | id as u32)
    }

    /// Like [`TypeId::pack`] but reports invalid input instead of returning
    /// the sentinel.
    pub fn checked_pack(scope: Scope, id: i64) -> ScopeResult<Self> {
        if scope == Scope::Absent {
            return Err(ScopeError::NotValid("absent scope has no identifier".into()));
        }
        if scope.has_id() && !(0..=MAX_ID).contains(&id) {
            return Err(ScopeError::NotValid(format!(
                "id {id} out of range 0..={MAX_ID} for scope {scope}"
            )));
        }
        Ok(Self::pack(scope, id))
    }

    /// Wraps a raw value without checking it.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw packed value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Splits the identifier into scope and ID.
    ///
    /// An unknown scope byte or an ID above [`MAX_ID`] decodes as
    /// `(Absent, -1)`.
    #[must_use]
    pub const fn unpack(self) -> (Scope, i64) {
        let id = (self.0 & ID_MASK) as i64;
        match Scope::from_u8((self.0 >> ID_BITS) as u8) {
            Some(scope) if id <= MAX_ID => (scope, id),
            _ => (Scope::Absent, -1),
        }
    }

    #[must_use]
    pub const fn scope(self) -> Scope {
        self.unpack().0
    }

    /// Numeric ID, `-1` for an undecodable value.
    #[must_use]
    pub const fn id(self) -> i64 {
        self.unpack().1
    }

    /// Checks that the scope is one of `Default`, `Website`, `Group` or
    /// `Store` and that the ID bits are in range.
    pub fn validate(self) -> ScopeResult<()> {
        let tag = self.0 >> ID_BITS;
        if !(Scope::Default as u32..=Scope::Store as u32).contains(&tag) {
            return Err(ScopeError::NotValid(format!(
                "scope tag {tag} of {} is outside default..=stores",
                self.0
            )));
        }
        if (self.0 & ID_MASK) as i64 > MAX_ID {
            return Err(ScopeError::NotValid(format!(
                "id bits of {} exceed {MAX_ID}",
                self.0
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn is_valid(self) -> bool {
        self.validate().is_ok()
    }

    /// Shard index in `0..=255` derived from the ID.
    #[must_use]
    pub const fn segment(self) -> u8 {
        (self.0 & 0xff) as u8
    }

    /// Reports whether `parent` may sit above `self` in the configuration
    /// chain `Default -> Website -> Store`.
    ///
    /// `(Absent, 0)` is accepted as a parent of anything. `Group` never takes
    /// part: configuration rows are not stored at group level.
    #[must_use]
    pub const fn valid_parent(self, parent: TypeId) -> bool {
        let (p, p_id) = parent.unpack();
        let (c, c_id) = self.unpack();
        matches!((p, c), (Scope::Absent, _)) && p_id == 0
            || matches!((p, c), (Scope::Default, Scope::Default)) && p_id == 0 && c_id == 0
            || matches!((p, c), (Scope::Default, Scope::Website)) && p_id == 0 && c_id >= 0
            || matches!((p, c), (Scope::Website, Scope::Store)) && p_id >= 0 && c_id >= 0
    }

    /// Little-endian binary form.
    #[must_use]
    pub const fn to_le_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    #[must_use]
    pub const fn from_le_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_le_bytes(bytes))
    }

    /// Appends the binary form to `buf`.
    pub fn append_binary(self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.to_le_bytes());
    }

    /// Decodes the first four bytes of `bytes`.
    pub fn from_binary(bytes: &[u8]) -> ScopeResult<Self> {
        match bytes.first_chunk::<4>() {
            Some(chunk) => Ok(Self::from_le_bytes(*chunk)),
            None => Err(ScopeError::BadEncoding(format!(
                "need 4 bytes for a type id, got {}",
                bytes.len()
            ))),
        }
    }
}

impl Scope {
    /// Packs this scope with `id`, see [`TypeId::pack`].
    #[must_use]
    pub const fn with_id(self, id: i64) -> TypeId {
        TypeId::pack(self, id)
    }
}

impl From<TypeId> for u32 {
    fn from(id: TypeId) -> Self {
        id.0
    }
}

impl TryFrom<&[u8]> for TypeId {
    type Error = ScopeError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::from_binary(bytes)
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (scope, id) = self.unpack();
        write!(f, "TypeId({scope}:{id})")
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TypeId {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ScopeError::BadEncoding(format!(
                "type id {s:?} is not a decimal number"
            )));
        }
        s.parse::<u32>()
            .map(Self)
            .map_err(|e| ScopeError::BadEncoding(format!("type id {s:?}: {e}")))
    }
}
