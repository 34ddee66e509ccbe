//! Banner domain types.
//!
//! A banner is a unit of opaque content selected by a (tag, feature) pair.
//! The live row carries a revision pointer into an append-only history of
//! snapshots. Identifiers are positive integers; `0` is reserved for
//! "absent" in selector inputs and never names a real entity.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

mod banner;
pub mod read_service;
pub mod revision_service;
mod selector;
pub(crate) mod service_support;
#[cfg(test)]
mod tests;

pub use banner::{Banner, BannerPatch, BannerVersion, NewBanner};
pub use read_service::BannerReadService;
pub use revision_service::BannerRevisionService;
pub use selector::{BannerFilter, DeleteSelector};

/// Validation errors raised by banner value constructors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BannerValidationError {
    /// Identifier was zero or negative.
    #[error("{kind} id must be positive (got {value})")]
    NonPositiveId { kind: &'static str, value: i64 },
    /// A banner must be linked to at least one tag.
    #[error("a banner requires at least one tag")]
    EmptyTagSet,
    /// Bulk deletion needs exactly one of feature or tag.
    #[error("exactly one of feature_id or tag_id must be provided")]
    AmbiguousSelector,
    /// The revision counter cannot be advanced any further.
    #[error("banner revision counter exhausted at {current}")]
    RevisionOverflow { current: u32 },
}

macro_rules! positive_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "i64", into = "i64")]
        pub struct $name(i64);

        impl $name {
            /// Validate and wrap a raw identifier.
            pub fn new(value: i64) -> Result<Self, BannerValidationError> {
                if value <= 0 {
                    return Err(BannerValidationError::NonPositiveId {
                        kind: $kind,
                        value,
                    });
                }
                Ok(Self(value))
            }

            /// Raw identifier value.
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl TryFrom<i64> for $name {
            type Error = BannerValidationError;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for i64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

positive_id!(
    /// Surrogate banner identity assigned by storage.
    BannerId,
    "banner"
);
positive_id!(
    /// Reference into the externally owned feature table.
    FeatureId,
    "feature"
);
positive_id!(
    /// Reference into the externally owned tag table.
    TagId,
    "tag"
);

/// Non-empty, de-duplicated, ordered set of tag identifiers.
///
/// # Examples
/// ```
/// use banner_service::domain::banners::{TagId, TagSet};
///
/// let tags = TagSet::from_raw([3, 1, 3]).expect("valid tags");
/// assert_eq!(tags.to_raw(), vec![1, 3]);
/// assert!(tags.contains(TagId::new(1).expect("positive")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<i64>", into = "Vec<i64>")]
pub struct TagSet(BTreeSet<TagId>);

impl TagSet {
    /// Build a tag set, rejecting an empty input.
    pub fn new(tags: impl IntoIterator<Item = TagId>) -> Result<Self, BannerValidationError> {
        let set: BTreeSet<TagId> = tags.into_iter().collect();
        if set.is_empty() {
            return Err(BannerValidationError::EmptyTagSet);
        }
        Ok(Self(set))
    }

    /// Build a tag set from raw identifiers, validating each one.
    pub fn from_raw(tags: impl IntoIterator<Item = i64>) -> Result<Self, BannerValidationError> {
        let ids = tags
            .into_iter()
            .map(TagId::new)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(ids)
    }

    /// Tags in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = TagId> + '_ {
        self.0.iter().copied()
    }

    /// True when `tag` is a member.
    pub fn contains(&self, tag: TagId) -> bool {
        self.0.contains(&tag)
    }

    /// Number of distinct tags; never zero.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when both sets share at least one tag.
    pub fn intersects(&self, other: &TagSet) -> bool {
        !self.0.is_disjoint(&other.0)
    }

    /// Raw identifiers in ascending order.
    pub fn to_raw(&self) -> Vec<i64> {
        self.0.iter().map(|tag| tag.get()).collect()
    }
}

impl TryFrom<Vec<i64>> for TagSet {
    type Error = BannerValidationError;

    fn try_from(value: Vec<i64>) -> Result<Self, Self::Error> {
        Self::from_raw(value)
    }
}

impl From<TagSet> for Vec<i64> {
    fn from(value: TagSet) -> Self {
        value.to_raw()
    }
}

/// Opaque structured banner payload.
///
/// The payload is carried as an already-parsed JSON document and is never
/// inspected by the domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BannerContent(Value);

impl BannerContent {
    /// Wrap an arbitrary JSON document.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Borrow the underlying JSON document.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Unwrap the underlying JSON document.
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Encode the payload as compact JSON text.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }

    /// Decode a payload previously produced by [`Self::to_json_string`].
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw).map(Self)
    }
}

impl From<Value> for BannerContent {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<BannerValidationError> for crate::domain::Error {
    fn from(value: BannerValidationError) -> Self {
        Self::invalid_reference(value.to_string())
    }
}
