use std::fmt;

use serde::Deserialize;
use sha1::{Digest, Sha1};

use crate::user::User;

pub type VariationIndex = usize;

/// Size of the bucket space that split distributions are expressed in.
pub const BUCKET_SIZE: u32 = 10_000;

/// Index reported when a bucket is not covered by any group of a split.
pub const INVALID_INDEX: i64 = -1;

/// Deterministically map `key` salted with `salt` onto `[0, bucket_size)`.
///
/// The bucket is the last 8 hex digits of the SHA-1 digest of `key + salt`, read as an unsigned
/// 32 bit integer, modulo `bucket_size`. Other SDKs compute exactly the same value, which is
/// what keeps a user in the same rollout group everywhere.
pub fn bucket_of(key: &str, salt: &str, bucket_size: u32) -> u32 {
    let mut hash = Sha1::new();
    hash.update(key.as_bytes());
    hash.update(salt.as_bytes());

    let digest = hash.finalize();
    let hexhash = base16ct::lower::encode_string(&digest);

    let hexhash_8 = &hexhash[hexhash.len() - 8..];
    let numhash = u32::from_str_radix(hexhash_8, 16).unwrap_or_default();

    numhash.checked_rem(bucket_size).unwrap_or(0)
}

/// Explains why a rule, serve or split did not produce a variation.
#[derive(Clone, Debug, PartialEq)]
pub enum Warning {
    /// A condition or a split needed a user attribute that the user doesn't have.
    MissingAttribute { user_key: String, attribute: String },
    /// The user's bucket falls into a gap of the split distribution.
    NoSplitGroup { bucket: u32 },
    /// A rule carries no serve at all.
    MissingServe,
    /// A serve has neither a usable select nor a split.
    MalformedServe,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MissingAttribute {
                user_key,
                attribute,
            } => write!(
                f,
                "Warning: User with key '{}' does not have attribute name '{}'",
                user_key, attribute
            ),
            Warning::NoSplitGroup { bucket } => write!(
                f,
                "Warning: bucket {} is not in any split group, selected index {}",
                bucket, INVALID_INDEX
            ),
            Warning::MissingServe => f.write_str("Rule.serve is null"),
            Warning::MalformedServe => f.write_str("Serve.split is null"),
        }
    }
}

/// Outcome of resolving a rule or a serve against a user.
#[derive(Clone, Debug, PartialEq)]
pub enum HitResult {
    Hit(VariationIndex),
    Miss(Option<Warning>),
}

impl HitResult {
    pub(crate) fn missing_attribute(user: &User, attribute: &str) -> Self {
        HitResult::Miss(Some(Warning::MissingAttribute {
            user_key: user.key().to_string(),
            attribute: attribute.to_string(),
        }))
    }

    pub fn index(&self) -> Option<VariationIndex> {
        match self {
            HitResult::Hit(index) => Some(*index),
            HitResult::Miss(_) => None,
        }
    }
}

/// A half-open `[low, high)` range over the bucket space.
pub type BucketRange = [i64; 2];

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Split {
    #[serde(default)]
    distribution: Vec<Vec<BucketRange>>,
    bucket_by: Option<String>,
    salt: Option<String>,
}

// Like the rest of the wire model this is shaped by what the server may send: a select and a
// split may both be present (select wins), and a serve with neither must not fail the whole
// snapshot, it simply never produces a variation.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Serve {
    Select { select: VariationIndex },
    Split { split: Split },
    Malformed(serde_json::Value),
}

impl Serve {
    pub fn resolve(&self, user: &User, toggle_key: &str) -> HitResult {
        match self {
            Serve::Select { select } => HitResult::Hit(*select),
            Serve::Split { split } => split.find_index(user, toggle_key),
            Serve::Malformed(_) => HitResult::Miss(Some(Warning::MalformedServe)),
        }
    }
}

impl Split {
    pub fn new(
        distribution: Vec<Vec<BucketRange>>,
        bucket_by: Option<String>,
        salt: Option<String>,
    ) -> Self {
        Split {
            distribution,
            bucket_by,
            salt,
        }
    }

    pub fn find_index(&self, user: &User, toggle_key: &str) -> HitResult {
        let hash_key = match self.bucket_by.as_deref().filter(|b| !b.trim().is_empty()) {
            Some(bucket_by) => match user.value_of(bucket_by) {
                Some(value) => value,
                None => return HitResult::missing_attribute(user, bucket_by),
            },
            None => user.key(),
        };

        let salt = match self.salt.as_deref() {
            Some(salt) if !salt.is_empty() => salt,
            _ => toggle_key,
        };

        let bucket = bucket_of(hash_key, salt, BUCKET_SIZE);
        match self.group_of(bucket) {
            Some(index) => HitResult::Hit(index),
            None => HitResult::Miss(Some(Warning::NoSplitGroup { bucket })),
        }
    }

    fn group_of(&self, bucket: u32) -> Option<VariationIndex> {
        let bucket = i64::from(bucket);
        self.distribution.iter().position(|ranges| {
            ranges
                .iter()
                .any(|[low, high]| *low <= bucket && bucket < *high)
        })
    }
}
