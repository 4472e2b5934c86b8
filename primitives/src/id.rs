use {
  serde::{Deserialize, Serialize},
  std::{
    fmt::{Debug, Display},
    ops::Deref,
    str::FromStr,
  },
};

/// Canonical identity of a condition tree.
///
/// This is a Keccak-256 digest over the node's parameter type, operator,
/// comparison value and the ids of its children in order, so two trees
/// share an id exactly when they are structurally identical. Ids of
/// normalized trees are used for deduplication, canonical ordering and
/// equality checks. They are never used as handles to a tree.
///
/// Ordering is byte-wise over the digest, which is the same as comparing
/// the digests as big-endian 256-bit numbers.
#[derive(
  Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(into = "String", try_from = "String")]
pub struct ConditionId([u8; 32]);

impl ConditionId {
  pub(crate) fn from_digest(digest: &[u8]) -> Self {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest[..32]);
    Self(bytes)
  }

  pub fn as_bytes(&self) -> &[u8; 32] {
    &self.0
  }
}

impl AsRef<[u8]> for ConditionId {
  fn as_ref(&self) -> &[u8] {
    &self.0
  }
}

impl Deref for ConditionId {
  type Target = [u8];

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

impl Display for ConditionId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "0x{}", hex::encode(self.0))
  }
}

impl Debug for ConditionId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "condition(0x{})", hex::encode(self.0))
  }
}

impl From<ConditionId> for String {
  fn from(id: ConditionId) -> Self {
    id.to_string()
  }
}

impl FromStr for ConditionId {
  type Err = hex::FromHexError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let mut bytes = [0u8; 32];
    hex::decode_to_slice(s.strip_prefix("0x").unwrap_or(s), &mut bytes)?;
    Ok(Self(bytes))
  }
}

impl TryFrom<String> for ConditionId {
  type Error = hex::FromHexError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    FromStr::from_str(&value)
  }
}
