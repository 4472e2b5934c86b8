use {
  crate::{ConditionId, Operator, ParameterType},
  alloy_primitives::Bytes,
  multihash::{Hasher, Keccak256},
  once_cell::sync::OnceCell,
  serde::{Deserialize, Serialize},
  std::hash::Hash,
  thiserror::Error,
};

/// Condition trees deeper than this are rejected at construction.
///
/// Every recursive walk over a condition (hashing, normalization,
/// decoding, matching) is bounded by this depth.
pub const MAX_CONDITION_DEPTH: usize = 64;

/// Upper bound on the number of branches of an `ArraySubset` node.
pub const MAX_SUBSET_BRANCHES: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionError {
  #[error("{operator:?} is not allowed on parameter type {param_type:?}")]
  ParamTypeNotAllowed {
    param_type: ParameterType,
    operator: Operator,
  },

  #[error("{0:?} requires at least one child condition")]
  MissingChildren(Operator),

  #[error("{0:?} takes exactly one child condition")]
  ExpectedSingleChild(Operator),

  #[error("{0:?} accepts at most {1} child conditions")]
  TooManyChildren(Operator, usize),

  #[error("{0:?} on {1:?} does not take child conditions")]
  UnexpectedChildren(Operator, ParameterType),

  #[error("{0:?} requires child conditions describing its layout")]
  MissingLayout(ParameterType),

  #[error("{0:?} requires a comparison value")]
  MissingCompValue(Operator),

  #[error("{0:?} does not take a comparison value")]
  UnexpectedCompValue(Operator),

  #[error(
    "{operator:?} expects a {expected}-byte comparison value, got {actual} \
     bytes"
  )]
  CompValueLength {
    operator: Operator,
    expected: usize,
    actual: usize,
  },

  #[error(
    "comparison value must be a whole number of 32-byte words, got {0} \
     bytes"
  )]
  UnalignedCompValue(usize),

  #[error("condition tree is deeper than {} levels", MAX_CONDITION_DEPTH)]
  TooDeep,
}

/// A node in a permission condition tree.
///
/// Conditions describe constraints over the ABI-encoded arguments of a
/// function call. Structural nodes (`Matches` over tuples, arrays and
/// calldata) have one child per decoded field, while logical nodes
/// (`And`, `Or`, `Nor`) combine alternative constraints over the same
/// span of calldata.
///
/// Conditions are immutable. Every constructor validates the node against
/// the rules of its operator, so a `Condition` value is always consistent
/// and its canonical id can always be computed. Transformations such as
/// normalization produce new trees and share nothing mutable.
///
/// Equality and hashing are structural: two conditions are equal iff
/// their [`ConditionId`]s are equal.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "RawCondition", into = "RawCondition")]
pub struct Condition {
  param_type: ParameterType,
  operator: Operator,
  children: Vec<Condition>,
  comp_value: Option<Bytes>,
  depth: usize,
  id_cache: OnceCell<ConditionId>,
}

/// Wire representation, validated on its way into a [`Condition`].
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCondition {
  param_type: ParameterType,
  operator: Operator,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  children: Vec<Condition>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  comp_value: Option<Bytes>,
}

impl TryFrom<RawCondition> for Condition {
  type Error = ConditionError;

  fn try_from(raw: RawCondition) -> Result<Self, Self::Error> {
    Condition::new(raw.param_type, raw.operator, raw.children, raw.comp_value)
  }
}

impl From<Condition> for RawCondition {
  fn from(condition: Condition) -> Self {
    RawCondition {
      param_type: condition.param_type,
      operator: condition.operator,
      children: condition.children,
      comp_value: condition.comp_value,
    }
  }
}

impl Condition {
  /// Validates and constructs a condition node.
  pub fn new(
    param_type: ParameterType,
    operator: Operator,
    children: Vec<Condition>,
    comp_value: Option<Bytes>,
  ) -> Result<Self, ConditionError> {
    validate(param_type, operator, &children, comp_value.as_ref())?;
    let condition = Self::assemble(param_type, operator, children, comp_value);
    if condition.depth > MAX_CONDITION_DEPTH {
      return Err(ConditionError::TooDeep);
    }
    Ok(condition)
  }

  /// A node that places no constraint on its field.
  pub fn pass(param_type: ParameterType) -> Result<Self, ConditionError> {
    Self::new(param_type, Operator::Pass, vec![], None)
  }

  /// A structural node whose children must match the decoded fields.
  pub fn matches(
    param_type: ParameterType,
    children: Vec<Condition>,
  ) -> Result<Self, ConditionError> {
    Self::new(param_type, Operator::Matches, children, None)
  }

  pub fn and(children: Vec<Condition>) -> Result<Self, ConditionError> {
    Self::new(ParameterType::None, Operator::And, children, None)
  }

  pub fn or(children: Vec<Condition>) -> Result<Self, ConditionError> {
    Self::new(ParameterType::None, Operator::Or, children, None)
  }

  pub fn nor(children: Vec<Condition>) -> Result<Self, ConditionError> {
    Self::new(ParameterType::None, Operator::Nor, children, None)
  }

  /// A leaf predicate comparing its field against `comp_value`.
  pub fn compare(
    param_type: ParameterType,
    operator: Operator,
    comp_value: impl Into<Bytes>,
  ) -> Result<Self, ConditionError> {
    Self::new(param_type, operator, vec![], Some(comp_value.into()))
  }

  /// Builds a node without validation. Only used by transformations
  /// that provably preserve validity.
  pub(crate) fn assemble(
    param_type: ParameterType,
    operator: Operator,
    children: Vec<Condition>,
    comp_value: Option<Bytes>,
  ) -> Self {
    let depth = 1 + children.iter().map(|c| c.depth).max().unwrap_or(0);
    Self {
      param_type,
      operator,
      children,
      comp_value,
      depth,
      id_cache: OnceCell::new(),
    }
  }

  /// Same node with a different list of children.
  pub(crate) fn with_children(self, children: Vec<Condition>) -> Self {
    Self::assemble(self.param_type, self.operator, children, self.comp_value)
  }

  pub(crate) fn into_children(self) -> Vec<Condition> {
    self.children
  }

  pub fn param_type(&self) -> ParameterType {
    self.param_type
  }

  pub fn operator(&self) -> Operator {
    self.operator
  }

  pub fn children(&self) -> &[Condition] {
    &self.children
  }

  pub fn comp_value(&self) -> Option<&Bytes> {
    self.comp_value.as_ref()
  }

  /// Number of levels in this tree, a leaf has depth 1.
  pub fn depth(&self) -> usize {
    self.depth
  }

  /// Canonical content hash of this tree.
  ///
  /// Note that this is the id of the tree as it is, callers that want
  /// semantic identity should hash the normalized tree.
  pub fn id(&self) -> ConditionId {
    *self.id_cache.get_or_init(|| {
      let mut hasher = Keccak256::default();
      hasher.update(&[self.param_type as u8, self.operator as u8]);
      match &self.comp_value {
        Some(value) => {
          hasher.update(&[1]);
          hasher.update(&(value.len() as u32).to_be_bytes());
          hasher.update(value);
        }
        None => hasher.update(&[0]),
      }
      hasher.update(&(self.children.len() as u32).to_be_bytes());
      for child in &self.children {
        hasher.update(child.id().as_ref());
      }
      ConditionId::from_digest(hasher.finalize())
    })
  }

  /// Visits all nodes of the tree in pre-order.
  pub fn for_each<F>(&self, op: &mut F)
  where
    F: FnMut(&Condition),
  {
    op(self);
    for child in &self.children {
      child.for_each(op);
    }
  }
}

impl PartialEq for Condition {
  fn eq(&self, other: &Self) -> bool {
    self.id() == other.id()
  }
}

impl Eq for Condition {}

impl Hash for Condition {
  fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
    self.id().hash(state);
  }
}

impl std::fmt::Debug for Condition {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let mut s = f.debug_struct("Condition");
    s.field("param_type", &self.param_type);
    s.field("operator", &self.operator);
    if let Some(value) = &self.comp_value {
      s.field("comp_value", value);
    }
    if !self.children.is_empty() {
      s.field("children", &self.children);
    }
    s.finish()
  }
}

fn validate(
  param_type: ParameterType,
  operator: Operator,
  children: &[Condition],
  comp_value: Option<&Bytes>,
) -> Result<(), ConditionError> {
  use {Operator::*, ParameterType as P};

  let allowed = match operator {
    And | Or | Nor => param_type == P::None,
    Pass | Custom => param_type != P::None,
    Matches => matches!(
      param_type,
      P::Tuple | P::Array | P::Calldata | P::AbiEncoded
    ),
    ArraySome | ArrayEvery | ArraySubset => param_type == P::Array,
    EqualTo => {
      matches!(param_type, P::Static | P::Dynamic | P::Tuple | P::Array)
    }
    GreaterThan
    | LessThan
    | SignedIntGreaterThan
    | SignedIntLessThan
    | EqualToAvatar
    | WithinAllowance => param_type == P::Static,
    Bitmask => matches!(param_type, P::Static | P::Dynamic),
    EtherWithinAllowance | CallWithinAllowance => param_type == P::None,
  };

  if !allowed {
    return Err(ConditionError::ParamTypeNotAllowed {
      param_type,
      operator,
    });
  }

  match operator {
    And | Or | Nor | Matches if children.is_empty() => {
      return Err(ConditionError::MissingChildren(operator))
    }
    ArraySome | ArrayEvery if children.len() != 1 => {
      return Err(ConditionError::ExpectedSingleChild(operator))
    }
    ArraySubset if children.is_empty() => {
      return Err(ConditionError::MissingChildren(operator))
    }
    ArraySubset if children.len() > MAX_SUBSET_BRANCHES => {
      return Err(ConditionError::TooManyChildren(
        operator,
        MAX_SUBSET_BRANCHES,
      ))
    }
    And | Or | Nor | Matches | ArraySome | ArrayEvery | ArraySubset => {}
    _ => match param_type {
      P::Static | P::Dynamic | P::None if !children.is_empty() => {
        return Err(ConditionError::UnexpectedChildren(operator, param_type))
      }
      P::Tuple | P::Array if children.is_empty() => {
        return Err(ConditionError::MissingLayout(param_type))
      }
      _ => {}
    },
  }

  match operator {
    Pass | And | Or | Nor | Matches | ArraySome | ArrayEvery | ArraySubset
    | EqualToAvatar => match comp_value {
      Some(_) => Err(ConditionError::UnexpectedCompValue(operator)),
      None => Ok(()),
    },
    EqualTo => match comp_value {
      None => Err(ConditionError::MissingCompValue(operator)),
      Some(value) if value.is_empty() => {
        Err(ConditionError::MissingCompValue(operator))
      }
      // encodings of everything but a dynamic value are word aligned
      Some(value) if param_type != P::Dynamic && value.len() % 32 != 0 => {
        Err(ConditionError::UnalignedCompValue(value.len()))
      }
      Some(_) => Ok(()),
    },
    _ => match comp_value {
      None => Err(ConditionError::MissingCompValue(operator)),
      Some(value) if value.len() != 32 => {
        Err(ConditionError::CompValueLength {
          operator,
          expected: 32,
          actual: value.len(),
        })
      }
      Some(_) => Ok(()),
    },
  }
}

#[cfg(test)]
mod tests {
  use crate::{
    Condition,
    ConditionError,
    Operator,
    ParameterType,
    MAX_CONDITION_DEPTH,
  };

  fn word(byte: u8) -> Vec<u8> {
    let mut word = vec![0u8; 32];
    word[31] = byte;
    word
  }

  #[test]
  fn structural_identity() -> anyhow::Result<()> {
    let a = Condition::matches(ParameterType::Calldata, vec![
      Condition::compare(ParameterType::Static, Operator::EqualTo, word(1))?,
      Condition::pass(ParameterType::Dynamic)?,
    ])?;
    let b = Condition::matches(ParameterType::Calldata, vec![
      Condition::compare(ParameterType::Static, Operator::EqualTo, word(1))?,
      Condition::pass(ParameterType::Dynamic)?,
    ])?;
    let c = Condition::matches(ParameterType::Calldata, vec![
      Condition::compare(ParameterType::Static, Operator::EqualTo, word(2))?,
      Condition::pass(ParameterType::Dynamic)?,
    ])?;

    assert_eq!(a.id(), b.id());
    assert_eq!(a, b);
    assert_ne!(a.id(), c.id());
    assert_eq!(a.depth(), 2);
    Ok(())
  }

  #[test]
  fn child_order_changes_identity() -> anyhow::Result<()> {
    let equal = |n| {
      Condition::compare(ParameterType::Static, Operator::EqualTo, word(n))
    };
    let (x, y) = (equal(1)?, equal(2)?);
    let xy = Condition::or(vec![x.clone(), y.clone()])?;
    let yx = Condition::or(vec![y, x])?;
    assert_ne!(xy.id(), yx.id());
    Ok(())
  }

  #[test]
  fn empty_and_missing_comp_values_hash_differently() -> anyhow::Result<()> {
    let pass = Condition::pass(ParameterType::Dynamic)?;
    let equal =
      Condition::compare(ParameterType::Dynamic, Operator::EqualTo, vec![0u8])?;
    assert_ne!(pass.id(), equal.id());
    Ok(())
  }

  #[test]
  fn rejects_inconsistent_nodes() -> anyhow::Result<()> {
    assert_eq!(
      Condition::or(vec![]).unwrap_err(),
      ConditionError::MissingChildren(Operator::Or)
    );
    assert_eq!(
      Condition::matches(ParameterType::Static, vec![
        Condition::pass(ParameterType::Static)?
      ])
      .unwrap_err(),
      ConditionError::ParamTypeNotAllowed {
        param_type: ParameterType::Static,
        operator: Operator::Matches
      }
    );
    assert_eq!(
      Condition::compare(ParameterType::Static, Operator::GreaterThan, vec![
        1u8, 2
      ])
      .unwrap_err(),
      ConditionError::CompValueLength {
        operator: Operator::GreaterThan,
        expected: 32,
        actual: 2
      }
    );
    assert_eq!(
      Condition::compare(ParameterType::Static, Operator::EqualTo, vec![1u8])
        .unwrap_err(),
      ConditionError::UnalignedCompValue(1)
    );
    assert_eq!(
      Condition::new(
        ParameterType::Tuple,
        Operator::EqualTo,
        vec![
          Condition::pass(ParameterType::Static)?,
          Condition::pass(ParameterType::Static)?,
        ],
        Some(vec![1u8, 2, 3, 4, 5].into()),
      )
      .unwrap_err(),
      ConditionError::UnalignedCompValue(5)
    );
    assert_eq!(
      Condition::pass(ParameterType::Tuple).unwrap_err(),
      ConditionError::MissingLayout(ParameterType::Tuple)
    );
    assert_eq!(
      Condition::new(
        ParameterType::Array,
        Operator::ArraySome,
        vec![
          Condition::pass(ParameterType::Static)?,
          Condition::pass(ParameterType::Static)?
        ],
        None
      )
      .unwrap_err(),
      ConditionError::ExpectedSingleChild(Operator::ArraySome)
    );
    assert_eq!(
      Condition::new(
        ParameterType::Static,
        Operator::Pass,
        vec![],
        Some(word(1).into())
      )
      .unwrap_err(),
      ConditionError::UnexpectedCompValue(Operator::Pass)
    );
    Ok(())
  }

  #[test]
  fn depth_is_bounded() -> anyhow::Result<()> {
    let mut condition = Condition::pass(ParameterType::Static)?;
    for _ in 1..MAX_CONDITION_DEPTH {
      condition =
        Condition::matches(ParameterType::AbiEncoded, vec![condition])?;
    }
    assert_eq!(condition.depth(), MAX_CONDITION_DEPTH);
    assert_eq!(
      Condition::matches(ParameterType::AbiEncoded, vec![condition])
        .unwrap_err(),
      ConditionError::TooDeep
    );
    Ok(())
  }

  #[test]
  fn json_wire_format() -> anyhow::Result<()> {
    let json = r#"{
      "paramType": 5,
      "operator": 5,
      "children": [
        { "paramType": 1, "operator": 0 },
        {
          "paramType": 2,
          "operator": 16,
          "compValue": "0xaabbccdd"
        }
      ]
    }"#;

    let condition: Condition = serde_json::from_str(json)?;
    assert_eq!(condition.param_type(), ParameterType::Calldata);
    assert_eq!(condition.operator(), Operator::Matches);
    assert_eq!(condition.children().len(), 2);
    assert_eq!(
      condition.children()[1].comp_value().map(|v| v.to_vec()),
      Some(vec![0xaa, 0xbb, 0xcc, 0xdd])
    );

    let roundtrip: Condition =
      serde_json::from_str(&serde_json::to_string(&condition)?)?;
    assert_eq!(roundtrip.id(), condition.id());

    let encoded = serde_json::to_value(&condition)?;
    assert!(encoded["children"][0].get("children").is_none());
    assert!(encoded["children"][0].get("compValue").is_none());
    Ok(())
  }

  #[test]
  fn json_rejects_invalid_trees() {
    // Or without children
    assert!(
      serde_json::from_str::<Condition>(r#"{"paramType":0,"operator":2}"#)
        .is_err()
    );
    // unknown operator
    assert!(
      serde_json::from_str::<Condition>(r#"{"paramType":1,"operator":4}"#)
        .is_err()
    );
  }
}
