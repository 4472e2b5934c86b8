use {
  crate::Permission,
  serde::{Deserialize, Serialize},
};

/// A pointer to an externally published permission bundle.
///
/// `uri` resolves to a list of permissions, `schema` to the API description
/// of the service publishing it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Annotation {
  pub uri: String,
  pub schema: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiInfo {
  pub title: String,
  pub version: String,
}

/// A resolved annotation: a reusable bundle of permissions and where it
/// came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
  pub uri: String,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub server_url: Option<String>,

  #[serde(default)]
  pub api_info: ApiInfo,

  pub permissions: Vec<Permission>,
}
