use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::conditions::{Condition, StatusConditions};

pub const NODE_POOL_LABEL: &str = "karpenter.sh/nodepool";
pub const CAPACITY_TYPE_LABEL: &str = "karpenter.sh/capacity-type";

/// Set by the launch controller once the cloud provider returned an instance.
pub const CONDITION_LAUNCHED: &str = "Launched";
/// Set by the registration controller once the node joined the cluster.
pub const CONDITION_REGISTERED: &str = "Registered";

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[kube(
    group = "karpenter.sh",
    version = "v1",
    kind = "NodeClaim",
    plural = "nodeclaims",
    shortname = "nc",
    status = "NodeClaimStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct NodeClaimSpec {
    /// Provider-specific node class this claim is launched against
    pub node_class_ref: Option<NodeClassReference>,
    /// Scheduling requirements the launched instance must satisfy
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<NodeSelectorRequirement>,
    /// Lifetime after which the node is replaced (e.g. "720h"), or "Never"
    pub expire_after: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct NodeClassReference {
    pub group: String,
    pub kind: String,
    pub name: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct NodeSelectorRequirement {
    pub key: String,
    pub operator: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct NodeClaimStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl NodeClaim {
    /// Owning pool, or `None` when the label is missing or empty.
    pub fn node_pool_name(&self) -> Option<&str> {
        self.labels()
            .get(NODE_POOL_LABEL)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    pub fn capacity_type(&self) -> &str {
        self.labels()
            .get(CAPACITY_TYPE_LABEL)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

impl StatusConditions for NodeClaim {
    fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default()
    }
}
