use serde_json::Value;

/// An Istio `EnvoyFilter`: a set of patches applied to the Envoy
/// configuration generated for the targeted Gateway.
///
/// The patch values are Envoy API objects and are carried without a schema.
#[derive(
    Clone,
    Debug,
    PartialEq,
    kube::CustomResource,
    serde::Deserialize,
    serde::Serialize,
    schemars::JsonSchema,
)]
#[kube(
    group = "networking.istio.io",
    version = "v1alpha3",
    kind = "EnvoyFilter",
    root = "EnvoyFilter",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct EnvoyFilterSpec {
    pub target_refs: Vec<PolicyTargetReference>,
    pub config_patches: Vec<ConfigPatch>,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PolicyTargetReference {
    pub group: String,
    pub kind: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatch {
    pub apply_to: ApplyTo,

    #[serde(rename = "match")]
    pub match_: Value,

    pub patch: Patch,
}

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize, schemars::JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplyTo {
    HttpFilter,
    NetworkFilter,
    Cluster,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
pub struct Patch {
    pub operation: PatchOperation,
    pub value: Value,
}

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize, schemars::JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatchOperation {
    Merge,
    InsertBefore,
    InsertAfter,
}

// === impl PolicyTargetReference ===

impl PolicyTargetReference {
    pub fn gateway(namespace: impl ToString, name: impl ToString) -> Self {
        Self {
            group: crate::gateway::GROUP.to_string(),
            kind: "Gateway".to_string(),
            name: name.to_string(),
            namespace: Some(namespace.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_enums_use_istio_spelling() {
        let patch = ConfigPatch {
            apply_to: ApplyTo::HttpFilter,
            match_: serde_json::json!({ "context": "GATEWAY" }),
            patch: Patch {
                operation: PatchOperation::InsertBefore,
                value: serde_json::json!({ "name": "envoy.filters.http.buffer" }),
            },
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json["applyTo"], "HTTP_FILTER");
        assert_eq!(json["match"]["context"], "GATEWAY");
        assert_eq!(json["patch"]["operation"], "INSERT_BEFORE");
    }
}
