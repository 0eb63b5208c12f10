/// BackendTLSPolicy describes how a Gateway should connect to a backend via
/// TLS.
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
    group = "gateway.networking.k8s.io",
    version = "v1",
    kind = "BackendTLSPolicy",
    root = "BackendTlsPolicy",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct BackendTlsPolicySpec {
    pub target_refs: Vec<LocalPolicyTargetReference>,
    pub validation: BackendTlsPolicyValidation,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocalPolicyTargetReference {
    pub group: String,
    pub kind: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_name: Option<String>,
}

/// Exactly one of `ca_certificate_refs` and `well_known_ca_certificates` is
/// set.
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackendTlsPolicyValidation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_certificate_refs: Option<Vec<LocalObjectReference>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "wellKnownCACertificates"
    )]
    pub well_known_ca_certificates: Option<WellKnownCaCertificates>,

    /// The SNI name and the name the backend certificate is validated against.
    pub hostname: String,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
pub struct LocalObjectReference {
    pub group: String,
    pub kind: String,
    pub name: String,
}

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize, schemars::JsonSchema,
)]
pub enum WellKnownCaCertificates {
    System,
}

// === impl BackendTlsPolicyValidation ===

impl BackendTlsPolicyValidation {
    pub fn system(hostname: impl ToString) -> Self {
        Self {
            ca_certificate_refs: None,
            well_known_ca_certificates: Some(WellKnownCaCertificates::System),
            hostname: hostname.to_string(),
        }
    }

    pub fn config_map(hostname: impl ToString, config_map: impl ToString) -> Self {
        Self {
            ca_certificate_refs: Some(vec![LocalObjectReference {
                group: String::new(),
                kind: "ConfigMap".to_string(),
                name: config_map.to_string(),
            }]),
            well_known_ca_certificates: None,
            hostname: hostname.to_string(),
        }
    }
}
