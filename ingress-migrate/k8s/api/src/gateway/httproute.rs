pub use gateway_api::apis::experimental::httproutes::{
    HTTPRouteParentRefs, HTTPRouteRulesBackendRefs, HTTPRouteRulesMatches,
    HTTPRouteRulesMatchesPath, HTTPRouteRulesMatchesPathType,
};

use crate::duration::K8sDuration;

/// HTTPRoute provides a way to route HTTP requests. This includes the
/// capability to match requests by hostname, path, header, or query param.
/// Filters can be used to specify additional processing steps. Backends specify
/// where matching requests should be routed.
#[derive(
    Clone,
    Debug,
    Default,
    PartialEq,
    kube::CustomResource,
    serde::Deserialize,
    serde::Serialize,
    schemars::JsonSchema,
)]
#[kube(
    group = "gateway.networking.k8s.io",
    version = "v1",
    kind = "HTTPRoute",
    root = "HttpRoute",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct HttpRouteSpec {
    /// The Gateways (and listeners) this route attaches to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_refs: Option<Vec<HTTPRouteParentRefs>>,

    /// Hostnames matched against the HTTP Host header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostnames: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<HttpRouteRule>>,
}

/// HTTPRouteRule defines semantics for matching an HTTP request based on
/// conditions (matches), processing it (filters), and forwarding the request to
/// an API object (backendRefs).
#[derive(
    Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize, schemars::JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub struct HttpRouteRule {
    /// If no matches are specified, the default is a prefix path match on
    /// "/", which has the effect of matching every HTTP request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matches: Option<Vec<HTTPRouteRulesMatches>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<HttpRouteFilter>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_refs: Option<Vec<HTTPRouteRulesBackendRefs>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeouts: Option<HttpRouteTimeouts>,
}

/// HTTPRouteFilter defines processing steps that must be completed during the
/// request or response lifecycle.
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(tag = "type", rename_all = "PascalCase")]
pub enum HttpRouteFilter {
    /// RequestRedirect defines a schema for a filter that responds to the
    /// request with an HTTP redirection.
    #[serde(rename_all = "camelCase")]
    RequestRedirect {
        request_redirect: HttpRequestRedirectFilter,
    },
}

/// Responds to a request with an HTTP redirection.
#[derive(
    Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize, schemars::JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequestRedirectFilter {
    /// `http` or `https`. When empty, the scheme of the request is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// One of 301 or 302. Defaults to 302.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

/// HTTPRouteTimeouts defines timeouts that can be configured for an HTTPRoute.
#[derive(
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    serde::Deserialize,
    serde::Serialize,
    schemars::JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub struct HttpRouteTimeouts {
    /// Time allowed for the gateway to respond to a client request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<K8sDuration>,

    /// Time allowed for an individual request from the gateway to a backend.
    /// Must not exceed `request`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_request: Option<K8sDuration>,
}

// === impl HttpRouteSpec ===

impl HttpRouteSpec {
    pub fn parent_refs(&self) -> impl Iterator<Item = &HTTPRouteParentRefs> {
        self.parent_refs.iter().flatten()
    }

    pub fn parent_refs_mut(&mut self) -> impl Iterator<Item = &mut HTTPRouteParentRefs> {
        self.parent_refs.iter_mut().flatten()
    }

    pub fn rules_mut(&mut self) -> impl Iterator<Item = &mut HttpRouteRule> {
        self.rules.iter_mut().flatten()
    }

    pub fn hostnames(&self) -> impl Iterator<Item = &str> {
        self.hostnames.iter().flatten().map(String::as_str)
    }
}

/// Returns a reference to a Gateway (or one of its listeners) by name.
pub fn gateway_parent_ref(
    namespace: Option<String>,
    name: impl ToString,
    section_name: Option<String>,
) -> HTTPRouteParentRefs {
    HTTPRouteParentRefs {
        group: Some(super::GROUP.to_string()),
        kind: Some("Gateway".to_string()),
        namespace,
        name: name.to_string(),
        section_name,
        port: None,
    }
}

/// Returns true if the parent reference (when resolved against the route's
/// namespace) names the given gateway.
pub fn parent_ref_targets_gateway(
    parent_ref: &HTTPRouteParentRefs,
    route_namespace: &str,
    gateway_namespace: &str,
    gateway_name: &str,
) -> bool {
    let is_gateway = parent_ref.kind.as_deref().unwrap_or("Gateway") == "Gateway"
        && parent_ref.group.as_deref().unwrap_or(super::GROUP) == super::GROUP;
    let namespace = parent_ref.namespace.as_deref().unwrap_or(route_namespace);
    is_gateway && namespace == gateway_namespace && parent_ref.name == gateway_name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_ref_namespace_defaults_to_route() {
        let parent = gateway_parent_ref(None, "nginx", None);
        assert!(parent_ref_targets_gateway(&parent, "ns-0", "ns-0", "nginx"));
        assert!(!parent_ref_targets_gateway(&parent, "ns-1", "ns-0", "nginx"));

        let parent = gateway_parent_ref(Some("istio-system".to_string()), "nginx", None);
        assert!(parent_ref_targets_gateway(&parent, "ns-1", "istio-system", "nginx"));
        assert!(!parent_ref_targets_gateway(&parent, "ns-1", "istio-system", "other"));
    }

    #[test]
    fn parent_ref_of_another_kind_does_not_target_gateway() {
        let parent = HTTPRouteParentRefs {
            kind: Some("Service".to_string()),
            group: Some("core".to_string()),
            ..gateway_parent_ref(None, "nginx", None)
        };
        assert!(!parent_ref_targets_gateway(&parent, "ns-0", "ns-0", "nginx"));
    }

    #[test]
    fn redirect_filter_serializes_tagged() {
        let filter = HttpRouteFilter::RequestRedirect {
            request_redirect: HttpRequestRedirectFilter {
                scheme: Some("https".to_string()),
                status_code: Some(301),
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "RequestRedirect",
                "requestRedirect": { "scheme": "https", "statusCode": 301 },
            })
        );
    }
}
