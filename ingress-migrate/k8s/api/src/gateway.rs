pub mod backend_tls_policy;
pub mod gateways;
pub mod httproute;
pub mod reference_grant;

pub use self::{
    backend_tls_policy::{
        BackendTlsPolicy, BackendTlsPolicySpec, BackendTlsPolicyValidation,
        LocalPolicyTargetReference, WellKnownCaCertificates,
    },
    gateways::{Gateway, GatewaySpec, Listener, SecretObjectReference},
    httproute::{
        gateway_parent_ref, parent_ref_targets_gateway, HTTPRouteParentRefs,
        HTTPRouteRulesBackendRefs, HTTPRouteRulesMatches, HTTPRouteRulesMatchesPath,
        HTTPRouteRulesMatchesPathType, HttpRequestRedirectFilter, HttpRoute, HttpRouteFilter,
        HttpRouteRule, HttpRouteSpec, HttpRouteTimeouts,
    },
    reference_grant::{ReferenceGrant, ReferenceGrantFrom, ReferenceGrantSpec, ReferenceGrantTo},
};

pub const GROUP: &str = "gateway.networking.k8s.io";
