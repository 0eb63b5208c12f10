//! The intermediate representation shared by the route resolver, provider
//! feature passes and resource materializers.
//!
//! An `Ir` holds one conversion run's provisional Gateway API objects along
//! with provider-specific settings that have no direct Gateway API field.
//! Provider settings live in per-provider records that stay `None` until a
//! provider first writes to them.

pub mod ingress_nginx;

pub use self::ingress_nginx::{IngressNginxHttpRouteIr, IngressNginxServiceIr};
use crate::{k8s::gateway, ResourceId};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ir {
    pub gateways: BTreeMap<ResourceId, gateway::Gateway>,
    pub http_routes: BTreeMap<ResourceId, HttpRouteContext>,
    pub services: BTreeMap<ResourceId, ServiceContext>,
    pub backend_tls_policies: BTreeMap<ResourceId, gateway::BackendTlsPolicy>,
    pub reference_grants: BTreeMap<ResourceId, gateway::ReferenceGrant>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HttpRouteContext {
    pub route: gateway::HttpRoute,
    pub provider: ProviderHttpRouteIr,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderHttpRouteIr {
    pub ingress_nginx: Option<IngressNginxHttpRouteIr>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServiceContext {
    pub provider: ProviderServiceIr,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderServiceIr {
    pub ingress_nginx: Option<IngressNginxServiceIr>,
}

// === impl HttpRouteContext ===

impl HttpRouteContext {
    pub fn new(route: gateway::HttpRoute) -> Self {
        Self {
            route,
            provider: ProviderHttpRouteIr::default(),
        }
    }

    /// The ingress-nginx record, allocated on first use.
    pub fn ingress_nginx_mut(&mut self) -> &mut IngressNginxHttpRouteIr {
        self.provider.ingress_nginx.get_or_insert_with(Default::default)
    }

    pub fn ingress_nginx(&self) -> Option<&IngressNginxHttpRouteIr> {
        self.provider.ingress_nginx.as_ref()
    }
}

// === impl ServiceContext ===

impl ServiceContext {
    /// The ingress-nginx record, allocated on first use.
    pub fn ingress_nginx_mut(&mut self) -> &mut IngressNginxServiceIr {
        self.provider.ingress_nginx.get_or_insert_with(Default::default)
    }

    pub fn ingress_nginx(&self) -> Option<&IngressNginxServiceIr> {
        self.provider.ingress_nginx.as_ref()
    }
}
