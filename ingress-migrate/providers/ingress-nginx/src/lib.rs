#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Converts ingress-nginx Ingresses into Gateway API resources, with Istio
//! EnvoyFilters for the settings Gateway API cannot express.

pub mod annotations;
pub mod config;
mod features;
mod materialize;
mod topology;


pub use self::config::{ConfigError, GatewayConfig, GatewayMode};
use anyhow::{Context, Result};
use ingress_migrate_core::{
    routes::{self, RouteIndex},
    DiagnosticSink, ErrorList, GatewayResources, Ir, Provider, ProviderConf, ProviderRegistry,
    Sources,
};
use tracing::debug;

pub const NAME: &str = "ingress-nginx";

#[derive(Clone, Debug)]
pub struct IngressNginxProvider {
    ingress_class: String,
    gateway: GatewayConfig,
}

/// Registers the provider under [`NAME`].
pub fn register(registry: &mut ProviderRegistry) {
    registry.register(NAME, |conf| {
        let provider = IngressNginxProvider::from_conf(conf)?;
        Ok(Box::new(provider))
    });
}

// === impl IngressNginxProvider ===

impl IngressNginxProvider {
    pub fn new(ingress_class: impl Into<String>, gateway: GatewayConfig) -> Self {
        Self {
            ingress_class: ingress_class.into(),
            gateway,
        }
    }

    pub fn from_conf(conf: &ProviderConf) -> Result<Self> {
        let gateway = GatewayConfig::from_conf(conf)
            .with_context(|| format!("invalid {NAME} provider configuration"))?;
        let ingress_class = if conf.ingress_class.is_empty() {
            "nginx".to_string()
        } else {
            conf.ingress_class.clone()
        };
        Ok(Self::new(ingress_class, gateway))
    }
}

impl Provider for IngressNginxProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn to_ir(&self, sources: &Sources, sink: &dyn DiagnosticSink) -> (Ir, ErrorList) {
        let routes::Resolution {
            rule_groups,
            mut ir,
            mut errors,
        } = routes::resolve(sources, &self.ingress_class);
        debug!(
            routes = ir.http_routes.len(),
            gateways = ir.gateways.len(),
            "Resolved routes"
        );

        let index = RouteIndex::new(&rule_groups, &ir);
        let ctx = features::PassContext {
            sources,
            routes: &index,
            sink,
        };
        errors.extend(features::apply_all(&ctx, &mut ir));
        (ir, errors)
    }

    fn to_gateway_resources(
        &self,
        ir: Ir,
        sink: &dyn DiagnosticSink,
    ) -> (GatewayResources, ErrorList) {
        let mut resources = materialize::materialize(&ir, &self.gateway, sink);
        topology::apply(&self.gateway, &mut resources);
        debug!(
            mode = %self.gateway.mode,
            gateways = resources.gateways.len(),
            routes = resources.http_routes.len(),
            "Materialized"
        );
        (resources, ErrorList::new())
    }
}
