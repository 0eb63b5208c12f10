#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use ingress_migrate_core as core;
pub use ingress_migrate_ingress_nginx as ingress_nginx;
pub use ingress_migrate_k8s_api as k8s;

mod args;
mod log;
pub mod output;
pub mod read;

pub use self::{
    args::Args,
    log::LogFormat,
    output::OutputFormat,
    read::{read_manifests, Filter, ReadError},
};

use anyhow::Result;
use crate::core::{
    DiagnosticSink, ErrorList, GatewayResources, ProviderConf, ProviderRegistry, Sources,
};
use tracing::info;

/// The registry of all built-in providers.
pub fn registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::default();
    ingress_nginx::register(&mut registry);
    registry
}

/// Runs each named provider over the sources and merges their output. When
/// providers produce the same resource, the first one wins.
pub fn convert(
    registry: &ProviderRegistry,
    providers: &[String],
    conf: &ProviderConf,
    sources: &Sources,
    sink: &dyn DiagnosticSink,
) -> Result<(GatewayResources, ErrorList)> {
    let mut resources = GatewayResources::default();
    let mut errors = ErrorList::new();
    for name in providers {
        let provider = registry.build(name, conf)?;
        let (output, errs) = provider.convert(sources, sink);
        info!(
            provider = provider.name(),
            gateways = output.gateways.len(),
            routes = output.http_routes.len(),
            errors = errs.len(),
            "Converted"
        );
        resources.merge(output);
        errors.extend(errs);
    }
    Ok((resources, errors))
}
