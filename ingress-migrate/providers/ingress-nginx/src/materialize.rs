//! Lowers a completed IR into target resources.

mod envoy_filter;
mod reference_grant;
mod ssl_redirect;

use crate::config::GatewayConfig;
use ingress_migrate_core::{
    ir::Ir, Diagnostic, DiagnosticSink, GatewayResources, ObjectRef,
};

/// Builds the generic resources of the IR plus the redirect routes, Envoy
/// extensions and reference grants its ingress-nginx settings require.
pub(crate) fn materialize(
    ir: &Ir,
    config: &GatewayConfig,
    sink: &dyn DiagnosticSink,
) -> GatewayResources {
    let mut resources = GatewayResources::from_ir(ir);
    ssl_redirect::build(ir, &mut resources, sink);
    envoy_filter::build(ir, config, &mut resources, sink);
    reference_grant::build(config, &mut resources, sink);
    if config.is_centralized() {
        shared_gateway_warnings(ir, config, sink);
    }
    resources
}

/// Auth settings on a shared gateway apply to every tenant's traffic.
fn shared_gateway_warnings(ir: &Ir, config: &GatewayConfig, sink: &dyn DiagnosticSink) {
    let gateway = format!("{}/{}", config.namespace, config.name);
    for (id, route) in &ir.http_routes {
        let Some(ext) = route.ingress_nginx() else {
            continue;
        };
        if ext.external_auth.is_some() {
            sink.emit(
                Diagnostic::advisory(format!(
                    "the ext_authz filter for external auth targets the shared Gateway {gateway} and applies to all of its routes; \
                     use per-namespace gateways to scope it"
                ))
                .about(ObjectRef::http_route(id.clone())),
            );
        }
        if ext.client_cert_auth.is_some() {
            sink.emit(
                Diagnostic::advisory(format!(
                    "client certificate validation on the shared Gateway {gateway} applies to every route on its listener; \
                     use per-namespace gateways or validate the passed certificate in the application"
                ))
                .about(ObjectRef::http_route(id.clone())),
            );
        }
    }
}
