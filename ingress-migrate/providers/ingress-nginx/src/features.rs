//! Annotation passes that refine the resolved IR.
//!
//! Each pass reads every Ingress, skips those without its trigger annotation,
//! and records malformed values as field errors without aborting. Passes
//! write only to routes the resolver produced; an Ingress whose routes are
//! missing from the IR is skipped.

mod app_level;
mod backend_protocol;
mod client_cert_auth;
mod external_auth;
mod proxy_settings;
mod rate_limit;
mod ssl_redirect;
mod timeout;

use ingress_migrate_core::{
    ir::{HttpRouteContext, Ir},
    k8s::{Ingress, IngressBackend},
    routes::RouteIndex,
    Diagnostic, DiagnosticSink, ErrorList, ObjectRef, ResourceId, Sources,
};
use std::fmt;
use tracing::debug;

pub(crate) struct PassContext<'a> {
    pub sources: &'a Sources,
    pub routes: &'a RouteIndex,
    pub sink: &'a dyn DiagnosticSink,
}

type Pass = fn(&PassContext<'_>, &mut Ir) -> ErrorList;

/// Passes in the order they run.
const PASSES: [(&str, Pass); 8] = [
    ("backend-protocol", backend_protocol::apply),
    ("timeout", timeout::apply),
    ("ssl-redirect", ssl_redirect::apply),
    ("proxy-settings", proxy_settings::apply),
    ("rate-limit", rate_limit::apply),
    ("client-cert-auth", client_cert_auth::apply),
    ("external-auth", external_auth::apply),
    ("app-level", app_level::apply),
];

pub(crate) fn apply_all(ctx: &PassContext<'_>, ir: &mut Ir) -> ErrorList {
    let mut errors = ErrorList::new();
    for (name, pass) in PASSES {
        let errs = pass(ctx, ir);
        debug!(pass = name, errors = errs.len(), "Applied");
        errors.extend(errs);
    }
    errors
}

// === impl PassContext ===

impl PassContext<'_> {
    /// Calls `f` with each route the Ingress contributes to.
    fn with_routes(
        &self,
        ir: &mut Ir,
        ingress: &ResourceId,
        mut f: impl FnMut(&ResourceId, &mut HttpRouteContext),
    ) {
        let routes = self.routes.routes_for(ingress);
        if routes.is_empty() {
            debug!(%ingress, "No routes");
        }
        for id in routes {
            if let Some(route) = ir.http_routes.get_mut(id) {
                f(id, route);
            }
        }
    }

    /// Services the Ingress routes to, limited to those the resolver
    /// recorded. Empty when the Ingress contributes no route.
    fn routed_services(&self, ir: &Ir, ingress: &Ingress) -> Vec<ResourceId> {
        let id = ResourceId::of(ingress);
        if self.routes.routes_for(&id).is_empty() {
            debug!(ingress = %id, "No routes");
            return vec![];
        }
        service_backends(ingress)
            .into_iter()
            .map(|svc| ResourceId::new(id.namespace.clone(), svc))
            .filter(|svc| ir.services.contains_key(svc))
            .collect()
    }

    /// Sets an extension field. When a different value was already written
    /// by another source, the new value wins and an advisory is emitted.
    fn merge<T: PartialEq + fmt::Debug>(
        &self,
        object: ObjectRef,
        field: &str,
        source: &ResourceId,
        slot: &mut Option<T>,
        value: T,
    ) {
        if let Some(prev) = slot.as_ref() {
            if *prev != value {
                self.sink.emit(
                    Diagnostic::advisory(format!(
                        "conflicting {field}: {prev:?} from an earlier Ingress is overridden by {value:?} from Ingress {source}"
                    ))
                    .about(object),
                );
            }
        }
        *slot = Some(value);
    }

    fn info(&self, ingress: &ResourceId, message: impl Into<String>) {
        self.sink
            .emit(Diagnostic::info(message).about(ObjectRef::ingress(ingress.clone())));
    }

    fn advisory(&self, ingress: &ResourceId, message: impl Into<String>) {
        self.sink
            .emit(Diagnostic::advisory(message).about(ObjectRef::ingress(ingress.clone())));
    }

    fn blocking(&self, ingress: &ResourceId, message: impl Into<String>) {
        self.sink
            .emit(Diagnostic::blocking(message).about(ObjectRef::ingress(ingress.clone())));
    }
}

/// Names of the Services an Ingress routes to, including its default
/// backend, in first-seen order and without duplicates.
fn service_backends(ingress: &Ingress) -> Vec<String> {
    let Some(spec) = ingress.spec.as_ref() else {
        return vec![];
    };

    let backends = spec.default_backend.iter().chain(
        spec.rules
            .iter()
            .flatten()
            .flat_map(|r| r.http.iter())
            .flat_map(|h| h.paths.iter())
            .map(|p| &p.backend),
    );

    let mut services = Vec::<String>::new();
    for IngressBackend { service, .. } in backends {
        if let Some(svc) = service.as_ref() {
            if !services.contains(&svc.name) {
                services.push(svc.name.clone());
            }
        }
    }
    services
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;

    #[test]
    fn service_backends_are_distinct() {
        let mut ing = mk_ingress("ns", "web", btreemap_str(&[]));
        add_rule(&mut ing, "a.test", "/", "svc", 80);
        add_rule(&mut ing, "a.test", "/x", "svc", 80);
        add_rule(&mut ing, "b.test", "/", "other", 8080);
        set_default_backend(&mut ing, "svc", 81);
        assert_eq!(service_backends(&ing), vec!["svc".to_string(), "other".to_string()]);
    }
}
