use super::PassContext;
use crate::annotations::{self, *};
use ingress_migrate_core::{
    ir::{
        ingress_nginx::{ClientCertAuth, VerifyMode},
        Ir,
    },
    k8s::Ingress,
    ErrorList, ObjectRef, ResourceId,
};

const DEFAULT_VERIFY_DEPTH: u32 = 1;

/// Records client certificate authentication on routes. Malformed optional
/// settings fall back to their defaults.
pub(super) fn apply(ctx: &PassContext<'_>, ir: &mut Ir) -> ErrorList {
    let mut errors = ErrorList::new();

    for ing in &ctx.sources.ingresses {
        let id = ResourceId::of(ing);
        let Some(auth) = client_cert_auth(&id, ing, &mut errors) else {
            continue;
        };

        ctx.with_routes(ir, &id, |route_id, route| {
            ctx.merge(
                ObjectRef::http_route(route_id.clone()),
                "client certificate auth",
                &id,
                &mut route.ingress_nginx_mut().client_cert_auth,
                auth.clone(),
            );
        });
    }

    errors
}

fn client_cert_auth(
    id: &ResourceId,
    ing: &Ingress,
    errors: &mut ErrorList,
) -> Option<ClientCertAuth> {
    let secret = annotations::get_nonempty(ing, AUTH_TLS_SECRET)?;

    let verify_mode = annotations::get(ing, AUTH_TLS_VERIFY_CLIENT)
        .and_then(|v| {
            v.parse::<VerifyMode>()
                .map_err(|e| errors.push(annotations::invalid(id, AUTH_TLS_VERIFY_CLIENT, v, e.to_string())))
                .ok()
        })
        .unwrap_or_default();

    let verify_depth = annotations::get(ing, AUTH_TLS_VERIFY_DEPTH)
        .and_then(|v| {
            v.trim()
                .parse::<u32>()
                .map_err(|_| {
                    errors.push(annotations::invalid(
                        id,
                        AUTH_TLS_VERIFY_DEPTH,
                        v,
                        "expected a non-negative integer",
                    ))
                })
                .ok()
        })
        .unwrap_or(DEFAULT_VERIFY_DEPTH);

    let pass_cert_to_upstream = annotations::get(ing, AUTH_TLS_PASS_CERTIFICATE_TO_UPSTREAM)
        .and_then(|v| {
            annotations::parse_toggle(v)
                .map_err(|e| {
                    errors.push(annotations::invalid(
                        id,
                        AUTH_TLS_PASS_CERTIFICATE_TO_UPSTREAM,
                        v,
                        e,
                    ))
                })
                .ok()
        })
        .unwrap_or(false);

    Some(ClientCertAuth {
        secret: secret.to_string(),
        verify_mode,
        verify_depth,
        error_page: annotations::get_nonempty(ing, AUTH_TLS_ERROR_PAGE).map(str::to_string),
        pass_cert_to_upstream,
    })
}
