use super::PassContext;
use crate::annotations::{self, *};
use http::{Method, Uri};
use ingress_migrate_core::{
    ir::{ingress_nginx::ExternalAuth, Ir},
    k8s::Ingress,
    ErrorList, ObjectRef, ResourceId,
};

const METHODS: [Method; 9] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::CONNECT,
    Method::OPTIONS,
    Method::TRACE,
    Method::PATCH,
];

/// Records external authentication on routes.
pub(super) fn apply(ctx: &PassContext<'_>, ir: &mut Ir) -> ErrorList {
    let mut errors = ErrorList::new();

    for ing in &ctx.sources.ingresses {
        let id = ResourceId::of(ing);
        let Some(auth) = external_auth(&id, ing, &mut errors) else {
            continue;
        };

        ctx.with_routes(ir, &id, |route_id, route| {
            ctx.merge(
                ObjectRef::http_route(route_id.clone()),
                "external auth",
                &id,
                &mut route.ingress_nginx_mut().external_auth,
                auth.clone(),
            );
        });

        if auth.cache_key.is_some() || auth.cache_duration.is_some() {
            ctx.advisory(
                &id,
                format!("{AUTH_CACHE_KEY} and {AUTH_CACHE_DURATION} are not supported by Envoy's ext_authz filter"),
            );
        }
        if auth.signin_url.is_some() {
            ctx.advisory(
                &id,
                format!("{AUTH_SIGNIN} is not translated; unauthenticated clients receive the auth service's response"),
            );
        }
    }

    errors
}

fn external_auth(id: &ResourceId, ing: &Ingress, errors: &mut ErrorList) -> Option<ExternalAuth> {
    let url = annotations::get_nonempty(ing, AUTH_URL)?;
    if let Err(detail) = validate_url(url) {
        errors.push(annotations::invalid(id, AUTH_URL, url, detail));
        return None;
    }

    let method = match annotations::get_nonempty(ing, AUTH_METHOD) {
        None => Method::GET,
        Some(value) => match value.to_ascii_uppercase().parse::<Method>() {
            Ok(m) if METHODS.contains(&m) => m,
            _ => {
                errors.push(annotations::invalid(
                    id,
                    AUTH_METHOD,
                    value,
                    "expected a standard HTTP method",
                ));
                Method::GET
            }
        },
    };

    let response_headers = annotations::get(ing, AUTH_RESPONSE_HEADERS)
        .map(|headers| {
            headers
                .split(',')
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let opt = |key: &str| annotations::get_nonempty(ing, key).map(str::to_string);
    Some(ExternalAuth {
        url: url.to_string(),
        method: method.to_string(),
        signin_url: opt(AUTH_SIGNIN),
        response_headers,
        request_redirect: opt(AUTH_REQUEST_REDIRECT),
        cache_key: opt(AUTH_CACHE_KEY),
        cache_duration: opt(AUTH_CACHE_DURATION),
    })
}

/// Auth services must be addressed by an absolute http or https URL.
fn validate_url(url: &str) -> Result<(), &'static str> {
    let uri = url.parse::<Uri>().map_err(|_| "expected a valid URL")?;
    match uri.scheme_str() {
        Some("http" | "https") => {}
        _ => return Err("expected an http or https URL"),
    }
    if uri.authority().is_none() {
        return Err("expected a URL with a host");
    }
    Ok(())
}
