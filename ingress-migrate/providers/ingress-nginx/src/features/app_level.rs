//! Detects annotations that change application behavior in ways no Gateway
//! API structure can express.

use super::PassContext;
use crate::annotations::{self, *};
use ingress_migrate_core::{ir::Ir, ErrorList, ResourceId};

/// Annotations that inject raw nginx configuration.
const SNIPPETS: [&str; 4] = [
    SERVER_SNIPPET,
    CONFIGURATION_SNIPPET,
    AUTH_SNIPPET,
    STREAM_SNIPPET,
];

pub(super) fn apply(ctx: &PassContext<'_>, _ir: &mut Ir) -> ErrorList {
    for ing in &ctx.sources.ingresses {
        let id = ResourceId::of(ing);

        for key in SNIPPETS {
            if let Some(snippet) = annotations::get(ing, key) {
                ctx.blocking(
                    &id,
                    format!(
                        "{key} injects nginx configuration that must be migrated by hand: {}",
                        annotations::truncate(snippet)
                    ),
                );
            }
        }

        if let Some(value) = annotations::get(ing, USE_REGEX) {
            if value.trim() != "false" {
                ctx.blocking(
                    &id,
                    format!("{USE_REGEX} enables regular expression paths; Gateway API path matches are prefix or exact"),
                );
            }
        }

        if let Some(target) = annotations::get(ing, REWRITE_TARGET) {
            if target.contains('$') {
                ctx.blocking(
                    &id,
                    format!(
                        "{REWRITE_TARGET} {} uses capture group references, which URLRewrite filters cannot express",
                        annotations::truncate(target)
                    ),
                );
            } else {
                ctx.advisory(
                    &id,
                    format!(
                        "{REWRITE_TARGET} {} is not translated; add a URLRewrite filter to the route",
                        annotations::truncate(target)
                    ),
                );
            }
        }

        if annotations::get_nonempty(ing, AUTH_URL).is_some() {
            ctx.info(
                &id,
                "external auth is translated to an ext_authz EnvoyFilter; verify the auth service is reachable from the gateway",
            );
        }
        if annotations::get_nonempty(ing, AUTH_TLS_SECRET).is_some() {
            ctx.info(
                &id,
                "client certificate auth must be configured on the Gateway's HTTPS listener; the CA secret is not copied",
            );
        }
    }

    ErrorList::new()
}
