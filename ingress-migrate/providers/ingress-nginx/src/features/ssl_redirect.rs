use super::PassContext;
use crate::annotations::{self, *};
use ingress_migrate_core::{ir::Ir, ErrorList, ObjectRef, ResourceId};

/// Flags routes whose plain-HTTP traffic must be redirected to HTTPS. The
/// redirect routes themselves are built when the IR is materialized.
pub(super) fn apply(ctx: &PassContext<'_>, ir: &mut Ir) -> ErrorList {
    let mut errors = ErrorList::new();

    for ing in &ctx.sources.ingresses {
        let id = ResourceId::of(ing);

        let mut enabled = None::<bool>;
        for key in [SSL_REDIRECT, FORCE_SSL_REDIRECT] {
            let Some(value) = annotations::get(ing, key) else {
                continue;
            };
            match value.trim() {
                "true" => enabled = Some(true),
                "false" => {
                    enabled.get_or_insert(false);
                }
                _ => errors.push(annotations::invalid(&id, key, value, "expected true or false")),
            }
        }
        let Some(enabled) = enabled else {
            continue;
        };

        ctx.with_routes(ir, &id, |route_id, route| {
            ctx.merge(
                ObjectRef::http_route(route_id.clone()),
                "ssl-redirect",
                &id,
                &mut route.ingress_nginx_mut().ssl_redirect,
                enabled,
            );
        });
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;
    use rstest::rstest;

    #[rstest]
    #[case(&[(SSL_REDIRECT, "true")], Some(true))]
    #[case(&[(FORCE_SSL_REDIRECT, "true")], Some(true))]
    #[case(&[(SSL_REDIRECT, "false"), (FORCE_SSL_REDIRECT, "true")], Some(true))]
    #[case(&[(SSL_REDIRECT, "false")], Some(false))]
    #[case(&[], None)]
    fn either_annotation_enables_redirect(
        #[case] annotations: &[(&str, &str)],
        #[case] expected: Option<bool>,
    ) {
        let mut ing = mk_ingress("ns", "web", btreemap_str(annotations));
        add_rule(&mut ing, "a.test", "/", "svc", 80);
        let run = Run::passes(vec![ing]);
        let route = &run.ir.http_routes[&ResourceId::new("ns", "web-a-test")];
        assert_eq!(route.ingress_nginx().and_then(|ext| ext.ssl_redirect), expected);
    }

    #[test]
    fn malformed_value_is_an_error() {
        let mut ing = mk_ingress("ns", "web", btreemap_str(&[(FORCE_SSL_REDIRECT, "yes")]));
        add_rule(&mut ing, "a.test", "/", "svc", 80);
        let run = Run::passes(vec![ing]);
        assert_eq!(run.errors.len(), 1);
        let route = &run.ir.http_routes[&ResourceId::new("ns", "web-a-test")];
        assert_eq!(route.ingress_nginx(), None);
    }
}
