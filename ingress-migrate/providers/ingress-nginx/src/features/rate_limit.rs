use super::PassContext;
use crate::annotations::{self, *};
use ingress_migrate_core::{ir::Ir, k8s::Ingress, ErrorList, FieldError, ObjectRef, ResourceId};
use once_cell::sync::Lazy;
use regex::Regex;

/// Matches the rate of an nginx `limit_req_zone` descriptor, e.g.
/// `zone=api:10m rate=10r/s`.
static ZONE_RATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"rate=(\d+)r/([sm])").expect("should compile"));

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct RateLimit {
    rps: u32,
    burst: Option<u32>,
}

/// Records request rate limits on routes.
pub(super) fn apply(ctx: &PassContext<'_>, ir: &mut Ir) -> ErrorList {
    let mut errors = ErrorList::new();

    for ing in &ctx.sources.ingresses {
        let id = ResourceId::of(ing);

        if let Some(conns) = annotations::get_nonempty(ing, LIMIT_CONNECTIONS) {
            ctx.advisory(
                &id,
                format!("{LIMIT_CONNECTIONS} {conns} has no Gateway API or Envoy route-level equivalent"),
            );
        }

        let limit = match RateLimit::from_ingress(&id, ing) {
            Ok(Some(limit)) => limit,
            Ok(None) => continue,
            Err(e) => {
                errors.push(e);
                continue;
            }
        };

        ctx.with_routes(ir, &id, |route_id, route| {
            let ext = route.ingress_nginx_mut();
            let obj = || ObjectRef::http_route(route_id.clone());
            ctx.merge(obj(), "rate limit", &id, &mut ext.rate_limit_rps, limit.rps);
            if let Some(burst) = limit.burst {
                ctx.merge(obj(), "rate limit burst", &id, &mut ext.rate_limit_burst, burst);
            }
        });
    }

    errors
}

/// Converts requests per minute to requests per second. Any non-zero rate
/// allows at least one request per second.
pub(crate) fn rpm_to_rps(rpm: u32) -> u32 {
    match rpm / 60 {
        0 if rpm > 0 => 1,
        rps => rps,
    }
}

// === impl RateLimit ===

impl RateLimit {
    fn from_ingress(
        id: &ResourceId,
        ing: &Ingress,
    ) -> Result<Option<Self>, FieldError> {
        let number = |key: &str, value: &str| {
            value.trim().parse::<u32>().map_err(|_| {
                annotations::invalid(id, key, value, "expected a non-negative integer")
            })
        };

        let rps = match (
            annotations::get(ing, LIMIT_RPS),
            annotations::get(ing, LIMIT_RPM),
            annotations::get(ing, LIMIT_REQ_ZONE),
        ) {
            (Some(rps), _, _) => number(LIMIT_RPS, rps)?,
            (None, Some(rpm), _) => rpm_to_rps(number(LIMIT_RPM, rpm)?),
            (None, None, Some(zone)) => zone_rps(zone).ok_or_else(|| {
                annotations::invalid(
                    id,
                    LIMIT_REQ_ZONE,
                    &annotations::truncate(zone),
                    "expected a rate of the form rate=<n>r/s or rate=<n>r/m",
                )
            })?,
            (None, None, None) => return Ok(None),
        };

        let burst = annotations::get(ing, LIMIT_BURST_MULTIPLIER)
            .map(|m| number(LIMIT_BURST_MULTIPLIER, m).map(|m| m.saturating_mul(rps)))
            .transpose()?;

        Ok(Some(Self { rps, burst }))
    }
}

fn zone_rps(zone: &str) -> Option<u32> {
    let caps = ZONE_RATE.captures(zone)?;
    let rate = caps[1].parse::<u32>().ok()?;
    match &caps[2] {
        "m" => Some(rpm_to_rps(rate)),
        _ => Some(rate),
    }
}
