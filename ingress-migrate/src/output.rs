//! Renders converted resources as Kubernetes manifests.

use crate::core::GatewayResources;
use anyhow::{bail, Result};
use serde::Serialize;
use std::str::FromStr;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One YAML document per resource.
    #[default]
    Yaml,
    /// A single `v1/List`.
    Json,
}

// === impl OutputFormat ===

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "yaml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            s => bail!("invalid output format {s:?}: expected yaml or json"),
        }
    }
}

/// Renders resources grouped by kind, Gateways first so that routes can be
/// applied after the listeners they attach to.
pub fn render(resources: &GatewayResources, format: OutputFormat) -> Result<String> {
    let objects = objects(resources)?;
    match format {
        OutputFormat::Yaml => {
            let mut out = String::new();
            for obj in &objects {
                out.push_str("---\n");
                out.push_str(&serde_yaml::to_string(obj)?);
            }
            Ok(out)
        }
        OutputFormat::Json => {
            let list = serde_json::json!({
                "apiVersion": "v1",
                "kind": "List",
                "items": objects,
            });
            let mut out = serde_json::to_string_pretty(&list)?;
            out.push('\n');
            Ok(out)
        }
    }
}

fn objects(resources: &GatewayResources) -> Result<Vec<serde_json::Value>> {
    fn push<T: Serialize>(
        out: &mut Vec<serde_json::Value>,
        objs: impl IntoIterator<Item = T>,
    ) -> Result<()> {
        for obj in objs {
            out.push(serde_json::to_value(obj)?);
        }
        Ok(())
    }

    let GatewayResources {
        gateways,
        http_routes,
        backend_tls_policies,
        reference_grants,
        gateway_extensions,
    } = resources;

    let mut out = Vec::new();
    push(&mut out, gateways.values())?;
    push(&mut out, http_routes.values())?;
    push(&mut out, backend_tls_policies.values())?;
    push(&mut out, reference_grants.values())?;
    push(&mut out, gateway_extensions.values())?;
    Ok(out)
}
