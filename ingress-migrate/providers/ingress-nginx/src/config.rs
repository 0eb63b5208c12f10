use ingress_migrate_core::{ProviderConf, ResourceId};
use std::{fmt, str::FromStr};

pub const GATEWAY_MODE_FLAG: &str = "gateway-mode";
pub const GATEWAY_NAMESPACE_FLAG: &str = "gateway-namespace";
pub const GATEWAY_NAME_FLAG: &str = "gateway-name";
pub const GATEWAY_CLASS_FLAG: &str = "gateway-class";

pub const DEFAULT_GATEWAY_NAMESPACE: &str = "istio-system";
pub const DEFAULT_GATEWAY_NAME: &str = "platform-gateway";
pub const DEFAULT_GATEWAY_CLASS: &str = "istio";

/// Where generated routes attach.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum GatewayMode {
    /// All routes attach to one pre-provisioned, shared Gateway.
    #[default]
    Centralized,

    /// Each namespace gets its own Gateway, co-located with its routes.
    PerNamespace,
}

/// How generated routes are attached to Gateways.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayConfig {
    pub mode: GatewayMode,
    /// The shared Gateway's namespace. Only used in centralized mode.
    pub namespace: String,
    /// The shared Gateway's name. Only used in centralized mode.
    pub name: String,
    /// The class of synthesized per-namespace Gateways.
    pub gateway_class: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {GATEWAY_MODE_FLAG} {0:?}: expected centralized or per-namespace")]
    InvalidMode(String),
}

// === impl GatewayMode ===

impl FromStr for GatewayMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "centralized" => Ok(Self::Centralized),
            "per-namespace" => Ok(Self::PerNamespace),
            s => Err(ConfigError::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for GatewayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Centralized => "centralized".fmt(f),
            Self::PerNamespace => "per-namespace".fmt(f),
        }
    }
}

// === impl GatewayConfig ===

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            mode: GatewayMode::default(),
            namespace: DEFAULT_GATEWAY_NAMESPACE.to_string(),
            name: DEFAULT_GATEWAY_NAME.to_string(),
            gateway_class: DEFAULT_GATEWAY_CLASS.to_string(),
        }
    }
}

impl GatewayConfig {
    /// Reads the provider's flags. Unset or empty flags keep their defaults.
    pub fn from_conf(conf: &ProviderConf) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(mode) = conf.flag(crate::NAME, GATEWAY_MODE_FLAG) {
            config.mode = mode.parse()?;
        }
        if let Some(ns) = conf.flag(crate::NAME, GATEWAY_NAMESPACE_FLAG) {
            config.namespace = ns.to_string();
        }
        if let Some(name) = conf.flag(crate::NAME, GATEWAY_NAME_FLAG) {
            config.name = name.to_string();
        }
        if let Some(class) = conf.flag(crate::NAME, GATEWAY_CLASS_FLAG) {
            config.gateway_class = class.to_string();
        }
        Ok(config)
    }

    #[inline]
    pub fn is_centralized(&self) -> bool {
        self.mode == GatewayMode::Centralized
    }

    /// The Gateway that routes in `route_namespace` attach to.
    pub fn gateway_ref(&self, route_namespace: &str) -> ResourceId {
        match self.mode {
            GatewayMode::Centralized => ResourceId::new(self.namespace.clone(), self.name.clone()),
            GatewayMode::PerNamespace => {
                ResourceId::new(route_namespace, format!("{route_namespace}-gateway"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::btreemap;

    fn conf(flags: &[(&str, &str)]) -> ProviderConf {
        ProviderConf {
            ingress_class: "nginx".to_string(),
            provider_flags: btreemap! {
                crate::NAME.to_string() => flags
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            },
        }
    }

    #[test]
    fn defaults_to_centralized() {
        let config = GatewayConfig::from_conf(&ProviderConf::default()).unwrap();
        assert_eq!(config, GatewayConfig::default());
        assert!(config.is_centralized());
        assert_eq!(
            config.gateway_ref("team-a"),
            ResourceId::new("istio-system", "platform-gateway")
        );
    }

    #[test]
    fn per_namespace_gateways_are_co_located() {
        let config = GatewayConfig::from_conf(&conf(&[(GATEWAY_MODE_FLAG, "per-namespace")])).unwrap();
        assert_eq!(
            config.gateway_ref("team-a"),
            ResourceId::new("team-a", "team-a-gateway")
        );
    }

    #[test]
    fn reads_gateway_flags() {
        let config = GatewayConfig::from_conf(&conf(&[
            (GATEWAY_NAMESPACE_FLAG, "edge"),
            (GATEWAY_NAME_FLAG, "shared"),
            (GATEWAY_CLASS_FLAG, ""),
        ]))
        .unwrap();
        assert_eq!(config.gateway_ref("x"), ResourceId::new("edge", "shared"));
        assert_eq!(config.gateway_class, DEFAULT_GATEWAY_CLASS);
    }

    #[test]
    fn rejects_unknown_modes() {
        let err = GatewayConfig::from_conf(&conf(&[(GATEWAY_MODE_FLAG, "per-tenant")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidMode("per-tenant".to_string()));
    }
}
