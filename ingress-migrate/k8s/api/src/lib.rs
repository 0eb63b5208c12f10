#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod duration;
pub mod envoy_filter;
pub mod gateway;
pub mod labels;

pub use self::{
    duration::K8sDuration,
    envoy_filter::{EnvoyFilter, EnvoyFilterSpec},
};
pub use k8s_openapi::{
    api::{
        self,
        core::v1::{Service, ServicePort, ServiceSpec},
        networking::v1::{
            HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
            IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
        },
    },
    apimachinery::pkg::apis::meta::v1::ObjectMeta,
};
pub use kube::{Resource, ResourceExt};
