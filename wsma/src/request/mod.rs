//! Request side of the protocol: correlators and SOAP templates.

pub mod bootstrap;
mod correlator;
pub mod template;

pub use correlator::Correlator;
pub use template::{
    ActionOnFail, CONFIG_NAMESPACE, EXEC_NAMESPACE, RequestTemplate, build_config,
    build_config_persist, build_exec,
};
