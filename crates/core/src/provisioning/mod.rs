//! Workspace provisioning

mod workflow;

pub use workflow::{ProvisioningStep, ProvisioningWorkflow};
