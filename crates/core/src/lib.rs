//! # Plansync Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The hierarchy reconciliation engine (flat rows ↔ ordered tree)
//! - The reconciler (cache diff, remote patch planning)
//! - The provisioning workflow state machine
//! - The polling fallback
//! - Port/adapter interfaces (traits)
//!
//! ## Architecture Principles
//! - Only depends on `plansync-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod hierarchy;
pub mod polling;
pub mod provisioning;
pub mod reconcile;
pub mod sheet;

// Re-export specific items to avoid ambiguity
pub use hierarchy::{build_tree, flatten_tree, Hierarchy, WbsNode};
pub use polling::{PollSummary, PollingService};
pub use provisioning::{ProvisioningStep, ProvisioningWorkflow};
pub use reconcile::ports::{AuditLog, ProjectRepository, WbsRepository};
pub use reconcile::Reconciler;
pub use sheet::ports::SheetService;
pub use sheet::{ColumnMap, RowAccessor};
