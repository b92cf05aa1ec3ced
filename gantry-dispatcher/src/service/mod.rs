//! Service layer
//!
//! Services contain the dispatcher's business logic: deciding which labels
//! a job needs, remembering which jobs were dispatched, rendering boot
//! scripts, and provisioning and reclaiming droplets. They reach the
//! providers only through the repository traits.

mod boot_script;
mod pickup_tracker;
mod provisioning;
mod reclaimer;
mod tag_resolver;

pub use boot_script::BootScript;
pub use pickup_tracker::PickupTracker;
pub use provisioning::{MatchedJob, ProvisioningWorker, WorkerOutcome, instance_name};
pub use reclaimer::Reclaimer;
pub use tag_resolver::{RunScope, TagResolver, WorkflowTagResolver};
