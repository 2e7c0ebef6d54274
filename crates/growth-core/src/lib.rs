// crates/growth-core/src/lib.rs
// ============================================================================
// Crate: growth-core
// Description: The data model shared across the growth SDK's core:
// identifiers, events, identity, campaigns, workflow nodes, and journeys.
// ============================================================================

//! Owns the types every other core crate reads and writes, but no I/O and
//! no scheduling: persistence lives in `growth-store`, network transport in
//! `growth-providers`/`growth-queue`, and execution in `growth-journey`.

pub mod campaign;
pub mod error;
pub mod events;
pub mod identifiers;
pub mod identity;
pub mod node;
pub mod journey;
pub mod time;
pub mod value;

pub use campaign::Campaign;
pub use campaign::ConversionAnchor;
pub use campaign::ExitPolicy;
pub use campaign::Goal;
pub use campaign::ReentryPolicy;
pub use campaign::ReentryWindowUnit;
pub use campaign::Trigger;
pub use campaign::Workflow;
pub use error::CoreError;
pub use events::Event;
pub use events::PropertyBag;
pub use events::ANON_DISTINCT_ID_PROPERTY;
pub use events::IDENTIFY_EVENT_NAME;
pub use identifiers::CampaignId;
pub use identifiers::DistinctId;
pub use identifiers::EventId;
pub use identifiers::ExperimentId;
pub use identifiers::FeatureId;
pub use identifiers::FlowId;
pub use identifiers::JourneyId;
pub use identifiers::NodeId;
pub use identifiers::SegmentId;
pub use identifiers::VersionId;
pub use identity::EventLinkingPolicy;
pub use identity::Identity;
pub use journey::Journey;
pub use journey::JourneyStatus;
pub use journey::WaitState;
pub use node::ExitReason;
pub use node::ExperimentVariant;
pub use node::RandomBranchArm;
pub use node::ShowFlowExperiment;
pub use node::WaitPath;
pub use node::WorkflowNode;
pub use time::Clock;
pub use time::FixedClock;
pub use time::SystemClock;
pub use value::DynValue;
