//! deploy-core — transactional orchestrator that deploys a portable
//! developer-environment [`Context`](deploy_model::context::Context) onto
//! one IDE platform.
//!
//! The crate root wires together every collaborator named in §4:
//! [`lock`] (cross-process mutual exclusion), [`backup`] (backup/rollback),
//! [`conflict`] (conflict detection and resolution), [`audit`] (structured
//! audit/human logging), [`performance`] (timing and memory thresholds),
//! [`recovery`] (post-failure reconciliation), and [`orchestrator`] (the
//! state machine that drives all of the above). [`reporter`] and
//! [`reverse_conversion`] are downstream, read-only consumers of a
//! finished deployment.
//!
//! Nothing here is a binary entry point: resolving a home directory,
//! parsing CLI flags, and fetching a `Context` from disk are left to the
//! caller, matching the scope boundary in §6.

pub mod audit;
pub mod backup;
pub mod clock;
pub mod conflict;
pub mod error;
pub mod lock;
pub mod orchestrator;
pub mod paths;
pub mod performance;
pub mod recovery;
pub mod reporter;
pub mod reverse_conversion;

pub use clock::{Clock, SystemClock};
pub use error::DeploymentError;
pub use orchestrator::{Collaborators, Orchestrator, TransformError, Transformer, ValidationOutcome, Validator};
pub use paths::Paths;

pub use deploy_model::artifact::{ArtifactContent, ArtifactType, TargetArtifact};
pub use deploy_model::context::Context;
pub use deploy_model::ids::{ComponentName, Id, Platform};
pub use deploy_model::options::{ConflictStrategy, DeploymentOptions, MergeStrategy, StreamingOptions};
pub use deploy_model::result::{AuditEntry, ConflictRecord, DeploymentResult, ErrorRecord, Resolution, Summary};
