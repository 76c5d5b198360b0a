//! Skillshelf skills registry
//!
//! Discovers skill directories across layered roots, keeps a name-indexed
//! snapshot of their metadata and serves four queries against it: list,
//! search, info and load.
//!
//! ## Progressive disclosure
//!
//! Phase 1 (Discovery): only the SKILL.md header of each skill is read.
//! Phase 2 (Activation): `load` re-reads the body from disk on demand.
//! Phase 3 (Execution): companion files are listed, never read, so the agent
//! can fetch them itself when needed.
//!
//! ## Precedence
//!
//! Roots are resolved most specific first (explicit override, settings
//! layers, workspace, user, environment). When two roots define the same
//! name, the earlier root wins and the loser is recorded as shadowed.

#![deny(unsafe_code, dead_code, unused_imports, unused_variables, missing_docs)]

pub mod error;
pub mod fs;
pub mod indexer;
pub mod loader;
pub mod query;
pub mod registry;
pub mod resolver;
pub mod service;
pub mod skill;

pub use error::{DocumentError, Result, SkillError};
pub use fs::{MemoryFs, OsFs, SkillFs};
pub use indexer::SkillIndexer;
pub use loader::{ContentLoader, SkillContent};
pub use query::{
    LoadedSkill, QueryEngine, SkillRequest, SkillResponse, SkillSelectors, SkillSummary,
};
pub use registry::{IndexDiagnostic, SkillRegistry};
pub use resolver::{resolve_roots, DefaultLocations, RootOrigin, SkillRoot, SkillSources};
pub use service::{event_channel, EventSender, SkillsService};
pub use skill::{SkillDocument, SkillHeader, SkillMetadata};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        SkillError, SkillMetadata, SkillRegistry, SkillRequest, SkillResponse, SkillSources,
        SkillsService,
    };
}
