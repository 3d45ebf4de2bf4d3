//! Versioned schema migrations
//!
//! ```text
//! migration/
//! ├── loader        # ScriptLoader: script text per source version
//! ├── classifier    # StatementClassifier: split + tag statements
//! ├── executor      # MigrationExecutor: atomic batch, then independent drops
//! ├── orchestrator  # Migrator: the run state machine
//! └── error         # MigrationError
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use waybill::database::SqliteFile;
//! use waybill::migration::{EmbeddedScriptLoader, Migrator};
//!
//! let provider = SqliteFile::new("/path/to/data.db");
//! let report = Migrator::new(&provider, EmbeddedScriptLoader::bundled()).run();
//! if !report.succeeded() {
//!     eprintln!("schema left at v{:?}", report.from_version);
//! }
//! ```

mod classifier;
mod error;
mod executor;
mod loader;
mod orchestrator;

pub use classifier::{
    classify, MigrationBatch, NaiveSplitter, QuoteAwareSplitter, Statement, StatementClassifier,
    StatementKind, StatementSplitter,
};
pub use error::MigrationError;
pub use executor::{DropOutcome, MigrationExecutor};
pub use loader::{gather_scripts, DirScriptLoader, EmbeddedScriptLoader, ScriptLoader};
pub use orchestrator::{
    MigrationPlan, MigrationReport, MigrationState, Migrator, VersionPolicy,
};
