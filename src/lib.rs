//! # sidewalk-crossings — split sidewalks at roadway crossings
//!
//! Given one sidewalk way in an OpenStreetMap-style editing graph, find where
//! it meets vehicle roads, cut it at the kerbs around each intersection and
//! tag the pieces `footway=sidewalk` or `footway=crossing`.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `GraphBackend` is the contract between splitter and host editor
//! 2. **Clean DTOs**: `Node`, `Way`, `TagChanges` cross all boundaries
//! 3. **Planning reads, commands write**: kerb detection and tag derivation never mutate
//! 4. **All or nothing**: every edit runs inside a `Transaction` that undoes itself on failure
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sidewalk_crossings::{Editor, PrimitiveId, WayId};
//!
//! # fn example() -> sidewalk_crossings::Result<()> {
//! let editor = Editor::open_memory();
//! // ... load nodes and ways into editor.backend() ...
//! let selection = [PrimitiveId::Way(WayId(1))];
//! if editor.is_enabled(&selection) {
//!     let made = editor.make_crossings(&selection)?;
//!     for segment in &made.plan.segments {
//!         println!("{} -> {:?}", segment.way, segment.kind);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod storage;
pub mod command;
pub mod tx;
pub mod crossing;
pub mod config;
pub mod util;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Node, NodeId, Way, WayId, PrimitiveId,
    TagMap, TagChanges,
};

// ============================================================================
// Re-exports: Storage
// ============================================================================

pub use storage::{GraphBackend, MemoryBackend, GraphSnapshot, ParentWays};

// ============================================================================
// Re-exports: Commands and transactions
// ============================================================================

pub use command::{Command, ChangeTags, SplitWay};
pub use tx::{Transaction, TxId, TxState, CommittedChange};

// ============================================================================
// Re-exports: Crossing splitter
// ============================================================================

pub use crossing::{
    MadeCrossings, SplitPlan, KerbPlan, SegmentKind, SegmentTagChange, NodeTagChange,
    ROADWAYS,
};
pub use config::CrossingConfig;

// ============================================================================
// Top-level Editor handle
// ============================================================================

/// The primary entry point. An `Editor` wraps a graph backend and offers
/// the crossing-splitting action on it.
pub struct Editor<B: GraphBackend> {
    backend: B,
    config: CrossingConfig,
}

impl<B: GraphBackend> Editor<B> {
    /// Create an Editor over the given backend with the default config.
    pub fn with_backend(backend: B) -> Self {
        Self { backend, config: CrossingConfig::default() }
    }

    pub fn with_config(mut self, config: CrossingConfig) -> Self {
        self.config = config;
        self
    }

    /// Whether the action is available for this selection.
    pub fn is_enabled(&self, selection: &[PrimitiveId]) -> bool {
        crossing::is_enabled(&self.backend, selection)
    }

    /// Kerbs and intersections of a way, without changing anything.
    pub fn plan_kerbs(&self, way: WayId) -> Result<KerbPlan> {
        let way = self.backend.way(way)?;
        crossing::find_kerbs_around_intersections(&self.backend, &way)
    }

    /// Split the selected sidewalk into sidewalk and crossing ways.
    pub fn make_crossings(&self, selection: &[PrimitiveId]) -> Result<MadeCrossings> {
        crossing::make_crossings(&self.backend, selection, &self.config)
    }

    pub fn config(&self) -> &CrossingConfig {
        &self.config
    }

    /// Access the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

/// In-memory graph for testing and embedding.
impl Editor<MemoryBackend> {
    pub fn open_memory() -> Self {
        Self::with_backend(MemoryBackend::new())
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cannot split way {way}: {reason}")]
    SplitFailed { way: WayId, reason: String },

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Transaction error: {0}")]
    TxError(String),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
