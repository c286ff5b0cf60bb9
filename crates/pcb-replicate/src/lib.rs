//! Hierarchical layout replication.
//!
//! A schematic sheet instantiated several times yields several identical
//! sub-circuits on the board. Given one laid-out instance (the pivot) and an
//! anchor footprint in it, this crate finds the sibling instances, pairs up
//! their footprints and nets, and copies placement, tracks, zones, text and
//! drawings onto each of them. A pivot can also be saved to a file and
//! restored onto a matching sub-circuit of another board.
//!
//! The board itself is reached only through the [`Board`] trait.

pub mod board;
pub mod correspondence;
pub mod geometry;
pub mod locator;
pub mod memory;
pub mod options;
pub mod progress;
pub mod replicator;
pub mod save_restore;
pub mod selection;
pub mod transform;

mod error;

pub use board::{Board, BoardError, ItemId, ItemRef};
pub use error::{
    CorrespondenceError, LocatorError, ReplicateError, SchemaMismatchError, SelectionError,
};
pub use locator::{ComponentIndex, ComponentRecord, SheetPath};
pub use memory::MemoryBoard;
pub use options::ReplicateOptions;
pub use progress::{NoProgress, ProgressReporter};
pub use replicator::{ReplicationLog, Replicator, SheetLog};
pub use save_restore::{restore_layout, LayoutRestorer, LayoutSaver, SavedLayout};
pub use selection::{sheets_to_replicate, ContainmentPolicy};
