//! Sheet hierarchy extraction for legacy (KiCad 4/5) `.sch` documents.
//!
//! A legacy schematic describes its child sheets with `$Sheet` / `$EndSheet`
//! blocks. Each block names the instantiation with a `U <id>` line, the
//! display name with `F0 "<name>"` and the child document with `F1 "<path>"`.
//! The same document can be instantiated many times; every instantiation gets
//! its own id in the parent document.
//!
//! * [`document`] tokenizes a document into typed [`document::Record`]s and
//!   extracts its sheet blocks.
//! * [`hierarchy`] walks the documents from the root and builds the flat
//!   [`SheetTable`] (`sheet_id -> SheetRecord`).
//! * [`schema_hash`] computes the reference-independent content hash used to
//!   gate restoring a saved layout.

pub mod document;
pub mod hierarchy;
pub mod schema_hash;

mod error;
mod paths;

pub use error::HierarchyError;
pub use hierarchy::{parse_hierarchy, HierarchyParser, SheetRecord, SheetTable};
pub use paths::normalize_path;
pub use schema_hash::{schema_hash, strip_volatile_lines};
