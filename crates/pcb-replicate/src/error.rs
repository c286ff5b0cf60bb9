use pcb_sch_legacy::HierarchyError;
use std::path::PathBuf;
use thiserror::Error;

use crate::board::BoardError;

/// Board footprints could not be placed in the sheet hierarchy.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocatorError {
    #[error(
        "Footprint {reference} references sheet {sheet_id} which is not in the schematic \
         (was the schematic saved and the board updated from it?)"
    )]
    UnknownSheet { reference: String, sheet_id: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("No footprint with reference {0} is part of the hierarchy")]
    UnknownReference(String),

    #[error("{reference} is not placed below sheet file {}", level.display())]
    LevelNotInPath { reference: String, level: PathBuf },
}

/// Pivot and target sheet do not line up. Fatal for one target sheet.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CorrespondenceError {
    #[error("No footprint corresponds to anchor {anchor}")]
    MissingAnchor { anchor: String },

    #[error("Pivot has {pivot} footprints but the target has {target}")]
    ComponentCount { pivot: usize, target: usize },

    #[error("No counterpart for {reference}")]
    MissingCounterpart { reference: String },

    #[error("{first} and {second} both match {target}")]
    DuplicateMatch {
        first: String,
        second: String,
        target: String,
    },

    #[error("{pivot} has {pivot_count} text items but {target} has {target_count}")]
    TextItemCount {
        pivot: String,
        target: String,
        pivot_count: usize,
        target_count: usize,
    },
}

/// The saved layout was captured from a different schematic.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaMismatchError {
    #[error("Schematic hash {actual} does not match saved hash {expected}")]
    Hash { expected: String, actual: String },

    #[error("Saved layout has {saved} footprints but the destination has {found}")]
    ComponentCount { saved: usize, found: usize },
}

#[derive(Debug, Error)]
pub enum ReplicateError {
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    #[error(transparent)]
    Locator(#[from] LocatorError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("Sheet {sheet}: {source}")]
    Sheet {
        sheet: String,
        #[source]
        source: CorrespondenceError,
    },

    #[error(transparent)]
    Schema(#[from] SchemaMismatchError),

    #[error(transparent)]
    Board(#[from] BoardError),
}
