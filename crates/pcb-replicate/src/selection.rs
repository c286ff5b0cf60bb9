//! Which sheets get replicated, and which board items belong to a sub-circuit.

use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use crate::board::{Board, BoardText, Drawing, Footprint, ItemRef, Track, Zone};
use crate::error::SelectionError;
use crate::geometry::{Bounded, BoundingBox};
use crate::locator::{ComponentIndex, ComponentRecord, SheetPath};

/// How an item's box must relate to a region to count as inside it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainmentPolicy {
    /// Entirely inside.
    #[default]
    Containing,
    /// Touching at all.
    Intersecting,
}

impl ContainmentPolicy {
    pub fn from_containing(containing: bool) -> Self {
        if containing {
            Self::Containing
        } else {
            Self::Intersecting
        }
    }

    pub fn admits(&self, region: &BoundingBox, item: &BoundingBox) -> bool {
        match self {
            Self::Containing => region.contains(item),
            Self::Intersecting => region.intersects(item),
        }
    }
}

/// Depth in the pivot's sheet chain at which `level_file` is instantiated.
pub fn level_depth(pivot: &ComponentRecord, level_file: &Path) -> Result<usize, SelectionError> {
    pivot
        .level_of(level_file)
        .ok_or_else(|| SelectionError::LevelNotInPath {
            reference: pivot.reference.clone(),
            level: level_file.to_path_buf(),
        })
}

/// Sheet path prefix of the pivot instance at `level_file`.
pub fn pivot_sheet(
    pivot: &ComponentRecord,
    level_file: &Path,
) -> Result<SheetPath, SelectionError> {
    let depth = level_depth(pivot, level_file)?;
    Ok(pivot.sheet_path[..=depth].to_vec())
}

/// Every other instance of the pivot's sheet at `level_file`, in the order
/// the board lists them.
pub fn sheets_to_replicate(
    index: &ComponentIndex,
    pivot_reference: &str,
    level_file: &Path,
) -> Result<Vec<SheetPath>, SelectionError> {
    let pivot = index
        .get(pivot_reference)
        .ok_or_else(|| SelectionError::UnknownReference(pivot_reference.to_string()))?;
    let pivot_prefix = pivot_sheet(pivot, level_file)?;

    let sheets: Vec<SheetPath> = index
        .same_identity(&pivot.identity_key)
        .filter_map(|r| {
            r.level_of(level_file)
                .map(|depth| r.sheet_path[..=depth].to_vec())
        })
        .unique()
        .filter(|prefix| *prefix != pivot_prefix)
        .collect();

    debug!(
        "{} has {} sibling sheets at {}",
        pivot_reference,
        sheets.len(),
        level_file.display()
    );
    Ok(sheets)
}

/// Nets used by pads of `inside` and by no pad of `outside`.
pub fn local_nets(inside: &[Footprint], outside: &[Footprint]) -> BTreeSet<String> {
    let shared: HashSet<&str> = outside
        .iter()
        .flat_map(Footprint::nets)
        .map(|net| net.name.as_str())
        .collect();

    inside
        .iter()
        .flat_map(Footprint::nets)
        .filter(|net| !net.is_unconnected() && !shared.contains(net.name.as_str()))
        .map(|net| net.name.clone())
        .collect()
}

/// Union of the footprints' body boxes.
pub fn footprints_bounding_box(footprints: &[Footprint]) -> BoundingBox {
    footprints
        .iter()
        .fold(BoundingBox::empty(), |bbox, fp| bbox.union(&fp.bounding_box()))
}

/// Tracks, zones, texts and drawings belonging to one sub-circuit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalGeometry {
    pub tracks: Vec<Track>,
    pub zones: Vec<Zone>,
    pub texts: Vec<BoardText>,
    pub drawings: Vec<Drawing>,
}

impl LocalGeometry {
    /// Collect the items of `board` that belong to the region.
    ///
    /// Tracks and zones on a net in `local_nets` are taken wherever they
    /// are; anything else must pass `policy` against `region`. The board
    /// outline is never taken. Items in `exclude` are skipped.
    pub fn capture(
        board: &impl Board,
        region: &BoundingBox,
        local_nets: &BTreeSet<String>,
        policy: ContainmentPolicy,
        exclude: &HashSet<ItemRef>,
    ) -> Self {
        let on_local_net = |name: &str| local_nets.contains(name);
        let inside = |bbox: BoundingBox| policy.admits(region, &bbox);

        let geometry = LocalGeometry {
            tracks: board
                .tracks()
                .into_iter()
                .filter(|t| !exclude.contains(&ItemRef::Track(t.id)))
                .filter(|t| on_local_net(&t.net.name) || inside(t.bounding_box()))
                .collect(),
            zones: board
                .zones()
                .into_iter()
                .filter(|z| !exclude.contains(&ItemRef::Zone(z.id)))
                .filter(|z| on_local_net(&z.net.name) || inside(z.bounding_box()))
                .collect(),
            texts: board
                .texts()
                .into_iter()
                .filter(|t| !exclude.contains(&ItemRef::Text(t.id)))
                .filter(|t| inside(t.bounding_box()))
                .collect(),
            drawings: board
                .drawings()
                .into_iter()
                .filter(|d| !exclude.contains(&ItemRef::Drawing(d.id)))
                .filter(|d| !d.is_board_outline() && inside(d.bounding_box()))
                .collect(),
        };

        debug!(
            "Captured {} tracks, {} zones, {} texts, {} drawings",
            geometry.tracks.len(),
            geometry.zones.len(),
            geometry.texts.len(),
            geometry.drawings.len()
        );
        geometry
    }

    pub fn item_refs(&self) -> impl Iterator<Item = ItemRef> + '_ {
        self.tracks
            .iter()
            .map(|i| ItemRef::Track(i.id))
            .chain(self.zones.iter().map(|i| ItemRef::Zone(i.id)))
            .chain(self.texts.iter().map(|i| ItemRef::Text(i.id)))
            .chain(self.drawings.iter().map(|i| ItemRef::Drawing(i.id)))
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
            && self.zones.is_empty()
            && self.texts.is_empty()
            && self.drawings.is_empty()
    }
}
