//! Saving a sub-circuit's layout to a file and restoring it elsewhere.
//!
//! A saved layout carries a hash of the schematic pages it was captured from.
//! Restoring refuses to run unless the destination's pages hash the same and
//! hold the same number of footprints.

use anyhow::{bail, Context, Result as AnyhowResult};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use log::{debug, info};
use pcb_sch_legacy::{schema_hash, SheetTable};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::board::{Board, BoardError, ItemRef};
use crate::error::{ReplicateError, SchemaMismatchError, SelectionError};
use crate::locator::{ComponentIndex, ComponentRecord, SheetPath};
use crate::memory::MemoryBoard;
use crate::options::ReplicateOptions;
use crate::progress::ProgressReporter;
use crate::replicator::{PivotSource, ReplicationLog, Replicator};
use crate::selection::{level_depth, ContainmentPolicy, LocalGeometry};

pub const FORMAT_VERSION: u32 = 1;

/// On-disk form of a captured layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedLayout {
    pub version: u32,
    /// The pivot footprints and their local geometry, nothing else.
    pub board: MemoryBoard,
    /// Every sheet the saved footprints sit on.
    pub sheets: SheetTable,
    pub local_nets: BTreeSet<String>,
    /// Depth of the saved sheet in the anchor's sheet chain.
    pub level: usize,
    /// File names of the anchor's sheets from the saved level down.
    pub sheet_files: Vec<String>,
    pub anchor_reference: String,
    pub anchor_identity: String,
    pub component_count: usize,
    pub schema_hash: String,
}

impl SavedLayout {
    pub fn write_to(&self, path: &Path) -> AnyhowResult<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize layout")?;
        AtomicFile::new(path, OverwriteBehavior::AllowOverwrite)
            .write(|f| {
                f.write_all(json.as_bytes())?;
                f.flush()
            })
            .map_err(|err| anyhow::anyhow!("Failed to write {}: {err}", path.display()))?;
        info!("Saved layout of {} to {}", self.anchor_reference, path.display());
        Ok(())
    }

    pub fn read_from(path: &Path) -> AnyhowResult<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let saved: SavedLayout = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse saved layout {}", path.display()))?;
        if saved.version != FORMAT_VERSION {
            bail!(
                "{} has format version {}, expected {}",
                path.display(),
                saved.version,
                FORMAT_VERSION
            );
        }
        Ok(saved)
    }
}

/// Distinct files of every sheet at or below `level` holding `components`.
fn files_below<'a>(
    components: impl IntoIterator<Item = &'a ComponentRecord>,
    level: usize,
) -> BTreeSet<PathBuf> {
    components
        .into_iter()
        .flat_map(|c| c.sheet_files.iter().skip(level).cloned())
        .collect()
}

pub struct LayoutSaver<'a, B: Board> {
    board: &'a B,
    index: &'a ComponentIndex,
}

/// A pivot copied out of its board, not yet hashed.
#[derive(Debug, Clone)]
pub struct CapturedLayout {
    pub board: MemoryBoard,
    pub anchor: ComponentRecord,
    pub components: Vec<ComponentRecord>,
    pub local_nets: BTreeSet<String>,
    pub level: usize,
}

impl<'a, B: Board> LayoutSaver<'a, B> {
    pub fn new(board: &'a B, index: &'a ComponentIndex) -> Self {
        Self { board, index }
    }

    /// Copy the sub-circuit around `anchor_reference` at `level_file`.
    pub fn capture(
        &self,
        anchor_reference: &str,
        level_file: &Path,
        policy: ContainmentPolicy,
    ) -> Result<CapturedLayout, ReplicateError> {
        let pivot = PivotSource::capture(
            self.board,
            self.index,
            anchor_reference,
            level_file,
            policy,
        )?;
        let level = level_depth(&pivot.anchor, level_file)?;

        let keep: Vec<ItemRef> = pivot
            .footprints
            .keys()
            .map(|&id| ItemRef::Footprint(id))
            .chain(pivot.geometry.item_refs())
            .collect();
        let mut board = MemoryBoard::from_board(self.board);
        board.retain(&keep);

        debug!("Captured {} items around {}", keep.len(), anchor_reference);
        Ok(CapturedLayout {
            board,
            anchor: pivot.anchor,
            components: pivot.components,
            local_nets: pivot.local_nets,
            level,
        })
    }
}

impl CapturedLayout {
    /// Hash the schematic pages involved and build the saved document.
    pub fn serialize(&self, sheets: &SheetTable) -> Result<SavedLayout, ReplicateError> {
        let hash = schema_hash(files_below(&self.components, self.level))?;
        let ids: BTreeSet<&str> = self
            .components
            .iter()
            .flat_map(|c| c.sheet_path.iter().map(String::as_str))
            .collect();

        Ok(SavedLayout {
            version: FORMAT_VERSION,
            board: self.board.clone(),
            sheets: sheets.subset(ids),
            local_nets: self.local_nets.clone(),
            level: self.level,
            sheet_files: self.anchor.sheet_files[self.level..]
                .iter()
                .map(|f| {
                    f.file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default()
                })
                .collect(),
            anchor_reference: self.anchor.reference.clone(),
            anchor_identity: self.anchor.identity_key.clone(),
            component_count: self.components.len(),
            schema_hash: hash,
        })
    }
}

/// Restores a [`SavedLayout`] onto one sheet of a board.
///
/// The checks must pass in order: [`check_hash`](Self::check_hash), then
/// [`HashChecked::check_count`], then [`CountChecked::replicate`].
pub struct LayoutRestorer<'b, B: Board> {
    board: &'b mut B,
    index: ComponentIndex,
    saved: SavedLayout,
}

pub struct HashChecked<'b, B: Board> {
    inner: LayoutRestorer<'b, B>,
    sheet: SheetPath,
}

pub struct CountChecked<'b, B: Board> {
    inner: LayoutRestorer<'b, B>,
    sheet: SheetPath,
}

impl<'b, B: Board> LayoutRestorer<'b, B> {
    pub fn new(board: &'b mut B, index: ComponentIndex, saved: SavedLayout) -> Self {
        Self {
            board,
            index,
            saved,
        }
    }

    /// Compare the destination sheet's schematic against the saved hash.
    pub fn check_hash(
        self,
        anchor_reference: &str,
        level_file: &Path,
    ) -> Result<HashChecked<'b, B>, ReplicateError> {
        let anchor = self
            .index
            .get(anchor_reference)
            .ok_or_else(|| SelectionError::UnknownReference(anchor_reference.to_string()))?;
        let level = level_depth(anchor, level_file)?;
        let sheet = anchor.sheet_path[..=level].to_vec();

        let actual = schema_hash(files_below(self.index.components_on_sheet(&sheet), level))?;
        if actual != self.saved.schema_hash {
            return Err(SchemaMismatchError::Hash {
                expected: self.saved.schema_hash.clone(),
                actual,
            }
            .into());
        }

        Ok(HashChecked { inner: self, sheet })
    }
}

impl<'b, B: Board> HashChecked<'b, B> {
    pub fn check_count(self) -> Result<CountChecked<'b, B>, ReplicateError> {
        let found = self.inner.index.components_on_sheet(&self.sheet).count();
        let saved = self.inner.saved.component_count;
        if found != saved {
            return Err(SchemaMismatchError::ComponentCount { saved, found }.into());
        }
        Ok(CountChecked {
            inner: self.inner,
            sheet: self.sheet,
        })
    }
}

impl<'b, B: Board> CountChecked<'b, B> {
    /// Replicate the saved layout onto the checked sheet.
    pub fn replicate(
        self,
        options: &ReplicateOptions,
        progress: impl ProgressReporter,
    ) -> Result<ReplicationLog, ReplicateError> {
        let LayoutRestorer {
            board,
            index,
            saved,
        } = self.inner;

        let pivot = saved_pivot(&saved)?;
        Replicator::new(board, index).run(&pivot, &[self.sheet], options, progress)
    }
}

/// The saved board as a pivot: every item on it belongs to the sub-circuit.
fn saved_pivot(saved: &SavedLayout) -> Result<PivotSource, ReplicateError> {
    let index = ComponentIndex::build(&saved.board, &saved.sheets)?;
    let anchor = index
        .get(&saved.anchor_reference)
        .ok_or_else(|| SelectionError::UnknownReference(saved.anchor_reference.clone()))?
        .clone();
    let sheet: SheetPath = anchor
        .sheet_path
        .get(..=saved.level)
        .ok_or_else(|| SelectionError::LevelNotInPath {
            reference: anchor.reference.clone(),
            level: saved.sheet_files.first().map(PathBuf::from).unwrap_or_default(),
        })?
        .to_vec();

    let components: Vec<ComponentRecord> = index.components_on_sheet(&sheet).cloned().collect();
    let footprints = saved
        .board
        .footprints()
        .into_iter()
        .map(|fp| (fp.id, fp))
        .collect::<HashMap<_, _>>();
    let anchor_footprint = footprints
        .get(&anchor.footprint)
        .cloned()
        .ok_or(BoardError::UnknownItem(ItemRef::Footprint(anchor.footprint)))?;

    Ok(PivotSource {
        anchor,
        anchor_footprint,
        sheet,
        components,
        footprints,
        local_nets: saved.local_nets.clone(),
        geometry: LocalGeometry {
            tracks: saved.board.tracks(),
            zones: saved.board.zones(),
            texts: saved.board.texts(),
            drawings: saved.board.drawings(),
        },
        protected: HashSet::new(),
    })
}

/// Run every restore check, then replicate.
pub fn restore_layout<B: Board>(
    board: &mut B,
    index: ComponentIndex,
    saved: SavedLayout,
    anchor_reference: &str,
    level_file: &Path,
    options: &ReplicateOptions,
    progress: impl ProgressReporter,
) -> Result<ReplicationLog, ReplicateError> {
    LayoutRestorer::new(board, index, saved)
        .check_hash(anchor_reference, level_file)?
        .check_count()?
        .replicate(options, progress)
}
