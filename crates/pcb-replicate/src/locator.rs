//! Places every board footprint in the schematic sheet hierarchy.

use log::{debug, warn};
use pcb_sch_legacy::SheetTable;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::board::{Board, ItemId};
use crate::error::LocatorError;

/// Root-to-leaf sheet ids.
pub type SheetPath = Vec<String>;

/// A footprint with its position in the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRecord {
    pub reference: String,
    pub footprint: ItemId,
    /// Last path segment; the same for every instance of one symbol.
    pub identity_key: String,
    pub sheet_path: SheetPath,
    pub sheet_names: Vec<String>,
    pub sheet_files: Vec<PathBuf>,
}

impl ComponentRecord {
    /// The component lives at or below `prefix`.
    pub fn on_sheet(&self, prefix: &[String]) -> bool {
        self.sheet_path.starts_with(prefix)
    }

    /// Depth of the first sheet instantiating `file`, if any.
    pub fn level_of(&self, file: &Path) -> Option<usize> {
        self.sheet_files.iter().position(|f| f == file)
    }
}

/// `/id/id/...`, for logs and errors.
pub fn sheet_label(sheet: &[String]) -> String {
    format!("/{}", sheet.join("/"))
}

/// Split a footprint path token into sheet ids and identity key.
///
/// Returns `None` for an empty path (no schematic symbol).
pub fn split_path(path: &str) -> Option<(SheetPath, String)> {
    let trimmed = path.trim().trim_start_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    let mut segments: Vec<String> = trimmed.split('/').map(str::to_string).collect();
    let identity = segments.pop()?;
    Some((segments, identity))
}

/// `reference -> ComponentRecord`, in board order.
#[derive(Debug, Clone, Default)]
pub struct ComponentIndex {
    records: Vec<ComponentRecord>,
    by_reference: HashMap<String, usize>,
}

impl ComponentIndex {
    pub fn build(board: &impl Board, sheets: &SheetTable) -> Result<Self, LocatorError> {
        let mut index = ComponentIndex::default();

        for fp in board.footprints() {
            let Some((sheet_path, identity_key)) = split_path(&fp.path) else {
                debug!("{} has no schematic symbol, not indexed", fp.reference);
                continue;
            };

            let mut sheet_names = Vec::with_capacity(sheet_path.len());
            let mut sheet_files = Vec::with_capacity(sheet_path.len());
            for sheet_id in &sheet_path {
                let record = sheets.get(sheet_id).ok_or_else(|| LocatorError::UnknownSheet {
                    reference: fp.reference.clone(),
                    sheet_id: sheet_id.clone(),
                })?;
                sheet_names.push(record.display_name.clone());
                sheet_files.push(record.file_path.clone());
            }

            if index.by_reference.contains_key(&fp.reference) {
                warn!("Duplicate reference {}, keeping the first", fp.reference);
                continue;
            }

            index
                .by_reference
                .insert(fp.reference.clone(), index.records.len());
            index.records.push(ComponentRecord {
                reference: fp.reference,
                footprint: fp.id,
                identity_key,
                sheet_path,
                sheet_names,
                sheet_files,
            });
        }

        debug!("Indexed {} footprints", index.records.len());
        Ok(index)
    }

    pub fn get(&self, reference: &str) -> Option<&ComponentRecord> {
        self.by_reference.get(reference).map(|&i| &self.records[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn components_on_sheet<'a>(
        &'a self,
        prefix: &'a [String],
    ) -> impl Iterator<Item = &'a ComponentRecord> + 'a {
        self.records.iter().filter(move |r| r.on_sheet(prefix))
    }

    pub fn components_not_on_sheet<'a>(
        &'a self,
        prefix: &'a [String],
    ) -> impl Iterator<Item = &'a ComponentRecord> + 'a {
        self.records.iter().filter(move |r| !r.on_sheet(prefix))
    }

    /// Every instance of the symbol behind `identity_key`.
    pub fn same_identity<'a>(
        &'a self,
        identity_key: &'a str,
    ) -> impl Iterator<Item = &'a ComponentRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| r.identity_key == identity_key)
    }

    /// `(sheet name, sheet file)` from the root down to the sheet holding
    /// `reference`. These are the levels a replication can be run at.
    pub fn levels(&self, reference: &str) -> Option<Vec<(String, PathBuf)>> {
        self.get(reference).map(|r| {
            r.sheet_names
                .iter()
                .cloned()
                .zip(r.sheet_files.iter().cloned())
                .collect()
        })
    }
}
