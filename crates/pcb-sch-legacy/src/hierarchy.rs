use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::document::{sheet_blocks, SheetBlock};
use crate::paths::{normalize_path, resolve_sheet_path};
use crate::HierarchyError;

/// One sheet instantiation site.
///
/// `sheet_id` is unique per `$Sheet` block in its parent document. A document
/// instantiated several times contributes the same child ids every time, so
/// an id always resolves to the same child document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetRecord {
    pub sheet_id: String,
    pub display_name: String,
    pub file_path: PathBuf,
}

/// Flat `sheet_id -> SheetRecord` table of a whole hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SheetTable {
    sheets: BTreeMap<String, SheetRecord>,
}

impl SheetTable {
    pub fn get(&self, sheet_id: &str) -> Option<&SheetRecord> {
        self.sheets.get(sheet_id)
    }

    pub fn contains(&self, sheet_id: &str) -> bool {
        self.sheets.contains_key(sheet_id)
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SheetRecord> {
        self.sheets.values()
    }

    pub fn insert(&mut self, record: SheetRecord) {
        self.sheets.insert(record.sheet_id.clone(), record);
    }

    /// Keep only the given sheet ids.
    pub fn subset<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> SheetTable {
        let mut out = SheetTable::default();
        for id in ids {
            if let Some(record) = self.sheets.get(id) {
                out.insert(record.clone());
            }
        }
        out
    }
}

impl FromIterator<SheetRecord> for SheetTable {
    fn from_iter<T: IntoIterator<Item = SheetRecord>>(iter: T) -> Self {
        let mut table = SheetTable::default();
        for record in iter {
            table.insert(record);
        }
        table
    }
}

type EnvLookup<'e> = Box<dyn Fn(&str) -> Option<String> + 'e>;

/// Recursive reader for a legacy sheet hierarchy.
///
/// Each document is read once; its sheet blocks are cached by resolved path
/// so heavily reused sheets do not cost repeated reads.
pub struct HierarchyParser<'e> {
    env: EnvLookup<'e>,
    cache: HashMap<PathBuf, Vec<SheetBlock>>,
}

impl Default for HierarchyParser<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl HierarchyParser<'static> {
    /// Parser resolving `${VAR}` through the process environment.
    pub fn new() -> Self {
        Self::with_env(|name| std::env::var(name).ok())
    }
}

impl<'e> HierarchyParser<'e> {
    /// Parser resolving `${VAR}` through `lookup`.
    pub fn with_env(lookup: impl Fn(&str) -> Option<String> + 'e) -> Self {
        Self {
            env: Box::new(lookup),
            cache: HashMap::new(),
        }
    }

    /// Walk the hierarchy below `root` and return every sheet instantiation.
    pub fn parse(&mut self, root: &Path) -> Result<SheetTable, HierarchyError> {
        let root = if root.is_absolute() {
            normalize_path(root)
        } else {
            let cwd = std::env::current_dir().map_err(|source| HierarchyError::Read {
                path: root.to_path_buf(),
                source,
            })?;
            normalize_path(&cwd.join(root))
        };

        let mut table = SheetTable::default();
        let mut stack = Vec::new();
        self.visit(&root, &mut stack, &mut table)?;

        info!(
            "Parsed {} sheet instantiations below {}",
            table.len(),
            root.display()
        );
        Ok(table)
    }

    fn visit(
        &mut self,
        document: &Path,
        stack: &mut Vec<PathBuf>,
        table: &mut SheetTable,
    ) -> Result<(), HierarchyError> {
        if stack.iter().any(|p| p == document) {
            let mut chain = stack.clone();
            chain.push(document.to_path_buf());
            return Err(HierarchyError::Cycle { chain });
        }

        let blocks = self.blocks(document)?;
        stack.push(document.to_path_buf());

        for block in blocks {
            let file_path = resolve_sheet_path(&block.file, document, self.env.as_ref())?;
            debug!(
                "{}:{}: sheet {} \"{}\" -> {}",
                document.display(),
                block.line,
                block.sheet_id,
                block.name,
                file_path.display()
            );
            table.insert(SheetRecord {
                sheet_id: block.sheet_id,
                display_name: block.name,
                file_path: file_path.clone(),
            });
            self.visit(&file_path, stack, table)?;
        }

        stack.pop();
        Ok(())
    }

    fn blocks(&mut self, document: &Path) -> Result<Vec<SheetBlock>, HierarchyError> {
        if let Some(blocks) = self.cache.get(document) {
            return Ok(blocks.clone());
        }

        let content = fs::read_to_string(document).map_err(|source| HierarchyError::Read {
            path: document.to_path_buf(),
            source,
        })?;
        let blocks = sheet_blocks(&content, document)?;
        self.cache.insert(document.to_path_buf(), blocks.clone());
        Ok(blocks)
    }
}

/// Parse the hierarchy below `root`, resolving `${VAR}` from the environment.
pub fn parse_hierarchy(root: &Path) -> Result<SheetTable, HierarchyError> {
    HierarchyParser::new().parse(root)
}
