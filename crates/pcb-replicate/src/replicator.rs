//! Copies a pivot sub-circuit's layout onto its sibling sheets.
//!
//! Each target sheet goes through the same ordered steps: plan, clear, place
//! footprints, clear again, tracks, zones, text, drawings. Planning touches
//! nothing, so a sheet whose components do not line up is left as it was.
//! Sheets already applied stay applied when a later one fails; the
//! [`ReplicationLog`] records every change for callers that want to undo.

use log::{debug, info, warn};
use pcb_sch_legacy::parse_hierarchy;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::Debug;
use std::path::Path;

use crate::board::{
    Board, BoardError, BoardText, Drawing, Footprint, ItemId, ItemRef, Net, Track, Zone,
};
use crate::correspondence::{
    anchor_for_sheet, match_components, CandidateScorer, NetMap, PathOverlapScorer,
};
use crate::error::{CorrespondenceError, ReplicateError, SelectionError};
use crate::locator::{sheet_label, ComponentIndex, ComponentRecord, SheetPath};
use crate::options::ReplicateOptions;
use crate::progress::{Monotonic, ProgressReporter};
use crate::selection::{
    footprints_bounding_box, local_nets, pivot_sheet, sheets_to_replicate, ContainmentPolicy,
    LocalGeometry,
};
use crate::transform::{AnchorTransform, Transformable};

/// Changes made to one target sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SheetLog {
    pub sheet: String,
    pub added: Vec<ItemRef>,
    pub removed: Vec<ItemRef>,
    pub moved: Vec<ItemRef>,
    pub flipped: Vec<ItemRef>,
    /// References of locked footprints left in place.
    pub skipped_locked: Vec<String>,
    /// Tracks and zones whose net has no counterpart in the sheet.
    pub skipped_nets: usize,
    pub text_mismatches: Vec<String>,
}

/// Everything a replication run changed, in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplicationLog {
    pub sheets: Vec<SheetLog>,
    pub duplicates_removed: Vec<ItemRef>,
}

impl ReplicationLog {
    pub fn added(&self) -> impl Iterator<Item = ItemRef> + '_ {
        self.sheets.iter().flat_map(|s| s.added.iter().copied())
    }
}

/// The sub-circuit being copied, snapshotted before anything moves.
#[derive(Debug, Clone)]
pub(crate) struct PivotSource {
    pub anchor: ComponentRecord,
    pub anchor_footprint: Footprint,
    pub sheet: SheetPath,
    pub components: Vec<ComponentRecord>,
    pub footprints: HashMap<ItemId, Footprint>,
    pub local_nets: BTreeSet<String>,
    pub geometry: LocalGeometry,
    /// Items on the mutated board that clearing must never touch.
    pub protected: HashSet<ItemRef>,
}

impl PivotSource {
    pub fn capture(
        board: &impl Board,
        index: &ComponentIndex,
        anchor_reference: &str,
        level_file: &Path,
        policy: ContainmentPolicy,
    ) -> Result<Self, ReplicateError> {
        let anchor = index
            .get(anchor_reference)
            .ok_or_else(|| SelectionError::UnknownReference(anchor_reference.to_string()))?
            .clone();
        let sheet = pivot_sheet(&anchor, level_file)?;
        let components: Vec<ComponentRecord> = index.components_on_sheet(&sheet).cloned().collect();

        let mut footprints = HashMap::new();
        for c in &components {
            footprints.insert(c.footprint, fetch_footprint(board, c.footprint)?);
        }
        let anchor_footprint = fetch_footprint(board, anchor.footprint)?;

        let inside: Vec<Footprint> = footprints.values().cloned().collect();
        let outside: Vec<Footprint> = board
            .footprints()
            .into_iter()
            .filter(|fp| !footprints.contains_key(&fp.id))
            .collect();
        let nets = local_nets(&inside, &outside);
        let region = footprints_bounding_box(&inside);
        let geometry = LocalGeometry::capture(board, &region, &nets, policy, &HashSet::new());
        let protected = geometry.item_refs().collect();

        info!(
            "Pivot {} at {}: {} footprints, {} local nets",
            anchor.reference,
            sheet_label(&sheet),
            components.len(),
            nets.len()
        );

        Ok(Self {
            anchor,
            anchor_footprint,
            sheet,
            components,
            footprints,
            local_nets: nets,
            geometry,
            protected,
        })
    }

    fn footprint(&self, id: ItemId) -> Result<&Footprint, BoardError> {
        self.footprints
            .get(&id)
            .ok_or(BoardError::UnknownItem(ItemRef::Footprint(id)))
    }
}

/// Everything needed to apply one target sheet, computed up front.
struct SheetPlan {
    label: String,
    pairs: Vec<(Footprint, Footprint)>,
    target_anchor: ItemId,
    transform: AnchorTransform,
    nets: NetMap,
}

fn fetch_footprint(board: &impl Board, id: ItemId) -> Result<Footprint, BoardError> {
    board
        .footprint(id)
        .ok_or(BoardError::UnknownItem(ItemRef::Footprint(id)))
}

pub struct Replicator<'b, B: Board> {
    board: &'b mut B,
    index: ComponentIndex,
    scorer: Box<dyn CandidateScorer>,
    log: ReplicationLog,
}

impl<'b, B: Board> Replicator<'b, B> {
    pub fn new(board: &'b mut B, index: ComponentIndex) -> Self {
        Self {
            board,
            index,
            scorer: Box::new(PathOverlapScorer),
            log: ReplicationLog::default(),
        }
    }

    /// Parse the schematic below `root_sheet` and index `board` against it.
    pub fn from_root_sheet(board: &'b mut B, root_sheet: &Path) -> Result<Self, ReplicateError> {
        let sheets = parse_hierarchy(root_sheet)?;
        let index = ComponentIndex::build(&*board, &sheets)?;
        Ok(Self::new(board, index))
    }

    pub fn with_scorer(mut self, scorer: impl CandidateScorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    pub fn index(&self) -> &ComponentIndex {
        &self.index
    }

    pub fn board(&self) -> &B {
        &*self.board
    }

    /// Changes made so far, including those of a run that failed.
    pub fn log(&self) -> &ReplicationLog {
        &self.log
    }

    /// Replicate onto every sibling sheet of the pivot at `level_file`.
    pub fn replicate(
        &mut self,
        pivot_reference: &str,
        level_file: &Path,
        options: &ReplicateOptions,
        progress: impl ProgressReporter,
    ) -> Result<ReplicationLog, ReplicateError> {
        let sheets = sheets_to_replicate(&self.index, pivot_reference, level_file)?;
        self.replicate_to(pivot_reference, level_file, &sheets, options, progress)
    }

    /// Replicate onto an explicit list of sheets.
    pub fn replicate_to(
        &mut self,
        pivot_reference: &str,
        level_file: &Path,
        sheets: &[SheetPath],
        options: &ReplicateOptions,
        progress: impl ProgressReporter,
    ) -> Result<ReplicationLog, ReplicateError> {
        let pivot = PivotSource::capture(
            &*self.board,
            &self.index,
            pivot_reference,
            level_file,
            options.policy(),
        )?;
        self.run(&pivot, sheets, options, progress)
    }

    pub(crate) fn run(
        &mut self,
        pivot: &PivotSource,
        sheets: &[SheetPath],
        options: &ReplicateOptions,
        mut progress: impl ProgressReporter,
    ) -> Result<ReplicationLog, ReplicateError> {
        let mut progress = Monotonic::new(&mut progress);
        let mut added: HashSet<ItemRef> = HashSet::new();
        debug!(
            "Replicating {} onto {} sheets",
            sheet_label(&pivot.sheet),
            sheets.len()
        );

        for (n, sheet) in sheets.iter().enumerate() {
            let plan = self.plan(pivot, sheet)?;
            let mut log = SheetLog {
                sheet: plan.label.clone(),
                ..SheetLog::default()
            };
            let mut text_error = None;

            let steps = 7;
            let step = |progress: &mut Monotonic<'_>, i: usize, what: &str| {
                progress.step(n, sheets.len(), i, steps, &format!("{}: {what}", plan.label));
            };

            step(&mut progress, 0, "clearing");
            if options.remove_existing {
                self.clear(pivot, &plan, options, &added, &mut log);
            }

            step(&mut progress, 1, "placing footprints");
            self.place(&plan, options, &mut log, &mut text_error)?;

            step(&mut progress, 2, "clearing");
            if options.remove_existing {
                self.clear(pivot, &plan, options, &added, &mut log);
            }

            step(&mut progress, 3, "tracks");
            if options.tracks {
                self.copy_tracks(pivot, &plan, &mut log);
            }

            step(&mut progress, 4, "zones");
            if options.zones {
                self.copy_zones(pivot, &plan, &mut log);
            }

            step(&mut progress, 5, "text");
            if options.text {
                for text in &pivot.geometry.texts {
                    let mut text = text.clone();
                    plan.transform.apply(&mut text);
                    log.added.push(ItemRef::Text(self.board.add_text(text)));
                }
            }

            step(&mut progress, 6, "drawings");
            if options.drawings {
                for drawing in &pivot.geometry.drawings {
                    let mut drawing = drawing.clone();
                    plan.transform.apply(&mut drawing);
                    log.added.push(ItemRef::Drawing(self.board.add_drawing(drawing)));
                }
            }

            info!(
                "{}: added {}, removed {}, moved {}, skipped {} on unmapped nets",
                plan.label,
                log.added.len(),
                log.removed.len(),
                log.moved.len(),
                log.skipped_nets
            );
            added.extend(log.added.iter().copied());
            self.log.sheets.push(log);

            if let Some(source) = text_error {
                return Err(ReplicateError::Sheet {
                    sheet: plan.label,
                    source,
                });
            }
        }

        if options.remove_duplicates {
            self.remove_duplicates();
        }

        progress.report(1.0, Some("done"));
        Ok(self.log.clone())
    }

    fn plan(&self, pivot: &PivotSource, sheet: &[String]) -> Result<SheetPlan, ReplicateError> {
        let label = sheet_label(sheet);
        let in_sheet = |source| ReplicateError::Sheet {
            sheet: label.clone(),
            source,
        };

        let target: Vec<ComponentRecord> = self.index.components_on_sheet(sheet).cloned().collect();
        let matched = match_components(&pivot.components, &target, self.scorer.as_ref())
            .map_err(in_sheet)?;
        let target_anchor = anchor_for_sheet(&pivot.anchor, &target, self.scorer.as_ref())
            .map_err(in_sheet)?;

        let mut pairs = Vec::with_capacity(matched.len());
        for pair in &matched {
            pairs.push((
                pivot.footprint(pair.pivot.footprint)?.clone(),
                fetch_footprint(&*self.board, pair.target.footprint)?,
            ));
        }
        let anchor_footprint = fetch_footprint(&*self.board, target_anchor.footprint)?;

        debug!(
            "{}: anchor {} -> {}, {} pairs",
            label,
            pivot.anchor.reference,
            target_anchor.reference,
            pairs.len()
        );

        Ok(SheetPlan {
            nets: NetMap::build(pairs.iter().map(|(p, t)| (p, t))),
            transform: AnchorTransform::new(&pivot.anchor_footprint, &anchor_footprint),
            target_anchor: anchor_footprint.id,
            pairs,
            label,
        })
    }

    /// Remove the target sheet's own tracks, zones, text and drawings.
    fn clear(
        &mut self,
        pivot: &PivotSource,
        plan: &SheetPlan,
        options: &ReplicateOptions,
        added: &HashSet<ItemRef>,
        log: &mut SheetLog,
    ) {
        let ids: HashSet<ItemId> = plan.pairs.iter().map(|(_, t)| t.id).collect();
        let (inside, outside): (Vec<Footprint>, Vec<Footprint>) = self
            .board
            .footprints()
            .into_iter()
            .partition(|fp| ids.contains(&fp.id));
        let region = footprints_bounding_box(&inside);
        let nets = local_nets(&inside, &outside);

        let mut exclude = pivot.protected.clone();
        exclude.extend(added.iter().copied());
        exclude.extend(log.added.iter().copied());

        let found =
            LocalGeometry::capture(&*self.board, &region, &nets, options.policy(), &exclude);
        let doomed = found.item_refs().filter(|item| match item {
            ItemRef::Track(_) => options.tracks,
            ItemRef::Zone(_) => options.zones,
            ItemRef::Text(_) => options.text,
            ItemRef::Drawing(_) => options.drawings,
            ItemRef::Footprint(_) => false,
        });

        for item in doomed.collect::<Vec<_>>() {
            if self.board.remove(item) {
                log.removed.push(item);
            }
        }
    }

    fn place(
        &mut self,
        plan: &SheetPlan,
        options: &ReplicateOptions,
        log: &mut SheetLog,
        text_error: &mut Option<CorrespondenceError>,
    ) -> Result<(), ReplicateError> {
        let transform = &plan.transform;

        for (source, target) in &plan.pairs {
            if target.locked && !options.locked_footprints {
                debug!("{}: {} is locked, left in place", plan.label, target.reference);
                log.skipped_locked.push(target.reference.clone());
                continue;
            }

            let item = ItemRef::Footprint(target.id);
            let needs_flip = transform.needs_flip(source.flipped, target.flipped);

            // Pose and texts are set on the pivot footprint's side; any side
            // change is applied last, by the host's own flip.
            if target.flipped != source.flipped {
                self.board.flip_footprint(target.id)?;
            }

            if target.id != plan.target_anchor {
                let position = transform.apply_point(source.position);
                let orientation = transform.apply_angle(source.orientation);
                self.board.set_footprint_position(target.id, position)?;
                self.board.set_footprint_orientation(target.id, orientation)?;
                log.moved.push(item);
            }

            self.board.set_footprint_margins(target.id, source.margins)?;

            if source.texts.len() != target.texts.len() {
                warn!(
                    "{}: {} has {} text items but {} has {}, texts not copied",
                    plan.label,
                    source.reference,
                    source.texts.len(),
                    target.reference,
                    target.texts.len()
                );
                log.text_mismatches.push(target.reference.clone());
                text_error.get_or_insert(CorrespondenceError::TextItemCount {
                    pivot: source.reference.clone(),
                    target: target.reference.clone(),
                    pivot_count: source.texts.len(),
                    target_count: target.texts.len(),
                });
            } else {
                let placed = self
                    .board
                    .footprint(target.id)
                    .ok_or(BoardError::UnknownItem(item))?;
                let turn = placed.orientation - source.orientation;
                for (i, (text, own)) in source.texts.iter().zip(&target.texts).enumerate() {
                    let mut text = text.clone();
                    text.translate(placed.position - source.position);
                    text.rotate(placed.position, turn);
                    text.text = own.text.clone();
                    self.board.set_footprint_text(target.id, i, text)?;
                }
            }

            let final_flipped = target.flipped != needs_flip;
            if final_flipped != source.flipped {
                self.board.flip_footprint(target.id)?;
            }
            if needs_flip {
                log.flipped.push(item);
            }
        }

        Ok(())
    }

    fn copy_tracks(&mut self, pivot: &PivotSource, plan: &SheetPlan, log: &mut SheetLog) {
        for track in &pivot.geometry.tracks {
            let Some(net) = plan.nets.target_net(&track.net) else {
                debug!(
                    "{}: no counterpart for net {}, track skipped",
                    plan.label, track.net.name
                );
                log.skipped_nets += 1;
                continue;
            };
            let mut track = track.clone();
            plan.transform.apply(&mut track);
            track.net = net.clone();
            log.added.push(ItemRef::Track(self.board.add_track(track)));
        }
    }

    fn copy_zones(&mut self, pivot: &PivotSource, plan: &SheetPlan, log: &mut SheetLog) {
        for zone in &pivot.geometry.zones {
            let net = if zone.keepout || !zone.is_on_copper_layer() {
                Net::unconnected()
            } else if let Some(net) = plan.nets.target_net(&zone.net) {
                net.clone()
            } else {
                debug!(
                    "{}: no counterpart for net {}, zone skipped",
                    plan.label, zone.net.name
                );
                log.skipped_nets += 1;
                continue;
            };
            let mut zone = zone.clone();
            plan.transform.apply(&mut zone);
            zone.net = net;
            log.added.push(ItemRef::Zone(self.board.add_zone(zone)));
        }
    }

    /// Remove items identical to an earlier one apart from their id.
    fn remove_duplicates(&mut self) {
        let mut doomed = Vec::new();
        doomed.extend(duplicates(self.board.tracks(), |t| t.id, ItemRef::Track, |t| Track {
            id: ItemId(0),
            ..t
        }));
        doomed.extend(duplicates(self.board.zones(), |z| z.id, ItemRef::Zone, |z| Zone {
            id: ItemId(0),
            ..z
        }));
        doomed.extend(duplicates(self.board.texts(), |t| t.id, ItemRef::Text, |t| BoardText {
            id: ItemId(0),
            ..t
        }));
        doomed.extend(duplicates(
            self.board.drawings(),
            |d| d.id,
            ItemRef::Drawing,
            |d| Drawing {
                id: ItemId(0),
                ..d
            },
        ));

        for item in doomed {
            if self.board.remove(item) {
                self.log.duplicates_removed.push(item);
            }
        }
        info!("Removed {} duplicates", self.log.duplicates_removed.len());
    }
}

/// Every item equal to one with a lower id.
///
/// Items are compared through their `Debug` text with the id blanked out by
/// `anonymous`, since several of them carry float angles.
fn duplicates<T: Debug>(
    mut items: Vec<T>,
    id: impl Fn(&T) -> ItemId,
    item_ref: impl Fn(ItemId) -> ItemRef,
    anonymous: impl Fn(T) -> T,
) -> Vec<ItemRef> {
    items.sort_by_key(|item| id(item));
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter_map(|item| {
            let own = id(&item);
            let key = format!("{:?}", anonymous(item));
            (!seen.insert(key)).then(|| item_ref(own))
        })
        .collect()
}
