//! Pairing pivot components with their counterparts in a target sheet.

use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};

use crate::board::{Footprint, Net};
use crate::error::CorrespondenceError;
use crate::locator::ComponentRecord;

/// Ranks candidates that share an identity key with a reference component.
pub trait CandidateScorer {
    fn score(&self, candidate: &ComponentRecord, reference: &ComponentRecord) -> usize;
}

/// Counts the reference's sheet ids that also appear in the candidate's path.
///
/// A sheet reused inside another reused sheet keeps its ids in every
/// instance, so the candidate sharing the most ids is the one in the same
/// relative position.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathOverlapScorer;

impl CandidateScorer for PathOverlapScorer {
    fn score(&self, candidate: &ComponentRecord, reference: &ComponentRecord) -> usize {
        reference
            .sheet_path
            .iter()
            .filter(|id| candidate.sheet_path.contains(id))
            .count()
    }
}

/// Best candidate for `reference` among `candidates`.
///
/// Only candidates with the same identity key qualify. Ties keep the first
/// candidate seen.
pub fn best_match<'a>(
    reference: &ComponentRecord,
    candidates: &'a [ComponentRecord],
    scorer: &dyn CandidateScorer,
) -> Option<&'a ComponentRecord> {
    let mut same = candidates
        .iter()
        .filter(|c| c.identity_key == reference.identity_key);
    let first = same.next()?;

    let mut best = first;
    let mut best_score = None;
    for candidate in same {
        let current = *best_score.get_or_insert_with(|| scorer.score(best, reference));
        let score = scorer.score(candidate, reference);
        if score > current {
            best = candidate;
            best_score = Some(score);
        }
    }
    Some(best)
}

/// Counterpart of the pivot anchor among the target sheet's components.
pub fn anchor_for_sheet<'a>(
    pivot_anchor: &ComponentRecord,
    target: &'a [ComponentRecord],
    scorer: &dyn CandidateScorer,
) -> Result<&'a ComponentRecord, CorrespondenceError> {
    best_match(pivot_anchor, target, scorer).ok_or_else(|| CorrespondenceError::MissingAnchor {
        anchor: pivot_anchor.reference.clone(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentPair {
    pub pivot: ComponentRecord,
    pub target: ComponentRecord,
}

/// Pair every pivot component with exactly one target component.
pub fn match_components(
    pivot: &[ComponentRecord],
    target: &[ComponentRecord],
    scorer: &dyn CandidateScorer,
) -> Result<Vec<ComponentPair>, CorrespondenceError> {
    if pivot.len() != target.len() {
        return Err(CorrespondenceError::ComponentCount {
            pivot: pivot.len(),
            target: target.len(),
        });
    }

    let mut taken: HashMap<&str, &str> = HashMap::new();
    let mut pairs = Vec::with_capacity(pivot.len());

    for p in pivot {
        let t = best_match(p, target, scorer).ok_or_else(|| {
            CorrespondenceError::MissingCounterpart {
                reference: p.reference.clone(),
            }
        })?;
        if let Some(first) = taken.insert(t.reference.as_str(), p.reference.as_str()) {
            return Err(CorrespondenceError::DuplicateMatch {
                first: first.to_string(),
                second: p.reference.clone(),
                target: t.reference.clone(),
            });
        }
        pairs.push(ComponentPair {
            pivot: p.clone(),
            target: t.clone(),
        });
    }

    Ok(pairs)
}

/// Pivot net to target net, valid for one target sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetMap {
    pairs: Vec<(Net, Net)>,
    by_pivot: HashMap<String, Net>,
    by_target: HashMap<String, Net>,
    conflicts: Vec<(Net, Net)>,
}

impl NetMap {
    /// Pair pad nets of every `(pivot, target)` footprint pair by pad name.
    pub fn build<'a>(footprints: impl IntoIterator<Item = (&'a Footprint, &'a Footprint)>) -> Self {
        let mut map = NetMap::default();

        for (pivot, target) in footprints {
            let target_pads: BTreeMap<&str, &Net> = target
                .pads
                .iter()
                .rev()
                .map(|pad| (pad.name.as_str(), &pad.net))
                .collect();

            let mut pivot_pads: Vec<_> = pivot.pads.iter().collect();
            pivot_pads.sort_by(|a, b| a.name.cmp(&b.name));

            for pad in pivot_pads {
                let Some(target_net) = target_pads.get(pad.name.as_str()) else {
                    warn!(
                        "{} pad {} has no counterpart on {}",
                        pivot.reference, pad.name, target.reference
                    );
                    continue;
                };
                if pad.net.is_unconnected() {
                    continue;
                }
                map.insert(&pad.net, target_net);
            }
        }

        debug!(
            "Net map: {} pairs, {} conflicts",
            map.pairs.len(),
            map.conflicts.len()
        );
        map
    }

    fn insert(&mut self, pivot: &Net, target: &Net) {
        match self.by_pivot.get(&pivot.name) {
            Some(existing) if existing.name == target.name => {}
            Some(existing) => {
                warn!(
                    "Net {} maps to both {} and {}, keeping {}",
                    pivot.name, existing.name, target.name, existing.name
                );
                self.conflicts.push((pivot.clone(), target.clone()));
            }
            None => {
                self.by_pivot.insert(pivot.name.clone(), target.clone());
                self.by_target
                    .entry(target.name.clone())
                    .or_insert_with(|| target.clone());
                self.pairs.push((pivot.clone(), target.clone()));
            }
        }
    }

    /// Distinct `(pivot net, target net)` pairs, first pairing per pivot net.
    pub fn pairs(&self) -> &[(Net, Net)] {
        &self.pairs
    }

    pub fn target_net(&self, pivot_net: &Net) -> Option<&Net> {
        self.by_pivot.get(&pivot_net.name)
    }

    /// Host net by target net name.
    pub fn lookup(&self, target_net_name: &str) -> Option<&Net> {
        self.by_target.get(target_net_name)
    }

    /// Pairings dropped because the pivot net was already mapped elsewhere.
    pub fn conflicts(&self) -> &[(Net, Net)] {
        &self.conflicts
    }
}
