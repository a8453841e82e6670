//! Three-way merge of one named property map.
//!
//! Only addresses that Latest or Mine changed relative to Original are
//! examined. Result starts as Latest's map, so everything else is already
//! in place.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;
use verso_diff::PropertyMapDiff;
use verso_store::{PropertyMap, Snapshot};
use verso_types::{Address, PropertyValue, ValueKind};

use crate::error::MergeResult;
use crate::notice::{AnomalyKind, NoticeSubject};
use crate::resolver::{CandidateState, Conflict, ConflictKind, StickyChoice, UnitId};
use crate::session::Session;
use crate::three_way::{classify, pick, Classification};
use crate::transaction::MergeContext;

/// Outcome of merging one property map.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MapMergeReport {
    pub name: String,
    /// Kind of the merged map; `None` if the map was dropped.
    pub kind: Option<ValueKind>,
    /// Addresses changed on one side only and taken from that side.
    pub auto_applied: usize,
    /// Addresses changed identically on both sides.
    pub convergent: usize,
    /// Divergent addresses answered by the resolver or an apply-to-all.
    pub conflicts_resolved: usize,
    /// Values discarded because their kind lost a type conflict.
    pub dropped: usize,
    /// The map is absent from Result.
    pub removed_map: bool,
}

pub(crate) fn merge_property_map(
    name: &str,
    ctx: &MergeContext<'_>,
    latest_diff: Option<&PropertyMapDiff>,
    mine_diff: Option<&PropertyMapDiff>,
    result: &mut Snapshot,
    session: &mut Session<'_>,
) -> MergeResult<MapMergeReport> {
    session.checkpoint()?;
    let original = ctx.original.properties.get_map(name);
    let latest = ctx.latest.properties.get_map(name);
    let mine = ctx.mine.properties.get_map(name);

    let mut report = MapMergeReport {
        name: name.to_string(),
        ..Default::default()
    };

    let kept = kept_kind(name, original, latest, mine, session);

    let addresses: BTreeSet<Address> = latest_diff
        .into_iter()
        .chain(mine_diff)
        .flat_map(PropertyMapDiff::addresses)
        .collect();

    // Decide every address before touching Result.
    let mut sticky = StickyChoice::new();
    let mut writes: Vec<(Address, Option<PropertyValue>)> = Vec::new();
    for address in addresses {
        session.checkpoint()?;
        let o = original.and_then(|m| m.get(address));
        let l = latest.and_then(|m| m.get(address));
        let m = mine.and_then(|m| m.get(address));

        let choice = match classify(o, l, m) {
            Classification::Unchanged => continue,
            Classification::Convergent => {
                report.convergent += 1;
                continue;
            }
            Classification::OneSided(side) => {
                report.auto_applied += 1;
                debug!(map = name, %address, %side, "one-sided change applied");
                side
            }
            Classification::Divergent => {
                let conflict = Conflict {
                    kind: ConflictKind::Value,
                    unit: UnitId::address(name, address),
                    original: CandidateState::Value(o),
                    latest: CandidateState::Value(l),
                    mine: CandidateState::Value(m),
                };
                report.conflicts_resolved += 1;
                session.decide(&conflict, &mut sticky)?
            }
        };
        writes.push((address, pick(choice, o, l, m).cloned()));
    }

    let mut entries: BTreeMap<Address, PropertyValue> = latest
        .map(|m| m.iter().map(|(a, v)| (a, v.clone())).collect())
        .unwrap_or_default();
    for (address, value) in writes {
        match value {
            Some(v) => entries.insert(address, v),
            None => entries.remove(&address),
        };
    }

    if let Some(kind) = kept {
        let mut dropped = Vec::new();
        entries.retain(|address, value| {
            let keep = value.kind() == kind;
            if !keep {
                dropped.push((*address, value.clone()));
            }
            keep
        });
        for (address, value) in dropped {
            report.dropped += 1;
            session.notify(
                NoticeSubject::Map(name.to_string()),
                AnomalyKind::DroppedValue,
                format!(
                    "dropped {} value {value} at {address} from '{name}': the merged map holds {kind} values",
                    value.kind()
                ),
            );
        }
    }

    let removed_by_latest = original.is_some() && latest.is_none();
    let removed_by_mine = original.is_some() && mine.is_none();
    let drop_map = match kept {
        None => true,
        Some(_) if !entries.is_empty() => false,
        Some(_) if latest.is_none() && mine.is_none() => true,
        Some(_) => session.config.drop_empty_removed_maps && (removed_by_latest || removed_by_mine),
    };

    result.properties.remove_map(name);
    if drop_map {
        report.removed_map = true;
        debug!(map = name, "map dropped from result");
    } else if let Some(kind) = kept {
        let map = result.properties.create_map(name, kind)?;
        for (address, value) in entries {
            map.put(address, value)?;
        }
        report.kind = Some(kind);
    }

    debug!(
        map = name,
        auto = report.auto_applied,
        convergent = report.convergent,
        conflicts = report.conflicts_resolved,
        dropped = report.dropped,
        "map merged"
    );
    Ok(report)
}

/// The value kind the merged map keeps. `None` when no side holds the map.
///
/// Latest's and Mine's kinds are compared with each other, not with
/// Original's, so a `TypeConflict` notice is emitted whenever they differ,
/// including when only one side recreated the map with a new kind.
fn kept_kind(
    name: &str,
    original: Option<&PropertyMap>,
    latest: Option<&PropertyMap>,
    mine: Option<&PropertyMap>,
    session: &mut Session<'_>,
) -> Option<ValueKind> {
    let (ok, lk, mk) = (
        original.map(PropertyMap::kind),
        latest.map(PropertyMap::kind),
        mine.map(PropertyMap::kind),
    );
    match (lk, mk) {
        (Some(l), Some(m)) if l != m => {
            // Mine only wins the kind when Latest left it alone.
            let kept = if lk == ok { m } else { l };
            session.notify(
                NoticeSubject::Map(name.to_string()),
                AnomalyKind::TypeConflict,
                format!(
                    "latest and mine do not have the same value kind for '{name}' property \
                     (latest {l}, mine {m}); keeping {kept}, values of the other kind are dropped"
                ),
            );
            Some(kept)
        }
        (Some(l), _) => Some(l),
        (None, Some(m)) => Some(m),
        (None, None) => None,
    }
}
