//! Three-way merge of the category tree and its data types.
//!
//! The merge first decides a final placement (parent and name) for every
//! category id and a final definition for every (category, name) data type
//! key, asking the resolver where Latest and Mine diverge. It then repairs
//! orphans and move cycles in that decision set and finally rebuilds the
//! Result tree from scratch, shallowest level first. Nothing is written to
//! Result until every decision is in.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::debug;
use verso_diff::{diff_categories, CategoryDiff};
use verso_store::{unique_name, CategoryTree, DataTypeAdded, Placement, Snapshot};
use verso_types::{CategoryId, DataType};

use crate::error::{MergeError, MergeResult};
use crate::notice::{AnomalyKind, NoticeSubject};
use crate::resolver::{CandidateState, Choice, Conflict, ConflictKind, StickyChoice, UnitId};
use crate::session::Session;
use crate::three_way::{classify, pick, Classification};
use crate::transaction::MergeContext;

type DataTypeKey = (CategoryId, String);
type DataTypeDecisions = (BTreeMap<DataTypeKey, DataType>, Vec<(CategoryId, DataType)>);

/// The three category trees under merge. Mine's may be a re-keyed copy.
struct Trees<'a> {
    original: &'a CategoryTree,
    latest: &'a CategoryTree,
    mine: &'a CategoryTree,
}

/// Outcome of merging the category tree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeMergeReport {
    /// Nodes and data types changed on one side only.
    pub auto_applied: usize,
    /// Nodes and data types changed identically on both sides.
    pub convergent: usize,
    /// Structural and data-type conflicts answered.
    pub conflicts_resolved: usize,
    /// Deleted categories re-created to hold surviving content.
    pub resurrected: usize,
    /// Categories or data types renamed to avoid a sibling collision.
    pub renamed_for_collision: usize,
    /// Accepted moves reverted because they closed a cycle.
    pub cycles_broken: usize,
    /// Data types created on both sides and settled by the conflict handler.
    pub data_types_handled: usize,
}

pub(crate) fn merge_category_tree(
    ctx: &MergeContext<'_>,
    latest_diff: &CategoryDiff,
    mine_diff: &CategoryDiff,
    result: &mut Snapshot,
    session: &mut Session<'_>,
) -> MergeResult<TreeMergeReport> {
    session.checkpoint()?;
    let mut report = TreeMergeReport::default();

    let original = &ctx.original.categories;
    let latest = &ctx.latest.categories;
    let matched = match_creations(original, latest, &ctx.mine.categories);
    let rekeyed;
    let rekeyed_diff;
    let (mine, mine_diff) = if matched.is_empty() {
        (&ctx.mine.categories, mine_diff)
    } else {
        rekeyed = rekey(&ctx.mine.categories, &matched)?;
        rekeyed_diff = diff_categories(original, &rekeyed);
        (&rekeyed, &rekeyed_diff)
    };
    let trees = Trees {
        original,
        latest,
        mine,
    };

    let mut placements = decide_placements(&trees, latest_diff, mine_diff, session, &mut report)?;
    let (data_types, both_created) = decide_data_types(&trees, latest_diff, mine_diff, session, &mut report)?;
    repair(&trees, &mut placements, &data_types, session, &mut report)?;

    let mut tree = build_tree(&trees, &placements, session, &mut report)?;
    for ((category, _), dt) in data_types {
        tree.put_data_type(category, dt)?;
    }
    for (category, dt) in both_created {
        let config = session.config;
        let outcome = tree.add_data_type(category, dt, config.data_type_handler, &config.conflict_suffix)?;
        report.data_types_handled += 1;
        debug!(category = %category, ?outcome, "data type created on both sides");
        if let DataTypeAdded::Renamed { from, to } = outcome {
            report.renamed_for_collision += 1;
            session.notify(
                NoticeSubject::Category(category),
                AnomalyKind::NameCollision,
                format!("data type '{from}' was created on both sides with different definitions; mine's is now '{to}'"),
            );
        }
    }

    result.categories = tree;
    debug!(
        auto = report.auto_applied,
        convergent = report.convergent,
        conflicts = report.conflicts_resolved,
        resurrected = report.resurrected,
        "category tree merged"
    );
    Ok(report)
}

/// Pair every category Mine created with the category Latest created under
/// the same parent with the same name. Parents are looked up through earlier
/// pairs, so a subtree created on both sides lines up level by level.
fn match_creations(
    original: &CategoryTree,
    latest: &CategoryTree,
    mine: &CategoryTree,
) -> BTreeMap<CategoryId, CategoryId> {
    let mut matched: BTreeMap<CategoryId, CategoryId> = BTreeMap::new();
    let mut taken: BTreeSet<CategoryId> = BTreeSet::new();
    let mut queue = VecDeque::from([CategoryId::ROOT]);
    while let Some(parent) = queue.pop_front() {
        let latest_parent = matched.get(&parent).copied().unwrap_or(parent);
        for child in mine.children(parent) {
            let id = child.id();
            queue.push_back(id);
            if original.contains(id) || latest.contains(id) {
                continue;
            }
            let Some(twin) = latest.child_named(latest_parent, child.name()) else {
                continue;
            };
            if original.contains(twin) || mine.contains(twin) || !taken.insert(twin) {
                continue;
            }
            debug!(mine = %id, latest = %twin, name = child.name(), "category created on both sides");
            matched.insert(id, twin);
        }
    }
    matched
}

/// A copy of Mine's tree with every matched id replaced by its Latest twin.
fn rekey(mine: &CategoryTree, matched: &BTreeMap<CategoryId, CategoryId>) -> MergeResult<CategoryTree> {
    let key = |id: CategoryId| matched.get(&id).copied().unwrap_or(id);
    let mut tree = CategoryTree::new();
    let mut queue = VecDeque::from([CategoryId::ROOT]);
    while let Some(id) = queue.pop_front() {
        for child in mine.children(id) {
            tree.insert_category(key(child.id()), key(id), child.name())?;
            queue.push_back(child.id());
        }
        for dt in mine.get(id).into_iter().flat_map(|c| c.data_types()) {
            tree.put_data_type(key(id), dt.clone())?;
        }
    }
    Ok(tree)
}

/// Final placement of every surviving non-root category.
fn decide_placements(
    trees: &Trees<'_>,
    latest_diff: &CategoryDiff,
    mine_diff: &CategoryDiff,
    session: &mut Session<'_>,
    report: &mut TreeMergeReport,
) -> MergeResult<BTreeMap<CategoryId, Placement>> {
    let (o, l, m) = (trees.original, trees.latest, trees.mine);
    let mut placements: BTreeMap<CategoryId, Placement> =
        l.ids().filter_map(|id| l.placement(id).map(|p| (id, p))).collect();

    let changed: BTreeSet<CategoryId> = latest_diff
        .nodes
        .keys()
        .chain(mine_diff.nodes.keys())
        .copied()
        .collect();

    let mut sticky = StickyChoice::new();
    for id in changed {
        session.checkpoint()?;
        let (op, lp, mp) = (o.placement(id), l.placement(id), m.placement(id));
        let choice = match classify(op.as_ref(), lp.as_ref(), mp.as_ref()) {
            Classification::Unchanged => continue,
            Classification::Convergent => {
                report.convergent += 1;
                Choice::Latest
            }
            Classification::OneSided(side) => {
                report.auto_applied += 1;
                debug!(category = %id, %side, "one-sided structural change applied");
                side
            }
            Classification::Divergent => {
                let conflict = Conflict {
                    kind: ConflictKind::Structure,
                    unit: UnitId::Category(id),
                    original: CandidateState::Placement(op.as_ref()),
                    latest: CandidateState::Placement(lp.as_ref()),
                    mine: CandidateState::Placement(mp.as_ref()),
                };
                report.conflicts_resolved += 1;
                session.decide(&conflict, &mut sticky)?
            }
        };
        match pick(choice, op, lp, mp) {
            Some(placement) => placements.insert(id, placement),
            None => placements.remove(&id),
        };
    }
    Ok(placements)
}

/// Final definition of every surviving data type, plus the Mine-side types
/// that were created on both sides with different shapes and go through the
/// configured conflict handler instead of the resolver.
fn decide_data_types(
    trees: &Trees<'_>,
    latest_diff: &CategoryDiff,
    mine_diff: &CategoryDiff,
    session: &mut Session<'_>,
    report: &mut TreeMergeReport,
) -> MergeResult<DataTypeDecisions> {
    let (o, l, m) = (trees.original, trees.latest, trees.mine);
    let mut data_types: BTreeMap<DataTypeKey, DataType> = BTreeMap::new();
    for id in l.ids() {
        for dt in l.get(id).into_iter().flat_map(|c| c.data_types()) {
            data_types.insert((id, dt.name.clone()), dt.clone());
        }
    }

    let changed: BTreeSet<DataTypeKey> = latest_diff
        .data_types
        .keys()
        .chain(mine_diff.data_types.keys())
        .cloned()
        .collect();

    let mut sticky = StickyChoice::new();
    let mut both_created = Vec::new();
    for (category, name) in changed {
        session.checkpoint()?;
        let (od, ld, md) = (
            o.data_type(category, &name),
            l.data_type(category, &name),
            m.data_type(category, &name),
        );
        let choice = match classify(od, ld, md) {
            Classification::Unchanged => continue,
            Classification::Convergent => {
                report.convergent += 1;
                Choice::Latest
            }
            Classification::OneSided(side) => {
                report.auto_applied += 1;
                debug!(category = %category, name = %name, %side, "one-sided data type change applied");
                side
            }
            Classification::Divergent if od.is_none() => {
                // Latest's definition stays under the name.
                if let Some(dt) = md {
                    both_created.push((category, dt.clone()));
                }
                continue;
            }
            Classification::Divergent => {
                let conflict = Conflict {
                    kind: ConflictKind::DataType,
                    unit: UnitId::DataType {
                        category,
                        name: name.clone(),
                    },
                    original: CandidateState::DataType(od),
                    latest: CandidateState::DataType(ld),
                    mine: CandidateState::DataType(md),
                };
                report.conflicts_resolved += 1;
                session.decide(&conflict, &mut sticky)?
            }
        };
        let key = (category, name);
        match pick(choice, od, ld, md) {
            Some(dt) => data_types.insert(key, dt.clone()),
            None => data_types.remove(&key),
        };
    }
    Ok((data_types, both_created))
}

/// Resurrect categories that surviving content needs and revert moves that
/// close a cycle, until neither remains.
fn repair(
    trees: &Trees<'_>,
    placements: &mut BTreeMap<CategoryId, Placement>,
    data_types: &BTreeMap<DataTypeKey, DataType>,
    session: &mut Session<'_>,
    report: &mut TreeMergeReport,
) -> MergeResult<()> {
    loop {
        let mut changed = false;

        let missing: BTreeSet<CategoryId> = placements
            .values()
            .map(|p| p.parent)
            .chain(data_types.keys().map(|(category, _)| *category))
            .filter(|id| !id.is_root() && !placements.contains_key(id))
            .collect();
        for id in missing {
            let placement = resurrect(trees, id, session)?;
            placements.insert(id, placement);
            report.resurrected += 1;
            changed = true;
        }

        if let Some(cycle) = find_cycle(placements) {
            let (id, placement) = cycle
                .iter()
                .filter_map(|id| trees.latest.placement(*id).map(|p| (*id, p)))
                .find(|(id, p)| placements.get(id) != Some(p))
                .ok_or_else(|| MergeError::NotFound(format!("latest placement to break the cycle through {}", cycle[0])))?;
            session.notify(
                NoticeSubject::Category(id),
                AnomalyKind::MoveCycle,
                format!(
                    "moving category '{}' would create a cycle; it keeps its latest placement",
                    placement.name
                ),
            );
            placements.insert(id, placement);
            report.cycles_broken += 1;
            changed = true;
        }

        if !changed {
            return Ok(());
        }
    }
}

/// Placement for a deleted category that merged content still lives in:
/// Mine's, else Original's, else Latest's.
fn resurrect(trees: &Trees<'_>, id: CategoryId, session: &mut Session<'_>) -> MergeResult<Placement> {
    let placement = trees
        .mine
        .placement(id)
        .or_else(|| trees.original.placement(id))
        .or_else(|| trees.latest.placement(id))
        .ok_or_else(|| MergeError::NotFound(format!("category {id} exists in no snapshot")))?;
    if !session.config.resurrect_orphans {
        return Err(MergeError::NotFound(format!(
            "category '{}' ({id}) was deleted but merged content still lives in it",
            placement.name
        )));
    }
    session.notify(
        NoticeSubject::Category(id),
        AnomalyKind::ResurrectedCategory,
        format!(
            "re-created deleted category '{}' because merged content still lives in it",
            placement.name
        ),
    );
    Ok(placement)
}

/// Members of the first parent cycle found, in walk order.
fn find_cycle(placements: &BTreeMap<CategoryId, Placement>) -> Option<Vec<CategoryId>> {
    let mut settled: BTreeSet<CategoryId> = BTreeSet::new();
    for &start in placements.keys() {
        let mut walk = Vec::new();
        let mut current = start;
        while !current.is_root() && !settled.contains(&current) {
            if let Some(pos) = walk.iter().position(|c| *c == current) {
                return Some(walk.split_off(pos));
            }
            walk.push(current);
            match placements.get(&current) {
                Some(p) => current = p.parent,
                None => break,
            }
        }
        settled.extend(walk);
    }
    None
}

/// Distance from the root for every placed id. Assumes no cycles.
fn depths(placements: &BTreeMap<CategoryId, Placement>) -> BTreeMap<CategoryId, usize> {
    let mut depth: BTreeMap<CategoryId, usize> = BTreeMap::new();
    for &id in placements.keys() {
        let mut chain = Vec::new();
        let mut current = id;
        let base = loop {
            if current.is_root() {
                break 0;
            }
            if let Some(d) = depth.get(&current) {
                break *d;
            }
            chain.push(current);
            match placements.get(&current) {
                Some(p) => current = p.parent,
                None => break 0,
            }
        };
        for (i, c) in chain.iter().rev().enumerate() {
            depth.insert(*c, base + i + 1);
        }
    }
    depth
}

/// Insert every placed category into a fresh tree, one level at a time.
///
/// Within a level, nodes that sit where Latest has them go first, so when
/// two siblings want the same name the Latest one keeps it and the other
/// gets the conflict suffix.
fn build_tree(
    trees: &Trees<'_>,
    placements: &BTreeMap<CategoryId, Placement>,
    session: &mut Session<'_>,
    report: &mut TreeMergeReport,
) -> MergeResult<CategoryTree> {
    let latest = trees.latest;
    let depth = depths(placements);
    let mut order: Vec<CategoryId> = placements.keys().copied().collect();
    order.sort_by_key(|id| {
        let moved_off_latest = latest.placement(*id).as_ref() != placements.get(id);
        (depth.get(id).copied().unwrap_or(0), moved_off_latest, *id)
    });

    let mut tree = CategoryTree::new();
    for id in order {
        let Some(placement) = placements.get(&id) else {
            continue;
        };
        let parent = placement.parent;
        let name = if tree.child_named(parent, &placement.name).is_some() {
            let renamed = unique_name(&placement.name, &session.config.conflict_suffix, |n| {
                tree.child_named(parent, n).is_some()
            });
            report.renamed_for_collision += 1;
            session.notify(
                NoticeSubject::Category(id),
                AnomalyKind::NameCollision,
                format!(
                    "a sibling named '{}' already exists; category renamed to '{renamed}'",
                    placement.name
                ),
            );
            renamed
        } else {
            placement.name.clone()
        };
        tree.insert_category(id, parent, &name)?;
    }
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::VecSink;
    use crate::resolver::{FixedResolver, FnResolver, Resolution, ScriptedResolver};
    use crate::transaction::{merge, MergeTransaction, TransactionState};
    use crate::MergeConfig;
    use verso_store::DataTypeConflictHandler;
    use verso_types::{CategoryPath, Field};

    fn path(s: &str) -> CategoryPath {
        CategoryPath::parse(s).unwrap()
    }

    /// /MISC and /Category1/Category2/{Category3,Category4,Category5}.
    fn original() -> Snapshot {
        let mut snap = Snapshot::new();
        snap.categories.create_category(&path("/MISC")).unwrap();
        for leaf in ["Category3", "Category4", "Category5"] {
            snap.categories
                .create_category(&path(&format!("/Category1/Category2/{leaf}")))
                .unwrap();
        }
        snap
    }

    fn id(snap: &Snapshot, p: &str) -> CategoryId {
        snap.categories.get_by_path(&path(p)).unwrap().id()
    }

    fn has(snap: &Snapshot, p: &str) -> bool {
        snap.categories.contains_path(&path(p))
    }

    fn run(o: &Snapshot, l: &Snapshot, m: &Snapshot, resolver: &mut dyn crate::ConflictResolver) -> (Snapshot, VecSink) {
        let mut sink = VecSink::new();
        let outcome = merge((o, l, m).into(), &MergeConfig::default(), resolver, &mut sink).unwrap();
        (outcome.result, sink)
    }

    fn byte_struct(name: &str, field_type: &str) -> DataType {
        DataType::structure(name, vec![Field::new("a", field_type, 1)])
    }

    #[test]
    fn rename_in_latest_only() {
        let o = original();
        let mut l = o.clone();
        l.categories.rename_category(id(&o, "/MISC"), "My Misc").unwrap();

        let mut resolver = ScriptedResolver::new();
        let (result, _) = run(&o, &l, &o, &mut resolver);
        assert!(has(&result, "/My Misc"));
        assert!(!has(&result, "/MISC"));
        assert_eq!(resolver.request_count(), 0);
    }

    #[test]
    fn rename_in_mine_keeps_children() {
        let o = original();
        let mut m = o.clone();
        m.categories
            .rename_category(id(&o, "/Category1/Category2"), "Renamed")
            .unwrap();

        let mut resolver = ScriptedResolver::new();
        let (result, _) = run(&o, &o, &m, &mut resolver);
        for leaf in ["Category3", "Category4", "Category5"] {
            assert!(has(&result, &format!("/Category1/Renamed/{leaf}")));
        }
        assert_eq!(resolver.request_count(), 0);
    }

    #[test]
    fn same_rename_on_both_sides_is_convergent() {
        let o = original();
        let misc = id(&o, "/MISC");
        let mut l = o.clone();
        l.categories.rename_category(misc, "Other").unwrap();
        let m = l.clone();

        let mut resolver = ScriptedResolver::new();
        let mut sink = VecSink::new();
        let outcome = merge((&o, &l, &m).into(), &MergeConfig::default(), &mut resolver, &mut sink).unwrap();
        assert!(has(&outcome.result, "/Other"));
        assert_eq!(outcome.report.tree.convergent, 1);
        assert_eq!(resolver.request_count(), 0);
    }

    #[test]
    fn different_renames_follow_each_choice() {
        let o = original();
        let c5 = id(&o, "/Category1/Category2/Category5");
        let mut l = o.clone();
        l.categories.rename_category(c5, "LatestName").unwrap();
        let mut m = o.clone();
        m.categories.rename_category(c5, "MyName").unwrap();

        for (choice, expected) in [
            (Choice::Original, "Category5"),
            (Choice::Latest, "LatestName"),
            (Choice::Mine, "MyName"),
        ] {
            let mut resolver = ScriptedResolver::new().decide(UnitId::Category(c5), choice);
            let (result, _) = run(&o, &l, &m, &mut resolver);
            assert_eq!(result.categories.get(c5).unwrap().name(), expected);
            assert_eq!(resolver.request_count(), 1);
        }
    }

    #[test]
    fn different_moves_follow_the_choice() {
        let o = original();
        let c5 = id(&o, "/Category1/Category2/Category5");
        let c3 = id(&o, "/Category1/Category2/Category3");
        let misc = id(&o, "/MISC");
        let mut l = o.clone();
        l.categories.move_category(c5, c3).unwrap();
        let mut m = o.clone();
        m.categories.move_category(c5, misc).unwrap();

        let (result, _) = run(&o, &l, &m, &mut FixedResolver(Choice::Mine));
        assert!(has(&result, "/MISC/Category5"));
        assert!(!has(&result, "/Category1/Category2/Category3/Category5"));

        let (result, _) = run(&o, &l, &m, &mut FixedResolver(Choice::Latest));
        assert!(has(&result, "/Category1/Category2/Category3/Category5"));
    }

    #[test]
    fn delete_versus_rename_asks() {
        let o = original();
        let misc = id(&o, "/MISC");
        let mut l = o.clone();
        l.categories.remove_category(misc).unwrap();
        let mut m = o.clone();
        m.categories.rename_category(misc, "Kept").unwrap();

        let (result, _) = run(&o, &l, &m, &mut FixedResolver(Choice::Latest));
        assert!(!result.categories.contains(misc));

        let (result, _) = run(&o, &l, &m, &mut FixedResolver(Choice::Mine));
        assert!(has(&result, "/Kept"));
    }

    #[test]
    fn create_then_delete_nets_to_nothing() {
        let o = original();
        let mut m = o.clone();
        let temp = m.categories.create_category(&path("/MISC/Temp")).unwrap();
        m.categories.remove_category(temp).unwrap();

        let mut resolver = ScriptedResolver::new();
        let (result, sink) = run(&o, &o, &m, &mut resolver);
        assert!(!result.categories.contains(temp));
        assert_eq!(result, o);
        assert_eq!(resolver.request_count(), 0);
        assert!(sink.notices().is_empty());
    }

    #[test]
    fn child_added_under_category_renamed_elsewhere() {
        let o = original();
        let c2 = id(&o, "/Category1/Category2");
        let mut l = o.clone();
        l.categories.rename_category(c2, "Renamed").unwrap();
        let mut m = o.clone();
        m.categories
            .create_category(&path("/Category1/Category2/NewKid"))
            .unwrap();

        let (result, _) = run(&o, &l, &m, &mut ScriptedResolver::new());
        assert!(has(&result, "/Category1/Renamed/NewKid"));
        assert!(has(&result, "/Category1/Renamed/Category3"));
    }

    #[test]
    fn data_type_added_under_category_renamed_elsewhere() {
        let o = original();
        let misc = id(&o, "/MISC");
        let mut l = o.clone();
        l.categories.rename_category(misc, "My Misc").unwrap();
        let mut m = o.clone();
        m.categories.put_data_type(misc, byte_struct("struct_one", "byte")).unwrap();

        let (result, _) = run(&o, &l, &m, &mut ScriptedResolver::new());
        // The old path is not re-created; the type follows the category.
        let cat = result.categories.get_by_path(&path("/My Misc")).unwrap();
        assert!(cat.data_type("struct_one").is_some());
        assert!(!has(&result, "/MISC"));
    }

    #[test]
    fn content_under_deleted_category_resurrects_it() {
        let o = original();
        let c2 = id(&o, "/Category1/Category2");
        let c3 = id(&o, "/Category1/Category2/Category3");
        let mut l = o.clone();
        l.categories.remove_category(id(&o, "/Category1")).unwrap();
        let mut m = o.clone();
        m.categories.put_data_type(c3, byte_struct("s", "byte")).unwrap();

        let (result, sink) = run(&o, &l, &m, &mut ScriptedResolver::new());
        assert!(has(&result, "/Category1/Category2/Category3"));
        assert!(result.categories.data_type(c3, "s").is_some());
        // siblings Latest deleted stay deleted
        assert!(!has(&result, "/Category1/Category2/Category4"));
        assert!(result.categories.contains(c2));
        assert_eq!(sink.count(AnomalyKind::ResurrectedCategory), 3);
    }

    #[test]
    fn orphan_is_fatal_without_resurrection() {
        let o = original();
        let misc = id(&o, "/MISC");
        let mut l = o.clone();
        l.categories.remove_category(misc).unwrap();
        let mut m = o.clone();
        m.categories.create_category(&path("/MISC/Sub")).unwrap();

        let config = MergeConfig {
            resurrect_orphans: false,
            ..Default::default()
        };
        let mut tx = MergeTransaction::new((&o, &l, &m).into(), config);
        let err = tx.run(&mut ScriptedResolver::new(), &mut VecSink::new()).unwrap_err();
        assert!(matches!(err, MergeError::NotFound(_)));
        assert_eq!(tx.state(), TransactionState::Aborted);
    }

    #[test]
    fn crossing_moves_break_the_cycle() {
        let o = original();
        let misc = id(&o, "/MISC");
        let c3 = id(&o, "/Category1/Category2/Category3");
        let mut l = o.clone();
        l.categories.move_category(misc, c3).unwrap();
        let mut m = o.clone();
        m.categories.move_category(c3, misc).unwrap();

        let (result, sink) = run(&o, &l, &m, &mut ScriptedResolver::new());
        result.validate().unwrap();
        assert_eq!(sink.count(AnomalyKind::MoveCycle), 1);
        assert!(has(&result, "/Category1/Category2/Category3/MISC"));
    }

    #[test]
    fn sibling_name_collision_gets_suffix() {
        let o = original();
        let c3 = id(&o, "/Category1/Category2/Category3");
        let c4 = id(&o, "/Category1/Category2/Category4");
        let mut l = o.clone();
        l.categories.rename_category(c3, "Shared").unwrap();
        let mut m = o.clone();
        m.categories.rename_category(c4, "Shared").unwrap();

        let (result, sink) = run(&o, &l, &m, &mut ScriptedResolver::new());
        assert_eq!(result.categories.get(c3).unwrap().name(), "Shared");
        assert_eq!(result.categories.get(c4).unwrap().name(), "Shared.conflict");
        assert_eq!(sink.count(AnomalyKind::NameCollision), 1);
    }

    #[test]
    fn same_category_created_on_both_sides_converges() {
        let o = original();
        let mut l = o.clone();
        let theirs = l.categories.create_category(&path("/MISC/New")).unwrap();
        l.categories.put_data_type(theirs, byte_struct("s", "byte")).unwrap();
        let mut m = o.clone();
        let ours = m.categories.create_category(&path("/MISC/New")).unwrap();
        m.categories.put_data_type(ours, byte_struct("s", "byte")).unwrap();

        let mut resolver = ScriptedResolver::new();
        let mut sink = VecSink::new();
        let outcome = merge((&o, &l, &m).into(), &MergeConfig::default(), &mut resolver, &mut sink).unwrap();
        let result = outcome.result;

        let misc = id(&o, "/MISC");
        let names: Vec<&str> = result.categories.children(misc).into_iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["New"]);
        assert!(result.categories.contains(theirs));
        assert!(!result.categories.contains(ours));
        assert_eq!(result.categories.get(theirs).unwrap().data_types().count(), 1);
        assert_eq!(result, l);
        assert!(sink.notices().is_empty());
        assert_eq!(resolver.request_count(), 0);
        assert_eq!(outcome.report.tree.renamed_for_collision, 0);
    }

    #[test]
    fn subtrees_created_on_both_sides_merge_their_content() {
        let o = original();
        let mut l = o.clone();
        let theirs = l.categories.create_category(&path("/MISC/New")).unwrap();
        l.categories.put_data_type(theirs, byte_struct("s", "byte")).unwrap();
        let mut m = o.clone();
        let ours = m.categories.create_category(&path("/MISC/New")).unwrap();
        let sub = m.categories.create_category(&path("/MISC/New/Sub")).unwrap();
        m.categories.put_data_type(ours, byte_struct("s", "word")).unwrap();
        m.categories.put_data_type(ours, byte_struct("t", "byte")).unwrap();

        let (result, sink) = run(&o, &l, &m, &mut ScriptedResolver::new());
        assert!(!result.categories.contains(ours));
        assert_eq!(result.categories.get(sub).unwrap().parent(), Some(theirs));
        assert!(has(&result, "/MISC/New/Sub"));
        assert!(!has(&result, "/MISC/New.conflict"));
        assert_eq!(result.categories.data_type(theirs, "s"), Some(&byte_struct("s", "byte")));
        assert_eq!(
            result.categories.data_type(theirs, "s.conflict"),
            Some(&byte_struct("s.conflict", "word"))
        );
        assert_eq!(result.categories.data_type(theirs, "t"), Some(&byte_struct("t", "byte")));
        assert_eq!(sink.count(AnomalyKind::NameCollision), 1);
    }

    #[test]
    fn creation_does_not_merge_with_a_renamed_sibling() {
        let o = original();
        let misc = id(&o, "/MISC");
        let mut l = o.clone();
        l.categories.rename_category(misc, "New").unwrap();
        let mut m = o.clone();
        let ours = m.categories.create_category(&path("/New")).unwrap();

        let (result, sink) = run(&o, &l, &m, &mut ScriptedResolver::new());
        assert_eq!(result.categories.get(misc).unwrap().name(), "New");
        assert_eq!(result.categories.get(ours).unwrap().name(), "New.conflict");
        assert_eq!(sink.count(AnomalyKind::NameCollision), 1);
    }

    #[test]
    fn data_type_created_on_both_sides_is_renamed() {
        let o = original();
        let misc = id(&o, "/MISC");
        let mut l = o.clone();
        l.categories.put_data_type(misc, byte_struct("s", "byte")).unwrap();
        let mut m = o.clone();
        m.categories.put_data_type(misc, byte_struct("s", "word")).unwrap();

        let mut resolver = ScriptedResolver::new();
        let (result, sink) = run(&o, &l, &m, &mut resolver);
        assert_eq!(result.categories.data_type(misc, "s"), Some(&byte_struct("s", "byte")));
        assert_eq!(
            result.categories.data_type(misc, "s.conflict"),
            Some(&byte_struct("s.conflict", "word"))
        );
        assert_eq!(resolver.request_count(), 0);
        assert_eq!(sink.count(AnomalyKind::NameCollision), 1);
    }

    #[test]
    fn data_type_handler_keep_existing() {
        let o = original();
        let misc = id(&o, "/MISC");
        let mut l = o.clone();
        l.categories.put_data_type(misc, byte_struct("s", "byte")).unwrap();
        let mut m = o.clone();
        m.categories.put_data_type(misc, byte_struct("s", "word")).unwrap();

        let config = MergeConfig {
            data_type_handler: DataTypeConflictHandler::KeepExisting,
            ..Default::default()
        };
        let outcome = merge((&o, &l, &m).into(), &config, &mut ScriptedResolver::new(), &mut VecSink::new()).unwrap();
        let cat = outcome.result.categories.get(misc).unwrap();
        assert_eq!(cat.data_types().count(), 1);
        assert_eq!(cat.data_type("s"), Some(&byte_struct("s", "byte")));
        assert_eq!(outcome.report.tree.data_types_handled, 1);
    }

    #[test]
    fn divergent_data_type_edit_asks() {
        let mut o = original();
        let misc = id(&o, "/MISC");
        o.categories.put_data_type(misc, byte_struct("s", "byte")).unwrap();
        let mut l = o.clone();
        l.categories.put_data_type(misc, byte_struct("s", "word")).unwrap();
        let mut m = o.clone();
        m.categories.put_data_type(misc, byte_struct("s", "dword")).unwrap();

        let unit = UnitId::DataType {
            category: misc,
            name: "s".into(),
        };
        let mut resolver = ScriptedResolver::new().decide(unit.clone(), Choice::Mine);
        let (result, _) = run(&o, &l, &m, &mut resolver);
        assert_eq!(result.categories.data_type(misc, "s"), Some(&byte_struct("s", "dword")));
        assert_eq!(resolver.requests(), &[unit]);
    }

    #[test]
    fn apply_to_all_covers_remaining_structure_conflicts() {
        let o = original();
        let mut l = o.clone();
        let mut m = o.clone();
        for leaf in ["Category3", "Category4", "Category5"] {
            let c = id(&o, &format!("/Category1/Category2/{leaf}"));
            l.categories.rename_category(c, &format!("{leaf}L")).unwrap();
            m.categories.rename_category(c, &format!("{leaf}M")).unwrap();
        }

        let mut calls = 0;
        let mut resolver = FnResolver::new(|conflict| {
            assert_eq!(conflict.kind, ConflictKind::Structure);
            calls += 1;
            Ok(Resolution::for_all(Choice::Mine))
        });
        let (result, _) = run(&o, &l, &m, &mut resolver);
        drop(resolver);
        assert_eq!(calls, 1);
        for leaf in ["Category3", "Category4", "Category5"] {
            assert!(has(&result, &format!("/Category1/Category2/{leaf}M")));
        }
    }
}
