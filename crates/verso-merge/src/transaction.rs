//! Merge transaction orchestration.
//!
//! A [`MergeTransaction`] binds Original, Latest and Mine, seeds Result from
//! Latest, merges every changed property map in ascending name order, then
//! merges the category tree, and finally validates and hands back Result.
//! Any fatal error or cancellation aborts the transaction and discards
//! Result.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use verso_diff::diff_snapshots;
use verso_store::{Snapshot, SnapshotRole, SnapshotStore};
use verso_types::SnapshotId;

use crate::category::{merge_category_tree, TreeMergeReport};
use crate::config::MergeConfig;
use crate::error::{MergeError, MergeResult};
use crate::notice::{MergeNotice, NoticeSink};
use crate::property::{merge_property_map, MapMergeReport};
use crate::resolver::ConflictResolver;
use crate::session::Session;

// ---------------------------------------------------------------------------
// TransactionState
// ---------------------------------------------------------------------------

/// Lifecycle of a merge transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionState {
    /// Snapshots bound, nothing merged yet.
    Initialized,
    /// Computing diffs and applying decisions.
    Diffing,
    /// Blocked on the conflict resolver.
    AwaitingResolution,
    /// Validating Result.
    Committing,
    Committed,
    Aborted,
}

impl TransactionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Aborted)
    }

    pub fn can_transition_to(&self, to: TransactionState) -> bool {
        use TransactionState::*;
        match (*self, to) {
            (Initialized, Diffing)
            | (Diffing, AwaitingResolution)
            | (AwaitingResolution, Diffing)
            | (Diffing, Committing)
            | (Committing, Committed) => true,
            (from, Aborted) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Move to `to`, or fail with `InvalidState` leaving `self` unchanged.
    pub fn advance(&mut self, to: TransactionState) -> MergeResult<()> {
        if !self.can_transition_to(to) {
            return Err(MergeError::InvalidState { from: *self, to });
        }
        *self = to;
        Ok(())
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initialized => "initialized",
            Self::Diffing => "diffing",
            Self::AwaitingResolution => "awaiting-resolution",
            Self::Committing => "committing",
            Self::Committed => "committed",
            Self::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// MergeContext
// ---------------------------------------------------------------------------

/// The three input snapshots of a merge.
#[derive(Clone, Copy, Debug)]
pub struct MergeContext<'a> {
    pub original: &'a Snapshot,
    pub latest: &'a Snapshot,
    pub mine: &'a Snapshot,
}

impl<'a> MergeContext<'a> {
    pub fn new(original: &'a Snapshot, latest: &'a Snapshot, mine: &'a Snapshot) -> Self {
        Self {
            original,
            latest,
            mine,
        }
    }

    /// The input playing `role`. Result is not an input, so it is `None`.
    pub fn snapshot(&self, role: SnapshotRole) -> Option<&'a Snapshot> {
        match role {
            SnapshotRole::Original => Some(self.original),
            SnapshotRole::Latest => Some(self.latest),
            SnapshotRole::Mine => Some(self.mine),
            SnapshotRole::Result => None,
        }
    }
}

impl<'a> From<(&'a Snapshot, &'a Snapshot, &'a Snapshot)> for MergeContext<'a> {
    fn from((original, latest, mine): (&'a Snapshot, &'a Snapshot, &'a Snapshot)) -> Self {
        Self::new(original, latest, mine)
    }
}

// ---------------------------------------------------------------------------
// CancelToken
// ---------------------------------------------------------------------------

/// Shared cancellation flag. Clones observe the same flag, so a caller can
/// keep one and hand another to a transaction running on another thread.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Everything a merge did besides producing Result.
#[derive(Clone, Debug, PartialEq)]
pub struct MergeReport {
    /// One entry per merged map, in name order.
    pub maps: Vec<MapMergeReport>,
    pub tree: TreeMergeReport,
    pub notices: Vec<MergeNotice>,
    /// Divergent units decided, by the resolver or an apply-to-all.
    pub conflicts: usize,
    pub state: TransactionState,
}

impl MergeReport {
    /// The report for map `name`, if it was merged.
    pub fn map(&self, name: &str) -> Option<&MapMergeReport> {
        self.maps.iter().find(|m| m.name == name)
    }
}

/// A committed merge.
#[derive(Clone, Debug)]
pub struct MergeOutcome {
    pub result: Snapshot,
    pub report: MergeReport,
}

// ---------------------------------------------------------------------------
// MergeTransaction
// ---------------------------------------------------------------------------

/// One three-way merge, run at most once.
pub struct MergeTransaction<'a> {
    ctx: MergeContext<'a>,
    config: MergeConfig,
    state: TransactionState,
    result: Option<Snapshot>,
    cancel: CancelToken,
}

impl<'a> MergeTransaction<'a> {
    pub fn new(ctx: MergeContext<'a>, config: MergeConfig) -> Self {
        info!(
            maps_latest = ctx.latest.properties.len(),
            maps_mine = ctx.mine.properties.len(),
            categories = ctx.original.categories.len(),
            "merge transaction initialized"
        );
        Self {
            result: Some(ctx.latest.clone()),
            ctx,
            config,
            state: TransactionState::Initialized,
            cancel: CancelToken::new(),
        }
    }

    /// Use `token` for cancellation instead of a private one.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// A handle that cancels this transaction.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Run the merge to completion.
    ///
    /// On any error the transaction is aborted and Result is discarded.
    pub fn run(
        &mut self,
        resolver: &mut dyn ConflictResolver,
        sink: &mut dyn NoticeSink,
    ) -> MergeResult<MergeOutcome> {
        match self.execute(resolver, sink) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                let from = self.state;
                self.abort();
                warn!(%from, error = %e, "merge transaction aborted");
                Err(e)
            }
        }
    }

    /// Abandon the transaction. No effect once it has committed or aborted.
    pub fn abort(&mut self) {
        if !self.state.is_terminal() {
            self.state = TransactionState::Aborted;
            self.result = None;
        }
    }

    fn execute(
        &mut self,
        resolver: &mut dyn ConflictResolver,
        sink: &mut dyn NoticeSink,
    ) -> MergeResult<MergeOutcome> {
        self.state.advance(TransactionState::Diffing)?;
        self.config.validate()?;
        let ctx = self.ctx;
        let mut result = self.result.take().unwrap_or_else(|| ctx.latest.clone());

        let latest_diff = diff_snapshots(ctx.original, ctx.latest);
        let mine_diff = diff_snapshots(ctx.original, ctx.mine);
        let map_names: BTreeSet<&str> = latest_diff
            .maps
            .keys()
            .chain(mine_diff.maps.keys())
            .map(String::as_str)
            .collect();

        let mut session = Session::new(&self.config, resolver, sink, &mut self.state, &self.cancel);
        session.checkpoint()?;

        let mut maps = Vec::with_capacity(map_names.len());
        for name in map_names {
            maps.push(merge_property_map(
                name,
                &ctx,
                latest_diff.map(name),
                mine_diff.map(name),
                &mut result,
                &mut session,
            )?);
        }
        let tree = merge_category_tree(
            &ctx,
            &latest_diff.categories,
            &mine_diff.categories,
            &mut result,
            &mut session,
        )?;
        let (notices, conflicts) = session.finish();

        self.state.advance(TransactionState::Committing)?;
        result.validate()?;
        self.state.advance(TransactionState::Committed)?;
        info!(
            maps = maps.len(),
            conflicts,
            notices = notices.len(),
            "merge transaction committed"
        );

        Ok(MergeOutcome {
            result,
            report: MergeReport {
                maps,
                tree,
                notices,
                conflicts,
                state: self.state,
            },
        })
    }
}

/// Merge three in-memory snapshots in one transaction.
pub fn merge(
    ctx: MergeContext<'_>,
    config: &MergeConfig,
    resolver: &mut dyn ConflictResolver,
    sink: &mut dyn NoticeSink,
) -> MergeResult<MergeOutcome> {
    MergeTransaction::new(ctx, config.clone()).run(resolver, sink)
}

/// Merge three stored snapshots and write Result back to `store`.
pub fn merge_stored(
    store: &dyn SnapshotStore,
    original: &SnapshotId,
    latest: &SnapshotId,
    mine: &SnapshotId,
    config: &MergeConfig,
    resolver: &mut dyn ConflictResolver,
    sink: &mut dyn NoticeSink,
) -> MergeResult<(SnapshotId, MergeReport)> {
    let read = |role: SnapshotRole, id: &SnapshotId| -> MergeResult<Snapshot> {
        store
            .read(id)?
            .ok_or_else(|| MergeError::NotFound(format!("{role} snapshot {}", id.short_hex())))
    };
    let o = read(SnapshotRole::Original, original)?;
    let l = read(SnapshotRole::Latest, latest)?;
    let m = read(SnapshotRole::Mine, mine)?;

    let outcome = merge((&o, &l, &m).into(), config, resolver, sink)?;
    let id = store.write(&outcome.result)?;
    info!(result = %id.short_hex(), "merge result stored");
    Ok((id, outcome.report))
}
