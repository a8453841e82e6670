//! Per-run plumbing shared by the map and tree merge routines.

use tracing::{debug, warn};

use crate::config::MergeConfig;
use crate::error::{MergeError, MergeResult};
use crate::notice::{AnomalyKind, MergeNotice, NoticeSink, NoticeSubject};
use crate::resolver::{Choice, Conflict, ConflictResolver, StickyChoice};
use crate::transaction::{CancelToken, TransactionState};

/// Everything a merge routine needs besides the snapshots: the resolver,
/// the notice sink, the cancellation flag and the transaction state that
/// each resolver round trip moves through `AwaitingResolution`.
pub(crate) struct Session<'t> {
    pub(crate) config: &'t MergeConfig,
    resolver: &'t mut dyn ConflictResolver,
    sink: &'t mut dyn NoticeSink,
    state: &'t mut TransactionState,
    cancel: &'t CancelToken,
    notices: Vec<MergeNotice>,
    conflicts: usize,
}

impl<'t> Session<'t> {
    pub(crate) fn new(
        config: &'t MergeConfig,
        resolver: &'t mut dyn ConflictResolver,
        sink: &'t mut dyn NoticeSink,
        state: &'t mut TransactionState,
        cancel: &'t CancelToken,
    ) -> Self {
        Self {
            config,
            resolver,
            sink,
            state,
            cancel,
            notices: Vec::new(),
            conflicts: 0,
        }
    }

    /// Fail with `Cancelled` if the caller asked to stop.
    pub(crate) fn checkpoint(&self) -> MergeResult<()> {
        if self.cancel.is_cancelled() {
            return Err(MergeError::Cancelled);
        }
        Ok(())
    }

    /// Obtain a choice for `conflict`, from `sticky` if a previous answer in
    /// this scope applies to all, otherwise from the resolver.
    pub(crate) fn decide(&mut self, conflict: &Conflict<'_>, sticky: &mut StickyChoice) -> MergeResult<Choice> {
        self.checkpoint()?;
        self.conflicts += 1;
        if let Some(choice) = sticky.get() {
            debug!(unit = %conflict.unit, %choice, "conflict answered by apply-to-all");
            return Ok(choice);
        }

        self.state.advance(TransactionState::AwaitingResolution)?;
        let resolution = self.resolver.resolve(conflict)?;
        self.state.advance(TransactionState::Diffing)?;

        if resolution.apply_to_all {
            sticky.set(resolution.choice);
        }
        debug!(
            unit = %conflict.unit,
            choice = %resolution.choice,
            apply_to_all = resolution.apply_to_all,
            "conflict resolved"
        );
        Ok(resolution.choice)
    }

    /// Record an anomaly and pass it to the caller's sink.
    pub(crate) fn notify(&mut self, subject: NoticeSubject, kind: AnomalyKind, message: String) {
        warn!(%subject, %kind, "{message}");
        let notice = MergeNotice {
            subject,
            kind,
            message,
        };
        self.sink.notice(&notice);
        self.notices.push(notice);
    }

    /// Notices emitted so far and the number of conflicts decided.
    pub(crate) fn finish(self) -> (Vec<MergeNotice>, usize) {
        (self.notices, self.conflicts)
    }
}
