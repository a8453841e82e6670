//! Three-way merge engine for verso snapshots.
//!
//! Given Original (the common ancestor), Latest (the upstream version) and
//! Mine (the local version), [`merge`] produces a Result snapshot holding
//! every non-conflicting change from both sides plus the resolver's answer
//! for every conflicting one.
//!
//! # Merge Order
//!
//! 1. Property maps changed on either side, in ascending name order, each
//!    address classified and decided independently.
//! 2. The category tree: placements, then data types, then orphan and cycle
//!    repair, then a level-ordered rebuild that settles name collisions.
//! 3. Result is validated and committed, or the transaction aborts and
//!    Result is discarded.
//!
//! # Design Rules
//!
//! 1. One-sided changes apply without asking.
//! 2. Identical changes on both sides apply once without asking.
//! 3. Every divergent unit is answered by the [`ConflictResolver`], or by an
//!    earlier apply-to-all answer within the same scope.
//! 4. Anomalies (type conflicts, dropped values, renames, resurrections,
//!    broken cycles) never fail the merge; each becomes a [`MergeNotice`].

pub mod category;
pub mod config;
pub mod error;
pub mod notice;
pub mod property;
pub mod resolver;
mod session;
pub mod three_way;
pub mod transaction;

pub use category::TreeMergeReport;
pub use config::MergeConfig;
pub use error::{MergeError, MergeResult};
pub use notice::{AnomalyKind, MergeNotice, NoticeSink, NoticeSubject, VecSink};
pub use property::MapMergeReport;
pub use resolver::{
    CancellingResolver, CandidateState, Choice, Conflict, ConflictKind, ConflictResolver, FixedResolver,
    FnResolver, Resolution, ScriptedResolver, StickyChoice, UnitId,
};
pub use three_way::{classify, Classification};
pub use transaction::{
    merge, merge_stored, CancelToken, MergeContext, MergeOutcome, MergeReport, MergeTransaction,
    TransactionState,
};
