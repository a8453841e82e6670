//! Merge-level anomaly notices.
//!
//! A notice is the only way the engine reports something outward without a
//! resolver round trip. Every notice goes to the caller's [`NoticeSink`]
//! as it happens and is also kept in the final report.

use std::fmt;

use serde::{Deserialize, Serialize};
use verso_types::CategoryId;

/// What a notice is about.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoticeSubject {
    /// A property map, by name.
    Map(String),
    /// A category node.
    Category(CategoryId),
}

impl fmt::Display for NoticeSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Map(name) => write!(f, "map '{name}'"),
            Self::Category(id) => write!(f, "category {id}"),
        }
    }
}

/// The kind of anomaly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnomalyKind {
    /// Latest and Mine hold the same map with different value kinds.
    TypeConflict,
    /// A value was discarded because its kind does not match the kind the
    /// merged map keeps.
    DroppedValue,
    /// Two siblings or two data types wanted the same name; one was renamed.
    NameCollision,
    /// A deleted category was re-created because surviving content needs it.
    ResurrectedCategory,
    /// An accepted move would have created a cycle and was reverted.
    MoveCycle,
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TypeConflict => "type conflict",
            Self::DroppedValue => "dropped value",
            Self::NameCollision => "name collision",
            Self::ResurrectedCategory => "resurrected category",
            Self::MoveCycle => "move cycle",
        };
        f.write_str(s)
    }
}

/// A structured notice emitted during a merge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeNotice {
    pub subject: NoticeSubject,
    pub kind: AnomalyKind,
    pub message: String,
}

impl fmt::Display for MergeNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.kind, self.subject, self.message)
    }
}

/// Receives notices as the merge emits them.
pub trait NoticeSink {
    fn notice(&mut self, notice: &MergeNotice);
}

impl<F> NoticeSink for F
where
    F: FnMut(&MergeNotice),
{
    fn notice(&mut self, notice: &MergeNotice) {
        self(notice)
    }
}

/// A sink that collects every notice.
#[derive(Clone, Debug, Default)]
pub struct VecSink {
    notices: Vec<MergeNotice>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> &[MergeNotice] {
        &self.notices
    }

    /// Number of collected notices of the given kind.
    pub fn count(&self, kind: AnomalyKind) -> usize {
        self.notices.iter().filter(|n| n.kind == kind).count()
    }

    pub fn into_notices(self) -> Vec<MergeNotice> {
        self.notices
    }
}

impl NoticeSink for VecSink {
    fn notice(&mut self, notice: &MergeNotice) {
        self.notices.push(notice.clone());
    }
}
