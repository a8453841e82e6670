//! The conflict resolver protocol.
//!
//! When Latest and Mine change the same unit in different ways, the engine
//! builds a [`Conflict`] and blocks on [`ConflictResolver::resolve`]. The
//! answer picks one of the three candidate states. A resolution flagged
//! `apply_to_all` is remembered in a [`StickyChoice`] and answers the
//! remaining conflicts of the same scope without asking again.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use verso_store::Placement;
use verso_types::{Address, CategoryId, DataType, PropertyValue};

use crate::error::{MergeError, MergeResult};

/// Which snapshot's state wins a conflict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Choice {
    Original,
    Latest,
    Mine,
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Original => "original",
            Self::Latest => "latest",
            Self::Mine => "mine",
        };
        f.write_str(s)
    }
}

/// A resolver's answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub choice: Choice,
    /// Reuse this choice for every remaining conflict in the same scope.
    pub apply_to_all: bool,
}

impl Resolution {
    /// Answer this conflict only.
    pub fn once(choice: Choice) -> Self {
        Self {
            choice,
            apply_to_all: false,
        }
    }

    /// Answer this and every remaining conflict in scope.
    pub fn for_all(choice: Choice) -> Self {
        Self {
            choice,
            apply_to_all: true,
        }
    }
}

/// The class of a conflicting unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConflictKind {
    /// A property-map entry.
    Value,
    /// A category's name or parent.
    Structure,
    /// A data type definition.
    DataType,
}

/// Identity of the conflicting unit.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitId {
    Address { map: String, address: Address },
    Category(CategoryId),
    DataType { category: CategoryId, name: String },
}

impl UnitId {
    pub fn address(map: impl Into<String>, address: Address) -> Self {
        Self::Address {
            map: map.into(),
            address,
        }
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address { map, address } => write!(f, "'{map}' at {address}"),
            Self::Category(id) => write!(f, "category {id}"),
            Self::DataType { category, name } => write!(f, "data type '{name}' in {category}"),
        }
    }
}

/// One side's state of the conflicting unit. `None` means absent there.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CandidateState<'a> {
    Value(Option<&'a PropertyValue>),
    Placement(Option<&'a Placement>),
    DataType(Option<&'a DataType>),
}

impl CandidateState<'_> {
    /// Returns `true` if the unit is absent on this side.
    pub fn is_absent(&self) -> bool {
        match self {
            Self::Value(v) => v.is_none(),
            Self::Placement(p) => p.is_none(),
            Self::DataType(d) => d.is_none(),
        }
    }
}

/// A divergent change waiting for a decision.
#[derive(Clone, Debug, PartialEq)]
pub struct Conflict<'a> {
    pub kind: ConflictKind,
    pub unit: UnitId,
    pub original: CandidateState<'a>,
    pub latest: CandidateState<'a>,
    pub mine: CandidateState<'a>,
}

impl<'a> Conflict<'a> {
    /// The candidate a choice selects.
    pub fn candidate(&self, choice: Choice) -> CandidateState<'a> {
        match choice {
            Choice::Original => self.original,
            Choice::Latest => self.latest,
            Choice::Mine => self.mine,
        }
    }
}

/// The decision source for conflicts.
///
/// Implementations may answer from a fixed policy, a script, or a human.
/// Returning [`MergeError::Cancelled`] aborts the whole merge.
pub trait ConflictResolver {
    fn resolve(&mut self, conflict: &Conflict<'_>) -> MergeResult<Resolution>;
}

/// A remembered "apply to all" choice for one scope.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StickyChoice(Option<Choice>);

impl StickyChoice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Choice> {
        self.0
    }

    pub fn set(&mut self, choice: Choice) {
        self.0 = Some(choice);
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }
}

// ---------------------------------------------------------------------------
// Provided resolvers
// ---------------------------------------------------------------------------

/// Always answers with the same choice. Suited to batch merges.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedResolver(pub Choice);

impl ConflictResolver for FixedResolver {
    fn resolve(&mut self, _conflict: &Conflict<'_>) -> MergeResult<Resolution> {
        Ok(Resolution::once(self.0))
    }
}

/// Answers from pre-recorded decisions per unit and records every request.
#[derive(Clone, Debug, Default)]
pub struct ScriptedResolver {
    decisions: HashMap<UnitId, Resolution>,
    fallback: Option<Resolution>,
    requests: Vec<UnitId>,
}

impl ScriptedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `unit` with `choice`.
    pub fn decide(mut self, unit: UnitId, choice: Choice) -> Self {
        self.decisions.insert(unit, Resolution::once(choice));
        self
    }

    /// Answer `unit` with `choice` and apply it to the rest of its scope.
    pub fn decide_all(mut self, unit: UnitId, choice: Choice) -> Self {
        self.decisions.insert(unit, Resolution::for_all(choice));
        self
    }

    /// Answer every unscripted unit with `choice`.
    pub fn otherwise(mut self, choice: Choice) -> Self {
        self.fallback = Some(Resolution::once(choice));
        self
    }

    /// Every unit the engine asked about, in order.
    pub fn requests(&self) -> &[UnitId] {
        &self.requests
    }

    pub fn request_count(&self) -> usize {
        self.requests.len()
    }
}

impl ConflictResolver for ScriptedResolver {
    fn resolve(&mut self, conflict: &Conflict<'_>) -> MergeResult<Resolution> {
        self.requests.push(conflict.unit.clone());
        self.decisions
            .get(&conflict.unit)
            .copied()
            .or(self.fallback)
            .ok_or_else(|| MergeError::Unresolved(conflict.unit.to_string()))
    }
}

/// Adapts a closure into a resolver.
pub struct FnResolver<F>(F);

impl<F> FnResolver<F>
where
    F: FnMut(&Conflict<'_>) -> MergeResult<Resolution>,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> ConflictResolver for FnResolver<F>
where
    F: FnMut(&Conflict<'_>) -> MergeResult<Resolution>,
{
    fn resolve(&mut self, conflict: &Conflict<'_>) -> MergeResult<Resolution> {
        (self.0)(conflict)
    }
}

/// Cancels the merge at the first conflict.
#[derive(Clone, Copy, Debug, Default)]
pub struct CancellingResolver;

impl ConflictResolver for CancellingResolver {
    fn resolve(&mut self, _conflict: &Conflict<'_>) -> MergeResult<Resolution> {
        Err(MergeError::Cancelled)
    }
}
