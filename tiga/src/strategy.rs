//! The in-memory model of a synthesized strategy.
//!
//! A [Strategy] maps every discrete [State] the synthesizer reported to the guarded
//! actions the controller may choose there. Guards are kept as raw text and never
//! evaluated.

use std::collections::{BTreeSet, HashMap};
use std::fmt::{self, Display};
use std::str::FromStr;

use itertools::Itertools;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::formats::{self, ParseError};

/// A discrete configuration of the network.
///
/// Locations appear in the order the components are listed in the input. Only the
/// *values* of the variables are retained, their names are given once by
/// [Strategy::variables].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct State {
    locations: Vec<String>,
    values: Vec<i64>,
}

impl State {
    pub fn new<L: Into<String>>(
        locations: impl IntoIterator<Item = L>,
        values: impl IntoIterator<Item = i64>,
    ) -> Self {
        Self {
            locations: locations.into_iter().map(Into::into).collect(),
            values: values.into_iter().collect(),
        }
    }

    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    pub fn values(&self) -> &[i64] {
        &self.values
    }
}

impl Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let locations = self.locations.iter().map(ToString::to_string);
        let values = self.values.iter().map(ToString::to_string);
        write!(f, "({})", locations.chain(values).join(", "))
    }
}

/// A conjunction of raw guard clauses such as `x<=5`.
///
/// The empty set is the unconditional guard `true`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Invariant {
    clauses: BTreeSet<String>,
}

impl Invariant {
    /// Builds an invariant from its clauses, dropping empty ones and duplicates.
    pub fn new<C: Into<String>>(clauses: impl IntoIterator<Item = C>) -> Self {
        Self {
            clauses: clauses
                .into_iter()
                .map(Into::into)
                .filter(|clause: &String| !clause.is_empty())
                .collect(),
        }
    }

    pub fn unconditional() -> Self {
        Self::default()
    }

    pub fn is_unconditional(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> impl Iterator<Item = &str> {
        self.clauses.iter().map(String::as_str)
    }

    pub fn contains(&self, clause: &str) -> bool {
        self.clauses.contains(clause)
    }
}

impl Display for Invariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unconditional() {
            write!(f, "true")
        } else {
            write!(f, "{}", self.clauses.iter().join(" && "))
        }
    }
}

/// An edge between two locations, identified by name only.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Transition {
    pub start: String,
    pub end: String,
}

impl Transition {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

impl Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.start, self.end)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "transitions")]
pub enum Action {
    /// Let time elapse without leaving the current locations.
    Wait,
    /// Fire the listed transitions.
    Move(Vec<Transition>),
}

impl Action {
    pub fn is_wait(&self) -> bool {
        matches!(self, Action::Wait)
    }

    pub fn transitions(&self) -> &[Transition] {
        match self {
            Action::Wait => &[],
            Action::Move(transitions) => transitions,
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Wait => write!(f, "wait"),
            Action::Move(transitions) => write!(f, "take {}", transitions.iter().join(", ")),
        }
    }
}

/// An action together with the invariant under which it may be chosen.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct GuardedAction {
    pub invariant: Invariant,
    pub action: Action,
}

impl GuardedAction {
    pub fn new(invariant: Invariant, action: Action) -> Self {
        Self { invariant, action }
    }
}

impl Display for GuardedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "when {}: {}", self.invariant, self.action)
    }
}

/// A finished strategy.
///
/// Immutable once parsed. Obtain one with [formats::tiga::parse] or [str::parse].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Strategy {
    variables: Vec<String>,
    rules: HashMap<State, Vec<GuardedAction>>,
}

impl Strategy {
    pub(crate) fn new(variables: Vec<String>, rules: HashMap<State, Vec<GuardedAction>>) -> Self {
        Self { variables, rules }
    }

    /// The variable names of the initial state, in the order every [State] lists its values.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn get(&self, state: &State) -> Option<&[GuardedAction]> {
        self.rules.get(state).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&State, &[GuardedAction])> {
        self.rules
            .iter()
            .map(|(state, actions)| (state, actions.as_slice()))
    }

    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.rules.keys()
    }

    /// Number of states with a rule.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules ordered by their state.
    pub fn sorted(&self) -> Vec<(&State, &[GuardedAction])> {
        self.iter().sorted_by(|(x, _), (y, _)| x.cmp(y)).collect()
    }

    /// Every distinct transition some move may fire, in order of first occurrence
    /// over the [sorted](Strategy::sorted) rules.
    pub fn transitions(&self) -> Vec<&Transition> {
        self.sorted()
            .into_iter()
            .flat_map(|(_, actions)| actions)
            .flat_map(|guarded| guarded.action.transitions())
            .unique()
            .collect()
    }
}

impl FromStr for Strategy {
    type Err = ParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        formats::tiga::parse(input)
    }
}

impl Serialize for Strategy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Rule<'s> {
            state: &'s State,
            actions: &'s [GuardedAction],
        }

        let rules = self
            .sorted()
            .into_iter()
            .map(|(state, actions)| Rule { state, actions })
            .collect_vec();
        let mut strategy = serializer.serialize_struct("Strategy", 2)?;
        strategy.serialize_field("variables", &self.variables)?;
        strategy.serialize_field("rules", &rules)?;
        strategy.end()
    }
}
