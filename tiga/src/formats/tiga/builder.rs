//! Post-order reduction of a parse tree into a [Strategy](crate::Strategy).

use log::warn;

use crate::formats::ParseError;
use crate::strategy::{Action, GuardedAction, Invariant, State, Transition};

use super::ParserContext;
use super::grammar::{Node, NodeKind};

/// The semantic value of a reduced node.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Value {
    /// Children of a purely structural node, passed through unchanged.
    Children(Vec<Value>),
    Text(String),
    Int(i64),
    Location(Option<String>),
    Var(Option<String>, i64),
    Vars(Vec<(Option<String>, i64)>),
    State(State),
    Invariant(Invariant),
    Invariants(Vec<Invariant>),
    Transition(Transition),
    Transitions(Vec<Transition>),
    Actions(Vec<GuardedAction>),
}

fn malformed(kind: NodeKind, detail: impl Into<String>) -> ParseError {
    ParseError::Internal {
        node: kind,
        detail: detail.into(),
    }
}

fn unexpected(kind: NodeKind, value: &Value) -> ParseError {
    malformed(kind, format!("unexpected child {value:?}"))
}

fn missing(kind: NodeKind, what: &str) -> ParseError {
    malformed(kind, format!("missing {what} child"))
}

pub(crate) struct Builder<'c> {
    context: &'c mut ParserContext,
}

impl<'c> Builder<'c> {
    pub fn new(context: &'c mut ParserContext) -> Self {
        Self { context }
    }

    /// Reduces *node* after all of its children have been reduced.
    pub fn walk(&mut self, node: &Node<'_>) -> Result<Value, ParseError> {
        let children = node
            .children
            .iter()
            .map(|child| self.walk(child))
            .collect::<Result<Vec<_>, _>>()?;
        self.reduce(node, children)
    }

    fn reduce(&mut self, node: &Node<'_>, children: Vec<Value>) -> Result<Value, ParseError> {
        let kind = node.kind;
        match kind {
            NodeKind::Strategy
            | NodeKind::Header
            | NodeKind::InitialCondition
            | NodeKind::Caveat
            | NodeKind::Intro
            | NodeKind::Conditions
            | NodeKind::Token => Ok(Value::Children(children)),
            NodeKind::Location => {
                let name = node.text.trim();
                Ok(Value::Location(
                    (!name.is_empty()).then(|| name.to_owned()),
                ))
            }
            NodeKind::VarName | NodeKind::ClauseText | NodeKind::Start | NodeKind::End => {
                Ok(Value::Text(node.text.to_owned()))
            }
            NodeKind::Int => node
                .text
                .parse()
                .map(Value::Int)
                .map_err(|_| ParseError::IntegerRange {
                    literal: node.text.to_owned(),
                }),
            NodeKind::VarState => {
                let mut name = None;
                let mut value = None;
                for child in children {
                    match child {
                        Value::Text(text) => name = Some(text),
                        Value::Int(int) => value = Some(int),
                        Value::Children(_) => {}
                        other => return Err(unexpected(kind, &other)),
                    }
                }
                let value = value.ok_or_else(|| missing(kind, "int"))?;
                Ok(Value::Var(name, value))
            }
            NodeKind::Vars => {
                let mut vars: Vec<(Option<String>, i64)> = Vec::new();
                for child in children {
                    let Value::Var(name, value) = child else {
                        return Err(unexpected(kind, &child));
                    };
                    // A repeated name keeps its first position and takes the later value.
                    let existing = name
                        .as_ref()
                        .and_then(|name| vars.iter().position(|(n, _)| n.as_ref() == Some(name)));
                    match existing {
                        Some(idx) => vars[idx].1 = value,
                        None => vars.push((name, value)),
                    }
                }
                Ok(Value::Vars(vars))
            }
            NodeKind::InitialState => {
                let (_, vars) = split_state(kind, children)?;
                self.context.variables = vars
                    .into_iter()
                    .map(|(name, _)| name.ok_or_else(|| missing(kind, "variable name")))
                    .collect::<Result<_, _>>()?;
                Ok(Value::Children(Vec::new()))
            }
            NodeKind::State => {
                let (locations, vars) = split_state(kind, children)?;
                Ok(Value::State(State::new(
                    locations,
                    vars.into_iter().map(|(_, value)| value),
                )))
            }
            NodeKind::Clause => {
                let mut text = None;
                for child in children {
                    match child {
                        Value::Text(clause) => text = Some(clause),
                        Value::Children(_) => {}
                        other => return Err(unexpected(kind, &other)),
                    }
                }
                text.map(Value::Text)
                    .ok_or_else(|| missing(kind, "clause text"))
            }
            NodeKind::Invariant => {
                let mut clauses = Vec::new();
                for child in children {
                    match child {
                        Value::Text(clause) => clauses.push(clause),
                        Value::Children(_) => {}
                        other => return Err(unexpected(kind, &other)),
                    }
                }
                if clauses.is_empty() {
                    return Err(missing(kind, "clause"));
                }
                Ok(Value::Invariant(Invariant::new(clauses)))
            }
            NodeKind::Unconditional => Ok(Value::Invariant(Invariant::unconditional())),
            NodeKind::Invariants => {
                let invariants = children
                    .into_iter()
                    .map(|child| match child {
                        Value::Invariant(invariant) => Ok(invariant),
                        other => Err(unexpected(kind, &other)),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                if invariants.is_empty() {
                    return Err(missing(kind, "invariant"));
                }
                Ok(Value::Invariants(invariants))
            }
            NodeKind::Transition => {
                let mut ends = Vec::with_capacity(2);
                for child in children {
                    match child {
                        Value::Text(text) => ends.push(text),
                        Value::Children(_) => {}
                        other => return Err(unexpected(kind, &other)),
                    }
                }
                let [start, end]: [String; 2] = ends
                    .try_into()
                    .map_err(|ends: Vec<String>| {
                        malformed(kind, format!("expected 2 location names, found {}", ends.len()))
                    })?;
                Ok(Value::Transition(Transition::new(start, end)))
            }
            NodeKind::Transitions => {
                let mut transitions = Vec::new();
                for child in children {
                    match child {
                        Value::Transition(transition) => transitions.push(transition),
                        Value::Children(_) => {}
                        other => return Err(unexpected(kind, &other)),
                    }
                }
                if transitions.is_empty() {
                    return Err(missing(kind, "transition"));
                }
                Ok(Value::Transitions(transitions))
            }
            NodeKind::Move => {
                let mut invariants = None;
                let mut transitions = None;
                for child in children {
                    match child {
                        Value::Invariants(values) => invariants = Some(values),
                        Value::Transitions(values) => transitions = Some(values),
                        Value::Children(_) => {}
                        other => return Err(unexpected(kind, &other)),
                    }
                }
                let invariants = invariants.ok_or_else(|| missing(kind, "invariants"))?;
                let transitions = transitions.ok_or_else(|| missing(kind, "transitions"))?;
                // Every invariant group is bound to the complete list of transitions.
                Ok(Value::Actions(
                    invariants
                        .into_iter()
                        .map(|invariant| {
                            GuardedAction::new(invariant, Action::Move(transitions.clone()))
                        })
                        .collect(),
                ))
            }
            NodeKind::Delay => {
                let mut invariants = None;
                for child in children {
                    match child {
                        Value::Invariants(values) => invariants = Some(values),
                        Value::Children(_) => {}
                        other => return Err(unexpected(kind, &other)),
                    }
                }
                let invariants = invariants.ok_or_else(|| missing(kind, "invariants"))?;
                Ok(Value::Actions(
                    invariants
                        .into_iter()
                        .map(|invariant| GuardedAction::new(invariant, Action::Wait))
                        .collect(),
                ))
            }
            NodeKind::Actions => {
                let mut actions = Vec::new();
                for child in children {
                    match child {
                        Value::Actions(values) => actions.extend(values),
                        other => return Err(unexpected(kind, &other)),
                    }
                }
                Ok(Value::Actions(actions))
            }
            NodeKind::Rule => {
                let mut state = None;
                let mut actions = None;
                for child in children {
                    match child {
                        Value::State(value) => state = Some(value),
                        Value::Actions(values) => actions = Some(values),
                        Value::Children(_) => {}
                        other => return Err(unexpected(kind, &other)),
                    }
                }
                let state = state.ok_or_else(|| missing(kind, "state"))?;
                let actions = actions.ok_or_else(|| missing(kind, "actions"))?;
                self.insert(state, actions);
                Ok(Value::Children(Vec::new()))
            }
        }
    }

    fn insert(&mut self, state: State, actions: Vec<GuardedAction>) {
        let expected = self.context.variables.len();
        if state.values().len() != expected {
            warn!(
                "State {} has {} values but the initial state declares {} variables.",
                state,
                state.values().len(),
                expected
            );
        }
        if let Some(previous) = self.context.rules.insert(state, actions) {
            // Last write wins, as in the synthesizer's own reader.
            warn!(
                "Rule for an already seen state replaced {} earlier actions.",
                previous.len()
            );
        }
    }
}

type StateParts = (Vec<String>, Vec<(Option<String>, i64)>);

/// Separates the non-empty locations and the variables of a state node.
fn split_state(kind: NodeKind, children: Vec<Value>) -> Result<StateParts, ParseError> {
    let mut locations = Vec::new();
    let mut vars = None;
    for child in children {
        match child {
            Value::Location(location) => locations.extend(location),
            Value::Vars(values) => vars = Some(values),
            Value::Children(_) => {}
            other => return Err(unexpected(kind, &other)),
        }
    }
    let vars = vars.ok_or_else(|| missing(kind, "vars"))?;
    Ok((locations, vars))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(kind: NodeKind, text: &str) -> Node<'_> {
        Node {
            kind,
            start: 0,
            text,
            children: Vec::new(),
        }
    }

    fn branch<'i>(kind: NodeKind, children: Vec<Node<'i>>) -> Node<'i> {
        Node {
            kind,
            start: 0,
            text: "",
            children,
        }
    }

    fn reduce(node: &Node<'_>) -> Result<Value, ParseError> {
        let mut context = ParserContext::new();
        Builder::new(&mut context).walk(node)
    }

    #[test]
    fn empty_locations_are_dropped() {
        assert_eq!(
            reduce(&leaf(NodeKind::Location, "  ")).unwrap(),
            Value::Location(None)
        );
        assert_eq!(
            reduce(&leaf(NodeKind::Location, " P.idle")).unwrap(),
            Value::Location(Some("P.idle".to_owned()))
        );
    }

    #[test]
    fn repeated_variable_keeps_position() {
        let var = |name, value| {
            branch(
                NodeKind::VarState,
                vec![
                    leaf(NodeKind::VarName, name),
                    leaf(NodeKind::Token, "="),
                    leaf(NodeKind::Int, value),
                ],
            )
        };
        let vars = branch(
            NodeKind::Vars,
            vec![var("x", "1"), var("y", "2"), var("x", "3")],
        );
        assert_eq!(
            reduce(&vars).unwrap(),
            Value::Vars(vec![(Some("x".to_owned()), 3), (Some("y".to_owned()), 2)])
        );
    }

    #[test]
    fn move_shares_transitions_between_invariants() {
        let invariant = |clause| {
            branch(
                NodeKind::Invariant,
                vec![branch(
                    NodeKind::Clause,
                    vec![leaf(NodeKind::ClauseText, clause)],
                )],
            )
        };
        let transition = branch(
            NodeKind::Transition,
            vec![
                leaf(NodeKind::Start, "A"),
                leaf(NodeKind::Token, "->"),
                leaf(NodeKind::End, "B"),
                leaf(NodeKind::Conditions, " { 1 }"),
            ],
        );
        let node = branch(
            NodeKind::Move,
            vec![
                branch(NodeKind::Invariants, vec![invariant("x<=5"), invariant("x>5")]),
                branch(NodeKind::Transitions, vec![transition]),
            ],
        );
        let Value::Actions(actions) = reduce(&node).unwrap() else {
            panic!("move must reduce to actions");
        };
        let moves = vec![Transition::new("A", "B")];
        assert_eq!(
            actions,
            vec![
                GuardedAction::new(Invariant::new(["x<=5"]), Action::Move(moves.clone())),
                GuardedAction::new(Invariant::new(["x>5"]), Action::Move(moves)),
            ]
        );
    }

    #[test]
    fn integer_overflow_is_reported() {
        let error = reduce(&leaf(NodeKind::Int, "99999999999999999999")).unwrap_err();
        assert!(matches!(error, ParseError::IntegerRange { .. }));
    }

    #[test]
    fn impossible_children_are_internal_errors() {
        let node = branch(NodeKind::Delay, vec![leaf(NodeKind::Int, "1")]);
        let error = reduce(&node).unwrap_err();
        assert_eq!(
            error,
            ParseError::Internal {
                node: NodeKind::Delay,
                detail: "unexpected child Int(1)".to_owned(),
            }
        );
        let node = branch(NodeKind::Transitions, vec![leaf(NodeKind::Token, "take")]);
        assert!(matches!(
            reduce(&node).unwrap_err(),
            ParseError::Internal { node: NodeKind::Transitions, .. }
        ));
        assert!(!reduce(&node).unwrap_err().is_syntax());
    }

    #[test]
    fn header_state_requires_names() {
        let node = branch(
            NodeKind::InitialState,
            vec![
                leaf(NodeKind::Location, "A"),
                branch(
                    NodeKind::Vars,
                    vec![branch(NodeKind::VarState, vec![leaf(NodeKind::Int, "0")])],
                ),
            ],
        );
        assert!(matches!(
            reduce(&node).unwrap_err(),
            ParseError::Internal { node: NodeKind::InitialState, .. }
        ));
    }
}
