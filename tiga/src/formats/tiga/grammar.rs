//! Grammar of the strategy dumps.
//!
//! ```text
//! strategy     := header rule+ newline
//! header       := "Initial state:" newline initial newline? condition newline
//!                 caveat newline newline intro
//! initial      := "(" location+ ws ") " named_var*
//! condition    := "(#" (ws guard_text)+ ")"
//! caveat       := "Note: The 'strategy' is not guaranteed to be a strategy."
//! intro        := "Strategy to win:" / "Strategy to avoid losing:"
//! rule         := newline newline "State:" ws state actions
//! state        := "(" location+ ws ") " var*
//! named_var    := var_name "=" int ws
//! var          := (var_name "=")? int ws
//! var_name     := (ident "." ident) / ident
//! location     := ws text
//! actions      := (move / delay)+
//! move         := newline? "When you are in " invariants "," transitions
//! delay        := newline? "While you are in" tab invariants "," ws "wait."
//! invariants   := "true" / invariant+
//! invariant    := " || "? "(" clause+ ")"
//! clause       := "&&"? ws clause_text ws
//! transitions  := ws "take transition" ws transition (newline transition)*
//! transition   := text "->" text ws "{" condition_text "}"
//! ```
//!
//! Choices are ordered and the first matching alternative wins. A repetition stops
//! after the first iteration that consumes nothing, so `location+` yields empty
//! locations for the blanks around the parentheses.

use crate::formats::{Cursor, Expected, ParseError};

/// The kinds of nodes in a parse tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Strategy,
    Header,
    /// The initial state in the header, which fixes the variable order.
    InitialState,
    /// The `(#...)` guard of the initial state.
    InitialCondition,
    Caveat,
    Intro,
    Rule,
    State,
    Location,
    Vars,
    VarState,
    VarName,
    Int,
    Actions,
    Move,
    Delay,
    Invariants,
    /// The literal `true`.
    Unconditional,
    Invariant,
    Clause,
    ClauseText,
    Transitions,
    Transition,
    Start,
    End,
    /// The `{...}` trailing a transition.
    Conditions,
    /// Literal text and separators.
    Token,
}

/// A node of the concrete parse tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node<'i> {
    pub kind: NodeKind,
    /// Byte offset of the node in the input.
    pub start: usize,
    /// The input text covered by the node, including its children.
    pub text: &'i str,
    pub children: Vec<Node<'i>>,
}

impl<'i> Node<'i> {
    /// Iterates over the direct children of the given kind.
    pub fn children_of(&self, kind: NodeKind) -> impl Iterator<Item = &Node<'i>> {
        self.children.iter().filter(move |child| child.kind == kind)
    }
}

pub const CAVEAT: &str = "Note: The 'strategy' is not guaranteed to be a strategy.";
pub const INTRO_WIN: &str = "Strategy to win:";
pub const INTRO_SAFE: &str = "Strategy to avoid losing:";

/// Tiga's names follow the ASCII range `A`..=`z`, which spans `[ \ ] ^ _` and the backtick
/// as well.
fn is_az(c: char) -> bool {
    ('A'..='z').contains(&c)
}

fn is_ident_char(c: char) -> bool {
    is_az(c) || c.is_ascii_digit()
}

fn is_text_char(c: char) -> bool {
    is_ident_char(c) || ".&=><:#?+'".contains(c)
}

fn is_guard_char(c: char) -> bool {
    is_text_char(c) || c == '-'
}

fn is_clause_char(c: char) -> bool {
    is_ident_char(c) || ".=><-+#'".contains(c)
}

fn is_condition_char(c: char) -> bool {
    is_ident_char(c) || ".=><:#?+-!,'()& ".contains(c)
}

/// Parses *input* into a concrete parse tree rooted at a [NodeKind::Strategy] node.
pub fn parse_tree(input: &str) -> Result<Node<'_>, ParseError> {
    let mut grammar = Grammar {
        cursor: Cursor::new(input),
    };
    grammar.strategy().ok_or_else(|| grammar.cursor.error())
}

type Rule<'i> = fn(&mut Grammar<'i>) -> Option<Node<'i>>;

struct Grammar<'i> {
    cursor: Cursor<'i>,
}

impl<'i> Grammar<'i> {
    fn node(&self, kind: NodeKind, start: usize, children: Vec<Node<'i>>) -> Node<'i> {
        Node {
            kind,
            start,
            text: self.cursor.slice(start),
            children,
        }
    }

    fn leaf(&self, kind: NodeKind, start: usize) -> Node<'i> {
        self.node(kind, start, Vec::new())
    }

    /// Runs *rule* and rewinds the cursor if it fails.
    fn attempt(&mut self, rule: Rule<'i>) -> Option<Node<'i>> {
        let start = self.cursor.position();
        let node = rule(self);
        if node.is_none() {
            self.cursor.reset(start);
        }
        node
    }

    /// Greedily repeats *rule*, returning the number of matches.
    fn repeat(&mut self, rule: Rule<'i>, children: &mut Vec<Node<'i>>) -> usize {
        let mut count = 0;
        while let Some(node) = self.attempt(rule) {
            let empty = node.text.is_empty();
            children.push(node);
            count += 1;
            if empty {
                break;
            }
        }
        count
    }

    fn optional(&mut self, rule: Rule<'i>, children: &mut Vec<Node<'i>>) {
        if let Some(node) = self.attempt(rule) {
            children.push(node);
        }
    }

    fn tag(&mut self, tag: &'static str) -> Option<Node<'i>> {
        let start = self.cursor.position();
        self.cursor.consume_tag(tag)?;
        Some(self.leaf(NodeKind::Token, start))
    }

    fn tagged(&mut self, kind: NodeKind, tag: &'static str) -> Option<Node<'i>> {
        let start = self.cursor.position();
        self.cursor.consume_tag(tag)?;
        Some(self.leaf(kind, start))
    }

    fn newline(&mut self) -> Option<Node<'i>> {
        let start = self.cursor.position();
        self.cursor.consume_newline()?;
        Some(self.leaf(NodeKind::Token, start))
    }

    fn strategy(&mut self) -> Option<Node<'i>> {
        let start = self.cursor.position();
        let mut children = vec![self.header()?];
        if self.repeat(Self::rule, &mut children) == 0 {
            return None;
        }
        children.push(self.newline()?);
        self.cursor.consume_whitespace();
        if !self.cursor.is_at_end() {
            self.cursor.fail(Expected::Class("end of input"));
            return None;
        }
        Some(self.node(NodeKind::Strategy, start, children))
    }

    fn header(&mut self) -> Option<Node<'i>> {
        let start = self.cursor.position();
        let mut children = vec![
            self.tag("Initial state:")?,
            self.newline()?,
            self.initial_state()?,
        ];
        self.optional(Self::newline, &mut children);
        children.push(self.initial_condition()?);
        children.push(self.newline()?);
        children.push(self.tagged(NodeKind::Caveat, CAVEAT)?);
        children.push(self.newline()?);
        children.push(self.newline()?);
        children.push(self.intro()?);
        Some(self.node(NodeKind::Header, start, children))
    }

    fn intro(&mut self) -> Option<Node<'i>> {
        self.attempt(|g| g.tagged(NodeKind::Intro, INTRO_WIN))
            .or_else(|| self.attempt(|g| g.tagged(NodeKind::Intro, INTRO_SAFE)))
    }

    fn initial_state(&mut self) -> Option<Node<'i>> {
        let start = self.cursor.position();
        let mut children = self.locations()?;
        children.push(self.named_vars());
        Some(self.node(NodeKind::InitialState, start, children))
    }

    fn initial_condition(&mut self) -> Option<Node<'i>> {
        let start = self.cursor.position();
        let mut children = vec![self.tag("(#")?];
        let guard: Rule<'i> = |g| {
            let start = g.cursor.position();
            g.cursor.consume_whitespace();
            g.cursor.consume_while(is_guard_char);
            Some(g.leaf(NodeKind::Token, start))
        };
        if self.repeat(guard, &mut children) == 0 {
            return None;
        }
        children.push(self.tag(")")?);
        Some(self.node(NodeKind::InitialCondition, start, children))
    }

    fn rule(&mut self) -> Option<Node<'i>> {
        let start = self.cursor.position();
        let mut children = vec![self.newline()?, self.newline()?, self.tag("State:")?];
        self.cursor.consume_whitespace();
        children.push(self.state()?);
        children.push(self.actions()?);
        Some(self.node(NodeKind::Rule, start, children))
    }

    fn state(&mut self) -> Option<Node<'i>> {
        let start = self.cursor.position();
        let mut children = self.locations()?;
        children.push(self.vars());
        Some(self.node(NodeKind::State, start, children))
    }

    /// `"(" location+ ws ") "`, shared by the header and the rules.
    fn locations(&mut self) -> Option<Vec<Node<'i>>> {
        let mut children = vec![self.tag("(")?];
        if self.repeat(Self::location, &mut children) == 0 {
            return None;
        }
        self.cursor.consume_whitespace();
        children.push(self.tag(") ")?);
        Some(children)
    }

    fn location(&mut self) -> Option<Node<'i>> {
        let start = self.cursor.position();
        self.cursor.consume_whitespace();
        self.cursor.consume_while(is_text_char);
        Some(self.leaf(NodeKind::Location, start))
    }

    fn named_vars(&mut self) -> Node<'i> {
        let start = self.cursor.position();
        let mut children = Vec::new();
        self.repeat(Self::named_var_state, &mut children);
        self.node(NodeKind::Vars, start, children)
    }

    fn vars(&mut self) -> Node<'i> {
        let start = self.cursor.position();
        let mut children = Vec::new();
        self.repeat(Self::var_state, &mut children);
        self.node(NodeKind::Vars, start, children)
    }

    fn named_var_state(&mut self) -> Option<Node<'i>> {
        let start = self.cursor.position();
        let children = vec![self.var_name()?, self.tag("=")?, self.int()?];
        self.cursor.consume_whitespace();
        Some(self.node(NodeKind::VarState, start, children))
    }

    fn var_state(&mut self) -> Option<Node<'i>> {
        let start = self.cursor.position();
        let mut children = Vec::new();
        let assignment: Rule<'i> = |g| {
            let start = g.cursor.position();
            let children = vec![g.var_name()?, g.tag("=")?];
            Some(g.node(NodeKind::Token, start, children))
        };
        if let Some(assignment) = self.attempt(assignment) {
            children.extend(assignment.children);
        }
        children.push(self.int()?);
        self.cursor.consume_whitespace();
        Some(self.node(NodeKind::VarState, start, children))
    }

    fn var_name(&mut self) -> Option<Node<'i>> {
        let start = self.cursor.position();
        let qualified: Rule<'i> = |g| {
            let start = g.cursor.position();
            g.cursor.consume_while(is_ident_char);
            g.cursor.consume_tag(".")?;
            g.cursor.consume_while(is_ident_char);
            Some(g.leaf(NodeKind::VarName, start))
        };
        if let Some(node) = self.attempt(qualified) {
            return Some(node);
        }
        self.cursor.consume_while(is_ident_char);
        Some(self.leaf(NodeKind::VarName, start))
    }

    fn int(&mut self) -> Option<Node<'i>> {
        let start = self.cursor.position();
        self.cursor.consume_number()?;
        Some(self.leaf(NodeKind::Int, start))
    }

    fn actions(&mut self) -> Option<Node<'i>> {
        let start = self.cursor.position();
        let mut children = Vec::new();
        let action: Rule<'i> = |g| g.attempt(Self::action_move).or_else(|| g.attempt(Self::delay));
        if self.repeat(action, &mut children) == 0 {
            return None;
        }
        Some(self.node(NodeKind::Actions, start, children))
    }

    fn action_move(&mut self) -> Option<Node<'i>> {
        let start = self.cursor.position();
        let mut children = Vec::new();
        self.optional(Self::newline, &mut children);
        children.push(self.tag("When you are in ")?);
        children.push(self.invariants()?);
        children.push(self.tag(",")?);
        children.push(self.transitions()?);
        Some(self.node(NodeKind::Move, start, children))
    }

    fn delay(&mut self) -> Option<Node<'i>> {
        let start = self.cursor.position();
        let mut children = Vec::new();
        self.optional(Self::newline, &mut children);
        children.push(self.tag("While you are in")?);
        children.push(self.tag("\t")?);
        children.push(self.invariants()?);
        children.push(self.tag(",")?);
        self.cursor.consume_whitespace();
        children.push(self.tag("wait.")?);
        Some(self.node(NodeKind::Delay, start, children))
    }

    fn invariants(&mut self) -> Option<Node<'i>> {
        let start = self.cursor.position();
        let mut children = Vec::new();
        if let Some(node) = self.attempt(|g| g.tagged(NodeKind::Unconditional, "true")) {
            children.push(node);
        } else if self.repeat(Self::invariant, &mut children) == 0 {
            return None;
        }
        Some(self.node(NodeKind::Invariants, start, children))
    }

    fn invariant(&mut self) -> Option<Node<'i>> {
        let start = self.cursor.position();
        let mut children = Vec::new();
        self.optional(|g| g.tag(" || "), &mut children);
        children.push(self.tag("(")?);
        if self.repeat(Self::clause, &mut children) == 0 {
            return None;
        }
        children.push(self.tag(")")?);
        Some(self.node(NodeKind::Invariant, start, children))
    }

    fn clause(&mut self) -> Option<Node<'i>> {
        let start = self.cursor.position();
        let mut children = Vec::new();
        self.optional(|g| g.tag("&&"), &mut children);
        self.cursor.consume_whitespace();
        let text_start = self.cursor.position();
        self.cursor.consume_some(is_clause_char, "clause")?;
        children.push(self.leaf(NodeKind::ClauseText, text_start));
        self.cursor.consume_whitespace();
        Some(self.node(NodeKind::Clause, start, children))
    }

    fn transitions(&mut self) -> Option<Node<'i>> {
        let start = self.cursor.position();
        self.cursor.consume_whitespace();
        let mut children = vec![self.tag("take transition")?];
        self.cursor.consume_whitespace();
        children.push(self.transition()?);
        loop {
            let checkpoint = self.cursor.position();
            let Some(newline) = self.newline() else {
                break;
            };
            let Some(transition) = self.transition() else {
                self.cursor.reset(checkpoint);
                break;
            };
            children.push(newline);
            children.push(transition);
        }
        Some(self.node(NodeKind::Transitions, start, children))
    }

    fn transition(&mut self) -> Option<Node<'i>> {
        let start = self.cursor.position();
        let from = self.cursor.position();
        self.cursor.consume_while(is_text_char);
        let mut children = vec![self.leaf(NodeKind::Start, from), self.tag("->")?];
        let to = self.cursor.position();
        self.cursor.consume_while(is_text_char);
        children.push(self.leaf(NodeKind::End, to));
        children.push(self.conditions()?);
        Some(self.node(NodeKind::Transition, start, children))
    }

    /// The guard, synchronisation and updates of a transition. Accepted and dropped.
    fn conditions(&mut self) -> Option<Node<'i>> {
        let start = self.cursor.position();
        self.cursor.consume_whitespace();
        self.cursor.consume_tag("{")?;
        self.cursor.consume_while(is_condition_char);
        self.cursor.consume_tag("}")?;
        Some(self.leaf(NodeKind::Conditions, start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT: &str = "Initial state:\n\
        ( P.idle Q.idle ) P.x=0 n=2\n\
        (# x<=10 y-x<=3)\n\
        Note: The 'strategy' is not guaranteed to be a strategy.\n\
        \n\
        Strategy to avoid losing:\n\
        \n\
        State: ( P.idle Q.idle ) P.x=0 n=2\n\
        When you are in (x<=5 && y>1) || (x>7), take transition P.idle->P.busy { x >= 1, tau, x := 0 }\n\
        Q.idle->Q.busy { 1, go!, 1 }\n\
        While you are in\ttrue, wait.\n";

    fn kinds(node: &Node<'_>) -> Vec<NodeKind> {
        node.children.iter().map(|child| child.kind).collect()
    }

    fn find<'n, 'i>(node: &'n Node<'i>, kind: NodeKind) -> Vec<&'n Node<'i>> {
        let mut found = Vec::new();
        if node.kind == kind {
            found.push(node);
        }
        for child in &node.children {
            found.extend(find(child, kind));
        }
        found
    }

    #[test]
    fn tree_shape() {
        let tree = parse_tree(INPUT).unwrap();
        assert_eq!(tree.kind, NodeKind::Strategy);
        assert_eq!(
            kinds(&tree),
            vec![NodeKind::Header, NodeKind::Rule, NodeKind::Token]
        );
        let rule = &tree.children[1];
        assert_eq!(
            kinds(rule),
            vec![
                NodeKind::Token,
                NodeKind::Token,
                NodeKind::Token,
                NodeKind::State,
                NodeKind::Actions,
            ]
        );
        assert_eq!(
            kinds(&rule.children[4]),
            vec![NodeKind::Move, NodeKind::Delay]
        );
    }

    #[test]
    fn locations_include_blank_ones() {
        let tree = parse_tree(INPUT).unwrap();
        let state = find(&tree, NodeKind::State)[0];
        let locations = state
            .children_of(NodeKind::Location)
            .map(|location| location.text)
            .collect::<Vec<_>>();
        assert_eq!(locations, vec![" P.idle", " Q.idle", " ", ""]);
    }

    #[test]
    fn var_names_may_be_qualified() {
        let tree = parse_tree(INPUT).unwrap();
        let names = find(&tree, NodeKind::VarName)
            .into_iter()
            .map(|name| name.text)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["P.x", "n", "P.x", "n"]);
    }

    #[test]
    fn transitions_span_lines() {
        let tree = parse_tree(INPUT).unwrap();
        let ends = find(&tree, NodeKind::Transition)
            .into_iter()
            .map(|transition| {
                let start = transition.children_of(NodeKind::Start).next().unwrap();
                let end = transition.children_of(NodeKind::End).next().unwrap();
                (start.text, end.text)
            })
            .collect::<Vec<_>>();
        assert_eq!(ends, vec![("P.idle", "P.busy"), ("Q.idle", "Q.busy")]);
    }

    #[test]
    fn invariant_groups() {
        let tree = parse_tree(INPUT).unwrap();
        let invariants = find(&tree, NodeKind::Invariant);
        assert_eq!(invariants.len(), 2);
        let clauses = find(invariants[0], NodeKind::ClauseText)
            .into_iter()
            .map(|clause| clause.text)
            .collect::<Vec<_>>();
        assert_eq!(clauses, vec!["x<=5", "y>1"]);
        assert_eq!(find(&tree, NodeKind::Unconditional).len(), 1);
    }

    #[test]
    fn underscore_is_part_of_names() {
        let input = INPUT.replace("Q.idle", "Q.idle_2");
        let tree = parse_tree(&input).unwrap();
        let state = find(&tree, NodeKind::State)[0];
        assert!(
            state
                .children_of(NodeKind::Location)
                .any(|location| location.text == " Q.idle_2")
        );
    }

    #[test]
    fn transition_requires_conditions() {
        let input = INPUT.replace(" { 1, go!, 1 }", "");
        assert!(parse_tree(&input).is_err());
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        let input = format!("{INPUT}State:");
        let error = parse_tree(&input).unwrap_err();
        assert!(error.is_syntax());
    }
}
