//! The textual strategies printed by *UPPAAL Tiga*.
//!
//! Tiga [^1] describes a winning (or non-losing) strategy of a timed game as a header with
//! the initial symbolic state followed by one rule per discrete state:
//!
//! ```text
//! Initial state:
//! ( P.idle Q.idle ) P.x=0 n=0
//! (# x<=10)
//! Note: The 'strategy' is not guaranteed to be a strategy.
//!
//! Strategy to win:
//!
//! State: ( P.idle Q.idle ) P.x=0 n=0
//! When you are in (x<=5), take transition P.idle->P.busy { x >= 1, tau, x := 0 }
//! While you are in	(x>5), wait.
//! ```
//!
//! Parsing happens in two passes. The [grammar] turns the text into a concrete parse
//! tree, and the builder reduces that tree bottom-up into a [Strategy].
//!
//! [^1]: [G. Behrmann, A. Cougnard, A. David, E. Fleury, K. G. Larsen, and D. Lime.
//! "UPPAAL-Tiga: Time for Playing Games!"
//! Computer Aided Verification (CAV'07).
//! Springer, 2007.](https://doi.org/10.1007/978-3-540-73368-3_14)

use std::collections::HashMap;

use log::debug;

use crate::strategy::{GuardedAction, State, Strategy};

use super::ParseError;

mod builder;
pub mod grammar;

use builder::Builder;

/// Accumulates a strategy while a parse tree is reduced.
///
/// Consumed by [ParserContext::parse], so no state can leak from one input into another.
#[derive(Debug, Default)]
pub struct ParserContext {
    variables: Vec<String>,
    rules: HashMap<State, Vec<GuardedAction>>,
}

impl ParserContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(mut self, input: &str) -> Result<Strategy, ParseError> {
        let tree = grammar::parse_tree(input)?;
        Builder::new(&mut self).walk(&tree)?;
        debug!(
            "Parsed strategy with {} rules over {} variables.",
            self.rules.len(),
            self.variables.len()
        );
        Ok(self.finish())
    }

    fn finish(self) -> Strategy {
        Strategy::new(self.variables, self.rules)
    }
}

/// Parses a strategy printed by Tiga.
///
/// A rule whose state lists a different number of values than the initial state declares
/// variables is kept as printed. Only a warning is logged, so [State::values] may then be
/// shorter or longer than [Strategy::variables].
///
/// # Errors
///
/// [ParseError::Syntax] if the input does not follow the grammar, and
/// [ParseError::IntegerRange] if a value does not fit into an `i64`.
pub fn parse(input: &str) -> Result<Strategy, ParseError> {
    ParserContext::new().parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{Action, Invariant, Transition};

    const EXAMPLE: &str = "Initial state:\n\
        (Loc1 Loc2 ) x=0 y=0\n\
        (# x<=10 y<=10)\n\
        Note: The 'strategy' is not guaranteed to be a strategy.\n\
        \n\
        Strategy to win:\n\
        \n\
        State: (Loc1 Loc2 ) 0 0\n\
        When you are in (x<=5),take transition Loc1->Loc3 {x>=1}\n\
        While you are in\t(x>5),wait.\n";

    #[test]
    fn example() {
        let strategy = parse(EXAMPLE).unwrap();
        assert_eq!(strategy.variables(), ["x", "y"]);
        assert_eq!(strategy.len(), 1);
        let state = State::new(["Loc1", "Loc2"], [0, 0]);
        assert_eq!(
            strategy.get(&state).unwrap(),
            [
                GuardedAction::new(
                    Invariant::new(["x<=5"]),
                    Action::Move(vec![Transition::new("Loc1", "Loc3")]),
                ),
                GuardedAction::new(Invariant::new(["x>5"]), Action::Wait),
            ]
        );
    }

    #[test]
    fn context_is_consumed() {
        let first = ParserContext::new().parse(EXAMPLE).unwrap();
        let second = ParserContext::new().parse(EXAMPLE).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_header_is_a_syntax_error() {
        let input = EXAMPLE.replacen("Initial state:\n", "", 1);
        let error = parse(&input).unwrap_err();
        assert_eq!(
            error,
            ParseError::Syntax {
                offset: 0,
                line: 1,
                column: 1,
                expected: "\"Initial state:\"".to_owned(),
            }
        );
    }
}
