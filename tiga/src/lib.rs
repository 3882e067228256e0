//! Strategies synthesized for timed automaton games.
//!
//! A controller synthesizer such as *UPPAAL Tiga* answers a timed game with a
//! human-readable strategy. This crate reads that text into a [Strategy], which maps
//! every discrete [State] of the network to the guarded choices of the controller:
//! either [wait](Action::Wait) while an [Invariant] holds, or [move](Action::Move) along
//! some [Transition]s.
//!
//! ```
//! let input = "Initial state:
//! ( A ) x=0
//! (# x<=3)
//! Note: The 'strategy' is not guaranteed to be a strategy.
//!
//! Strategy to win:
//!
//! State: ( A ) x=0
//! While you are in\ttrue, wait.
//! ";
//! let strategy: tiga::Strategy = input.parse().unwrap();
//! assert_eq!(strategy.variables(), ["x"]);
//! ```

pub mod formats;
pub mod strategy;

pub use formats::ParseError;
pub use strategy::{Action, GuardedAction, Invariant, State, Strategy, Transition};
