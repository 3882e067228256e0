use std::fmt::Display;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Model {
    TwoClocks,
    TrainGate,
    Robot,
}

impl Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Model::TwoClocks => Ok(write!(f, "two-clocks")?),
            Model::TrainGate => Ok(write!(f, "train-gate")?),
            Model::Robot => Ok(write!(f, "robot")?),
        }
    }
}

impl Model {
    /// The strategy as Tiga prints it.
    pub fn source(self) -> &'static str {
        match self {
            Model::TwoClocks => TWO_CLOCKS,
            Model::TrainGate => TRAIN_GATE,
            Model::Robot => ROBOT,
        }
    }
}

const TWO_CLOCKS: &str = "Initial state:\n\
    (Loc1 Loc2 ) x=0 y=0\n\
    (# x<=10 y<=10)\n\
    Note: The 'strategy' is not guaranteed to be a strategy.\n\
    \n\
    Strategy to win:\n\
    \n\
    State: (Loc1 Loc2 ) 0 0\n\
    When you are in (x<=5),take transition Loc1->Loc3 {x>=1}\n\
    While you are in\t(x>5),wait.\n";

const TRAIN_GATE: &str = "Initial state:\n\
    ( Train.far Gate.open ) Gate.len=0 Train.id=1\n\
    (# x<=10 y<=5 y-x<=3)\n\
    Note: The 'strategy' is not guaranteed to be a strategy.\n\
    \n\
    Strategy to win:\n\
    \n\
    State: ( Train.far Gate.open ) Gate.len=0 Train.id=1\n\
    When you are in (x<=5 && y<=3) || (x>7), take transition Train.far->Train.near { x >= 2, appr!, x := 0 }\n\
    Gate.open->Gate.closing { 1, appr?, y := 0 }\n\
    While you are in\t(x>5 && x<=7), wait.\n\
    \n\
    State: ( Train.near Gate.closing ) Gate.len=1 Train.id=1\n\
    When you are in (y>=1), take transition Gate.closing->Gate.closed { y >= 1, tau, 1 }\n\
    While you are in\t(y<1), wait.\n\
    \n\
    State: ( Train.near Gate.closed ) Gate.len=1 Train.id=1\n\
    While you are in\ttrue, wait.\n";

const ROBOT: &str = "Initial state:\n\
    ( Robot.start Door.closed ) \n\
    (# t<=0)\n\
    Note: The 'strategy' is not guaranteed to be a strategy.\n\
    \n\
    Strategy to avoid losing:\n\
    \n\
    State: ( Robot.start Door.closed ) \n\
    When you are in true, take transition Robot.start->Robot.moving { t >= 0, tau, t := 0 }\n\
    \n\
    State: ( Robot.moving Door.closed ) \n\
    When you are in (t>=4), take transition Door.closed->Door.open { 1, open!, 1 }\n\
    Robot.moving->Robot.waiting { 1, open?, t := 0 }\n\
    While you are in\t(t<4), wait.\n";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_parse() {
        for model in Model::value_variants() {
            let strategy = tiga::formats::tiga::parse(model.source())
                .unwrap_or_else(|err| panic!("{model}: {err}"));
            assert!(!strategy.is_empty(), "{model}");
        }
    }

    #[test]
    fn train_gate() {
        let strategy = tiga::formats::tiga::parse(Model::TrainGate.source()).unwrap();
        assert_eq!(strategy.variables(), ["Gate.len", "Train.id"]);
        assert_eq!(strategy.len(), 3);
        assert_eq!(strategy.transitions().len(), 3);
    }
}
