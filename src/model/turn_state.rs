use std::fmt;

use serde::{Deserialize, Serialize};

/// Turn phase of a player as decided by the server.
///
/// The set is closed on the client side; anything else the server sends is kept
/// verbatim in [`TurnState::Unknown`] so the turn engine can refuse it loudly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TurnState {
    RollingDice,
    ChoosingTrainRide,
    FillingGameReview,
    RollingBonusCard,
    UsingDiceBonuses,
    UsingStreetTaxBonuses,
    UsingMapTaxBonuses,
    UsingMapTaxBonusesAfterTrainRide,
    UsingPrisonBonuses,
    UsingRerollBonuses,
    StealingBonusCard,
    ChoosingBuildingSector,
    EnteringPrison,
    DroppingCardAfterGameDrop,
    DroppingCardAfterInstantRoll,
    DroppingCardAfterPoliceSearch,
    Unknown(String),
}

impl TurnState {
    /// Every state the client knows, in turn order.
    pub const KNOWN: [TurnState; 16] = [
        TurnState::RollingDice,
        TurnState::ChoosingTrainRide,
        TurnState::FillingGameReview,
        TurnState::RollingBonusCard,
        TurnState::UsingDiceBonuses,
        TurnState::UsingStreetTaxBonuses,
        TurnState::UsingMapTaxBonuses,
        TurnState::UsingMapTaxBonusesAfterTrainRide,
        TurnState::UsingPrisonBonuses,
        TurnState::UsingRerollBonuses,
        TurnState::StealingBonusCard,
        TurnState::ChoosingBuildingSector,
        TurnState::EnteringPrison,
        TurnState::DroppingCardAfterGameDrop,
        TurnState::DroppingCardAfterInstantRoll,
        TurnState::DroppingCardAfterPoliceSearch,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            TurnState::RollingDice => "rolling-dice",
            TurnState::ChoosingTrainRide => "choosing-train-ride",
            TurnState::FillingGameReview => "filling-game-review",
            TurnState::RollingBonusCard => "rolling-bonus-card",
            TurnState::UsingDiceBonuses => "using-dice-bonuses",
            TurnState::UsingStreetTaxBonuses => "using-street-tax-bonuses",
            TurnState::UsingMapTaxBonuses => "using-map-tax-bonuses",
            TurnState::UsingMapTaxBonusesAfterTrainRide => "using-map-tax-bonuses-after-train-ride",
            TurnState::UsingPrisonBonuses => "using-prison-bonuses",
            TurnState::UsingRerollBonuses => "using-reroll-bonuses",
            TurnState::StealingBonusCard => "stealing-bonus-card",
            TurnState::ChoosingBuildingSector => "choosing-building-sector",
            TurnState::EnteringPrison => "entering-prison",
            TurnState::DroppingCardAfterGameDrop => "dropping-card-after-game-drop",
            TurnState::DroppingCardAfterInstantRoll => "dropping-card-after-instant-roll",
            TurnState::DroppingCardAfterPoliceSearch => "dropping-card-after-police-search",
            TurnState::Unknown(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, TurnState::Unknown(_))
    }
}

impl From<String> for TurnState {
    fn from(raw: String) -> Self {
        TurnState::KNOWN
            .into_iter()
            .find(|s| s.as_str() == raw)
            .unwrap_or(TurnState::Unknown(raw))
    }
}

impl From<TurnState> for String {
    fn from(state: TurnState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_known_state_parses_back_to_itself() {
        for state in TurnState::KNOWN {
            assert_eq!(TurnState::from(state.as_str().to_string()), state);
        }
    }

    #[test]
    fn unrecognised_string_is_kept_verbatim() {
        let parsed: Option<TurnState> = serde_json::from_str("\"moon-walking\"").unwrap();
        assert_eq!(parsed, Some(TurnState::Unknown("moon-walking".into())));
        assert!(!parsed.unwrap().is_known());
    }

    #[test]
    fn null_is_idle() {
        let parsed: Option<TurnState> = serde_json::from_str("null").unwrap();
        assert_eq!(parsed, None);
        let json = serde_json::to_string(&Some(TurnState::EnteringPrison)).unwrap();
        assert_eq!(json, "\"entering-prison\"");
    }
}
