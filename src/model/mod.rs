//! Player, card and dice data as exchanged with the game server.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod board;
mod turn_state;

pub use board::{Board, RollType, Sector, SectorId, SectorKind, TrainRoute, Vec3};
pub use turn_state::TurnState;

pub type PlayerId = u32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url_handle: String,
    #[serde(default)]
    pub is_online: bool,
    pub sector_id: SectorId,
    #[serde(default)]
    pub total_score: f64,
    #[serde(default)]
    pub bonus_cards: Vec<BonusCard>,
    #[serde(default)]
    pub turn_state: Option<TurnState>,
    #[serde(default)]
    pub building_upgrade_bonus: u32,
    #[serde(default)]
    pub maps_completed: u32,
}

impl Player {
    pub fn owns(&self, bonus_type: &BonusType) -> bool {
        self.bonus_cards.iter().any(|c| &c.bonus_type == bonus_type)
    }

    pub fn card_types(&self) -> impl Iterator<Item = &BonusType> {
        self.bonus_cards.iter().map(|c| &c.bonus_type)
    }

    /// Cards that can change a roll before the move is made.
    pub fn dice_bonuses(&self) -> Vec<BonusType> {
        [BonusType::AdjustRollBy1, BonusType::Choose1Die]
            .into_iter()
            .filter(|t| self.owns(t))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusCard {
    pub bonus_type: BonusType,
    #[serde(alias = "player_id")]
    pub owner: PlayerId,
}

/// How a card is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardFamily {
    /// Played explicitly by the player in a specific turn state.
    Manual,
    /// Applied by the server on its own while scoring.
    Automatic,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BonusType {
    AdjustRollBy1,
    Choose1Die,
    SkipPrisonDay,
    RerollGame,
    EvadeStreetTax,
    EvadeMapTax,
    GameHelpAllowed,
    TaxFreeBuilding,
    ExtraLapBonus,
    /// Card type introduced server-side after this client was built.
    Other(String),
}

impl BonusType {
    /// Every card type that can be rolled or stolen.
    pub const ALL: [BonusType; 9] = [
        BonusType::AdjustRollBy1,
        BonusType::Choose1Die,
        BonusType::SkipPrisonDay,
        BonusType::RerollGame,
        BonusType::EvadeStreetTax,
        BonusType::EvadeMapTax,
        BonusType::GameHelpAllowed,
        BonusType::TaxFreeBuilding,
        BonusType::ExtraLapBonus,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            BonusType::AdjustRollBy1 => "adjust-roll-by1",
            BonusType::Choose1Die => "choose-1-die",
            BonusType::SkipPrisonDay => "skip-prison-day",
            BonusType::RerollGame => "reroll-game",
            BonusType::EvadeStreetTax => "evade-street-tax",
            BonusType::EvadeMapTax => "evade-map-tax",
            BonusType::GameHelpAllowed => "game-help-allowed",
            BonusType::TaxFreeBuilding => "tax-free-building",
            BonusType::ExtraLapBonus => "extra-lap-bonus",
            BonusType::Other(raw) => raw,
        }
    }

    pub fn family(&self) -> CardFamily {
        match self {
            BonusType::AdjustRollBy1
            | BonusType::Choose1Die
            | BonusType::SkipPrisonDay
            | BonusType::RerollGame
            | BonusType::EvadeStreetTax
            | BonusType::EvadeMapTax => CardFamily::Manual,
            BonusType::GameHelpAllowed
            | BonusType::TaxFreeBuilding
            | BonusType::ExtraLapBonus
            | BonusType::Other(_) => CardFamily::Automatic,
        }
    }
}

impl From<String> for BonusType {
    fn from(raw: String) -> Self {
        BonusType::ALL
            .into_iter()
            .find(|t| t.as_str() == raw)
            .unwrap_or(BonusType::Other(raw))
    }
}

impl From<BonusType> for String {
    fn from(t: BonusType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for BonusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cards that take effect the moment they are rolled and are never kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstantCardType {
    #[serde(rename = "lose-card-or-3-percent")]
    LoseCardOr3Percent,
    #[serde(rename = "receive-1-percent-from-all")]
    Receive1PercentFromAll,
    RerollAndRoll,
    PoliceSearch,
}

impl InstantCardType {
    pub const ALL: [InstantCardType; 4] = [
        InstantCardType::LoseCardOr3Percent,
        InstantCardType::Receive1PercentFromAll,
        InstantCardType::RerollAndRoll,
        InstantCardType::PoliceSearch,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiceRoll {
    pub roll_id: String,
    pub data: [u8; 2],
    #[serde(default)]
    pub is_random_org_result: bool,
    #[serde(default)]
    pub random_org_check_form: Option<String>,
    #[serde(default)]
    pub random_org_fail_reason: Option<String>,
}

/// Where the dice values came from, shown to every player next to the roll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    RandomOrg { check_form: Option<String> },
    LocalFallback { reason: String },
}

impl DiceRoll {
    pub fn total(&self) -> u32 {
        self.data.iter().map(|&d| u32::from(d)).sum()
    }

    pub fn provenance(&self) -> Provenance {
        if self.is_random_org_result {
            Provenance::RandomOrg { check_form: self.random_org_check_form.clone() }
        } else {
            Provenance::LocalFallback {
                reason: self
                    .random_org_fail_reason
                    .clone()
                    .unwrap_or_else(|| "random.org unavailable".to_string()),
            }
        }
    }

    /// Number of sectors the token walks after the dice bonuses are applied.
    pub fn steps(&self, selected_die: Option<DieChoice>, adjust_by_1: Option<i8>) -> u32 {
        let base = match selected_die {
            Some(DieChoice::First) => u32::from(self.data[0]),
            Some(DieChoice::Second) => u32::from(self.data[1]),
            None => self.total(),
        };
        let adjusted = i64::from(base) + i64::from(adjust_by_1.unwrap_or(0));
        adjusted.max(0) as u32
    }
}

/// Which die counts when a `choose-1-die` card is played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DieChoice {
    First,
    Second,
}

impl DieChoice {
    /// 1-based die number as the server expects it.
    pub fn number(self) -> u8 {
        match self {
            DieChoice::First => 1,
            DieChoice::Second => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roll(a: u8, b: u8) -> DiceRoll {
        DiceRoll {
            roll_id: "r1".into(),
            data: [a, b],
            is_random_org_result: false,
            random_org_check_form: None,
            random_org_fail_reason: Some("quota exceeded".into()),
        }
    }

    #[test]
    fn player_parses_with_owner_alias_and_unknown_card() {
        let json = r#"{
            "id": 3, "name": "Mira", "sector_id": 12, "total_score": 41.5,
            "bonus_cards": [
                {"bonus_type": "evade-map-tax", "player_id": 3},
                {"bonus_type": "brand-new-card", "player_id": 3}
            ],
            "turn_state": "rolling-dice", "maps_completed": 1
        }"#;
        let player: Player = serde_json::from_str(json).unwrap();
        assert!(player.owns(&BonusType::EvadeMapTax));
        assert_eq!(player.bonus_cards[1].bonus_type, BonusType::Other("brand-new-card".into()));
        assert_eq!(player.bonus_cards[1].bonus_type.family(), CardFamily::Automatic);
        assert_eq!(player.turn_state, Some(TurnState::RollingDice));
        assert_eq!(player.building_upgrade_bonus, 0);
    }

    #[test]
    fn steps_apply_die_choice_and_adjustment() {
        let r = roll(3, 5);
        assert_eq!(r.steps(None, None), 8);
        assert_eq!(r.steps(Some(DieChoice::First), Some(1)), 4);
        assert_eq!(r.steps(Some(DieChoice::Second), Some(-1)), 4);
        assert_eq!(roll(1, 1).steps(Some(DieChoice::First), Some(-1)), 0);
    }

    #[test]
    fn provenance_reports_fallback_reason() {
        assert_eq!(
            roll(1, 2).provenance(),
            Provenance::LocalFallback { reason: "quota exceeded".into() }
        );
        let mut verified = roll(1, 2);
        verified.is_random_org_result = true;
        assert!(matches!(verified.provenance(), Provenance::RandomOrg { .. }));
    }

    #[test]
    fn instant_cards_use_server_names() {
        let json = serde_json::to_string(&InstantCardType::LoseCardOr3Percent).unwrap();
        assert_eq!(json, "\"lose-card-or-3-percent\"");
        let json = serde_json::to_string(&InstantCardType::PoliceSearch).unwrap();
        assert_eq!(json, "\"police-search\"");
    }
}
