//! Server API contract consumed by the turn engine.
//!
//! The backend owns every rule; this module only describes the calls the
//! client makes and the shapes it gets back. [`GameApi`] is the seam: the
//! console binary plugs in [`HttpApi`], tests plug in scripted fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::model::{BonusType, DiceRoll, InstantCardType, Player, PlayerId, SectorId};

mod http;

pub use http::HttpApi;

#[async_trait]
pub trait GameApi: Send + Sync {
    /// `POST /dice/roll`
    async fn roll_dice(&self) -> Result<DiceRoll, ApiError>;
    /// `POST /players/current/moves`
    async fn make_move(&self, req: &MoveRequest) -> Result<MoveResponse, ApiError>;
    /// `POST /players/current/turn-state`
    async fn set_next_turn_state(&self, req: &NextTurnStateRequest) -> Result<(), ApiError>;
    /// `POST /bonus-cards`
    async fn receive_bonus_card(&self, req: &CardRequest) -> Result<(), ApiError>;
    /// `POST /bonus-cards/use`
    async fn use_bonus_card(&self, req: &CardRequest) -> Result<(), ApiError>;
    /// `POST /bonus-cards/steal`
    async fn steal_bonus_card(&self, req: &StealCardRequest) -> Result<(), ApiError>;
    /// `POST /bonus-cards/lose`
    async fn lose_bonus_card(&self, req: &LoseCardRequest) -> Result<(), ApiError>;
    /// `POST /bonus-cards/instant`
    async fn activate_instant_card(&self, req: &InstantCardRequest) -> Result<InstantCardResponse, ApiError>;
    /// `POST /games`
    async fn submit_game_review(&self, req: &GameReviewRequest) -> Result<(), ApiError>;
    /// `GET /players`
    async fn fetch_players(&self) -> Result<Vec<Player>, ApiError>;
    /// `GET /players/current`
    async fn fetch_current_player(&self) -> Result<Player, ApiError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MoveKind {
    DiceRoll,
    TrainRide,
    DropToPrison,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRequest {
    #[serde(rename = "type")]
    pub kind: MoveKind,
    pub selected_die: Option<u8>,
    pub adjust_by_1: Option<i8>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ride_train: Option<bool>,
}

impl MoveRequest {
    pub fn dice_roll(selected_die: Option<u8>, adjust_by_1: Option<i8>) -> Self {
        Self { kind: MoveKind::DiceRoll, selected_die, adjust_by_1, ride_train: None }
    }

    pub fn train_ride(ride: bool) -> Self {
        Self { kind: MoveKind::TrainRide, selected_die: None, adjust_by_1: None, ride_train: Some(ride) }
    }

    pub fn drop_to_prison() -> Self {
        Self { kind: MoveKind::DropToPrison, selected_die: None, adjust_by_1: None, ride_train: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveResponse {
    pub new_sector_id: SectorId,
    #[serde(default)]
    pub map_completed: bool,
}

/// Completion tag attached to a turn-state advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TurnAction {
    SkipBonus,
    DropGame,
    RerollGame,
    SkipPrison,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NextTurnStateRequest {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub action: Option<TurnAction>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sector_id: Option<SectorId>,
    /// The caller refetches the player itself; never sent to the server.
    #[serde(skip)]
    pub skip_update: bool,
}

impl NextTurnStateRequest {
    pub fn advance() -> Self {
        Self::default()
    }

    pub fn with_action(action: TurnAction) -> Self {
        Self { action: Some(action), ..Self::default() }
    }

    pub fn to_sector(sector_id: SectorId) -> Self {
        Self { sector_id: Some(sector_id), ..Self::default() }
    }

    pub fn skip_update(mut self) -> Self {
        self.skip_update = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardRequest {
    pub bonus_type: BonusType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StealCardRequest {
    pub from_player: PlayerId,
    pub bonus_type: BonusType,
}

/// `bonus_type: None` asks the server to take score instead of a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoseCardRequest {
    pub bonus_type: Option<BonusType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstantCardRequest {
    pub card_type: InstantCardType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstantOutcome {
    CardLost,
    ScoreChange,
    Reroll,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstantCardResponse {
    pub result: InstantOutcome,
    #[serde(default)]
    pub score_change: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameOutcome {
    Completed,
    Drop,
    Reroll,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameReviewRequest {
    pub title: String,
    pub review: String,
    pub rating: f32,
    pub status: GameOutcome,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub duration_secs: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn move_request_wire_shape() {
        let body = serde_json::to_value(MoveRequest::dice_roll(Some(2), Some(-1))).unwrap();
        assert_eq!(body, json!({"type": "dice-roll", "selected_die": 2, "adjust_by_1": -1}));
        let body = serde_json::to_value(MoveRequest::train_ride(true)).unwrap();
        assert_eq!(body["type"], "train-ride");
        assert_eq!(body["ride_train"], true);
    }

    #[test]
    fn skip_update_stays_on_the_client() {
        let req = NextTurnStateRequest::with_action(TurnAction::SkipPrison).skip_update();
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body, json!({"action": "skip-prison"}));
        assert!(req.skip_update);
    }

    #[test]
    fn lose_score_instead_sends_null_card() {
        let body = serde_json::to_value(LoseCardRequest { bonus_type: None }).unwrap();
        assert_eq!(body, json!({"bonus_type": null}));
    }
}
