//! Turn state machine.
//!
//! [`select_surface`] maps the server's turn state to the one interactive
//! surface the player may use; [`TurnMachine`] owns the operations behind
//! those surfaces and the protocol for advancing the turn.
//!
//! # Surfaces
//!
//! | turn state                              | surface                                   |
//! |-----------------------------------------|-------------------------------------------|
//! | `null` or token moving                  | [`Surface::Hidden`]                       |
//! | `rolling-dice`                          | [`Surface::RollDiceButton`]               |
//! | `choosing-train-ride`                   | train dialog, or [`Surface::NoTrainHere`] |
//! | `filling-game-review`                   | [`Surface::GameReviewForm`]               |
//! | `rolling-bonus-card`                    | card roller or [`Surface::NothingToRoll`] |
//! | `using-dice-bonuses`                    | [`Surface::DiceBonusDialog`]              |
//! | `using-*-tax-bonuses*`                  | [`Surface::TaxBonusDialog`]               |
//! | `using-prison-bonuses`                  | [`Surface::PrisonBonusDialog`]            |
//! | `using-reroll-bonuses`                  | [`Surface::RerollBonusDialog`]            |
//! | `stealing-bonus-card`                   | card roller or [`Surface::NothingToRoll`] |
//! | `choosing-building-sector`              | [`Surface::BuildingSectorPicker`]         |
//! | `entering-prison`                       | [`Surface::EnterPrisonDialog`]            |
//! | `dropping-card-after-*`                 | card roller or a no-cards fallback        |
//!
//! Any other state is a contract violation and surfaces as
//! [`ClientError::UnknownTurnState`].

use crate::cards::{lose_pool, receive_pool, steal_pool, Candidate};
use crate::error::ClientError;
use crate::model::{BonusType, Board, DiceRoll, Player, RollType, SectorId, TrainRoute, TurnState};

mod machine;

pub use machine::{ActionOutcome, DiceBonusChoice, GameReview, TurnMachine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoseReason {
    GameDrop,
    InstantRoll,
    PoliceSearch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollPurpose {
    NewCard,
    Steal,
    Lose(LoseReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxKind {
    Street,
    Map,
    MapAfterTrainRide,
}

impl TaxKind {
    pub fn evading_card(self) -> BonusType {
        match self {
            TaxKind::Street => BonusType::EvadeStreetTax,
            TaxKind::Map | TaxKind::MapAfterTrainRide => BonusType::EvadeMapTax,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Surface {
    Hidden,
    RollDiceButton,
    TrainRideDialog { route: TrainRoute },
    /// Asked about a train on a sector without a route; only "continue".
    NoTrainHere,
    GameReviewForm { roll_type: RollType },
    CardRoller { purpose: RollPurpose, candidates: Vec<Candidate> },
    /// Empty pool: "nothing to roll, continue".
    NothingToRoll { purpose: RollPurpose },
    /// Asked to lose a card with none owned after an instant card: pay score instead.
    LoseScoreInstead,
    DiceBonusDialog { roll: Option<DiceRoll>, cards: Vec<BonusType> },
    TaxBonusDialog { tax: TaxKind, card_available: bool },
    PrisonBonusDialog { card_available: bool },
    RerollBonusDialog { card_available: bool },
    BuildingSectorPicker { options: Vec<SectorId> },
    EnterPrisonDialog,
}

/// Everything surface selection looks at.
pub struct SurfaceContext<'a> {
    pub me: &'a Player,
    pub players: &'a [Player],
    pub board: &'a Board,
    pub moving: bool,
    pub pending_roll: Option<&'a DiceRoll>,
}

pub fn lose_reason(state: &TurnState) -> Option<LoseReason> {
    match state {
        TurnState::DroppingCardAfterGameDrop => Some(LoseReason::GameDrop),
        TurnState::DroppingCardAfterInstantRoll => Some(LoseReason::InstantRoll),
        TurnState::DroppingCardAfterPoliceSearch => Some(LoseReason::PoliceSearch),
        _ => None,
    }
}

pub fn tax_kind(state: &TurnState) -> Option<TaxKind> {
    match state {
        TurnState::UsingStreetTaxBonuses => Some(TaxKind::Street),
        TurnState::UsingMapTaxBonuses => Some(TaxKind::Map),
        TurnState::UsingMapTaxBonusesAfterTrainRide => Some(TaxKind::MapAfterTrainRide),
        _ => None,
    }
}

fn roller(purpose: RollPurpose, candidates: Vec<Candidate>) -> Surface {
    if candidates.is_empty() {
        match purpose {
            RollPurpose::Lose(LoseReason::InstantRoll) => Surface::LoseScoreInstead,
            _ => Surface::NothingToRoll { purpose },
        }
    } else {
        Surface::CardRoller { purpose, candidates }
    }
}

/// Pick the single surface for the current turn state.
pub fn select_surface(ctx: &SurfaceContext<'_>) -> Result<Surface, ClientError> {
    if ctx.moving {
        return Ok(Surface::Hidden);
    }
    let Some(state) = ctx.me.turn_state.as_ref() else {
        return Ok(Surface::Hidden);
    };
    let me = ctx.me;
    let surface = match state {
        TurnState::RollingDice => Surface::RollDiceButton,
        TurnState::ChoosingTrainRide => match ctx.board.train_route(me.sector_id) {
            Some(route) => Surface::TrainRideDialog { route },
            None => Surface::NoTrainHere,
        },
        TurnState::FillingGameReview => Surface::GameReviewForm {
            roll_type: ctx.board.sector(me.sector_id).map(|s| s.roll_type).unwrap_or(RollType::Regular),
        },
        TurnState::RollingBonusCard => roller(RollPurpose::NewCard, receive_pool(me)),
        TurnState::UsingDiceBonuses => Surface::DiceBonusDialog {
            roll: ctx.pending_roll.cloned(),
            cards: me.dice_bonuses(),
        },
        TurnState::UsingStreetTaxBonuses
        | TurnState::UsingMapTaxBonuses
        | TurnState::UsingMapTaxBonusesAfterTrainRide => {
            let tax = tax_kind(state).unwrap_or(TaxKind::Street);
            Surface::TaxBonusDialog { tax, card_available: me.owns(&tax.evading_card()) }
        }
        TurnState::UsingPrisonBonuses => Surface::PrisonBonusDialog {
            card_available: me.owns(&BonusType::SkipPrisonDay),
        },
        TurnState::UsingRerollBonuses => Surface::RerollBonusDialog {
            card_available: me.owns(&BonusType::RerollGame),
        },
        TurnState::StealingBonusCard => roller(RollPurpose::Steal, steal_pool(me, ctx.players)),
        TurnState::ChoosingBuildingSector => Surface::BuildingSectorPicker {
            options: ctx.board.building_sectors().map(|s| s.id).collect(),
        },
        TurnState::EnteringPrison => Surface::EnterPrisonDialog,
        TurnState::DroppingCardAfterGameDrop
        | TurnState::DroppingCardAfterInstantRoll
        | TurnState::DroppingCardAfterPoliceSearch => {
            let reason = lose_reason(state).unwrap_or(LoseReason::PoliceSearch);
            roller(RollPurpose::Lose(reason), lose_pool(me))
        }
        TurnState::Unknown(raw) => return Err(ClientError::UnknownTurnState(raw.clone())),
    };
    Ok(surface)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::player;

    fn surface_for(state: Option<TurnState>, me: Player, players: &[Player], moving: bool) -> Result<Surface, ClientError> {
        let board = Board::classic();
        let me = Player { turn_state: state, ..me };
        select_surface(&SurfaceContext { me: &me, players, board: &board, moving, pending_roll: None })
    }

    #[test]
    fn every_known_state_has_a_visible_surface() {
        let me = player(1, 6, &[BonusType::EvadeMapTax]);
        let others = vec![player(2, 3, &[BonusType::RerollGame])];
        for state in TurnState::KNOWN {
            let surface = surface_for(Some(state.clone()), me.clone(), &others, false).unwrap();
            assert_ne!(surface, Surface::Hidden, "{state} rendered nothing");
        }
    }

    #[test]
    fn idle_renders_nothing() {
        assert_eq!(surface_for(None, player(1, 1, &[]), &[], false).unwrap(), Surface::Hidden);
    }

    #[test]
    fn unknown_state_is_fatal() {
        let err = surface_for(Some(TurnState::Unknown("time-travel".into())), player(1, 1, &[]), &[], false).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, ClientError::UnknownTurnState(raw) if raw == "time-travel"));
    }

    #[test]
    fn moving_hides_every_surface() {
        for state in TurnState::KNOWN {
            assert_eq!(surface_for(Some(state), player(1, 6, &[]), &[], true).unwrap(), Surface::Hidden);
        }
    }

    #[test]
    fn empty_pools_fall_back() {
        let me = player(1, 4, &[]);
        assert_eq!(
            surface_for(Some(TurnState::DroppingCardAfterGameDrop), me.clone(), &[], false).unwrap(),
            Surface::NothingToRoll { purpose: RollPurpose::Lose(LoseReason::GameDrop) }
        );
        assert_eq!(
            surface_for(Some(TurnState::DroppingCardAfterInstantRoll), me.clone(), &[], false).unwrap(),
            Surface::LoseScoreInstead
        );
        assert_eq!(
            surface_for(Some(TurnState::StealingBonusCard), me, &[player(2, 1, &[])], false).unwrap(),
            Surface::NothingToRoll { purpose: RollPurpose::Steal }
        );
    }

    #[test]
    fn train_dialog_needs_a_route() {
        let on_rail = surface_for(Some(TurnState::ChoosingTrainRide), player(1, 6, &[]), &[], false).unwrap();
        assert_eq!(on_rail, Surface::TrainRideDialog { route: TrainRoute { from: 6, to: 16 } });
        let off_rail = surface_for(Some(TurnState::ChoosingTrainRide), player(1, 7, &[]), &[], false).unwrap();
        assert_eq!(off_rail, Surface::NoTrainHere);
    }

    #[test]
    fn tax_dialog_reports_card() {
        let s = surface_for(Some(TurnState::UsingMapTaxBonusesAfterTrainRide), player(1, 16, &[BonusType::EvadeMapTax]), &[], false).unwrap();
        assert_eq!(s, Surface::TaxBonusDialog { tax: TaxKind::MapAfterTrainRide, card_available: true });
        let s = surface_for(Some(TurnState::UsingStreetTaxBonuses), player(1, 16, &[BonusType::EvadeMapTax]), &[], false).unwrap();
        assert_eq!(s, Surface::TaxBonusDialog { tax: TaxKind::Street, card_available: false });
    }
}
