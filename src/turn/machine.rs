use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, field, info, instrument, Span};

use super::{lose_reason, select_surface, tax_kind, LoseReason, Surface, SurfaceContext};
use crate::api::{
    GameApi, GameOutcome, GameReviewRequest, InstantCardResponse, MoveRequest, MoveResponse, NextTurnStateRequest,
    TurnAction,
};
use crate::cards::{lose_pool, receive_pool, steal_pool, Candidate, CandidateKind, CardFlow};
use crate::config::Timings;
use crate::dice::DiceCoordinator;
use crate::error::ClientError;
use crate::events::{ClientEvent, EventSink, ReelItem};
use crate::model::{BonusType, Board, DiceRoll, DieChoice, Player, SectorId, TurnState};
use crate::movement::{MoveReport, MovementOrchestrator};
use crate::notify::Notifier;
use crate::store::{ActionKind, ActionLock, PlayerStore};
use crate::util::id::new_action_id;

/// Choices made in the dice-bonus dialog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiceBonusChoice {
    pub selected_die: Option<DieChoice>,
    /// `+1` or `-1`.
    pub adjust_by_1: Option<i8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameReview {
    pub title: String,
    pub review: String,
    pub rating: f32,
    pub outcome: GameOutcome,
    pub duration_secs: Option<u32>,
}

/// What a finished turn action did.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Moved(MoveReport),
    /// Roll held for the dice-bonus dialog; nothing moved yet.
    AwaitingDiceBonus(DiceRoll),
    CardResolved(CandidateKind),
    InstantResolved(InstantCardResponse),
    Advanced,
}

/// Owns every turn action and the order its steps run in.
///
/// Each action: check the turn state, take the store lock, await the server
/// mutation, await the animation, advance the turn, refetch the current
/// player, release the lock. Network errors become a toast and are returned.
pub struct TurnMachine {
    api: Arc<dyn GameApi>,
    store: PlayerStore,
    board: Arc<Board>,
    dice: DiceCoordinator,
    mover: MovementOrchestrator,
    cards: CardFlow,
    notifier: Notifier,
    events: EventSink,
    pending_roll: Mutex<Option<DiceRoll>>,
}

impl TurnMachine {
    pub fn new(api: Arc<dyn GameApi>, store: PlayerStore, board: Arc<Board>, timings: Timings, events: EventSink) -> Self {
        let notifier = Notifier::new(events.clone(), timings.error_toast);
        Self {
            dice: DiceCoordinator::new(Arc::clone(&api), timings.clone(), events.clone(), notifier.clone()),
            mover: MovementOrchestrator::new(Arc::clone(&board), timings.clone(), events.clone()),
            cards: CardFlow::new(Arc::clone(&api), store.clone(), timings, events.clone()),
            api,
            store,
            board,
            notifier,
            events,
            pending_roll: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &PlayerStore {
        &self.store
    }

    pub fn mover(&self) -> &MovementOrchestrator {
        &self.mover
    }

    pub fn dice(&self) -> &DiceCoordinator {
        &self.dice
    }

    pub fn cards(&self) -> &CardFlow {
        &self.cards
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn pending_roll(&self) -> Option<DiceRoll> {
        self.pending_roll.lock().clone()
    }

    /// Initial sync: load the current player and every token position.
    pub async fn load(&self) -> Result<Player, ClientError> {
        let me = self.api.fetch_current_player().await?;
        self.store.load_current(me.clone());
        if let Some(ticket) = self.store.poll_ticket() {
            let players = self.api.fetch_players().await?;
            self.store.apply_players(players, ticket);
        }
        for p in self.store.players() {
            self.mover.place(p.id, p.sector_id);
        }
        Ok(me)
    }

    /// The single surface the player can interact with right now.
    pub fn surface(&self) -> Result<Surface, ClientError> {
        let me = self.store.me().ok_or(ClientError::PlayerNotLoaded)?;
        let players = self.store.players();
        let pending = self.pending_roll();
        select_surface(&SurfaceContext {
            me: &me,
            players: &players,
            board: &self.board,
            moving: self.store.is_player_moving(),
            pending_roll: pending.as_ref(),
        })
    }

    // ── entry checks ────────────────────────────────────────────────

    fn expect_state(&self, action: &'static str, allowed: &[TurnState]) -> Result<(Player, TurnState), ClientError> {
        if self.store.refetch_suppressed() {
            return Err(ClientError::ActionInFlight);
        }
        let me = self.store.me().ok_or(ClientError::PlayerNotLoaded)?;
        match me.turn_state.clone() {
            Some(TurnState::Unknown(raw)) => Err(ClientError::UnknownTurnState(raw)),
            Some(state) if allowed.contains(&state) => Ok((me, state)),
            state => Err(ClientError::WrongTurnState { action, state }),
        }
    }

    /// Release the lock and surface a transient error as a toast.
    fn finish<T>(&self, lock: ActionLock, result: Result<T, ClientError>) -> Result<T, ClientError> {
        lock.release();
        match &result {
            Ok(_) => debug!("turn action finished"),
            Err(ClientError::Api(err)) => {
                self.notifier.error(err.user_message());
            }
            Err(err) => debug!(error = %err, "turn action failed"),
        }
        result
    }

    // ── shared steps ────────────────────────────────────────────────

    async fn refresh_me(&self) -> Result<Player, ClientError> {
        let me = self.api.fetch_current_player().await?;
        debug!(turn_state = ?me.turn_state, sector = me.sector_id, "current player refreshed");
        self.store.load_current(me.clone());
        Ok(me)
    }

    async fn advance(&self, req: NextTurnStateRequest) -> Result<(), ClientError> {
        self.api.set_next_turn_state(&req).await?;
        if !req.skip_update {
            self.refresh_me().await?;
        }
        Ok(())
    }

    fn record_move(&self, player: &Player, resp: &MoveResponse) {
        self.store.set_sector(resp.new_sector_id);
        if resp.map_completed {
            info!(player = player.id, "map completed");
            self.events.emit(ClientEvent::MapCompleted { player: player.id });
        }
    }

    async fn move_after_roll(&self, me: &Player, roll: Option<&DiceRoll>, choice: DiceBonusChoice) -> Result<MoveReport, ClientError> {
        let req = MoveRequest::dice_roll(choice.selected_die.map(DieChoice::number), choice.adjust_by_1);
        let resp = self.api.make_move(&req).await?;
        let steps = match roll {
            Some(r) => r.steps(choice.selected_die, choice.adjust_by_1),
            None => self.board.distance(me.sector_id, resp.new_sector_id),
        };
        let report = self.mover.walk(me.id, me.sector_id, steps, resp.new_sector_id).await;
        self.record_move(me, &resp);
        Ok(report)
    }

    async fn drop_to_prison(&self, me: &Player) -> Result<MoveReport, ClientError> {
        let resp = self.api.make_move(&MoveRequest::drop_to_prison()).await?;
        let report = self.mover.relocate(me.id, me.sector_id, resp.new_sector_id).await;
        self.record_move(me, &resp);
        Ok(report)
    }

    // ── actions ─────────────────────────────────────────────────────

    /// `rolling-dice`: roll, then either move or hold the roll for the dice-bonus dialog.
    #[instrument(skip(self), fields(action = %new_action_id(), player = field::Empty))]
    pub async fn roll_dice(&self) -> Result<ActionOutcome, ClientError> {
        let (me, _) = self.expect_state("roll dice", &[TurnState::RollingDice])?;
        Span::current().record("player", me.id);
        let lock = self.store.begin_action(ActionKind::Move)?;
        let result = async {
            let roll = self.dice.roll(me.id).await?;
            if !me.dice_bonuses().is_empty() {
                *self.pending_roll.lock() = Some(roll.clone());
                self.advance(NextTurnStateRequest::advance()).await?;
                return Ok(ActionOutcome::AwaitingDiceBonus(roll));
            }
            let report = self.move_after_roll(&me, Some(&roll), DiceBonusChoice::default()).await?;
            self.advance(NextTurnStateRequest::advance()).await?;
            Ok::<_, ClientError>(ActionOutcome::Moved(report))
        }
        .await;
        self.finish(lock, result)
    }

    /// `using-dice-bonuses`: move with the chosen die and adjustment.
    #[instrument(skip(self), fields(action = %new_action_id()))]
    pub async fn apply_dice_bonuses(&self, choice: DiceBonusChoice) -> Result<ActionOutcome, ClientError> {
        let (me, _) = self.expect_state("use dice bonuses", &[TurnState::UsingDiceBonuses])?;
        if choice.selected_die.is_some() && !me.owns(&BonusType::Choose1Die) {
            return Err(ClientError::InvalidSelection("no choose-1-die card".into()));
        }
        match choice.adjust_by_1 {
            None => {}
            Some(1 | -1) if me.owns(&BonusType::AdjustRollBy1) => {}
            Some(1 | -1) => return Err(ClientError::InvalidSelection("no adjust-roll-by1 card".into())),
            Some(other) => return Err(ClientError::InvalidSelection(format!("roll can only be adjusted by 1, got {other}"))),
        }
        let lock = self.store.begin_action(ActionKind::Move)?;
        let result = async {
            let roll = self.pending_roll();
            let report = self.move_after_roll(&me, roll.as_ref(), choice).await?;
            *self.pending_roll.lock() = None;
            if choice.selected_die.is_some() {
                self.store.remove_card(&BonusType::Choose1Die);
            }
            if choice.adjust_by_1.is_some() {
                self.store.remove_card(&BonusType::AdjustRollBy1);
            }
            self.advance(NextTurnStateRequest::advance()).await?;
            Ok::<_, ClientError>(ActionOutcome::Moved(report))
        }
        .await;
        self.finish(lock, result)
    }

    /// `choosing-train-ride`: ride to the end of the route, or stay.
    #[instrument(skip(self), fields(action = %new_action_id()))]
    pub async fn choose_train_ride(&self, accept: bool) -> Result<ActionOutcome, ClientError> {
        let (me, _) = self.expect_state("choose train ride", &[TurnState::ChoosingTrainRide])?;
        let route = self.board.train_route(me.sector_id);
        let ride = accept && route.is_some();
        // a declined ride is still a move request; the server may relocate the token
        let lock = self.store.begin_action(ActionKind::Move)?;
        let result = async {
            let resp = self.api.make_move(&MoveRequest::train_ride(ride)).await?;
            let report = match route {
                Some(route) if ride => Some(self.mover.ride_train(me.id, route, resp.new_sector_id).await),
                _ if resp.new_sector_id != me.sector_id => {
                    Some(self.mover.relocate(me.id, me.sector_id, resp.new_sector_id).await)
                }
                _ => None,
            };
            self.record_move(&me, &resp);
            self.advance(NextTurnStateRequest::advance()).await?;
            Ok::<_, ClientError>(report.map_or(ActionOutcome::Advanced, ActionOutcome::Moved))
        }
        .await;
        self.finish(lock, result)
    }

    /// `filling-game-review`: post the review and advance with the matching tag.
    #[instrument(skip(self, review), fields(action = %new_action_id(), outcome = ?review.outcome))]
    pub async fn submit_game_review(&self, review: GameReview) -> Result<ActionOutcome, ClientError> {
        self.expect_state("submit game review", &[TurnState::FillingGameReview])?;
        if review.title.trim().is_empty() {
            return Err(ClientError::InvalidSelection("game title is empty".into()));
        }
        if !(0.0..=10.0).contains(&review.rating) {
            return Err(ClientError::InvalidSelection(format!("rating {} is outside 0..=10", review.rating)));
        }
        let lock = self.store.begin_action(ActionKind::Mutation)?;
        let result = async {
            let req = GameReviewRequest {
                title: review.title.trim().to_string(),
                review: review.review,
                rating: review.rating,
                status: review.outcome,
                duration_secs: review.duration_secs,
            };
            self.api.submit_game_review(&req).await?;
            let next = match review.outcome {
                GameOutcome::Completed => NextTurnStateRequest::advance(),
                GameOutcome::Drop => NextTurnStateRequest::with_action(TurnAction::DropGame),
                GameOutcome::Reroll => NextTurnStateRequest::with_action(TurnAction::RerollGame),
            };
            self.advance(next).await?;
            Ok::<_, ClientError>(ActionOutcome::Advanced)
        }
        .await;
        self.finish(lock, result)
    }

    /// `rolling-bonus-card`: roll a card the player does not own, or an instant card.
    #[instrument(skip(self), fields(action = %new_action_id()))]
    pub async fn roll_bonus_card(&self) -> Result<ActionOutcome, ClientError> {
        let (me, _) = self.expect_state("roll bonus card", &[TurnState::RollingBonusCard])?;
        let pool = receive_pool(&me);
        if pool.is_empty() {
            return Err(ClientError::InvalidSelection("nothing to roll".into()));
        }
        let lock = self.store.begin_action(ActionKind::Mutation)?;
        let result = async {
            let winner = self.spin(&pool).await?;
            let outcome = match winner.kind.clone() {
                CandidateKind::Card(t) => {
                    self.cards.receive(t).await?;
                    ActionOutcome::CardResolved(winner.kind)
                }
                CandidateKind::Instant(i) => ActionOutcome::InstantResolved(self.cards.activate_instant(i).await?),
                CandidateKind::Steal { .. } => return Err(ClientError::InvalidSelection("steal entry in a new-card roll".into())),
            };
            self.advance(NextTurnStateRequest::advance()).await?;
            Ok::<_, ClientError>(outcome)
        }
        .await;
        self.finish(lock, result)
    }

    /// `stealing-bonus-card`: take a card another player owns.
    #[instrument(skip(self), fields(action = %new_action_id()))]
    pub async fn steal_bonus_card(&self) -> Result<ActionOutcome, ClientError> {
        let (me, _) = self.expect_state("steal bonus card", &[TurnState::StealingBonusCard])?;
        let pool = steal_pool(&me, &self.store.players());
        if pool.is_empty() {
            return Err(ClientError::InvalidSelection("nothing to steal".into()));
        }
        let lock = self.store.begin_action(ActionKind::Mutation)?;
        let result = async {
            let winner = self.spin(&pool).await?;
            let CandidateKind::Steal { bonus_type, owner } = winner.kind.clone() else {
                return Err(ClientError::InvalidSelection("steal roll landed on a non-steal entry".into()));
            };
            self.cards.steal(owner, bonus_type).await?;
            self.advance(NextTurnStateRequest::advance()).await?;
            Ok::<_, ClientError>(ActionOutcome::CardResolved(winner.kind))
        }
        .await;
        self.finish(lock, result)
    }

    /// `dropping-card-after-*`: lose one owned card; after a game drop, go to prison.
    #[instrument(skip(self), fields(action = %new_action_id()))]
    pub async fn drop_bonus_card(&self) -> Result<ActionOutcome, ClientError> {
        let (me, state) = self.expect_state("drop bonus card", &DROPPING)?;
        let pool = lose_pool(&me);
        if pool.is_empty() {
            return Err(ClientError::InvalidSelection("no cards to drop".into()));
        }
        let lock = self.store.begin_action(ActionKind::Mutation)?;
        let result = async {
            let winner = self.spin(&pool).await?;
            let CandidateKind::Card(bonus_type) = winner.kind.clone() else {
                return Err(ClientError::InvalidSelection("lose roll landed on a non-card entry".into()));
            };
            self.cards.lose(Some(bonus_type)).await?;
            if lose_reason(&state) == Some(LoseReason::GameDrop) {
                lock.mark_moving();
                self.drop_to_prison(&me).await?;
            }
            self.advance(NextTurnStateRequest::advance()).await?;
            Ok::<_, ClientError>(ActionOutcome::CardResolved(winner.kind))
        }
        .await;
        self.finish(lock, result)
    }

    /// Fallback for every empty-pool surface: continue without rolling.
    #[instrument(skip(self), fields(action = %new_action_id()))]
    pub async fn continue_without_cards(&self) -> Result<ActionOutcome, ClientError> {
        let (me, state) = self.expect_state("continue without cards", &FALLBACK_STATES)?;
        let pool_empty = match &state {
            TurnState::RollingBonusCard => receive_pool(&me).is_empty(),
            TurnState::StealingBonusCard => steal_pool(&me, &self.store.players()).is_empty(),
            _ => lose_pool(&me).is_empty(),
        };
        if !pool_empty {
            return Err(ClientError::InvalidSelection("cards are available to roll".into()));
        }
        let reason = lose_reason(&state);
        let kind = if reason == Some(LoseReason::GameDrop) { ActionKind::Move } else { ActionKind::Mutation };
        let lock = self.store.begin_action(kind)?;
        let result = async {
            let outcome = match reason {
                Some(LoseReason::GameDrop) => ActionOutcome::Moved(self.drop_to_prison(&me).await?),
                Some(LoseReason::InstantRoll) => {
                    self.cards.lose(None).await?;
                    self.events.emit(ClientEvent::CardReelLanded { winner: ReelItem::LoseScore });
                    ActionOutcome::Advanced
                }
                _ => ActionOutcome::Advanced,
            };
            self.advance(NextTurnStateRequest::advance()).await?;
            Ok::<_, ClientError>(outcome)
        }
        .await;
        self.finish(lock, result)
    }

    /// Tax phases: play the evading card or pay.
    #[instrument(skip(self), fields(action = %new_action_id()))]
    pub async fn resolve_tax_bonus(&self, use_card: bool) -> Result<ActionOutcome, ClientError> {
        let (me, state) = self.expect_state("resolve tax bonus", &TAX_STATES)?;
        let Some(tax) = tax_kind(&state) else {
            return Err(ClientError::WrongTurnState { action: "resolve tax bonus", state: Some(state) });
        };
        let card = tax.evading_card();
        if use_card && !me.owns(&card) {
            return Err(ClientError::InvalidSelection(format!("no {card} card")));
        }
        let lock = self.store.begin_action(ActionKind::Mutation)?;
        let result = async {
            if use_card {
                self.cards.use_card(card).await?;
                self.advance(NextTurnStateRequest::advance()).await?;
            } else {
                self.advance(NextTurnStateRequest::with_action(TurnAction::SkipBonus)).await?;
            }
            Ok::<_, ClientError>(ActionOutcome::Advanced)
        }
        .await;
        self.finish(lock, result)
    }

    /// `using-prison-bonuses`: skip a prison day with a card, or sit it out.
    #[instrument(skip(self), fields(action = %new_action_id()))]
    pub async fn resolve_prison_bonus(&self, use_card: bool) -> Result<ActionOutcome, ClientError> {
        let (me, _) = self.expect_state("resolve prison bonus", &[TurnState::UsingPrisonBonuses])?;
        if use_card && !me.owns(&BonusType::SkipPrisonDay) {
            return Err(ClientError::InvalidSelection("no skip-prison-day card".into()));
        }
        let lock = self.store.begin_action(ActionKind::Mutation)?;
        let result = async {
            if use_card {
                // the transition consumes the card; patch the cache before its refetch
                self.store.remove_card(&BonusType::SkipPrisonDay);
                self.advance(NextTurnStateRequest::with_action(TurnAction::SkipPrison)).await?;
            } else {
                self.advance(NextTurnStateRequest::with_action(TurnAction::SkipBonus)).await?;
            }
            Ok::<_, ClientError>(ActionOutcome::Advanced)
        }
        .await;
        self.finish(lock, result)
    }

    /// `using-reroll-bonuses`: reroll the current game with a card, or keep it.
    #[instrument(skip(self), fields(action = %new_action_id()))]
    pub async fn resolve_reroll_bonus(&self, use_card: bool) -> Result<ActionOutcome, ClientError> {
        let (me, _) = self.expect_state("resolve reroll bonus", &[TurnState::UsingRerollBonuses])?;
        if use_card && !me.owns(&BonusType::RerollGame) {
            return Err(ClientError::InvalidSelection("no reroll-game card".into()));
        }
        let lock = self.store.begin_action(ActionKind::Mutation)?;
        let result = async {
            if use_card {
                self.cards.use_card(BonusType::RerollGame).await?;
                self.advance(NextTurnStateRequest::advance()).await?;
            } else {
                self.advance(NextTurnStateRequest::with_action(TurnAction::SkipBonus)).await?;
            }
            Ok::<_, ClientError>(ActionOutcome::Advanced)
        }
        .await;
        self.finish(lock, result)
    }

    /// `choosing-building-sector`: build on a property sector.
    #[instrument(skip(self), fields(action = %new_action_id()))]
    pub async fn choose_building_sector(&self, sector_id: SectorId) -> Result<ActionOutcome, ClientError> {
        self.expect_state("choose building sector", &[TurnState::ChoosingBuildingSector])?;
        if !self.board.building_sectors().any(|s| s.id == sector_id) {
            return Err(ClientError::InvalidSelection(format!("sector {sector_id} cannot hold a building")));
        }
        let lock = self.store.begin_action(ActionKind::Mutation)?;
        let result = async {
            self.advance(NextTurnStateRequest::to_sector(sector_id)).await?;
            Ok::<_, ClientError>(ActionOutcome::Advanced)
        }
        .await;
        self.finish(lock, result)
    }

    /// `entering-prison`: move to prison.
    #[instrument(skip(self), fields(action = %new_action_id()))]
    pub async fn enter_prison(&self) -> Result<ActionOutcome, ClientError> {
        let (me, _) = self.expect_state("enter prison", &[TurnState::EnteringPrison])?;
        let lock = self.store.begin_action(ActionKind::Move)?;
        let result = async {
            let report = self.drop_to_prison(&me).await?;
            self.advance(NextTurnStateRequest::advance()).await?;
            Ok::<_, ClientError>(ActionOutcome::Moved(report))
        }
        .await;
        self.finish(lock, result)
    }

    /// Raw "set next turn state" for any active turn.
    #[instrument(skip(self), fields(action = %new_action_id()))]
    pub async fn set_next_turn_state(&self, req: NextTurnStateRequest) -> Result<ActionOutcome, ClientError> {
        self.expect_state("set next turn state", &TurnState::KNOWN)?;
        let lock = self.store.begin_action(ActionKind::Mutation)?;
        let result = self.advance(req).await.map(|()| ActionOutcome::Advanced);
        self.finish(lock, result)
    }

    async fn spin(&self, pool: &[Candidate]) -> Result<Candidate, ClientError> {
        self.cards
            .spin(pool)
            .await
            .ok_or_else(|| ClientError::InvalidSelection("empty candidate pool".into()))
    }
}

const DROPPING: [TurnState; 3] = [
    TurnState::DroppingCardAfterGameDrop,
    TurnState::DroppingCardAfterInstantRoll,
    TurnState::DroppingCardAfterPoliceSearch,
];

const TAX_STATES: [TurnState; 3] = [
    TurnState::UsingStreetTaxBonuses,
    TurnState::UsingMapTaxBonuses,
    TurnState::UsingMapTaxBonusesAfterTrainRide,
];

const FALLBACK_STATES: [TurnState; 5] = [
    TurnState::RollingBonusCard,
    TurnState::StealingBonusCard,
    TurnState::DroppingCardAfterGameDrop,
    TurnState::DroppingCardAfterInstantRoll,
    TurnState::DroppingCardAfterPoliceSearch,
];
