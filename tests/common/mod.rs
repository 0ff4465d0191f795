//! Scripted in-memory game server shared by the integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;

use board_client::api::{
    CardRequest, GameApi, GameReviewRequest, InstantCardRequest, InstantCardResponse, InstantOutcome, LoseCardRequest,
    MoveRequest, MoveResponse, NextTurnStateRequest, StealCardRequest, TurnAction,
};
use board_client::config::Timings;
use board_client::error::ApiError;
use board_client::events::{ClientEvent, EventSink};
use board_client::model::{BonusCard, BonusType, Board, DiceRoll, Player, PlayerId, SectorId, TurnState};
use board_client::store::PlayerStore;
use board_client::turn::TurnMachine;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    RollDice,
    Move(MoveRequest),
    TurnState(NextTurnStateRequest),
    Receive(BonusType),
    Use(BonusType),
    Steal(PlayerId, BonusType),
    Lose(Option<BonusType>),
    Instant(InstantCardRequest),
    Review(GameReviewRequest),
    FetchPlayers,
    FetchCurrent,
}

#[derive(Default)]
struct Script {
    me: Option<Player>,
    others: Vec<Player>,
    rolls: VecDeque<Result<DiceRoll, ApiError>>,
    moves: VecDeque<Result<MoveResponse, ApiError>>,
    next_states: VecDeque<Option<TurnState>>,
    state_errors: VecDeque<ApiError>,
    instant: Option<InstantCardResponse>,
    calls: Vec<Call>,
    roll_delay: Duration,
    move_delay: Duration,
    players_delay: Duration,
}

/// Fake server: answers from queued responses and records every call.
#[derive(Clone, Default)]
pub struct FakeApi {
    script: Arc<Mutex<Script>>,
}

impl FakeApi {
    pub fn new(me: Player) -> Self {
        let api = Self::default();
        api.script.lock().me = Some(me);
        api
    }

    pub fn with_others(self, others: Vec<Player>) -> Self {
        self.script.lock().others = others;
        self
    }

    pub fn push_roll(&self, data: [u8; 2]) {
        let roll = DiceRoll {
            roll_id: format!("roll-{}-{}", data[0], data[1]),
            data,
            is_random_org_result: true,
            random_org_check_form: Some("check".into()),
            random_org_fail_reason: None,
        };
        self.script.lock().rolls.push_back(Ok(roll));
    }

    pub fn push_roll_error(&self, status: u16) {
        self.script.lock().rolls.push_back(Err(status_error(status)));
    }

    pub fn push_move(&self, new_sector_id: SectorId) {
        self.script.lock().moves.push_back(Ok(MoveResponse { new_sector_id, map_completed: false }));
    }

    pub fn push_move_error(&self, status: u16) {
        self.script.lock().moves.push_back(Err(status_error(status)));
    }

    /// Turn states the server moves to on each successive "set next turn state".
    pub fn push_states(&self, states: impl IntoIterator<Item = Option<TurnState>>) {
        self.script.lock().next_states.extend(states);
    }

    /// Fail the next "set next turn state" call with `status`.
    pub fn fail_next_turn_state(&self, status: u16) {
        self.script.lock().state_errors.push_back(status_error(status));
    }

    pub fn set_instant(&self, resp: InstantCardResponse) {
        self.script.lock().instant = Some(resp);
    }

    pub fn set_roll_delay(&self, delay: Duration) {
        self.script.lock().roll_delay = delay;
    }

    pub fn set_move_delay(&self, delay: Duration) {
        self.script.lock().move_delay = delay;
    }

    pub fn set_players_delay(&self, delay: Duration) {
        self.script.lock().players_delay = delay;
    }

    /// Server-side edit of the current player, visible on the next fetch.
    pub fn update_me(&self, f: impl FnOnce(&mut Player)) {
        if let Some(me) = self.script.lock().me.as_mut() {
            f(me);
        }
    }

    /// The current player as the server holds it.
    pub fn me(&self) -> Player {
        self.with_me(|me| me.clone())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().calls.clone()
    }

    /// Calls other than player fetches, in order.
    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::FetchPlayers | Call::FetchCurrent))
            .collect()
    }

    fn record(&self, call: Call) {
        self.script.lock().calls.push(call);
    }

    fn with_me<T>(&self, f: impl FnOnce(&mut Player) -> T) -> T {
        let mut script = self.script.lock();
        let me = script.me.as_mut().expect("fake server has no current player");
        f(me)
    }
}

pub fn status_error(status: u16) -> ApiError {
    ApiError::Status { status, message: format!("scripted failure {status}") }
}

#[async_trait]
impl GameApi for FakeApi {
    async fn roll_dice(&self) -> Result<DiceRoll, ApiError> {
        self.record(Call::RollDice);
        let delay = self.script.lock().roll_delay;
        tokio::time::sleep(delay).await;
        self.script.lock().rolls.pop_front().expect("no scripted roll")
    }

    async fn make_move(&self, req: &MoveRequest) -> Result<MoveResponse, ApiError> {
        self.record(Call::Move(req.clone()));
        let delay = self.script.lock().move_delay;
        tokio::time::sleep(delay).await;
        let resp = self.script.lock().moves.pop_front().expect("no scripted move")?;
        self.with_me(|me| me.sector_id = resp.new_sector_id);
        Ok(resp)
    }

    async fn set_next_turn_state(&self, req: &NextTurnStateRequest) -> Result<(), ApiError> {
        self.record(Call::TurnState(req.clone()));
        if let Some(err) = self.script.lock().state_errors.pop_front() {
            return Err(err);
        }
        if req.action == Some(TurnAction::SkipPrison) {
            self.with_me(|me| remove(&mut me.bonus_cards, &BonusType::SkipPrisonDay));
        }
        let next = self.script.lock().next_states.pop_front();
        if let Some(state) = next {
            self.with_me(|me| me.turn_state = state);
        }
        Ok(())
    }

    async fn receive_bonus_card(&self, req: &CardRequest) -> Result<(), ApiError> {
        self.record(Call::Receive(req.bonus_type.clone()));
        self.with_me(|me| me.bonus_cards.push(BonusCard { bonus_type: req.bonus_type.clone(), owner: me.id }));
        Ok(())
    }

    async fn use_bonus_card(&self, req: &CardRequest) -> Result<(), ApiError> {
        self.record(Call::Use(req.bonus_type.clone()));
        self.with_me(|me| remove(&mut me.bonus_cards, &req.bonus_type));
        Ok(())
    }

    async fn steal_bonus_card(&self, req: &StealCardRequest) -> Result<(), ApiError> {
        self.record(Call::Steal(req.from_player, req.bonus_type.clone()));
        {
            let mut script = self.script.lock();
            if let Some(victim) = script.others.iter_mut().find(|p| p.id == req.from_player) {
                remove(&mut victim.bonus_cards, &req.bonus_type);
            }
        }
        self.with_me(|me| me.bonus_cards.push(BonusCard { bonus_type: req.bonus_type.clone(), owner: me.id }));
        Ok(())
    }

    async fn lose_bonus_card(&self, req: &LoseCardRequest) -> Result<(), ApiError> {
        self.record(Call::Lose(req.bonus_type.clone()));
        match &req.bonus_type {
            Some(t) => self.with_me(|me| remove(&mut me.bonus_cards, t)),
            None => self.with_me(|me| me.total_score -= 1.0),
        }
        Ok(())
    }

    async fn activate_instant_card(&self, req: &InstantCardRequest) -> Result<InstantCardResponse, ApiError> {
        self.record(Call::Instant(req.clone()));
        let resp = self
            .script
            .lock()
            .instant
            .clone()
            .unwrap_or(InstantCardResponse { result: InstantOutcome::Reroll, score_change: None });
        Ok(resp)
    }

    async fn submit_game_review(&self, req: &GameReviewRequest) -> Result<(), ApiError> {
        self.record(Call::Review(req.clone()));
        Ok(())
    }

    async fn fetch_players(&self) -> Result<Vec<Player>, ApiError> {
        self.record(Call::FetchPlayers);
        let delay = self.script.lock().players_delay;
        tokio::time::sleep(delay).await;
        let script = self.script.lock();
        Ok(script.me.iter().cloned().chain(script.others.iter().cloned()).collect())
    }

    async fn fetch_current_player(&self) -> Result<Player, ApiError> {
        self.record(Call::FetchCurrent);
        Ok(self.with_me(|me| me.clone()))
    }
}

fn remove(cards: &mut Vec<BonusCard>, bonus_type: &BonusType) {
    if let Some(i) = cards.iter().position(|c| &c.bonus_type == bonus_type) {
        cards.remove(i);
    }
}

pub fn player(id: PlayerId, sector_id: SectorId, turn_state: Option<TurnState>, cards: &[BonusType]) -> Player {
    Player {
        id,
        name: format!("player-{id}"),
        url_handle: format!("p{id}"),
        is_online: true,
        sector_id,
        total_score: 10.0,
        bonus_cards: cards.iter().map(|t| BonusCard { bonus_type: t.clone(), owner: id }).collect(),
        turn_state,
        building_upgrade_bonus: 0,
        maps_completed: 0,
    }
}

pub struct Harness {
    pub api: FakeApi,
    pub machine: Arc<TurnMachine>,
    pub events: UnboundedReceiver<ClientEvent>,
}

impl Harness {
    pub async fn start(api: FakeApi) -> Self {
        let (sink, events) = EventSink::channel();
        let machine = TurnMachine::new(
            Arc::new(api.clone()),
            PlayerStore::new(),
            Arc::new(Board::classic()),
            Timings::default(),
            sink,
        );
        machine.cards().seed(7);
        machine.load().await.expect("initial load");
        Self { api, machine: Arc::new(machine), events }
    }

    pub fn store(&self) -> &PlayerStore {
        self.machine.store()
    }

    pub fn drain(&mut self) -> Vec<ClientEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = self.events.try_recv() {
            out.push(ev);
        }
        out
    }
}
