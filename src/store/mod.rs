//! Client-side cache of the players and the guard that serialises turn actions.
//!
//! The store is the single owner of the cached [`Player`] list. Writers go
//! through named operations only, and every turn action runs inside an
//! [`ActionLock`]:
//!
//! ```text
//!   Idle --begin_action--> Locked{moving} --drop lock--> PendingRefetch
//!    ^                                                        |
//!    +----------------- poll applied (apply_players) ---------+
//! ```
//!
//! While locked, background polls are refused (`poll_ticket` is `None`) and a
//! snapshot fetched before the lock was taken is discarded when it lands, so
//! optimistic updates are never overwritten by stale data.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::error::ClientError;
use crate::model::{BonusCard, BonusType, Player, PlayerId, SectorId, TurnState};

pub mod poller;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Token movement is part of the action; every turn surface is hidden.
    Move,
    /// Server mutation without movement.
    Mutation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Locked { moving: bool },
    PendingRefetch,
}

/// Proof that a poll was started while no action held the lock.
#[derive(Debug, Clone, Copy)]
pub struct PollTicket {
    epoch: u64,
}

#[derive(Debug)]
struct StoreState {
    me: Option<Player>,
    players: Vec<Player>,
    phase: SyncPhase,
    epoch: u64,
}

#[derive(Clone)]
pub struct PlayerStore {
    state: Arc<Mutex<StoreState>>,
    phase_tx: Arc<watch::Sender<SyncPhase>>,
}

impl Default for PlayerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerStore {
    pub fn new() -> Self {
        let (phase_tx, _) = watch::channel(SyncPhase::Idle);
        Self {
            state: Arc::new(Mutex::new(StoreState {
                me: None,
                players: Vec::new(),
                phase: SyncPhase::Idle,
                epoch: 0,
            })),
            phase_tx: Arc::new(phase_tx),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncPhase> {
        self.phase_tx.subscribe()
    }

    pub fn phase(&self) -> SyncPhase {
        self.state.lock().phase
    }

    pub fn is_player_moving(&self) -> bool {
        matches!(self.phase(), SyncPhase::Locked { moving: true })
    }

    pub fn refetch_suppressed(&self) -> bool {
        matches!(self.phase(), SyncPhase::Locked { .. })
    }

    pub fn me(&self) -> Option<Player> {
        self.state.lock().me.clone()
    }

    pub fn my_id(&self) -> Option<PlayerId> {
        self.state.lock().me.as_ref().map(|p| p.id)
    }

    pub fn players(&self) -> Vec<Player> {
        self.state.lock().players.clone()
    }

    pub fn turn_state(&self) -> Option<TurnState> {
        self.state.lock().me.as_ref().and_then(|p| p.turn_state.clone())
    }

    /// Replace the current player with a fresh `GET /players/current` result.
    pub fn load_current(&self, player: Player) {
        let mut state = self.state.lock();
        upsert(&mut state.players, &player);
        state.me = Some(player);
    }

    /// Apply a `GET /players` snapshot taken under `ticket`.
    ///
    /// Returns `false` when the snapshot was discarded as stale.
    pub fn apply_players(&self, players: Vec<Player>, ticket: PollTicket) -> bool {
        let mut state = self.state.lock();
        if matches!(state.phase, SyncPhase::Locked { .. }) || state.epoch != ticket.epoch {
            debug!(ticket = ticket.epoch, epoch = state.epoch, "discarding stale player snapshot");
            return false;
        }
        if let Some(me) = state.me.as_ref().map(|p| p.id) {
            if let Some(fresh) = players.iter().find(|p| p.id == me) {
                state.me = Some(fresh.clone());
            }
        }
        state.players = players;
        if state.phase == SyncPhase::PendingRefetch {
            state.phase = SyncPhase::Idle;
            drop(state);
            self.phase_tx.send_replace(SyncPhase::Idle);
        }
        true
    }

    /// `None` while an action holds the lock.
    pub fn poll_ticket(&self) -> Option<PollTicket> {
        let state = self.state.lock();
        match state.phase {
            SyncPhase::Locked { .. } => None,
            _ => Some(PollTicket { epoch: state.epoch }),
        }
    }

    pub fn begin_action(&self, kind: ActionKind) -> Result<ActionLock, ClientError> {
        let mut state = self.state.lock();
        if matches!(state.phase, SyncPhase::Locked { .. }) {
            return Err(ClientError::ActionInFlight);
        }
        let phase = SyncPhase::Locked { moving: kind == ActionKind::Move };
        state.phase = phase;
        state.epoch += 1;
        trace!(epoch = state.epoch, ?kind, "action lock taken");
        drop(state);
        self.phase_tx.send_replace(phase);
        Ok(ActionLock { store: self.clone() })
    }

    fn set_phase(&self, phase: SyncPhase) {
        self.state.lock().phase = phase;
        self.phase_tx.send_replace(phase);
    }

    pub fn set_turn_state(&self, turn_state: Option<TurnState>) {
        self.update_me(|me| me.turn_state = turn_state);
    }

    pub fn set_sector(&self, sector_id: SectorId) {
        self.update_me(|me| me.sector_id = sector_id);
    }

    pub fn add_score(&self, delta: f64) {
        self.update_me(|me| me.total_score += delta);
    }

    pub fn add_card(&self, bonus_type: BonusType) {
        self.update_me(|me| {
            let owner = me.id;
            me.bonus_cards.push(BonusCard { bonus_type, owner });
        });
    }

    /// Remove one card of `bonus_type` from the current player.
    pub fn remove_card(&self, bonus_type: &BonusType) {
        self.update_me(|me| remove_one(&mut me.bonus_cards, bonus_type));
    }

    /// Remove one card from another player's cached hand (after a steal).
    pub fn remove_card_from(&self, owner: PlayerId, bonus_type: &BonusType) {
        let mut state = self.state.lock();
        if let Some(p) = state.players.iter_mut().find(|p| p.id == owner) {
            remove_one(&mut p.bonus_cards, bonus_type);
        }
    }

    fn update_me(&self, f: impl FnOnce(&mut Player)) {
        let mut state = self.state.lock();
        let Some(me) = state.me.as_mut() else { return };
        f(me);
        let snapshot = me.clone();
        upsert(&mut state.players, &snapshot);
    }
}

fn upsert(players: &mut Vec<Player>, player: &Player) {
    match players.iter_mut().find(|p| p.id == player.id) {
        Some(slot) => *slot = player.clone(),
        None => players.push(player.clone()),
    }
}

fn remove_one(cards: &mut Vec<BonusCard>, bonus_type: &BonusType) {
    if let Some(i) = cards.iter().position(|c| &c.bonus_type == bonus_type) {
        cards.remove(i);
    }
}

/// Held for the whole span of one turn action.
///
/// Dropping it (on success, error or panic unwinding) releases the lock and
/// schedules a background refetch.
pub struct ActionLock {
    store: PlayerStore,
}

impl ActionLock {
    /// Switch to the moving phase for the rest of the action.
    pub fn mark_moving(&self) {
        self.store.set_phase(SyncPhase::Locked { moving: true });
    }

    /// Explicit release, same as dropping.
    pub fn release(self) {}
}

impl Drop for ActionLock {
    fn drop(&mut self) {
        trace!("action lock released");
        self.store.set_phase(SyncPhase::PendingRefetch);
    }
}
