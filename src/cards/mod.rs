//! Bonus-card pools and the roll-then-commit flow.
//!
//! Each card phase builds a candidate pool, spins the reel to a pre-drawn
//! winner ([`roll`]) and commits that single outcome to the server. The
//! cached hand is patched right after the commit succeeds, ahead of the
//! next player refetch.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::time::sleep;
use tracing::{info, instrument};

use crate::api::{CardRequest, GameApi, InstantCardRequest, InstantCardResponse, InstantOutcome, LoseCardRequest, StealCardRequest};
use crate::config::Timings;
use crate::error::ClientError;
use crate::events::{ClientEvent, EventSink, ReelItem};
use crate::model::{BonusType, CardFamily, InstantCardType, Player, PlayerId};
use crate::store::PlayerStore;

pub mod roll;

const MANUAL_WEIGHT: f64 = 1.0;
const AUTOMATIC_WEIGHT: f64 = 0.8;
const INSTANT_WEIGHT: f64 = 0.5;
const STEAL_WEIGHT: f64 = 1.0;
const LOSE_WEIGHT: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub enum CandidateKind {
    Card(BonusType),
    Steal { bonus_type: BonusType, owner: PlayerId },
    Instant(InstantCardType),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub kind: CandidateKind,
    pub weight: f64,
}

impl Candidate {
    pub fn reel_item(&self) -> ReelItem {
        match &self.kind {
            CandidateKind::Card(t) | CandidateKind::Steal { bonus_type: t, .. } => ReelItem::Card(t.clone()),
            CandidateKind::Instant(i) => ReelItem::Instant(*i),
        }
    }
}

fn rollable(t: &BonusType) -> bool {
    !matches!(t, BonusType::Other(_))
}

/// New card roll: every card type the player does not own, plus the instant cards.
pub fn receive_pool(me: &Player) -> Vec<Candidate> {
    let owned: BTreeSet<&BonusType> = me.card_types().collect();
    let cards = BonusType::ALL.into_iter().filter(|t| !owned.contains(t)).map(|t| {
        let weight = match t.family() {
            CardFamily::Manual => MANUAL_WEIGHT,
            CardFamily::Automatic => AUTOMATIC_WEIGHT,
        };
        Candidate { kind: CandidateKind::Card(t), weight }
    });
    let instants = InstantCardType::ALL
        .into_iter()
        .map(|i| Candidate { kind: CandidateKind::Instant(i), weight: INSTANT_WEIGHT });
    cards.chain(instants).collect()
}

/// Steal roll: cards other players own that `me` does not, one entry per (type, owner).
pub fn steal_pool(me: &Player, players: &[Player]) -> Vec<Candidate> {
    let owned: BTreeSet<&BonusType> = me.card_types().collect();
    let mut seen = BTreeSet::new();
    let mut pool = Vec::new();
    for other in players.iter().filter(|p| p.id != me.id) {
        for card in &other.bonus_cards {
            let t = &card.bonus_type;
            if owned.contains(t) || !rollable(t) || !seen.insert((other.id, t.clone())) {
                continue;
            }
            pool.push(Candidate {
                kind: CandidateKind::Steal { bonus_type: t.clone(), owner: other.id },
                weight: STEAL_WEIGHT,
            });
        }
    }
    pool
}

/// Lose roll: one entry per card type the player owns.
pub fn lose_pool(me: &Player) -> Vec<Candidate> {
    let owned: BTreeSet<&BonusType> = me.card_types().filter(|t| rollable(t)).collect();
    owned
        .into_iter()
        .map(|t| Candidate { kind: CandidateKind::Card(t.clone()), weight: LOSE_WEIGHT })
        .collect()
}

pub struct CardFlow {
    api: Arc<dyn GameApi>,
    store: PlayerStore,
    timings: Timings,
    events: EventSink,
    rng: Mutex<StdRng>,
}

impl CardFlow {
    pub fn new(api: Arc<dyn GameApi>, store: PlayerStore, timings: Timings, events: EventSink) -> Self {
        Self { api, store, timings, events, rng: Mutex::new(StdRng::from_entropy()) }
    }

    /// Replace the random source, for reproducible rolls.
    pub fn seed(&self, seed: u64) {
        *self.rng.lock() = StdRng::seed_from_u64(seed);
    }

    /// Cosmetic entry for an idle reel.
    pub fn idle_item(&self, candidates: &[Candidate]) -> Option<ReelItem> {
        let i = roll::idle_pick(candidates.len(), &mut *self.rng.lock())?;
        Some(candidates[i].reel_item())
    }

    /// Draw the winner, then play the reel that lands on it.
    pub async fn spin(&self, candidates: &[Candidate]) -> Option<Candidate> {
        let (winner, plan) = {
            let mut rng = self.rng.lock();
            let winner = roll::pick_winner(candidates, &mut *rng)?;
            (winner, roll::plan_reel(candidates.len(), winner, &mut *rng))
        };
        let reel = plan.reel.iter().map(|&i| candidates[i].reel_item()).collect();
        self.events.emit(ClientEvent::CardReelStarted { reel, landing: plan.landing });
        sleep(self.timings.card_roll).await;
        let won = candidates[winner].clone();
        self.events.emit(ClientEvent::CardReelLanded { winner: won.reel_item() });
        sleep(self.timings.card_reveal).await;
        Some(won)
    }

    #[instrument(skip(self))]
    pub async fn receive(&self, bonus_type: BonusType) -> Result<(), ClientError> {
        self.api.receive_bonus_card(&CardRequest { bonus_type: bonus_type.clone() }).await?;
        info!(%bonus_type, "card received");
        self.store.add_card(bonus_type);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn activate_instant(&self, card_type: InstantCardType) -> Result<InstantCardResponse, ClientError> {
        let resp = self.api.activate_instant_card(&InstantCardRequest { card_type }).await?;
        info!(?card_type, result = ?resp.result, "instant card applied");
        if let (InstantOutcome::ScoreChange, Some(delta)) = (resp.result, resp.score_change) {
            self.store.add_score(delta);
        }
        Ok(resp)
    }

    #[instrument(skip(self))]
    pub async fn steal(&self, owner: PlayerId, bonus_type: BonusType) -> Result<(), ClientError> {
        let req = StealCardRequest { from_player: owner, bonus_type: bonus_type.clone() };
        self.api.steal_bonus_card(&req).await?;
        info!(%bonus_type, owner, "card stolen");
        self.store.remove_card_from(owner, &bonus_type);
        self.store.add_card(bonus_type);
        Ok(())
    }

    /// Drop one owned card, or score when `bonus_type` is `None`.
    #[instrument(skip(self))]
    pub async fn lose(&self, bonus_type: Option<BonusType>) -> Result<(), ClientError> {
        self.api.lose_bonus_card(&LoseCardRequest { bonus_type: bonus_type.clone() }).await?;
        if let Some(t) = bonus_type {
            info!(bonus_type = %t, "card lost");
            self.store.remove_card(&t);
        } else {
            info!("score lost instead of a card");
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn use_card(&self, bonus_type: BonusType) -> Result<(), ClientError> {
        self.api.use_bonus_card(&CardRequest { bonus_type: bonus_type.clone() }).await?;
        info!(%bonus_type, "card used");
        self.store.remove_card(&bonus_type);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::player;

    #[test]
    fn receive_pool_excludes_owned_cards() {
        let me = player(1, 5, &[BonusType::EvadeMapTax, BonusType::Choose1Die]);
        let pool = receive_pool(&me);
        for c in &pool {
            if let CandidateKind::Card(t) = &c.kind {
                assert!(!me.owns(t), "{t} is already owned");
            }
        }
        let cards = pool.iter().filter(|c| matches!(c.kind, CandidateKind::Card(_))).count();
        assert_eq!(cards, BonusType::ALL.len() - 2);
        let instants = pool.iter().filter(|c| matches!(c.kind, CandidateKind::Instant(_))).count();
        assert_eq!(instants, InstantCardType::ALL.len());
    }

    #[test]
    fn steal_pool_skips_types_already_owned() {
        let me = player(1, 5, &[BonusType::EvadeMapTax]);
        let others = vec![
            me.clone(),
            player(2, 9, &[BonusType::EvadeMapTax, BonusType::RerollGame, BonusType::RerollGame]),
            player(3, 9, &[BonusType::RerollGame, BonusType::Other("mystery".into())]),
        ];
        let pool = steal_pool(&me, &others);
        assert_eq!(
            pool.iter().map(|c| c.kind.clone()).collect::<Vec<_>>(),
            vec![
                CandidateKind::Steal { bonus_type: BonusType::RerollGame, owner: 2 },
                CandidateKind::Steal { bonus_type: BonusType::RerollGame, owner: 3 },
            ]
        );
    }

    #[test]
    fn steal_pool_empty_when_nobody_has_new_cards() {
        let me = player(1, 5, &[BonusType::RerollGame]);
        let others = vec![player(2, 9, &[BonusType::RerollGame]), player(3, 9, &[])];
        assert!(steal_pool(&me, &others).is_empty());
    }

    #[test]
    fn lose_pool_lists_owned_types_once() {
        let me = player(1, 5, &[BonusType::SkipPrisonDay, BonusType::SkipPrisonDay, BonusType::EvadeStreetTax]);
        let pool = lose_pool(&me);
        assert_eq!(pool.len(), 2);
        assert!(lose_pool(&player(1, 5, &[])).is_empty());
    }
}
