//! Two-die roll with a fixed-length reveal animation.
//!
//! The request and the shrink/spin/grow animation run side by side. The result
//! is revealed once both are done, and never earlier than
//! [`Timings::dice_floor`] after the roll started, however fast the server is.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{info, instrument};

use crate::api::GameApi;
use crate::config::Timings;
use crate::error::ClientError;
use crate::events::{ClientEvent, DicePhase, EventSink};
use crate::model::{DiceRoll, PlayerId};
use crate::notify::Notifier;

pub struct DiceCoordinator {
    api: Arc<dyn GameApi>,
    timings: Timings,
    events: EventSink,
    notifier: Notifier,
    shown: Arc<Mutex<Option<DiceRoll>>>,
}

impl DiceCoordinator {
    pub fn new(api: Arc<dyn GameApi>, timings: Timings, events: EventSink, notifier: Notifier) -> Self {
        Self { api, timings, events, notifier, shown: Arc::new(Mutex::new(None)) }
    }

    /// Roll on the server and play the dice animation.
    ///
    /// On failure a toast is shown and the error is returned so the caller can
    /// abandon the move.
    #[instrument(skip(self))]
    pub async fn roll(&self, player: PlayerId) -> Result<DiceRoll, ClientError> {
        let started = Instant::now();
        let (result, ()) = tokio::join!(self.api.roll_dice(), self.animate(player));
        let roll = match result {
            Ok(roll) => roll,
            Err(err) => {
                self.notifier.error(format!("Dice roll failed: {}", err.user_message()));
                return Err(ClientError::DiceRollFailed(err));
            }
        };
        sleep_until(started + self.timings.dice_floor()).await;
        info!(roll_id = %roll.roll_id, dice = ?roll.data, random_org = roll.is_random_org_result, "dice revealed");
        self.reveal(roll.clone());
        Ok(roll)
    }

    async fn animate(&self, player: PlayerId) {
        let t = &self.timings;
        for (phase, duration) in [(DicePhase::Shrink, t.dice_shrink), (DicePhase::Spin, t.dice_spin), (DicePhase::Grow, t.dice_grow)] {
            self.events.emit(ClientEvent::DiceAnimation { player, phase });
            sleep(duration).await;
        }
    }

    fn reveal(&self, roll: DiceRoll) {
        let roll_id = roll.roll_id.clone();
        self.events.emit(ClientEvent::DiceRevealed { provenance: roll.provenance(), roll: roll.clone() });
        *self.shown.lock() = Some(roll);

        let shown = Arc::clone(&self.shown);
        let events = self.events.clone();
        let ttl = self.timings.dice_reveal;
        tokio::spawn(async move {
            sleep(ttl).await;
            let mut slot = shown.lock();
            if slot.as_ref().is_some_and(|r| r.roll_id == roll_id) {
                *slot = None;
                drop(slot);
                events.emit(ClientEvent::DiceCleared { roll_id });
            }
        });
    }

    /// Roll currently on screen.
    pub fn shown(&self) -> Option<DiceRoll> {
        self.shown.lock().clone()
    }
}
