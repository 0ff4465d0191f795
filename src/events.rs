//! Events pushed to the renderer (board, dice overlay, card reel, toasts).

use tokio::sync::mpsc;
use ulid::Ulid;

use crate::model::{BonusType, DiceRoll, InstantCardType, PlayerId, Provenance, SectorId, TrainRoute};
use crate::movement::anim::Transform;

#[derive(Debug, Clone, PartialEq)]
pub enum DicePhase {
    Shrink,
    Spin,
    Grow,
}

/// One entry on the card reel.
#[derive(Debug, Clone, PartialEq)]
pub enum ReelItem {
    Card(BonusType),
    Instant(InstantCardType),
    LoseScore,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    DiceAnimation { player: PlayerId, phase: DicePhase },
    DiceRevealed { roll: DiceRoll, provenance: Provenance },
    DiceCleared { roll_id: String },
    HopStarted { player: PlayerId, from: SectorId, to: SectorId },
    HopFinished { player: PlayerId, sector: SectorId },
    TokenMoved { player: PlayerId, transform: Transform },
    TrainMoved { route: TrainRoute, transform: Transform },
    MapCompleted { player: PlayerId },
    CardReelStarted { reel: Vec<ReelItem>, landing: usize },
    CardReelLanded { winner: ReelItem },
    ToastShown { id: Ulid, message: String },
    ToastDismissed { id: Ulid },
}

/// Cloneable sending half of the event channel.
///
/// A closed receiver is not an error: the engine keeps working headless.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<ClientEvent>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: ClientEvent) {
        let _ = self.tx.send(event);
    }
}
