//! Token movement across the board.
//!
//! Three kinds of moves, all replaying an outcome the server already decided:
//! * [`MovementOrchestrator::walk`]: hop sector by sector, one awaited hop at a time.
//! * [`MovementOrchestrator::ride_train`]: lift, board the rail, ride with the
//!   train, release and settle.
//! * [`MovementOrchestrator::relocate`]: a single long hop (prison, corrections).
//!
//! Callers hold the store's action lock for the whole call; the orchestrator
//! itself does not guard against concurrent use.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, instrument, warn};

use crate::config::Timings;
use crate::events::{ClientEvent, EventSink};
use crate::model::{Board, PlayerId, SectorId, TrainRoute};

pub mod anim;

use anim::{play, Easing, Transform, Tween};

const HOP_ARC: f32 = 0.35;
const RELOCATE_ARC: f32 = 1.2;
const TRAIN_LIFT: f32 = 0.6;

/// What a finished move did on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveReport {
    pub visited: Vec<SectorId>,
    pub destination: SectorId,
    /// The replayed steps missed the server destination and a corrective hop was added.
    pub corrected: bool,
}

pub struct MovementOrchestrator {
    board: Arc<Board>,
    timings: Timings,
    events: EventSink,
    tokens: Mutex<HashMap<PlayerId, Transform>>,
}

impl MovementOrchestrator {
    pub fn new(board: Arc<Board>, timings: Timings, events: EventSink) -> Self {
        Self { board, timings, events, tokens: Mutex::new(HashMap::new()) }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Put a token on its resting spot without animating.
    pub fn place(&self, player: PlayerId, sector: SectorId) {
        let t = self.resting(player, sector);
        self.set_token(player, t);
    }

    pub fn token(&self, player: PlayerId) -> Option<Transform> {
        self.tokens.lock().get(&player).copied()
    }

    /// Resting transform of `player`'s token on `sector`.
    pub fn resting(&self, player: PlayerId, sector: SectorId) -> Transform {
        Transform::at(self.board.token_position(sector, slot(player)))
    }

    fn set_token(&self, player: PlayerId, transform: Transform) {
        self.tokens.lock().insert(player, transform);
        self.events.emit(ClientEvent::TokenMoved { player, transform });
    }

    fn current(&self, player: PlayerId, fallback_sector: SectorId) -> Transform {
        self.token(player).unwrap_or_else(|| self.resting(player, fallback_sector))
    }

    async fn hop(&self, player: PlayerId, from: SectorId, to: SectorId, duration: std::time::Duration, arc: f32) {
        self.events.emit(ClientEvent::HopStarted { player, from, to });
        let start = self.current(player, from);
        let end = self.resting(player, to);
        let tween = Tween::new(start, end, duration).with_arc(arc);
        play(&tween, self.timings.frame, |t| self.set_token(player, t)).await;
        self.events.emit(ClientEvent::HopFinished { player, sector: to });
    }

    /// Walk `steps` sectors forward from `from`, ending on the server's `destination`.
    #[instrument(skip(self))]
    pub async fn walk(&self, player: PlayerId, from: SectorId, steps: u32, destination: SectorId) -> MoveReport {
        let path = self.board.walk(from, steps);
        let mut at = from;
        for &next in &path {
            self.hop(player, at, next, self.timings.hop, HOP_ARC).await;
            at = next;
        }
        let corrected = at != destination;
        if corrected {
            warn!(player, replayed = at, destination, "replayed roll missed server destination");
            self.hop(player, at, destination, self.timings.relocate, RELOCATE_ARC).await;
        }
        self.finish(player, destination);
        MoveReport { visited: path, destination, corrected }
    }

    /// Single long hop straight to `to`.
    #[instrument(skip(self))]
    pub async fn relocate(&self, player: PlayerId, from: SectorId, to: SectorId) -> MoveReport {
        if from != to {
            self.hop(player, from, to, self.timings.relocate, RELOCATE_ARC).await;
        }
        self.finish(player, to);
        MoveReport { visited: vec![to], destination: to, corrected: false }
    }

    /// Ride the train along `route`, ending on the server's `destination`.
    #[instrument(skip(self))]
    pub async fn ride_train(&self, player: PlayerId, route: TrainRoute, destination: SectorId) -> MoveReport {
        let t = &self.timings;
        let frame = t.frame;
        let board_at = self.board.rail_point(route.from);
        let leave_at = self.board.rail_point(route.to);

        // token timeline, part one: lift and slide to the boarding point
        let start = self.current(player, route.from);
        let lifted = start.lifted(TRAIN_LIFT);
        play(&Tween::new(start, lifted, t.train_lift).eased(Easing::OutCubic), frame, |x| self.set_token(player, x)).await;

        let train_start = Transform::at(board_at).facing(leave_at);
        self.events.emit(ClientEvent::TrainMoved { route, transform: train_start });
        let boarded = Transform { translation: board_at, ..lifted }.lifted(TRAIN_LIFT);
        play(&Tween::new(lifted, boarded, t.train_slide), frame, |x| self.set_token(player, x)).await;

        // train timeline drives the ride; the token follows its world position every frame
        let train_end = Transform::at(leave_at).facing(leave_at + (leave_at - board_at));
        let ride = Tween::new(train_start, train_end, t.train_ride);
        let mut riding = boarded;
        play(&ride, frame, |train| {
            self.events.emit(ClientEvent::TrainMoved { route, transform: train });
            riding = Transform { translation: train.translation, ..riding }.lifted(TRAIN_LIFT);
            self.set_token(player, riding);
        })
        .await;

        // token timeline, part two: step off the rail and settle on the sector
        let rest = self.resting(player, destination);
        let above = rest.lifted(TRAIN_LIFT);
        play(&Tween::new(riding, above, t.train_release), frame, |x| self.set_token(player, x)).await;
        play(&Tween::new(above, rest, t.train_settle).eased(Easing::OutCubic), frame, |x| self.set_token(player, x)).await;

        if destination != route.to {
            warn!(player, route_to = route.to, destination, "server ended the ride elsewhere");
        }
        self.finish(player, destination);
        MoveReport { visited: vec![destination], destination, corrected: destination != route.to }
    }

    /// Snap onto the resting spot so the final transform always matches the destination.
    fn finish(&self, player: PlayerId, destination: SectorId) {
        let rest = self.resting(player, destination);
        if self.token(player) != Some(rest) {
            self.set_token(player, rest);
        }
        debug!(player, destination, "move animation settled");
    }
}

fn slot(player: PlayerId) -> usize {
    player as usize % 9
}
