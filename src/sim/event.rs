/// Events emitted by the session controller.
/// The binary drains these every frame for logging; tests use them to
/// observe what happened.

use crate::domain::balloon::BalloonId;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    SessionStarted,
    CountdownTick { time_left: u32 },
    BalloonSpawned { id: BalloonId, kind: &'static str },
    BalloonPopped { id: BalloonId, points: i32 },
    BalloonMissed { id: BalloonId },
    SessionEnded { score: i32 },
    NewBest { score: i32 },
}
