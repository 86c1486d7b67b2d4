/// WorldState: everything the renderer needs to draw one frame.
///
/// Owned and mutated only by the session controller. The renderer reads
/// it; the only thing it writes back is the stage size after a resize.
///
/// ## Stage coordinates
///
/// Balloon positions are in stage pixels, origin at the top-left of the
/// play area, y growing downward. Balloons spawn below the bottom edge and
/// rise (y decreasing) until they pass `OFFSCREEN_Y` above the top.

use crate::domain::balloon::{Balloon, BalloonId};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    /// Before the first round, or after the summary was dismissed.
    Idle,
    Running,
    /// Round over; summary overlay visible.
    Ended,
}

/// Floating "+2" / "-3" near where a balloon popped.
#[derive(Clone, Debug)]
pub struct PopText {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub text: String,
}

/// Shown on the end-of-round overlay.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Summary {
    pub score: i32,
    pub new_best: bool,
}

pub struct WorldState {
    // ── Session ──
    pub phase: Phase,
    pub score: i32,
    pub time_left: u32,
    pub best: i32,
    pub summary: Option<Summary>,

    // ── Stage ──
    pub stage_w: f64,
    pub stage_h: f64,
    pub balloons: Vec<Balloon>,
    pub pop_texts: Vec<PopText>,

    // ── UI ──
    pub message: String,
    pub sound_on: bool,
    pub music_on: bool,
}

pub const DEFAULT_STAGE_W: f64 = 640.0;
pub const DEFAULT_STAGE_H: f64 = 360.0;

impl WorldState {
    pub fn new(duration_secs: u32) -> Self {
        WorldState {
            phase: Phase::Idle,
            score: 0,
            time_left: duration_secs,
            best: 0,
            summary: None,
            stage_w: DEFAULT_STAGE_W,
            stage_h: DEFAULT_STAGE_H,
            balloons: Vec::new(),
            pop_texts: Vec::new(),
            message: String::new(),
            sound_on: true,
            music_on: true,
        }
    }

    #[inline]
    pub fn running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// Topmost live balloon under the pointer. Later spawns draw on top.
    pub fn balloon_at(&self, px: f64, py: f64) -> Option<BalloonId> {
        self.balloons.iter()
            .rev()
            .find(|b| b.is_alive() && b.contains(px, py))
            .map(|b| b.id)
    }

    /// Remove every balloon and floating text from the stage.
    pub fn clear_stage(&mut self) {
        self.balloons.clear();
        self.pop_texts.clear();
    }
}
