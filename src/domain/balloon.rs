/// Balloon catalog and the per-balloon lifecycle.
///
/// A balloon is a two-state machine:
///
///   Alive ──(tap)──────→ Removed
///   Alive ──(off-top)──→ Removed   (miss, no score)
///   Alive ──(not running on next step)──→ Removed
///
/// There is no transition back to `Alive`.

/// Feedback cue played when a balloon of a given kind pops.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Cue {
    Pop,
    Bad,
    Bonus,
}

/// One entry of the static balloon catalog.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct BalloonKind {
    pub name: &'static str,
    pub color: (u8, u8, u8),
    pub points: i32,
    pub cue: Cue,
    pub weight: f64,
}

/// Fixed-order catalog. Order matters for the weighted draw.
pub const CATALOG: [BalloonKind; 4] = [
    BalloonKind { name: "red",   color: (0xfb, 0x71, 0x85), points: 1,  cue: Cue::Pop,   weight: 52.0 },
    BalloonKind { name: "blue",  color: (0x60, 0xa5, 0xfa), points: 2,  cue: Cue::Pop,   weight: 32.0 },
    BalloonKind { name: "gold",  color: (0xfb, 0xbf, 0x24), points: 5,  cue: Cue::Bonus, weight: 10.0 },
    BalloonKind { name: "black", color: (0x0f, 0x17, 0x2a), points: -3, cue: Cue::Bad,   weight: 6.0  },
];

/// Balloons above this y (stage px) have left the screen.
pub const OFFSCREEN_Y: f64 = -140.0;

pub type BalloonId = u64;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Lifecycle {
    Alive,
    Removed,
}

/// Result of advancing one balloon by one display frame.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StepOutcome {
    /// Still rising and on screen.
    Rising,
    /// Crossed the top threshold unpopped.
    Missed,
    /// Session stopped or balloon already popped; terminated quietly.
    Cancelled,
}

#[derive(Clone, Debug)]
pub struct Balloon {
    pub id: BalloonId,
    pub kind: BalloonKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub speed: f64,
    pub state: Lifecycle,
}

impl Balloon {
    pub fn new(id: BalloonId, kind: BalloonKind, x: f64, y: f64, width: f64, speed: f64) -> Self {
        Balloon {
            id,
            kind,
            x, y,
            width,
            height: width * 1.25,
            speed,
            state: Lifecycle::Alive,
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.state == Lifecycle::Alive
    }

    /// Advance one frame. `running` is the session flag as seen right now;
    /// a stopped session cancels the balloon on its next step.
    pub fn step(&mut self, running: bool, rise_step: f64) -> StepOutcome {
        if !running || !self.is_alive() {
            self.state = Lifecycle::Removed;
            return StepOutcome::Cancelled;
        }

        self.y -= self.speed * rise_step;

        if self.y < OFFSCREEN_Y {
            self.state = Lifecycle::Removed;
            return StepOutcome::Missed;
        }
        StepOutcome::Rising
    }

    /// Mark popped. Returns false if the balloon was already removed,
    /// which makes a second tap a no-op.
    pub fn pop(&mut self) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.state = Lifecycle::Removed;
        true
    }

    /// Point-in-rect hit test in stage px.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px < self.x + self.width
            && py >= self.y && py < self.y + self.height
    }
}
