/// Input state tracker.
///
/// Collects, per frame:
///   - Key presses (edge-triggered; Release and Repeat are ignored)
///   - Left-button pointer-downs as terminal cells ("taps")
///
/// A terminal may deliver the same physical click more than once
/// (press reported by both the mouse protocol and a focus hack, or a
/// trackpad double report). `TapFilter` collapses pointer-downs on the same
/// cell within `TAP_DEDUP` into one tap so a click never pops twice.

use std::time::{Duration, Instant};

use crossterm::event::{
    self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};

pub const TAP_DEDUP: Duration = Duration::from_millis(60);

/// Pointer-down on a terminal cell.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Tap {
    pub col: u16,
    pub row: u16,
}

/// Drops a pointer-down that repeats the previous one on the same cell
/// within the dedup window.
#[derive(Default)]
pub struct TapFilter {
    last: Option<(Tap, Instant)>,
}

impl TapFilter {
    pub fn accept(&mut self, tap: Tap, at: Instant) -> bool {
        if let Some((prev, when)) = self.last {
            if prev == tap && at.saturating_duration_since(when) < TAP_DEDUP {
                return false;
            }
        }
        self.last = Some((tap, at));
        true
    }
}

pub struct InputState {
    /// Keys pressed during the most recent drain_events() call.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for meta-key handling.
    raw_events: Vec<KeyEvent>,

    /// Accepted taps, oldest first.
    pub taps: Vec<Tap>,

    tap_filter: TapFilter,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            taps: Vec::with_capacity(4),
            tap_filter: TapFilter::default(),
        }
    }

    /// Drain all pending terminal events.
    /// Call this once per frame, before advancing the session.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();
        self.taps.clear();

        // Read all available events without blocking
        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(key)) => {
                    if key.kind == KeyEventKind::Press {
                        self.raw_events.push(key);
                        self.fresh_presses.push(key.code);
                    }
                }
                Ok(Event::Mouse(m)) => {
                    if m.kind == MouseEventKind::Down(MouseButton::Left) {
                        let tap = Tap { col: m.column, row: m.row };
                        if self.tap_filter.accept(tap, Instant::now()) {
                            self.taps.push(tap);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Was this key pressed this frame?
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    /// Convenience: was any of these keys pressed?
    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    /// Check if any raw event this frame has Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}
