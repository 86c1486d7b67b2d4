/// Tone-synthesizer seam between game logic and the audio backend.
///
/// The controller decides *whether* a sound should play (toggles, session
/// state); an implementation only knows *how*. Every method is
/// best-effort: failures are swallowed inside the implementation.

use crate::domain::balloon::Cue;

pub trait ToneSynth {
    /// Play a short feedback cue, fire-and-forget.
    fn play_cue(&mut self, cue: Cue);

    /// Start or stop the ambient loop. Idempotent in both directions:
    /// enabling twice keeps a single loop, disabling a stopped loop is a
    /// no-op.
    fn set_ambient(&mut self, enabled: bool);
}

/// Does nothing. Used when no output device is available.
#[derive(Default)]
pub struct SilentSynth;

impl ToneSynth for SilentSynth {
    fn play_cue(&mut self, _cue: Cue) {}
    fn set_ambient(&mut self, _enabled: bool) {}
}
