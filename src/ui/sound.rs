/// Sound engine: procedural feedback cues and an ambient drone via rodio.
///
/// Cues are rendered once at init into in-memory WAV buffers and played
/// fire-and-forget through a detached Sink. The ambient drone is an
/// endless rodio Source held in its own Sink so it can be stopped.
///
/// Compile with `--no-default-features` or without "sound" feature
/// to disable audio entirely (`SoundEngine::new()` then returns None and
/// the caller falls back to a silent synth).

use std::f32::consts::TAU;

use crate::domain::balloon::Cue;

#[cfg_attr(not(feature = "sound"), allow(dead_code))]
const SAMPLE_RATE: u32 = 22050;

/// Every cue oscillator is stopped this long after it starts.
const CUE_CUT: f32 = 0.2;

// ════════════════════════════════════════════════════════════
//  Cue profiles
// ════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Wave {
    Sine,
    Triangle,
    Sawtooth,
    Square,
}

impl Wave {
    /// One cycle, `phase` in [0, 1).
    fn sample(self, phase: f32) -> f32 {
        match self {
            Wave::Sine => (phase * TAU).sin(),
            Wave::Triangle => 4.0 * (phase - 0.5).abs() - 1.0,
            Wave::Sawtooth => 2.0 * phase - 1.0,
            Wave::Square => if phase < 0.5 { 1.0 } else { -1.0 },
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Ramp {
    /// Jump to the value at `at`.
    Step,
    /// Exponential glide from the previous point, arriving at `at`.
    Exp,
}

/// Automation point: reach `value` at `at` seconds.
#[derive(Clone, Copy, Debug)]
struct Point {
    at: f32,
    value: f32,
    ramp: Ramp,
}

const fn pt(at: f32, value: f32, ramp: Ramp) -> Point {
    Point { at, value, ramp }
}

struct CueProfile {
    wave: Wave,
    freq: &'static [Point],
    gain: &'static [Point],
}

const POP: CueProfile = CueProfile {
    wave: Wave::Triangle,
    freq: &[pt(0.0, 520.0, Ramp::Step), pt(0.08, 260.0, Ramp::Exp)],
    gain: &[pt(0.0, 0.0001, Ramp::Step), pt(0.01, 0.18, Ramp::Exp), pt(0.10, 0.0001, Ramp::Exp)],
};

const BAD: CueProfile = CueProfile {
    wave: Wave::Sawtooth,
    freq: &[pt(0.0, 180.0, Ramp::Step), pt(0.12, 90.0, Ramp::Exp)],
    gain: &[pt(0.0, 0.0001, Ramp::Step), pt(0.02, 0.16, Ramp::Exp), pt(0.14, 0.0001, Ramp::Exp)],
};

const BONUS: CueProfile = CueProfile {
    wave: Wave::Square,
    freq: &[pt(0.0, 660.0, Ramp::Step), pt(0.06, 880.0, Ramp::Step)],
    gain: &[pt(0.0, 0.0001, Ramp::Step), pt(0.01, 0.14, Ramp::Exp), pt(0.16, 0.0001, Ramp::Exp)],
};

fn profile(cue: Cue) -> &'static CueProfile {
    match cue {
        Cue::Pop => &POP,
        Cue::Bad => &BAD,
        Cue::Bonus => &BONUS,
    }
}

/// Value of an automation curve at time `t`.
fn automation(points: &[Point], t: f32) -> f32 {
    let Some(first) = points.first() else { return 0.0 };
    let mut prev = *first;
    for p in &points[1..] {
        if t < p.at {
            return match p.ramp {
                Ramp::Step => prev.value,
                Ramp::Exp => {
                    let span = (p.at - prev.at).max(f32::EPSILON);
                    let x = ((t - prev.at) / span).clamp(0.0, 1.0);
                    prev.value * (p.value / prev.value).powf(x)
                }
            };
        }
        prev = *p;
    }
    prev.value
}

/// Render a cue as mono samples at `rate`.
#[cfg_attr(not(feature = "sound"), allow(dead_code))]
pub fn render_cue(cue: Cue, rate: u32) -> Vec<f32> {
    let prof = profile(cue);
    let n = (rate as f32 * CUE_CUT) as usize;
    let mut phase = 0.0_f32;
    (0..n)
        .map(|i| {
            let t = i as f32 / rate as f32;
            let s = prof.wave.sample(phase) * automation(prof.gain, t);
            phase = (phase + automation(prof.freq, t) / rate as f32).fract();
            s
        })
        .collect()
}

/// Instantaneous frequency of a cue at `t` seconds.
#[cfg(test)]
fn cue_frequency(cue: Cue, t: f32) -> f32 {
    automation(profile(cue).freq, t)
}

// ════════════════════════════════════════════════════════════
//  Ambient drone: sine 220 Hz, 1.2 Hz vibrato of ±30 Hz, low gain
// ════════════════════════════════════════════════════════════

const AMBIENT_BASE_HZ: f32 = 220.0;
const AMBIENT_LFO_HZ: f32 = 1.2;
const AMBIENT_DEPTH_HZ: f32 = 30.0;
const AMBIENT_GAIN: f32 = 0.03;

/// Endless ambient oscillator. Iterates mono samples forever.
#[cfg_attr(not(feature = "sound"), allow(dead_code))]
pub struct AmbientTone {
    rate: u32,
    n: u64,
    phase: f32,
}

#[cfg_attr(not(feature = "sound"), allow(dead_code))]
impl AmbientTone {
    pub fn new(rate: u32) -> Self {
        AmbientTone { rate, n: 0, phase: 0.0 }
    }

    fn frequency_at(&self, t: f32) -> f32 {
        AMBIENT_BASE_HZ + AMBIENT_DEPTH_HZ * (t * AMBIENT_LFO_HZ * TAU).sin()
    }
}

impl Iterator for AmbientTone {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        // Wrap the clock every 50 s (60 LFO cycles) to keep f32 precise.
        let t = (self.n % (self.rate as u64 * 50)) as f32 / self.rate as f32;
        let s = Wave::Sine.sample(self.phase) * AMBIENT_GAIN;
        self.phase = (self.phase + self.frequency_at(t) / self.rate as f32).fract();
        self.n += 1;
        Some(s)
    }
}

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;
    use std::time::Duration;

    use rodio::{OutputStream, OutputStreamHandle, Sink, Source};

    use super::{render_cue, AmbientTone, SAMPLE_RATE};
    use crate::domain::balloon::Cue;
    use crate::sim::audio::ToneSynth;

    impl Source for AmbientTone {
        fn current_frame_len(&self) -> Option<usize> { None }
        fn channels(&self) -> u16 { 1 }
        fn sample_rate(&self) -> u32 { self.rate }
        fn total_duration(&self) -> Option<Duration> { None }
    }

    /// Pre-generated WAV buffers for each cue plus the ambient sink.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_pop: Arc<Vec<u8>>,
        sfx_bad: Arc<Vec<u8>>,
        sfx_bonus: Arc<Vec<u8>>,
        ambient: Option<Sink>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    log::warn!("no audio output, running silent: {e}");
                    return None;
                }
            };

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_pop: Arc::new(make_wav(&render_cue(Cue::Pop, SAMPLE_RATE))),
                sfx_bad: Arc::new(make_wav(&render_cue(Cue::Bad, SAMPLE_RATE))),
                sfx_bonus: Arc::new(make_wav(&render_cue(Cue::Bonus, SAMPLE_RATE))),
                ambient: None,
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            match Sink::try_new(&self.handle) {
                Ok(sink) => {
                    let cursor = Cursor::new(buf.as_ref().clone());
                    match rodio::Decoder::new(cursor) {
                        Ok(src) => {
                            sink.append(src);
                            sink.detach(); // fire-and-forget
                        }
                        Err(e) => log::debug!("cue decode failed: {e}"),
                    }
                }
                Err(e) => log::debug!("cue playback failed: {e}"),
            }
        }
    }

    impl ToneSynth for SoundEngine {
        fn play_cue(&mut self, cue: Cue) {
            let buf = match cue {
                Cue::Pop => &self.sfx_pop,
                Cue::Bad => &self.sfx_bad,
                Cue::Bonus => &self.sfx_bonus,
            };
            self.play(buf);
        }

        fn set_ambient(&mut self, enabled: bool) {
            if !enabled {
                if let Some(sink) = self.ambient.take() {
                    sink.stop();
                }
                return;
            }
            if self.ambient.is_some() {
                return;
            }
            match Sink::try_new(&self.handle) {
                Ok(sink) => {
                    sink.append(AmbientTone::new(SAMPLE_RATE));
                    self.ambient = Some(sink);
                }
                Err(e) => log::debug!("ambient playback failed: {e}"),
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a 16-bit PCM WAV buffer
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }

}

// ════════════════════════════════════════════════════════════
//  Public API
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { None }
}

#[cfg(not(feature = "sound"))]
impl crate::sim::audio::ToneSynth for SoundEngine {
    fn play_cue(&mut self, _cue: Cue) {}
    fn set_ambient(&mut self, _enabled: bool) {}
}
