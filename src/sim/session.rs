/// The session controller: one object owns the whole round.
///
/// ## States
///
///   Idle ──start──→ Running ──end──→ Ended ──start──→ Running
///                                     └──dismiss──→ Idle
///
/// ## Scheduling
///
/// Everything runs on the caller's thread. `advance(dt)` moves the virtual
/// clock and fires due timers (countdown, spawner, message/pop-text expiry,
/// delayed stage clear); `frame()` steps every live balloon once. `end()`
/// cancels the countdown and spawner handles synchronously, so nothing
/// spawned or stepped afterwards can score. Balloons still on screen see
/// the stopped session on their next step and remove themselves.

use rand::rngs::StdRng;

use crate::config::{GameConfig, MotionConfig, SpawnConfig};
use crate::domain::balloon::{Balloon, BalloonId, BalloonKind, StepOutcome};
use crate::domain::picker::pick_kind;
use crate::domain::rules::{self, PopNotice};
use super::audio::ToneSynth;
use super::event::GameEvent;
use super::save::BestStore;
use super::timers::{TimerId, Timers};
use super::world::{Phase, PopText, Summary, WorldState};

const COUNTDOWN_MS: u64 = 1000;
const MESSAGE_MS: u64 = 1200;
const POP_TEXT_MS: u64 = 600;
/// Grace period before the stage is wiped after a round ends.
const STAGE_CLEAR_MS: u64 = 900;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Job {
    Countdown,
    Spawn,
    ClearStage,
    ClearMessage { generation: u64 },
    ExpirePopText { id: u64 },
}

pub struct Session {
    world: WorldState,
    duration: u32,
    spawn_cfg: SpawnConfig,
    motion: MotionConfig,

    timers: Timers<Job>,
    countdown: Option<TimerId>,
    spawner: Option<TimerId>,
    stage_clear: Option<TimerId>,

    rng: StdRng,
    synth: Box<dyn ToneSynth>,
    store: Box<dyn BestStore>,

    message_generation: u64,
    next_balloon_id: BalloonId,
    next_text_id: u64,
    events: Vec<GameEvent>,
}

// ── Construction / accessors ──

impl Session {
    /// Build an idle session. The stored best is read once, here; a read
    /// failure counts as 0.
    pub fn new(
        config: &GameConfig,
        synth: Box<dyn ToneSynth>,
        store: Box<dyn BestStore>,
        rng: StdRng,
    ) -> Self {
        let duration = config.round.duration_secs;
        let mut world = WorldState::new(duration);
        world.best = match store.load() {
            Ok(best) => best,
            Err(e) => {
                log::warn!("best score unavailable, starting from 0: {e}");
                0
            }
        };
        world.sound_on = config.audio.sound;
        world.music_on = config.audio.music;

        Session {
            world,
            duration,
            spawn_cfg: config.spawn.clone(),
            motion: config.motion.clone(),
            timers: Timers::new(),
            countdown: None,
            spawner: None,
            stage_clear: None,
            rng,
            synth,
            store,
            message_generation: 0,
            next_balloon_id: 0,
            next_text_id: 0,
            events: Vec::new(),
        }
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn is_running(&self) -> bool {
        self.world.running()
    }

    /// Renderer reports the play area size in stage px.
    pub fn set_stage_size(&mut self, w: f64, h: f64) {
        self.world.stage_w = w;
        self.world.stage_h = h;
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}

// ── Lifecycle ──

impl Session {
    /// Begin a fresh round. No-op (returns false) while already running.
    pub fn start(&mut self) -> bool {
        if self.world.running() {
            return false;
        }

        if let Some(id) = self.stage_clear.take() {
            self.timers.cancel(id);
        }
        self.world.clear_stage();
        self.world.score = 0;
        self.world.time_left = self.duration;
        self.world.summary = None;
        self.world.phase = Phase::Running;

        self.countdown = Some(self.timers.schedule_every(COUNTDOWN_MS, Job::Countdown));

        if self.world.music_on {
            self.synth.set_ambient(true);
        }

        self.flash("Go!");
        self.events.push(GameEvent::SessionStarted);
        log::info!("round started ({}s)", self.duration);

        // The first balloon appears immediately; the rest follow the schedule.
        self.spawn_balloon();
        self.schedule_next_spawn();
        true
    }

    /// Stop the round. No-op (returns false) unless running.
    pub fn end(&mut self) -> bool {
        if !self.world.running() {
            return false;
        }
        self.world.phase = Phase::Ended;

        if let Some(id) = self.countdown.take() {
            self.timers.cancel(id);
        }
        if let Some(id) = self.spawner.take() {
            self.timers.cancel(id);
        }
        self.synth.set_ambient(false);

        let score = self.world.score;
        let new_best = self.persist_best_if_needed();

        // The record notice is superseded at once; the summary carries it.
        if new_best {
            self.flash("New record!");
        }
        self.flash(&format!("Time's up: {} points", score));
        self.world.summary = Some(Summary { score, new_best });
        self.stage_clear = Some(self.timers.schedule(STAGE_CLEAR_MS, Job::ClearStage));

        self.events.push(GameEvent::SessionEnded { score });
        log::info!("round ended: score={} best={}", score, self.world.best);
        true
    }

    /// End the current round (if any) and immediately start a new one.
    pub fn restart(&mut self) {
        self.end();
        self.start();
    }

    /// Leave the summary overlay for the title overlay.
    pub fn dismiss(&mut self) -> bool {
        if self.world.phase != Phase::Ended {
            return false;
        }
        self.world.phase = Phase::Idle;
        self.world.summary = None;
        true
    }

    fn persist_best_if_needed(&mut self) -> bool {
        let score = self.world.score;
        if !rules::is_new_best(score, self.world.best) {
            return false;
        }
        self.world.best = score;
        if let Err(e) = self.store.store(score) {
            log::warn!("could not save best score: {e}");
        }
        self.events.push(GameEvent::NewBest { score });
        true
    }
}

// ── Clock ──

impl Session {
    /// Advance the virtual clock by `dt_ms`, firing every timer that comes
    /// due in between, in order.
    pub fn advance(&mut self, dt_ms: u64) {
        let until = self.timers.now_ms() + dt_ms;
        while let Some((_, job)) = self.timers.next_due(until) {
            self.run_job(job);
        }
        self.timers.settle(until);
    }

    fn run_job(&mut self, job: Job) {
        match job {
            Job::Countdown => self.tick_countdown(),
            Job::Spawn => {
                self.spawner = None;
                if self.world.running() {
                    self.spawn_balloon();
                    self.schedule_next_spawn();
                }
            }
            Job::ClearStage => {
                self.stage_clear = None;
                self.world.clear_stage();
            }
            Job::ClearMessage { generation } => {
                if generation == self.message_generation {
                    self.world.message.clear();
                }
            }
            Job::ExpirePopText { id } => {
                self.world.pop_texts.retain(|t| t.id != id);
            }
        }
    }

    fn tick_countdown(&mut self) {
        if !self.world.running() {
            return;
        }
        self.world.time_left = self.world.time_left.saturating_sub(1);
        self.events.push(GameEvent::CountdownTick { time_left: self.world.time_left });
        if self.world.time_left == 0 {
            self.end();
        }
    }
}

// ── Spawner ──

impl Session {
    fn schedule_next_spawn(&mut self) {
        let delay = rules::spawn_delay_ms(
            &self.spawn_cfg, self.duration, self.world.time_left, &mut self.rng,
        );
        self.spawner = Some(self.timers.schedule(delay, Job::Spawn));
    }

    fn spawn_balloon(&mut self) -> BalloonId {
        let kind = pick_kind(&mut self.rng);
        let (x, y, width) = rules::spawn_placement(
            self.world.stage_w, self.world.stage_h, &mut self.rng,
        );
        let speed = rules::launch_speed(
            &self.motion, self.duration, self.world.time_left, &mut self.rng,
        );
        self.add_balloon(kind, x, y, width, speed)
    }

    fn add_balloon(&mut self, kind: BalloonKind, x: f64, y: f64, width: f64, speed: f64) -> BalloonId {
        let id = self.next_balloon_id;
        self.next_balloon_id += 1;
        self.world.balloons.push(Balloon::new(id, kind, x, y, width, speed));
        self.events.push(GameEvent::BalloonSpawned { id, kind: kind.name });
        log::debug!("spawn #{id} {} at x={x:.0} speed={speed:.2}", kind.name);
        id
    }
}

// ── Animation ──

impl Session {
    /// One display refresh: every balloon takes its own step.
    pub fn frame(&mut self) {
        let running = self.world.running();
        let rise = self.motion.rise_step;
        for b in &mut self.world.balloons {
            if b.step(running, rise) == StepOutcome::Missed {
                self.events.push(GameEvent::BalloonMissed { id: b.id });
                log::debug!("miss #{}", b.id);
            }
        }
        self.world.balloons.retain(|b| b.is_alive());
    }
}

// ── Input ──

impl Session {
    /// Pointer down at stage px. Pops the topmost live balloon under it.
    pub fn tap(&mut self, px: f64, py: f64) -> Option<BalloonId> {
        if !self.world.running() {
            return None;
        }
        let id = self.world.balloon_at(px, py)?;
        self.pop(id, px, py).then_some(id)
    }

    /// Pop a specific balloon. Returns false, with no effect at all, when
    /// the round is over or the balloon is no longer alive.
    pub fn pop(&mut self, id: BalloonId, px: f64, py: f64) -> bool {
        if !self.world.running() {
            return false;
        }
        let Some(balloon) = self.world.balloons.iter_mut().find(|b| b.id == id) else {
            return false;
        };
        if !balloon.pop() {
            return false;
        }
        let kind = balloon.kind;
        self.world.balloons.retain(|b| b.id != id);

        self.world.score += kind.points;

        let text_id = self.next_text_id;
        self.next_text_id += 1;
        self.world.pop_texts.push(PopText {
            id: text_id,
            x: px,
            y: py,
            text: rules::pop_label(kind.points),
        });
        self.timers.schedule(POP_TEXT_MS, Job::ExpirePopText { id: text_id });

        if self.world.sound_on {
            self.synth.play_cue(kind.cue);
        }
        match rules::pop_notice(kind.points) {
            Some(PopNotice::Bonus) => self.flash("BONUS!"),
            Some(PopNotice::Penalty) => self.flash("OUCH! Bad balloon"),
            None => {}
        }

        self.events.push(GameEvent::BalloonPopped { id, points: kind.points });
        log::debug!("pop #{id} {} {:+} -> {}", kind.name, kind.points, self.world.score);
        true
    }

    pub fn toggle_sound(&mut self) {
        self.world.sound_on = !self.world.sound_on;
        self.flash(if self.world.sound_on { "Sound ON" } else { "Sound OFF" });
    }

    /// Music off stops the ambient loop at once; music on restarts it only
    /// during a round.
    pub fn toggle_music(&mut self) {
        self.world.music_on = !self.world.music_on;
        if !self.world.music_on {
            self.synth.set_ambient(false);
        } else if self.world.running() {
            self.synth.set_ambient(true);
        }
        self.flash(if self.world.music_on { "Music ON" } else { "Music OFF" });
    }

    /// Show a status line that clears itself unless replaced first.
    fn flash(&mut self, text: &str) {
        self.world.message = text.to_string();
        self.message_generation += 1;
        self.timers.schedule(MESSAGE_MS, Job::ClearMessage { generation: self.message_generation });
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use rand::SeedableRng;

    use super::*;
    use crate::domain::balloon::{Cue, CATALOG};
    use crate::sim::audio::testing::{RecordingSynth, SynthLog};
    use crate::sim::save::{MemoryStore, SaveError};

    const RED: BalloonKind = CATALOG[0];
    const BLUE: BalloonKind = CATALOG[1];
    const GOLD: BalloonKind = CATALOG[2];
    const BLACK: BalloonKind = CATALOG[3];

    /// Store whose contents the test can inspect after handing it over.
    #[derive(Clone, Default)]
    struct SharedStore(Rc<RefCell<Option<i32>>>);

    impl BestStore for SharedStore {
        fn load(&self) -> Result<i32, SaveError> {
            Ok(self.0.borrow().unwrap_or(0))
        }
        fn store(&mut self, best: i32) -> Result<(), SaveError> {
            *self.0.borrow_mut() = Some(best);
            Ok(())
        }
    }

    struct BrokenStore;

    impl BestStore for BrokenStore {
        fn load(&self) -> Result<i32, SaveError> {
            Err(SaveError::Malformed { key: "balloon_best_v1", value: "NaN".into() })
        }
        fn store(&mut self, _best: i32) -> Result<(), SaveError> {
            Err(SaveError::Io {
                path: "best.dat".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }
    }

    fn session_with(store: Box<dyn BestStore>, seed: u64) -> (Session, Rc<RefCell<SynthLog>>) {
        let synth = RecordingSynth::default();
        let log = synth.log.clone();
        let s = Session::new(
            &GameConfig::default(),
            Box::new(synth),
            store,
            StdRng::seed_from_u64(seed),
        );
        (s, log)
    }

    fn session() -> (Session, Rc<RefCell<SynthLog>>) {
        session_with(Box::new(MemoryStore::default()), 42)
    }

    /// Place a balloon on screen at a known spot (80 x 100 px box).
    fn place(s: &mut Session, kind: BalloonKind, x: f64, y: f64) -> BalloonId {
        s.add_balloon(kind, x, y, 80.0, 1.0)
    }

    fn count(events: &[GameEvent], pred: impl Fn(&GameEvent) -> bool) -> usize {
        events.iter().filter(|&e| pred(e)).count()
    }

    // ── Lifecycle ──

    #[test]
    fn new_session_is_idle_with_loaded_best() {
        let store = SharedStore::default();
        *store.0.borrow_mut() = Some(12);
        let (s, _) = session_with(Box::new(store), 1);
        let w = s.world();
        assert_eq!(w.phase, Phase::Idle);
        assert_eq!(w.best, 12);
        assert_eq!(w.time_left, 30);
        assert!(w.balloons.is_empty());
    }

    #[test]
    fn start_resets_and_spawns_first_balloon_immediately() {
        let (mut s, synth) = session();
        assert!(s.start());
        let w = s.world();
        assert_eq!(w.phase, Phase::Running);
        assert_eq!(w.score, 0);
        assert_eq!(w.time_left, 30);
        assert_eq!(w.balloons.len(), 1);
        assert_eq!(w.message, "Go!");
        assert!(synth.borrow().ambient_on);

        let events = s.drain_events();
        assert_eq!(events[0], GameEvent::SessionStarted);
        assert_eq!(count(&events, |e| matches!(e, GameEvent::BalloonSpawned { .. })), 1);
    }

    #[test]
    fn start_while_running_is_noop() {
        let (mut s, synth) = session();
        s.start();
        s.advance(3000);
        let time_left = s.world().time_left;
        let balloons = s.world().balloons.len();
        assert!(!s.start());
        assert_eq!(s.world().time_left, time_left);
        assert_eq!(s.world().balloons.len(), balloons);
        assert_eq!(synth.borrow().ambient_starts, 1);
    }

    #[test]
    fn end_only_from_running() {
        let (mut s, _) = session();
        assert!(!s.end());
        s.start();
        assert!(s.end());
        assert!(!s.end());
        assert_eq!(count(&s.drain_events(), |e| matches!(e, GameEvent::SessionEnded { .. })), 1);
    }

    #[test]
    fn countdown_ends_round_after_exactly_thirty_ticks() {
        let (mut s, synth) = session();
        s.start();
        for expected in (1..30).rev() {
            s.advance(1000);
            assert!(s.is_running());
            assert_eq!(s.world().time_left, expected);
        }
        s.advance(1000);
        assert_eq!(s.world().phase, Phase::Ended);
        assert_eq!(s.world().time_left, 0);
        assert!(!synth.borrow().ambient_on);

        s.advance(10_000);
        let events = s.drain_events();
        assert_eq!(count(&events, |e| matches!(e, GameEvent::CountdownTick { .. })), 30);
        assert_eq!(count(&events, |e| matches!(e, GameEvent::SessionEnded { .. })), 1);
    }

    #[test]
    fn one_big_advance_still_ends_once() {
        let (mut s, _) = session();
        s.start();
        s.advance(120_000);
        assert_eq!(s.world().phase, Phase::Ended);
        let events = s.drain_events();
        assert_eq!(count(&events, |e| matches!(e, GameEvent::SessionEnded { .. })), 1);
    }

    #[test]
    fn dismiss_returns_to_idle() {
        let (mut s, _) = session();
        assert!(!s.dismiss());
        s.start();
        assert!(!s.dismiss());
        s.end();
        assert!(s.world().summary.is_some());
        assert!(s.dismiss());
        assert_eq!(s.world().phase, Phase::Idle);
        assert!(s.world().summary.is_none());
    }

    // ── Spawner ──

    #[test]
    fn spawn_count_over_a_round_matches_pacing() {
        let (mut s, _) = session();
        s.start();
        for _ in 0..(30_000 / 16 + 1) {
            s.advance(16);
        }
        assert!(!s.is_running());
        let spawned = count(&s.drain_events(), |e| matches!(e, GameEvent::BalloonSpawned { .. }));
        // Mean gap lies between 520 ms and 940 ms.
        assert!((30..=60).contains(&spawned), "spawned {spawned}");
    }

    #[test]
    fn no_spawns_after_end() {
        let (mut s, _) = session();
        s.start();
        s.advance(2500);
        s.end();
        s.drain_events();
        s.advance(20_000);
        let events = s.drain_events();
        assert_eq!(count(&events, |e| matches!(e, GameEvent::BalloonSpawned { .. })), 0);
        assert_eq!(count(&events, |e| matches!(e, GameEvent::CountdownTick { .. })), 0);
    }

    #[test]
    fn spawned_balloons_start_below_stage_and_rise() {
        let (mut s, _) = session();
        s.set_stage_size(400.0, 300.0);
        s.start();
        let b = s.world().balloons[0].clone();
        assert!((b.y - 420.0).abs() < 1e-9);
        assert!(b.width >= 62.0 && b.width < 92.0);
        s.frame();
        let after = &s.world().balloons[0];
        assert!((after.y - (b.y - b.speed * 2.2)).abs() < 1e-9);
    }

    // ── Animation ──

    #[test]
    fn miss_has_no_score_effect() {
        let (mut s, _) = session();
        s.start();
        let id = place(&mut s, GOLD, 100.0, -139.0);
        s.frame();
        assert!(s.world().balloons.iter().all(|b| b.id != id));
        assert_eq!(s.world().score, 0);
        assert!(s.drain_events().contains(&GameEvent::BalloonMissed { id }));
    }

    #[test]
    fn end_cancels_in_flight_balloons_on_next_frame() {
        let (mut s, _) = session();
        s.start();
        place(&mut s, RED, 100.0, 100.0);
        s.end();
        assert!(!s.world().balloons.is_empty());
        s.frame();
        assert!(s.world().balloons.is_empty());
        let events = s.drain_events();
        assert_eq!(count(&events, |e| matches!(e, GameEvent::BalloonMissed { .. })), 0);
    }

    // ── Pop ──

    #[test]
    fn pop_adds_points_once() {
        let (mut s, synth) = session();
        s.start();
        let id = place(&mut s, BLUE, 100.0, 100.0);
        assert!(s.pop(id, 120.0, 120.0));
        assert_eq!(s.world().score, 2);
        assert!(!s.pop(id, 120.0, 120.0));
        assert_eq!(s.world().score, 2);
        assert_eq!(synth.borrow().cues, vec![Cue::Pop]);
        assert_eq!(s.world().pop_texts[0].text, "+2");
    }

    #[test]
    fn tap_after_miss_is_noop() {
        let (mut s, _) = session();
        s.start();
        let id = place(&mut s, RED, 100.0, -139.0);
        s.frame();
        assert!(!s.pop(id, 110.0, -130.0));
        assert_eq!(s.world().score, 0);
    }

    #[test]
    fn score_goes_negative_without_clamping() {
        let (mut s, synth) = session();
        s.start();
        for _ in 0..3 {
            let id = place(&mut s, BLACK, 10.0, 10.0);
            assert!(s.pop(id, 20.0, 20.0));
        }
        assert_eq!(s.world().score, -9);
        assert_eq!(s.world().message, "OUCH! Bad balloon");
        assert_eq!(s.world().pop_texts.last().unwrap().text, "-3");
        assert_eq!(synth.borrow().cues, vec![Cue::Bad; 3]);
    }

    #[test]
    fn gold_flashes_bonus() {
        let (mut s, synth) = session();
        s.start();
        let id = place(&mut s, GOLD, 10.0, 10.0);
        s.pop(id, 20.0, 20.0);
        assert_eq!(s.world().score, 5);
        assert_eq!(s.world().message, "BONUS!");
        assert_eq!(synth.borrow().cues, vec![Cue::Bonus]);
    }

    #[test]
    fn tap_hits_topmost_balloon() {
        let (mut s, _) = session();
        s.start();
        let under = place(&mut s, RED, 100.0, 100.0);
        let over = place(&mut s, BLUE, 120.0, 120.0);
        assert_eq!(s.tap(150.0, 150.0), Some(over));
        assert_eq!(s.tap(150.0, 150.0), Some(under));
        assert_eq!(s.tap(150.0, 150.0), None);
        assert_eq!(s.world().score, 3);
    }

    #[test]
    fn tap_on_empty_stage_is_noop() {
        let (mut s, _) = session();
        s.start();
        assert_eq!(s.tap(1.0, 1.0), None);
        assert_eq!(s.world().score, 0);
    }

    #[test]
    fn nothing_scores_after_end() {
        let (mut s, synth) = session();
        s.start();
        let id = place(&mut s, GOLD, 100.0, 100.0);
        s.end();
        assert_eq!(s.tap(110.0, 110.0), None);
        assert!(!s.pop(id, 110.0, 110.0));
        assert_eq!(s.world().score, 0);
        assert!(synth.borrow().cues.is_empty());
    }

    #[test]
    fn pop_text_expires() {
        let (mut s, _) = session();
        s.start();
        let id = place(&mut s, RED, 100.0, 100.0);
        s.pop(id, 110.0, 110.0);
        s.advance(599);
        assert_eq!(s.world().pop_texts.len(), 1);
        s.advance(1);
        assert!(s.world().pop_texts.is_empty());
    }

    // ── Best score ──

    fn play_round_scoring(s: &mut Session, points: &[BalloonKind]) {
        s.start();
        for &kind in points {
            let id = place(s, kind, 10.0, 10.0);
            assert!(s.pop(id, 20.0, 20.0));
        }
        s.end();
    }

    #[test]
    fn lower_score_keeps_best() {
        let store = SharedStore::default();
        *store.0.borrow_mut() = Some(10);
        let (mut s, _) = session_with(Box::new(store.clone()), 3);
        play_round_scoring(&mut s, &[GOLD, BLUE]); // 7
        assert_eq!(s.world().best, 10);
        assert_eq!(*store.0.borrow(), Some(10));
        assert_eq!(s.world().summary, Some(Summary { score: 7, new_best: false }));
    }

    #[test]
    fn equal_score_keeps_best() {
        let store = SharedStore::default();
        *store.0.borrow_mut() = Some(10);
        let (mut s, _) = session_with(Box::new(store.clone()), 3);
        play_round_scoring(&mut s, &[GOLD, GOLD]); // 10
        assert_eq!(s.world().best, 10);
        assert!(!s.drain_events().iter().any(|e| matches!(e, GameEvent::NewBest { .. })));
    }

    #[test]
    fn higher_score_becomes_best() {
        let store = SharedStore::default();
        *store.0.borrow_mut() = Some(10);
        let (mut s, _) = session_with(Box::new(store.clone()), 3);
        play_round_scoring(&mut s, &[GOLD, GOLD, GOLD]); // 15
        assert_eq!(s.world().best, 15);
        assert_eq!(*store.0.borrow(), Some(15));
        assert_eq!(s.world().message, "Time's up: 15 points");
        assert_eq!(s.world().summary, Some(Summary { score: 15, new_best: true }));
    }

    #[test]
    fn negative_round_never_beats_empty_best() {
        let store = SharedStore::default();
        let (mut s, _) = session_with(Box::new(store.clone()), 3);
        play_round_scoring(&mut s, &[BLACK]);
        assert_eq!(s.world().best, 0);
        assert_eq!(*store.0.borrow(), None);
    }

    #[test]
    fn broken_store_never_blocks_play() {
        let (mut s, _) = session_with(Box::new(BrokenStore), 3);
        assert_eq!(s.world().best, 0);
        play_round_scoring(&mut s, &[RED]);
        assert_eq!(s.world().phase, Phase::Ended);
        assert_eq!(s.world().best, 1);
        assert!(s.start());
    }

    // ── Restart ──

    #[test]
    fn restart_gives_fresh_round() {
        let (mut s, synth) = session();
        s.start();
        let old = place(&mut s, GOLD, 10.0, 10.0);
        let popped = place(&mut s, BLUE, 200.0, 10.0);
        s.pop(popped, 210.0, 20.0);
        s.advance(7_500);
        assert_eq!(s.world().time_left, 23);

        s.restart();
        let w = s.world();
        assert_eq!(w.phase, Phase::Running);
        assert_eq!(w.score, 0);
        assert_eq!(w.time_left, 30);
        assert!(w.pop_texts.is_empty());
        assert_eq!(w.balloons.len(), 1);
        assert!(w.balloons.iter().all(|b| b.id != old));
        assert_eq!(synth.borrow().ambient_starts, 2);
        // Only the new round's spawner is armed.
        assert_eq!(s.timers.count(|j| *j == Job::Spawn), 1);
        assert_eq!(s.timers.count(|j| *j == Job::Countdown), 1);

        // The previous round's delayed clear must not wipe the new round.
        s.advance(1000);
        assert!(!s.world().balloons.is_empty());
        assert_eq!(s.world().time_left, 29);
    }

    #[test]
    fn restart_from_idle_just_starts() {
        let (mut s, _) = session();
        s.restart();
        assert!(s.is_running());
        let events = s.drain_events();
        assert_eq!(count(&events, |e| matches!(e, GameEvent::SessionEnded { .. })), 0);
    }

    // ── Stage clear and messages ──

    #[test]
    fn stage_clears_after_grace_period() {
        let (mut s, _) = session();
        s.start();
        let id = place(&mut s, RED, 10.0, 10.0);
        place(&mut s, RED, 300.0, 10.0);
        s.pop(id, 20.0, 20.0);
        s.end();
        s.advance(899);
        assert!(!s.world().balloons.is_empty() || !s.world().pop_texts.is_empty());
        s.advance(1);
        assert!(s.world().balloons.is_empty());
        assert!(s.world().pop_texts.is_empty());
    }

    #[test]
    fn message_clears_unless_superseded() {
        let (mut s, _) = session();
        s.start(); // "Go!" at t=0
        s.advance(1000);
        s.toggle_sound(); // "Sound OFF" at t=1000
        s.advance(200); // t=1200: first clear fires but is stale
        assert_eq!(s.world().message, "Sound OFF");
        s.advance(1000); // t=2200
        assert!(s.world().message.is_empty());
    }

    // ── Audio toggles ──

    #[test]
    fn sound_off_silences_cues() {
        let (mut s, synth) = session();
        s.start();
        s.toggle_sound();
        let id = place(&mut s, RED, 10.0, 10.0);
        s.pop(id, 20.0, 20.0);
        assert_eq!(s.world().score, 1);
        assert!(synth.borrow().cues.is_empty());
    }

    #[test]
    fn music_toggle_takes_effect_immediately() {
        let (mut s, synth) = session();
        s.start();
        assert!(synth.borrow().ambient_on);
        s.toggle_music();
        assert!(!synth.borrow().ambient_on);
        s.toggle_music();
        assert!(synth.borrow().ambient_on);
        assert_eq!(synth.borrow().ambient_starts, 2);
    }

    #[test]
    fn music_on_while_idle_waits_for_round() {
        let (mut s, synth) = session();
        s.toggle_music(); // off
        s.toggle_music(); // on, but idle
        assert!(!synth.borrow().ambient_on);
        s.start();
        assert!(synth.borrow().ambient_on);
    }

    #[test]
    fn music_disabled_round_stays_quiet() {
        let (mut s, synth) = session();
        s.toggle_music();
        s.start();
        assert!(!synth.borrow().ambient_on);
        assert_eq!(synth.borrow().ambient_starts, 0);
    }
}
