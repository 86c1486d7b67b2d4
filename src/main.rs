/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::fs::File;
use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use rand::rngs::StdRng;
use rand::SeedableRng;

use config::GameConfig;
use sim::audio::{SilentSynth, ToneSynth};
use sim::event::GameEvent;
use sim::save::{self, FileStore};
use sim::session::Session;
use sim::world::Phase;
use ui::gamepad::GamepadState;
use ui::input::InputState;
use ui::renderer::Renderer;
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(5);
const LOG_FILE: &str = "balloonpop.log";

fn main() {
    init_logging();
    let config = GameConfig::load();

    let synth: Box<dyn ToneSynth> = match SoundEngine::new() {
        Some(engine) => Box::new(engine),
        None => Box::new(SilentSynth),
    };
    let store = FileStore::in_save_dir();
    log::info!("best score file: {}", store.path().display());

    let mut session = Session::new(&config, synth, Box::new(store), StdRng::from_entropy());

    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let result = game_loop(&mut session, &mut renderer, &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        log::error!("game loop failed: {e}");
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Balloon Pop!");
    println!("Best score: {}", session.world().best);
}

/// The terminal belongs to the renderer, so logs go to a file.
fn init_logging() {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn"),
    );
    let path = save::save_dir().join(LOG_FILE);
    match File::create(&path) {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(e) => eprintln!("cannot open {}, logging to stderr: {e}", path.display()),
    }
    builder.init();
}

fn game_loop(
    session: &mut Session,
    renderer: &mut Renderer,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    if gp.connected {
        log::info!("gamepad connected");
    }

    let frame_period = Duration::from_millis(config.motion.frame_ms);
    let (w, h) = renderer.stage_size();
    session.set_stage_size(w, h);

    let mut stats = RoundStats::default();
    let mut last_clock = Instant::now();
    let mut last_frame = Instant::now();
    // Wall time not yet handed to the session clock (sub-millisecond rest).
    let mut carry = Duration::ZERO;

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }

        if renderer.sync_size()? {
            let (w, h) = renderer.stage_size();
            session.set_stage_size(w, h);
        }

        if handle_meta(session, &kb, &gp) {
            break;
        }

        // Timers first, so a tap after time-up finds the round already over.
        let now = Instant::now();
        carry += now - last_clock;
        last_clock = now;
        let ms = carry.as_millis() as u64;
        if ms > 0 {
            session.advance(ms);
            carry -= Duration::from_millis(ms);
        }

        for tap in &kb.taps {
            if let Some((px, py)) = renderer.cell_to_stage(tap.col, tap.row) {
                session.tap(px, py);
            }
        }

        if last_frame.elapsed() >= frame_period {
            session.frame();
            last_frame = Instant::now();
        }

        for event in session.drain_events() {
            stats.record(&event);
        }

        renderer.render(session.world())?;

        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

/// Keyboard and gamepad menu actions. Returns true to quit.
fn handle_meta(session: &mut Session, kb: &InputState, gp: &GamepadState) -> bool {
    if kb.any_pressed(&[KeyCode::Char('q'), KeyCode::Char('Q')]) {
        return true;
    }

    let phase = session.world().phase;

    if kb.was_pressed(KeyCode::Esc) || gp.cancel_pressed() {
        match phase {
            Phase::Idle => return true,
            Phase::Ended => { session.dismiss(); }
            Phase::Running => {}
        }
    }

    let start = kb.any_pressed(&[KeyCode::Enter, KeyCode::Char(' ')]) || gp.start_pressed();
    if start && phase != Phase::Running {
        session.start();
    }

    let restart = kb.any_pressed(&[KeyCode::Char('r'), KeyCode::Char('R')]) || gp.restart_pressed();
    if restart && session.is_running() {
        session.restart();
    }

    if kb.any_pressed(&[KeyCode::Char('s'), KeyCode::Char('S')]) || gp.toggle_sound_pressed() {
        session.toggle_sound();
    }
    if kb.any_pressed(&[KeyCode::Char('m'), KeyCode::Char('M')]) || gp.toggle_music_pressed() {
        session.toggle_music();
    }

    false
}

/// Per-round tallies, logged when the round ends.
#[derive(Default)]
struct RoundStats {
    spawned: u32,
    popped: u32,
    missed: u32,
    penalties: u32,
}

impl RoundStats {
    fn record(&mut self, event: &GameEvent) {
        match event {
            GameEvent::SessionStarted => *self = RoundStats::default(),
            GameEvent::BalloonSpawned { .. } => self.spawned += 1,
            GameEvent::BalloonPopped { points, .. } => {
                self.popped += 1;
                if *points < 0 {
                    self.penalties += 1;
                }
            }
            GameEvent::BalloonMissed { .. } => self.missed += 1,
            GameEvent::SessionEnded { score } => log::info!(
                "round summary: score={} spawned={} popped={} (bad {}) missed={}",
                score, self.spawned, self.popped, self.penalties, self.missed,
            ),
            GameEvent::NewBest { score } => log::info!("new best score {score}"),
            GameEvent::CountdownTick { time_left } => log::trace!("{time_left}s left"),
        }
    }
}
