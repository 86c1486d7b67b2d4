/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;

// ── Public Config Struct ──

#[derive(Clone, Debug, Default)]
pub struct GameConfig {
    pub round: RoundConfig,
    pub spawn: SpawnConfig,
    pub motion: MotionConfig,
    pub audio: AudioConfig,
    pub gamepad: GamepadConfig,
}

#[derive(Clone, Debug)]
pub struct RoundConfig {
    pub duration_secs: u32,
}

#[derive(Clone, Debug)]
pub struct SpawnConfig {
    pub base_delay_ms: u64,
    pub jitter_start_ms: u64,
    pub jitter_shrink_ms_per_sec: u64,
    pub jitter_floor_ms: u64,
}

#[derive(Clone, Debug)]
pub struct MotionConfig {
    pub frame_ms: u64,          // display refresh period
    pub rise_step: f64,         // per-frame amplification of a balloon's speed
    pub difficulty_per_sec: f64,
}

#[derive(Clone, Debug)]
pub struct AudioConfig {
    pub sound: bool,
    pub music: bool,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub start: Vec<String>,
    pub restart: Vec<String>,
    pub toggle_sound: Vec<String>,
    pub toggle_music: Vec<String>,
    pub cancel: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    round: TomlRound,
    #[serde(default)]
    spawn: TomlSpawn,
    #[serde(default)]
    motion: TomlMotion,
    #[serde(default)]
    audio: TomlAudio,
    #[serde(default)]
    gamepad: TomlGamepad,
}

#[derive(Deserialize, Debug)]
struct TomlRound {
    #[serde(default = "default_duration")]
    duration_secs: u32,
}

#[derive(Deserialize, Debug)]
struct TomlSpawn {
    #[serde(default = "default_base_delay")]
    base_delay_ms: u64,
    #[serde(default = "default_jitter_start")]
    jitter_start_ms: u64,
    #[serde(default = "default_jitter_shrink")]
    jitter_shrink_ms_per_sec: u64,
    #[serde(default = "default_jitter_floor")]
    jitter_floor_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlMotion {
    #[serde(default = "default_frame_ms")]
    frame_ms: u64,
    #[serde(default = "default_rise_step")]
    rise_step: f64,
    #[serde(default = "default_difficulty")]
    difficulty_per_sec: f64,
}

#[derive(Deserialize, Debug)]
struct TomlAudio {
    #[serde(default = "default_on")]
    sound: bool,
    #[serde(default = "default_on")]
    music: bool,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_pad_start")]
    start: Vec<String>,
    #[serde(default = "default_pad_restart")]
    restart: Vec<String>,
    #[serde(default = "default_pad_sound")]
    toggle_sound: Vec<String>,
    #[serde(default = "default_pad_music")]
    toggle_music: Vec<String>,
    #[serde(default = "default_pad_cancel")]
    cancel: Vec<String>,
}

// ── Defaults ──

fn default_duration() -> u32 { 30 }
fn default_base_delay() -> u64 { 520 }
fn default_jitter_start() -> u64 { 420 }
fn default_jitter_shrink() -> u64 { 12 }
fn default_jitter_floor() -> u64 { 120 }
fn default_frame_ms() -> u64 { 16 }     // ~60 Hz
fn default_rise_step() -> f64 { 2.2 }
fn default_difficulty() -> f64 { 0.035 }
fn default_on() -> bool { true }

fn default_pad_start() -> Vec<String> { vec!["Start".into(), "A".into()] }
fn default_pad_restart() -> Vec<String> { vec!["Select".into()] }
fn default_pad_sound() -> Vec<String> { vec!["X".into()] }
fn default_pad_music() -> Vec<String> { vec!["Y".into()] }
fn default_pad_cancel() -> Vec<String> { vec!["B".into()] }

impl Default for TomlRound {
    fn default() -> Self {
        TomlRound { duration_secs: default_duration() }
    }
}

impl Default for TomlSpawn {
    fn default() -> Self {
        TomlSpawn {
            base_delay_ms: default_base_delay(),
            jitter_start_ms: default_jitter_start(),
            jitter_shrink_ms_per_sec: default_jitter_shrink(),
            jitter_floor_ms: default_jitter_floor(),
        }
    }
}

impl Default for TomlMotion {
    fn default() -> Self {
        TomlMotion {
            frame_ms: default_frame_ms(),
            rise_step: default_rise_step(),
            difficulty_per_sec: default_difficulty(),
        }
    }
}

impl Default for TomlAudio {
    fn default() -> Self {
        TomlAudio { sound: default_on(), music: default_on() }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            start: default_pad_start(),
            restart: default_pad_restart(),
            toggle_sound: default_pad_sound(),
            toggle_music: default_pad_music(),
            cancel: default_pad_cancel(),
        }
    }
}

// ── Schema → public config ──

impl From<TomlRound> for RoundConfig {
    fn from(t: TomlRound) -> Self {
        // A zero-length round would end before it starts.
        RoundConfig { duration_secs: t.duration_secs.max(1) }
    }
}

impl From<TomlSpawn> for SpawnConfig {
    fn from(t: TomlSpawn) -> Self {
        SpawnConfig {
            base_delay_ms: t.base_delay_ms,
            jitter_start_ms: t.jitter_start_ms,
            jitter_shrink_ms_per_sec: t.jitter_shrink_ms_per_sec,
            jitter_floor_ms: t.jitter_floor_ms,
        }
    }
}

impl From<TomlMotion> for MotionConfig {
    fn from(t: TomlMotion) -> Self {
        MotionConfig {
            frame_ms: t.frame_ms.max(1),
            rise_step: t.rise_step,
            difficulty_per_sec: t.difficulty_per_sec,
        }
    }
}

impl From<TomlAudio> for AudioConfig {
    fn from(t: TomlAudio) -> Self {
        AudioConfig { sound: t.sound, music: t.music }
    }
}

impl From<TomlGamepad> for GamepadConfig {
    fn from(t: TomlGamepad) -> Self {
        GamepadConfig {
            start: t.start,
            restart: t.restart,
            toggle_sound: t.toggle_sound,
            toggle_music: t.toggle_music,
            cancel: t.cancel,
        }
    }
}

impl From<TomlConfig> for GameConfig {
    fn from(t: TomlConfig) -> Self {
        GameConfig {
            round: t.round.into(),
            spawn: t.spawn.into(),
            motion: t.motion.into(),
            audio: t.audio.into(),
            gamepad: t.gamepad.into(),
        }
    }
}

impl Default for RoundConfig {
    fn default() -> Self { TomlRound::default().into() }
}

impl Default for SpawnConfig {
    fn default() -> Self { TomlSpawn::default().into() }
}

impl Default for MotionConfig {
    fn default() -> Self { TomlMotion::default().into() }
}

impl Default for AudioConfig {
    fn default() -> Self { TomlAudio::default().into() }
}

impl Default for GamepadConfig {
    fn default() -> Self { TomlGamepad::default().into() }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory,
    /// (3) XDG data home, (4) system data directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        load_toml(&candidate_dirs())
    }

    /// Parse config text. Missing sections and keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<TomlConfig>(text).map(Into::into)
    }
}

/// Candidate directories to search: exe dir + CWD + system paths (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/balloonpop)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/balloonpop");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. System data directory
    let sys = PathBuf::from("/usr/share/balloonpop");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> GameConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match GameConfig::from_toml_str(&text) {
                    Ok(cfg) => {
                        log::info!("loaded {}", path.display());
                        return cfg;
                    }
                    Err(e) => {
                        log::warn!("config.toml parse error, using defaults: {e}");
                        return GameConfig::default();
                    }
                },
                Err(e) => {
                    log::warn!("could not read {}: {e}", path.display());
                }
            }
        }
    }
    GameConfig::default()
}
