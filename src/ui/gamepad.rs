/// Gamepad input tracker using gilrs.
///
/// Popping needs a pointer, so the pad only drives the menu actions.
/// Button mapping is loaded from config.toml via `load_button_config()`.
/// Default mapping:
///   Start / A   →  Start round
///   Select      →  Restart
///   X           →  Toggle sound
///   Y           →  Toggle music
///   B           →  Dismiss summary / quit from title

#[cfg(feature = "gamepad")]
use gilrs::{Button, EventType, Gilrs};

use crate::config::GamepadConfig;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,      // LeftTrigger
    R1,      // RightTrigger
    Start,
    Select,
}

const BTN_COUNT: usize = 8;

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH"  => Some(Btn::A),
            "B" | "EAST"   => Some(Btn::B),
            "X" | "WEST"   => Some(Btn::X),
            "Y" | "NORTH"  => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER"  => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South     => Some(Btn::A),
            Button::East      => Some(Btn::B),
            Button::West      => Some(Btn::X),
            Button::North     => Some(Btn::Y),
            Button::LeftTrigger  => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::Start     => Some(Btn::Start),
            Button::Select    => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Action-to-button mapping (loaded from config).
struct ActionMap {
    start: Vec<Btn>,
    restart: Vec<Btn>,
    toggle_sound: Vec<Btn>,
    toggle_music: Vec<Btn>,
    cancel: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            start:        vec![Btn::Start, Btn::A],
            restart:      vec![Btn::Select],
            toggle_sound: vec![Btn::X],
            toggle_music: vec![Btn::Y],
            cancel:       vec![Btn::B],
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    /// Buttons that went down since the last update (indexed by Btn).
    just_pressed: [bool; BTN_COUNT],

    action_map: ActionMap,

    pub connected: bool,
}

fn btn_index(btn: Btn) -> usize {
    btn as usize
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, connected) = {
            match Gilrs::new() {
                Ok(g) => {
                    let has_pad = g.gamepads().next().is_some();
                    (Some(g), has_pad)
                }
                Err(e) => {
                    log::info!("gamepad support unavailable: {e}");
                    (None, false)
                }
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            just_pressed: [false; BTN_COUNT],
            action_map: ActionMap::default(),
            connected,
        }
    }

    /// Load button mapping from config. Empty or unrecognised lists keep
    /// the default for that action.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        fn parse_list(names: &[String]) -> Vec<Btn> {
            names.iter().filter_map(|s| Btn::from_name(s)).collect()
        }
        fn apply(slot: &mut Vec<Btn>, names: &[String]) {
            let parsed = parse_list(names);
            if !parsed.is_empty() {
                *slot = parsed;
            }
        }
        let map = &mut self.action_map;
        apply(&mut map.start, &cfg.start);
        apply(&mut map.restart, &cfg.restart);
        apply(&mut map.toggle_sound, &cfg.toggle_sound);
        apply(&mut map.toggle_music, &cfg.toggle_music);
        apply(&mut map.cancel, &cfg.cancel);
    }

    pub fn update(&mut self) {
        self.just_pressed = [false; BTN_COUNT];

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    if let Some(b) = Btn::from_gilrs(btn) {
                        self.press(b);
                    }
                }
                EventType::Connected => { self.connected = true; }
                EventType::Disconnected => {
                    self.connected = false;
                    self.just_pressed = [false; BTN_COUNT];
                }
                _ => {}
            }
        }
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn press(&mut self, btn: Btn) {
        self.just_pressed[btn_index(btn)] = true;
    }

    // ── Action queries (config-driven) ──

    fn any_just_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.just_pressed[btn_index(b)])
    }

    pub fn start_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.start)
    }
    pub fn restart_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.restart)
    }
    pub fn toggle_sound_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.toggle_sound)
    }
    pub fn toggle_music_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.toggle_music)
    }
    pub fn cancel_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline() -> GamepadState {
        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: None,
            just_pressed: [false; BTN_COUNT],
            action_map: ActionMap::default(),
            connected: false,
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn button_names_are_case_insensitive() {
        assert_eq!(Btn::from_name("start"), Some(Btn::Start));
        assert_eq!(Btn::from_name("Back"), Some(Btn::Select));
        assert_eq!(Btn::from_name("north"), Some(Btn::Y));
        assert_eq!(Btn::from_name("Turbo"), None);
    }

    #[test]
    fn default_mapping() {
        let mut pad = offline();
        pad.press(Btn::A);
        assert!(pad.start_pressed());
        assert!(!pad.restart_pressed());
        pad.just_pressed = [false; BTN_COUNT];
        pad.press(Btn::B);
        assert!(pad.cancel_pressed());
    }

    #[test]
    fn config_overrides_only_recognised_lists() {
        let mut pad = offline();
        let cfg = GamepadConfig {
            start: names(&["R1"]),
            restart: names(&["nonsense"]),
            toggle_sound: vec![],
            toggle_music: names(&["L1", "Y"]),
            cancel: names(&["Select"]),
        };
        pad.load_button_config(&cfg);
        assert_eq!(pad.action_map.start, vec![Btn::R1]);
        assert_eq!(pad.action_map.restart, vec![Btn::Select]);
        assert_eq!(pad.action_map.toggle_sound, vec![Btn::X]);
        assert_eq!(pad.action_map.toggle_music, vec![Btn::L1, Btn::Y]);
        assert_eq!(pad.action_map.cancel, vec![Btn::Select]);
    }
}
