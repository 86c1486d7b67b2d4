/// Scoring and difficulty rules.
///
/// Pure functions, no side effects. The session controller decides *when*
/// to apply them; these decide *what* the numbers are.
///
/// ## Spawn pacing
///
///   delay   = base + uniform(0, ceiling)
///   ceiling = max(floor, start - elapsed_secs * shrink)
///
/// With the defaults (520 / 420 / 12 / 120) the ceiling is 420 ms at the
/// start of a 30 s round and reaches the 120 ms floor at 25 s elapsed.
///
/// ## Rise speed
///
///   speed  = uniform[1.0, 1.9) * factor
///   factor = 1 + elapsed_secs * difficulty_per_sec

use rand::Rng;

use crate::config::{MotionConfig, SpawnConfig};

pub const MIN_WIDTH: f64 = 62.0;
pub const WIDTH_SPREAD: f64 = 30.0;
pub const SIDE_MARGIN: f64 = 20.0;
/// Balloons start this far below the stage bottom edge.
pub const START_BELOW: f64 = 120.0;

const BASE_SPEED_MIN: f64 = 1.0;
const BASE_SPEED_MAX: f64 = 1.9;

/// Score at which a pop counts as a bonus.
pub const BONUS_POINTS: i32 = 5;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PopNotice {
    Bonus,
    Penalty,
}

#[inline]
fn elapsed_secs(duration: u32, time_left: u32) -> u32 {
    duration.saturating_sub(time_left)
}

/// Upper bound of the random part of the next spawn delay.
pub fn jitter_ceiling_ms(spawn: &SpawnConfig, duration: u32, time_left: u32) -> u64 {
    let shrink = elapsed_secs(duration, time_left) as u64 * spawn.jitter_shrink_ms_per_sec;
    spawn.jitter_start_ms.saturating_sub(shrink).max(spawn.jitter_floor_ms)
}

/// Delay until the next balloon, given the time left when it is scheduled.
pub fn spawn_delay_ms<R: Rng + ?Sized>(
    spawn: &SpawnConfig, duration: u32, time_left: u32, rng: &mut R,
) -> u64 {
    let ceiling = jitter_ceiling_ms(spawn, duration, time_left);
    spawn.base_delay_ms + (rng.gen::<f64>() * ceiling as f64) as u64
}

/// Speed multiplier that grows linearly as the round runs down.
pub fn difficulty_factor(motion: &MotionConfig, duration: u32, time_left: u32) -> f64 {
    1.0 + elapsed_secs(duration, time_left) as f64 * motion.difficulty_per_sec
}

pub fn launch_speed<R: Rng + ?Sized>(
    motion: &MotionConfig, duration: u32, time_left: u32, rng: &mut R,
) -> f64 {
    rng.gen_range(BASE_SPEED_MIN..BASE_SPEED_MAX) * difficulty_factor(motion, duration, time_left)
}

/// Random spawn placement for a stage of the given size: `(x, y, width)`.
pub fn spawn_placement<R: Rng + ?Sized>(stage_w: f64, stage_h: f64, rng: &mut R) -> (f64, f64, f64) {
    let width = MIN_WIDTH + rng.gen::<f64>() * WIDTH_SPREAD;
    let x = SIDE_MARGIN + rng.gen::<f64>() * (stage_w - 2.0 * SIDE_MARGIN).max(0.0);
    let y = stage_h + START_BELOW;
    (x, y, width)
}

pub fn pop_notice(points: i32) -> Option<PopNotice> {
    if points >= BONUS_POINTS {
        Some(PopNotice::Bonus)
    } else if points < 0 {
        Some(PopNotice::Penalty)
    } else {
        None
    }
}

/// Floating text shown where a balloon popped.
pub fn pop_label(points: i32) -> String {
    if points > 0 {
        format!("+{}", points)
    } else {
        points.to_string()
    }
}

/// Best score only moves on a strict improvement.
#[inline]
pub fn is_new_best(final_score: i32, best: i32) -> bool {
    final_score > best
}
