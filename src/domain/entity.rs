/// Player entity: the body plus the movement state machine around it.
///
/// States are minimal:
///   - moving  : grounded travel along `direction` at `speed`
///   - stopped : Editing phase, or parked on the goal
///   - falling : left the floor; one-way until the next phase reset
///
/// The tick logic lives in `sim::step`; this type only exposes the
/// primitive mutations the tick and the tile effects need.

use glam::{Quat, Vec3};
use log::{debug, info};
use rand::Rng;

use super::phase::{Phase, PhaseListener};
use super::physics::{Body, GridCell};

/// Heading after every reset: +Z.
pub const FORWARD: Vec3 = Vec3::Z;

/// Hard ceiling on speed in tiles per second, whatever the config says.
pub const MAX_SPEED: f32 = 10.0;

#[derive(Clone, Debug)]
pub struct Player {
    pub body: Body,
    /// Unit vector in the grid plane.
    pub direction: Vec3,
    speed: f32,
    max_speed: f32,
    moving: bool,
    falling: bool,
    skip_next: bool,
    teleport_cooldown: f32,
    spawn_position: Vec3,
    spawn_rotation: Quat,
    /// Last phase delivered, so a repeat is ignored.
    phase: Phase,
}

impl Player {
    pub fn new(spawn_position: Vec3, spawn_rotation: Quat, speed: f32, max_speed: f32) -> Self {
        let max_speed = max_speed.clamp(0.0, MAX_SPEED);
        Player {
            body: Body::at(spawn_position, spawn_rotation),
            direction: FORWARD,
            speed: speed.clamp(0.0, max_speed),
            max_speed,
            moving: false,
            falling: false,
            skip_next: false,
            teleport_cooldown: 0.0,
            spawn_position,
            spawn_rotation,
            phase: Phase::Editing,
        }
    }

    // ── Queries ──

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.body.position
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    #[inline]
    pub fn is_moving(&self) -> bool {
        self.moving
    }

    #[inline]
    pub fn is_falling(&self) -> bool {
        self.falling
    }

    #[inline]
    pub fn skip_armed(&self) -> bool {
        self.skip_next
    }

    #[inline]
    pub fn teleport_cooldown(&self) -> f32 {
        self.teleport_cooldown
    }

    pub fn spawn_position(&self) -> Vec3 {
        self.spawn_position
    }

    /// Seconds needed to cross one tile at the current speed.
    /// Infinite while stopped.
    pub fn time_to_cross_one_tile(&self, tile_size: f32) -> f32 {
        if self.speed <= 0.0 {
            f32::INFINITY
        } else {
            tile_size / self.speed
        }
    }

    // ── Speed ──

    /// Add `delta` to the speed, clamped to [0, max]. Max never exceeds
    /// `MAX_SPEED`.
    pub fn change_speed(&mut self, delta: f32) {
        self.speed = (self.speed + delta).clamp(0.0, self.max_speed);
        debug!("speed {delta:+} -> {}", self.speed);
    }

    /// Set the speed outright; negatives floor to 0, clamped to max.
    pub fn set_speed(&mut self, value: f32) {
        self.speed = value.clamp(0.0, self.max_speed);
        debug!("speed set to {}", self.speed);
    }

    // ── Movement flag ──

    /// External start/stop. Starting is refused while falling: only a
    /// phase reset brings the player back to the ground.
    pub fn set_moving(&mut self, moving: bool) {
        if moving && self.falling {
            debug!("set_moving(true) ignored while falling");
            return;
        }
        self.moving = moving;
    }

    // ── Skip flag ──

    /// Arm the one-shot skip consumed by the next triggered tile.
    pub fn arm_skip(&mut self) {
        self.skip_next = true;
    }

    /// Consume the skip flag. True if it was armed.
    pub fn take_skip(&mut self) -> bool {
        std::mem::replace(&mut self.skip_next, false)
    }

    // ── Teleport cooldown ──

    /// Freeze the player for `duration` seconds. The body stops so the
    /// player stays exactly on the destination.
    pub fn start_teleport_cooldown(&mut self, duration: f32) {
        self.teleport_cooldown = duration.max(0.0);
        self.body.velocity = Vec3::ZERO;
    }

    /// Count the cooldown down by `dt`. Returns true if the player was
    /// cooling down at the start of this tick.
    pub fn tick_cooldown(&mut self, dt: f32) -> bool {
        if self.teleport_cooldown <= 0.0 {
            return false;
        }
        self.teleport_cooldown = (self.teleport_cooldown - dt).max(0.0);
        true
    }

    // ── Pose ──

    /// Move to `target`'s x/z, keeping the current height.
    pub fn warp_xz(&mut self, target: Vec3) {
        self.body.position.x = target.x;
        self.body.position.z = target.z;
    }

    /// Snap x/z to the nearest cell centre, height unchanged.
    pub fn snap_to_grid_xz(&mut self) {
        let cell = GridCell::containing(self.body.position);
        self.body.position = cell.center(self.body.position.y);
    }

    /// Drive the body along the current heading.
    pub fn apply_travel_velocity(&mut self) {
        self.body.velocity = self.direction * self.speed;
    }

    /// Leave the floor: keep horizontal momentum, hand the body to gravity,
    /// unlock rotation and tumble with a random spin bounded by the
    /// horizontal speed.
    pub fn start_fall<R: Rng>(&mut self, rng: &mut R) {
        self.moving = false;
        self.falling = true;

        // Velocity is left as is: horizontal momentum carries into the fall.
        let s = self.body.horizontal_speed();
        self.body.use_gravity = true;
        self.body.rotation_locked = false;
        self.body.angular_velocity = Vec3::new(
            rng.gen_range(-s..=s),
            rng.gen_range(-s..=s),
            rng.gen_range(-s..=s),
        );
        info!("fall started at {:?}, spin {:?}", self.body.position, self.body.angular_velocity);
    }

    /// Park on the goal: no motion at all.
    pub fn stop_at_goal(&mut self) {
        self.moving = false;
        self.body.velocity = Vec3::ZERO;
        self.body.angular_velocity = Vec3::ZERO;
    }

    /// Back to the spawn pose, grounded and still.
    fn reset_to_spawn(&mut self) {
        self.body.reset_grounded(self.spawn_position, self.spawn_rotation);
        self.direction = FORWARD;
        self.falling = false;
        self.skip_next = false;
        self.teleport_cooldown = 0.0;
    }
}

impl PhaseListener for Player {
    fn on_phase_changed(&mut self, phase: Phase) {
        if phase == self.phase {
            return;
        }
        self.phase = phase;
        self.reset_to_spawn();
        self.moving = phase == Phase::Running;
        debug!("player reset for {phase:?} at {:?}", self.spawn_position);
    }
}
