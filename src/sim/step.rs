/// The step function: advances the world by one fixed tick.
///
/// Processing order:
///   1. Movement resolution (teleport cooldown → floor check → velocity)
///   2. Body integration
///   3. Trigger entry detection + tile effect dispatch
///   4. Deferred actions due this tick
///   5. Variable-change notifications drained into the event list
///
/// Only Running advances anything. Every effect failure is logged and
/// degrades to a no-op; nothing here returns an error.

use std::collections::HashSet;

use log::{debug, info, warn};

use crate::domain::phase::Phase;
use crate::domain::physics::{triggers_overlap, TILE_SIZE};
use crate::domain::rules::{self, TileEffect};
use crate::domain::schedule::Deferred;
use crate::domain::tile::TileId;
use super::event::GameEvent;
use super::world::WorldState;

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState) -> Vec<GameEvent> {
    if world.current_phase() != Phase::Running { return vec![]; }

    let mut events: Vec<GameEvent> = Vec::new();
    let dt = world.config.dt();
    world.tick += 1;
    world.time += dt as f64;

    resolve_movement(world, dt, &mut events);
    world.player.body.integrate(dt, world.config.gravity);
    resolve_triggers(world, &mut events);
    resolve_schedule(world, &mut events);
    events.extend(world.drain_variable_events());

    events
}

// ══════════════════════════════════════════════════════════════
// Movement & fall
// ══════════════════════════════════════════════════════════════

fn resolve_movement(world: &mut WorldState, dt: f32, events: &mut Vec<GameEvent>) {
    let player = &mut world.player;

    // Just teleported: hold still until the cooldown runs out
    if player.tick_cooldown(dt) { return; }

    // Stopped, parked on the goal, or already falling (gravity takes it from here)
    if !player.is_moving() { return; }

    if !world.board.cells.has_floor_at(player.position()) {
        debug!("no floor under {:?}", player.position());
        player.start_fall(&mut world.rng);
        events.push(GameEvent::FallStarted);
        return;
    }

    player.apply_travel_velocity();
}

// ══════════════════════════════════════════════════════════════
// Triggers
// ══════════════════════════════════════════════════════════════

/// Find tiles whose trigger volume the player just entered and dispatch
/// them in tile order. Entries are gated on the state at dispatch time, so
/// a goal or teleport earlier in the same tick suppresses the rest.
fn resolve_triggers(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let pos = world.player.position();
    let player_half = world.config.player_half_extent;
    let tile_half = world.config.trigger_half_extent;

    let overlapping: HashSet<TileId> = world.board.tiles.iter()
        .enumerate()
        .filter(|(_, t)| t.kind.has_effect())
        .filter(|(_, t)| triggers_overlap(pos, player_half, t.position, tile_half))
        .map(|(id, _)| id)
        .collect();

    for tile in world.triggers.update(overlapping) {
        if !world.player.is_moving() || world.player.teleport_cooldown() > 0.0 {
            debug!("tile {tile} entered while suppressed");
            continue;
        }
        dispatch(world, tile, events);
    }
}

// ══════════════════════════════════════════════════════════════
// Tile effect dispatch
// ══════════════════════════════════════════════════════════════

/// Run the effect of entering `tile`.
///
/// A tile with an effect first consumes the skip flag: if it was armed the
/// effect is dropped. Passive tiles (floor, start, teleport destinations)
/// neither act nor consume the flag.
pub fn dispatch(world: &mut WorldState, tile: TileId, events: &mut Vec<GameEvent>) {
    let Some(kind) = world.board.tile(tile).map(|t| t.kind) else {
        warn!("dispatch on unknown tile {tile}");
        return;
    };
    if !kind.has_effect() { return; }

    if world.player.take_skip() {
        debug!("{} tile {tile}: effect skipped", kind.label());
        events.push(GameEvent::EffectSkipped { tile });
        return;
    }

    match rules::effect_of(kind, &world.vars) {
        TileEffect::Passive => {}

        TileEffect::Turn(direction) => {
            world.player.snap_to_grid_xz();
            world.player.direction = direction.vector();
            debug!("arrow tile {tile}: heading {direction:?}");
            events.push(GameEvent::DirectionChanged { tile, direction });
        }

        TileEffect::Operate { register, operation, operand } => {
            world.vars.operate(register, operation, operand);

            // Gem disappears for as long as it takes to cross one tile
            let delay = world.player.time_to_cross_one_tile(TILE_SIZE);
            if world.schedule.schedule(world.time, delay, Deferred::RestoreGem(tile)) {
                debug!("variable tile {tile}: gem timer restarted");
            }
            events.push(GameEvent::GemHidden { tile });
        }

        TileEffect::Condition { passed } => {
            debug!("if tile {tile}: {}", if passed { "passed" } else { "failed, skipping next" });
            if !passed {
                world.player.arm_skip();
            }
            events.push(GameEvent::ConditionEvaluated { tile, passed });
        }

        TileEffect::Teleport { group } => {
            let target = world.board.teleports.destination(group)
                .and_then(|dest| world.board.tile(dest).map(|t| (dest, t.position)));
            match target {
                None => {
                    warn!("teleport tile {tile}: group {group} has no destination");
                    events.push(GameEvent::TeleportFailed { tile, group });
                }
                Some((dest, position)) => {
                    world.player.warp_xz(position);
                    world.player.start_teleport_cooldown(world.config.teleport_cooldown);
                    debug!("teleport group {group}: tile {tile} -> tile {dest}");
                    events.push(GameEvent::Teleported { from: tile, to: dest, group });
                }
            }
        }

        TileEffect::Goal => {
            world.player.stop_at_goal();
            if !world.level_complete {
                world.level_complete = true;
                info!("goal reached at tick {}", world.tick);
                events.push(GameEvent::LevelComplete);
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Deferred actions
// ══════════════════════════════════════════════════════════════

fn resolve_schedule(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    for action in world.schedule.take_due(world.time) {
        match action {
            Deferred::RestoreGem(tile) => events.push(GameEvent::GemRestored { tile }),
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
