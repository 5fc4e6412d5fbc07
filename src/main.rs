/// Entry point and game loop.

mod config;
mod domain;
mod logging;
mod sim;
mod ui;

use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use log::{error, info, warn};

use config::GameConfig;
use domain::physics::GridCell;
use sim::edit;
use sim::level::{scan_stages, StageError, StageSource};
use sim::step::step;
use sim::world::WorldState;
use ui::input::InputState;
use ui::renderer::Renderer;
use ui::view::View;

const FRAME_SLEEP: Duration = Duration::from_millis(5);
const LOG_FILE: &str = "tilerunner.log";
/// Speed change per tick while `f`/`s` is held.
const SPEED_STEP: f32 = 0.05;

const EDIT_KEYS: [KeyCode; 8] = [
    KeyCode::Enter,
    KeyCode::Char('['), KeyCode::Char(']'),
    KeyCode::Char(','), KeyCode::Char('.'),
    KeyCode::Char('-'), KeyCode::Char('+'), KeyCode::Char('='),
];

fn main() {
    let config = GameConfig::load();
    logging::init(config.verbose, Some(LOG_FILE));
    info!("stages dir {}, tick {} ms", config.stages_dir.display(), config.sim.tick_rate_ms);

    let stages = scan_stages(&config.stages_dir);
    info!("{} stages available", stages.len());

    let Some(mut session) = open_first_stage(&stages, &config) else {
        eprintln!("No playable stage found, see {LOG_FILE}");
        return;
    };

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let result = game_loop(&mut session, &mut renderer, &stages, &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        error!("game loop failed: {e}");
        eprintln!("Game error: {e}");
    }
}

// ── Session: one open stage plus its view ──

struct Session {
    world: WorldState,
    view: View,
}

impl Session {
    fn open(stages: &[StageSource], index: usize, config: &GameConfig) -> Result<Session, StageError> {
        let stage = stages[index].load()?;
        info!("opened stage '{}' from {}", stage.name, stages[index].label());

        let mut view = View::new(GridCell::containing(stage.spawn.position), index, stages.len());
        view.set_message(if stage.description.is_empty() { stage.name.clone() } else { stage.description });
        let world = WorldState::new(stage.board, stage.spawn, config.sim.clone());
        Ok(Session { world, view })
    }
}

fn open_first_stage(stages: &[StageSource], config: &GameConfig) -> Option<Session> {
    (0..stages.len()).find_map(|i| match Session::open(stages, i, config) {
        Ok(session) => Some(session),
        Err(e) => {
            error!("{}: {e}", stages[i].label());
            None
        }
    })
}

fn switch_stage(session: &mut Session, stages: &[StageSource], step: i32, config: &GameConfig) {
    let index = (session.view.stage_index as i32 + step).rem_euclid(stages.len() as i32) as usize;
    match Session::open(stages, index, config) {
        Ok(next) => *session = next,
        Err(e) => {
            warn!("{}: {e}", stages[index].label());
            session.view.set_message(format!("{}: {e}", stages[index].label()));
        }
    }
}

// ── Loop ──

fn game_loop(
    session: &mut Session,
    renderer: &mut Renderer,
    stages: &[StageSource],
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let tick_rate = Duration::from_millis(config.sim.tick_rate_ms);
    let mut last_tick = Instant::now();

    loop {
        kb.drain_events();

        if kb.ctrl_c_pressed() || kb.any_pressed(&[KeyCode::Char('q'), KeyCode::Esc]) {
            break;
        }
        handle_keys(session, &kb, stages, config);

        if last_tick.elapsed() >= tick_rate {
            if kb.is_held(KeyCode::Char('f')) {
                session.world.player.change_speed(SPEED_STEP);
            }
            if kb.is_held(KeyCode::Char('s')) {
                session.world.player.change_speed(-SPEED_STEP);
            }

            let events = step(&mut session.world);
            session.view.apply(&events, &session.world);
            session.view.tick();
            last_tick = Instant::now();
        }

        renderer.render(&session.world, &session.view)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn handle_keys(session: &mut Session, kb: &InputState, stages: &[StageSource], config: &GameConfig) {
    if kb.was_pressed(KeyCode::Char('n')) {
        switch_stage(session, stages, 1, config);
        return;
    }
    if kb.was_pressed(KeyCode::Char('p')) {
        switch_stage(session, stages, -1, config);
        return;
    }

    if kb.was_pressed(KeyCode::Char(' ')) {
        let target = session.world.current_phase().toggled();
        let events = session.world.change_phase(target);
        session.view.apply(&events, &session.world);
    }
    if kb.was_pressed(KeyCode::Char('r')) {
        session.world.player.set_speed(config.sim.initial_speed);
    }

    for (key, dx, dz) in [
        (KeyCode::Up, 0, 1),
        (KeyCode::Down, 0, -1),
        (KeyCode::Left, -1, 0),
        (KeyCode::Right, 1, 0),
    ] {
        if kb.was_pressed(key) {
            session.view.move_cursor(dx, dz, &session.world);
        }
    }

    let Some(key) = EDIT_KEYS.into_iter().find(|k| kb.was_pressed(*k)) else { return };
    let Some(tile) = session.view.selected_tile(&session.world) else {
        session.view.set_message("No tile here");
        return;
    };

    let world = &mut session.world;
    let result = match key {
        KeyCode::Enter => edit::rotate_arrow(world, tile),
        KeyCode::Char('[') => edit::cycle_register(world, tile, -1),
        KeyCode::Char(']') => edit::cycle_register(world, tile, 1),
        KeyCode::Char(',') => edit::cycle_operation(world, tile, -1),
        KeyCode::Char('.') => edit::cycle_operation(world, tile, 1),
        KeyCode::Char('-') => edit::adjust_value(world, tile, -1),
        _ => edit::adjust_value(world, tile, 1),
    };
    match result {
        Ok(event) => session.view.apply(&[event], &session.world),
        Err(e) => {
            warn!("edit refused: {e}");
            session.view.set_message(e.to_string());
        }
    }
}
