/// Entry point and game loop.
///
/// The loop renders as fast as the terminal allows but advances the
/// simulation in fixed steps of `1 / frame_rate` seconds, carrying the
/// remainder in an accumulator.

mod config;
mod domain;
mod sim;
mod ui;

use std::fs::File;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::GameConfig;
use domain::player::PlayerInput;
use sim::event::GameEvent;
use sim::loader::DirectoryAssets;
use sim::step;
use sim::world::{Phase, WorldState};
use ui::gamepad::GamepadState;
use ui::input::{Command, InputState};
use ui::renderer::Renderer;
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(5);
/// Catch-up cap after a stall (e.g. terminal suspended).
const MAX_STEPS_PER_FRAME: usize = 5;

fn main() {
    let config = GameConfig::load();
    init_tracing(&config);
    for w in &config.warnings {
        warn!("{w}");
    }
    info!(levels_dir = %config.levels_dir.display(), frame_rate = config.timing.frame_rate, "starting");

    let assets = DirectoryAssets::new(&config.levels_dir);
    let mut world = WorldState::new(config.tuning(), Box::new(assets));

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();
    let result = game_loop(&mut world, &mut renderer, &sound, &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    info!(score = world.score, "exit");
    println!();
    println!("Thanks for playing Diamond Rush!");
    println!("Final Score: {}", world.score);
}

/// Log to a file; the terminal belongs to the renderer. `RUST_LOG`
/// overrides the configured level. An unopenable file disables logging.
fn init_tracing(config: &GameConfig) {
    let file = match File::create(&config.log_file) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("logging disabled: cannot open {}: {e}", config.log_file.display());
            return;
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    sound: &SoundEngine,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new(&config.gamepad);
    let dt = config.frame_secs();
    let step_len = Duration::from_secs_f32(dt);
    let mut last = Instant::now();
    let mut acc = Duration::ZERO;
    let mut pending_jump = false;

    loop {
        kb.drain_events();
        gp.update();

        // Latched before commands so the press that starts a game is not a jump
        let input = merge_input(kb.player_input(), gp.player_input());
        latch_jump(world, input.jump, &mut pending_jump);

        let mut commands = kb.commands();
        commands.extend(gp.commands());
        if handle_commands(world, &commands) {
            break;
        }

        let now = Instant::now();
        acc += now - last;
        last = now;

        let mut steps = 0;
        while acc >= step_len && steps < MAX_STEPS_PER_FRAME {
            acc -= step_len;
            steps += 1;
        }
        if steps == MAX_STEPS_PER_FRAME {
            acc = Duration::ZERO;
        }
        let events = run_steps(world, input, &mut pending_jump, steps, dt);
        play_events(sound, &events);

        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

/// Jump presses are edges that last one render frame. Hold on to one
/// seen during play until a fixed step consumes it.
fn latch_jump(world: &WorldState, pressed: bool, pending: &mut bool) {
    if pressed && world.phase == Phase::Playing && !world.paused {
        *pending = true;
    }
}

/// Run the fixed steps owed this frame. The latched jump goes to the
/// first one; with zero steps it stays latched.
fn run_steps(
    world: &mut WorldState,
    input: PlayerInput,
    pending_jump: &mut bool,
    steps: usize,
    dt: f32,
) -> Vec<GameEvent> {
    let mut events = Vec::new();
    for _ in 0..steps {
        let input = PlayerInput { jump: std::mem::take(pending_jump), ..input };
        events.extend(step::step(world, input, dt));
        events.extend(step::tick_phase(world, dt));
    }
    events
}

fn merge_input(kb: PlayerInput, gp: PlayerInput) -> PlayerInput {
    PlayerInput {
        horizontal: (kb.horizontal + gp.horizontal).clamp(-1, 1),
        jump: kb.jump || gp.jump,
    }
}

fn play_events(sound: &SoundEngine, events: &[GameEvent]) {
    for cue in events.iter().filter_map(GameEvent::sound_cue) {
        sound.play(cue);
    }
}

/// Apply this frame's commands. Each is judged against the phase the
/// frame started in, so a button bound to both Confirm and Pause does
/// not start a game and pause it at once. Returns true to quit.
fn handle_commands(world: &mut WorldState, commands: &[Command]) -> bool {
    let phase = world.phase;
    for &cmd in commands {
        match (cmd, phase) {
            (Command::Quit, _) => return true,

            (Command::Confirm, Phase::Title) => step::start_new_game(world),
            (Command::Confirm, Phase::GameOver | Phase::GameComplete) => return_to_title(world),
            (Command::Back, Phase::Title | Phase::GameOver | Phase::GameComplete) => return true,
            (Command::Back, _) => return_to_title(world),

            (Command::Pause, Phase::Playing | Phase::Respawning) => step::toggle_pause(world),
            (Command::Restart, Phase::Playing | Phase::Respawning) => {
                info!(level = world.level.number, "restart level");
                step::restart_level(world);
            }
            _ => {}
        }
    }
    false
}

fn return_to_title(world: &mut WorldState) {
    world.phase = Phase::Title;
    world.paused = false;
    world.message.clear();
    world.message_timer = 0.0;
}
