/// The step function: advances the world by one fixed frame.
///
/// Processing order:
///   1. Player input (walk / jump impulse)
///   2. Level update (retire collected diamonds, patrol, animation)
///   3. Player update (gravity, integration, invincibility, animation)
///   4. Collision resolution (tiles → diamonds → enemies/spikes → exit)
///   5. Diamond pickup bookkeeping (score, HUD count)
///   6. Damage / death (lose a life → Respawning or GameOver)
///   7. Level completion
///
/// Nothing runs unless the phase is Playing and the game is not paused.
/// Timed phases (Respawning, LevelComplete) advance in `tick_phase`.

use tracing::{debug, info};

use crate::domain::player::PlayerInput;
use super::event::GameEvent;
use super::level::{Contacts, Level};
use super::world::{Phase, WorldState};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, input: PlayerInput, dt: f32) -> Vec<GameEvent> {
    if world.phase != Phase::Playing || world.paused {
        return vec![];
    }

    let mut events: Vec<GameEvent> = Vec::new();
    world.frame += 1;

    if world.player.handle_input(input) {
        events.push(GameEvent::Jumped);
    }
    world.level.update(dt);
    world.player.update(dt);
    let contacts = world.level.check_collisions(&mut world.player);

    resolve_diamonds(world, &mut events);
    if resolve_damage(world, contacts, &mut events) {
        return events;
    }
    resolve_completion(world, &mut events);

    world.camera.follow(world.player_cell(), world.grid_size());
    events
}

/// Advance timers that run outside normal play. Returns any events
/// produced by phase changes.
pub fn tick_phase(world: &mut WorldState, dt: f32) -> Vec<GameEvent> {
    let mut events = Vec::new();
    if world.paused {
        return events;
    }

    if world.message_timer > 0.0 {
        world.message_timer -= dt;
        if world.message_timer <= 0.0 {
            world.message_timer = 0.0;
            world.message.clear();
        }
    }

    match world.phase {
        Phase::Respawning => {
            world.phase_timer -= dt;
            if world.phase_timer <= 0.0 {
                world.phase_timer = 0.0;
                world.player.respawn(world.level.spawn);
                world.phase = Phase::Playing;
                world.camera.center_on(world.player_cell(), world.grid_size());
                events.push(GameEvent::PlayerRespawned);
            }
        }
        Phase::LevelComplete => {
            world.phase_timer -= dt;
            if world.phase_timer <= 0.0 {
                world.phase_timer = 0.0;
                advance_level(world, &mut events);
            }
        }
        _ => {}
    }
    events
}

// ══════════════════════════════════════════════════════════════
// Per-frame resolution
// ══════════════════════════════════════════════════════════════

fn resolve_diamonds(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let taken = world.player.take_diamond_flag() as usize;
    if taken == 0 {
        return;
    }
    world.diamonds_collected += taken;
    world.score += world.tuning.diamond_score * taken as u32;

    // One event per diamond, counting down to what is left now
    let remaining = world.level.remaining_diamonds();
    for left in (remaining..remaining + taken).rev() {
        events.push(GameEvent::DiamondCollected { remaining: left });
    }
    if remaining == 0 {
        events.push(GameEvent::ExitOpened);
        world.set_message("All diamonds! Exit open", 2.0);
    }
}

/// Returns true if the player was trapped this frame.
fn resolve_damage(world: &mut WorldState, contacts: Contacts, events: &mut Vec<GameEvent>) -> bool {
    if !world.player.is_dead() {
        if contacts.damaged {
            debug!(health = world.player.health, "player damaged");
            events.push(GameEvent::PlayerDamaged { health: world.player.health });
        }
        return false;
    }

    world.lives = world.lives.saturating_sub(1);
    info!(lives = world.lives, level = world.level.number, "player trapped");
    events.push(GameEvent::PlayerTrapped { lives_left: world.lives });

    if world.lives == 0 {
        world.phase = Phase::GameOver;
        events.push(GameEvent::GameOver);
    } else {
        world.phase = Phase::Respawning;
        world.phase_timer = world.tuning.respawn_delay_secs;
    }
    true
}

fn resolve_completion(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if !world.level.is_level_complete() {
        return;
    }
    world.score += world.tuning.level_score;
    world.phase = Phase::LevelComplete;
    world.phase_timer = world.tuning.complete_delay_secs;
    info!(level = world.level.number, score = world.score, "level complete");
    events.push(GameEvent::LevelCompleted { level: world.level.number });
    let msg = format!("Level {} complete! +{}", world.level.number, world.tuning.level_score);
    world.set_message(&msg, world.tuning.complete_delay_secs);
}

// ══════════════════════════════════════════════════════════════
// Flow control (called by the game loop)
// ══════════════════════════════════════════════════════════════

/// Load `number` and put the player at its spawn, ready to play.
fn enter_level(world: &mut WorldState, number: u32) {
    world.level = Level::load(number, world.assets.as_ref(), world.tuning.level);
    world.player.reset(world.level.spawn);
    world.diamonds_collected = 0;
    world.level_start_score = world.score;
    world.phase = Phase::Playing;
    world.paused = false;
    world.phase_timer = 0.0;
    world.camera.center_on(world.player_cell(), world.grid_size());
    world.set_message(&format!("Level {number}"), 1.5);
}

pub fn start_new_game(world: &mut WorldState) {
    world.score = 0;
    world.lives = world.tuning.starting_lives;
    enter_level(world, 1);
}

/// Reload the current level from scratch. Lives are kept; score returns
/// to what it was when the level started.
pub fn restart_level(world: &mut WorldState) {
    world.score = world.level_start_score;
    let number = world.level.number;
    enter_level(world, number);
}

pub fn advance_level(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let next = world.level.number + 1;
    if next > world.tuning.level_count {
        world.phase = Phase::GameComplete;
        info!(score = world.score, "game complete");
        events.push(GameEvent::GameCompleted);
        return;
    }
    enter_level(world, next);
}

pub fn toggle_pause(world: &mut WorldState) {
    if world.phase == Phase::Playing || world.phase == Phase::Respawning {
        world.paused = !world.paused;
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geom::Vec2;
    use crate::sim::level::LevelTuning;
    use crate::sim::loader::{parse_text, NoAssets};
    use crate::sim::world::Tuning;

    const DT: f32 = 1.0 / 60.0;
    const IDLE: PlayerInput = PlayerInput { horizontal: 0, jump: false };

    fn world_with(rows: &[&str]) -> WorldState {
        let mut w = WorldState::new(Tuning::default(), Box::new(NoAssets));
        let layout = parse_text(&rows.join("\n")).unwrap();
        w.level = Level::from_layout(1, layout, LevelTuning::default());
        w.player.reset(w.level.spawn);
        w.phase = Phase::Playing;
        w
    }

    fn run(w: &mut WorldState, frames: usize, input: PlayerInput) -> Vec<GameEvent> {
        let mut all = vec![];
        for _ in 0..frames {
            all.extend(step(w, input, DT));
            all.extend(tick_phase(w, DT));
        }
        all
    }

    #[test]
    fn nothing_moves_outside_play() {
        let mut w = world_with(&["....", "P...", "====", ]);
        w.player.pos.y -= 10.0;
        let before = w.player.pos;

        w.paused = true;
        assert!(run(&mut w, 30, IDLE).is_empty());
        assert_eq!(w.player.pos, before);
        assert_eq!(w.frame, 0);

        w.paused = false;
        w.phase = Phase::Title;
        assert!(step(&mut w, IDLE, DT).is_empty());
        assert_eq!(w.player.pos, before);
    }

    #[test]
    fn jump_emits_event() {
        let mut w = world_with(&["....", "....", "P...", "===="]);
        run(&mut w, 5, IDLE);
        assert!(w.player.grounded);
        let ev = step(&mut w, PlayerInput { horizontal: 0, jump: true }, DT);
        assert_eq!(ev, vec![GameEvent::Jumped]);
        assert_eq!(ev[0].sound_cue(), Some("jump"));
    }

    #[test]
    fn diamonds_score_and_open_exit() {
        let mut w = world_with(&["......", "......", "PD..X.", "======"]);
        let ev = run(&mut w, 40, PlayerInput { horizontal: 1, jump: false });
        assert!(ev.contains(&GameEvent::DiamondCollected { remaining: 0 }));
        assert!(ev.contains(&GameEvent::ExitOpened));
        assert!(ev.contains(&GameEvent::LevelCompleted { level: 1 }));
        assert_eq!(w.diamonds_collected, 1);
        assert_eq!(w.score, 100 + 500);
        assert_eq!(w.phase, Phase::LevelComplete);
    }

    #[test]
    fn level_complete_advances_after_delay() {
        let mut w = world_with(&["....", "P...", "===="]);
        w.phase = Phase::LevelComplete;
        w.phase_timer = 0.5;
        tick_phase(&mut w, 0.25);
        assert_eq!(w.phase, Phase::LevelComplete);
        tick_phase(&mut w, 0.3);
        assert_eq!(w.phase, Phase::Playing);
        assert_eq!(w.level.number, 2);
    }

    #[test]
    fn last_level_completes_the_game() {
        let mut w = world_with(&["....", "P...", "===="]);
        w.level.number = 3;
        let mut ev = vec![];
        advance_level(&mut w, &mut ev);
        assert_eq!(w.phase, Phase::GameComplete);
        assert_eq!(ev, vec![GameEvent::GameCompleted]);
    }

    #[test]
    fn trapped_player_respawns_with_full_health() {
        let mut w = world_with(&["......", "......", "P.E...", "======"]);
        w.player.health = 1;
        let ev = run(&mut w, 30, PlayerInput { horizontal: 1, jump: false });
        assert!(ev.contains(&GameEvent::PlayerTrapped { lives_left: 2 }));
        assert_eq!(w.lives, 2);

        // Respawn delay is 1 s
        let ev = run(&mut w, 70, IDLE);
        assert!(ev.contains(&GameEvent::PlayerRespawned));
        assert_eq!(w.phase, Phase::Playing);
        assert_eq!(w.player.health, 3);
        assert!(!w.player.is_dead());
    }

    #[test]
    fn last_life_ends_the_game() {
        let mut w = world_with(&["....", "....", "EP..", "===="]);
        w.lives = 1;
        w.player.health = 1;
        let ev = run(&mut w, 5, IDLE);
        assert!(ev.contains(&GameEvent::GameOver));
        assert_eq!(w.phase, Phase::GameOver);
        assert_eq!(w.lives, 0);
        // Frozen from here on
        let pos = w.player.pos;
        assert!(run(&mut w, 60, IDLE).is_empty());
        assert_eq!(w.player.pos, pos);
    }

    #[test]
    fn two_diamonds_in_one_frame_count_down() {
        let mut w = world_with(&["....", "....", ".DD.", "===="]);
        w.player.pos = Vec2::new(48.0, 48.0);
        let ev = step(&mut w, IDLE, DT);
        let counts: Vec<_> = ev
            .iter()
            .filter_map(|e| match e {
                GameEvent::DiamondCollected { remaining } => Some(*remaining),
                _ => None,
            })
            .collect();
        assert_eq!(counts, vec![1, 0]);
        assert!(ev.contains(&GameEvent::ExitOpened));
        assert_eq!(w.diamonds_collected, 2);
    }

    #[test]
    fn jump_clears_two_rows_onto_a_ledge() {
        let mut w = world_with(&[
            "........",
            "........",
            "........",
            "........",
            "........",
            "...===..",
            "P.......",
            "========",
        ]);
        run(&mut w, 5, IDLE);
        assert!(w.player.grounded);
        let right = PlayerInput { horizontal: 1, jump: false };
        step(&mut w, PlayerInput { horizontal: 1, jump: true }, DT);
        run(&mut w, 23, right);
        run(&mut w, 40, IDLE);
        assert!(w.player.grounded);
        assert_eq!(w.player.pos, Vec2::new(96.0, 5.0 * 32.0 - 48.0));
    }

    #[test]
    fn walking_needs_two_clear_rows() {
        let right = PlayerInput { horizontal: 1, jump: false };
        let mut open = world_with(&["........", "........", "........", "........", "...===..", "........", "P.......", "========"]);
        run(&mut open, 50, right);
        assert_eq!(open.player.pos, Vec2::new(200.0, 7.0 * 32.0 - 48.0));

        // One clear row under a ledge stops a 48-unit player at its edge
        let mut capped = world_with(&["........", "........", "........", "........", "........", "...===..", "P.......", "========"]);
        run(&mut capped, 50, right);
        assert_eq!(capped.player.pos.x, 64.0);
    }

    #[test]
    fn restart_keeps_lives_and_rolls_back_score() {
        let mut w = WorldState::new(Tuning::default(), Box::new(NoAssets));
        start_new_game(&mut w);
        assert_eq!(w.phase, Phase::Playing);
        assert_eq!(w.level.number, 1);
        w.score = 700;
        w.lives = 2;
        w.player.pos = Vec2::new(300.0, 10.0);
        restart_level(&mut w);
        assert_eq!(w.score, 0);
        assert_eq!(w.lives, 2);
        assert_eq!(w.player.pos, w.level.spawn);
        assert_eq!(w.level.remaining_diamonds(), 4);
    }

    #[test]
    fn pause_toggles_only_in_play() {
        let mut w = world_with(&["....", "P...", "===="]);
        toggle_pause(&mut w);
        assert!(w.paused);
        toggle_pause(&mut w);
        assert!(!w.paused);
        w.phase = Phase::GameOver;
        toggle_pause(&mut w);
        assert!(!w.paused);
    }
}
