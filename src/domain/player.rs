/// Player: position, velocity and the movement state machine.
///
/// ## Transitions
///   Idle ⇄ Walking        horizontal input while grounded
///   Idle/Walking → Jumping  jump input while grounded
///   Jumping → Falling     vertical velocity turns positive (apex passed)
///   grounded → Falling    resolver finds no floor under the feet
///   Jumping/Falling → Idle/Walking  ground collision
///   Walking → Pushing     wall collision while grounded
///   any → Trapped         health reaches 0 (terminal until `respawn`)
///
/// The `on_collide_*` hooks are only called by the collision resolver.
///
/// ## Frame order (`update`)
///   1. gravity (if airborne), clamped to terminal velocity
///   2. position += velocity
///   3. invincibility timer
///   4. animation clock

use tracing::debug;

use super::entity::{DrawSink, Facing, Sprite};
use super::geom::{Rect, Vec2};

pub const PLAYER_W: f32 = 32.0;
pub const PLAYER_H: f32 = 48.0;

const ANIM_FRAMES: u8 = 4;
const ANIM_FRAME_SECS: f32 = 0.1;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PlayerState {
    Idle,
    Walking,
    Jumping,
    Falling,
    Pushing,
    // Reserved for ladder / dirt interactions; nothing enters these yet.
    #[allow(dead_code)]
    Climbing,
    #[allow(dead_code)]
    Digging,
    Trapped,
}

/// Movement tunables (copied out of the config at load).
#[derive(Clone, Copy, Debug)]
pub struct PlayerTuning {
    /// Added to velocity.y every frame while airborne.
    pub gravity: f32,
    pub jump_impulse: f32,
    pub walk_speed: f32,
    pub max_fall_speed: f32,
    pub invincibility_secs: f32,
    pub starting_health: u32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        PlayerTuning {
            gravity: 0.5,
            jump_impulse: 10.0,
            walk_speed: 4.0,
            max_fall_speed: 15.0,
            invincibility_secs: 2.0,
            starting_health: 3,
        }
    }
}

/// Per-frame input, already reduced from keys / gamepad.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayerInput {
    /// -1 left, 0 none, 1 right.
    pub horizontal: i8,
    /// Edge-triggered.
    pub jump: bool,
}

#[derive(Clone, Debug)]
pub struct Player {
    /// Top-left corner of the bounding box.
    pub pos: Vec2,
    /// Position before this frame's integration; the resolver uses it to
    /// tell which edge caused an overlap.
    pub prev_pos: Vec2,
    pub vel: Vec2,
    pub grounded: bool,
    pub facing: Facing,
    pub state: PlayerState,
    pub health: u32,
    pub invincible: bool,
    pub invincible_time: f32,
    anim_time: f32,
    pub frame: u8,
    diamonds_this_frame: u32,
    pub tuning: PlayerTuning,
}

impl Player {
    pub fn new(pos: Vec2, tuning: PlayerTuning) -> Self {
        Player {
            pos,
            prev_pos: pos,
            vel: Vec2::ZERO,
            grounded: false,
            facing: Facing::Right,
            state: PlayerState::Idle,
            health: tuning.starting_health,
            invincible: false,
            invincible_time: 0.0,
            anim_time: 0.0,
            frame: 0,
            diamonds_this_frame: 0,
            tuning,
        }
    }

    /// Reposition for a level (re)start: full health, no motion, Idle.
    pub fn reset(&mut self, pos: Vec2) {
        *self = Player::new(pos, self.tuning);
    }

    /// Leave the Trapped state at `pos`.
    pub fn respawn(&mut self, pos: Vec2) {
        debug!(x = pos.x, y = pos.y, "player respawn");
        self.reset(pos);
    }

    pub fn bounds(&self) -> Rect {
        Rect::at(self.pos, PLAYER_W, PLAYER_H)
    }

    pub fn prev_bounds(&self) -> Rect {
        Rect::at(self.prev_pos, PLAYER_W, PLAYER_H)
    }

    pub fn is_dead(&self) -> bool {
        self.state == PlayerState::Trapped
    }

    /// Apply this frame's input. Returns true if a jump impulse fired.
    pub fn handle_input(&mut self, input: PlayerInput) -> bool {
        if self.is_dead() {
            return false;
        }

        self.vel.x = input.horizontal.signum() as f32 * self.tuning.walk_speed;
        match input.horizontal.signum() {
            -1 => self.facing = Facing::Left,
            1 => self.facing = Facing::Right,
            _ => {}
        }

        if self.grounded {
            self.state = self.ground_state();
            if input.jump {
                self.vel.y = -self.tuning.jump_impulse;
                self.grounded = false;
                self.state = PlayerState::Jumping;
                return true;
            }
        }
        false
    }

    pub fn update(&mut self, dt: f32) {
        self.prev_pos = self.pos;
        if self.is_dead() {
            return;
        }

        if !self.grounded {
            self.vel.y = (self.vel.y + self.tuning.gravity).min(self.tuning.max_fall_speed);
            if self.state == PlayerState::Jumping && self.vel.y > 0.0 {
                self.state = PlayerState::Falling;
            }
        }

        self.pos = self.pos + self.vel;

        if self.invincible {
            self.invincible_time -= dt;
            if self.invincible_time <= 0.0 {
                self.invincible_time = 0.0;
                self.invincible = false;
            }
        }

        self.anim_time += dt;
        while self.anim_time >= ANIM_FRAME_SECS {
            self.anim_time -= ANIM_FRAME_SECS;
            self.frame = (self.frame + 1) % ANIM_FRAMES;
        }
    }

    fn ground_state(&self) -> PlayerState {
        if self.vel.x == 0.0 { PlayerState::Idle } else { PlayerState::Walking }
    }

    // ── Collision hooks (resolver only) ──

    /// Landed on a floor. Ignored unless descending.
    pub fn on_collide_with_ground(&mut self) {
        if self.vel.y > 0.0 && !self.is_dead() {
            self.grounded = true;
            self.vel.y = 0.0;
            self.state = self.ground_state();
        }
    }

    /// Bumped a ceiling. Ignored unless ascending.
    pub fn on_collide_with_ceiling(&mut self) {
        if self.vel.y < 0.0 {
            self.vel.y = 0.0;
        }
    }

    /// Ran into a wall; the resolver moves the player flush.
    pub fn on_collide_with_wall(&mut self) {
        self.vel.x = 0.0;
        if self.grounded && self.state == PlayerState::Walking {
            self.state = PlayerState::Pushing;
        }
    }

    /// No floor under the feet any more (walked off a ledge).
    pub fn on_leave_ground(&mut self) {
        if self.grounded {
            self.grounded = false;
            if !self.is_dead() && self.state != PlayerState::Jumping {
                self.state = PlayerState::Falling;
            }
        }
    }

    pub fn on_collide_with_diamond(&mut self) {
        self.diamonds_this_frame += 1;
    }

    /// Enemy or hazard contact. Returns true if health was lost.
    pub fn on_collide_with_enemy(&mut self) -> bool {
        if self.invincible || self.is_dead() {
            return false;
        }
        self.health = self.health.saturating_sub(1);
        self.invincible = true;
        self.invincible_time = self.tuning.invincibility_secs;
        if self.health == 0 {
            self.state = PlayerState::Trapped;
            self.vel = Vec2::ZERO;
        }
        true
    }

    /// Completion is decided by the level; nothing to do here.
    pub fn on_collide_with_exit(&mut self) {}

    /// Number of diamonds collected since the last call; clears the flag.
    pub fn take_diamond_flag(&mut self) -> u32 {
        std::mem::take(&mut self.diamonds_this_frame)
    }

    pub fn draw(&self, sink: &mut dyn DrawSink) {
        // Blink at 5 Hz while invincible
        let blink = self.invincible && (self.invincible_time * 10.0) as i32 % 2 == 1;
        sink.draw_sprite(Sprite::Player { facing: self.facing, blink }, self.bounds(), self.frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grounded_player() -> Player {
        let mut p = Player::new(Vec2::new(0.0, 0.0), PlayerTuning::default());
        p.grounded = true;
        p
    }

    #[test]
    fn idle_to_walking_and_back() {
        let mut p = grounded_player();
        p.handle_input(PlayerInput { horizontal: 1, jump: false });
        assert_eq!(p.state, PlayerState::Walking);
        assert_eq!(p.vel.x, 4.0);
        assert_eq!(p.facing, Facing::Right);
        p.handle_input(PlayerInput::default());
        assert_eq!(p.state, PlayerState::Idle);
        assert_eq!(p.vel.x, 0.0);
        assert_eq!(p.facing, Facing::Right);
    }

    #[test]
    fn jump_requires_ground() {
        let mut p = grounded_player();
        assert!(p.handle_input(PlayerInput { horizontal: 0, jump: true }));
        assert_eq!(p.state, PlayerState::Jumping);
        assert_eq!(p.vel.y, -10.0);
        assert!(!p.grounded);
        // No double jump
        assert!(!p.handle_input(PlayerInput { horizontal: 0, jump: true }));
        assert_eq!(p.vel.y, -10.0);
    }

    #[test]
    fn jumping_turns_to_falling_after_apex() {
        let mut p = grounded_player();
        p.handle_input(PlayerInput { horizontal: 0, jump: true });
        let mut frames = 0;
        while p.state == PlayerState::Jumping {
            p.update(1.0 / 60.0);
            frames += 1;
            assert!(frames < 100);
        }
        assert_eq!(p.state, PlayerState::Falling);
        assert!(p.vel.y > 0.0);
        // -10 + 0.5 * 21 = +0.5
        assert_eq!(frames, 21);
    }

    #[test]
    fn gravity_only_while_airborne() {
        let mut p = grounded_player();
        p.update(1.0 / 60.0);
        assert_eq!(p.vel.y, 0.0);
        assert_eq!(p.pos.y, 0.0);

        p.grounded = false;
        p.update(1.0 / 60.0);
        assert_eq!(p.vel.y, 0.5);
        assert_eq!(p.pos.y, 0.5);
        assert_eq!(p.prev_pos.y, 0.0);
    }

    #[test]
    fn fall_speed_is_clamped() {
        let mut p = Player::new(Vec2::ZERO, PlayerTuning::default());
        for _ in 0..200 {
            p.update(1.0 / 60.0);
        }
        assert_eq!(p.vel.y, 15.0);
    }

    #[test]
    fn ground_hook_only_when_descending() {
        let mut p = Player::new(Vec2::ZERO, PlayerTuning::default());
        p.vel.y = -3.0;
        p.on_collide_with_ground();
        assert!(!p.grounded);
        assert_eq!(p.vel.y, -3.0);

        p.vel = Vec2::new(4.0, 5.0);
        p.state = PlayerState::Falling;
        p.on_collide_with_ground();
        assert!(p.grounded);
        assert_eq!(p.vel.y, 0.0);
        assert_eq!(p.state, PlayerState::Walking);
    }

    #[test]
    fn ceiling_hook_only_when_ascending() {
        let mut p = Player::new(Vec2::ZERO, PlayerTuning::default());
        p.vel.y = 2.0;
        p.on_collide_with_ceiling();
        assert_eq!(p.vel.y, 2.0);
        p.vel.y = -6.0;
        p.on_collide_with_ceiling();
        assert_eq!(p.vel.y, 0.0);
        assert!(!p.grounded);
    }

    #[test]
    fn wall_hook_stops_and_pushes() {
        let mut p = grounded_player();
        p.handle_input(PlayerInput { horizontal: -1, jump: false });
        p.on_collide_with_wall();
        assert_eq!(p.vel.x, 0.0);
        assert_eq!(p.state, PlayerState::Pushing);
    }

    #[test]
    fn leaving_ground_starts_fall() {
        let mut p = grounded_player();
        p.handle_input(PlayerInput { horizontal: 1, jump: false });
        p.on_leave_ground();
        assert!(!p.grounded);
        assert_eq!(p.state, PlayerState::Falling);
    }

    #[test]
    fn invincibility_window() {
        let mut p = Player::new(Vec2::ZERO, PlayerTuning::default());
        assert!(p.on_collide_with_enemy());
        assert_eq!(p.health, 2);
        assert!(p.invincible);
        assert_eq!(p.invincible_time, 2.0);

        // 1.0 s later: still protected
        for _ in 0..10 {
            p.update(0.1);
        }
        assert!(!p.on_collide_with_enemy());
        assert_eq!(p.health, 2);

        // 2.1 s after the first hit: vulnerable again
        for _ in 0..11 {
            p.update(0.1);
        }
        assert!(!p.invincible);
        assert_eq!(p.invincible_time, 0.0);
        assert!(p.on_collide_with_enemy());
        assert_eq!(p.health, 1);
    }

    #[test]
    fn last_hit_traps_until_respawn() {
        let mut p = grounded_player();
        p.health = 1;
        p.on_collide_with_enemy();
        assert!(p.is_dead());
        assert_eq!(p.state, PlayerState::Trapped);

        // Frozen: no input, no motion, no more damage
        assert!(!p.handle_input(PlayerInput { horizontal: 1, jump: true }));
        p.update(0.1);
        assert_eq!(p.pos, Vec2::ZERO);
        p.invincible = false;
        assert!(!p.on_collide_with_enemy());

        p.respawn(Vec2::new(64.0, 32.0));
        assert_eq!(p.state, PlayerState::Idle);
        assert_eq!(p.health, 3);
        assert_eq!(p.pos, Vec2::new(64.0, 32.0));
        assert!(!p.invincible);
    }

    #[test]
    fn diamond_flag_is_consumed_once() {
        let mut p = Player::new(Vec2::ZERO, PlayerTuning::default());
        p.on_collide_with_diamond();
        p.on_collide_with_diamond();
        assert_eq!(p.take_diamond_flag(), 2);
        assert_eq!(p.take_diamond_flag(), 0);
    }
}
