/// Entities: Diamond, Enemy, Exit.
///
/// Mixed collections are handled with the closed `Entity` sum type; every
/// variant answers the same small contract (`update`, `bounds`, `draw`).
/// Drawing goes through `DrawSink` so the core never touches a backend.

use super::geom::{Rect, Vec2};

pub const DIAMOND_SIZE: f32 = 16.0;
pub const ENEMY_SIZE: f32 = 32.0;

const DIAMOND_FRAMES: u8 = 4;
const DIAMOND_FRAME_SECS: f32 = 0.1;
const ENEMY_FRAMES: u8 = 4;
const ENEMY_FRAME_SECS: f32 = 0.2;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }
}

/// Sprite identifiers handed to the render provider. No pixel data.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Sprite {
    Diamond,
    Enemy(Facing),
    ExitClosed,
    ExitOpen,
    Player { facing: Facing, blink: bool },
}

/// Render provider seam: "draw this sprite in this rectangle".
pub trait DrawSink {
    fn draw_sprite(&mut self, sprite: Sprite, rect: Rect, frame: u8);
}

// ── Diamond ──

#[derive(Clone, Debug)]
pub struct Diamond {
    /// Centre of the diamond.
    pub pos: Vec2,
    pub collected: bool,
    anim_time: f32,
    pub frame: u8,
}

impl Diamond {
    pub fn new(center: Vec2) -> Self {
        Diamond { pos: center, collected: false, anim_time: 0.0, frame: 0 }
    }

    pub fn update(&mut self, dt: f32) {
        if self.collected {
            return;
        }
        self.anim_time += dt;
        while self.anim_time >= DIAMOND_FRAME_SECS {
            self.anim_time -= DIAMOND_FRAME_SECS;
            self.frame = (self.frame + 1) % DIAMOND_FRAMES;
        }
    }

    /// One-way: a collected diamond stays collected.
    pub fn collect(&mut self) {
        self.collected = true;
    }

    pub fn bounds(&self) -> Rect {
        Rect::centered(self.pos, DIAMOND_SIZE, DIAMOND_SIZE)
    }

    pub fn draw(&self, sink: &mut dyn DrawSink) {
        if !self.collected {
            sink.draw_sprite(Sprite::Diamond, self.bounds(), self.frame);
        }
    }
}

// ── Enemy ──

/// Horizontal patroller. Never leaves `[origin - range, origin + range]`.
#[derive(Clone, Debug)]
pub struct Enemy {
    /// Top-left corner.
    pub pos: Vec2,
    pub origin_x: f32,
    pub patrol_range: f32,
    /// World units per frame.
    pub speed: f32,
    pub direction: Facing,
    anim_time: f32,
    pub frame: u8,
}

impl Enemy {
    pub fn new(pos: Vec2, speed: f32, patrol_range: f32) -> Self {
        Enemy {
            pos,
            origin_x: pos.x,
            patrol_range,
            speed,
            direction: Facing::Right,
            anim_time: 0.0,
            frame: 0,
        }
    }

    /// One fixed step of patrol motion; `dt` only drives the animation.
    pub fn update(&mut self, dt: f32) {
        let min_x = self.origin_x - self.patrol_range;
        let max_x = self.origin_x + self.patrol_range;

        self.pos.x += self.speed * self.direction.sign();
        if self.pos.x >= max_x {
            self.pos.x = max_x;
            self.direction = Facing::Left;
        } else if self.pos.x <= min_x {
            self.pos.x = min_x;
            self.direction = Facing::Right;
        }

        self.anim_time += dt;
        while self.anim_time >= ENEMY_FRAME_SECS {
            self.anim_time -= ENEMY_FRAME_SECS;
            self.frame = (self.frame + 1) % ENEMY_FRAMES;
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::at(self.pos, ENEMY_SIZE, ENEMY_SIZE)
    }

    pub fn draw(&self, sink: &mut dyn DrawSink) {
        sink.draw_sprite(Sprite::Enemy(self.direction), self.bounds(), self.frame);
    }
}

// ── Exit ──

#[derive(Clone, Debug)]
pub struct ExitMarker {
    pub rect: Rect,
    /// Mirrors "no diamonds left"; only affects drawing.
    pub open: bool,
}

impl ExitMarker {
    pub fn new(rect: Rect) -> Self {
        ExitMarker { rect, open: false }
    }

    pub fn bounds(&self) -> Rect {
        self.rect
    }

    pub fn draw(&self, sink: &mut dyn DrawSink) {
        let sprite = if self.open { Sprite::ExitOpen } else { Sprite::ExitClosed };
        sink.draw_sprite(sprite, self.rect, 0);
    }
}

// ── Sum type over entity kinds ──

#[derive(Clone, Debug)]
pub enum Entity {
    Diamond(Diamond),
    Enemy(Enemy),
    Exit(ExitMarker),
}

impl Entity {
    pub fn update(&mut self, dt: f32) {
        match self {
            Entity::Diamond(d) => d.update(dt),
            Entity::Enemy(e) => e.update(dt),
            Entity::Exit(_) => {}
        }
    }

    pub fn bounds(&self) -> Rect {
        match self {
            Entity::Diamond(d) => d.bounds(),
            Entity::Enemy(e) => e.bounds(),
            Entity::Exit(x) => x.bounds(),
        }
    }

    pub fn draw(&self, sink: &mut dyn DrawSink) {
        match self {
            Entity::Diamond(d) => d.draw(sink),
            Entity::Enemy(e) => e.draw(sink),
            Entity::Exit(x) => x.draw(sink),
        }
    }

    /// True for a diamond still waiting to be picked up.
    pub fn is_live_diamond(&self) -> bool {
        matches!(self, Entity::Diamond(d) if !d.collected)
    }
}
