//! One-frame simulation tick
//!
//! Phases run in a fixed order: movement, collisions, spawning, decay, HUD
//! sync. That order is observable (a heart that ricochets and leaves the
//! playfield in the same frame is culled after the ricochet).

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::boss::{self, BossHit, BossStatus};
use super::collision::{Aabb, Ricochet, reflect_off, ricochet_velocity};
use super::pool::Pools;
use super::powerup::{self, ChargeResult};
use super::spawn::{self, BossSchedule};
use super::state::{
    BossKind, GamePhase, GameState, Heart, Overlay, Particle, ParticleKind, PowerUpKind,
    ProjectileKind,
};
use crate::consts::*;
use crate::error::SimError;
use crate::{center_of, rotate};

/// Input sampled by the host for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Monotonic wall clock (ms)
    pub now_ms: f64,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    /// Shoot key held
    pub shoot: bool,
    /// Pointer/touch position in playfield coordinates
    pub pointer: Option<Vec2>,
    /// Pointer pressed / finger down (moves toward the pointer and shoots)
    pub pointer_active: bool,
}

/// Sound cues requested from the audio collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    Shoot,
    Hit,
    Convert,
    BossAppear,
    BossHit,
    Victory,
    Hurt,
    Bounce,
    Laser,
    Arrow,
    Email,
    PowerUpHit,
    PowerUp,
    LevelUp,
    GameOver,
}

impl SoundCue {
    pub fn name(&self) -> &'static str {
        match self {
            SoundCue::Shoot => "shoot",
            SoundCue::Hit => "hit",
            SoundCue::Convert => "convert",
            SoundCue::BossAppear => "bossAppear",
            SoundCue::BossHit => "bossHit",
            SoundCue::Victory => "victory",
            SoundCue::Hurt => "hurt",
            SoundCue::Bounce => "bounce",
            SoundCue::Laser => "laser",
            SoundCue::Arrow => "arrow",
            SoundCue::Email => "email",
            SoundCue::PowerUpHit => "powerupHit",
            SoundCue::PowerUp => "powerup",
            SoundCue::LevelUp => "levelUp",
            SoundCue::GameOver => "gameOver",
        }
    }
}

/// Requests for the host's collaborators, in emission order
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Sound(SoundCue),
    LevelComplete { level: u32 },
    GameOver { score: u64 },
}

/// Work to run after a real-time delay, owned by the frame loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeferredAction {
    /// Null the defeated boss, advance the level, show the overlay
    RemoveDefeatedBoss,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Deferred {
    pub delay_ms: f64,
    pub action: DeferredAction,
}

/// Everything a tick produced besides state mutation
///
/// Delayed actions are not reported here; they are queued on
/// [`GameState::deferred`] so they outlive a faulted tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub events: Vec<GameEvent>,
}

/// Mutable resources a tick borrows from its owner
pub struct TickContext<'a> {
    pub pools: &'a mut Pools,
    pub rng: &'a mut Pcg32,
    pub max_particles: usize,
}

const CUSTOMER_RICOCHET: Ricochet = Ricochet {
    speed: CUSTOMER_RICOCHET_SPEED,
    jitter: CUSTOMER_RICOCHET_JITTER,
};

const LINKEDIN_RICOCHET: Ricochet = Ricochet {
    speed: LINKEDIN_RICOCHET_SPEED,
    jitter: LINKEDIN_RICOCHET_JITTER,
};

/// Advance the game state by one frame
///
/// Does nothing outside `Playing`. Returns `Err` only for transient faults;
/// state mutated before the fault is kept.
pub fn tick(
    state: &mut GameState,
    ctx: &mut TickContext<'_>,
    input: &TickInput,
) -> Result<TickReport, SimError> {
    let mut report = TickReport::default();
    if state.phase != GamePhase::Playing {
        return Ok(report);
    }

    state.time_ticks += 1;
    let now = input.now_ms;
    let mut sounds = Vec::new();

    // --- Movement ---
    move_avatar(state, input);
    shoot(state, ctx, input, &mut sounds);
    for heart in &mut state.hearts {
        heart.pos += heart.vel;
    }
    move_customers(state);
    let mut boss_status = boss::update(state, ctx.pools, ctx.rng, &mut sounds);
    move_boss_projectiles(state);
    check_finite(state)?;

    // --- Collisions ---
    hearts_vs_customers(state, ctx, now, &mut sounds);
    if boss_status == BossStatus::Continue {
        boss_status = hearts_vs_boss(state, ctx, now, &mut sounds);
    }
    hearts_vs_powerups(state, ctx, &mut sounds);
    if boss_status == BossStatus::Continue {
        boss_projectiles_vs_world(state, ctx, &mut sounds);
    }
    cull_hearts(state, ctx.pools);

    if state.phase == GamePhase::GameOver {
        sounds.push(SoundCue::GameOver);
        report.events.extend(sounds.into_iter().map(GameEvent::Sound));
        report.events.push(GameEvent::GameOver { score: state.score });
        state.sync_hud();
        return Ok(report);
    }

    // --- Spawning ---
    let spawned = spawn::run(state, ctx.rng);
    if let BossSchedule::Spawned(_) = spawned.boss {
        sounds.push(SoundCue::BossAppear);
    }

    // --- Decay ---
    decay(state, ctx.pools, now);

    // --- HUD ---
    state.sync_hud();

    report.events.extend(sounds.into_iter().map(GameEvent::Sound));
    Ok(report)
}

fn move_avatar(state: &mut GameState, input: &TickInput) {
    let avatar = &mut state.avatar;
    let mut dir = Vec2::ZERO;
    if input.left {
        dir.x -= 1.0;
    }
    if input.right {
        dir.x += 1.0;
    }
    if input.up {
        dir.y -= 1.0;
    }
    if input.down {
        dir.y += 1.0;
    }
    avatar.pos += dir * avatar.speed;

    // Pointer steering: glide the avatar's center toward the pointer
    if let (true, Some(target)) = (input.pointer_active, input.pointer) {
        let to_target = target - center_of(avatar.pos, avatar.size);
        let dist = to_target.length();
        if dist > 0.0 {
            avatar.pos += to_target / dist * dist.min(avatar.speed);
        }
    }

    avatar.pos.x = avatar.pos.x.clamp(0.0, (state.width - avatar.size.x).max(0.0));
    avatar.pos.y = avatar.pos.y.clamp(0.0, (state.height - avatar.size.y).max(0.0));
}

/// Fire hearts if requested and the cooldown has elapsed
fn shoot(
    state: &mut GameState,
    ctx: &mut TickContext<'_>,
    input: &TickInput,
    sounds: &mut Vec<SoundCue>,
) {
    if state.shoot_cooldown > 0 {
        state.shoot_cooldown -= 1;
    }
    if !(input.shoot || input.pointer_active) || state.shoot_cooldown > 0 {
        return;
    }

    let powerful = state.effects.is_active(PowerUpKind::PowerfulHearts);
    let size = Vec2::splat(if powerful {
        POWERFUL_HEART_SIZE
    } else {
        HEART_SIZE
    });
    let origin = Vec2::new(
        state.avatar.pos.x + state.avatar.size.x / 2.0 - size.x / 2.0,
        state.avatar.pos.y - size.y,
    );
    let angles: &[f32] = if state.effects.is_active(PowerUpKind::TripleShot) {
        &[-TRIPLE_SHOT_SPREAD, 0.0, TRIPLE_SHOT_SPREAD]
    } else {
        &[0.0]
    };

    for &angle in angles {
        let mut heart: Heart = ctx.pools.acquire_or_default();
        heart.pos = origin;
        heart.vel = rotate(Vec2::new(0.0, -HEART_SPEED), angle);
        heart.size = size;
        heart.is_powerful = powerful;
        heart.bounces = 0;
        state.hearts.push(heart);
    }

    state.shoot_cooldown = if state.effects.is_active(PowerUpKind::RapidFire) {
        RAPID_FIRE_COOLDOWN
    } else {
        SHOOT_COOLDOWN
    };
    sounds.push(SoundCue::Shoot);
}

/// Customers drift sideways and bounce off the playfield edges
fn move_customers(state: &mut GameState) {
    let width = state.width;
    for customer in &mut state.customers {
        customer.pos += customer.vel;
        let max_x = (width - customer.size.x).max(0.0);
        if customer.pos.x <= 0.0 {
            customer.pos.x = 0.0;
            customer.vel.x = customer.vel.x.abs();
        } else if customer.pos.x >= max_x {
            customer.pos.x = max_x;
            customer.vel.x = -customer.vel.x.abs();
        }
    }
}

fn move_boss_projectiles(state: &mut GameState) {
    for projectile in &mut state.boss_projectiles {
        projectile.pos += projectile.vel;
        if let ProjectileKind::Laser {
            ref mut current_height,
            max_height,
            ref mut growth_timer,
        } = projectile.kind
        {
            *growth_timer += 1;
            if *growth_timer >= LASER_GROWTH_TICKS {
                *growth_timer = 0;
                *current_height = (*current_height + LASER_GROWTH).min(max_height);
            }
        }
    }
}

/// Reject NaN/inf before collision math spreads it
fn check_finite(state: &GameState) -> Result<(), SimError> {
    let bad = |entity: &'static str, pos: Vec2, vel: Vec2| {
        if !pos.is_finite() {
            Err(SimError::NonFinite {
                entity,
                field: "position",
            })
        } else if !vel.is_finite() {
            Err(SimError::NonFinite {
                entity,
                field: "velocity",
            })
        } else {
            Ok(())
        }
    };

    bad("avatar", state.avatar.pos, Vec2::ZERO)?;
    for heart in &state.hearts {
        bad("heart", heart.pos, heart.vel)?;
    }
    for customer in &state.customers {
        bad("customer", customer.pos, customer.vel)?;
    }
    if let Some(boss) = &state.boss {
        bad("boss", boss.pos, Vec2::ZERO)?;
    }
    for projectile in &state.boss_projectiles {
        bad("boss projectile", projectile.pos, projectile.vel)?;
    }
    Ok(())
}

/// Hearts ricochet off customers; each heart strikes at most one per frame
fn hearts_vs_customers(
    state: &mut GameState,
    ctx: &mut TickContext<'_>,
    now: f64,
    sounds: &mut Vec<SoundCue>,
) {
    for h in 0..state.hearts.len() {
        let heart_box = state.hearts[h].bounds();
        let Some(c) = state
            .customers
            .iter()
            .position(|c| c.bounds().overlaps(&heart_box))
        else {
            continue;
        };

        let target = state.customers[c].bounds();
        let heart = &mut state.hearts[h];
        let damage = heart.damage();
        if let Some(vel) = ricochet_velocity(&heart_box, &target, CUSTOMER_RICOCHET, ctx.rng) {
            heart.vel = vel;
            heart.bounces += 1;
        }

        let gained = state.combo.score_hit(SCORE_CUSTOMER_HIT, now);
        state.score += gained;
        sounds.push(SoundCue::Hit);
        let center = target.center();
        state.push_text(format!("+{gained}"), center);
        spawn_stars(state, ctx, center, 4);
        combo_burst(state, ctx, center);

        if state.customers[c].take_hit(damage) {
            state.customers.remove(c);
            state.score += SCORE_CUSTOMER_CONVERT;
            state.customers_converted += 1;
            sounds.push(SoundCue::Convert);
            state.push_text(format!("CONVERTED! +{SCORE_CUSTOMER_CONVERT}"), center);
            spawn_stars(state, ctx, center, 10);
        }
    }
}

/// Hearts against the living boss
///
/// Karen and the Google exec absorb the heart; the LinkedIn spammer deflects
/// it. Returns `SkipRemaining` once the boss is defeated this frame.
fn hearts_vs_boss(
    state: &mut GameState,
    ctx: &mut TickContext<'_>,
    now: f64,
    sounds: &mut Vec<SoundCue>,
) -> BossStatus {
    let Some((kind, boss_box)) = state
        .boss
        .as_ref()
        .filter(|b| !b.is_defeated)
        .map(|b| (b.kind, b.bounds()))
    else {
        return BossStatus::Continue;
    };

    let mut h = 0;
    while h < state.hearts.len() {
        let heart_box = state.hearts[h].bounds();
        if !heart_box.overlaps(&boss_box) {
            h += 1;
            continue;
        }

        let damage = state.hearts[h].damage();
        let absorbed = kind != BossKind::LinkedInSpammer;
        if !absorbed {
            let heart = &mut state.hearts[h];
            if let Some(vel) = ricochet_velocity(&heart_box, &boss_box, LINKEDIN_RICOCHET, ctx.rng)
            {
                heart.vel = vel;
                heart.bounces += 1;
            }
        }

        let outcome = boss::apply_hit(state, ctx.pools, damage);
        if absorbed {
            let heart = state.hearts.remove(h);
            ctx.pools.release(heart);
        } else {
            h += 1;
        }

        match outcome {
            Some(BossHit::Damaged) => {
                let gained = state.combo.score_hit(kind.hit_score(), now);
                state.score += gained;
                sounds.push(SoundCue::BossHit);
                state.push_text(format!("+{gained}"), boss_box.center());
                spawn_stars(state, ctx, boss_box.center(), 5);
            }
            Some(BossHit::Defeated) => {
                state.combo.register_hit(now);
                sounds.push(SoundCue::Victory);
                spawn_stars(state, ctx, boss_box.center(), 20);
                state.deferred.push(Deferred {
                    delay_ms: BOSS_REMOVAL_DELAY_MS,
                    action: DeferredAction::RemoveDefeatedBoss,
                });
                return BossStatus::SkipRemaining;
            }
            None => {}
        }
    }

    BossStatus::Continue
}

/// Hearts are consumed by power-ups and charge them
fn hearts_vs_powerups(state: &mut GameState, ctx: &mut TickContext<'_>, sounds: &mut Vec<SoundCue>) {
    let mut h = 0;
    while h < state.hearts.len() {
        let heart_box = state.hearts[h].bounds();
        let Some(p) = state
            .powerups
            .iter()
            .position(|p| p.bounds().overlaps(&heart_box))
        else {
            h += 1;
            continue;
        };

        let heart = state.hearts.remove(h);
        ctx.pools.release(heart);
        sounds.push(SoundCue::PowerUpHit);

        if let ChargeResult::Activated(activation) = powerup::charge(state, p) {
            sounds.push(SoundCue::PowerUp);
            if activation.kind == PowerUpKind::ExtraLife {
                state.lives = (state.lives + 1).min(MAX_LIVES);
            }
        }
    }
}

/// Boss projectiles against tables, the avatar and the playfield edge
fn boss_projectiles_vs_world(
    state: &mut GameState,
    ctx: &mut TickContext<'_>,
    sounds: &mut Vec<SoundCue>,
) {
    let avatar_box = state.avatar.bounds();
    let mut i = 0;
    while i < state.boss_projectiles.len() {
        let projectile = &mut state.boss_projectiles[i];
        let mut destroyed = false;

        match projectile.kind {
            ProjectileKind::Laser { .. } | ProjectileKind::Arrow => {
                let bounds = projectile.bounds();
                destroyed = state.tables.iter().any(|t| t.overlaps(&bounds));
            }
            ProjectileKind::Email {
                ref mut bounces,
                max_bounces,
            } => {
                let mut body = Aabb::new(projectile.pos, projectile.size);
                for table in &state.tables {
                    if reflect_off(&mut body, &mut projectile.vel, table).is_some() {
                        *bounces += 1;
                        sounds.push(SoundCue::Bounce);
                    }
                }
                projectile.pos = body.pos;
                destroyed = *bounces > max_bounces;
            }
        }

        let hit_avatar = !destroyed && projectile.bounds().overlaps(&avatar_box);
        destroyed |= hit_avatar || projectile.bounds().is_outside(state.width, state.height);

        if destroyed {
            let projectile = state.boss_projectiles.remove(i);
            ctx.pools.release(projectile);
        } else {
            i += 1;
        }

        if hit_avatar && hurt_avatar(state, sounds) {
            return;
        }
    }
}

/// Take a life; returns true when that ended the run
fn hurt_avatar(state: &mut GameState, sounds: &mut Vec<SoundCue>) -> bool {
    state.lives = state.lives.saturating_sub(1);
    state.avatar.hurt_ticks = AVATAR_HURT_TICKS;
    sounds.push(SoundCue::Hurt);

    if state.lives == 0 {
        state.phase = GamePhase::GameOver;
        log::info!(
            "Game over on level {} with score {}",
            state.level,
            state.score
        );
        return true;
    }
    false
}

fn cull_hearts(state: &mut GameState, pools: &mut Pools) {
    let (width, height) = (state.width, state.height);
    let mut i = 0;
    while i < state.hearts.len() {
        if state.hearts[i].bounds().is_outside(width, height) {
            let heart = state.hearts.remove(i);
            pools.release(heart);
        } else {
            i += 1;
        }
    }
}

/// Particles, texts, combo, effect timers and flash counters
fn decay(state: &mut GameState, pools: &mut Pools, now: f64) {
    for particle in &mut state.particles {
        particle.pos += particle.vel;
        particle.vel *= 0.95;
        particle.life = particle.life.saturating_sub(1);
    }
    let (alive, dead): (Vec<Particle>, Vec<Particle>) = std::mem::take(&mut state.particles)
        .into_iter()
        .partition(|p| p.life > 0);
    state.particles = alive;
    pools.release_all(dead);

    for text in &mut state.floating_texts {
        text.pos += text.vel;
        text.life = text.life.saturating_sub(1);
    }
    state.floating_texts.retain(|t| t.life > 0);

    state.combo.decay(now);
    state.effects.tick();
    state.avatar.hurt_ticks = state.avatar.hurt_ticks.saturating_sub(1);

    if let Some(Overlay::LevelComplete { level, ticks }) = state.overlay {
        state.overlay = (ticks > 1).then_some(Overlay::LevelComplete {
            level,
            ticks: ticks - 1,
        });
    }
}

fn spawn_stars(state: &mut GameState, ctx: &mut TickContext<'_>, center: Vec2, count: usize) {
    for _ in 0..count {
        let mut star: Particle = ctx.pools.acquire_or_default();
        let angle = ctx.rng.random_range(0.0..std::f32::consts::TAU);
        let speed: f32 = ctx.rng.random_range(1.0..3.0);
        star.kind = ParticleKind::Star;
        star.pos = center;
        star.vel = Vec2::new(angle.cos(), angle.sin()) * speed;
        star.life = STAR_LIFE;
        star.size = ctx.rng.random_range(3.0..6.0);
        state.push_particle(star, ctx.max_particles);
    }
}

/// Burst + banner text once a streak reaches x3
fn combo_burst(state: &mut GameState, ctx: &mut TickContext<'_>, center: Vec2) {
    let multiplier = state.combo.multiplier;
    if multiplier < 3 {
        return;
    }
    let mut burst: Particle = ctx.pools.acquire_or_default();
    burst.kind = ParticleKind::ComboBurst;
    burst.pos = center;
    burst.vel = Vec2::ZERO;
    burst.life = COMBO_BURST_LIFE;
    burst.size = 10.0 * multiplier as f32;
    state.push_particle(burst, ctx.max_particles);
    state.push_text(format!("COMBO x{multiplier}"), center - Vec2::new(0.0, 20.0));
}
