//! Boss behaviour: patrol, speech cycle, attacks and the defeat sequence
//!
//! All three variants share the [`Boss`] shape; only the attack differs.

use glam::Vec2;
use rand::Rng;

use super::pool::Pools;
use super::state::{Boss, BossKind, BossProjectile, GameState, ProjectileKind};
use super::tick::SoundCue;
use crate::consts::*;
use crate::center_of;

const KAREN_QUOTES: &[&str] = &[
    "I want to speak to your manager!",
    "This prompt is NOT what I ordered.",
    "I've been a loyal user since yesterday!",
    "Do you know who I am?",
];

const GOOGLE_QUOTES: &[&str] = &[
    "Don't be evil? We deprecated that.",
    "Your data is our product roadmap.",
    "We're sunsetting your happiness.",
    "Have you tried our new chatbot? And the other one?",
];

const LINKEDIN_QUOTES: &[&str] = &[
    "I'm thrilled to announce...",
    "Agree?",
    "Let's circle back on synergy.",
    "Humbled to be endorsed for Hearts.",
    "Here's what my toddler taught me about B2B sales.",
];

/// Quote list for a variant
pub fn quotes(kind: BossKind) -> &'static [&'static str] {
    match kind {
        BossKind::Karen => KAREN_QUOTES,
        BossKind::EvilGoogleExec => GOOGLE_QUOTES,
        BossKind::LinkedInSpammer => LINKEDIN_QUOTES,
    }
}

/// Whether later boss processing should run this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BossStatus {
    Continue,
    SkipRemaining,
}

/// Create the boss for `kind` at the current level
pub fn spawn(kind: BossKind, level: u32, width: f32, rng: &mut impl Rng) -> Boss {
    let rotation = (level.max(1) - 1) / 3;
    let health = kind.base_health() + BOSS_HEALTH_PER_ROTATION * rotation as i32;
    let speed_scale = (1.0 + 0.1 * (level.max(1) - 1) as f32).min(2.0);
    let (lo, hi) = corridor(kind, width);
    let quote_count = quotes(kind).len();

    Boss {
        kind,
        pos: Vec2::new((lo + hi) / 2.0, BOSS_Y),
        size: Vec2::splat(BOSS_SIZE),
        direction: if rng.random_bool(0.5) { 1.0 } else { -1.0 },
        speed: kind.base_speed() * speed_scale,
        health,
        max_health: health,
        hit_flash_timer: 0,
        is_defeated: false,
        fade_timer: 0,
        show_speech: true,
        speech_timer: 0,
        quote_timer: 0,
        quote_index: match kind {
            BossKind::LinkedInSpammer => 0,
            _ => rng.random_range(0..quote_count),
        },
        attack_timer: initial_attack_timer(kind),
    }
}

fn initial_attack_timer(kind: BossKind) -> u32 {
    match kind {
        BossKind::Karen => KAREN_SHOOT_COOLDOWN,
        BossKind::EvilGoogleExec => ARROW_INTERVAL,
        BossKind::LinkedInSpammer => EMAIL_INTERVAL,
    }
}

/// Leftmost/rightmost x the boss's top-left corner may reach
fn corridor(kind: BossKind, width: f32) -> (f32, f32) {
    let (lo, hi) = kind.corridor();
    let left = width * lo;
    let right = (width * hi - BOSS_SIZE).max(left);
    (left, right)
}

/// Advance the living boss by one frame: patrol, speech, attack
///
/// A defeated boss only advances its fade and skips everything else.
pub fn update(
    state: &mut GameState,
    pools: &mut Pools,
    rng: &mut impl Rng,
    sounds: &mut Vec<SoundCue>,
) -> BossStatus {
    let avatar_center = center_of(state.avatar.pos, state.avatar.size);
    let width = state.width;
    let Some(boss) = state.boss.as_mut() else {
        return BossStatus::Continue;
    };

    boss.hit_flash_timer = boss.hit_flash_timer.saturating_sub(1);
    if boss.is_defeated {
        boss.fade_timer += 1;
        return BossStatus::SkipRemaining;
    }

    patrol(boss, width);
    speech_cycle(boss, rng);

    if let Some(projectile) = attack(boss, avatar_center, pools, rng) {
        sounds.push(match projectile.kind {
            ProjectileKind::Laser { .. } => SoundCue::Laser,
            ProjectileKind::Arrow => SoundCue::Arrow,
            ProjectileKind::Email { .. } => SoundCue::Email,
        });
        state.boss_projectiles.push(projectile);
    }

    BossStatus::Continue
}

/// Bounded horizontal patrol; direction flips at either corridor bound
fn patrol(boss: &mut Boss, width: f32) {
    let (left, right) = corridor(boss.kind, width);
    boss.pos.x += boss.speed * boss.direction;
    if boss.pos.x <= left {
        boss.pos.x = left;
        boss.direction = 1.0;
    } else if boss.pos.x >= right {
        boss.pos.x = right;
        boss.direction = -1.0;
    }
}

fn speech_cycle(boss: &mut Boss, rng: &mut impl Rng) {
    boss.speech_timer += 1;
    if boss.speech_timer >= BOSS_SPEECH_TOGGLE_TICKS {
        boss.speech_timer = 0;
        boss.show_speech = !boss.show_speech;
    }

    boss.quote_timer += 1;
    if boss.quote_timer >= BOSS_QUOTE_TICKS {
        boss.quote_timer = 0;
        let count = quotes(boss.kind).len();
        boss.quote_index = match boss.kind {
            BossKind::LinkedInSpammer => (boss.quote_index + 1) % count,
            _ => rng.random_range(0..count),
        };
    }
}

/// Variant-specific attack; returns the projectile fired, if any
fn attack(
    boss: &mut Boss,
    target: Vec2,
    pools: &mut Pools,
    rng: &mut impl Rng,
) -> Option<BossProjectile> {
    if boss.attack_timer > 0 {
        boss.attack_timer -= 1;
        return None;
    }

    // Karen's cooldown only unlocks a per-frame chance to fire
    if boss.kind == BossKind::Karen && !rng.random_bool(KAREN_FIRE_CHANCE) {
        return None;
    }

    let origin = center_of(boss.pos, boss.size);
    let mut projectile: BossProjectile = pools.acquire_or_default();

    match boss.kind {
        BossKind::Karen => {
            projectile.size = Vec2::new(LASER_WIDTH, LASER_MAX_HEIGHT);
            projectile.pos = Vec2::new(origin.x - LASER_WIDTH / 2.0, boss.pos.y + boss.size.y);
            projectile.vel = Vec2::new(0.0, LASER_SPEED);
            projectile.kind = ProjectileKind::Laser {
                current_height: LASER_START_HEIGHT,
                max_height: LASER_MAX_HEIGHT,
                growth_timer: 0,
            };
            boss.attack_timer = KAREN_SHOOT_COOLDOWN;
        }
        BossKind::EvilGoogleExec => {
            let size = Vec2::new(ARROW_SIZE.0, ARROW_SIZE.1);
            let aim = (target - origin).try_normalize().unwrap_or(Vec2::Y);
            projectile.size = size;
            projectile.pos = origin - size / 2.0;
            projectile.vel = aim * ARROW_SPEED;
            projectile.kind = ProjectileKind::Arrow;
            boss.attack_timer = ARROW_INTERVAL;
        }
        BossKind::LinkedInSpammer => {
            let size = Vec2::new(EMAIL_SIZE.0, EMAIL_SIZE.1);
            projectile.size = size;
            projectile.pos = Vec2::new(origin.x - size.x / 2.0, boss.pos.y + boss.size.y);
            projectile.vel = Vec2::new(rng.random_range(-4.0..=4.0), rng.random_range(3.0..=6.0));
            projectile.kind = ProjectileKind::Email {
                bounces: 0,
                max_bounces: EMAIL_MAX_BOUNCES,
            };
            boss.attack_timer = EMAIL_INTERVAL;
        }
    }

    Some(projectile)
}

/// Outcome of a heart striking the boss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BossHit {
    Damaged,
    Defeated,
}

/// Apply `damage` to the living boss
///
/// On lethal damage the defeat sequence starts: health is zeroed, the boss is
/// flagged, the fade begins and every boss projectile is cleared. Removal
/// itself is deferred (see `DeferredAction::RemoveDefeatedBoss`).
pub fn apply_hit(state: &mut GameState, pools: &mut Pools, damage: u32) -> Option<BossHit> {
    let boss = state.boss.as_mut().filter(|b| !b.is_defeated)?;
    boss.health -= damage as i32;
    boss.hit_flash_timer = BOSS_HIT_FLASH_TICKS;

    if boss.health > 0 {
        return Some(BossHit::Damaged);
    }

    boss.health = 0;
    boss.is_defeated = true;
    boss.fade_timer = 0;
    boss.show_speech = false;
    let kind = boss.kind;
    let center = center_of(boss.pos, boss.size);

    state.score += SCORE_BOSS_DEFEAT;
    state.bosses_defeated += 1;
    pools.release_all(state.boss_projectiles.drain(..));
    state.push_text(format!("+{SCORE_BOSS_DEFEAT}"), center);
    log::info!("{} defeated on level {}", kind.name(), state.level);

    Some(BossHit::Defeated)
}

/// Final step of the defeat sequence: drop the boss and advance the level
///
/// Returns the level just completed, or `None` if there was nothing to remove.
pub fn remove_defeated(state: &mut GameState) -> Option<u32> {
    if !state.boss.as_ref().is_some_and(|b| b.is_defeated) {
        return None;
    }
    state.boss = None;
    let completed = state.level;
    state.level += 1;
    state.spawn.boss = [None; 3];
    log::info!("Level {completed} complete, advancing to {}", state.level);
    Some(completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn playing_state(kind: BossKind) -> (GameState, Pools, Pcg32) {
        let mut rng = Pcg32::seed_from_u64(11);
        let mut state = GameState::new(800.0, 600.0);
        state.boss = Some(spawn(kind, 1, 800.0, &mut rng));
        (state, Pools::default(), rng)
    }

    #[test]
    fn test_health_scales_per_rotation() {
        let mut rng = Pcg32::seed_from_u64(1);
        assert_eq!(spawn(BossKind::Karen, 1, 800.0, &mut rng).health, 15);
        assert_eq!(spawn(BossKind::Karen, 4, 800.0, &mut rng).health, 20);
        assert_eq!(spawn(BossKind::LinkedInSpammer, 6, 800.0, &mut rng).health, 30);
    }

    #[test]
    fn test_patrol_stays_in_corridor() {
        let (mut state, mut pools, mut rng) = playing_state(BossKind::Karen);
        let mut sounds = Vec::new();
        let mut flipped = false;
        let mut last_dir = state.boss.as_ref().unwrap().direction;
        for _ in 0..2000 {
            update(&mut state, &mut pools, &mut rng, &mut sounds);
            let boss = state.boss.as_ref().unwrap();
            assert!(boss.pos.x >= 80.0 - 1e-3);
            assert!(boss.pos.x <= 720.0 - BOSS_SIZE + 1e-3);
            if boss.direction != last_dir {
                flipped = true;
                last_dir = boss.direction;
            }
        }
        assert!(flipped);
    }

    #[test]
    fn test_google_fires_arrows_on_interval() {
        let (mut state, mut pools, mut rng) = playing_state(BossKind::EvilGoogleExec);
        let mut sounds = Vec::new();
        for _ in 0..=ARROW_INTERVAL {
            update(&mut state, &mut pools, &mut rng, &mut sounds);
        }
        assert_eq!(state.boss_projectiles.len(), 1);
        assert_eq!(sounds, vec![SoundCue::Arrow]);
        // Aimed down toward the avatar
        assert!(state.boss_projectiles[0].vel.y > 0.0);
    }

    #[test]
    fn test_linkedin_quotes_rotate_in_order() {
        let (mut state, mut pools, mut rng) = playing_state(BossKind::LinkedInSpammer);
        let mut sounds = Vec::new();
        for _ in 0..BOSS_QUOTE_TICKS * 2 {
            update(&mut state, &mut pools, &mut rng, &mut sounds);
        }
        let boss = state.boss.as_ref().unwrap();
        assert_eq!(boss.quote_index, 2);
        assert_eq!(boss.quote(), LINKEDIN_QUOTES[2]);
    }

    #[test]
    fn test_speech_bubble_toggles() {
        let (mut state, mut pools, mut rng) = playing_state(BossKind::Karen);
        let mut sounds = Vec::new();
        for _ in 0..BOSS_SPEECH_TOGGLE_TICKS {
            update(&mut state, &mut pools, &mut rng, &mut sounds);
        }
        assert!(!state.boss.as_ref().unwrap().show_speech);
    }

    #[test]
    fn test_powerful_hit_defeats_karen() {
        let (mut state, mut pools, _) = playing_state(BossKind::Karen);
        state.boss.as_mut().unwrap().health = 1;
        state.boss_projectiles.push(BossProjectile::default());

        assert_eq!(apply_hit(&mut state, &mut pools, 3), Some(BossHit::Defeated));
        let boss = state.boss.as_ref().unwrap();
        assert_eq!(boss.health, 0);
        assert!(boss.is_defeated);
        assert_eq!(state.score, SCORE_BOSS_DEFEAT);
        assert_eq!(state.bosses_defeated, 1);
        assert!(state.boss_projectiles.is_empty());

        // Further hits are ignored while fading
        assert_eq!(apply_hit(&mut state, &mut pools, 3), None);
    }

    #[test]
    fn test_defeated_boss_fades_and_skips() {
        let (mut state, mut pools, mut rng) = playing_state(BossKind::Karen);
        state.boss.as_mut().unwrap().health = 1;
        apply_hit(&mut state, &mut pools, 1);
        let mut sounds = Vec::new();
        let status = update(&mut state, &mut pools, &mut rng, &mut sounds);
        assert_eq!(status, BossStatus::SkipRemaining);
        assert_eq!(state.boss.as_ref().unwrap().fade_timer, 1);
    }

    #[test]
    fn test_remove_defeated_advances_level_once() {
        let (mut state, mut pools, _) = playing_state(BossKind::Karen);
        assert_eq!(remove_defeated(&mut state), None);
        state.boss.as_mut().unwrap().health = 1;
        apply_hit(&mut state, &mut pools, 1);

        assert_eq!(remove_defeated(&mut state), Some(1));
        assert!(state.boss.is_none());
        assert_eq!(state.level, 2);
        assert_eq!(remove_defeated(&mut state), None);
        assert_eq!(state.level, 2);
    }
}
