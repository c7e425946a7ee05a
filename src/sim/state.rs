//! Game state and core simulation types
//!
//! Every live object is owned by [`GameState`]. Subsystems borrow it mutably
//! for the duration of a tick; collaborators only ever see `&GameState`.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::Aabb;
use super::combo::ComboTracker;
use super::powerup::ActiveEffects;
use super::tick::Deferred;
use crate::consts::*;

/// Current phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Before the first `start()`
    Menu,
    /// Active gameplay (the level-complete banner does not leave this phase)
    Playing,
    /// Run ended; the frame loop stops rescheduling
    GameOver,
}

/// Non-blocking overlay shown on top of `Playing`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Overlay {
    LevelComplete { level: u32, ticks: u32 },
}

/// The player avatar ("Prompty")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Avatar {
    pub pos: Vec2,
    pub size: Vec2,
    pub speed: f32,
    /// Frames remaining on the hurt flash
    pub hurt_ticks: u32,
}

impl Avatar {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            pos: Vec2::new(
                (width - AVATAR_SIZE) / 2.0,
                height - AVATAR_SIZE - 10.0,
            ),
            size: Vec2::splat(AVATAR_SIZE),
            speed: AVATAR_SPEED,
            hurt_ticks: 0,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.pos, self.size)
    }

    pub fn is_hurt(&self) -> bool {
        self.hurt_ticks > 0
    }
}

/// A player projectile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Heart {
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: Vec2,
    /// Deals 3 damage instead of 1
    pub is_powerful: bool,
    /// Ricochets so far (uncapped)
    pub bounces: u32,
}

impl Heart {
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.pos, self.size)
    }

    pub fn damage(&self) -> u32 {
        super::collision::damage(self.is_powerful)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerKind {
    Regular,
    /// Level 4+ sub-enemy, converts faster
    Sick,
}

/// An enemy customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: u32,
    pub kind: CustomerKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: Vec2,
    pub hits: u32,
    /// Visual tier derived from `hits`
    pub emoji_index: u32,
}

impl Customer {
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.pos, self.size)
    }

    /// Hits needed before the customer is converted
    pub fn convert_threshold(&self) -> u32 {
        match self.kind {
            CustomerKind::Regular => CUSTOMER_CONVERT_HITS,
            CustomerKind::Sick => SICK_CONVERT_HITS,
        }
    }

    /// Apply damage; returns true once the conversion threshold is reached
    pub fn take_hit(&mut self, damage: u32) -> bool {
        self.hits = self.hits.saturating_add(damage);
        self.emoji_index = self.hits.min(MAX_EMOJI_INDEX);
        self.hits >= self.convert_threshold()
    }
}

/// Boss variants (mutually exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BossKind {
    Karen,
    EvilGoogleExec,
    LinkedInSpammer,
}

impl BossKind {
    pub const ALL: [BossKind; 3] = [
        BossKind::Karen,
        BossKind::EvilGoogleExec,
        BossKind::LinkedInSpammer,
    ];

    /// Deterministic round-robin: level 1 → Karen, 2 → Google, 3 → LinkedIn, ...
    pub fn for_level(level: u32) -> Self {
        Self::ALL[(level.max(1) as usize - 1) % Self::ALL.len()]
    }

    pub fn index(self) -> usize {
        match self {
            BossKind::Karen => 0,
            BossKind::EvilGoogleExec => 1,
            BossKind::LinkedInSpammer => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BossKind::Karen => "Karen",
            BossKind::EvilGoogleExec => "Evil Google Exec",
            BossKind::LinkedInSpammer => "LinkedIn Spammer",
        }
    }

    /// Frames the boss waits, once eligible, before materializing
    pub fn spawn_delay(self) -> u32 {
        match self {
            BossKind::Karen => 180,
            BossKind::EvilGoogleExec => 240,
            BossKind::LinkedInSpammer => 120,
        }
    }

    pub fn base_health(self) -> i32 {
        match self {
            BossKind::Karen => 15,
            BossKind::EvilGoogleExec => 20,
            BossKind::LinkedInSpammer => 25,
        }
    }

    pub fn base_speed(self) -> f32 {
        match self {
            BossKind::Karen => 2.0,
            BossKind::EvilGoogleExec => 2.5,
            BossKind::LinkedInSpammer => 3.0,
        }
    }

    /// Horizontal patrol corridor as fractions of the playfield width
    pub fn corridor(self) -> (f32, f32) {
        match self {
            BossKind::Karen => (0.1, 0.9),
            BossKind::EvilGoogleExec => (0.05, 0.95),
            BossKind::LinkedInSpammer => (0.0, 1.0),
        }
    }

    /// Base score for a non-lethal heart hit
    pub fn hit_score(self) -> u64 {
        match self {
            BossKind::LinkedInSpammer => SCORE_LINKEDIN_HIT,
            _ => SCORE_BOSS_HIT,
        }
    }
}

/// The single boss slot's occupant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boss {
    pub kind: BossKind,
    pub pos: Vec2,
    pub size: Vec2,
    /// +1 right, -1 left
    pub direction: f32,
    pub speed: f32,
    pub health: i32,
    pub max_health: i32,
    pub hit_flash_timer: u32,
    pub is_defeated: bool,
    /// Frames since defeat (drives the fade-out)
    pub fade_timer: u32,
    pub show_speech: bool,
    pub speech_timer: u32,
    pub quote_timer: u32,
    pub quote_index: usize,
    /// Frames until the next attack is allowed
    pub attack_timer: u32,
}

impl Boss {
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.pos, self.size)
    }

    pub fn quote(&self) -> &'static str {
        let quotes = super::boss::quotes(self.kind);
        quotes[self.quote_index % quotes.len()]
    }
}

/// Kind-specific boss projectile data
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum ProjectileKind {
    Laser {
        current_height: f32,
        max_height: f32,
        growth_timer: u32,
    },
    #[default]
    Arrow,
    Email {
        bounces: u32,
        max_bounces: u32,
    },
}

/// A projectile fired by a boss
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BossProjectile {
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: Vec2,
    pub kind: ProjectileKind,
}

impl BossProjectile {
    /// Collision box (lasers use their grown height)
    pub fn bounds(&self) -> Aabb {
        match self.kind {
            ProjectileKind::Laser { current_height, .. } => {
                Aabb::new(self.pos, Vec2::new(self.size.x, current_height))
            }
            _ => Aabb::new(self.pos, self.size),
        }
    }
}

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerUpKind {
    TripleShot,
    PowerfulHearts,
    RapidFire,
    ExtraLife,
}

impl PowerUpKind {
    pub const COUNT: usize = 4;
    pub const ALL: [PowerUpKind; Self::COUNT] = [
        PowerUpKind::TripleShot,
        PowerUpKind::PowerfulHearts,
        PowerUpKind::RapidFire,
        PowerUpKind::ExtraLife,
    ];

    pub fn index(self) -> usize {
        match self {
            PowerUpKind::TripleShot => 0,
            PowerUpKind::PowerfulHearts => 1,
            PowerUpKind::RapidFire => 2,
            PowerUpKind::ExtraLife => 3,
        }
    }

    /// Effect duration in frames
    pub fn duration(self) -> u32 {
        match self {
            PowerUpKind::ExtraLife => POWERUP_SHORT_TICKS,
            _ => POWERUP_LONG_TICKS,
        }
    }

    /// Floating-text cue shown on activation
    pub fn label(self) -> &'static str {
        match self {
            PowerUpKind::TripleShot => "TRIPLE SHOT!",
            PowerUpKind::PowerfulHearts => "POWER HEARTS!",
            PowerUpKind::RapidFire => "RAPID FIRE!",
            PowerUpKind::ExtraLife => "+1 LIFE!",
        }
    }
}

/// A stationary pickup charged by heart hits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerUp {
    pub id: u32,
    pub kind: PowerUpKind,
    pub pos: Vec2,
    pub size: Vec2,
    pub hits: u32,
}

impl PowerUp {
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.pos, self.size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParticleKind {
    #[default]
    Star,
    ComboBurst,
}

/// A short-lived visual particle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub kind: ParticleKind,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Frames remaining
    pub life: u32,
    pub size: f32,
}

/// Floating score / cue text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatingText {
    pub text: String,
    pub pos: Vec2,
    pub vel: Vec2,
    pub life: u32,
}

/// Snapshot of values the HUD displays, synced at the end of each tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HudState {
    pub score: u64,
    pub lives: u32,
    pub level: u32,
    pub combo_text: Option<String>,
    pub max_combo: u32,
    /// (kind, frames remaining) for every active effect
    pub effects: Vec<(PowerUpKind, u32)>,
    pub banner: Option<String>,
}

/// Spawn scheduler bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpawnTimers {
    /// Frames since the last customer spawn
    pub customer_ticks: u32,
    /// Per-variant boss countdown; `None` until lazily armed
    pub boss: [Option<u32>; 3],
    /// Frames until the next sick customer; `None` until armed
    pub sick: Option<u32>,
}

/// Complete simulation state for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub width: f32,
    pub height: f32,
    pub phase: GamePhase,
    pub overlay: Option<Overlay>,
    pub level: u32,
    pub lives: u32,
    pub score: u64,
    pub combo: ComboTracker,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub avatar: Avatar,
    pub shoot_cooldown: u32,
    pub hearts: Vec<Heart>,
    pub customers: Vec<Customer>,
    /// Zero or one boss, never more
    pub boss: Option<Boss>,
    pub boss_projectiles: Vec<BossProjectile>,
    pub powerups: Vec<PowerUp>,
    pub effects: ActiveEffects,
    /// Static scenery boss projectiles interact with
    pub tables: Vec<Aabb>,
    pub particles: Vec<Particle>,
    pub floating_texts: Vec<FloatingText>,
    pub spawn: SpawnTimers,
    pub customers_converted: u32,
    pub bosses_defeated: u32,
    pub hud: HudState,
    /// Delayed actions requested by ticks, waiting for the frame loop
    ///
    /// Kept in state so a fault later in the same tick cannot drop them.
    pub deferred: Vec<Deferred>,
    /// Next entity ID
    next_id: u32,
}

impl GameState {
    /// Fresh session state for a playfield of the given size
    pub fn new(width: f32, height: f32) -> Self {
        let mut state = Self {
            width,
            height,
            phase: GamePhase::Menu,
            overlay: None,
            level: 1,
            lives: STARTING_LIVES,
            score: 0,
            combo: ComboTracker::default(),
            time_ticks: 0,
            avatar: Avatar::new(width, height),
            shoot_cooldown: 0,
            hearts: Vec::new(),
            customers: Vec::new(),
            boss: None,
            boss_projectiles: Vec::new(),
            powerups: Vec::new(),
            effects: ActiveEffects::default(),
            tables: layout_tables(width, height),
            particles: Vec::new(),
            floating_texts: Vec::new(),
            spawn: SpawnTimers::default(),
            customers_converted: 0,
            bosses_defeated: 0,
            hud: HudState::default(),
            deferred: Vec::new(),
            next_id: 1,
        };
        state.sync_hud();
        state
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Live regular customers (sick ones are tracked separately)
    pub fn regular_customer_count(&self) -> usize {
        self.customers
            .iter()
            .filter(|c| c.kind == CustomerKind::Regular)
            .count()
    }

    pub fn sick_customer_count(&self) -> usize {
        self.customers
            .iter()
            .filter(|c| c.kind == CustomerKind::Sick)
            .count()
    }

    /// Add a particle, dropping the oldest when over `cap`
    pub fn push_particle(&mut self, particle: Particle, cap: usize) {
        if cap == 0 {
            return;
        }
        self.particles.push(particle);
        if self.particles.len() > cap {
            let excess = self.particles.len() - cap;
            self.particles.drain(..excess);
        }
    }

    /// Add floating text, dropping the oldest when over the cap
    pub fn push_text(&mut self, text: impl Into<String>, pos: Vec2) {
        self.floating_texts.push(FloatingText {
            text: text.into(),
            pos,
            vel: Vec2::new(0.0, -1.0),
            life: FLOATING_TEXT_LIFE,
        });
        if self.floating_texts.len() > MAX_FLOATING_TEXTS {
            let excess = self.floating_texts.len() - MAX_FLOATING_TEXTS;
            self.floating_texts.drain(..excess);
        }
    }

    /// Total live objects across every collection (diagnostics only)
    pub fn live_object_count(&self) -> usize {
        1 + self.hearts.len()
            + self.customers.len()
            + usize::from(self.boss.is_some())
            + self.boss_projectiles.len()
            + self.powerups.len()
            + self.particles.len()
            + self.floating_texts.len()
    }

    /// Copy display values into the HUD snapshot
    pub fn sync_hud(&mut self) {
        self.hud.score = self.score;
        self.hud.lives = self.lives;
        self.hud.level = self.level;
        self.hud.max_combo = self.combo.max_combo;
        self.hud.combo_text = (self.combo.multiplier > 1)
            .then(|| format!("COMBO x{}", self.combo.multiplier));
        self.hud.effects = self.effects.active();
        self.hud.banner = match self.overlay {
            Some(Overlay::LevelComplete { level, .. }) => Some(format!("LEVEL {level} COMPLETE!")),
            None => None,
        };
    }
}

/// Three tables spread across the middle band of the playfield
pub fn layout_tables(width: f32, height: f32) -> Vec<Aabb> {
    let table_size = Vec2::new(width * 0.15, 24.0);
    let y = height * 0.55;
    [0.2, 0.5, 0.8]
        .iter()
        .map(|&fx| Aabb::new(Vec2::new(width * fx - table_size.x / 2.0, y), table_size))
        .collect()
}
