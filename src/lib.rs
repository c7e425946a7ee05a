//! Prompty Arcade - single-screen heart-throwing arcade game
//!
//! Core modules:
//! - `sim`: Simulation core (entities, collisions, scoring, bosses, frame loop)
//! - `settings`: Runtime configuration loaded from JSON
//! - `error`: Fault taxonomy for ticks, collaborators and settings
//!
//! Rendering, audio playback and UI wiring are host concerns. The core only
//! emits requests to them through [`sim::Host`].

pub mod error;
pub mod settings;
pub mod sim;

pub use error::{HostError, SettingsError, SimError};
pub use settings::{QualityPreset, Settings};

use glam::Vec2;

/// Game configuration constants
///
/// All timings are in frames (60 Hz nominal) unless suffixed `_MS`.
pub mod consts {
    /// Nominal frame interval at 60 Hz
    pub const FRAME_MS: f64 = 1000.0 / 60.0;

    /// Default playfield dimensions (host may override via settings)
    pub const DEFAULT_WIDTH: f32 = 800.0;
    pub const DEFAULT_HEIGHT: f32 = 600.0;

    /// Session defaults
    pub const STARTING_LIVES: u32 = 3;
    pub const MAX_LIVES: u32 = 5;

    /// Avatar (Prompty)
    pub const AVATAR_SIZE: f32 = 50.0;
    pub const AVATAR_SPEED: f32 = 6.0;
    pub const AVATAR_HURT_TICKS: u32 = 60;

    /// Hearts
    pub const HEART_SIZE: f32 = 20.0;
    pub const POWERFUL_HEART_SIZE: f32 = 28.0;
    pub const HEART_SPEED: f32 = 10.0;
    pub const SHOOT_COOLDOWN: u32 = 15;
    pub const RAPID_FIRE_COOLDOWN: u32 = 8;
    pub const TRIPLE_SHOT_SPREAD: f32 = 0.2;
    pub const HEART_DAMAGE: u32 = 1;
    pub const POWERFUL_HEART_DAMAGE: u32 = 3;

    /// Customers (enemies)
    pub const CUSTOMER_SIZE: f32 = 40.0;
    pub const MAX_CUSTOMERS: usize = 8;
    pub const CUSTOMER_SPAWN_THRESHOLD: u32 = 240;
    pub const CUSTOMER_CONVERT_HITS: u32 = 5;
    pub const SICK_CONVERT_HITS: u32 = 3;
    pub const MAX_EMOJI_INDEX: u32 = 4;
    /// Fraction of customers that must be cleared before a boss may appear
    pub const BOSS_CLEAR_FRACTION: f32 = 0.7;

    /// Sick customers (level 4+)
    pub const SICK_MIN_LEVEL: u32 = 4;
    pub const SICK_INTERVAL_MIN: u32 = 600;
    pub const SICK_INTERVAL_MAX: u32 = 900;
    pub const SICK_MAX_CONCURRENT: usize = 3;

    /// Ricochet tuning
    pub const CUSTOMER_RICOCHET_SPEED: (f32, f32) = (15.0, 20.0);
    pub const CUSTOMER_RICOCHET_JITTER: f32 = 0.25;
    pub const LINKEDIN_RICOCHET_SPEED: (f32, f32) = (18.0, 25.0);
    pub const LINKEDIN_RICOCHET_JITTER: f32 = 0.15;

    /// Reflection damping when a boss projectile strikes a table
    pub const TABLE_BOUNCE_DAMPING: f32 = 0.8;

    /// Scoring
    pub const COMBO_TIMEOUT_MS: f64 = 2000.0;
    pub const MAX_COMBO_MULTIPLIER: u32 = 5;
    pub const SCORE_CUSTOMER_HIT: u64 = 5;
    pub const SCORE_CUSTOMER_CONVERT: u64 = 10;
    pub const SCORE_BOSS_HIT: u64 = 10;
    pub const SCORE_LINKEDIN_HIT: u64 = 12;
    pub const SCORE_BOSS_DEFEAT: u64 = 100;

    /// Bosses
    pub const BOSS_SIZE: f32 = 80.0;
    pub const BOSS_Y: f32 = 20.0;
    pub const BOSS_HIT_FLASH_TICKS: u32 = 10;
    pub const BOSS_SPEECH_TOGGLE_TICKS: u32 = 120;
    pub const BOSS_QUOTE_TICKS: u32 = 300;
    pub const BOSS_HEALTH_PER_ROTATION: i32 = 5;
    pub const BOSS_REMOVAL_DELAY_MS: f64 = 500.0;
    pub const BOSS_WATCHDOG_DELAY_MS: f64 = 100.0;

    /// Karen laser attack
    pub const KAREN_SHOOT_COOLDOWN: u32 = 120;
    pub const KAREN_FIRE_CHANCE: f64 = 0.02;
    pub const LASER_WIDTH: f32 = 10.0;
    pub const LASER_START_HEIGHT: f32 = 10.0;
    pub const LASER_MAX_HEIGHT: f32 = 150.0;
    pub const LASER_GROWTH: f32 = 10.0;
    pub const LASER_GROWTH_TICKS: u32 = 2;
    pub const LASER_SPEED: f32 = 5.0;

    /// EvilGoogleExec arrow attack
    pub const ARROW_INTERVAL: u32 = 90;
    pub const ARROW_SPEED: f32 = 7.0;
    pub const ARROW_SIZE: (f32, f32) = (24.0, 8.0);

    /// LinkedInSpammer email attack
    pub const EMAIL_INTERVAL: u32 = 75;
    pub const EMAIL_SIZE: (f32, f32) = (20.0, 16.0);
    pub const EMAIL_MAX_BOUNCES: u32 = 3;

    /// Power-ups
    pub const POWERUP_SIZE: f32 = 30.0;
    pub const MAX_POWERUPS: usize = 3;
    pub const POWERUP_SPAWN_CHANCE: f64 = 0.001;
    pub const POWERUP_CHARGE_HITS: u32 = 5;
    pub const POWERUP_LONG_TICKS: u32 = 300;
    pub const POWERUP_SHORT_TICKS: u32 = 60;

    /// Particles
    pub const STAR_LIFE: u32 = 30;
    pub const FLOATING_TEXT_LIFE: u32 = 60;
    pub const COMBO_BURST_LIFE: u32 = 45;
    pub const MAX_FLOATING_TEXTS: usize = 32;
    pub const LEVEL_BANNER_TICKS: u32 = 120;

    /// Memory governor caps
    pub const GOVERNOR_MAX_CUSTOMERS: usize = 24;
    pub const GOVERNOR_MAX_HEARTS: usize = 120;
    pub const GOVERNOR_MAX_BOSS_PROJECTILES: usize = 60;
    pub const POOL_CAPACITY: usize = 64;

    /// Frame loop
    pub const FAULT_BACKOFF_MS: f64 = 100.0;
    pub const DEFAULT_FRAME_BUDGET_MS: f32 = 16.7;
    pub const DEFAULT_GOVERNOR_INTERVAL: u64 = 300;
}

/// Center point of an axis-aligned box given its top-left corner and size
#[inline]
pub fn center_of(pos: Vec2, size: Vec2) -> Vec2 {
    pos + size * 0.5
}

/// Rotate a vector by `angle` radians using a 2D rotation matrix
#[inline]
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    glam::Mat2::from_angle(angle) * v
}
