//! Simulation core
//!
//! All gameplay logic lives here. Given the same seed and the same input
//! stream it produces the same run:
//! - One tick per frame, fixed phase order
//! - Seeded RNG only
//! - Stable iteration order (insertion order)
//! - No rendering, audio or platform dependencies

pub mod boss;
pub mod collision;
pub mod combo;
pub mod frame_loop;
pub mod pool;
pub mod powerup;
pub mod simulation;
pub mod spawn;
pub mod state;
pub mod tick;
pub mod timers;

pub use collision::{Aabb, Face, Ricochet, reflect_off, ricochet_velocity};
pub use combo::ComboTracker;
pub use frame_loop::{FrameLoop, FrameOutcome, FrameToken, Host, LoopStats, LoopStatus, Simulate};
pub use pool::{GovernorCaps, GovernorReport, MemoryGovernor, Pools};
pub use powerup::ActiveEffects;
pub use simulation::Simulation;
pub use state::{
    Avatar, Boss, BossKind, BossProjectile, Customer, CustomerKind, GamePhase, GameState, Heart,
    HudState, Overlay, PowerUp, PowerUpKind, ProjectileKind,
};
pub use tick::{Deferred, DeferredAction, GameEvent, SoundCue, TickInput, TickReport, tick};
pub use timers::DelayedTasks;
