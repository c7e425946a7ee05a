//! Object pools and the memory governor
//!
//! High-churn entities (hearts, particles, boss projectiles) are recycled
//! through typed pools instead of being dropped and reallocated. The governor
//! periodically hard-caps every unbounded collection, oldest entries first.

use glam::Vec2;

use super::state::{BossProjectile, GameState, Heart, Particle, ParticleKind, ProjectileKind};
use crate::consts::*;

/// Clear every field back to its zero value before reuse
pub trait Resettable {
    fn reset(&mut self);
}

impl Resettable for Heart {
    fn reset(&mut self) {
        self.pos = Vec2::ZERO;
        self.vel = Vec2::ZERO;
        self.size = Vec2::ZERO;
        self.is_powerful = false;
        self.bounces = 0;
    }
}

impl Resettable for Particle {
    fn reset(&mut self) {
        self.kind = ParticleKind::Star;
        self.pos = Vec2::ZERO;
        self.vel = Vec2::ZERO;
        self.life = 0;
        self.size = 0.0;
    }
}

impl Resettable for BossProjectile {
    fn reset(&mut self) {
        self.pos = Vec2::ZERO;
        self.vel = Vec2::ZERO;
        self.size = Vec2::ZERO;
        self.kind = ProjectileKind::default();
    }
}

/// Kinds with a dedicated pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    Heart,
    Particle,
    BossProjectile,
}

/// A resettable type that knows which pool it belongs to
pub trait Pooled: Resettable + Sized {
    const KIND: PoolKind;

    fn pool(pools: &mut Pools) -> &mut Pool<Self>;
}

impl Pooled for Heart {
    const KIND: PoolKind = PoolKind::Heart;

    fn pool(pools: &mut Pools) -> &mut Pool<Self> {
        &mut pools.hearts
    }
}

impl Pooled for Particle {
    const KIND: PoolKind = PoolKind::Particle;

    fn pool(pools: &mut Pools) -> &mut Pool<Self> {
        &mut pools.particles
    }
}

impl Pooled for BossProjectile {
    const KIND: PoolKind = PoolKind::BossProjectile;

    fn pool(pools: &mut Pools) -> &mut Pool<Self> {
        &mut pools.boss_projectiles
    }
}

/// Bounded free list for one entity kind
#[derive(Debug, Clone)]
pub struct Pool<T> {
    free: Vec<T>,
    capacity: usize,
}

impl<T: Resettable> Pool<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            free: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Reuse a pooled instance, if any
    pub fn acquire(&mut self) -> Option<T> {
        self.free.pop()
    }

    /// Reset and keep `item` for reuse; dropped silently when full
    pub fn release(&mut self, mut item: T) {
        if self.free.len() >= self.capacity {
            return;
        }
        item.reset();
        self.free.push(item);
    }

    pub fn len(&self) -> usize {
        self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }

    pub fn clear(&mut self) {
        self.free.clear();
    }
}

/// All entity pools
#[derive(Debug, Clone)]
pub struct Pools {
    hearts: Pool<Heart>,
    particles: Pool<Particle>,
    boss_projectiles: Pool<BossProjectile>,
}

impl Default for Pools {
    fn default() -> Self {
        Self::with_capacity(POOL_CAPACITY)
    }
}

impl Pools {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            hearts: Pool::new(capacity),
            particles: Pool::new(capacity),
            boss_projectiles: Pool::new(capacity),
        }
    }

    /// Reused instance of `T`, or `None` if the caller must allocate
    pub fn acquire<T: Pooled>(&mut self) -> Option<T> {
        T::pool(self).acquire()
    }

    /// Reused instance of `T`, falling back to a fresh default
    pub fn acquire_or_default<T: Pooled + Default>(&mut self) -> T {
        self.acquire().unwrap_or_default()
    }

    pub fn release<T: Pooled>(&mut self, item: T) {
        T::pool(self).release(item);
    }

    /// Release every item yielded by `items`
    pub fn release_all<T: Pooled>(&mut self, items: impl IntoIterator<Item = T>) {
        let pool = T::pool(self);
        for item in items {
            pool.release(item);
        }
    }

    /// Free-list length for a kind (diagnostics)
    pub fn available(&self, kind: PoolKind) -> usize {
        match kind {
            PoolKind::Heart => self.hearts.len(),
            PoolKind::Particle => self.particles.len(),
            PoolKind::BossProjectile => self.boss_projectiles.len(),
        }
    }
}

/// Hard caps applied by the governor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GovernorCaps {
    pub customers: usize,
    pub hearts: usize,
    pub boss_projectiles: usize,
    pub particles: usize,
    pub floating_texts: usize,
}

impl GovernorCaps {
    pub fn with_particle_cap(particles: usize) -> Self {
        Self {
            customers: GOVERNOR_MAX_CUSTOMERS,
            hearts: GOVERNOR_MAX_HEARTS,
            boss_projectiles: GOVERNOR_MAX_BOSS_PROJECTILES,
            particles,
            floating_texts: MAX_FLOATING_TEXTS,
        }
    }
}

/// Outcome of one governor pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GovernorReport {
    /// Entries discarded across all collections
    pub trimmed: usize,
    /// Live objects after trimming (observability only)
    pub live_objects: usize,
}

/// Periodic FIFO trimming of unbounded collections
#[derive(Debug, Clone)]
pub struct MemoryGovernor {
    pub caps: GovernorCaps,
}

impl MemoryGovernor {
    pub fn new(caps: GovernorCaps) -> Self {
        Self { caps }
    }

    /// Trim every collection to its cap, keeping the most recent entries
    pub fn run(&self, state: &mut GameState, pools: &mut Pools) -> GovernorReport {
        let mut trimmed = 0;

        trimmed += trim_oldest(&mut state.customers, self.caps.customers).count();
        trimmed += trim_oldest(&mut state.floating_texts, self.caps.floating_texts).count();

        let hearts: Vec<Heart> = trim_oldest(&mut state.hearts, self.caps.hearts).collect();
        trimmed += hearts.len();
        pools.release_all(hearts);

        let particles: Vec<Particle> =
            trim_oldest(&mut state.particles, self.caps.particles).collect();
        trimmed += particles.len();
        pools.release_all(particles);

        let projectiles: Vec<BossProjectile> =
            trim_oldest(&mut state.boss_projectiles, self.caps.boss_projectiles).collect();
        trimmed += projectiles.len();
        pools.release_all(projectiles);

        let live_objects = state.live_object_count();
        if trimmed > 0 {
            log::debug!("Governor trimmed {trimmed} objects ({live_objects} live)");
        }

        GovernorReport {
            trimmed,
            live_objects,
        }
    }
}

/// Drain the oldest entries beyond `cap` (insertion order)
fn trim_oldest<T>(items: &mut Vec<T>, cap: usize) -> std::vec::Drain<'_, T> {
    let excess = items.len().saturating_sub(cap);
    items.drain(..excess)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{Customer, CustomerKind};
    use proptest::prelude::*;

    fn heart(bounces: u32) -> Heart {
        Heart {
            pos: Vec2::new(1.0, 2.0),
            vel: Vec2::new(3.0, 4.0),
            size: Vec2::splat(20.0),
            is_powerful: true,
            bounces,
        }
    }

    #[test]
    fn test_acquire_empty_pool() {
        let mut pools = Pools::default();
        assert!(pools.acquire::<Heart>().is_none());
        assert_eq!(pools.acquire_or_default::<Heart>(), Heart::default());
    }

    #[test]
    fn test_release_resets_fields() {
        let mut pools = Pools::default();
        pools.release(heart(9));
        assert_eq!(pools.available(PoolKind::Heart), 1);
        let reused: Heart = pools.acquire().unwrap();
        assert_eq!(reused, Heart::default());
    }

    #[test]
    fn test_release_laser_resets_kind() {
        let mut pools = Pools::default();
        pools.release(BossProjectile {
            pos: Vec2::ONE,
            vel: Vec2::ONE,
            size: Vec2::ONE,
            kind: ProjectileKind::Laser {
                current_height: 40.0,
                max_height: 150.0,
                growth_timer: 1,
            },
        });
        let reused: BossProjectile = pools.acquire().unwrap();
        assert_eq!(reused, BossProjectile::default());
    }

    #[test]
    fn test_pool_overflow_dropped() {
        let mut pools = Pools::with_capacity(2);
        for i in 0..5 {
            pools.release(heart(i));
        }
        assert_eq!(pools.available(PoolKind::Heart), 2);
        assert_eq!(pools.available(PoolKind::Particle), 0);
    }

    #[test]
    fn test_governor_trims_oldest_first() {
        let mut state = GameState::new(800.0, 600.0);
        let mut pools = Pools::default();
        for i in 0..30 {
            let id = state.next_entity_id();
            state.customers.push(Customer {
                id,
                kind: CustomerKind::Regular,
                pos: Vec2::new(i as f32, 0.0),
                vel: Vec2::ZERO,
                size: Vec2::splat(CUSTOMER_SIZE),
                hits: 0,
                emoji_index: 0,
            });
        }
        for i in 0..10 {
            state.hearts.push(heart(i));
        }

        let governor = MemoryGovernor::new(GovernorCaps {
            customers: 24,
            hearts: 4,
            boss_projectiles: 10,
            particles: 10,
            floating_texts: 10,
        });
        let report = governor.run(&mut state, &mut pools);

        assert_eq!(state.customers.len(), 24);
        assert_eq!(state.customers[0].id, 7);
        assert_eq!(state.hearts.len(), 4);
        assert_eq!(state.hearts[0].bounces, 6);
        assert_eq!(report.trimmed, 6 + 6);
        assert_eq!(report.live_objects, state.live_object_count());
        assert_eq!(pools.available(PoolKind::Heart), 6);
    }

    proptest! {
        #[test]
        fn prop_governor_never_exceeds_caps(n in 0usize..200, cap in 0usize..64) {
            let mut state = GameState::new(800.0, 600.0);
            let mut pools = Pools::default();
            for i in 0..n {
                state.push_particle(Particle { life: i as u32, ..Default::default() }, usize::MAX);
            }
            let governor = MemoryGovernor::new(GovernorCaps::with_particle_cap(cap));
            governor.run(&mut state, &mut pools);
            prop_assert!(state.particles.len() <= cap);
            if n > cap && cap > 0 {
                prop_assert_eq!(state.particles[0].life as usize, n - cap);
            }
        }
    }
}
