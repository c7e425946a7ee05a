//! Spawn scheduling for customers, sick customers, power-ups and bosses

use glam::Vec2;
use rand::Rng;

use super::boss;
use super::powerup;
use super::state::{BossKind, Customer, CustomerKind, GameState};
use crate::consts::*;

/// Live regular customers at or below which a boss may appear
pub fn boss_gate() -> usize {
    let cleared = (MAX_CUSTOMERS as f32 * BOSS_CLEAR_FRACTION).ceil() as usize;
    MAX_CUSTOMERS - cleared
}

/// True when no boss is alive and customers have been mostly cleared
pub fn boss_eligible(state: &GameState) -> bool {
    state.boss.is_none() && state.regular_customer_count() <= boss_gate()
}

/// What the boss scheduler did this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BossSchedule {
    /// Not eligible; all countdowns cleared
    Idle,
    /// Eligible and counting down
    Waiting { kind: BossKind, remaining: u32 },
    /// The boss materialized this frame
    Spawned(BossKind),
}

impl BossSchedule {
    /// Whether the boss branch owns this frame (suppresses customer spawns)
    pub fn is_active(&self) -> bool {
        !matches!(self, BossSchedule::Idle)
    }
}

/// Advance the boss countdown for the current level's variant
///
/// Countdowns are armed lazily the first eligible frame and decremented on
/// every eligible frame after. Any variant that is not the current one, or
/// every variant when ineligible, has its countdown cleared.
pub fn schedule_boss(state: &mut GameState, rng: &mut impl Rng) -> BossSchedule {
    if !boss_eligible(state) {
        state.spawn.boss = [None; 3];
        return BossSchedule::Idle;
    }

    let kind = BossKind::for_level(state.level);
    for other in BossKind::ALL.iter().filter(|k| **k != kind) {
        state.spawn.boss[other.index()] = None;
    }

    let timer = &mut state.spawn.boss[kind.index()];
    let remaining = match *timer {
        None => kind.spawn_delay(),
        Some(t) => t.saturating_sub(1),
    };

    if remaining > 0 {
        *timer = Some(remaining);
        return BossSchedule::Waiting { kind, remaining };
    }

    *timer = None;
    state.boss = Some(boss::spawn(kind, state.level, state.width, rng));
    log::info!("{} appears on level {}", kind.name(), state.level);
    BossSchedule::Spawned(kind)
}

/// Count up the customer timer and spawn once past the threshold
///
/// Skipped (counter still advances) while the boss branch is active.
pub fn schedule_customers(state: &mut GameState, rng: &mut impl Rng, boss_active: bool) -> bool {
    state.spawn.customer_ticks += 1;
    if boss_active
        || state.spawn.customer_ticks <= CUSTOMER_SPAWN_THRESHOLD
        || state.regular_customer_count() >= MAX_CUSTOMERS
    {
        return false;
    }

    state.spawn.customer_ticks = 0;
    spawn_customer(state, rng, CustomerKind::Regular);
    true
}

/// Level 4+ sick customers on a randomized 600–900 frame timer
pub fn schedule_sick(state: &mut GameState, rng: &mut impl Rng) -> bool {
    if state.level < SICK_MIN_LEVEL {
        state.spawn.sick = None;
        return false;
    }

    let remaining = match state.spawn.sick {
        None => rng.random_range(SICK_INTERVAL_MIN..=SICK_INTERVAL_MAX),
        Some(t) => t.saturating_sub(1),
    };
    if remaining > 0 {
        state.spawn.sick = Some(remaining);
        return false;
    }

    state.spawn.sick = Some(rng.random_range(SICK_INTERVAL_MIN..=SICK_INTERVAL_MAX));
    if state.sick_customer_count() >= sick_cap(state.level) {
        return false;
    }
    spawn_customer(state, rng, CustomerKind::Sick);
    true
}

/// Concurrent sick customers allowed at `level`
pub fn sick_cap(level: u32) -> usize {
    ((level / 4) as usize).min(SICK_MAX_CONCURRENT)
}

fn spawn_customer(state: &mut GameState, rng: &mut impl Rng, kind: CustomerKind) {
    let size = Vec2::splat(CUSTOMER_SIZE);
    let top = BOSS_Y + BOSS_SIZE + 20.0;
    let bottom = (state.height * 0.45).max(top + 1.0);
    let right = (state.width - size.x).max(1.0);
    let speed = rng.random_range(0.5..=1.5);
    let direction = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
    let id = state.next_entity_id();

    state.customers.push(Customer {
        id,
        kind,
        pos: Vec2::new(
            rng.random_range(0.0..right),
            rng.random_range(top..bottom),
        ),
        vel: Vec2::new(speed * direction, 0.0),
        size,
        hits: 0,
        emoji_index: 0,
    });
}

/// Everything the scheduler did this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnReport {
    pub boss: BossSchedule,
    pub customer: bool,
    pub sick: bool,
    pub powerup: bool,
}

/// Run every spawner once, boss branch first
pub fn run(state: &mut GameState, rng: &mut impl Rng) -> SpawnReport {
    let boss = schedule_boss(state, rng);
    let customer = schedule_customers(state, rng, boss.is_active());
    let sick = schedule_sick(state, rng);
    let powerup = powerup::maybe_spawn(state, rng);
    SpawnReport {
        boss,
        customer,
        sick,
        powerup,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn fill_customers(state: &mut GameState, rng: &mut Pcg32, n: usize) {
        for _ in 0..n {
            spawn_customer(state, rng, CustomerKind::Regular);
        }
    }

    #[test]
    fn test_boss_gate_value() {
        // 8 - ceil(5.6) = 2
        assert_eq!(boss_gate(), 2);
    }

    #[test]
    fn test_karen_waits_180_frames() {
        let mut rng = Pcg32::seed_from_u64(5);
        let mut state = GameState::new(800.0, 600.0);

        for _ in 0..180 {
            assert!(matches!(
                schedule_boss(&mut state, &mut rng),
                BossSchedule::Waiting { kind: BossKind::Karen, .. }
            ));
        }
        assert_eq!(
            schedule_boss(&mut state, &mut rng),
            BossSchedule::Spawned(BossKind::Karen)
        );
        assert_eq!(state.boss.as_ref().unwrap().kind, BossKind::Karen);
        // A live boss blocks any further scheduling
        assert_eq!(schedule_boss(&mut state, &mut rng), BossSchedule::Idle);
    }

    #[test]
    fn test_ineligible_resets_countdown() {
        let mut rng = Pcg32::seed_from_u64(5);
        let mut state = GameState::new(800.0, 600.0);
        for _ in 0..100 {
            schedule_boss(&mut state, &mut rng);
        }
        assert_eq!(state.spawn.boss[0], Some(81));

        fill_customers(&mut state, &mut rng, 3);
        assert_eq!(schedule_boss(&mut state, &mut rng), BossSchedule::Idle);
        assert_eq!(state.spawn.boss, [None; 3]);
    }

    #[test]
    fn test_rotation_follows_level() {
        let mut rng = Pcg32::seed_from_u64(9);
        for level in 1..=9 {
            let mut state = GameState::new(800.0, 600.0);
            state.level = level;
            let kind = loop {
                if let BossSchedule::Spawned(kind) = schedule_boss(&mut state, &mut rng) {
                    break kind;
                }
            };
            assert_eq!(kind, BossKind::ALL[(level as usize - 1) % 3]);
        }
    }

    #[test]
    fn test_customers_spawn_after_threshold_and_cap() {
        let mut rng = Pcg32::seed_from_u64(2);
        let mut state = GameState::new(800.0, 600.0);

        for _ in 0..CUSTOMER_SPAWN_THRESHOLD {
            assert!(!schedule_customers(&mut state, &mut rng, false));
        }
        assert!(schedule_customers(&mut state, &mut rng, false));
        assert_eq!(state.customers.len(), 1);

        fill_customers(&mut state, &mut rng, MAX_CUSTOMERS - 1);
        for _ in 0..1000 {
            schedule_customers(&mut state, &mut rng, false);
        }
        assert_eq!(state.customers.len(), MAX_CUSTOMERS);
    }

    #[test]
    fn test_boss_branch_suppresses_customers() {
        let mut rng = Pcg32::seed_from_u64(2);
        let mut state = GameState::new(800.0, 600.0);
        for _ in 0..1000 {
            assert!(!schedule_customers(&mut state, &mut rng, true));
        }
        assert!(state.customers.is_empty());
    }

    #[test]
    fn test_sick_only_from_level_four() {
        let mut rng = Pcg32::seed_from_u64(4);
        let mut state = GameState::new(800.0, 600.0);
        for _ in 0..2000 {
            schedule_sick(&mut state, &mut rng);
        }
        assert_eq!(state.sick_customer_count(), 0);

        state.level = 4;
        for _ in 0..5000 {
            schedule_sick(&mut state, &mut rng);
        }
        assert_eq!(state.sick_customer_count(), 1);
    }

    #[test]
    fn test_sick_cap() {
        assert_eq!(sick_cap(3), 0);
        assert_eq!(sick_cap(4), 1);
        assert_eq!(sick_cap(8), 2);
        assert_eq!(sick_cap(40), 3);
    }

    #[test]
    fn test_customer_spawn_on_narrow_playfield() {
        let mut rng = Pcg32::seed_from_u64(6);
        let mut state = GameState::new(30.0, 50.0);
        fill_customers(&mut state, &mut rng, 20);
        assert_eq!(state.customers.len(), 20);
        for c in &state.customers {
            assert!(c.pos.x >= 0.0 && c.pos.x < 1.0);
        }
    }
}
