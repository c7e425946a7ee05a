//! Session owner: state, seeded RNG, pools and governor

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::boss;
use super::frame_loop::Simulate;
use super::pool::{GovernorCaps, GovernorReport, MemoryGovernor, Pools};
use super::state::{GamePhase, GameState, Overlay};
use super::tick::{
    self, Deferred, DeferredAction, GameEvent, SoundCue, TickContext, TickInput, TickReport,
};
use crate::consts::LEVEL_BANNER_TICKS;
use crate::error::SimError;
use crate::settings::Settings;

/// Seed used when settings do not pin one
pub const DEFAULT_SEED: u64 = 0x5EED_CAFE;

/// One game session
///
/// Everything the tick needs is owned here, so restarting is just replacing
/// the state and reseeding.
pub struct Simulation {
    settings: Settings,
    seed: u64,
    /// Sessions begun so far
    sessions: u64,
    rng: Pcg32,
    state: GameState,
    pools: Pools,
    governor: MemoryGovernor,
}

impl Simulation {
    pub fn new(settings: Settings) -> Self {
        let seed = settings.seed.unwrap_or(DEFAULT_SEED);
        Self::with_seed(settings, seed)
    }

    pub fn with_seed(mut settings: Settings, seed: u64) -> Self {
        settings.sanitize();
        let state = GameState::new(settings.playfield_width, settings.playfield_height);
        let governor = MemoryGovernor::new(GovernorCaps::with_particle_cap(
            settings.max_particles(),
        ));
        Self {
            settings,
            seed,
            sessions: 0,
            rng: Pcg32::seed_from_u64(seed),
            state,
            pools: Pools::default(),
            governor,
        }
    }

    /// Begin a new session
    ///
    /// The first session uses the construction seed. Later ones draw a fresh
    /// seed from the finished session's RNG unless settings pin a seed.
    pub fn start(&mut self) {
        let seed = match self.settings.seed {
            Some(pinned) => pinned,
            None if self.sessions == 0 => self.seed,
            None => self.rng.random(),
        };
        self.start_with_seed(seed);
    }

    /// Begin a new session from an explicit seed
    pub fn start_with_seed(&mut self, seed: u64) {
        self.seed = seed;
        self.sessions += 1;
        self.reset();
        log::info!("Session {} started with seed: {}", self.sessions, self.seed);
    }

    /// Abort the session and restart it from the current seed
    ///
    /// Idempotent: two resets leave the same state as one.
    pub fn reset(&mut self) {
        let old = std::mem::replace(
            &mut self.state,
            GameState::new(self.settings.playfield_width, self.settings.playfield_height),
        );
        self.pools.release_all(old.hearts);
        self.pools.release_all(old.particles);
        self.pools.release_all(old.boss_projectiles);

        self.rng = Pcg32::seed_from_u64(self.seed);
        self.state.phase = GamePhase::Playing;
        self.state.sync_hud();
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Direct access for hosts that script scenarios (demos, tests)
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn pools(&self) -> &Pools {
        &self.pools
    }

    /// Advance one frame
    pub fn step(&mut self, input: &TickInput) -> Result<TickReport, SimError> {
        let mut ctx = TickContext {
            pools: &mut self.pools,
            rng: &mut self.rng,
            max_particles: self.settings.max_particles(),
        };
        tick::tick(&mut self.state, &mut ctx, input)
    }

    /// Run a deferred action whose delay has elapsed
    pub fn apply(&mut self, action: DeferredAction) -> Vec<GameEvent> {
        if self.state.phase != GamePhase::Playing {
            return Vec::new();
        }
        match action {
            DeferredAction::RemoveDefeatedBoss => {
                let Some(level) = boss::remove_defeated(&mut self.state) else {
                    return Vec::new();
                };
                self.state.overlay = Some(Overlay::LevelComplete {
                    level,
                    ticks: LEVEL_BANNER_TICKS,
                });
                self.state.sync_hud();
                vec![
                    GameEvent::Sound(SoundCue::LevelUp),
                    GameEvent::LevelComplete { level },
                ]
            }
        }
    }

    /// Trim every collection to its cap
    pub fn govern(&mut self) -> GovernorReport {
        self.governor.run(&mut self.state, &mut self.pools)
    }

    /// Hand over delayed actions queued by past ticks
    pub fn take_deferred(&mut self) -> Vec<Deferred> {
        std::mem::take(&mut self.state.deferred)
    }
}

impl Simulate for Simulation {
    fn update(&mut self, input: &TickInput) -> Result<TickReport, SimError> {
        self.step(input)
    }

    fn apply_deferred(&mut self, action: DeferredAction) -> Vec<GameEvent> {
        self.apply(action)
    }

    fn govern(&mut self) -> GovernorReport {
        Simulation::govern(self)
    }

    fn take_deferred(&mut self) -> Vec<Deferred> {
        Simulation::take_deferred(self)
    }

    fn state(&self) -> &GameState {
        &self.state
    }

    fn restart(&mut self) {
        self.start();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::sim::state::{BossKind, Heart};
    use glam::Vec2;

    fn sim() -> Simulation {
        let mut sim = Simulation::with_seed(Settings::default(), 7);
        sim.start();
        sim
    }

    fn at(now_ms: f64) -> TickInput {
        TickInput {
            now_ms,
            ..Default::default()
        }
    }

    #[test]
    fn test_new_session_waits_in_menu() {
        let sim = Simulation::with_seed(Settings::default(), 1);
        assert_eq!(sim.state().phase, GamePhase::Menu);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut a = sim();
        for i in 0..200 {
            a.step(&TickInput {
                now_ms: i as f64 * FRAME_MS,
                shoot: true,
                right: true,
                ..Default::default()
            })
            .unwrap();
        }
        a.reset();
        let once = a.state().clone();
        a.reset();
        assert_eq!(a.state(), &once);

        let fresh = sim();
        assert_eq!(fresh.state(), &once);
        assert_eq!(once.phase, GamePhase::Playing);
        assert_eq!(once.lives, STARTING_LIVES);
    }

    #[test]
    fn test_same_seed_same_run() {
        let mut a = sim();
        let mut b = sim();
        for i in 0..1500 {
            let input = TickInput {
                now_ms: i as f64 * FRAME_MS,
                shoot: i % 3 == 0,
                left: i % 200 < 100,
                right: i % 200 >= 100,
                ..Default::default()
            };
            assert_eq!(a.step(&input), b.step(&input));
        }
        assert_eq!(a.state(), b.state());
    }

    #[test]
    fn test_defeat_then_deferred_removal_advances_level() {
        let mut sim = sim();
        let mut rng = rand_pcg::Pcg32::seed_from_u64(3);
        let mut karen = boss::spawn(BossKind::Karen, 1, 800.0, &mut rng);
        karen.health = 1;
        karen.speed = 0.0;
        let target = karen.pos + Vec2::new(30.0, 30.0);
        sim.state_mut().boss = Some(karen);
        sim.state_mut().hearts.push(Heart {
            pos: target,
            size: Vec2::splat(HEART_SIZE),
            is_powerful: true,
            ..Default::default()
        });

        sim.step(&at(1000.0)).unwrap();
        assert_eq!(sim.state().score, 100);
        assert_eq!(
            sim.take_deferred(),
            vec![Deferred {
                delay_ms: BOSS_REMOVAL_DELAY_MS,
                action: DeferredAction::RemoveDefeatedBoss,
            }]
        );
        assert!(sim.take_deferred().is_empty());

        let events = sim.apply(DeferredAction::RemoveDefeatedBoss);
        assert!(events.contains(&GameEvent::LevelComplete { level: 1 }));
        assert!(sim.state().boss.is_none());
        assert_eq!(sim.state().level, 2);
        assert_eq!(sim.state().hud.banner.as_deref(), Some("LEVEL 1 COMPLETE!"));
        assert_eq!(sim.state().phase, GamePhase::Playing);

        // Stale replays are harmless
        assert!(sim.apply(DeferredAction::RemoveDefeatedBoss).is_empty());
        assert_eq!(sim.state().level, 2);
    }

    #[test]
    fn test_banner_clears_after_its_ticks() {
        let mut sim = sim();
        sim.state_mut().overlay = Some(Overlay::LevelComplete { level: 1, ticks: 3 });
        for i in 0..3 {
            sim.step(&at(i as f64)).unwrap();
        }
        assert_eq!(sim.state().overlay, None);
        assert_eq!(sim.state().hud.banner, None);
    }

    #[test]
    fn test_reset_recycles_pooled_objects() {
        let mut sim = sim();
        for _ in 0..5 {
            sim.state_mut().hearts.push(Heart::default());
        }
        sim.reset();
        assert_eq!(
            sim.pools().available(crate::sim::pool::PoolKind::Heart),
            5
        );
        assert!(sim.state().hearts.is_empty());
    }

    #[test]
    fn test_degenerate_playfield_is_sanitized() {
        let settings = Settings {
            playfield_width: 40.0,
            playfield_height: 60.0,
            ..Default::default()
        };
        let mut sim = Simulation::with_seed(settings, 2);
        assert_eq!(sim.settings().playfield_width, 800.0);
        assert_eq!(sim.settings().playfield_height, 600.0);
        sim.start();
        assert_eq!(sim.state().width, 800.0);
        for i in 0..600 {
            assert!(sim.step(&at(i as f64 * FRAME_MS)).is_ok());
        }
        // The boss spawn used the sanitized width
        let boss = sim.state().boss.as_ref().unwrap();
        assert!(boss.pos.x >= 0.0 && boss.pos.x + boss.size.x <= 800.0);
    }

    #[test]
    fn test_new_session_draws_fresh_seed() {
        let mut sim = sim();
        assert_eq!(sim.seed(), 7);
        for i in 0..120 {
            sim.step(&at(i as f64 * FRAME_MS)).unwrap();
        }
        sim.start();
        let second = sim.seed();
        assert_ne!(second, 7);

        // Reset replays the session it is in
        sim.reset();
        assert_eq!(sim.seed(), second);

        sim.start_with_seed(7);
        assert_eq!(sim.state(), self::sim().state());
    }

    #[test]
    fn test_pinned_seed_replays_every_session() {
        let settings = Settings {
            seed: Some(11),
            ..Default::default()
        };
        let mut sim = Simulation::new(settings);
        sim.start();
        sim.step(&at(0.0)).unwrap();
        sim.start();
        assert_eq!(sim.seed(), 11);
    }
}
