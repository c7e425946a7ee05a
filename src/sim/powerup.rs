//! Power-up charging and timed effects
//!
//! This module only does the bookkeeping. Consumers (shooting, lives) read
//! [`ActiveEffects::is_active`] and act on [`Activation`] results.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::collision::Aabb;
use super::state::{GameState, PowerUp, PowerUpKind};
use crate::consts::*;

/// One slot of the effect table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EffectSlot {
    pub active: bool,
    /// Frames remaining
    pub timer: u32,
    pub duration: u32,
}

/// Fixed-size effect table indexed by [`PowerUpKind::index`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveEffects {
    slots: [EffectSlot; PowerUpKind::COUNT],
}

impl Default for ActiveEffects {
    fn default() -> Self {
        let mut slots = [EffectSlot::default(); PowerUpKind::COUNT];
        for kind in PowerUpKind::ALL {
            slots[kind.index()].duration = kind.duration();
        }
        Self { slots }
    }
}

impl ActiveEffects {
    /// Turn an effect on; re-activating just restarts its timer
    pub fn activate(&mut self, kind: PowerUpKind) {
        let slot = &mut self.slots[kind.index()];
        slot.active = true;
        slot.timer = slot.duration;
    }

    pub fn is_active(&self, kind: PowerUpKind) -> bool {
        self.slots[kind.index()].active
    }

    pub fn slot(&self, kind: PowerUpKind) -> EffectSlot {
        self.slots[kind.index()]
    }

    /// Count every active timer down; expired effects switch off
    pub fn tick(&mut self) {
        for slot in self.slots.iter_mut().filter(|s| s.active) {
            slot.timer = slot.timer.saturating_sub(1);
            if slot.timer == 0 {
                slot.active = false;
            }
        }
    }

    /// Active effects with their remaining frames
    pub fn active(&self) -> Vec<(PowerUpKind, u32)> {
        PowerUpKind::ALL
            .iter()
            .filter(|k| self.is_active(**k))
            .map(|&k| (k, self.slots[k.index()].timer))
            .collect()
    }
}

/// A power-up that reached full charge this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Activation {
    pub kind: PowerUpKind,
    pub pos: Vec2,
}

/// Result of a heart touching a power-up
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChargeResult {
    Charged { hits: u32 },
    Activated(Activation),
}

/// Add one hit to the power-up at `index`, activating it at full charge
///
/// On activation the power-up is removed, its effect switched on and a
/// floating-text cue queued.
pub fn charge(state: &mut GameState, index: usize) -> ChargeResult {
    let powerup = &mut state.powerups[index];
    powerup.hits += 1;
    if powerup.hits < POWERUP_CHARGE_HITS {
        return ChargeResult::Charged { hits: powerup.hits };
    }

    let powerup = state.powerups.remove(index);
    state.effects.activate(powerup.kind);
    state.push_text(powerup.kind.label(), powerup.pos);
    log::debug!("Power-up activated: {:?}", powerup.kind);
    ChargeResult::Activated(Activation {
        kind: powerup.kind,
        pos: powerup.pos,
    })
}

/// Roll for a new power-up this frame (below the concurrency cap)
pub fn maybe_spawn(state: &mut GameState, rng: &mut impl Rng) -> bool {
    if state.powerups.len() >= MAX_POWERUPS || !rng.random_bool(POWERUP_SPAWN_CHANCE) {
        return false;
    }

    let kind = PowerUpKind::ALL[rng.random_range(0..PowerUpKind::COUNT)];
    let size = Vec2::splat(POWERUP_SIZE);
    // Middle band, clear of the tables; never an empty range on tiny fields
    let right = (state.width - size.x).max(1.0);
    let top = state.height * 0.3;
    let bottom = (state.height * 0.7 - size.y).max(top + 1.0);
    let mut pos = Vec2::ZERO;
    for _ in 0..8 {
        pos = Vec2::new(rng.random_range(0.0..right), rng.random_range(top..bottom));
        let bounds = Aabb::new(pos, size);
        if !state.tables.iter().any(|t| t.overlaps(&bounds)) {
            break;
        }
    }

    let id = state.next_entity_id();
    state.powerups.push(PowerUp {
        id,
        kind,
        pos,
        size,
        hits: 0,
    });
    true
}
