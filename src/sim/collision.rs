//! Collision detection and response for axis-aligned boxes
//!
//! Everything on the playfield is an axis-aligned rectangle. Checks are
//! discrete (one test per frame, no sub-stepping), so a fast mover can skip
//! over a thin target.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::consts::{HEART_DAMAGE, POWERFUL_HEART_DAMAGE, TABLE_BOUNCE_DAMPING};
use crate::{center_of, rotate};

/// Gap left between a reflected body and the obstacle face it struck
const SEPARATION: f32 = 0.5;

/// Axis-aligned rectangle: top-left corner plus size
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Aabb {
    pub pos: Vec2,
    pub size: Vec2,
}

impl Aabb {
    pub fn new(pos: Vec2, size: Vec2) -> Self {
        Self { pos, size }
    }

    pub fn center(&self) -> Vec2 {
        center_of(self.pos, self.size)
    }

    /// Strict overlap test; touching edges do not count
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.pos.x < other.pos.x + other.size.x
            && self.pos.x + self.size.x > other.pos.x
            && self.pos.y < other.pos.y + other.size.y
            && self.pos.y + self.size.y > other.pos.y
    }

    /// True once the box is entirely outside a `width`×`height` playfield
    pub fn is_outside(&self, width: f32, height: f32) -> bool {
        self.pos.x + self.size.x < 0.0
            || self.pos.x > width
            || self.pos.y + self.size.y < 0.0
            || self.pos.y > height
    }
}

/// Free-function form of [`Aabb::overlaps`]
#[inline]
pub fn overlaps(a: &Aabb, b: &Aabb) -> bool {
    a.overlaps(b)
}

/// Damage dealt by a heart
#[inline]
pub fn damage(is_powerful: bool) -> u32 {
    if is_powerful {
        POWERFUL_HEART_DAMAGE
    } else {
        HEART_DAMAGE
    }
}

/// Ricochet tuning for one kind of target
#[derive(Debug, Clone, Copy)]
pub struct Ricochet {
    /// Outgoing speed range (inclusive)
    pub speed: (f32, f32),
    /// Maximum random rotation applied to the outgoing direction (radians)
    pub jitter: f32,
}

/// Redirect a projectile away from the target it just struck
///
/// New velocity is the unit vector from target center to projectile center,
/// scaled by a random speed and rotated by a random angle within the jitter.
/// Returns `None` (velocity untouched) when both centers coincide.
pub fn ricochet_velocity(
    projectile: &Aabb,
    target: &Aabb,
    tuning: Ricochet,
    rng: &mut impl Rng,
) -> Option<Vec2> {
    let away = projectile.center() - target.center();
    let dist = away.length();
    if dist <= f32::EPSILON {
        return None;
    }

    let speed = rng.random_range(tuning.speed.0..=tuning.speed.1);
    let angle = if tuning.jitter > 0.0 {
        rng.random_range(-tuning.jitter..=tuning.jitter)
    } else {
        0.0
    };
    Some(rotate(away / dist * speed, angle))
}

/// Which face of an obstacle was struck
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Left,
    Right,
    Top,
    Bottom,
}

/// Reflect a moving box off a static obstacle
///
/// The smallest of the four directional overlaps picks the face. Velocity on
/// that axis is reflected and damped, and the box is pushed just outside the
/// obstacle so it cannot stick or tunnel on the next frame. Returns `None`
/// if the boxes do not overlap.
pub fn reflect_off(body: &mut Aabb, vel: &mut Vec2, obstacle: &Aabb) -> Option<Face> {
    if !body.overlaps(obstacle) {
        return None;
    }

    let from_left = body.pos.x + body.size.x - obstacle.pos.x;
    let from_right = obstacle.pos.x + obstacle.size.x - body.pos.x;
    let from_top = body.pos.y + body.size.y - obstacle.pos.y;
    let from_bottom = obstacle.pos.y + obstacle.size.y - body.pos.y;

    let min = from_left.min(from_right).min(from_top).min(from_bottom);
    let face = if min == from_left {
        Face::Left
    } else if min == from_right {
        Face::Right
    } else if min == from_top {
        Face::Top
    } else {
        Face::Bottom
    };

    match face {
        Face::Left => {
            vel.x = -vel.x.abs() * TABLE_BOUNCE_DAMPING;
            body.pos.x = obstacle.pos.x - body.size.x - SEPARATION;
        }
        Face::Right => {
            vel.x = vel.x.abs() * TABLE_BOUNCE_DAMPING;
            body.pos.x = obstacle.pos.x + obstacle.size.x + SEPARATION;
        }
        Face::Top => {
            vel.y = -vel.y.abs() * TABLE_BOUNCE_DAMPING;
            body.pos.y = obstacle.pos.y - body.size.y - SEPARATION;
        }
        Face::Bottom => {
            vel.y = vel.y.abs() * TABLE_BOUNCE_DAMPING;
            body.pos.y = obstacle.pos.y + obstacle.size.y + SEPARATION;
        }
    }

    Some(face)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn rect(x: f32, y: f32, w: f32, h: f32) -> Aabb {
        Aabb::new(Vec2::new(x, y), Vec2::new(w, h))
    }

    #[test]
    fn test_overlap_and_touching() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        assert!(a.overlaps(&rect(5.0, 5.0, 10.0, 10.0)));
        // Shared edge is not an overlap
        assert!(!a.overlaps(&rect(10.0, 0.0, 10.0, 10.0)));
        assert!(!a.overlaps(&rect(0.0, 20.0, 10.0, 10.0)));
    }

    #[test]
    fn test_damage_model() {
        assert_eq!(damage(false), 1);
        assert_eq!(damage(true), 3);
    }

    #[test]
    fn test_ricochet_away_from_target_on_right() {
        let mut rng = Pcg32::seed_from_u64(7);
        // Projectile at rest, target center 10px to its right
        let heart = rect(0.0, 0.0, 20.0, 20.0);
        let enemy = rect(10.0, 0.0, 20.0, 20.0);
        let tuning = Ricochet {
            speed: (15.0, 20.0),
            jitter: 0.25,
        };

        for _ in 0..100 {
            let vel = ricochet_velocity(&heart, &enemy, tuning, &mut rng).unwrap();
            assert!(vel.x < 0.0);
            let speed = vel.length();
            assert!((15.0 - 1e-3..=20.0 + 1e-3).contains(&speed), "speed {speed}");
            assert!(vel.y.abs() <= speed * 0.25f32.sin() + 1e-3);
        }
    }

    #[test]
    fn test_ricochet_degenerate_centers() {
        let mut rng = Pcg32::seed_from_u64(1);
        let a = rect(5.0, 5.0, 10.0, 10.0);
        let tuning = Ricochet {
            speed: (15.0, 20.0),
            jitter: 0.25,
        };
        assert!(ricochet_velocity(&a, &a, tuning, &mut rng).is_none());
    }

    #[test]
    fn test_reflect_off_top_face() {
        let table = rect(100.0, 100.0, 100.0, 20.0);
        // Falling onto the table, barely overlapping its top
        let mut body = rect(140.0, 82.0, 20.0, 20.0);
        let mut vel = Vec2::new(1.0, 5.0);

        let face = reflect_off(&mut body, &mut vel, &table);
        assert_eq!(face, Some(Face::Top));
        assert!((vel.y - (-4.0)).abs() < 1e-5);
        assert!((vel.x - 1.0).abs() < 1e-5);
        assert!(!body.overlaps(&table));
        assert!(body.pos.y + body.size.y <= table.pos.y);
    }

    #[test]
    fn test_reflect_off_left_face() {
        let table = rect(100.0, 100.0, 100.0, 60.0);
        let mut body = rect(83.0, 120.0, 20.0, 20.0);
        let mut vel = Vec2::new(5.0, 0.0);

        assert_eq!(reflect_off(&mut body, &mut vel, &table), Some(Face::Left));
        assert!(vel.x < 0.0);
        assert!(!body.overlaps(&table));
    }

    #[test]
    fn test_reflect_off_miss() {
        let table = rect(100.0, 100.0, 100.0, 20.0);
        let mut body = rect(0.0, 0.0, 10.0, 10.0);
        let mut vel = Vec2::new(1.0, 1.0);
        assert_eq!(reflect_off(&mut body, &mut vel, &table), None);
        assert_eq!(vel, Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_outside_playfield() {
        assert!(rect(-30.0, 0.0, 20.0, 20.0).is_outside(800.0, 600.0));
        assert!(rect(0.0, -25.0, 20.0, 20.0).is_outside(800.0, 600.0));
        assert!(!rect(-10.0, 0.0, 20.0, 20.0).is_outside(800.0, 600.0));
    }

    proptest! {
        #[test]
        fn prop_overlap_is_symmetric(
            ax in -500.0f32..500.0, ay in -500.0f32..500.0,
            aw in 0.0f32..200.0, ah in 0.0f32..200.0,
            bx in -500.0f32..500.0, by in -500.0f32..500.0,
            bw in 0.0f32..200.0, bh in 0.0f32..200.0,
        ) {
            let a = rect(ax, ay, aw, ah);
            let b = rect(bx, by, bw, bh);
            prop_assert_eq!(overlaps(&a, &b), overlaps(&b, &a));
        }

        #[test]
        fn prop_reflect_leaves_body_clear(
            x in 60.0f32..220.0, y in 60.0f32..140.0,
            vx in -10.0f32..10.0, vy in -10.0f32..10.0,
        ) {
            let table = rect(100.0, 100.0, 100.0, 20.0);
            let mut body = rect(x, y, 20.0, 16.0);
            let mut vel = Vec2::new(vx, vy);
            if reflect_off(&mut body, &mut vel, &table).is_some() {
                prop_assert!(!body.overlaps(&table));
                prop_assert!(vel.length() <= Vec2::new(vx, vy).length() + 1e-4);
            }
        }
    }
}
