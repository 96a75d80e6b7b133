//! Bounded rejection sampling for scenery that must not crowd the road.

use std::iter;
use std::ops::Range;

use rand::Rng;
use serde::Serialize;

use crate::engine::spatial::{
    has_opposite_side_spacing, has_same_side_spacing, is_far_enough, lane_is_clear, GroundPos,
    LaneGeometry, OppositeSideRule, SameSideRule,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SideHint {
    Left,
    Right,
    Either,
}

/// Which stage of the search produced a position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementTier {
    /// Passed every predicate on the hinted side.
    Preferred,
    /// Passed every predicate after the side hint was dropped.
    AnySide,
    /// Unvalidated position at the outer edge of a band.
    Fallback,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub position: GroundPos,
    pub tier: PlacementTier,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlacementRules {
    pub left_band: Range<f32>,
    pub right_band: Range<f32>,
    pub min_distance: f32,
    pub same_side: SameSideRule,
    pub opposite_side: OppositeSideRule,
    pub lane: LaneGeometry,
    pub primary_attempts: u32,
    pub secondary_attempts: u32,
}

impl PlacementRules {
    /// Every predicate at once. Lane clearance counts the candidate itself as an obstacle.
    pub fn accepts(&self, candidate: &GroundPos, existing: &[GroundPos]) -> bool {
        is_far_enough(candidate, existing, self.min_distance)
            && has_same_side_spacing(candidate, existing, &self.same_side)
            && has_opposite_side_spacing(candidate, existing, &self.opposite_side)
            && lane_is_clear(
                candidate.y,
                existing.iter().copied().chain(iter::once(*candidate)),
                &self.lane,
            )
    }
}

pub struct PlacementGenerator<R> {
    rules: PlacementRules,
    rng: R,
}

impl<R: Rng> PlacementGenerator<R> {
    pub fn new(rules: PlacementRules, rng: R) -> Self {
        PlacementGenerator { rules, rng }
    }

    pub fn rules(&self) -> &PlacementRules {
        &self.rules
    }

    /// Finds a position with `z` inside `window` that keeps clear of `existing`.
    ///
    /// Always returns: after both sampling budgets run out the result is a
    /// [`PlacementTier::Fallback`] position on the outer edge of a random band.
    /// The first accepted candidate wins.
    pub fn generate(
        &mut self,
        side: SideHint,
        existing: &[GroundPos],
        window: Range<f32>,
    ) -> Placement {
        let primary = self.rules.primary_attempts;
        if let Some(position) = self.search(side, existing, &window, primary) {
            return Placement {
                position,
                tier: PlacementTier::Preferred,
            };
        }

        let secondary = self.rules.secondary_attempts;
        if let Some(position) = self.search(SideHint::Either, existing, &window, secondary) {
            return Placement {
                position,
                tier: PlacementTier::AnySide,
            };
        }

        let x = if self.rng.gen_bool(0.5) {
            self.rules.left_band.start
        } else {
            self.rules.right_band.end
        };
        let z = sample(&mut self.rng, &window);
        Placement {
            position: GroundPos::new(x, z),
            tier: PlacementTier::Fallback,
        }
    }

    fn search(
        &mut self,
        side: SideHint,
        existing: &[GroundPos],
        window: &Range<f32>,
        attempts: u32,
    ) -> Option<GroundPos> {
        for _ in 0..attempts {
            let band = match side {
                SideHint::Left => &self.rules.left_band,
                SideHint::Right => &self.rules.right_band,
                SideHint::Either if self.rng.gen_bool(0.5) => &self.rules.right_band,
                SideHint::Either => &self.rules.left_band,
            };
            let x = sample(&mut self.rng, band);
            let z = sample(&mut self.rng, window);
            let candidate = GroundPos::new(x, z);
            if self.rules.accepts(&candidate, existing) {
                return Some(candidate);
            }
        }
        None
    }
}

// `gen_range` panics on an empty range; a degenerate span collapses to its start.
fn sample<R: Rng>(rng: &mut R, range: &Range<f32>) -> f32 {
    if range.start < range.end {
        rng.gen_range(range.clone())
    } else {
        range.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn rules() -> PlacementRules {
        PlacementRules {
            left_band: -3.0..-1.0,
            right_band: 1.0..3.0,
            min_distance: 10.0,
            same_side: SameSideRule {
                x_tolerance: 2.0,
                min_z_spacing: 10.0,
            },
            opposite_side: OppositeSideRule {
                min_z_spacing: 6.0,
                left_threshold: -0.5,
                right_threshold: 0.5,
            },
            lane: LaneGeometry {
                z_tolerance: 2.0,
                road_left_edge: -3.0,
                road_right_edge: 3.0,
                passage_width: 1.8,
                half_width: 0.75,
                scan_step: 0.1,
            },
            primary_attempts: 300,
            secondary_attempts: 100,
        }
    }

    fn generator(rules: PlacementRules) -> PlacementGenerator<SmallRng> {
        PlacementGenerator::new(rules, SmallRng::seed_from_u64(7))
    }

    #[test]
    fn respects_side_hint_when_space_is_free() {
        let mut generator = generator(rules());
        let right = generator.generate(SideHint::Right, &[], 5.0..100.0);
        assert_eq!(right.tier, PlacementTier::Preferred);
        assert!((1.0..3.0).contains(&right.position.x));
        assert!((5.0..100.0).contains(&right.position.y));

        let left = generator.generate(SideHint::Left, &[right.position], 5.0..100.0);
        assert_eq!(left.tier, PlacementTier::Preferred);
        assert!((-3.0..-1.0).contains(&left.position.x));
        assert!(generator.rules().accepts(&left.position, &[right.position]));
    }

    #[test]
    fn blocked_side_falls_through_to_any_side() {
        // Right band crowded, left band reachable.
        let mut rules = rules();
        rules.min_distance = 1.0;
        rules.same_side.min_z_spacing = 1.0;
        rules.opposite_side.min_z_spacing = 0.0;
        let existing: Vec<GroundPos> = (0..=50)
            .map(|i| GroundPos::new(2.0, i as f32 * 2.0))
            .collect();

        let mut generator = generator(rules);
        let placement = generator.generate(SideHint::Right, &existing, 0.0..100.0);
        assert_eq!(placement.tier, PlacementTier::AnySide);
        assert!(placement.position.x < -1.0);
        assert!(generator.rules().accepts(&placement.position, &existing));
    }

    #[test]
    fn saturated_window_terminates_with_fallback() {
        let rules = rules();
        let existing: Vec<GroundPos> = (0..=20)
            .flat_map(|i| {
                let z = i as f32 * 5.0;
                [GroundPos::new(-2.0, z), GroundPos::new(2.0, z)]
            })
            .collect();

        let mut generator = generator(rules.clone());
        let placement = generator.generate(SideHint::Right, &existing, 0.0..100.0);
        assert_eq!(placement.tier, PlacementTier::Fallback);
        assert!(
            placement.position.x == rules.left_band.start
                || placement.position.x == rules.right_band.end
        );
        assert!((0.0..100.0).contains(&placement.position.y));
    }

    #[test]
    fn degenerate_window_collapses_to_its_start() {
        let mut generator = generator(rules());
        let placement = generator.generate(SideHint::Either, &[], 42.0..42.0);
        assert_eq!(placement.position.y, 42.0);
    }
}
