//! Stateless spacing and lane-clearance predicates over ground-plane positions.
//!
//! Positions are `Point2` where `.x` is the lateral offset and `.y` is the
//! longitudinal `z` along the road.

use nalgebra::{distance, Point2};

pub type GroundPos = Point2<f32>;

/// Smallest scan step accepted by the lane scan.
const MIN_SCAN_STEP: f32 = 0.01;

/// Road band and obstacle footprint used by [`has_lane_clearance`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaneGeometry {
    /// Objects whose `z` is within this distance of the tested `z` count as obstacles.
    pub z_tolerance: f32,
    pub road_left_edge: f32,
    pub road_right_edge: f32,
    /// Width of the gap a car needs to get through.
    pub passage_width: f32,
    /// Lateral half-width of every obstacle.
    pub half_width: f32,
    pub scan_step: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SameSideRule {
    pub x_tolerance: f32,
    pub min_z_spacing: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OppositeSideRule {
    pub min_z_spacing: f32,
    pub left_threshold: f32,
    pub right_threshold: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoadSide {
    Left,
    Right,
    Centre,
}

impl OppositeSideRule {
    pub fn classify(&self, x: f32) -> RoadSide {
        if x < self.left_threshold {
            RoadSide::Left
        } else if x > self.right_threshold {
            RoadSide::Right
        } else {
            RoadSide::Centre
        }
    }
}

pub fn is_far_enough(candidate: &GroundPos, existing: &[GroundPos], min_distance: f32) -> bool {
    existing
        .iter()
        .all(|pos| distance(candidate, pos) >= min_distance)
}

/// True when some passage of `lane.passage_width` stays open across the road at `z`.
///
/// Objects that do not reach into `[road_left_edge, road_right_edge]` never block
/// the lane, so a road whose only nearby obstacles sit on the shoulder is clear.
pub fn has_lane_clearance(z: f32, existing: &[GroundPos], lane: &LaneGeometry) -> bool {
    lane_is_clear(z, existing.iter().copied(), lane)
}

pub(crate) fn lane_is_clear<I>(z: f32, obstacles: I, lane: &LaneGeometry) -> bool
where
    I: IntoIterator<Item = GroundPos>,
{
    let blocking: Vec<(f32, f32)> = obstacles
        .into_iter()
        .filter(|pos| (pos.y - z).abs() <= lane.z_tolerance)
        .map(|pos| (pos.x - lane.half_width, pos.x + lane.half_width))
        .filter(|&(min, max)| max > lane.road_left_edge && min < lane.road_right_edge)
        .collect();

    if blocking.is_empty() {
        return true;
    }

    let last_offset = lane.road_right_edge - lane.passage_width;
    if last_offset < lane.road_left_edge {
        return false;
    }

    let step = lane.scan_step.max(MIN_SCAN_STEP);
    let mut offset = lane.road_left_edge;
    loop {
        let offset_now = offset.min(last_offset);
        if passage_is_free(offset_now, lane.passage_width, &blocking) {
            return true;
        }
        if offset_now >= last_offset {
            return false;
        }
        offset += step;
    }
}

fn passage_is_free(offset: f32, width: f32, blocking: &[(f32, f32)]) -> bool {
    let end = offset + width;
    blocking.iter().all(|&(min, max)| max <= offset || min >= end)
}

pub fn has_same_side_spacing(
    candidate: &GroundPos,
    existing: &[GroundPos],
    rule: &SameSideRule,
) -> bool {
    existing
        .iter()
        .filter(|pos| (pos.x - candidate.x).abs() <= rule.x_tolerance)
        .all(|pos| (pos.y - candidate.y).abs() >= rule.min_z_spacing)
}

/// Objects on opposite shoulders must be far enough apart in `z` that they never
/// pinch the road together even if each leaves a gap on its own.
pub fn has_opposite_side_spacing(
    candidate: &GroundPos,
    existing: &[GroundPos],
    rule: &OppositeSideRule,
) -> bool {
    let opposite = match rule.classify(candidate.x) {
        RoadSide::Left => RoadSide::Right,
        RoadSide::Right => RoadSide::Left,
        RoadSide::Centre => return true,
    };

    existing
        .iter()
        .filter(|pos| rule.classify(pos.x) == opposite)
        .all(|pos| (pos.y - candidate.y).abs() >= rule.min_z_spacing)
}
