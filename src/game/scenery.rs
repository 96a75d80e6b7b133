//! Relocation strategies for each scenery category.

use std::ops::Range;

use nalgebra::Vector3;
use rand::Rng;

use crate::engine::placement::{PlacementGenerator, PlacementTier, SideHint};
use crate::engine::pool::{LocalZ, PlacedObject, Relocation, RelocationStrategy};
use crate::engine::spatial::GroundPos;

/// Chains road segments end to end, each overlapping the one behind it.
#[derive(Clone, Debug)]
pub struct RoadChain {
    pub anchor_x: f32,
    pub anchor_y: f32,
    pub start_z: f32,
    pub overlap: f32,
    pub local_z: LocalZ,
}

impl RoadChain {
    fn behind(&self, far_edge: f32) -> Vector3<f32> {
        let z = far_edge - self.overlap - self.local_z.min_offset;
        Vector3::new(self.anchor_x, self.anchor_y, z)
    }
}

impl RelocationStrategy for RoadChain {
    fn spawn(&mut self, _index: usize, placed: &[PlacedObject]) -> Relocation {
        let position = match placed.last() {
            Some(last) => self.behind(last.far_edge()),
            None => Vector3::new(self.anchor_x, self.anchor_y, self.start_z),
        };
        Relocation::fixed(position)
    }

    fn relocate(&mut self, index: usize, objects: &[PlacedObject], _camera_z: f32) -> Relocation {
        let front = objects
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != index)
            .map(|(_, object)| object.far_edge())
            .reduce(f32::max)
            .unwrap_or_else(|| objects[index].far_edge());
        Relocation::fixed(self.behind(front))
    }
}

/// Evenly spaced lights on one side of the road.
#[derive(Clone, Debug)]
pub struct StreetlightGrid {
    pub x: f32,
    pub y: f32,
    pub spacing: f32,
    /// Grid phase along `z`.
    pub offset: f32,
}

/// Used as the grid front when a pool holds a single light.
const LONE_LIGHT_LEAD: f32 = 10.0;

impl StreetlightGrid {
    /// Next grid slot past `front`.
    pub fn slot_after(&self, front: f32) -> f32 {
        ((front - self.offset) / self.spacing).round() * self.spacing + self.spacing + self.offset
    }
}

impl RelocationStrategy for StreetlightGrid {
    fn spawn(&mut self, index: usize, _placed: &[PlacedObject]) -> Relocation {
        let z = self.offset + index as f32 * self.spacing;
        Relocation::fixed(Vector3::new(self.x, self.y, z))
    }

    fn relocate(&mut self, index: usize, objects: &[PlacedObject], camera_z: f32) -> Relocation {
        let front = objects
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != index)
            .map(|(_, object)| object.position().z)
            .reduce(f32::max)
            .unwrap_or(camera_z + LONE_LIGHT_LEAD);
        Relocation::fixed(Vector3::new(self.x, self.y, self.slot_after(front)))
    }

    fn settle(&self, position: &mut Vector3<f32>) {
        position.x = self.x;
        position.y = self.y;
    }
}

/// Scatters barriers through a [`PlacementGenerator`], keeping every one clear of the others.
pub struct BarrierScatter<R> {
    generator: PlacementGenerator<R>,
    ground_y: f32,
    initial_window: Range<f32>,
    ahead_distance: f32,
}

impl<R: Rng> BarrierScatter<R> {
    pub fn new(
        generator: PlacementGenerator<R>,
        ground_y: f32,
        initial_window: Range<f32>,
        ahead_distance: f32,
    ) -> Self {
        BarrierScatter {
            generator,
            ground_y,
            initial_window,
            ahead_distance,
        }
    }

    pub fn generator(&self) -> &PlacementGenerator<R> {
        &self.generator
    }

    /// `z` range searched when a barrier is recycled at `camera_z`.
    pub fn recycle_window(&self, camera_z: f32) -> Range<f32> {
        let start = camera_z + self.ahead_distance;
        start..start + (self.initial_window.end - self.initial_window.start)
    }

    fn place(
        &mut self,
        index: usize,
        side: SideHint,
        existing: &[GroundPos],
        window: Range<f32>,
    ) -> Relocation {
        let placement = self.generator.generate(side, existing, window);
        if placement.tier == PlacementTier::Fallback {
            log::warn!(
                "barrier_{} fell back to unvalidated position ({:.2}, {:.2})",
                index + 1,
                placement.position.x,
                placement.position.y
            );
        }
        let position = Vector3::new(placement.position.x, self.ground_y, placement.position.y);
        Relocation::searched(position, placement.tier)
    }
}

fn start_up_side(index: usize) -> SideHint {
    match index {
        0 => SideHint::Right,
        1 => SideHint::Left,
        _ => SideHint::Either,
    }
}

impl<R: Rng> RelocationStrategy for BarrierScatter<R> {
    fn spawn(&mut self, index: usize, placed: &[PlacedObject]) -> Relocation {
        let existing: Vec<GroundPos> = placed.iter().map(PlacedObject::ground).collect();
        let window = self.initial_window.clone();
        self.place(index, start_up_side(index), &existing, window)
    }

    fn relocate(&mut self, index: usize, objects: &[PlacedObject], camera_z: f32) -> Relocation {
        let existing: Vec<GroundPos> = objects
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != index)
            .map(|(_, object)| object.ground())
            .collect();
        let window = self.recycle_window(camera_z);
        self.place(index, SideHint::Either, &existing, window)
    }
}
