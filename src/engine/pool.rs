//! Fixed-size pools of scenery that are teleported ahead of the camera instead
//! of being spawned and destroyed.

use std::fmt;
use std::ops::AddAssign;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::engine::placement::PlacementTier;
use crate::engine::spatial::GroundPos;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    RoadSegment,
    StreetlightRegular,
    StreetlightMirror,
    Barrier,
}

impl Category {
    /// Editor name prefix, as in `barrier_3`.
    pub fn prefix(self) -> &'static str {
        match self {
            Category::RoadSegment => "road",
            Category::StreetlightRegular => "streetlight",
            Category::StreetlightMirror => "streetlight_mirror",
            Category::Barrier => "barrier",
        }
    }

    /// Inverse of [`PlacedObject::name`].
    pub fn parse_name(name: &str) -> Option<(Category, ObjectId)> {
        // `streetlight_mirror_` has to be tried before `streetlight_`.
        let (category, number) = [
            Category::StreetlightMirror,
            Category::StreetlightRegular,
            Category::RoadSegment,
            Category::Barrier,
        ]
        .into_iter()
        .find_map(|category| {
            name.strip_prefix(category.prefix())
                .and_then(|rest| rest.strip_prefix('_'))
                .and_then(|rest| rest.parse::<u32>().ok())
                .map(|number| (category, number))
        })?;
        number.checked_sub(1).map(|index| (category, ObjectId(index)))
    }
}

/// Identity of an object inside its pool; stable for the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ObjectId(pub u32);

/// Bounding extent along `z` relative to the object's anchor position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalZ {
    pub min_offset: f32,
    pub max_offset: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Orientation {
    /// Euler angles in radians.
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Default for Orientation {
    fn default() -> Self {
        Orientation {
            rotation: Vector3::zeros(),
            scale: Vector3::repeat(1.0),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlacedObject {
    id: ObjectId,
    category: Category,
    position: Vector3<f32>,
    extent: f32,
    local_z: LocalZ,
    orientation: Orientation,
    placement: Option<PlacementTier>,
}

impl PlacedObject {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    /// Lateral half-width used in collision math.
    pub fn extent(&self) -> f32 {
        self.extent
    }

    pub fn local_z(&self) -> LocalZ {
        self.local_z
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Tier of the search that produced the current position, for searched categories.
    pub fn placement(&self) -> Option<PlacementTier> {
        self.placement
    }

    pub fn name(&self) -> String {
        format!("{}_{}", self.category.prefix(), self.id.0 + 1)
    }

    pub fn near_edge(&self) -> f32 {
        self.position.z + self.local_z.min_offset
    }

    pub fn far_edge(&self) -> f32 {
        self.position.z + self.local_z.max_offset
    }

    pub fn ground(&self) -> GroundPos {
        GroundPos::new(self.position.x, self.position.z)
    }
}

impl fmt::Display for PlacedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at ({:.2}, {:.2}, {:.2})",
            self.name(),
            self.position.x,
            self.position.y,
            self.position.z
        )
    }
}

/// A position chosen by a [`RelocationStrategy`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Relocation {
    pub position: Vector3<f32>,
    pub tier: Option<PlacementTier>,
}

impl Relocation {
    pub fn fixed(position: Vector3<f32>) -> Self {
        Relocation {
            position,
            tier: None,
        }
    }

    pub fn searched(position: Vector3<f32>, tier: PlacementTier) -> Self {
        Relocation {
            position,
            tier: Some(tier),
        }
    }
}

/// Category-specific policy deciding where pooled objects go.
pub trait RelocationStrategy {
    /// Position of the `index`-th object at start-up. `placed` holds every
    /// object spawned before it, in spawn order.
    fn spawn(&mut self, index: usize, placed: &[PlacedObject]) -> Relocation;

    /// New position for `objects[index]`, which has fallen behind `camera_z`.
    fn relocate(&mut self, index: usize, objects: &[PlacedObject], camera_z: f32) -> Relocation;

    /// Runs on every object after each tick, recycled or not.
    fn settle(&self, _position: &mut Vector3<f32>) {}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoolSpec {
    pub category: Category,
    pub count: usize,
    pub extent: f32,
    pub local_z: LocalZ,
    pub orientation: Orientation,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub recycled: u32,
    pub fallbacks: u32,
}

impl AddAssign for TickReport {
    fn add_assign(&mut self, other: TickReport) {
        self.recycled += other.recycled;
        self.fallbacks += other.fallbacks;
    }
}

/// Lifetime counters over every position a pool has handed out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub placements: u64,
    pub searched: u64,
    pub fallbacks: u64,
}

impl PoolStats {
    fn record(&mut self, tier: Option<PlacementTier>) {
        self.placements += 1;
        if let Some(tier) = tier {
            self.searched += 1;
            if tier == PlacementTier::Fallback {
                self.fallbacks += 1;
            }
        }
    }

    /// Share of searched placements that ended on the fallback tier.
    pub fn fallback_rate(&self) -> f64 {
        if self.searched == 0 {
            0.0
        } else {
            self.fallbacks as f64 / self.searched as f64
        }
    }
}

impl AddAssign for PoolStats {
    fn add_assign(&mut self, other: PoolStats) {
        self.placements += other.placements;
        self.searched += other.searched;
        self.fallbacks += other.fallbacks;
    }
}

pub struct RecyclablePool<S> {
    category: Category,
    objects: Vec<PlacedObject>,
    strategy: S,
    recycle_threshold: f32,
    stats: PoolStats,
}

impl<S: RelocationStrategy> RecyclablePool<S> {
    pub fn initialize(spec: PoolSpec, recycle_threshold: f32, mut strategy: S) -> Self {
        let mut objects = Vec::with_capacity(spec.count);
        let mut stats = PoolStats::default();

        for index in 0..spec.count {
            let relocation = strategy.spawn(index, &objects);
            stats.record(relocation.tier);
            objects.push(PlacedObject {
                id: ObjectId(index as u32),
                category: spec.category,
                position: relocation.position,
                extent: spec.extent,
                local_z: spec.local_z,
                orientation: spec.orientation,
                placement: relocation.tier,
            });
        }
        for object in &mut objects {
            strategy.settle(&mut object.position);
        }

        RecyclablePool {
            category: spec.category,
            objects,
            strategy,
            recycle_threshold,
            stats,
        }
    }

    /// Moves every object whose far edge is more than `recycle_threshold`
    /// behind `camera_z` to the position its strategy picks.
    ///
    /// Objects are visited in spawn order, so a later object sees the new
    /// positions of earlier ones recycled in the same tick.
    pub fn tick(&mut self, camera_z: f32) -> TickReport {
        let limit = camera_z - self.recycle_threshold;
        let mut report = TickReport::default();

        for index in 0..self.objects.len() {
            if self.objects[index].far_edge() >= limit {
                continue;
            }

            let relocation = self.strategy.relocate(index, &self.objects, camera_z);
            let object = &mut self.objects[index];
            log::debug!(
                "recycling {} to z={:.2} (camera z={:.2})",
                object,
                relocation.position.z,
                camera_z
            );
            object.position = relocation.position;
            object.placement = relocation.tier;

            report.recycled += 1;
            if relocation.tier == Some(PlacementTier::Fallback) {
                report.fallbacks += 1;
            }
            self.stats.record(relocation.tier);
        }

        for object in &mut self.objects {
            self.strategy.settle(&mut object.position);
        }
        report
    }
}

impl<S> RecyclablePool<S> {
    pub fn category(&self) -> Category {
        self.category
    }

    pub fn objects(&self) -> &[PlacedObject] {
        &self.objects
    }

    pub fn get(&self, id: ObjectId) -> Option<&PlacedObject> {
        self.objects.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Editor override of one object's transform. Returns false for unknown ids.
    pub fn override_transform(
        &mut self,
        id: ObjectId,
        position: Vector3<f32>,
        orientation: Orientation,
    ) -> bool {
        match self.objects.get_mut(id.0 as usize) {
            Some(object) => {
                object.position = position;
                object.orientation = orientation;
                object.placement = None;
                true
            }
            None => false,
        }
    }
}
