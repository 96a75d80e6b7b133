pub mod config;
pub mod layout;
pub mod scenery;

use std::f32::consts::PI;

use nalgebra::Vector3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::engine::model::ModelBounds;
use crate::engine::placement::PlacementGenerator;
use crate::engine::pool::{
    Category, Orientation, PlacedObject, PoolSpec, PoolStats, RecyclablePool, TickReport,
};
use crate::game::config::{ConfigError, WorldConfig};
use crate::game::scenery::{BarrierScatter, RoadChain, StreetlightGrid};

/// Resolved model-space bounds of each scenery model, already normalised.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneryExtents {
    pub road: ModelBounds,
    pub barrier: ModelBounds,
    pub streetlight: ModelBounds,
}

impl Default for SceneryExtents {
    fn default() -> Self {
        SceneryExtents {
            road: ModelBounds::cuboid(24.0, 0.2, 80.0),
            barrier: ModelBounds::cuboid(1.5, 0.8, 0.6),
            streetlight: ModelBounds::cuboid(0.6, 4.0, 0.6),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct TickSummary {
    pub camera_z: f32,
    pub road: TickReport,
    pub streetlights: TickReport,
    pub barriers: TickReport,
}

impl TickSummary {
    pub fn total(&self) -> TickReport {
        let mut total = self.road;
        total += self.streetlights;
        total += self.barriers;
        total
    }
}

/// What a renderer needs to draw one object.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ObjectTransform {
    pub name: String,
    pub category: Category,
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

impl From<&PlacedObject> for ObjectTransform {
    fn from(object: &PlacedObject) -> Self {
        let orientation = object.orientation();
        ObjectTransform {
            name: object.name(),
            category: object.category(),
            position: triple(&object.position()),
            rotation: triple(&orientation.rotation),
            scale: triple(&orientation.scale),
        }
    }
}

fn triple(v: &Vector3<f32>) -> [f32; 3] {
    [v.x, v.y, v.z]
}

/// Every scenery pool along one road.
pub struct World<R = SmallRng> {
    config: WorldConfig,
    roads: RecyclablePool<RoadChain>,
    streetlights: RecyclablePool<StreetlightGrid>,
    mirrored: RecyclablePool<StreetlightGrid>,
    barriers: RecyclablePool<BarrierScatter<R>>,
}

impl World<SmallRng> {
    pub fn new(config: WorldConfig, extents: &SceneryExtents) -> Result<Self, ConfigError> {
        World::with_rng(config, extents, SmallRng::from_entropy())
    }

    pub fn seeded(
        config: WorldConfig,
        extents: &SceneryExtents,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        World::with_rng(config, extents, SmallRng::seed_from_u64(seed))
    }
}

impl<R: Rng> World<R> {
    pub fn with_rng(
        config: WorldConfig,
        extents: &SceneryExtents,
        rng: R,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let threshold = config.recycle_threshold;

        let road_z = extents.road.local_z();
        let roads = RecyclablePool::initialize(
            PoolSpec {
                category: Category::RoadSegment,
                count: config.road.segment_count,
                extent: extents.road.half_width(),
                local_z: road_z,
                orientation: Orientation::default(),
            },
            threshold,
            RoadChain {
                anchor_x: config.road.anchor_x,
                anchor_y: config.road.anchor_y,
                start_z: config.road.start_z,
                overlap: config.road.segment_overlap,
                local_z: road_z,
            },
        );

        let lights = &config.streetlights;
        let light_spec = |category, orientation| PoolSpec {
            category,
            count: lights.count,
            extent: extents.streetlight.half_width(),
            local_z: extents.streetlight.local_z(),
            orientation,
        };
        let streetlights = RecyclablePool::initialize(
            light_spec(Category::StreetlightRegular, Orientation::default()),
            threshold,
            StreetlightGrid {
                x: lights.x_regular,
                y: lights.y,
                spacing: lights.spacing,
                offset: 0.0,
            },
        );
        let facing_back = Orientation {
            rotation: Vector3::new(0.0, PI, 0.0),
            ..Orientation::default()
        };
        let mirrored = RecyclablePool::initialize(
            light_spec(Category::StreetlightMirror, facing_back),
            threshold,
            StreetlightGrid {
                x: lights.x_mirror,
                y: lights.y,
                spacing: lights.spacing,
                offset: lights.mirror_z_offset,
            },
        );

        let half_width = extents.barrier.half_width();
        let generator = PlacementGenerator::new(config.placement_rules(half_width), rng);
        let barrier_config = &config.barriers;
        let barriers = RecyclablePool::initialize(
            PoolSpec {
                category: Category::Barrier,
                count: barrier_config.count,
                extent: half_width,
                local_z: extents.barrier.local_z(),
                orientation: Orientation::default(),
            },
            threshold,
            BarrierScatter::new(
                generator,
                extents.barrier.height() / 2.0,
                barrier_config.initial_window.range(),
                barrier_config.ahead_distance,
            ),
        );

        let world = World {
            config,
            roads,
            streetlights,
            mirrored,
            barriers,
        };
        log::info!(
            "world ready: {} roads, {} + {} lights, {} barriers ({} start-up fallbacks)",
            world.roads.len(),
            world.streetlights.len(),
            world.mirrored.len(),
            world.barriers.len(),
            world.barriers.stats().fallbacks
        );
        Ok(world)
    }

    /// Recycles everything that fell behind `camera_z`. When nothing has, no
    /// object moves.
    pub fn tick(&mut self, camera_z: f32) -> TickSummary {
        let road = self.roads.tick(camera_z);
        let mut streetlights = self.streetlights.tick(camera_z);
        streetlights += self.mirrored.tick(camera_z);
        let barriers = self.barriers.tick(camera_z);
        TickSummary {
            camera_z,
            road,
            streetlights,
            barriers,
        }
    }

    /// Moves a named object, as the layout editor does. Unknown names return false.
    pub fn place_by_name(
        &mut self,
        name: &str,
        position: Vector3<f32>,
        orientation: Orientation,
    ) -> bool {
        let Some((category, id)) = Category::parse_name(name) else {
            return false;
        };
        match category {
            Category::RoadSegment => self.roads.override_transform(id, position, orientation),
            Category::StreetlightRegular => {
                self.streetlights.override_transform(id, position, orientation)
            }
            Category::StreetlightMirror => {
                self.mirrored.override_transform(id, position, orientation)
            }
            Category::Barrier => self.barriers.override_transform(id, position, orientation),
        }
    }
}

impl<R> World<R> {
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn roads(&self) -> &RecyclablePool<RoadChain> {
        &self.roads
    }

    pub fn streetlights(&self) -> &RecyclablePool<StreetlightGrid> {
        &self.streetlights
    }

    pub fn mirrored_streetlights(&self) -> &RecyclablePool<StreetlightGrid> {
        &self.mirrored
    }

    pub fn barriers(&self) -> &RecyclablePool<BarrierScatter<R>> {
        &self.barriers
    }

    pub fn objects(&self) -> impl Iterator<Item = &PlacedObject> {
        self.roads
            .objects()
            .iter()
            .chain(self.streetlights.objects())
            .chain(self.mirrored.objects())
            .chain(self.barriers.objects())
    }

    pub fn object(&self, name: &str) -> Option<&PlacedObject> {
        let (category, id) = Category::parse_name(name)?;
        match category {
            Category::RoadSegment => self.roads.get(id),
            Category::StreetlightRegular => self.streetlights.get(id),
            Category::StreetlightMirror => self.mirrored.get(id),
            Category::Barrier => self.barriers.get(id),
        }
    }

    pub fn transforms(&self) -> Vec<ObjectTransform> {
        self.objects().map(ObjectTransform::from).collect()
    }

    pub fn stats(&self) -> PoolStats {
        let mut stats = self.roads.stats();
        stats += self.streetlights.stats();
        stats += self.mirrored.stats();
        stats += self.barriers.stats();
        stats
    }

    pub fn fallback_rate(&self) -> f64 {
        self.stats().fallback_rate()
    }
}
