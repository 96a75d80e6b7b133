use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::placement::PlacementRules;
use crate::engine::spatial::{LaneGeometry, OppositeSideRule, SameSideRule};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("passage width {passage} must be narrower than the road ({road_width})")]
    PassageTooWide { passage: f32, road_width: f32 },
    #[error("ahead distance {ahead} must exceed the visible range {visible}")]
    AheadWithinView { ahead: f32, visible: f32 },
    #[error("recycle threshold must not be negative, got {0}")]
    NegativeThreshold(f32),
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f32 },
    #[error("{field} must be a non-empty span, got {min}..{max}")]
    EmptySpan { field: &'static str, min: f32, max: f32 },
    #[error(
        "opposite-side spacing {spacing} must exceed twice the lane z tolerance ({tolerance})"
    )]
    OppositeSpacingTooTight { spacing: f32, tolerance: f32 },
    #[error("{field} reaches into the centre of the road past threshold {threshold}")]
    BandInCentre { field: &'static str, threshold: f32 },
    #[error("{0} pool must hold at least one object")]
    EmptyPool(&'static str),
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Span {
    pub min: f32,
    pub max: f32,
}

impl Span {
    pub fn new(min: f32, max: f32) -> Self {
        Span { min, max }
    }

    pub fn range(&self) -> Range<f32> {
        self.min..self.max
    }

    fn check(&self, field: &'static str) -> Result<(), ConfigError> {
        // `!(a < b)` also rejects NaN.
        if !(self.min < self.max) {
            return Err(ConfigError::EmptySpan {
                field,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// Paths tried in order until one loads.
    pub candidates: Vec<String>,
    /// Largest dimension of the model after normalisation.
    pub target_size: f32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ModelsConfig {
    pub road: ModelConfig,
    pub barrier: ModelConfig,
    pub streetlight: ModelConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            candidates: Vec::new(),
            target_size: 1.0,
        }
    }
}

fn model_paths(dir: &str) -> Vec<String> {
    ["../assets/models", "assets/models", "./assets/models"]
        .iter()
        .map(|root| format!("{root}/{dir}/scene.glb"))
        .collect()
}

impl Default for ModelsConfig {
    fn default() -> Self {
        ModelsConfig {
            road: ModelConfig {
                candidates: model_paths("street_road"),
                target_size: 80.0,
            },
            barrier: ModelConfig {
                candidates: model_paths("concrete_barriers"),
                target_size: 1.5,
            },
            streetlight: ModelConfig {
                candidates: model_paths("bridge_street_light_3"),
                target_size: 4.0,
            },
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct RoadConfig {
    pub segment_count: usize,
    /// Consecutive segments overlap by this much to hide seams.
    pub segment_overlap: f32,
    pub anchor_x: f32,
    pub anchor_y: f32,
    pub start_z: f32,
}

impl Default for RoadConfig {
    fn default() -> Self {
        RoadConfig {
            segment_count: 30,
            segment_overlap: 0.9,
            anchor_x: 0.0,
            anchor_y: 0.0,
            start_z: 0.0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct StreetlightConfig {
    /// Lights per side.
    pub count: usize,
    pub spacing: f32,
    pub x_regular: f32,
    pub x_mirror: f32,
    pub y: f32,
    /// Mirrored lights sit this far along `z` from the regular grid.
    pub mirror_z_offset: f32,
}

impl Default for StreetlightConfig {
    fn default() -> Self {
        StreetlightConfig {
            count: 12,
            spacing: 15.0,
            x_regular: 0.765_905_3,
            x_mirror: -0.835_027_2,
            y: 0.084_641_35,
            mirror_z_offset: 4.0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct BarrierConfig {
    pub count: usize,
    pub min_distance: f32,
    /// `z` window for the start-up scatter; recycled barriers reuse its length.
    pub initial_window: Span,
    pub ahead_distance: f32,
    pub visible_range: f32,
    pub left_band: Span,
    pub right_band: Span,
    pub same_side_x_tolerance: f32,
    pub same_side_min_z_spacing: f32,
    pub opposite_side_min_z_spacing: f32,
    pub left_threshold: f32,
    pub right_threshold: f32,
    pub primary_attempts: u32,
    pub secondary_attempts: u32,
}

impl Default for BarrierConfig {
    fn default() -> Self {
        BarrierConfig {
            count: 20,
            min_distance: 10.0,
            initial_window: Span::new(5.0, 400.0),
            ahead_distance: 50.0,
            visible_range: 40.0,
            left_band: Span::new(-3.0, -1.0),
            right_band: Span::new(1.0, 3.0),
            same_side_x_tolerance: 2.0,
            same_side_min_z_spacing: 10.0,
            opposite_side_min_z_spacing: 6.0,
            left_threshold: -0.5,
            right_threshold: 0.5,
            primary_attempts: 300,
            secondary_attempts: 100,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct LaneConfig {
    pub road_left_edge: f32,
    pub road_right_edge: f32,
    pub car_width: f32,
    pub passage_margin: f32,
    pub z_tolerance: f32,
    pub scan_step: f32,
}

impl Default for LaneConfig {
    fn default() -> Self {
        LaneConfig {
            road_left_edge: -3.0,
            road_right_edge: 3.0,
            car_width: 1.2,
            passage_margin: 0.6,
            z_tolerance: 2.0,
            scan_step: 0.1,
        }
    }
}

impl LaneConfig {
    pub fn road_width(&self) -> f32 {
        self.road_right_edge - self.road_left_edge
    }

    pub fn passage_width(&self) -> f32 {
        self.car_width + self.passage_margin
    }

    pub fn geometry(&self, half_width: f32) -> LaneGeometry {
        LaneGeometry {
            z_tolerance: self.z_tolerance,
            road_left_edge: self.road_left_edge,
            road_right_edge: self.road_right_edge,
            passage_width: self.passage_width(),
            half_width,
            scan_step: self.scan_step,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    pub recycle_threshold: f32,
    pub road: RoadConfig,
    pub streetlights: StreetlightConfig,
    pub barriers: BarrierConfig,
    pub lane: LaneConfig,
    pub models: ModelsConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            recycle_threshold: 5.0,
            road: RoadConfig::default(),
            streetlights: StreetlightConfig::default(),
            barriers: BarrierConfig::default(),
            lane: LaneConfig::default(),
            models: ModelsConfig::default(),
        }
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn non_empty(pool: &'static str, count: usize) -> Result<(), ConfigError> {
    if count == 0 {
        Err(ConfigError::EmptyPool(pool))
    } else {
        Ok(())
    }
}

impl WorldConfig {
    /// Parses a possibly partial JSON config; missing fields take their defaults.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: WorldConfig = serde_json::from_slice(bytes)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects constant combinations under which the road could never stay passable
    /// or recycled objects would pop into view.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.recycle_threshold >= 0.0) {
            return Err(ConfigError::NegativeThreshold(self.recycle_threshold));
        }

        let lane = &self.lane;
        if !(lane.road_left_edge < lane.road_right_edge) {
            return Err(ConfigError::EmptySpan {
                field: "lane.road",
                min: lane.road_left_edge,
                max: lane.road_right_edge,
            });
        }
        positive("lane.car_width", lane.car_width)?;
        positive("lane.scan_step", lane.scan_step)?;
        positive("lane.z_tolerance", lane.z_tolerance)?;
        if !(lane.passage_width() < lane.road_width()) {
            return Err(ConfigError::PassageTooWide {
                passage: lane.passage_width(),
                road_width: lane.road_width(),
            });
        }

        let barriers = &self.barriers;
        if !(barriers.ahead_distance > barriers.visible_range) {
            return Err(ConfigError::AheadWithinView {
                ahead: barriers.ahead_distance,
                visible: barriers.visible_range,
            });
        }
        non_empty("barrier", barriers.count)?;
        positive("barriers.min_distance", barriers.min_distance)?;
        positive("barriers.primary_attempts", barriers.primary_attempts as f32)?;
        barriers.initial_window.check("barriers.initial_window")?;
        barriers.left_band.check("barriers.left_band")?;
        barriers.right_band.check("barriers.right_band")?;
        // Barriers between the thresholds count as neither side and skip the
        // opposite-side rule.
        if barriers.left_band.max > barriers.left_threshold {
            return Err(ConfigError::BandInCentre {
                field: "barriers.left_band",
                threshold: barriers.left_threshold,
            });
        }
        if !(barriers.right_band.min > barriers.right_threshold) {
            return Err(ConfigError::BandInCentre {
                field: "barriers.right_band",
                threshold: barriers.right_threshold,
            });
        }
        // Two opposite barriers closer than this can both sit within the z
        // tolerance of some z between them and close the lane there.
        if !(barriers.opposite_side_min_z_spacing > 2.0 * lane.z_tolerance) {
            return Err(ConfigError::OppositeSpacingTooTight {
                spacing: barriers.opposite_side_min_z_spacing,
                tolerance: lane.z_tolerance,
            });
        }

        let lights = &self.streetlights;
        non_empty("streetlight", lights.count)?;
        positive("streetlights.spacing", lights.spacing)?;

        let road = &self.road;
        non_empty("road segment", road.segment_count)?;
        if !(road.segment_overlap >= 0.0) {
            return Err(ConfigError::NotPositive {
                field: "road.segment_overlap",
                value: road.segment_overlap,
            });
        }

        for (field, model) in [
            ("models.road.target_size", &self.models.road),
            ("models.barrier.target_size", &self.models.barrier),
            ("models.streetlight.target_size", &self.models.streetlight),
        ] {
            positive(field, model.target_size)?;
        }
        Ok(())
    }

    pub fn placement_rules(&self, half_width: f32) -> PlacementRules {
        let barriers = &self.barriers;
        PlacementRules {
            left_band: barriers.left_band.range(),
            right_band: barriers.right_band.range(),
            min_distance: barriers.min_distance,
            same_side: SameSideRule {
                x_tolerance: barriers.same_side_x_tolerance,
                min_z_spacing: barriers.same_side_min_z_spacing,
            },
            opposite_side: OppositeSideRule {
                min_z_spacing: barriers.opposite_side_min_z_spacing,
                left_threshold: barriers.left_threshold,
                right_threshold: barriers.right_threshold,
            },
            lane: self.lane.geometry(half_width),
            primary_attempts: barriers.primary_attempts,
            secondary_attempts: barriers.secondary_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::spatial::{has_lane_clearance, GroundPos};

    #[test]
    fn defaults_are_consistent() {
        WorldConfig::default().validate().expect("default config is valid");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let json = br#"{ "barriers": { "count": 8 }, "recycle_threshold": 2.5 }"#;
        let config = WorldConfig::from_json(json).expect("partial config parses");
        assert_eq!(config.barriers.count, 8);
        assert_eq!(config.barriers.min_distance, 10.0);
        assert_eq!(config.recycle_threshold, 2.5);
        assert_eq!(config.streetlights, StreetlightConfig::default());
    }

    #[test]
    fn passage_wider_than_road_is_rejected() {
        let mut config = WorldConfig::default();
        config.lane.car_width = 5.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PassageTooWide { .. })
        ));
    }

    #[test]
    fn ahead_distance_must_clear_the_view() {
        let mut config = WorldConfig::default();
        config.barriers.ahead_distance = 40.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::AheadWithinView { .. })
        ));
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let mut config = WorldConfig::default();
        config.recycle_threshold = -1.0;
        assert!(matches!(config.validate(), Err(ConfigError::NegativeThreshold(_))));
    }

    #[test]
    fn empty_pools_and_spans_are_rejected() {
        let mut config = WorldConfig::default();
        config.barriers.count = 0;
        assert!(matches!(config.validate(), Err(ConfigError::EmptyPool("barrier"))));

        let mut config = WorldConfig::default();
        config.barriers.initial_window = Span::new(100.0, 5.0);
        assert!(matches!(config.validate(), Err(ConfigError::EmptySpan { .. })));

        let mut config = WorldConfig::default();
        config.streetlights.spacing = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::NotPositive { .. })));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(
            WorldConfig::from_json(b"{ \"barriers\": 3 }"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn tight_opposite_spacing_is_rejected() {
        let mut config = WorldConfig::default();
        config.barriers.opposite_side_min_z_spacing = 3.5;
        config.barriers.min_distance = 3.0;
        config.barriers.same_side_x_tolerance = 1.0;

        // Each barrier is accepted at its own z, yet the pair seals the road between them.
        let rules = config.placement_rules(0.75);
        let right = GroundPos::new(1.0, 13.5);
        let left = GroundPos::new(-1.0, 10.0);
        assert!(rules.accepts(&left, &[right]));
        assert!(!has_lane_clearance(11.75, &[left, right], &rules.lane));

        assert!(matches!(
            config.validate(),
            Err(ConfigError::OppositeSpacingTooTight { .. })
        ));

        // Spacing of exactly twice the tolerance still lets both reach one z.
        config.barriers.opposite_side_min_z_spacing = 4.0;
        assert!(config.validate().is_err());
        config.barriers.opposite_side_min_z_spacing = 4.5;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bands_must_stay_off_the_centre() {
        let mut config = WorldConfig::default();
        config.barriers.right_band = Span::new(0.2, 3.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BandInCentre { field: "barriers.right_band", .. })
        ));

        let mut config = WorldConfig::default();
        config.barriers.left_band = Span::new(-3.0, 0.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BandInCentre { field: "barriers.left_band", .. })
        ));
    }

    #[test]
    fn rules_carry_the_passage_width() {
        let rules = WorldConfig::default().placement_rules(0.75);
        assert!((rules.lane.passage_width - 1.8).abs() < 1e-6);
        assert_eq!(rules.lane.half_width, 0.75);
        assert_eq!(rules.left_band, -3.0..-1.0);
    }
}
