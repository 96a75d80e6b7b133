//! Saving and restoring hand-edited scenery layouts as JSON.

use nalgebra::Vector3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::pool::{Category, Orientation, PlacedObject};
use crate::game::World;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("invalid layout JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Xyz {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Vector3<f32>> for Xyz {
    fn from(v: Vector3<f32>) -> Self {
        Xyz { x: v.x, y: v.y, z: v.z }
    }
}

impl From<Xyz> for Vector3<f32> {
    fn from(v: Xyz) -> Self {
        Vector3::new(v.x, v.y, v.z)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LayoutEntry {
    pub name: String,
    pub position: Xyz,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Xyz>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Xyz>,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct LayoutReport {
    pub applied: usize,
    pub unknown: Vec<String>,
}

fn entry(object: &PlacedObject, mirror_x: f32) -> LayoutEntry {
    let mut position = object.position();
    if object.category() == Category::StreetlightMirror {
        position.x = mirror_x;
    }
    let orientation = object.orientation();
    LayoutEntry {
        name: object.name(),
        position: position.into(),
        rotation: Some(orientation.rotation.into()),
        scale: Some(orientation.scale.into()),
    }
}

pub fn export_layout<R>(world: &World<R>) -> Vec<LayoutEntry> {
    let mirror_x = world.config().streetlights.x_mirror;
    world.objects().map(|object| entry(object, mirror_x)).collect()
}

pub fn layout_to_json(entries: &[LayoutEntry]) -> Result<String, LayoutError> {
    Ok(serde_json::to_string_pretty(entries)?)
}

pub fn parse_layout(json: &str) -> Result<Vec<LayoutEntry>, LayoutError> {
    Ok(serde_json::from_str(json)?)
}

/// Moves every named object to its saved transform. Missing rotation or scale
/// keeps the object's current one; mirrored streetlights keep their fixed `x`.
pub fn apply_layout<R: Rng>(world: &mut World<R>, entries: &[LayoutEntry]) -> LayoutReport {
    let mirror_x = world.config().streetlights.x_mirror;
    let mut report = LayoutReport::default();

    for entry in entries {
        let Some(current) = world.object(&entry.name).map(PlacedObject::orientation) else {
            log::warn!("layout names unknown object {:?}", entry.name);
            report.unknown.push(entry.name.clone());
            continue;
        };

        let mut position: Vector3<f32> = entry.position.into();
        if matches!(Category::parse_name(&entry.name), Some((Category::StreetlightMirror, _))) {
            position.x = mirror_x;
        }
        let orientation = Orientation {
            rotation: entry.rotation.map_or(current.rotation, Vector3::from),
            scale: entry.scale.map_or(current.scale, Vector3::from),
        };
        if world.place_by_name(&entry.name, position, orientation) {
            report.applied += 1;
        }
    }

    log::info!(
        "applied layout: {} objects moved, {} unknown",
        report.applied,
        report.unknown.len()
    );
    report
}
