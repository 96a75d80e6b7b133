use nalgebra::{Matrix4, Point3, Vector3};
use thiserror::Error;

use crate::engine::pool::LocalZ;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to import glTF: {0}")]
    Import(#[from] gltf::Error),
    #[error("model has no vertex positions")]
    NoPositions,
}

/// Axis-aligned bounding box of a scenery model, in model space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelBounds {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl ModelBounds {
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        ModelBounds { min, max }
    }

    /// Box centred on the origin.
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let half = Vector3::new(width, height, depth) / 2.0;
        ModelBounds {
            min: Point3::from(-half),
            max: Point3::from(half),
        }
    }

    pub fn from_gltf(bytes: &[u8]) -> Result<Self, ModelError> {
        let (document, buffers, _) = gltf::import_slice(bytes)?;
        let mut bounds: Option<ModelBounds> = None;

        let scene = document.default_scene().or_else(|| document.scenes().next());
        match scene {
            Some(scene) => {
                for node in scene.nodes() {
                    include_node(&node, &Matrix4::identity(), &buffers, &mut bounds);
                }
            }
            None => {
                for mesh in document.meshes() {
                    include_mesh(&mesh, &Matrix4::identity(), &buffers, &mut bounds);
                }
            }
        }

        bounds.ok_or(ModelError::NoPositions)
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn centre(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn scaled(&self, factor: f32) -> Self {
        ModelBounds {
            min: Point3::from(self.min.coords * factor),
            max: Point3::from(self.max.coords * factor),
        }
    }

    /// Uniformly rescales so the largest dimension equals `target_size`.
    pub fn fit_to(&self, target_size: f32) -> Self {
        let largest = self.size().max();
        if largest > 0.0 {
            self.scaled(target_size / largest)
        } else {
            *self
        }
    }

    pub fn half_width(&self) -> f32 {
        self.size().x / 2.0
    }

    pub fn height(&self) -> f32 {
        self.size().y
    }

    /// `z` extent relative to the box centre, which is where pooled objects are anchored.
    pub fn local_z(&self) -> LocalZ {
        let centre = self.centre().z;
        LocalZ {
            min_offset: self.min.z - centre,
            max_offset: self.max.z - centre,
        }
    }

    fn include(&mut self, point: &Point3<f32>) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }
}

fn include_node(
    node: &gltf::Node,
    parent: &Matrix4<f32>,
    buffers: &[gltf::buffer::Data],
    bounds: &mut Option<ModelBounds>,
) {
    let transform = parent * Matrix4::from(node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        include_mesh(&mesh, &transform, buffers, bounds);
    }
    for child in node.children() {
        include_node(&child, &transform, buffers, bounds);
    }
}

fn include_mesh(
    mesh: &gltf::Mesh,
    transform: &Matrix4<f32>,
    buffers: &[gltf::buffer::Data],
    bounds: &mut Option<ModelBounds>,
) {
    for primitive in mesh.primitives() {
        let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));
        let Some(positions) = reader.read_positions() else {
            continue;
        };
        for position in positions {
            let point = transform.transform_point(&Point3::from(position));
            let next = match *bounds {
                Some(mut current) => {
                    current.include(&point);
                    current
                }
                None => ModelBounds::new(point, point),
            };
            *bounds = Some(next);
        }
    }
}
