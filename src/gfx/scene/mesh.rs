//! Meshes, primitives and morph targets
//!
//! Primitive geometry stays on the CPU after upload so bounds, statistics
//! and depth sorting can be computed without reading GPU memory back.

use cgmath::Vector3;

use crate::{
    gfx::{resources::gpu_resources::ResourceHandle, scene::vertex::Vertex},
    math::Aabb,
};

/// Most morph targets blended per primitive; extra targets are ignored
pub const MAX_MORPH_TARGETS: usize = 8;

/// Texels per row of a morph displacement texture
pub const MORPH_TEXTURE_WIDTH: u32 = 1024;

/// Primitive assembly mode
///
/// glTF line loops and triangle fans are rewritten into lists at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Topology {
    Points,
    Lines,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
}

impl Topology {
    pub fn to_wgpu(self) -> wgpu::PrimitiveTopology {
        match self {
            Topology::Points => wgpu::PrimitiveTopology::PointList,
            Topology::Lines => wgpu::PrimitiveTopology::LineList,
            Topology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
            Topology::Triangles => wgpu::PrimitiveTopology::TriangleList,
            Topology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        }
    }

    pub fn is_strip(self) -> bool {
        matches!(self, Topology::LineStrip | Topology::TriangleStrip)
    }

    pub fn is_triangles(self) -> bool {
        matches!(self, Topology::Triangles | Topology::TriangleStrip)
    }
}

/// Per-vertex displacements of one morph target
///
/// `normals` and `tangents` are empty when the target does not displace them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MorphTarget {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tangents: Vec<[f32; 3]>,
}

/// Which optional attributes the source asset supplied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttributeFlags {
    pub normals: bool,
    pub tangents: bool,
    pub uv0: bool,
    pub uv1: bool,
    pub colors: bool,
    pub skinning: bool,
}

/// GPU handles backing a primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitiveGpu {
    pub vertex_buffer: ResourceHandle,
    pub index_buffer: Option<ResourceHandle>,
    pub morph_texture: Option<ResourceHandle>,
}

#[derive(Debug, Clone)]
pub struct Primitive {
    pub vertices: Vec<Vertex>,
    pub indices: Option<Vec<u32>>,
    pub material: Option<usize>,
    pub topology: Topology,
    pub morph_targets: Vec<MorphTarget>,
    pub attributes: AttributeFlags,
    /// Local-space bounds, widened to cover full morph displacement
    pub bounds: Aabb,
    pub gpu: Option<PrimitiveGpu>,
}

impl Primitive {
    pub fn new(
        vertices: Vec<Vertex>,
        indices: Option<Vec<u32>>,
        material: Option<usize>,
        topology: Topology,
        mut morph_targets: Vec<MorphTarget>,
        attributes: AttributeFlags,
    ) -> Self {
        if morph_targets.len() > MAX_MORPH_TARGETS {
            log::warn!(
                "Primitive has {} morph targets, only the first {} are used",
                morph_targets.len(),
                MAX_MORPH_TARGETS
            );
            morph_targets.truncate(MAX_MORPH_TARGETS);
        }
        let bounds = compute_bounds(&vertices, &morph_targets);

        Self {
            vertices,
            indices,
            material,
            topology,
            morph_targets,
            attributes,
            bounds,
            gpu: None,
        }
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    /// Number of elements a draw call consumes
    pub fn element_count(&self) -> u32 {
        match &self.indices {
            Some(indices) => indices.len() as u32,
            None => self.vertex_count(),
        }
    }

    pub fn is_skinned(&self) -> bool {
        self.attributes.skinning
    }

    pub fn morph_target_count(&self) -> usize {
        self.morph_targets.len()
    }

    /// Packs morph displacements into `Rgba32Float` texels
    ///
    /// Texel `(target * 3 + attribute) * vertex_count + vertex` holds the
    /// displacement, where attribute 0 is position, 1 normal and 2 tangent.
    /// Rows are [`MORPH_TEXTURE_WIDTH`] texels wide. Returns the texture
    /// height and the texel data, or `None` without targets.
    pub fn morph_texels(&self) -> Option<(u32, Vec<[f32; 4]>)> {
        if self.morph_targets.is_empty() || self.vertices.is_empty() {
            return None;
        }

        let vertex_count = self.vertices.len();
        let texel_count = self.morph_targets.len() * 3 * vertex_count;
        let height = (texel_count as u32).div_ceil(MORPH_TEXTURE_WIDTH);
        let mut texels = vec![[0.0f32; 4]; (height * MORPH_TEXTURE_WIDTH) as usize];

        for (t, target) in self.morph_targets.iter().enumerate() {
            for (a, attribute) in [&target.positions, &target.normals, &target.tangents]
                .into_iter()
                .enumerate()
            {
                let base = (t * 3 + a) * vertex_count;
                for (v, d) in attribute.iter().take(vertex_count).enumerate() {
                    texels[base + v] = [d[0], d[1], d[2], 0.0];
                }
            }
        }

        Some((height, texels))
    }
}

/// Bounds of the base positions, widened by every target's extreme displacement
pub fn compute_bounds(vertices: &[Vertex], targets: &[MorphTarget]) -> Aabb {
    let mut bounds = Aabb::empty();
    for v in vertices {
        bounds.extend_point(Vector3::from(v.position));
    }
    if bounds.is_empty() {
        return bounds;
    }

    for target in targets {
        let mut low = Vector3::new(0.0f32, 0.0, 0.0);
        let mut high = Vector3::new(0.0f32, 0.0, 0.0);
        for d in &target.positions {
            low.x = low.x.min(d[0]);
            low.y = low.y.min(d[1]);
            low.z = low.z.min(d[2]);
            high.x = high.x.max(d[0]);
            high.y = high.y.max(d[1]);
            high.z = high.z.max(d[2]);
        }
        bounds.min += low;
        bounds.max += high;
    }

    bounds
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
    /// Default morph weights, used when the node carries none
    pub weights: Vec<f32>,
}

impl Mesh {
    pub fn bounds(&self) -> Aabb {
        self.primitives
            .iter()
            .fold(Aabb::empty(), |acc, p| acc.union(&p.bounds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(p: [f32; 3]) -> Vertex {
        Vertex {
            position: p,
            ..Vertex::default()
        }
    }

    fn triangle(targets: Vec<MorphTarget>) -> Primitive {
        Primitive::new(
            vec![vertex([0.0, 0.0, 0.0]), vertex([1.0, 0.0, 0.0]), vertex([0.0, 1.0, 0.0])],
            None,
            None,
            Topology::Triangles,
            targets,
            AttributeFlags::default(),
        )
    }

    #[test]
    fn test_bounds_include_morph_extremes() {
        let target = MorphTarget {
            positions: vec![[0.0, 0.0, 2.0], [0.0; 3], [0.0, -1.0, 0.0]],
            ..MorphTarget::default()
        };
        let prim = triangle(vec![target]);

        assert_eq!(prim.bounds.max.z, 2.0);
        assert_eq!(prim.bounds.min.y, -1.0);
        assert_eq!(prim.element_count(), 3);
    }

    #[test]
    fn test_morph_texel_layout() {
        let target = MorphTarget {
            positions: vec![[1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [3.0, 0.0, 0.0]],
            normals: vec![[0.0, 1.0, 0.0]; 3],
            tangents: Vec::new(),
        };
        let prim = triangle(vec![MorphTarget::default(), target]);
        let (height, texels) = prim.morph_texels().unwrap();

        assert_eq!(height, 1);
        // target 1, position, vertex 2
        assert_eq!(texels[(3 + 0) * 3 + 2], [3.0, 0.0, 0.0, 0.0]);
        // target 1, normal, vertex 0
        assert_eq!(texels[(3 + 1) * 3], [0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_targets_are_capped() {
        let prim = triangle(vec![MorphTarget::default(); 11]);
        assert_eq!(prim.morph_target_count(), MAX_MORPH_TARGETS);
        assert!(triangle(Vec::new()).morph_texels().is_none());
    }
}
