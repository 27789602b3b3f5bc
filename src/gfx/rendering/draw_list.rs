//! Per-frame draw list
//!
//! Walks the current scene, culls primitives whose world bounds fall outside
//! the view frustum and orders the survivors for drawing: opaque first, then
//! alpha-masked, then blended primitives back to front.

use cgmath::{InnerSpace, Vector3};

use crate::gfx::{
    camera::CameraSnapshot,
    rendering::pipeline_manager::VariantKey,
    resources::material::{AlphaMode, FeatureMask},
    scene::{graph::NodeId, Scene},
};

/// One primitive to draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub node: NodeId,
    pub mesh: usize,
    pub primitive: usize,
    pub key: VariantKey,
    /// Camera distance to the world-space bounds center
    pub distance: f32,
    /// Traversal order, used to break distance ties
    pub sequence: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawList {
    pub opaque: Vec<DrawItem>,
    pub mask: Vec<DrawItem>,
    pub blend: Vec<DrawItem>,
    /// Primitives rejected by the frustum or behind the camera
    pub culled: usize,
}

impl DrawList {
    /// Builds the list from current world transforms
    ///
    /// Skinned primitives are never culled since joints can move geometry
    /// outside the bind-pose bounds.
    pub fn build(scene: &Scene, camera: &CameraSnapshot, ibl_enabled: bool) -> Self {
        let frustum = camera.frustum();
        let forward = camera.target - camera.eye;
        let forward = if forward.magnitude2() > 0.0 {
            forward.normalize()
        } else {
            Vector3::new(0.0, 0.0, -1.0)
        };

        let mut list = DrawList::default();
        let mut sequence = 0;

        for node in scene.visible_nodes() {
            let Some(mesh_index) = scene.graph.mesh(node) else {
                continue;
            };
            let Some(mesh) = scene.meshes.get(mesh_index) else {
                continue;
            };
            let has_skin = scene.graph.skin(node).is_some_and(|s| s < scene.skins.len());
            let world = scene.graph.world(node);

            for (p, primitive) in mesh.primitives.iter().enumerate() {
                let index = sequence;
                sequence += 1;

                let skinned = has_skin && primitive.is_skinned();
                let bounds = primitive.bounds.transform(&world);
                if !skinned && !bounds.is_empty() && !frustum.intersects_aabb(&bounds) {
                    list.culled += 1;
                    continue;
                }

                let material = scene.material(primitive.material);
                let features = material
                    .features()
                    .set(FeatureMask::SKINNING, skinned)
                    .set(FeatureMask::VERTEX_COLOR, primitive.attributes.colors)
                    .set(FeatureMask::IBL, ibl_enabled)
                    .with_morph_targets(primitive.morph_target_count());

                let centroid = if bounds.is_empty() { world.w.truncate() } else { bounds.center() };
                let to_centroid = centroid - camera.eye;

                let item = DrawItem {
                    node,
                    mesh: mesh_index,
                    primitive: p,
                    key: VariantKey {
                        features,
                        topology: primitive.topology,
                    },
                    distance: to_centroid.magnitude(),
                    sequence: index,
                };

                match material.alpha_mode {
                    AlphaMode::Opaque => list.opaque.push(item),
                    AlphaMode::Mask => list.mask.push(item),
                    AlphaMode::Blend => {
                        if to_centroid.dot(forward) < 0.0 {
                            list.culled += 1;
                        } else {
                            list.blend.push(item);
                        }
                    }
                }
            }
        }

        list.blend.sort_by(|a, b| {
            b.distance
                .total_cmp(&a.distance)
                .then_with(|| a.sequence.cmp(&b.sequence))
        });
        list
    }

    /// Every item in draw order
    pub fn iter(&self) -> impl Iterator<Item = &DrawItem> {
        self.opaque.iter().chain(&self.mask).chain(&self.blend)
    }

    pub fn len(&self) -> usize {
        self.opaque.len() + self.mask.len() + self.blend.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        gfx::{
            camera::OrbitCamera,
            resources::material::Material,
            scene::{
                graph::{LocalTransform, NodeDesc, SceneGraph},
                mesh::{AttributeFlags, Mesh, Primitive, Topology},
                vertex::Vertex,
            },
        },
        math::Trs,
    };

    fn quad_primitive(material: usize) -> Primitive {
        let vertex = |p: [f32; 3]| Vertex {
            position: p,
            ..Vertex::default()
        };
        Primitive::new(
            vec![
                vertex([-0.5, -0.5, 0.0]),
                vertex([0.5, -0.5, 0.0]),
                vertex([0.5, 0.5, 0.0]),
                vertex([-0.5, 0.5, 0.0]),
            ],
            Some(vec![0, 1, 2, 0, 2, 3]),
            Some(material),
            Topology::Triangles,
            Vec::new(),
            AttributeFlags::default(),
        )
    }

    /// One node per entry of `placements`, each drawing mesh `(material)`
    fn scene_with(placements: &[(f32, f32, usize)]) -> Scene {
        let nodes = placements
            .iter()
            .map(|&(x, z, material)| NodeDesc {
                mesh: Some(material),
                local: LocalTransform::Trs(Trs {
                    translation: Vector3::new(x, 0.0, z),
                    ..Trs::default()
                }),
                ..NodeDesc::default()
            })
            .collect();
        let mut graph = SceneGraph::from_nodes(nodes).unwrap();
        graph.update_world_transforms();

        let mut scene = Scene::new(graph);
        scene.materials = vec![
            Material::default(),
            Material::default().with_alpha_mode(AlphaMode::Mask),
            Material::default().with_alpha_mode(AlphaMode::Blend),
        ];
        scene.meshes = (0..3)
            .map(|m| Mesh {
                primitives: vec![quad_primitive(m)],
                ..Mesh::default()
            })
            .collect();
        scene
    }

    fn front_camera() -> CameraSnapshot {
        let mut camera = OrbitCamera::default();
        camera.look_at(Vector3::new(0.0, 0.0, 10.0), Vector3::new(0.0, 0.0, 0.0));
        CameraSnapshot::from_camera(&camera)
    }

    #[test]
    fn test_partitions_by_alpha_mode() {
        let scene = scene_with(&[(0.0, -1.0, 2), (0.0, 0.0, 1), (0.0, 1.0, 0)]);
        let list = DrawList::build(&scene, &front_camera(), false);

        assert_eq!(list.opaque.len(), 1);
        assert_eq!(list.mask.len(), 1);
        assert_eq!(list.blend.len(), 1);

        let order: Vec<usize> = list.iter().map(|i| i.mesh).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_blend_sorted_back_to_front() {
        let scene = scene_with(&[(0.0, 2.0, 2), (0.0, -3.0, 2), (0.0, 0.0, 2)]);
        let list = DrawList::build(&scene, &front_camera(), false);

        let nodes: Vec<NodeId> = list.blend.iter().map(|i| i.node).collect();
        assert_eq!(nodes, vec![1, 2, 0]);
        assert!(list.blend.windows(2).all(|w| w[0].distance >= w[1].distance));
    }

    #[test]
    fn test_equal_distances_keep_traversal_order() {
        // Mirrored about the view axis, so both centroids are equally far
        let scene = scene_with(&[(1.0, 0.0, 2), (-1.0, 0.0, 2)]);
        let list = DrawList::build(&scene, &front_camera(), false);

        assert_eq!(list.blend[0].distance, list.blend[1].distance);
        assert_eq!(list.blend[0].sequence, 0);
        assert_eq!(list.blend[1].sequence, 1);
    }

    #[test]
    fn test_outside_frustum_is_culled() {
        let scene = scene_with(&[(0.0, 0.0, 0), (500.0, 0.0, 0), (0.0, 20.0, 2)]);
        let list = DrawList::build(&scene, &front_camera(), false);

        assert_eq!(list.len(), 1);
        assert_eq!(list.culled, 2);
    }

    #[test]
    fn test_ibl_bit_in_variant_key() {
        let scene = scene_with(&[(0.0, 0.0, 0)]);
        let with = DrawList::build(&scene, &front_camera(), true);
        let without = DrawList::build(&scene, &front_camera(), false);

        assert!(with.opaque[0].key.features.contains(FeatureMask::IBL));
        assert!(!without.opaque[0].key.features.contains(FeatureMask::IBL));
        assert_eq!(with.opaque[0].key.topology, Topology::Triangles);
    }
}
