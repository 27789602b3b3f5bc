//! Skins and joint matrix evaluation

use cgmath::{Matrix4, SquareMatrix};

use crate::gfx::scene::graph::{NodeId, SceneGraph};

/// Texels per joint in the joint texture: one per matrix column
pub const TEXELS_PER_JOINT: u32 = 4;

/// Texels per row of a joint texture
pub const JOINT_TEXTURE_WIDTH: u32 = 1024;

/// Rows needed to hold `joint_count` joints
pub fn joint_texture_height(joint_count: usize) -> u32 {
    (joint_count as u32 * TEXELS_PER_JOINT).div_ceil(JOINT_TEXTURE_WIDTH).max(1)
}

#[derive(Debug, Clone, Default)]
pub struct Skin {
    pub name: Option<String>,
    pub joints: Vec<NodeId>,
    /// Exactly one per joint; identity when the asset omits them
    pub inverse_bind_matrices: Vec<Matrix4<f32>>,
    pub skeleton: Option<NodeId>,
}

impl Skin {
    /// `inverse(world(owner)) * world(joint[i]) * inverse_bind[i]` for each joint
    ///
    /// World transforms must be current. A non-invertible owner transform
    /// is treated as identity.
    pub fn joint_matrices(&self, graph: &SceneGraph, owner: NodeId) -> Vec<Matrix4<f32>> {
        let inverse_owner = graph
            .world(owner)
            .invert()
            .unwrap_or_else(Matrix4::identity);

        self.joints
            .iter()
            .zip(&self.inverse_bind_matrices)
            .map(|(&joint, inverse_bind)| inverse_owner * graph.world(joint) * inverse_bind)
            .collect()
    }
}

/// Flattens joint matrices into `Rgba32Float` texels, column by column
pub fn joint_texels(matrices: &[Matrix4<f32>]) -> Vec<[f32; 4]> {
    let mut texels = Vec::with_capacity(matrices.len() * TEXELS_PER_JOINT as usize);
    for m in matrices {
        texels.push(m.x.into());
        texels.push(m.y.into());
        texels.push(m.z.into());
        texels.push(m.w.into());
    }
    texels
}
