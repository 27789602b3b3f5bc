//! Animation clips as loaded from an asset

use crate::gfx::scene::graph::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Interpolation {
    Step,
    #[default]
    Linear,
    CubicSpline,
}

/// Node property a channel drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetPath {
    Translation,
    Rotation,
    Scale,
    Weights,
}

/// Keyframe times and values
///
/// `output` is flattened: `components` floats per keyframe, or three times
/// that for cubic splines where each keyframe stores in-tangent, value and
/// out-tangent in that order.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSampler {
    pub input: Vec<f32>,
    pub output: Vec<f32>,
    pub interpolation: Interpolation,
    pub components: usize,
}

impl AnimationSampler {
    pub fn keyframe_count(&self) -> usize {
        self.input.len()
    }

    /// Floats stored per keyframe
    pub fn stride(&self) -> usize {
        match self.interpolation {
            Interpolation::CubicSpline => self.components * 3,
            _ => self.components,
        }
    }

    pub fn last_time(&self) -> f32 {
        self.input.last().copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    pub node: NodeId,
    pub path: TargetPath,
    pub sampler: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub channels: Vec<Channel>,
    pub samplers: Vec<AnimationSampler>,
    /// Largest keyframe time over all samplers, in seconds
    pub duration: f32,
}

impl AnimationClip {
    pub fn new(name: String, channels: Vec<Channel>, samplers: Vec<AnimationSampler>) -> Self {
        let duration = samplers
            .iter()
            .map(AnimationSampler::last_time)
            .fold(0.0f32, f32::max);
        Self {
            name,
            channels,
            samplers,
            duration,
        }
    }

    /// Nodes the clip writes to, without duplicates, in channel order
    pub fn target_nodes(&self) -> Vec<NodeId> {
        let mut nodes = Vec::new();
        for channel in &self.channels {
            if !nodes.contains(&channel.node) {
                nodes.push(channel.node);
            }
        }
        nodes
    }
}
