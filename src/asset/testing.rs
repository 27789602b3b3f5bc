//! In-memory glTF fixtures for tests
//!
//! Assets are synthesized with `serde_json` and [`write_glb`] so no binary
//! files need to be checked in.

use std::borrow::Cow;

use gltf::binary::{Glb, Header};
use serde_json::{json, Value};

use super::{image::encode_png, image::ImageData};

const FLOAT: u32 = 5126;
const UNSIGNED_SHORT: u32 = 5123;
const UNSIGNED_INT: u32 = 5125;
const ARRAY_BUFFER: u32 = 34962;
const ELEMENT_ARRAY_BUFFER: u32 = 34963;
const NEAREST: u32 = 9728;

pub const RED: [u8; 4] = [255, 0, 0, 255];
pub const GREEN: [u8; 4] = [0, 255, 0, 255];

/// Frames `json` and an optional BIN chunk as a GLB container
pub fn write_glb(json: &[u8], bin: Option<&[u8]>) -> Vec<u8> {
    Glb {
        header: Header {
            magic: *b"glTF",
            version: 2,
            length: 0,
        },
        json: Cow::Borrowed(json),
        bin: bin.map(Cow::Borrowed),
    }
    .to_vec()
    .expect("GLB framing")
}

/// Accumulates buffer views and accessors over a single binary buffer
#[derive(Default)]
pub struct AssetBuilder {
    bin: Vec<u8>,
    views: Vec<Value>,
    accessors: Vec<Value>,
}

impl AssetBuilder {
    pub fn view(&mut self, bytes: &[u8], target: Option<u32>) -> usize {
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }
        let mut view = json!({
            "buffer": 0,
            "byteOffset": self.bin.len(),
            "byteLength": bytes.len(),
        });
        if let Some(target) = target {
            view["target"] = json!(target);
        }
        self.bin.extend_from_slice(bytes);
        self.views.push(view);
        self.views.len() - 1
    }

    fn accessor(&mut self, view: usize, component_type: u32, count: usize, ty: &str) -> usize {
        self.accessors.push(json!({
            "bufferView": view,
            "componentType": component_type,
            "count": count,
            "type": ty,
        }));
        self.accessors.len() - 1
    }

    pub fn vec3(&mut self, values: &[[f32; 3]], with_bounds: bool) -> usize {
        let view = self.view(bytemuck::cast_slice(values), Some(ARRAY_BUFFER));
        let index = self.accessor(view, FLOAT, values.len(), "VEC3");
        if with_bounds {
            let mut min = [f32::MAX; 3];
            let mut max = [f32::MIN; 3];
            for v in values {
                for i in 0..3 {
                    min[i] = min[i].min(v[i]);
                    max[i] = max[i].max(v[i]);
                }
            }
            self.accessors[index]["min"] = json!(min);
            self.accessors[index]["max"] = json!(max);
        }
        index
    }

    pub fn vec2(&mut self, values: &[[f32; 2]]) -> usize {
        let view = self.view(bytemuck::cast_slice(values), Some(ARRAY_BUFFER));
        self.accessor(view, FLOAT, values.len(), "VEC2")
    }

    pub fn vec4(&mut self, values: &[[f32; 4]]) -> usize {
        let view = self.view(bytemuck::cast_slice(values), Some(ARRAY_BUFFER));
        self.accessor(view, FLOAT, values.len(), "VEC4")
    }

    pub fn joints(&mut self, values: &[[u16; 4]]) -> usize {
        let view = self.view(bytemuck::cast_slice(values), Some(ARRAY_BUFFER));
        self.accessor(view, UNSIGNED_SHORT, values.len(), "VEC4")
    }

    /// Untargeted float data, as used for keyframe outputs
    pub fn keyframes<const N: usize>(&mut self, values: &[[f32; N]], ty: &str) -> usize
    where
        [f32; N]: bytemuck::Pod,
    {
        let view = self.view(bytemuck::cast_slice(values), None);
        self.accessor(view, FLOAT, values.len(), ty)
    }

    pub fn scalars(&mut self, values: &[f32]) -> usize {
        let view = self.view(bytemuck::cast_slice(values), None);
        let index = self.accessor(view, FLOAT, values.len(), "SCALAR");
        let min = values.iter().copied().fold(f32::MAX, f32::min);
        let max = values.iter().copied().fold(f32::MIN, f32::max);
        self.accessors[index]["min"] = json!([min]);
        self.accessors[index]["max"] = json!([max]);
        index
    }

    pub fn indices(&mut self, values: &[u32]) -> usize {
        let view = self.view(bytemuck::cast_slice(values), Some(ELEMENT_ARRAY_BUFFER));
        self.accessor(view, UNSIGNED_INT, values.len(), "SCALAR")
    }

    pub fn matrices(&mut self, values: &[[f32; 16]]) -> usize {
        let view = self.view(bytemuck::cast_slice(values), None);
        self.accessor(view, FLOAT, values.len(), "MAT4")
    }

    fn fill(self, mut root: Value, uri: Option<&str>) -> (Value, Vec<u8>) {
        let mut buffer = json!({ "byteLength": self.bin.len() });
        if let Some(uri) = uri {
            buffer["uri"] = json!(uri);
        }
        root["asset"] = json!({ "version": "2.0", "generator": "thistle fixtures" });
        root["buffers"] = json!([buffer]);
        root["bufferViews"] = Value::Array(self.views);
        root["accessors"] = Value::Array(self.accessors);
        (root, self.bin)
    }

    /// Finishes a self-contained GLB
    pub fn glb(self, root: Value) -> Vec<u8> {
        let (root, bin) = self.fill(root, None);
        write_glb(root.to_string().as_bytes(), Some(&bin))
    }

    /// Finishes a text asset whose buffer lives at `uri`
    pub fn gltf(self, root: Value, uri: &str) -> (Vec<u8>, Vec<u8>) {
        let (root, bin) = self.fill(root, Some(uri));
        (root.to_string().into_bytes(), bin)
    }
}

/// 2x2 red/green checker
pub fn checker_png() -> Vec<u8> {
    let pixels = [RED, GREEN, GREEN, RED].concat();
    encode_png(&ImageData {
        width: 2,
        height: 2,
        pixels,
    })
    .unwrap()
}

/// Per-face box geometry: 24 vertices with normals and UVs, 36 indices
pub fn box_geometry(min: [f32; 3], max: [f32; 3]) -> (Vec<[f32; 3]>, Vec<[f32; 3]>, Vec<[f32; 2]>, Vec<u32>) {
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];
    let center: [f32; 3] = std::array::from_fn(|i| (min[i] + max[i]) * 0.5);
    let size: [f32; 3] = std::array::from_fn(|i| max[i] - min[i]);

    let (mut positions, mut normals, mut uvs, mut indices) = (Vec::new(), Vec::new(), Vec::new(), Vec::new());
    for (n, u, v) in faces {
        let base = positions.len() as u32;
        for (s, t) in [(-1.0f32, -1.0f32), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let mut p = [0.0f32; 3];
            for i in 0..3 {
                p[i] = center[i] + (n[i] + u[i] * s + v[i] * t) * 0.5 * size[i];
            }
            positions.push(p);
            normals.push(n);
            uvs.push([(s + 1.0) * 0.5, 1.0 - (t + 1.0) * 0.5]);
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    (positions, normals, uvs, indices)
}

struct BoxOptions {
    min: [f32; 3],
    max: [f32; 3],
    textured: bool,
    base_color: [f32; 4],
    metallic: f32,
    roughness: f32,
    bad_index: bool,
}

impl Default for BoxOptions {
    fn default() -> Self {
        Self {
            min: [-0.5; 3],
            max: [0.5; 3],
            textured: true,
            base_color: [1.0; 4],
            metallic: 0.0,
            roughness: 1.0,
            bad_index: false,
        }
    }
}

fn box_asset(options: BoxOptions) -> (AssetBuilder, Value) {
    let mut builder = AssetBuilder::default();
    let (positions, normals, uvs, mut indices) = box_geometry(options.min, options.max);
    if options.bad_index {
        indices[5] = 99;
    }

    let position = builder.vec3(&positions, true);
    let normal = builder.vec3(&normals, false);
    let uv = builder.vec2(&uvs);
    let index = builder.indices(&indices);

    let mut pbr = json!({
        "baseColorFactor": options.base_color,
        "metallicFactor": options.metallic,
        "roughnessFactor": options.roughness,
    });
    let mut root = json!({
        "scene": 0,
        "scenes": [{ "name": "Root", "nodes": [0] }],
        "nodes": [{ "name": "Box", "mesh": 0 }],
        "meshes": [{
            "name": "Box",
            "primitives": [{
                "attributes": { "POSITION": position, "NORMAL": normal, "TEXCOORD_0": uv },
                "indices": index,
                "material": 0,
            }],
        }],
    });

    if options.textured {
        let image_view = builder.view(&checker_png(), None);
        pbr["baseColorTexture"] = json!({ "index": 0 });
        root["images"] = json!([{ "bufferView": image_view, "mimeType": "image/png" }]);
        root["samplers"] = json!([{ "magFilter": NEAREST, "minFilter": NEAREST }]);
        root["textures"] = json!([{ "source": 0, "sampler": 0 }]);
    }
    root["materials"] = json!([{ "name": "Surface", "pbrMetallicRoughness": pbr }]);

    (builder, root)
}

/// A unit cube with a 2x2 red/green checker base color texture
pub fn cube_glb() -> Vec<u8> {
    let (builder, root) = box_asset(BoxOptions::default());
    builder.glb(root)
}

/// The textured cube as a text asset with its buffer at `uri`
pub fn cube_gltf_with_external_buffer(uri: &str) -> (Vec<u8>, Vec<u8>) {
    let (builder, root) = box_asset(BoxOptions::default());
    builder.gltf(root, uri)
}

/// The textured cube with one index past the vertex count
pub fn cube_glb_with_bad_index() -> Vec<u8> {
    let (builder, root) = box_asset(BoxOptions {
        bad_index: true,
        ..BoxOptions::default()
    });
    builder.glb(root)
}

/// An untextured, fully metallic, fairly smooth unit cube
pub fn metallic_cube_glb() -> Vec<u8> {
    let (builder, root) = box_asset(BoxOptions {
        textured: false,
        base_color: [0.95, 0.95, 0.95, 1.0],
        metallic: 1.0,
        roughness: 0.25,
        ..BoxOptions::default()
    });
    builder.glb(root)
}

/// An untextured box spanning `min..max`
pub fn box_glb(min: [f32; 3], max: [f32; 3]) -> Vec<u8> {
    let (builder, root) = box_asset(BoxOptions {
        min,
        max,
        textured: false,
        ..BoxOptions::default()
    });
    builder.glb(root)
}

/// The textured cube drawn unlit, with transformed texture coordinates
/// and a directional light (node 1) plus a spot light (node 2)
pub fn lit_cube_glb() -> Vec<u8> {
    let (builder, mut root) = box_asset(BoxOptions::default());
    let transform = json!({
        "KHR_texture_transform": { "offset": [0.5, 0.0], "rotation": 0.0, "scale": [2.0, 2.0] }
    });
    root["materials"][0]["pbrMetallicRoughness"]["baseColorTexture"]["extensions"] = transform.clone();
    root["materials"][0]["normalTexture"] = json!({ "index": 0, "scale": 0.5, "extensions": transform });
    root["materials"][0]["extensions"] = json!({ "KHR_materials_unlit": {} });
    root["extensionsUsed"] = json!(["KHR_materials_unlit", "KHR_texture_transform", "KHR_lights_punctual"]);
    root["extensionsRequired"] = json!(["KHR_materials_unlit"]);
    root["extensions"] = json!({
        "KHR_lights_punctual": {
            "lights": [
                { "name": "Sun", "type": "directional", "color": [1.0, 0.9, 0.8], "intensity": 3.0, "range": 5.0 },
                {
                    "name": "Lamp",
                    "type": "spot",
                    "intensity": 20.0,
                    "range": 10.0,
                    "spot": { "innerConeAngle": 0.2, "outerConeAngle": 0.6 }
                }
            ]
        }
    });
    root["nodes"] = json!([
        { "name": "Box", "mesh": 0 },
        { "name": "Sun", "rotation": [-0.7071068, 0.0, 0.0, 0.7071068], "extensions": { "KHR_lights_punctual": { "light": 0 } } },
        { "name": "Lamp", "translation": [0.0, 2.0, 0.0], "extensions": { "KHR_lights_punctual": { "light": 1 } } }
    ]);
    root["scenes"][0]["nodes"] = json!([0, 1, 2]);
    builder.glb(root)
}

/// The textured cube plus "Wave": 2 s moving node 0 from the origin to +X
pub fn wave_glb() -> Vec<u8> {
    wave_glb_with_times([0.0, 2.0])
}

/// "Wave" with its two keyframe times replaced
pub fn wave_glb_with_times(times: [f32; 2]) -> Vec<u8> {
    let (mut builder, mut root) = box_asset(BoxOptions::default());
    let times = builder.scalars(&times);
    let values = builder.keyframes(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]], "VEC3");
    root["animations"] = json!([{
        "name": "Wave",
        "samplers": [{ "input": times, "output": values, "interpolation": "LINEAR" }],
        "channels": [{ "sampler": 0, "target": { "node": 0, "path": "translation" } }],
    }]);
    builder.glb(root)
}

/// A triangle skinned to a two-joint chain
///
/// Node 0 carries the mesh and skin, node 1 is the root joint and node 2 the
/// child joint one unit up. The top vertex follows joint 1.
pub fn skinned_glb() -> Vec<u8> {
    let mut builder = AssetBuilder::default();
    let position = builder.vec3(&[[-0.5, 0.0, 0.0], [0.5, 0.0, 0.0], [0.0, 2.0, 0.0]], true);
    let joints = builder.joints(&[[0, 0, 0, 0], [0, 0, 0, 0], [1, 0, 0, 0]]);
    let weights = builder.vec4(&[[1.0, 0.0, 0.0, 0.0], [1.0, 0.0, 0.0, 0.0], [1.0, 0.0, 0.0, 0.0]]);

    let identity = [1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0];
    let mut down = identity;
    down[13] = -1.0;
    let inverse_binds = builder.matrices(&[identity, down]);

    let times = builder.scalars(&[0.0, 1.0]);
    let rotations = builder.keyframes(&[[0.0, 0.0, 0.0, 1.0], [0.0, 0.0, 0.382_683_43, 0.923_879_5]], "VEC4");

    let root = json!({
        "scene": 0,
        "scenes": [{ "nodes": [0, 1] }],
        "nodes": [
            { "name": "Body", "mesh": 0, "skin": 0 },
            { "name": "Hip", "children": [2] },
            { "name": "Spine", "translation": [0.0, 1.0, 0.0] },
        ],
        "meshes": [{
            "primitives": [{
                "attributes": { "POSITION": position, "JOINTS_0": joints, "WEIGHTS_0": weights },
            }],
        }],
        "skins": [{ "joints": [1, 2], "inverseBindMatrices": inverse_binds, "skeleton": 1 }],
        "animations": [{
            "name": "Bend",
            "samplers": [{ "input": times, "output": rotations }],
            "channels": [{ "sampler": 0, "target": { "node": 2, "path": "rotation" } }],
        }],
    });
    builder.glb(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_geometry_spans_bounds() {
        let (positions, normals, uvs, indices) = box_geometry([-2.0, -1.0, -3.0], [2.0, 1.0, 3.0]);
        assert_eq!(positions.len(), 24);
        assert_eq!(normals.len(), 24);
        assert_eq!(uvs.len(), 24);
        assert_eq!(indices.len(), 36);
        assert!(positions.contains(&[-2.0, -1.0, -3.0]));
        assert!(positions.contains(&[2.0, 1.0, 3.0]));
    }
}
