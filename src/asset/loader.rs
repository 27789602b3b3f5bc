//! # glTF Loader
//!
//! Turns asset bytes into a CPU-side [`Scene`]. Loading runs in phases and
//! the first failure aborts it; a partially built scene is never returned.
//!
//! 1. split the binary container and check the JSON header fields
//! 2. parse and validate the document
//! 3. materialize buffers from the BIN chunk, data URIs or the resolver
//! 4. check every accessor against its buffer view
//! 5. decode images
//! 6. build meshes, materials, skins, lights, animations and the node graph

use std::path::Path;

use cgmath::Matrix4;
use gltf::{animation::util::ReadOutputs, mesh::Mode};

use super::{
    accessor,
    container::{self, Container},
    image::{decode_data_uri, decode_image, ImageData},
    resolver::{FileResolver, ResourceResolver},
};
use crate::{
    animation::{AnimationClip, AnimationSampler, Channel, Interpolation, TargetPath},
    error::{Result, ViewerError},
    gfx::{
        resources::material::{AlphaMode, Material, TextureRef, UvTransform},
        scene::{
            graph::{LocalTransform, NodeDesc, SceneGraph},
            light::{LightKind, PunctualLight},
            mesh::{AttributeFlags, Mesh, MorphTarget, Primitive, Topology},
            scene::{SamplerDesc, Scene, SceneRoots, TextureDesc},
            skin::Skin,
            vertex::{compute_normals, Vertex},
        },
    },
    math::{quat_from_xyzw, Trs},
};

/// Extensions that may appear in `extensionsRequired`
pub const SUPPORTED_REQUIRED_EXTENSIONS: &[&str] = &[
    "KHR_materials_emissive_strength",
    "KHR_materials_unlit",
    "KHR_lights_punctual",
    "KHR_texture_transform",
];

/// Parses a `.gltf` or `.glb` asset into a scene
///
/// External buffers and images are fetched through `resolver`.
pub fn load_scene(bytes: &[u8], resolver: &dyn ResourceResolver) -> Result<Scene> {
    let container = container::split(bytes)?;
    check_header(&container.json)?;

    let root = gltf::json::Root::from_slice(&container.json)
        .map_err(|e| ViewerError::MalformedJson(e.to_string()))?;
    let document = gltf::Document::from_json(root)
        .map_err(|e| ViewerError::MalformedJson(e.to_string()))?;

    let buffers = load_buffers(&document, &container, resolver)?;
    accessor::validate_all(&document, &buffers)?;
    let (images, image_map) = load_images(&document, &buffers, resolver)?;

    let loader = Loader {
        document: &document,
        buffers: &buffers,
    };
    let scene = loader.build(images, &image_map)?;

    let stats = scene.stats();
    log::info!(
        "Loaded {} asset: {} nodes, {} meshes, {} materials, {} lights, {} animations, {} buffer bytes",
        if container.is_binary { "GLB" } else { "glTF" },
        stats.nodes,
        stats.meshes,
        stats.materials,
        stats.lights,
        stats.animations,
        buffers.iter().map(Vec::len).sum::<usize>()
    );
    Ok(scene)
}

/// Reads a file and loads it with a resolver rooted at its directory
pub fn load_scene_from_path(path: &Path) -> Result<Scene> {
    let bytes = std::fs::read(path)
        .map_err(|e| ViewerError::MissingResource(format!("{}: {}", path.display(), e)))?;
    load_scene(&bytes, &FileResolver::for_file(path))
}

/// Checks `asset.version` and `extensionsRequired` before full parsing
///
/// A document that is not a JSON object is malformed; a version other than
/// 2.x is unsupported; a required extension outside
/// [`SUPPORTED_REQUIRED_EXTENSIONS`] fails the load.
fn check_header(json: &[u8]) -> Result<()> {
    let value: serde_json::Value =
        serde_json::from_slice(json).map_err(|e| ViewerError::MalformedJson(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| ViewerError::MalformedJson("top level is not an object".to_string()))?;

    let version = object
        .get("asset")
        .and_then(|a| a.get("version"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| ViewerError::MalformedJson("asset.version is missing".to_string()))?;
    if major_version(version) != Some(2) {
        return Err(ViewerError::UnsupportedVersion(version.to_string()));
    }
    if let Some(min) = object
        .get("asset")
        .and_then(|a| a.get("minVersion"))
        .and_then(|v| v.as_str())
    {
        if major_version(min).map_or(true, |m| m > 2) {
            return Err(ViewerError::UnsupportedVersion(format!("minVersion {}", min)));
        }
    }

    if let Some(required) = object.get("extensionsRequired").and_then(|e| e.as_array()) {
        for name in required.iter().filter_map(|n| n.as_str()) {
            if !SUPPORTED_REQUIRED_EXTENSIONS.contains(&name) {
                return Err(ViewerError::UnsupportedRequiredExtension(name.to_string()));
            }
        }
    }
    if let Some(used) = object.get("extensionsUsed").and_then(|e| e.as_array()) {
        for name in used.iter().filter_map(|n| n.as_str()) {
            if !SUPPORTED_REQUIRED_EXTENSIONS.contains(&name) {
                log::warn!("Extension {} is used but not supported; it is ignored", name);
            }
        }
    }
    Ok(())
}

fn major_version(version: &str) -> Option<u32> {
    version.split('.').next()?.trim().parse().ok()
}

/// Fetches a URI as a data URI or through the resolver
fn fetch(uri: &str, resolver: &dyn ResourceResolver) -> Result<Vec<u8>> {
    match decode_data_uri(uri) {
        Some(decoded) => decoded,
        None => resolver
            .resolve(uri)
            .ok_or_else(|| ViewerError::MissingResource(uri.to_string())),
    }
}

fn load_buffers(
    document: &gltf::Document,
    container: &Container<'_>,
    resolver: &dyn ResourceResolver,
) -> Result<Vec<Vec<u8>>> {
    let mut buffers = Vec::with_capacity(document.buffers().len());
    for buffer in document.buffers() {
        let data = match buffer.source() {
            gltf::buffer::Source::Bin => {
                let bin = container
                    .bin
                    .as_deref()
                    .ok_or_else(|| ViewerError::MissingResource("GLB BIN chunk".to_string()))?;
                if bin.len() < buffer.length() {
                    return Err(ViewerError::MalformedContainer(format!(
                        "BIN chunk holds {} bytes, buffer {} declares {}",
                        bin.len(),
                        buffer.index(),
                        buffer.length()
                    )));
                }
                bin.to_vec()
            }
            gltf::buffer::Source::Uri(uri) => {
                let data = fetch(uri, resolver)?;
                if data.len() < buffer.length() {
                    return Err(ViewerError::MissingResource(format!(
                        "{} holds {} bytes, buffer {} declares {}",
                        uri,
                        data.len(),
                        buffer.index(),
                        buffer.length()
                    )));
                }
                data
            }
        };
        buffers.push(data);
    }
    Ok(buffers)
}

/// Decodes every image; returns the decoded list and a map from glTF image
/// index to list index (`None` for unsupported encodings)
fn load_images(
    document: &gltf::Document,
    buffers: &[Vec<u8>],
    resolver: &dyn ResourceResolver,
) -> Result<(Vec<ImageData>, Vec<Option<usize>>)> {
    let mut images = Vec::new();
    let mut map = Vec::with_capacity(document.images().len());

    for image in document.images() {
        let label = image
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("image {}", image.index()));

        let (bytes, mime_type) = match image.source() {
            gltf::image::Source::View { view, mime_type } => {
                let start = view.offset();
                let end = start + view.length();
                let bytes = buffers
                    .get(view.buffer().index())
                    .and_then(|b| b.get(start..end))
                    .ok_or_else(|| ViewerError::MissingResource(format!("{}: buffer view out of range", label)))?;
                (bytes.to_vec(), Some(mime_type))
            }
            gltf::image::Source::Uri { uri, mime_type } => (fetch(uri, resolver)?, mime_type),
        };

        match decode_image(&bytes, mime_type, &label)? {
            Some(decoded) => {
                map.push(Some(images.len()));
                images.push(decoded);
            }
            None => map.push(None),
        }
    }
    Ok((images, map))
}

struct Loader<'a> {
    document: &'a gltf::Document,
    buffers: &'a [Vec<u8>],
}

impl<'a> Loader<'a> {
    fn buffer(&self, buffer: gltf::Buffer<'_>) -> Option<&'a [u8]> {
        self.buffers.get(buffer.index()).map(Vec::as_slice)
    }

    fn build(&self, images: Vec<ImageData>, image_map: &[Option<usize>]) -> Result<Scene> {
        let meshes = self
            .document
            .meshes()
            .map(|m| self.mesh(&m))
            .collect::<Result<Vec<_>>>()?;
        let skins = self
            .document
            .skins()
            .map(|s| self.skin(&s))
            .collect::<Result<Vec<_>>>()?;
        let animations = self
            .document
            .animations()
            .map(|a| self.animation(&a))
            .collect::<Result<Vec<_>>>()?;

        let nodes = self.document.nodes().map(|n| node_desc(&n)).collect();
        let graph = SceneGraph::from_nodes(nodes)?;
        check_skinned_nodes(&graph, &meshes, &skins)?;

        let mut scene = Scene::new(graph).with_animations(animations);
        scene.meshes = meshes;
        scene.skins = skins;
        scene.lights = self
            .document
            .lights()
            .map(|lights| lights.map(|l| light(&l)).collect())
            .unwrap_or_default();
        scene.materials = self.document.materials().map(|m| material(&m)).collect();
        scene.samplers = self.document.samplers().map(|s| sampler_desc(&s)).collect();
        scene.textures = self
            .document
            .textures()
            .map(|t| TextureDesc {
                name: t.name().map(str::to_string),
                image: image_map.get(t.source().index()).copied().flatten(),
                sampler: t.sampler().index(),
            })
            .collect();
        scene.images = images;
        scene.scenes = self
            .document
            .scenes()
            .map(|s| SceneRoots {
                name: s.name().map(str::to_string),
                nodes: s.nodes().map(|n| n.index()).collect(),
            })
            .collect();
        scene.select_initial_scene(self.document.default_scene().map(|s| s.index()));
        Ok(scene)
    }

    fn mesh(&self, mesh: &gltf::Mesh<'_>) -> Result<Mesh> {
        let mut primitives = Vec::new();
        for primitive in mesh.primitives() {
            accessor::validate_primitive(&primitive)?;
            if let Some(p) = self.primitive(&primitive)? {
                primitives.push(p);
            }
        }

        let target_count = primitives
            .iter()
            .map(Primitive::morph_target_count)
            .max()
            .unwrap_or(0);
        let weights = match mesh.weights() {
            Some(w) => w.to_vec(),
            None => vec![0.0; target_count],
        };

        Ok(Mesh {
            name: mesh.name().map(str::to_string),
            primitives,
            weights,
        })
    }

    fn primitive(&self, primitive: &gltf::Primitive<'_>) -> Result<Option<Primitive>> {
        let reader = primitive.reader(|b| self.buffer(b));
        let Some(positions) = reader.read_positions() else {
            log::warn!("Skipping primitive {} without POSITION", primitive.index());
            return Ok(None);
        };
        let positions: Vec<[f32; 3]> = positions.collect();
        let vertex_count = positions.len();

        let mut indices: Option<Vec<u32>> = reader.read_indices().map(|i| i.into_u32().collect());
        if let (Some(indices), Some(accessor)) = (&indices, primitive.indices()) {
            if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(ViewerError::accessor(
                    accessor.index(),
                    format!("index {} exceeds vertex count {}", bad, vertex_count),
                ));
            }
        }

        let topology = match primitive.mode() {
            Mode::Points => Topology::Points,
            Mode::Lines => Topology::Lines,
            Mode::LineStrip => Topology::LineStrip,
            Mode::Triangles => Topology::Triangles,
            Mode::TriangleStrip => Topology::TriangleStrip,
            Mode::LineLoop => {
                let source = indices.take().unwrap_or_else(|| (0..vertex_count as u32).collect());
                indices = Some(line_loop_to_lines(&source));
                Topology::Lines
            }
            Mode::TriangleFan => {
                let source = indices.take().unwrap_or_else(|| (0..vertex_count as u32).collect());
                indices = Some(triangle_fan_to_list(&source));
                Topology::Triangles
            }
        };

        let mut attributes = AttributeFlags::default();
        let mut vertices: Vec<Vertex> = positions
            .iter()
            .map(|&position| Vertex {
                position,
                ..Vertex::default()
            })
            .collect();

        if let Some(normals) = reader.read_normals() {
            attributes.normals = true;
            for (v, n) in vertices.iter_mut().zip(normals) {
                v.normal = n;
            }
        } else if topology == Topology::Triangles {
            let list = indices
                .clone()
                .unwrap_or_else(|| (0..vertex_count as u32).collect());
            for (v, n) in vertices.iter_mut().zip(compute_normals(&positions, &list)) {
                v.normal = n;
            }
        }
        if let Some(tangents) = reader.read_tangents() {
            attributes.tangents = true;
            for (v, t) in vertices.iter_mut().zip(tangents) {
                v.tangent = t;
            }
        }
        if let Some(uvs) = reader.read_tex_coords(0) {
            attributes.uv0 = true;
            for (v, uv) in vertices.iter_mut().zip(uvs.into_f32()) {
                v.uv0 = uv;
            }
        }
        if let Some(uvs) = reader.read_tex_coords(1) {
            attributes.uv1 = true;
            for (v, uv) in vertices.iter_mut().zip(uvs.into_f32()) {
                v.uv1 = uv;
            }
        }
        if let Some(colors) = reader.read_colors(0) {
            attributes.colors = true;
            for (v, c) in vertices.iter_mut().zip(colors.into_rgba_f32()) {
                v.color = c;
            }
        }
        if let (Some(joints), Some(weights)) = (reader.read_joints(0), reader.read_weights(0)) {
            attributes.skinning = true;
            for ((v, j), w) in vertices.iter_mut().zip(joints.into_u16()).zip(weights.into_f32()) {
                v.joints = j.map(u32::from);
                v.weights = w;
            }
        }

        let morph_targets = reader
            .read_morph_targets()
            .map(|(positions, normals, tangents)| MorphTarget {
                positions: positions.map(Iterator::collect).unwrap_or_default(),
                normals: normals.map(Iterator::collect).unwrap_or_default(),
                tangents: tangents.map(Iterator::collect).unwrap_or_default(),
            })
            .collect();

        Ok(Some(Primitive::new(
            vertices,
            indices,
            primitive.material().index(),
            topology,
            morph_targets,
            attributes,
        )))
    }

    fn skin(&self, skin: &gltf::Skin<'_>) -> Result<Skin> {
        let joints: Vec<usize> = skin.joints().map(|j| j.index()).collect();
        let reader = skin.reader(|b| self.buffer(b));

        let inverse_bind_matrices: Vec<Matrix4<f32>> = match reader.read_inverse_bind_matrices() {
            Some(matrices) => matrices.map(Matrix4::from).collect(),
            None => vec![Matrix4::from_scale(1.0); joints.len()],
        };
        if inverse_bind_matrices.len() != joints.len() {
            let index = skin.inverse_bind_matrices().map_or(0, |a| a.index());
            return Err(ViewerError::accessor(
                index,
                format!(
                    "skin {} has {} joints but {} inverse bind matrices",
                    skin.index(),
                    joints.len(),
                    inverse_bind_matrices.len()
                ),
            ));
        }

        Ok(Skin {
            name: skin.name().map(str::to_string),
            joints,
            inverse_bind_matrices,
            skeleton: skin.skeleton().map(|n| n.index()),
        })
    }

    fn animation(&self, animation: &gltf::Animation<'_>) -> Result<AnimationClip> {
        let name = animation
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("animation_{}", animation.index()));

        let mut samplers: Vec<AnimationSampler> = animation
            .samplers()
            .map(|s| {
                let input = gltf::accessor::Iter::<f32>::new(s.input(), |b: gltf::Buffer<'_>| self.buffer(b))
                    .map(Iterator::collect)
                    .unwrap_or_default();
                AnimationSampler {
                    input,
                    output: Vec::new(),
                    interpolation: match s.interpolation() {
                        gltf::animation::Interpolation::Step => Interpolation::Step,
                        gltf::animation::Interpolation::Linear => Interpolation::Linear,
                        gltf::animation::Interpolation::CubicSpline => Interpolation::CubicSpline,
                    },
                    components: 0,
                }
            })
            .collect();

        for (sampler, desc) in samplers.iter().zip(animation.samplers()) {
            if sampler.input.iter().any(|t| !t.is_finite()) {
                return Err(ViewerError::accessor(
                    desc.input().index(),
                    format!("animation '{}' has non-finite keyframe times", name),
                ));
            }
            if sampler.input.windows(2).any(|w| w[1] < w[0]) {
                return Err(ViewerError::accessor(
                    desc.input().index(),
                    format!("animation '{}' has decreasing keyframe times", name),
                ));
            }
        }

        let mut channels = Vec::new();
        for channel in animation.channels() {
            let reader = channel.reader(|b| self.buffer(b));
            let index = channel.sampler().index();
            let (path, output, components): (TargetPath, Vec<f32>, usize) = match reader.read_outputs() {
                Some(ReadOutputs::Translations(it)) => (TargetPath::Translation, it.flatten().collect(), 3),
                Some(ReadOutputs::Rotations(it)) => (TargetPath::Rotation, it.into_f32().flatten().collect(), 4),
                Some(ReadOutputs::Scales(it)) => (TargetPath::Scale, it.flatten().collect(), 3),
                Some(ReadOutputs::MorphTargetWeights(it)) => (TargetPath::Weights, it.into_f32().collect(), 0),
                None => continue,
            };

            let sampler = &mut samplers[index];
            let per_key = match sampler.interpolation {
                Interpolation::CubicSpline => 3,
                _ => 1,
            };
            let keys = sampler.input.len();
            let components = if path == TargetPath::Weights {
                if keys == 0 {
                    0
                } else {
                    output.len() / (keys * per_key)
                }
            } else {
                components
            };
            if output.len() != keys * per_key * components || (keys > 0 && components == 0) {
                return Err(ViewerError::accessor(
                    channel.sampler().output().index(),
                    format!(
                        "animation '{}' sampler {} has {} output values for {} keyframes",
                        name,
                        index,
                        output.len(),
                        keys
                    ),
                ));
            }

            sampler.output = output;
            sampler.components = components;
            channels.push(Channel {
                node: channel.target().node().index(),
                path,
                sampler: index,
            });
        }

        Ok(AnimationClip::new(name, channels, samplers))
    }
}

fn node_desc(node: &gltf::Node<'_>) -> NodeDesc {
    let local = match node.transform() {
        gltf::scene::Transform::Matrix { matrix } => LocalTransform::Matrix(Matrix4::from(matrix)),
        gltf::scene::Transform::Decomposed {
            translation,
            rotation,
            scale,
        } => LocalTransform::Trs(Trs {
            translation: translation.into(),
            rotation: quat_from_xyzw(rotation),
            scale: scale.into(),
        }),
    };

    NodeDesc {
        name: node.name().map(str::to_string),
        children: node.children().map(|c| c.index()).collect(),
        local,
        mesh: node.mesh().map(|m| m.index()),
        skin: node.skin().map(|s| s.index()),
        light: node.light().map(|l| l.index()),
        weights: node.weights().map(<[f32]>::to_vec),
    }
}

/// Every joint index of a skinned node's vertices must address its skin
fn check_skinned_nodes(graph: &SceneGraph, meshes: &[Mesh], skins: &[Skin]) -> Result<()> {
    for node in graph.iter_parent_first() {
        let (Some(mesh), Some(skin)) = (graph.mesh(node), graph.skin(node)) else {
            continue;
        };
        let (Some(mesh), Some(skin)) = (meshes.get(mesh), skins.get(skin)) else {
            continue;
        };
        let joint_count = skin.joints.len() as u32;
        for primitive in mesh.primitives.iter().filter(|p| p.is_skinned()) {
            let out_of_range = primitive
                .vertices
                .iter()
                .flat_map(|v| v.joints.iter().zip(v.weights))
                .any(|(&j, w)| w > 0.0 && j >= joint_count);
            if out_of_range {
                return Err(ViewerError::MalformedJson(format!(
                    "node {} references joints beyond its skin's {} joints",
                    node, joint_count
                )));
            }
        }
    }
    Ok(())
}

fn light(light: &gltf::khr_lights_punctual::Light<'_>) -> PunctualLight {
    use gltf::khr_lights_punctual::Kind;

    let kind = match light.kind() {
        Kind::Directional => LightKind::Directional,
        Kind::Point => LightKind::Point,
        Kind::Spot {
            inner_cone_angle,
            outer_cone_angle,
        } => LightKind::Spot {
            inner_cone_angle,
            outer_cone_angle,
        },
    };
    PunctualLight {
        name: light.name().map(str::to_string),
        kind,
        color: light.color(),
        intensity: light.intensity(),
        // Range is ignored for directional lights
        range: match kind {
            LightKind::Directional => None,
            _ => light.range().filter(|r| *r > 0.0),
        },
    }
}

/// Applies a `KHR_texture_transform`, whose `texCoord` overrides the slot's
fn transformed(
    texture: usize,
    tex_coord: u32,
    transform: Option<(UvTransform, Option<u32>)>,
) -> TextureRef {
    let mut reference = TextureRef::new(texture, tex_coord);
    if let Some((transform, tex_coord)) = transform {
        reference.tex_coord = tex_coord.unwrap_or(reference.tex_coord);
        reference.transform = Some(transform);
    }
    reference
}

fn texture_ref(info: gltf::texture::Info<'_>) -> TextureRef {
    let transform = info.texture_transform().map(|t| {
        let transform = UvTransform {
            offset: t.offset(),
            rotation: t.rotation(),
            scale: t.scale(),
        };
        (transform, t.tex_coord())
    });
    transformed(info.texture().index(), info.tex_coord(), transform)
}

/// Normal and occlusion infos only expose the extension as raw JSON
fn extension_transform(value: Option<&serde_json::Value>) -> Option<(UvTransform, Option<u32>)> {
    use gltf::json::extensions::texture::TextureTransform;

    let t = match serde_json::from_value::<TextureTransform>(value?.clone()) {
        Ok(t) => t,
        Err(e) => {
            log::warn!("Ignoring malformed KHR_texture_transform: {}", e);
            return None;
        }
    };
    let transform = UvTransform {
        offset: t.offset.0,
        rotation: t.rotation.0,
        scale: t.scale.0,
    };
    Some((transform, t.tex_coord))
}

fn material(material: &gltf::Material<'_>) -> Material {
    let pbr = material.pbr_metallic_roughness();

    let mut m = Material::default();
    m.name = material.name().map(str::to_string);
    m.base_color_factor = pbr.base_color_factor();
    m.base_color_texture = pbr.base_color_texture().map(texture_ref);
    m.metallic_factor = pbr.metallic_factor();
    m.roughness_factor = pbr.roughness_factor();
    m.metallic_roughness_texture = pbr.metallic_roughness_texture().map(texture_ref);
    if let Some(normal) = material.normal_texture() {
        m.normal_scale = normal.scale();
        m.normal_texture = Some(transformed(
            normal.texture().index(),
            normal.tex_coord(),
            extension_transform(normal.extension_value("KHR_texture_transform")),
        ));
    }
    if let Some(occlusion) = material.occlusion_texture() {
        m.occlusion_strength = occlusion.strength();
        m.occlusion_texture = Some(transformed(
            occlusion.texture().index(),
            occlusion.tex_coord(),
            extension_transform(occlusion.extension_value("KHR_texture_transform")),
        ));
    }
    m.emissive_factor = material.emissive_factor();
    m.emissive_texture = material.emissive_texture().map(texture_ref);
    m.emissive_strength = material.emissive_strength().unwrap_or(1.0);
    m.alpha_mode = match material.alpha_mode() {
        gltf::material::AlphaMode::Opaque => AlphaMode::Opaque,
        gltf::material::AlphaMode::Mask => AlphaMode::Mask,
        gltf::material::AlphaMode::Blend => AlphaMode::Blend,
    };
    m.alpha_cutoff = material.alpha_cutoff().unwrap_or(0.5);
    m.double_sided = material.double_sided();
    m.unlit = material.unlit();
    m
}

fn sampler_desc(sampler: &gltf::texture::Sampler<'_>) -> SamplerDesc {
    use gltf::texture::{MagFilter, MinFilter, WrappingMode};

    let wrap = |mode: WrappingMode| match mode {
        WrappingMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        WrappingMode::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
        WrappingMode::Repeat => wgpu::AddressMode::Repeat,
    };
    let (min_filter, mipmap_filter) = match sampler.min_filter() {
        Some(MinFilter::Nearest) | Some(MinFilter::NearestMipmapNearest) => {
            (wgpu::FilterMode::Nearest, wgpu::FilterMode::Nearest)
        }
        Some(MinFilter::NearestMipmapLinear) => (wgpu::FilterMode::Nearest, wgpu::FilterMode::Linear),
        Some(MinFilter::LinearMipmapNearest) => (wgpu::FilterMode::Linear, wgpu::FilterMode::Nearest),
        Some(MinFilter::Linear) | Some(MinFilter::LinearMipmapLinear) | None => {
            (wgpu::FilterMode::Linear, wgpu::FilterMode::Linear)
        }
    };

    SamplerDesc {
        mag_filter: match sampler.mag_filter() {
            Some(MagFilter::Nearest) => wgpu::FilterMode::Nearest,
            _ => wgpu::FilterMode::Linear,
        },
        min_filter,
        mipmap_filter,
        address_mode_u: wrap(sampler.wrap_s()),
        address_mode_v: wrap(sampler.wrap_t()),
    }
}

fn line_loop_to_lines(indices: &[u32]) -> Vec<u32> {
    if indices.len() < 2 {
        return Vec::new();
    }
    let mut lines = Vec::with_capacity(indices.len() * 2);
    for pair in indices.windows(2) {
        lines.extend_from_slice(pair);
    }
    lines.push(indices[indices.len() - 1]);
    lines.push(indices[0]);
    lines
}

fn triangle_fan_to_list(indices: &[u32]) -> Vec<u32> {
    if indices.len() < 3 {
        return Vec::new();
    }
    let mut triangles = Vec::with_capacity((indices.len() - 2) * 3);
    for pair in indices[1..].windows(2) {
        triangles.extend_from_slice(&[indices[0], pair[0], pair[1]]);
    }
    triangles
}
