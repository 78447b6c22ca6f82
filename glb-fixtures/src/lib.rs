//! Builds binary glTF files for tests: packed positions and `u32` indices in
//! one buffer, meshes with a single triangle primitive, and a node tree.

use std::collections::BTreeMap;

use gltf_json as json;
use gltf_json::validation::Checked::Valid;

const GLB_MAGIC: &[u8; 4] = b"glTF";
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

/// Transform and contents of one scene node.
#[derive(Clone, Debug, Default)]
pub struct NodeSpec {
    pub mesh: Option<u32>,
    pub translation: Option<[f32; 3]>,
    pub scale: Option<[f32; 3]>,
    pub children: Vec<u32>,
}

#[derive(Default)]
pub struct GlbBuilder {
    buffer: Vec<u8>,
    views: Vec<json::buffer::View>,
    accessors: Vec<json::Accessor>,
    meshes: Vec<json::Mesh>,
    nodes: Vec<json::Node>,
    roots: Vec<u32>,
}

impl GlbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_view(&mut self, offset: usize, target: json::buffer::Target) -> json::Index<json::buffer::View> {
        self.views.push(json::buffer::View {
            buffer: json::Index::new(0),
            byte_length: (self.buffer.len() - offset).into(),
            byte_offset: Some((offset as u64).into()),
            byte_stride: None,
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            target: Some(Valid(target)),
        });
        json::Index::new(self.views.len() as u32 - 1)
    }

    fn push_accessor(&mut self, accessor: json::Accessor) -> json::Index<json::Accessor> {
        self.accessors.push(accessor);
        json::Index::new(self.accessors.len() as u32 - 1)
    }

    fn pack_positions(&mut self, positions: &[[f32; 3]]) -> json::Index<json::Accessor> {
        let offset = self.buffer.len();
        for p in positions {
            for c in p {
                self.buffer.extend_from_slice(&c.to_le_bytes());
            }
        }
        let view = self.push_view(offset, json::buffer::Target::ArrayBuffer);

        let (min, max) = bounds(positions);
        self.push_accessor(json::Accessor {
            buffer_view: Some(view),
            byte_offset: Some(0u64.into()),
            count: positions.len().into(),
            component_type: Valid(json::accessor::GenericComponentType(
                json::accessor::ComponentType::F32,
            )),
            extensions: Default::default(),
            extras: Default::default(),
            type_: Valid(json::accessor::Type::Vec3),
            min: Some(json::Value::Array(min.into_iter().map(json::Value::from).collect())),
            max: Some(json::Value::Array(max.into_iter().map(json::Value::from).collect())),
            name: None,
            normalized: false,
            sparse: None,
        })
    }

    fn pack_indices(&mut self, triangles: &[[u32; 3]]) -> json::Index<json::Accessor> {
        let offset = self.buffer.len();
        for i in triangles.iter().flatten() {
            self.buffer.extend_from_slice(&i.to_le_bytes());
        }
        let view = self.push_view(offset, json::buffer::Target::ElementArrayBuffer);

        self.push_accessor(json::Accessor {
            buffer_view: Some(view),
            byte_offset: Some(0u64.into()),
            count: (triangles.len() * 3).into(),
            component_type: Valid(json::accessor::GenericComponentType(
                json::accessor::ComponentType::U32,
            )),
            extensions: Default::default(),
            extras: Default::default(),
            type_: Valid(json::accessor::Type::Scalar),
            min: None,
            max: None,
            name: None,
            normalized: false,
            sparse: None,
        })
    }

    /// Adds a triangle mesh and returns its index. An empty `triangles`
    /// leaves the primitive non-indexed, so every three positions form one
    /// triangle.
    pub fn mesh(&mut self, positions: &[[f32; 3]], triangles: &[[u32; 3]]) -> u32 {
        let position = self.pack_positions(positions);
        let indices = (!triangles.is_empty()).then(|| self.pack_indices(triangles));

        let mut attributes = BTreeMap::new();
        attributes.insert(Valid(json::mesh::Semantic::Positions), position);
        self.meshes.push(json::Mesh {
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            primitives: vec![json::mesh::Primitive {
                attributes,
                extensions: Default::default(),
                extras: Default::default(),
                indices,
                material: None,
                mode: Valid(json::mesh::Mode::Triangles),
                targets: None,
            }],
            weights: None,
        });
        self.meshes.len() as u32 - 1
    }

    /// Adds a node and returns its index. Children must already exist.
    pub fn node(&mut self, spec: NodeSpec) -> u32 {
        self.nodes.push(json::Node {
            camera: None,
            children: (!spec.children.is_empty())
                .then(|| spec.children.into_iter().map(json::Index::new).collect()),
            extensions: Default::default(),
            extras: Default::default(),
            matrix: None,
            mesh: spec.mesh.map(json::Index::new),
            name: None,
            rotation: None,
            scale: spec.scale,
            translation: spec.translation,
            skin: None,
            weights: None,
        });
        self.nodes.len() as u32 - 1
    }

    /// Lists `node` in the default scene.
    pub fn root(&mut self, node: u32) -> &mut Self {
        self.roots.push(node);
        self
    }

    pub fn build(self) -> serde_json::Result<Vec<u8>> {
        let root = json::Root {
            accessors: self.accessors,
            animations: Vec::new(),
            asset: json::Asset {
                copyright: None,
                extensions: Default::default(),
                extras: Default::default(),
                generator: Some("glb-fixtures".into()),
                min_version: None,
                version: "2.0".into(),
            },
            buffers: vec![json::Buffer {
                byte_length: self.buffer.len().into(),
                extensions: Default::default(),
                extras: Default::default(),
                name: None,
                uri: None,
            }],
            buffer_views: self.views,
            cameras: Vec::new(),
            extensions: Default::default(),
            extensions_required: Vec::new(),
            extensions_used: Vec::new(),
            extras: Default::default(),
            images: Vec::new(),
            materials: Vec::new(),
            meshes: self.meshes,
            nodes: self.nodes,
            samplers: Vec::new(),
            scene: Some(json::Index::new(0)),
            scenes: vec![json::Scene {
                extensions: Default::default(),
                extras: Default::default(),
                name: None,
                nodes: self.roots.into_iter().map(json::Index::new).collect(),
            }],
            skins: Vec::new(),
            textures: Vec::new(),
        };
        let text = json::serialize::to_string(&root)?;
        Ok(assemble(text.into_bytes(), self.buffer))
    }
}

/// One mesh under one root node.
pub fn single_mesh(positions: &[[f32; 3]], triangles: &[[u32; 3]]) -> Vec<u8> {
    let mut b = GlbBuilder::new();
    let mesh = b.mesh(positions, triangles);
    let node = b.node(NodeSpec {
        mesh: Some(mesh),
        ..NodeSpec::default()
    });
    b.root(node);
    match b.build() {
        Ok(bytes) => bytes,
        Err(e) => panic!("glTF JSON serialisation failed: {e}"),
    }
}

fn bounds(positions: &[[f32; 3]]) -> ([f32; 3], [f32; 3]) {
    let mut min = [f32::INFINITY; 3];
    let mut max = [f32::NEG_INFINITY; 3];
    for p in positions {
        for i in 0..3 {
            min[i] = min[i].min(p[i]);
            max[i] = max[i].max(p[i]);
        }
    }
    if positions.is_empty() {
        return ([0.0; 3], [0.0; 3]);
    }
    (min, max)
}

fn pad(bytes: &mut Vec<u8>, fill: u8) {
    while bytes.len() % 4 != 0 {
        bytes.push(fill);
    }
}

fn assemble(mut json: Vec<u8>, mut bin: Vec<u8>) -> Vec<u8> {
    pad(&mut json, b' ');
    pad(&mut bin, 0);
    let total = 12 + 8 + json.len() + 8 + bin.len();

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(GLB_MAGIC);
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&json);
    out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
    out.extend_from_slice(&bin);
    out
}
