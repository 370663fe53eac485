//! Post-processing applied to freshly parsed meshes.
//!
//! Importers call [`run`] before handing a scene out. Every step only
//! fills in what the file did not provide: existing normals and tangents
//! are kept as they are.

use std::collections::HashMap;

use cgmath::{InnerSpace, Vector2, Vector3, Zero};

use crate::{
    data_structures::mesh::Topology,
    error::ImportError,
    importer::{ImportOptions, ImportedMesh, ImportedScene},
};

const EPSILON: f32 = 1e-12;

/// Validates every mesh and applies the steps enabled in `options`.
pub fn run(scene: &mut ImportedScene, options: &ImportOptions) -> Result<(), ImportError> {
    for (index, mesh) in scene.meshes.iter_mut().enumerate() {
        validate(index, mesh)?;
        if options.triangulate {
            triangulate(mesh);
        }
        if options.generate_normals && mesh.normals.len() != mesh.positions.len() {
            generate_normals(mesh);
        }
        if options.tangent_space && mesh.tangents.len() != mesh.positions.len() {
            generate_tangents(mesh);
        }
        if options.adjacency {
            if mesh.topology == Topology::TriangleList {
                let triangles = vertex_indices(mesh);
                mesh.indices = Some(adjacency_indices(&triangles));
                mesh.topology = Topology::TriangleListAdjacency;
            } else {
                log::debug!(
                    "Mesh '{}' is {:?}, no adjacency generated",
                    mesh.name,
                    mesh.topology
                );
            }
        }
    }
    Ok(())
}

fn validate(index: usize, mesh: &ImportedMesh) -> Result<(), ImportError> {
    let count = mesh.positions.len();
    let invalid = |reason: String| ImportError::InvalidMesh {
        mesh: index,
        reason,
    };
    if count == 0 {
        return Err(invalid("no vertex positions".to_string()));
    }
    if count > u32::MAX as usize {
        return Err(invalid(format!("{count} vertices exceed the 32-bit index range")));
    }
    let streams = [
        ("normals", mesh.normals.len()),
        ("texture coordinates", mesh.tex_coords.len()),
        ("tangents", mesh.tangents.len()),
        ("bitangents", mesh.bitangents.len()),
    ];
    for (name, len) in streams {
        if len != 0 && len != count {
            return Err(invalid(format!("{len} {name} for {count} positions")));
        }
    }
    if let Some(indices) = &mesh.indices {
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= count) {
            return Err(invalid(format!("index {bad} out of range for {count} vertices")));
        }
    }
    let elements = mesh.indices.as_ref().map_or(count, Vec::len);
    let stride = match mesh.topology {
        Topology::LineList => 2,
        Topology::TriangleList => 3,
        Topology::TriangleListAdjacency => 6,
        _ => 1,
    };
    if elements % stride != 0 {
        return Err(invalid(format!(
            "{elements} elements do not form whole {:?} primitives",
            mesh.topology
        )));
    }
    Ok(())
}

/// Explicit indices, or `0..n` for non-indexed meshes.
fn vertex_indices(mesh: &ImportedMesh) -> Vec<u32> {
    match &mesh.indices {
        Some(indices) => indices.clone(),
        None => (0..mesh.positions.len() as u32).collect(),
    }
}

/// Rewrites strips and fans as triangle lists. Other topologies are left
/// untouched.
pub fn triangulate(mesh: &mut ImportedMesh) {
    let list = match mesh.topology {
        Topology::TriangleStrip => strip_to_list(&vertex_indices(mesh)),
        Topology::TriangleFan => fan_to_list(&vertex_indices(mesh)),
        _ => return,
    };
    mesh.indices = Some(list);
    mesh.topology = Topology::TriangleList;
}

/// Every other strip triangle is flipped to keep a consistent winding.
pub fn strip_to_list(strip: &[u32]) -> Vec<u32> {
    let mut list = Vec::with_capacity(strip.len().saturating_sub(2) * 3);
    for (i, window) in strip.windows(3).enumerate() {
        if i % 2 == 0 {
            list.extend_from_slice(&[window[0], window[1], window[2]]);
        } else {
            list.extend_from_slice(&[window[1], window[0], window[2]]);
        }
    }
    list
}

pub fn fan_to_list(fan: &[u32]) -> Vec<u32> {
    let Some((&hub, rim)) = fan.split_first() else {
        return Vec::new();
    };
    rim.windows(2)
        .flat_map(|edge| [hub, edge[0], edge[1]])
        .collect()
}

/// Smooth, area weighted vertex normals. Vertices that touch no triangle
/// get `+Z`.
pub fn generate_normals(mesh: &mut ImportedMesh) {
    let mut normals = vec![Vector3::<f32>::zero(); mesh.positions.len()];
    if mesh.topology == Topology::TriangleList {
        for c in vertex_indices(mesh).chunks_exact(3) {
            let p0: Vector3<f32> = mesh.positions[c[0] as usize].into();
            let p1: Vector3<f32> = mesh.positions[c[1] as usize].into();
            let p2: Vector3<f32> = mesh.positions[c[2] as usize].into();
            // Not normalized, larger triangles weigh more.
            let face = (p1 - p0).cross(p2 - p0);
            for &i in c {
                normals[i as usize] += face;
            }
        }
    }
    mesh.normals = normals
        .into_iter()
        .map(|n| {
            if n.magnitude2() > EPSILON {
                n.normalize().into()
            } else {
                [0.0, 0.0, 1.0]
            }
        })
        .collect();
}

/// Per-vertex tangents and bitangents averaged over incident triangles.
///
/// Meshes without texture coordinates, and vertices whose triangles have
/// degenerate UVs, get an arbitrary frame perpendicular to the normal.
pub fn generate_tangents(mesh: &mut ImportedMesh) {
    let count = mesh.positions.len();
    let mut tangents = vec![Vector3::<f32>::zero(); count];
    let mut bitangents = vec![Vector3::<f32>::zero(); count];
    let mut triangles_included = vec![0u32; count];

    if mesh.topology == Topology::TriangleList && mesh.tex_coords.len() == count {
        for c in vertex_indices(mesh).chunks_exact(3) {
            let pos0: Vector3<f32> = mesh.positions[c[0] as usize].into();
            let pos1: Vector3<f32> = mesh.positions[c[1] as usize].into();
            let pos2: Vector3<f32> = mesh.positions[c[2] as usize].into();

            let uv0: Vector2<f32> = mesh.tex_coords[c[0] as usize].into();
            let uv1: Vector2<f32> = mesh.tex_coords[c[1] as usize].into();
            let uv2: Vector2<f32> = mesh.tex_coords[c[2] as usize].into();

            let delta_pos1 = pos1 - pos0;
            let delta_pos2 = pos2 - pos0;
            let delta_uv1 = uv1 - uv0;
            let delta_uv2 = uv2 - uv0;

            // Solves
            //     delta_pos1 = delta_uv1.x * T + delta_uv1.y * B
            //     delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
            let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
            if det.abs() < EPSILON {
                continue;
            }
            let r = 1.0 / det;
            let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
            // Flipped for right-handed normal maps with wgpu's texture origin.
            let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * -r;

            for &i in c {
                tangents[i as usize] += tangent;
                bitangents[i as usize] += bitangent;
                triangles_included[i as usize] += 1;
            }
        }
    }

    for i in 0..count {
        let normal: Vector3<f32> = mesh
            .normals
            .get(i)
            .copied()
            .unwrap_or([0.0, 0.0, 1.0])
            .into();
        let n = triangles_included[i];
        let averaged = (n > 0).then(|| (tangents[i] / n as f32, bitangents[i] / n as f32));
        let (tangent, bitangent) = match averaged {
            Some((t, b)) if t.magnitude2() > EPSILON && b.magnitude2() > EPSILON => (t, b),
            _ => arbitrary_frame(normal),
        };
        tangents[i] = tangent;
        bitangents[i] = bitangent;
    }

    mesh.tangents = tangents.into_iter().map(Into::into).collect();
    mesh.bitangents = bitangents.into_iter().map(Into::into).collect();
}

fn arbitrary_frame(normal: Vector3<f32>) -> (Vector3<f32>, Vector3<f32>) {
    let normal = if normal.magnitude2() > EPSILON {
        normal.normalize()
    } else {
        Vector3::unit_z()
    };
    let up = if normal.y.abs() < 0.999 {
        Vector3::unit_y()
    } else {
        Vector3::unit_x()
    };
    let tangent = up.cross(normal).normalize();
    (tangent, normal.cross(tangent))
}

/// Half-edge of the adjacency arena. Links are indices into the arena.
struct HalfEdge {
    origin: u32,
    next: usize,
    twin: Option<usize>,
}

/// Builds `v0, a01, v1, a12, v2, a20` for every triangle of a triangle
/// list, where `aXY` is the vertex opposite edge `XY` in the neighbouring
/// triangle. Boundary edges use the triangle's own opposite vertex.
pub fn adjacency_indices(triangles: &[u32]) -> Vec<u32> {
    let triangle_count = triangles.len() / 3;
    let mut edges = Vec::with_capacity(triangle_count * 3);
    let mut by_vertices: HashMap<(u32, u32), usize> = HashMap::with_capacity(triangle_count * 3);

    for (t, tri) in triangles.chunks_exact(3).enumerate() {
        for k in 0..3 {
            let index = 3 * t + k;
            edges.push(HalfEdge {
                origin: tri[k],
                next: 3 * t + (k + 1) % 3,
                twin: None,
            });
            // Non-manifold edges keep their first owner.
            by_vertices.entry((tri[k], tri[(k + 1) % 3])).or_insert(index);
        }
    }
    for index in 0..edges.len() {
        let from = edges[index].origin;
        let to = edges[edges[index].next].origin;
        edges[index].twin = by_vertices.get(&(to, from)).copied();
    }

    let opposite = |edge: usize| {
        let start = edges[edge].twin.unwrap_or(edge);
        edges[edges[edges[start].next].next].origin
    };
    let mut adjacency = Vec::with_capacity(triangle_count * 6);
    for edge in 0..edges.len() {
        adjacency.push(edges[edge].origin);
        adjacency.push(opposite(edge));
    }
    adjacency
}
