//! `.m` mesh encoder.
//!
//! Counts and preconditions are checked in a single pass before any byte is
//! written; the file-level entry points write through a temp file and rename
//! on success, so a failed encode never leaves something a reader would take
//! for a valid mesh.

use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use glam::{Vec2, Vec3};

use crate::endian::{f32_to_disk, u16_to_disk};
use crate::error::MeshError;
use crate::material::write_material_file;
use crate::scene::{MaterialRef, Scene, SceneMesh};

const MAX_COUNT: usize = u16::MAX as usize;

/// Block presence and totals, computed up front.
struct Layout {
    n_vertices: u16,
    n_tris: u16,
    n_submeshes: u16,
    has_normals: bool,
    has_texcoords: bool,
}

fn capacity(field: &'static str, value: usize, max: usize) -> Result<(), MeshError> {
    if value > max {
        return Err(MeshError::Capacity { field, value, max });
    }
    Ok(())
}

/// Single validation pass over the scene's submeshes.
///
/// Attribute presence must be uniform: a stream where only some submeshes
/// carry texcoords has no decodable length (the format stores no presence
/// flags), so mixed scenes are rejected here instead of written.
fn validate(meshes: &[SceneMesh]) -> Result<Layout, MeshError> {
    let has_normals = meshes.first().is_some_and(|m| m.normals.is_some());
    let has_texcoords = meshes.first().is_some_and(|m| m.texcoords.is_some());

    let mut n_vertices = 0usize;
    let mut n_tris = 0usize;

    for (i, m) in meshes.iter().enumerate() {
        if m.normals.is_some() != has_normals {
            return Err(MeshError::MixedAttributes {
                submesh: i,
                attr: "normal",
            });
        }
        if m.texcoords.is_some() != has_texcoords {
            return Err(MeshError::MixedAttributes {
                submesh: i,
                attr: "texcoord",
            });
        }
        if let Some(normals) = &m.normals {
            if normals.len() != m.positions.len() {
                return Err(MeshError::AttributeCount {
                    submesh: i,
                    attr: "normal",
                    got: normals.len(),
                    vertices: m.positions.len(),
                });
            }
        }
        if let Some(texcoords) = &m.texcoords {
            if texcoords.len() != m.positions.len() {
                return Err(MeshError::AttributeCount {
                    submesh: i,
                    attr: "texcoord",
                    got: texcoords.len(),
                    vertices: m.positions.len(),
                });
            }
        }
        for tri in &m.triangles {
            for &index in tri {
                if index as usize >= m.positions.len() {
                    return Err(MeshError::IndexOutOfRange {
                        submesh: i,
                        index,
                        vertices: m.positions.len(),
                    });
                }
            }
        }
        if m.material == MaterialRef::Default {
            return Err(MeshError::DefaultMaterial { submesh: i });
        }

        n_vertices += m.positions.len();
        n_tris += m.triangles.len();
    }

    capacity("vertex", n_vertices, MAX_COUNT)?;
    capacity("triangle", n_tris, MAX_COUNT)?;
    capacity("submesh", meshes.len(), MAX_COUNT)?;

    Ok(Layout {
        n_vertices: n_vertices as u16,
        n_tris: n_tris as u16,
        n_submeshes: meshes.len() as u16,
        has_normals,
        has_texcoords,
    })
}

fn put_u16<W: Write>(out: &mut W, v: u16) -> io::Result<()> {
    out.write_all(&u16_to_disk(v))
}

fn put_vec3<W: Write>(out: &mut W, v: Vec3) -> io::Result<()> {
    out.write_all(&f32_to_disk(v.x))?;
    out.write_all(&f32_to_disk(v.y))?;
    out.write_all(&f32_to_disk(v.z))
}

fn put_vec2<W: Write>(out: &mut W, v: Vec2) -> io::Result<()> {
    out.write_all(&f32_to_disk(v.x))?;
    out.write_all(&f32_to_disk(v.y))
}

/// Serialize the scene's submeshes into a `.m` stream.
///
/// `material_name` is the sidecar file name stored in the header and the
/// name block; the sidecar itself is written separately.
pub fn write_mesh<W: Write>(
    meshes: &[SceneMesh],
    material_name: &str,
    out: &mut W,
) -> Result<(), MeshError> {
    if material_name.as_bytes().contains(&0) {
        return Err(MeshError::BadName("material name"));
    }
    capacity("material name byte", material_name.len() + 1, MAX_COUNT)?;

    let layout = validate(meshes)?;

    log::debug!(
        "writing mesh: {} verts, {} tris, {} submeshes (normals: {}, texcoords: {})",
        layout.n_vertices,
        layout.n_tris,
        layout.n_submeshes,
        layout.has_normals,
        layout.has_texcoords
    );

    // header
    put_u16(out, layout.n_vertices)?;
    put_u16(out, layout.n_tris)?;
    put_u16(out, layout.n_submeshes)?;
    put_u16(out, material_name.len() as u16 + 1)?;

    // NUL-terminated sidecar name
    out.write_all(material_name.as_bytes())?;
    out.write_all(&[0])?;

    // attribute blocks, concatenated in submesh order
    for m in meshes {
        for &v in &m.positions {
            put_vec3(out, v)?;
        }
    }
    if layout.has_normals {
        for m in meshes {
            for &n in m.normals.as_deref().unwrap_or_default() {
                put_vec3(out, n)?;
            }
        }
    }
    if layout.has_texcoords {
        for m in meshes {
            for &t in m.texcoords.as_deref().unwrap_or_default() {
                put_vec2(out, t)?;
            }
        }
    }

    // global index block: local indices rebased by the vertices written so far
    let mut vertex_base = 0u16;
    for m in meshes {
        for tri in &m.triangles {
            for &index in tri {
                put_u16(out, vertex_base + index as u16)?;
            }
        }
        vertex_base += m.positions.len() as u16;
    }

    // descriptor table: (start, count) in triangles, contiguous
    let mut tri_base = 0u16;
    for m in meshes {
        put_u16(out, tri_base)?;
        put_u16(out, m.triangles.len() as u16)?;
        tri_base += m.triangles.len() as u16;
    }

    // one material index byte per submesh
    for (i, m) in meshes.iter().enumerate() {
        match m.material {
            MaterialRef::Index(index) => out.write_all(&[index])?,
            MaterialRef::Default => return Err(MeshError::DefaultMaterial { submesh: i }),
        }
    }

    Ok(())
}

pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Run `write` against a temp file next to `path`, renaming over `path` only
/// on success.
pub(crate) fn write_via_tmp(
    path: &Path,
    write: impl FnOnce(&mut BufWriter<File>) -> Result<(), MeshError>,
) -> Result<(), MeshError> {
    let tmp = tmp_path(path);
    let result = File::create(&tmp).map_err(MeshError::from).and_then(|f| {
        let mut out = BufWriter::new(f);
        write(&mut out)?;
        out.flush()?;
        Ok(())
    });
    match result {
        Ok(()) => {
            fs::rename(&tmp, path)?;
            Ok(())
        }
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            Err(e)
        }
    }
}

/// Encode the submeshes to a `.m` file.
pub fn write_mesh_file(
    meshes: &[SceneMesh],
    material_name: &str,
    path: &Path,
) -> Result<(), MeshError> {
    write_via_tmp(path, |out| write_mesh(meshes, material_name, out))
}

/// Write the `<stem>.m` / `<stem>.mat` pair for a scene.
///
/// The sidecar's own file name is the name stored in both files.
pub fn export(scene: &Scene, stem: &Path) -> Result<(), MeshError> {
    let mesh_path = stem.with_extension("m");
    let mat_path = stem.with_extension("mat");

    let material_name = mat_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or(MeshError::BadName("material name"))?
        .to_owned();

    write_mesh_file(&scene.meshes, &material_name, &mesh_path)?;
    write_material_file(&scene.materials, &material_name, &mat_path)?;

    log::debug!("exported {:?} and {:?}", mesh_path, mat_path);
    Ok(())
}

#[cfg(test)]
mod encode_tests {
    use glam::vec3;

    use super::*;
    use crate::scene::SceneMesh;

    fn quad() -> SceneMesh {
        SceneMesh {
            positions: vec![
                vec3(0.0, 0.0, 0.0),
                vec3(1.0, 0.0, 0.0),
                vec3(1.0, 1.0, 0.0),
                vec3(0.0, 1.0, 0.0),
            ],
            normals: None,
            texcoords: None,
            triangles: vec![[0, 1, 2], [0, 2, 3]],
            material: MaterialRef::Index(0),
        }
    }

    #[test]
    fn default_material_is_rejected() {
        let mut sub = quad();
        sub.material = MaterialRef::Default;

        let mut out = Vec::new();
        let err = write_mesh(&[sub], "box.mat", &mut out).unwrap_err();
        assert!(matches!(err, MeshError::DefaultMaterial { submesh: 0 }));
    }

    #[test]
    fn mixed_texcoord_presence_is_rejected() {
        let mut textured = quad();
        textured.texcoords = Some(vec![glam::vec2(0.0, 0.0); 4]);

        let mut out = Vec::new();
        let err = write_mesh(&[quad(), textured], "box.mat", &mut out).unwrap_err();
        assert!(matches!(
            err,
            MeshError::MixedAttributes {
                submesh: 1,
                attr: "texcoord"
            }
        ));
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut sub = quad();
        sub.triangles.push([0, 2, 4]);

        let mut out = Vec::new();
        let err = write_mesh(&[sub], "box.mat", &mut out).unwrap_err();
        assert!(matches!(
            err,
            MeshError::IndexOutOfRange {
                submesh: 0,
                index: 4,
                vertices: 4
            }
        ));
    }

    #[test]
    fn vertex_capacity_is_rejected() {
        // 65536 vertices across two submeshes, one over the u16 ceiling
        let make = |n: usize| SceneMesh {
            positions: vec![Vec3::ZERO; n],
            normals: None,
            texcoords: None,
            triangles: vec![[0, 1, 2]],
            material: MaterialRef::Index(0),
        };

        let mut out = Vec::new();
        let err = write_mesh(&[make(40000), make(25536)], "box.mat", &mut out).unwrap_err();
        match err {
            MeshError::Capacity { field, value, max } => {
                assert_eq!(field, "vertex");
                assert_eq!(value, 65536);
                assert_eq!(max, 65535);
            }
            other => panic!("expected capacity error, got {other:?}"),
        }
    }

    #[test]
    fn triangle_capacity_is_rejected() {
        let sub = SceneMesh {
            positions: vec![Vec3::ZERO; 3],
            normals: None,
            texcoords: None,
            triangles: vec![[0, 1, 2]; 65536],
            material: MaterialRef::Index(0),
        };

        let mut out = Vec::new();
        let err = write_mesh(&[sub], "box.mat", &mut out).unwrap_err();
        assert!(matches!(
            err,
            MeshError::Capacity {
                field: "triangle",
                value: 65536,
                ..
            }
        ));
    }

    #[test]
    fn failed_encode_leaves_no_file() {
        let path = std::env::temp_dir().join("mesh_encode_reject_test.m");
        let _ = fs::remove_file(&path);

        let mut sub = quad();
        sub.material = MaterialRef::Default;
        assert!(write_mesh_file(&[sub], "box.mat", &path).is_err());

        assert!(!path.exists());
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn interior_nul_in_name_is_rejected() {
        let mut out = Vec::new();
        let err = write_mesh(&[quad()], "box\0.mat", &mut out).unwrap_err();
        assert!(matches!(err, MeshError::BadName(_)));
    }
}
