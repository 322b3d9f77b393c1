//! Wavefront OBJ/MTL importer producing the abstract scene model.
//!
//! One `SceneMesh` per `usemtl` run: faces are fan-triangulated and their
//! (position, texcoord, normal) triples deduplicated into per-submesh vertex
//! arrays. Only the directives the target format can carry are parsed
//! (`v`/`vn`/`vt`/`f`/`usemtl`/`mtllib`, and `newmtl`/`map_Kd` in MTL files);
//! everything else is skipped.

use std::{
    fs,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

use ahash::AHashMap;
use glam::{vec2, vec3, Vec2, Vec3};
use thiserror::Error;

use mesh::scene::{MaterialRef, Scene, SceneMaterial, SceneMesh};

#[derive(Debug, Error)]
pub enum ObjError {
    #[error("line {line}: {msg}")]
    Parse { line: usize, msg: String },

    #[error("line {line}: face corner {index} out of range")]
    FaceIndex { line: usize, index: i64 },

    #[error("more than 255 materials")]
    TooManyMaterials,

    #[error(transparent)]
    Io(#[from] io::Error),
}

fn parse_err(line: usize, msg: impl Into<String>) -> ObjError {
    ObjError::Parse {
        line,
        msg: msg.into(),
    }
}

/// One face corner: indices into the OBJ-global arrays, -1 = absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Corner {
    v: i64,
    vt: i64,
    vn: i64,
}

pub struct ObjReader {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    texcoords: Vec<Vec2>,

    /// Faces of the current material run, not yet triangulated.
    group: Vec<(usize, Vec<Corner>)>,
    current: MaterialRef,

    materials: Vec<SceneMaterial>,
    material_index: AHashMap<String, u8>,

    meshes: Vec<SceneMesh>,

    /// Directory for `mtllib` resolution; `None` skips the directive.
    mtl_dir: Option<PathBuf>,
}

impl Default for ObjReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjReader {
    pub fn new() -> Self {
        ObjReader {
            positions: Vec::new(),
            normals: Vec::new(),
            texcoords: Vec::new(),
            group: Vec::new(),
            current: MaterialRef::Default,
            materials: Vec::new(),
            material_index: AHashMap::new(),
            meshes: Vec::new(),
            mtl_dir: None,
        }
    }

    /// Parse a whole OBJ file, resolving `mtllib` next to it.
    pub fn load(path: &Path) -> Result<Scene, ObjError> {
        let mut reader = ObjReader::new();
        reader.mtl_dir = path.parent().map(Path::to_path_buf);

        let file = fs::File::open(path)?;
        for (n, line) in BufReader::new(file).lines().enumerate() {
            reader.parse_line(&line?, n + 1)?;
        }
        reader.finish()
    }

    /// Parse OBJ text with no `mtllib` resolution (`mtllib` lines warn).
    pub fn parse(text: &str) -> Result<Scene, ObjError> {
        let mut reader = ObjReader::new();
        for (n, line) in text.lines().enumerate() {
            reader.parse_line(line, n + 1)?;
        }
        reader.finish()
    }

    fn parse_line(&mut self, line: &str, n: usize) -> Result<(), ObjError> {
        let mut words = line.split_whitespace();
        let Some(keyword) = words.next() else {
            return Ok(());
        };

        match keyword {
            "#" => {}
            "v" => self.positions.push(parse_vec3(&mut words, n)?),
            "vn" => self.normals.push(parse_vec3(&mut words, n)?),
            "vt" => self.texcoords.push(parse_vec2(&mut words, n)?),
            "f" => {
                let face = words
                    .map(|w| self.parse_corner(w, n))
                    .collect::<Result<Vec<_>, _>>()?;
                if face.len() < 3 {
                    return Err(parse_err(n, format!("face with {} corners", face.len())));
                }
                self.group.push((n, face));
            }
            "usemtl" => {
                self.flush()?;
                let name = words.next().ok_or_else(|| parse_err(n, "usemtl: name expected"))?;
                // unknown material names fall back to the default slot
                self.current = match self.material_index.get(name) {
                    Some(&index) => MaterialRef::Index(index),
                    None => {
                        log::warn!("line {n}: unknown material {name:?}");
                        MaterialRef::Default
                    }
                };
            }
            "mtllib" => {
                let name = words.next().ok_or_else(|| parse_err(n, "mtllib: name expected"))?;
                match &self.mtl_dir {
                    Some(dir) => self.load_mtl(&dir.join(name))?,
                    None => log::warn!("line {n}: mtllib {name:?} skipped"),
                }
            }
            other if other.starts_with('#') => {}
            other => log::debug!("line {n}: skipping {other:?}"),
        }

        Ok(())
    }

    /// Parse `v`, `v/t`, `v//n` or `v/t/n`; 1-based, negative = from the end.
    fn parse_corner(&self, word: &str, n: usize) -> Result<Corner, ObjError> {
        let mut parts = word.splitn(3, '/');

        let v = parse_index(parts.next(), self.positions.len(), n)?
            .ok_or_else(|| parse_err(n, format!("bad face corner {word:?}")))?;
        let vt = parse_index(parts.next(), self.texcoords.len(), n)?.unwrap_or(-1);
        let vn = parse_index(parts.next(), self.normals.len(), n)?.unwrap_or(-1);

        Ok(Corner { v, vt, vn })
    }

    fn load_mtl(&mut self, path: &Path) -> Result<(), ObjError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                // a missing material library degrades to the default material
                log::warn!("can't open {path:?}: {e}");
                return Ok(());
            }
        };
        self.parse_mtl(&text)
    }

    pub fn parse_mtl(&mut self, text: &str) -> Result<(), ObjError> {
        for (n, line) in text.lines().enumerate() {
            let mut words = line.split_whitespace();
            match words.next() {
                Some("newmtl") => {
                    let name = words
                        .next()
                        .ok_or_else(|| parse_err(n + 1, "newmtl: name expected"))?;
                    if self.materials.len() >= u8::MAX as usize + 1 {
                        return Err(ObjError::TooManyMaterials);
                    }
                    self.material_index
                        .insert(name.to_owned(), self.materials.len() as u8);
                    self.materials.push(SceneMaterial {
                        name: name.to_owned(),
                        diffuse: None,
                    });
                }
                Some("map_Kd") => {
                    let tex = words
                        .next()
                        .ok_or_else(|| parse_err(n + 1, "map_Kd: filename expected"))?;
                    match self.materials.last_mut() {
                        Some(mat) => mat.diffuse = Some(tex.to_owned()),
                        None => return Err(parse_err(n + 1, "map_Kd before newmtl")),
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Turn the pending face group into one `SceneMesh`.
    fn flush(&mut self) -> Result<(), ObjError> {
        if self.group.is_empty() {
            return Ok(());
        }

        let mut sub = SceneMesh {
            material: self.current,
            ..Default::default()
        };
        let mut normals = Vec::new();
        let mut texcoords = Vec::new();
        let mut dedup: AHashMap<Corner, u32> = AHashMap::new();

        for (line, face) in std::mem::take(&mut self.group) {
            // triangle fan around the first corner
            for k in 2..face.len() {
                let tri = [face[0], face[k - 1], face[k]];
                let mut indices = [0u32; 3];
                for (slot, corner) in indices.iter_mut().zip(tri) {
                    *slot = self.dedup_corner(
                        corner,
                        line,
                        &mut sub,
                        &mut normals,
                        &mut texcoords,
                        &mut dedup,
                    )?;
                }
                sub.triangles.push(indices);
            }
        }

        // attributes only count when every corner supplied them
        if normals.len() == sub.positions.len() && !normals.is_empty() {
            sub.normals = Some(normals);
        }
        if texcoords.len() == sub.positions.len() && !texcoords.is_empty() {
            sub.texcoords = Some(texcoords);
        }

        self.meshes.push(sub);
        Ok(())
    }

    fn dedup_corner(
        &self,
        corner: Corner,
        line: usize,
        sub: &mut SceneMesh,
        normals: &mut Vec<Vec3>,
        texcoords: &mut Vec<Vec2>,
        dedup: &mut AHashMap<Corner, u32>,
    ) -> Result<u32, ObjError> {
        if let Some(&index) = dedup.get(&corner) {
            return Ok(index);
        }

        let position = *self
            .positions
            .get(corner.v as usize)
            .ok_or(ObjError::FaceIndex {
                line,
                index: corner.v,
            })?;
        sub.positions.push(position);

        if corner.vn >= 0 {
            normals.push(*self.normals.get(corner.vn as usize).ok_or(
                ObjError::FaceIndex {
                    line,
                    index: corner.vn,
                },
            )?);
        }
        if corner.vt >= 0 {
            texcoords.push(*self.texcoords.get(corner.vt as usize).ok_or(
                ObjError::FaceIndex {
                    line,
                    index: corner.vt,
                },
            )?);
        }

        let index = sub.positions.len() as u32 - 1;
        dedup.insert(corner, index);
        Ok(index)
    }

    /// Flush the last group and assemble the scene.
    ///
    /// Submeshes left on the default material get a synthesized material so
    /// the encoder never sees `MaterialRef::Default`; attribute presence is
    /// made uniform across submeshes (the format cannot express a mix).
    fn finish(mut self) -> Result<Scene, ObjError> {
        self.flush()?;

        let mut meshes = self.meshes;
        let mut materials = self.materials;

        if meshes.iter().any(|m| m.material == MaterialRef::Default) {
            if materials.len() >= u8::MAX as usize + 1 {
                return Err(ObjError::TooManyMaterials);
            }
            let fallback = materials.len() as u8;
            materials.push(SceneMaterial {
                name: "default".to_owned(),
                diffuse: None,
            });
            for m in &mut meshes {
                if m.material == MaterialRef::Default {
                    m.material = MaterialRef::Index(fallback);
                }
            }
        }

        if meshes.iter().any(|m| m.normals.is_none()) {
            if meshes.iter().any(|m| m.normals.is_some()) {
                log::warn!("dropping normals: not present on every submesh");
            }
            for m in &mut meshes {
                m.normals = None;
            }
        }
        if meshes.iter().any(|m| m.texcoords.is_none()) {
            if meshes.iter().any(|m| m.texcoords.is_some()) {
                log::warn!("dropping texcoords: not present on every submesh");
            }
            for m in &mut meshes {
                m.texcoords = None;
            }
        }

        Ok(Scene { meshes, materials })
    }
}

fn parse_float<'a>(
    words: &mut impl Iterator<Item = &'a str>,
    n: usize,
) -> Result<f32, ObjError> {
    let word = words.next().ok_or_else(|| parse_err(n, "number expected"))?;
    word.parse()
        .map_err(|_| parse_err(n, format!("bad number {word:?}")))
}

fn parse_vec3<'a>(
    words: &mut impl Iterator<Item = &'a str>,
    n: usize,
) -> Result<Vec3, ObjError> {
    Ok(vec3(
        parse_float(words, n)?,
        parse_float(words, n)?,
        parse_float(words, n)?,
    ))
}

fn parse_vec2<'a>(
    words: &mut impl Iterator<Item = &'a str>,
    n: usize,
) -> Result<Vec2, ObjError> {
    Ok(vec2(parse_float(words, n)?, parse_float(words, n)?))
}

/// Resolve a 1-based OBJ index against an array of `len` entries; negative
/// counts back from the end. `None`/empty means the component was omitted.
fn parse_index(
    part: Option<&str>,
    len: usize,
    n: usize,
) -> Result<Option<i64>, ObjError> {
    let Some(part) = part else {
        return Ok(None);
    };
    if part.is_empty() {
        return Ok(None);
    }
    let raw: i64 = part
        .parse()
        .map_err(|_| parse_err(n, format!("bad index {part:?}")))?;
    Ok(Some(if raw > 0 { raw - 1 } else { len as i64 + raw }))
}

#[cfg(test)]
mod obj_tests {
    use glam::vec3;

    use super::*;

    const QUAD: &str = "\
# a unit quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
f 1 2 3 4
";

    #[test]
    fn quad_becomes_a_fan() {
        let scene = ObjReader::parse(QUAD).unwrap();
        assert_eq!(scene.meshes.len(), 1);

        let sub = &scene.meshes[0];
        assert_eq!(sub.positions.len(), 4);
        assert_eq!(sub.triangles, vec![[0, 1, 2], [0, 2, 3]]);
        assert!(sub.normals.is_none());
        assert!(sub.texcoords.is_none());

        // faces with no declared material land on a synthesized one
        assert_eq!(sub.material, MaterialRef::Index(0));
        assert_eq!(scene.materials[0].name, "default");
    }

    #[test]
    fn corners_are_deduplicated() {
        let scene = ObjReader::parse(QUAD).unwrap();
        // the fan shares corners 1 and 3: four unique vertices, not six
        assert_eq!(scene.meshes[0].positions.len(), 4);
    }

    #[test]
    fn negative_indices_count_from_the_end() {
        let obj = "\
v 0 0 0
v 1 0 0
v 0 1 0
f -3 -2 -1
";
        let scene = ObjReader::parse(obj).unwrap();
        assert_eq!(scene.meshes[0].triangles, vec![[0, 1, 2]]);
        assert_eq!(scene.meshes[0].positions[1], vec3(1.0, 0.0, 0.0));
    }

    #[test]
    fn triplet_forms() {
        let obj = "\
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vt 1 0
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1
";
        let scene = ObjReader::parse(obj).unwrap();
        let sub = &scene.meshes[0];
        assert_eq!(sub.texcoords.as_ref().unwrap().len(), 3);
        assert_eq!(sub.normals.as_ref().unwrap(), &vec![vec3(0.0, 0.0, 1.0); 3]);
    }

    #[test]
    fn material_runs_split_submeshes() {
        let obj = "\
v 0 0 0
v 1 0 0
v 0 1 0
v 1 1 0
usemtl stone
f 1 2 3
usemtl wood
f 2 4 3
";
        let mut reader = ObjReader::new();
        reader
            .parse_mtl("newmtl stone\nmap_Kd stone.png\nnewmtl wood\n")
            .unwrap();
        for (n, line) in obj.lines().enumerate() {
            reader.parse_line(line, n + 1).unwrap();
        }
        let scene = reader.finish().unwrap();

        assert_eq!(scene.meshes.len(), 2);
        assert_eq!(scene.meshes[0].material, MaterialRef::Index(0));
        assert_eq!(scene.meshes[1].material, MaterialRef::Index(1));
        assert_eq!(scene.materials.len(), 2);
        assert_eq!(scene.materials[0].diffuse.as_deref(), Some("stone.png"));
        assert_eq!(scene.materials[1].diffuse, None);
    }

    #[test]
    fn out_of_range_face_index_errors() {
        let obj = "v 0 0 0\nf 1 2 3\n";
        assert!(matches!(
            ObjReader::parse(obj),
            Err(ObjError::FaceIndex { .. })
        ));
    }

    #[test]
    fn short_face_errors() {
        let obj = "v 0 0 0\nv 1 0 0\nf 1 2\n";
        assert!(matches!(ObjReader::parse(obj), Err(ObjError::Parse { .. })));
    }
}
