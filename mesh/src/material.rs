//! `.mat` material sidecar encoder/decoder.
//!
//! Layout: 2-byte header (own file name length incl. NUL, real material
//! count), the NUL-terminated name, then one length-prefixed entry per
//! material: a length byte, then that many bytes of NUL-terminated diffuse
//! texture filename. A zero length byte marks a material with no texture.

use std::{
    fs::File,
    io::{self, BufReader, Read, Write},
    path::Path,
};

use crate::encode::write_via_tmp;
use crate::error::{Block, MeshError};
use crate::scene::SceneMaterial;

const MAX_BYTE: usize = u8::MAX as usize;

/// A decoded sidecar: its own file name plus one optional diffuse texture
/// filename per material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialFile {
    pub name: String,
    pub diffuse: Box<[Option<String>]>,
}

fn check_name(label: &'static str, name: &str) -> Result<(), MeshError> {
    if name.as_bytes().contains(&0) {
        return Err(MeshError::BadName(label));
    }
    if name.len() + 1 > MAX_BYTE {
        return Err(MeshError::Capacity {
            field: label,
            value: name.len() + 1,
            max: MAX_BYTE,
        });
    }
    Ok(())
}

/// Serialize the real materials into a `.mat` stream.
///
/// `name` is the sidecar's own file name, as stored in the mesh header.
pub fn write_materials<W: Write>(
    materials: &[SceneMaterial],
    name: &str,
    out: &mut W,
) -> Result<(), MeshError> {
    if materials.len() > MAX_BYTE {
        return Err(MeshError::Capacity {
            field: "material",
            value: materials.len(),
            max: MAX_BYTE,
        });
    }
    check_name("material name", name)?;
    for m in materials {
        if let Some(tex) = &m.diffuse {
            check_name("texture name", tex)?;
        }
    }

    log::debug!("writing {} materials to sidecar {name}", materials.len());

    out.write_all(&[name.len() as u8 + 1, materials.len() as u8])?;
    out.write_all(name.as_bytes())?;
    out.write_all(&[0])?;

    for m in materials {
        match &m.diffuse {
            Some(tex) => {
                out.write_all(&[tex.len() as u8 + 1])?;
                out.write_all(tex.as_bytes())?;
                out.write_all(&[0])?;
            }
            None => out.write_all(&[0])?,
        }
    }

    Ok(())
}

/// Encode the materials to a `.mat` file (temp file + rename, like the mesh
/// writer).
pub fn write_material_file(
    materials: &[SceneMaterial],
    name: &str,
    path: &Path,
) -> Result<(), MeshError> {
    write_via_tmp(path, |out| write_materials(materials, name, out))
}

fn read_exact_block<R: Read>(
    buffer: &mut R,
    len: usize,
    block: Block,
) -> Result<Vec<u8>, MeshError> {
    let mut bytes = vec![0u8; len];
    buffer.read_exact(&mut bytes).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            MeshError::Truncated(block)
        } else {
            MeshError::Io(e)
        }
    })?;
    Ok(bytes)
}

fn string_from_nul(bytes: &[u8], block: Block) -> Result<String, MeshError> {
    match bytes.split_last() {
        Some((0, head)) => Ok(String::from_utf8_lossy(head).into_owned()),
        _ => Err(MeshError::BlockMismatch(block)),
    }
}

impl MaterialFile {
    /// Decode a `.mat` stream.
    pub fn read<R: Read>(buffer: &mut R) -> Result<Self, MeshError> {
        let header = read_exact_block(buffer, 2, Block::MaterialHeader)?;
        let name_len = header[0] as usize;
        let n_materials = header[1] as usize;

        let name_bytes = read_exact_block(buffer, name_len, Block::MaterialName)?;
        let name = string_from_nul(&name_bytes, Block::MaterialName)?;

        let mut diffuse = Vec::with_capacity(n_materials);
        for _ in 0..n_materials {
            let len = read_exact_block(buffer, 1, Block::TextureName)?[0] as usize;
            if len == 0 {
                diffuse.push(None);
                continue;
            }
            let tex_bytes = read_exact_block(buffer, len, Block::TextureName)?;
            diffuse.push(Some(string_from_nul(&tex_bytes, Block::TextureName)?));
        }

        Ok(MaterialFile {
            name,
            diffuse: diffuse.into_boxed_slice(),
        })
    }

    /// Open and decode a `.mat` file.
    pub fn load(path: &Path) -> Result<Self, MeshError> {
        let file = File::open(path)?;
        let mut buffer = BufReader::new(file);
        Self::read(&mut buffer)
    }
}

#[cfg(test)]
mod material_tests {
    use super::*;

    fn materials() -> Vec<SceneMaterial> {
        vec![
            SceneMaterial {
                name: "stone".into(),
                diffuse: Some("stone.png".into()),
            },
            SceneMaterial {
                name: "flat".into(),
                diffuse: None,
            },
            SceneMaterial {
                name: "wood".into(),
                diffuse: Some("wood.png".into()),
            },
        ]
    }

    #[test]
    fn round_trip_mixed_presence() {
        let mut bytes = Vec::new();
        write_materials(&materials(), "box.mat", &mut bytes).unwrap();

        let file = MaterialFile::read(&mut bytes.as_slice()).unwrap();
        assert_eq!(file.name, "box.mat");
        assert_eq!(
            *file.diffuse,
            [Some("stone.png".to_owned()), None, Some("wood.png".to_owned())]
        );
    }

    #[test]
    fn byte_layout() {
        let mats = vec![SceneMaterial {
            name: "stone".into(),
            diffuse: Some("s.png".into()),
        }];
        let mut bytes = Vec::new();
        write_materials(&mats, "a.mat", &mut bytes).unwrap();

        let mut expected = vec![6u8, 1];
        expected.extend_from_slice(b"a.mat\0");
        expected.push(6);
        expected.extend_from_slice(b"s.png\0");
        assert_eq!(bytes, expected);
    }

    #[test]
    fn material_capacity_is_rejected() {
        let mats = vec![
            SceneMaterial {
                name: "m".into(),
                diffuse: None,
            };
            256
        ];
        let mut bytes = Vec::new();
        let err = write_materials(&mats, "a.mat", &mut bytes).unwrap_err();
        assert!(matches!(
            err,
            MeshError::Capacity {
                field: "material",
                value: 256,
                max: 255
            }
        ));
    }

    #[test]
    fn truncated_texture_entry() {
        let mut bytes = Vec::new();
        write_materials(&materials(), "box.mat", &mut bytes).unwrap();
        bytes.truncate(bytes.len() - 4);

        let err = MaterialFile::read(&mut bytes.as_slice()).unwrap_err();
        assert!(matches!(err, MeshError::Truncated(Block::TextureName)));
    }
}
