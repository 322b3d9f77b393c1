//! `.m` mesh decoder.

use std::{
    fs::File,
    io::{self, BufReader, Read, Seek, SeekFrom},
    path::Path,
};

use glam::{vec2, vec3, Vec2, Vec3};

use crate::endian::{f32_from_disk, u16_from_disk};
use crate::error::{Block, MeshError};
use crate::mesh::{Mesh, MeshHeader, SubMesh};

fn read_block<R: Read>(
    buffer: &mut R,
    len: usize,
    block: Block,
) -> Result<Box<[u8]>, MeshError> {
    let mut bytes: Box<[u8]> = bytemuck::zeroed_slice_box(len);
    buffer.read_exact(&mut bytes).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            MeshError::Truncated(block)
        } else {
            MeshError::Io(e)
        }
    })?;
    Ok(bytes)
}

fn read_f32s<R: Read>(
    buffer: &mut R,
    count: usize,
    block: Block,
) -> Result<Vec<f32>, MeshError> {
    let bytes = read_block(buffer, count * 4, block)?;
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32_from_disk([c[0], c[1], c[2], c[3]]))
        .collect())
}

fn read_u16s<R: Read>(
    buffer: &mut R,
    count: usize,
    block: Block,
) -> Result<Vec<u16>, MeshError> {
    let bytes = read_block(buffer, count * 2, block)?;
    Ok(bytes
        .chunks_exact(2)
        .map(|c| u16_from_disk([c[0], c[1]]))
        .collect())
}

fn read_vec3s<R: Read>(
    buffer: &mut R,
    count: usize,
    block: Block,
) -> Result<Box<[Vec3]>, MeshError> {
    let flat = read_f32s(buffer, count * 3, block)?;
    Ok(flat
        .chunks_exact(3)
        .map(|c| vec3(c[0], c[1], c[2]))
        .collect())
}

fn read_vec2s<R: Read>(
    buffer: &mut R,
    count: usize,
    block: Block,
) -> Result<Box<[Vec2]>, MeshError> {
    let flat = read_f32s(buffer, count * 2, block)?;
    Ok(flat.chunks_exact(2).map(|c| vec2(c[0], c[1])).collect())
}

impl Mesh {
    /// Decode a `.m` stream into a fully populated mesh.
    ///
    /// Every array is allocated here, sized from the header, and handed to
    /// the returned mesh. A short read fails naming the truncated block.
    pub fn read<R: Read + Seek>(buffer: &mut BufReader<R>) -> Result<Self, MeshError> {
        let h = read_block(buffer, MeshHeader::DISK_SIZE, Block::Header)?;
        let header = MeshHeader {
            n_vertices: u16_from_disk([h[0], h[1]]),
            n_tris: u16_from_disk([h[2], h[3]]),
            n_submeshes: u16_from_disk([h[4], h[5]]),
            material_name_len: u16_from_disk([h[6], h[7]]),
        };
        log::debug!("read {:?}", header);

        let name_bytes = read_block(
            buffer,
            header.material_name_len as usize,
            Block::MaterialName,
        )?;
        let material_name = match name_bytes.split_last() {
            Some((0, head)) => String::from_utf8_lossy(head).into_owned(),
            _ => return Err(MeshError::BlockMismatch(Block::MaterialName)),
        };

        let v = header.n_vertices as usize;
        let t = header.n_tris as usize;
        let s = header.n_submeshes as usize;

        // The format stores no attribute presence flags; with presence
        // uniform per file, the four legal layouts differ in total length,
        // so the remaining stream length decides which blocks exist.
        let here = buffer.stream_position()?;
        let end = buffer.seek(SeekFrom::End(0))?;
        buffer.seek(SeekFrom::Start(here))?;
        let remaining = (end - here) as usize;

        let fixed = v * 12 + t * 6 + s * 4 + s;
        let (has_normals, has_texcoords) = if remaining >= fixed {
            match remaining - fixed {
                0 => (false, false),
                extra if v > 0 && extra == v * 20 => (true, true),
                extra if v > 0 && extra == v * 12 => (true, false),
                extra if v > 0 && extra == v * 8 => (false, true),
                // attribute region matches none of the legal layouts
                _ => return Err(MeshError::BlockMismatch(Block::TexCoords)),
            }
        } else {
            // short stream: the block reads below name what is missing
            (false, false)
        };

        let vertices = read_vec3s(buffer, v, Block::Positions)?;
        let normals = if has_normals {
            read_vec3s(buffer, v, Block::Normals)?
        } else {
            Box::default()
        };
        let texcoords = if has_texcoords {
            read_vec2s(buffer, v, Block::TexCoords)?
        } else {
            Box::default()
        };

        let indices: Box<[u16]> = read_u16s(buffer, t * 3, Block::Indices)?.into_boxed_slice();

        let descriptor_words = read_u16s(buffer, s * 2, Block::SubMeshes)?;
        let submeshes: Box<[SubMesh]> = descriptor_words
            .chunks_exact(2)
            .map(|c| SubMesh {
                start: c[0],
                count: c[1],
            })
            .collect();

        let submesh_materials = read_block(buffer, s, Block::SubMeshMaterials)?;

        Ok(Mesh {
            header,
            material_name,
            vertices,
            normals,
            texcoords,
            indices,
            submeshes,
            submesh_materials,
        })
    }

    /// Open and decode a `.m` file.
    pub fn load(path: &Path) -> Result<Self, MeshError> {
        let file = File::open(path)?;
        let mut buffer = BufReader::new(file);
        Self::read(&mut buffer)
    }
}
