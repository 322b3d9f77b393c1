//! Wire-layout structs and the decoded in-memory mesh.

use std::fmt;

use glam::{Vec2, Vec3};

/// Fixed 8-byte `.m` header: four big-endian u16 counts.
#[repr(C, packed)]
#[derive(Copy, Clone, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshHeader {
    /// Total vertex count across all submeshes.
    pub n_vertices: u16,
    /// Total triangle count across all submeshes.
    pub n_tris: u16,
    pub n_submeshes: u16,
    /// Byte length of the material sidecar's file name, incl. the NUL.
    pub material_name_len: u16,
}

impl MeshHeader {
    pub const DISK_SIZE: usize = 8;
}

impl fmt::Debug for MeshHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // copy out of the packed struct before borrowing
        let n_vertices = self.n_vertices;
        let n_tris = self.n_tris;
        let n_submeshes = self.n_submeshes;
        let material_name_len = self.material_name_len;
        f.debug_struct("MeshHeader")
            .field("n_vertices", &n_vertices)
            .field("n_tris", &n_tris)
            .field("n_submeshes", &n_submeshes)
            .field("material_name_len", &material_name_len)
            .finish()
    }
}

/// Per-submesh descriptor: triangle offset into the global index block and
/// triangle count, both big-endian u16 on disk.
#[repr(C, packed)]
#[derive(Copy, Clone, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SubMesh {
    pub start: u16,
    pub count: u16,
}

impl fmt::Debug for SubMesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = self.start;
        let count = self.count;
        f.debug_struct("SubMesh")
            .field("start", &start)
            .field("count", &count)
            .finish()
    }
}

/// A fully decoded mesh.
///
/// Every array is allocated once at load, sized exactly from the header, and
/// owned by this struct for its whole lifetime. `normals`/`texcoords` are
/// empty when the file carries no such block.
pub struct Mesh {
    pub header: MeshHeader,
    /// File name of the material sidecar, without the trailing NUL.
    pub material_name: String,
    pub vertices: Box<[Vec3]>,
    pub normals: Box<[Vec3]>,
    pub texcoords: Box<[Vec2]>,
    /// Flat index block, 3 entries per triangle, addressing `vertices`.
    pub indices: Box<[u16]>,
    pub submeshes: Box<[SubMesh]>,
    /// Zero-based material index per submesh.
    pub submesh_materials: Box<[u8]>,
}

impl Mesh {
    pub fn n_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn n_tris(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn n_submeshes(&self) -> usize {
        self.submeshes.len()
    }

    /// Index triple of triangle `tri`.
    pub fn triangle(&self, tri: usize) -> [u16; 3] {
        let i = tri * 3;
        [self.indices[i], self.indices[i + 1], self.indices[i + 2]]
    }

    /// The slice of the global index block covered by one descriptor.
    pub fn submesh_indices(&self, sub: &SubMesh) -> &[u16] {
        let start = sub.start as usize * 3;
        let end = start + sub.count as usize * 3;
        &self.indices[start..end]
    }
}

impl fmt::Debug for Mesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mesh")
            .field("header", &self.header)
            .field("material_name", &self.material_name)
            .field("normals", &self.normals.len())
            .field("texcoords", &self.texcoords.len())
            .field("submeshes", &self.submeshes)
            .finish()
    }
}
