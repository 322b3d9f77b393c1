//! The abstract scene model the encoder consumes.
//!
//! An importer (OBJ, or any other triangulating front end) produces a
//! [`Scene`]: one [`SceneMesh`] per material run, plus the list of real
//! materials. Input must already be triangulated with deduplicated vertices.

use glam::{Vec2, Vec3};

/// A submesh's material binding.
///
/// Reference 0 in the source model is an implicit material that is never
/// persisted, so the wire format only knows rebased indices. Keeping the
/// default as its own variant avoids the silent underflow of the original
/// "stored as raw index - 1" encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialRef {
    /// The implicit, non-persisted default material.
    Default,
    /// Zero-based index into the scene's real materials.
    Index(u8),
}

impl Default for MaterialRef {
    fn default() -> Self {
        MaterialRef::Default
    }
}

/// One run of triangles sharing a material.
#[derive(Debug, Clone, Default)]
pub struct SceneMesh {
    pub positions: Vec<Vec3>,
    /// One normal per vertex, or none for the whole submesh.
    pub normals: Option<Vec<Vec3>>,
    /// One texcoord per vertex, or none for the whole submesh.
    pub texcoords: Option<Vec<Vec2>>,
    /// Three corners per face, indexing this submesh's own vertices.
    pub triangles: Vec<[u32; 3]>,
    pub material: MaterialRef,
}

/// A real (persisted) material.
#[derive(Debug, Clone)]
pub struct SceneMaterial {
    pub name: String,
    /// Diffuse texture filename, if the material has one.
    pub diffuse: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub meshes: Vec<SceneMesh>,
    /// Real materials only; the default material is not stored.
    pub materials: Vec<SceneMaterial>,
}

impl Scene {
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.positions.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.triangles.len()).sum()
    }
}
