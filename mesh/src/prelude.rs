pub use crate::encode::{export, write_mesh, write_mesh_file};
pub use crate::endian::{swap_f32, swap_u16};
pub use crate::error::{Block, MeshError};
pub use crate::material::{write_material_file, write_materials, MaterialFile};
pub use crate::mesh::{Mesh, MeshHeader, SubMesh};
pub use crate::scene::{MaterialRef, Scene, SceneMaterial, SceneMesh};
