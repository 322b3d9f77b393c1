use std::{fmt, io};

use thiserror::Error;

/// The block of a `.m` or `.mat` stream an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    Header,
    MaterialName,
    Positions,
    Normals,
    TexCoords,
    Indices,
    SubMeshes,
    SubMeshMaterials,
    MaterialHeader,
    TextureName,
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Block::Header => "header",
            Block::MaterialName => "material name",
            Block::Positions => "position",
            Block::Normals => "normal",
            Block::TexCoords => "texcoord",
            Block::Indices => "index",
            Block::SubMeshes => "submesh descriptor",
            Block::SubMeshMaterials => "submesh material",
            Block::MaterialHeader => "material header",
            Block::TextureName => "texture name",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum MeshError {
    /// The stream ended mid-block.
    #[error("truncated {0} block")]
    Truncated(Block),

    /// A block's length is inconsistent with the header counts.
    #[error("{0} block length does not match header counts")]
    BlockMismatch(Block),

    /// A count exceeds the width of its format field.
    #[error("{field} count {value} exceeds format limit {max}")]
    Capacity {
        field: &'static str,
        value: usize,
        max: usize,
    },

    /// Submeshes disagree on whether an attribute is present.
    #[error("submesh {submesh} {attr} presence differs from the rest of the scene")]
    MixedAttributes { submesh: usize, attr: &'static str },

    /// An attribute array does not hold one entry per vertex.
    #[error("submesh {submesh} has {got} {attr} entries for {vertices} vertices")]
    AttributeCount {
        submesh: usize,
        attr: &'static str,
        got: usize,
        vertices: usize,
    },

    /// A triangle refers to a vertex outside its submesh.
    #[error("submesh {submesh} index {index} out of range ({vertices} vertices)")]
    IndexOutOfRange {
        submesh: usize,
        index: u32,
        vertices: usize,
    },

    /// The default material has no wire encoding.
    #[error("submesh {submesh} references the default material")]
    DefaultMaterial { submesh: usize },

    /// A persisted name string would not survive NUL termination.
    #[error("{0} contains an interior NUL byte")]
    BadName(&'static str),

    #[error(transparent)]
    Io(#[from] io::Error),
}
