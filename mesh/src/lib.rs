//! Compact binary mesh format for a fixed big-endian renderer target.
//!
//! A `.m` file holds one mesh: a 4 x u16 header, the NUL-terminated name of
//! its material sidecar, flat big-endian attribute blocks (positions,
//! optional normals, optional texcoords), a global u16 index block, a
//! (start, count) submesh descriptor table and one material index byte per
//! submesh. The `.mat` sidecar carries per-material diffuse texture names.
//!
//! Encode from a [`scene::Scene`] produced by an importer; decode into a
//! [`mesh::Mesh`] for a renderer.

pub mod decode;
pub mod encode;
pub mod endian;
pub mod error;
pub mod material;
pub mod mesh;
pub mod prelude;
pub mod scene;
