//! Convert `<name>.obj` into the `<name>.m` / `<name>.mat` binary pair, then
//! read both back and print what was written.

mod obj;

use std::{
    env,
    error::Error,
    path::{Path, PathBuf},
    process::ExitCode,
};

use mesh::prelude::*;
use obj::ObjReader;

fn main() -> ExitCode {
    env_logger::init();

    let Some(stem) = env::args().nth(1) else {
        eprintln!("usage: mesh-convert <meshname>");
        return ExitCode::FAILURE;
    };

    match run(&PathBuf::from(stem)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(stem: &Path) -> Result<(), Box<dyn Error>> {
    let obj_path = stem.with_extension("obj");
    println!("converting mesh: {}", obj_path.display());

    let scene = ObjReader::load(&obj_path)?;
    println!(
        "{} submeshes, {} vertices, {} triangles, {} materials",
        scene.meshes.len(),
        scene.vertex_count(),
        scene.triangle_count(),
        scene.materials.len()
    );

    export(&scene, stem)?;

    // read the pair back, like the original converter's verification pass
    let mesh = Mesh::load(&stem.with_extension("m"))?;
    println!("{:?}", mesh.header);
    for (i, sub) in mesh.submeshes.iter().enumerate() {
        println!(
            "\tsubmesh {i}: start={}, count={}, material={}",
            { sub.start },
            { sub.count },
            mesh.submesh_materials[i]
        );
    }

    let mats = MaterialFile::load(&stem.with_extension("mat"))?;
    println!("material file {:?} ({} materials)", mats.name, mats.diffuse.len());
    for (i, tex) in mats.diffuse.iter().enumerate() {
        match tex {
            Some(tex) => println!("\tmat {i}: {tex}"),
            None => println!("\tmat {i}: no diffuse texture"),
        }
    }

    Ok(())
}
