//! STL and OBJ mesh file I/O

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use glam::DVec3;

use super::{CadError, CadResult, TessellatedMesh};

fn create_file(path: &Path) -> CadResult<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| CadError::Io(e.to_string()))?;
    }
    File::create(path).map_err(|e| CadError::Io(e.to_string()))
}

fn face_normal(v0: [f32; 3], v1: [f32; 3], v2: [f32; 3]) -> [f32; 3] {
    let e1 = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
    let e2 = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];
    let cross = [
        e1[1] * e2[2] - e1[2] * e2[1],
        e1[2] * e2[0] - e1[0] * e2[2],
        e1[0] * e2[1] - e1[1] * e2[0],
    ];
    let len = (cross[0] * cross[0] + cross[1] * cross[1] + cross[2] * cross[2]).sqrt();
    if len > 0.0 {
        [cross[0] / len, cross[1] / len, cross[2] / len]
    } else {
        [0.0, 0.0, 1.0]
    }
}

/// Write a mesh as binary STL
pub fn write_stl(mesh: &TessellatedMesh, path: impl AsRef<Path>) -> CadResult<()> {
    let triangles: Vec<stl_io::Triangle> = mesh
        .triangles()
        .map(|[v0, v1, v2]| stl_io::Triangle {
            normal: stl_io::Normal::new(face_normal(v0, v1, v2)),
            vertices: [
                stl_io::Vertex::new(v0),
                stl_io::Vertex::new(v1),
                stl_io::Vertex::new(v2),
            ],
        })
        .collect();

    let mut writer = BufWriter::new(create_file(path.as_ref())?);
    stl_io::write_stl(&mut writer, triangles.iter()).map_err(|e| CadError::Io(e.to_string()))?;
    writer.flush().map_err(|e| CadError::Io(e.to_string()))
}

/// Write a mesh as Wavefront OBJ
pub fn write_obj(mesh: &TessellatedMesh, name: &str, path: impl AsRef<Path>) -> CadResult<()> {
    let mut writer = BufWriter::new(create_file(path.as_ref())?);
    let io = |e: std::io::Error| CadError::Io(e.to_string());

    writeln!(writer, "o {}", name).map_err(io)?;
    for v in &mesh.vertices {
        writeln!(writer, "v {} {} {}", v[0], v[1], v[2]).map_err(io)?;
    }
    for n in &mesh.normals {
        writeln!(writer, "vn {} {} {}", n[0], n[1], n[2]).map_err(io)?;
    }
    for tri in mesh.indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] + 1, tri[1] + 1, tri[2] + 1);
        writeln!(writer, "f {a}//{a} {b}//{b} {c}//{c}").map_err(io)?;
    }
    writer.flush().map_err(io)
}

/// Read an ASCII or binary STL file as a triangle soup
pub fn read_stl(path: impl AsRef<Path>) -> CadResult<Vec<[DVec3; 3]>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(CadError::MissingResource(format!(
            "Mesh file not found: {}",
            path.display()
        )));
    }
    let file = File::open(path).map_err(|e| CadError::Io(e.to_string()))?;
    let mut reader = BufReader::new(file);
    let mesh = stl_io::read_stl(&mut reader).map_err(|e| CadError::Io(e.to_string()))?;

    let point = |i: usize| {
        let v = mesh.vertices[i];
        DVec3::new(v[0] as f64, v[1] as f64, v[2] as f64)
    };
    Ok(mesh
        .faces
        .iter()
        .map(|face| {
            [
                point(face.vertices[0]),
                point(face.vertices[1]),
                point(face.vertices[2]),
            ]
        })
        .collect())
}
