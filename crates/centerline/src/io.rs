//! File I/O for surface meshes, centerlines and cross-section geometry.
//!
//! - Meshes: OBJ (faces keep their arity) and STL.
//! - Centerlines: VTK PolyData `.vtp` in ASCII form, or whitespace text `x y z [r]`.
//! - Geometry output: OBJ or `.vtp`.

use std::fmt::Write as _;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use nalgebra::Point3;
use tracing::{debug, info, warn};

use crate::curve::Centerline;
use crate::error::{CenterlineError, CenterlineResult};
use crate::tracing_ext::log_io;
use crate::types::{Mesh, Vertex};

/// Name of the point-data array holding the inscribed sphere radius of a centerline.
pub const RADIUS_ARRAY: &str = "MaximumInscribedSphereRadius";

/// Supported surface mesh formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Obj,
    Stl,
    Vtp,
}

impl MeshFormat {
    /// Detect format from file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match extension(path)?.as_str() {
            "obj" => Some(MeshFormat::Obj),
            "stl" => Some(MeshFormat::Stl),
            "vtp" => Some(MeshFormat::Vtp),
            _ => None,
        }
    }
}

/// Supported centerline formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CenterlineFormat {
    Vtp,
    Text,
}

impl CenterlineFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match extension(path)?.as_str() {
            "vtp" => Some(CenterlineFormat::Vtp),
            "txt" | "xyz" | "dat" => Some(CenterlineFormat::Text),
            _ => None,
        }
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

fn unsupported(path: &Path) -> CenterlineError {
    CenterlineError::UnsupportedFormat {
        extension: path.extension().and_then(|e| e.to_str()).map(String::from),
    }
}

fn write_text(path: &Path, text: &str, operation: &str) -> CenterlineResult<()> {
    let result = std::fs::write(path, text).map_err(|e| CenterlineError::io_write(path, e));
    log_io(operation, path, &result);
    result
}

// ============================================================================
// Surface meshes
// ============================================================================

/// Load a surface mesh, detecting the format from the extension.
pub fn load_mesh(path: &Path) -> CenterlineResult<Mesh> {
    let format = MeshFormat::from_path(path).ok_or_else(|| unsupported(path))?;
    info!("Loading mesh from {:?} (format: {:?})", path, format);

    let mesh = match format {
        MeshFormat::Obj => load_obj(path),
        MeshFormat::Stl => load_stl(path),
        MeshFormat::Vtp => load_vtp_mesh(path),
    };
    log_io("load_mesh", path, &mesh);
    let mesh = mesh?;

    if mesh.is_empty() {
        return Err(CenterlineError::EmptyMesh {
            details: format!("{} has no vertices or faces", path.display()),
        });
    }
    mesh.validate_indices()?;

    info!(
        "Loaded mesh: {} vertices, {} faces",
        mesh.vertex_count(),
        mesh.face_count()
    );
    if let Some((min, max)) = mesh.bounds() {
        debug!(
            "Bounding box: [{:.3}, {:.3}, {:.3}] to [{:.3}, {:.3}, {:.3}]",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
    }
    Ok(mesh)
}

/// Load an OBJ file without triangulating, merging all objects.
fn load_obj(path: &Path) -> CenterlineResult<Mesh> {
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: false,
            single_index: false,
            ignore_points: true,
            ignore_lines: true,
            ..Default::default()
        },
    )
    .map_err(|e| CenterlineError::parse_error(path, e.to_string()))?;

    let mut mesh = Mesh::new();
    for model in &models {
        let obj = &model.mesh;
        let offset = mesh.vertex_count() as u32;

        for chunk in obj.positions.chunks_exact(3) {
            mesh.vertices.push(Vertex::from_coords(
                chunk[0] as f64,
                chunk[1] as f64,
                chunk[2] as f64,
            ));
        }

        // An empty arity list means every face is a triangle.
        if obj.face_arities.is_empty() {
            for tri in obj.indices.chunks_exact(3) {
                mesh.faces.push(tri.iter().map(|&i| i + offset).collect());
            }
        } else {
            let mut start = 0usize;
            for &arity in &obj.face_arities {
                let end = start + arity as usize;
                let Some(face) = obj.indices.get(start..end) else {
                    return Err(CenterlineError::parse_error(
                        path,
                        format!("model '{}' has fewer indices than its faces need", model.name),
                    ));
                };
                mesh.faces.push(face.iter().map(|&i| i + offset).collect());
                start = end;
            }
        }
        debug!("OBJ model '{}': {} faces", model.name, mesh.face_count());
    }
    Ok(mesh)
}

/// Load an STL file (binary or ASCII). STL has no shared vertices beyond exact
/// coordinate matches, which the reader already merges.
fn load_stl(path: &Path) -> CenterlineResult<Mesh> {
    let file = File::open(path).map_err(|e| CenterlineError::io_read(path, e))?;
    let mut reader = BufReader::new(file);
    let stl = stl_io::read_stl(&mut reader)
        .map_err(|e| CenterlineError::parse_error(path, e.to_string()))?;

    let mut mesh = Mesh::with_capacity(stl.vertices.len(), stl.faces.len());
    for v in &stl.vertices {
        mesh.vertices.push(Vertex::from_coords(
            v.0[0] as f64,
            v.0[1] as f64,
            v.0[2] as f64,
        ));
    }
    for face in &stl.faces {
        let [a, b, c] = face.vertices.map(|i| i as u32);
        if a != b && b != c && a != c {
            mesh.faces.push(vec![a, b, c]);
        }
    }
    Ok(mesh)
}

/// Save a mesh, detecting the format from the extension (OBJ or VTP).
pub fn save_mesh(mesh: &Mesh, path: &Path) -> CenterlineResult<()> {
    match MeshFormat::from_path(path) {
        Some(MeshFormat::Obj) => save_obj(mesh, path),
        Some(MeshFormat::Vtp) => save_vtp_mesh(mesh, path),
        _ => Err(unsupported(path)),
    }
}

/// Save a mesh as OBJ, keeping face arity.
pub fn save_obj(mesh: &Mesh, path: &Path) -> CenterlineResult<()> {
    let mut text = String::with_capacity(mesh.vertex_count() * 40 + mesh.face_count() * 20);
    let _ = writeln!(text, "# Vertices: {}", mesh.vertex_count());
    let _ = writeln!(text, "# Faces: {}", mesh.face_count());
    for v in &mesh.vertices {
        let _ = writeln!(text, "v {} {} {}", v.position.x, v.position.y, v.position.z);
    }
    for face in &mesh.faces {
        text.push('f');
        for &i in face {
            let _ = write!(text, " {}", i + 1);
        }
        text.push('\n');
    }
    write_text(path, &text, "save_obj")?;
    info!(
        "Saved {} vertices and {} faces to {:?} (OBJ)",
        mesh.vertex_count(),
        mesh.face_count(),
        path
    );
    Ok(())
}

// ============================================================================
// VTK PolyData
// ============================================================================

/// Arrays read from an ASCII `.vtp` file.
#[derive(Debug, Clone, Default)]
struct VtpArrays {
    points: Vec<f64>,
    radii: Option<Vec<f64>>,
    connectivity: Option<Vec<u32>>,
    offsets: Option<Vec<u32>>,
}

fn parse_numbers<T: std::str::FromStr>(text: &str, path: &Path, name: &str) -> CenterlineResult<Vec<T>> {
    text.split_ascii_whitespace()
        .map(|s| {
            s.parse().map_err(|_| {
                CenterlineError::parse_error(path, format!("bad value '{}' in array {}", s, name))
            })
        })
        .collect()
}

/// Pull the point coordinates, radius array and polygon arrays out of a VTP document.
fn parse_vtp(xml: &str, path: &Path) -> CenterlineResult<VtpArrays> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut arrays = VtpArrays::default();
    let mut section: Vec<Vec<u8>> = Vec::new();
    // (array name, parent element) of the open DataArray
    let mut current: Option<(String, Vec<u8>)> = None;
    let mut text = String::new();
    let mut found_points = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"DataArray" => {
                let mut name = String::new();
                let mut format = String::from("ascii");
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).into_owned();
                    match attr.key.local_name().as_ref() {
                        b"Name" => name = value,
                        b"format" => format = value,
                        _ => {}
                    }
                }
                if format != "ascii" {
                    return Err(CenterlineError::parse_error(
                        path,
                        format!("array '{}' is stored as {}, only ascii is supported", name, format),
                    ));
                }
                current = Some((name, section.last().cloned().unwrap_or_default()));
                text.clear();
            }
            Ok(Event::Start(ref e)) => section.push(e.local_name().as_ref().to_vec()),
            Ok(Event::Text(e)) => {
                if current.is_some() {
                    let chunk = e
                        .unescape()
                        .map_err(|err| CenterlineError::parse_error(path, err.to_string()))?;
                    text.push(' ');
                    text.push_str(&chunk);
                }
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"DataArray" => {
                if let Some((name, parent)) = current.take() {
                    match (name.as_str(), parent.as_slice()) {
                        ("Points", _) | (_, b"Points") => {
                            arrays.points = parse_numbers(&text, path, "Points")?;
                            found_points = true;
                        }
                        (RADIUS_ARRAY, _) => {
                            arrays.radii = Some(parse_numbers(&text, path, RADIUS_ARRAY)?)
                        }
                        ("connectivity", b"Polys") => {
                            arrays.connectivity = Some(parse_numbers(&text, path, "connectivity")?)
                        }
                        ("offsets", b"Polys") => {
                            arrays.offsets = Some(parse_numbers(&text, path, "offsets")?)
                        }
                        _ => {}
                    }
                }
            }
            Ok(Event::End(_)) => {
                section.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(CenterlineError::parse_error(path, format!("XML parse error: {}", e)));
            }
            _ => {}
        }
    }

    if !found_points {
        return Err(CenterlineError::parse_error(path, "no Points array"));
    }
    if arrays.points.len() % 3 != 0 {
        return Err(CenterlineError::parse_error(
            path,
            format!("{} point coordinates is not a multiple of 3", arrays.points.len()),
        ));
    }
    Ok(arrays)
}

fn read_vtp(path: &Path) -> CenterlineResult<VtpArrays> {
    let xml = std::fs::read_to_string(path).map_err(|e| CenterlineError::io_read(path, e))?;
    parse_vtp(&xml, path)
}

fn to_points(coords: &[f64]) -> Vec<Point3<f64>> {
    coords
        .chunks_exact(3)
        .map(|c| Point3::new(c[0], c[1], c[2]))
        .collect()
}

fn load_vtp_mesh(path: &Path) -> CenterlineResult<Mesh> {
    let arrays = read_vtp(path)?;
    let (Some(connectivity), Some(offsets)) = (arrays.connectivity, arrays.offsets) else {
        return Err(CenterlineError::parse_error(path, "no Polys connectivity/offsets arrays"));
    };

    let mut mesh = Mesh::new();
    for p in to_points(&arrays.points) {
        mesh.push_vertex(p);
    }
    let mut start = 0usize;
    for &end in &offsets {
        let end = end as usize;
        let Some(face) = connectivity.get(start..end) else {
            return Err(CenterlineError::parse_error(path, format!("bad polygon offset {}", end)));
        };
        mesh.faces.push(face.to_vec());
        start = end;
    }
    Ok(mesh)
}

fn push_data_array(xml: &mut String, kind: &str, name: &str, components: usize, values: &str) {
    let _ = writeln!(
        xml,
        "        <DataArray type=\"{}\" Name=\"{}\" NumberOfComponents=\"{}\" format=\"ascii\">",
        kind, name, components
    );
    let _ = writeln!(xml, "          {}", values);
    xml.push_str("        </DataArray>\n");
}

fn join<T: std::fmt::Display>(values: impl IntoIterator<Item = T>) -> String {
    let mut out = String::new();
    for (i, v) in values.into_iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{}", v);
    }
    out
}

fn point_text(points: impl Iterator<Item = Point3<f64>>) -> String {
    join(points.flat_map(|p| [p.x, p.y, p.z]))
}

/// Build a PolyData document. `polys` and `lines` are (connectivity, offsets).
fn vtp_document(
    points: &[Point3<f64>],
    radii: Option<&[f64]>,
    lines: Option<(Vec<u32>, Vec<u32>)>,
    polys: Option<(Vec<u32>, Vec<u32>)>,
) -> String {
    let n_lines = lines.as_ref().map_or(0, |l| l.1.len());
    let n_polys = polys.as_ref().map_or(0, |p| p.1.len());

    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\"?>\n");
    xml.push_str("<VTKFile type=\"PolyData\" version=\"0.1\" byte_order=\"LittleEndian\">\n");
    xml.push_str("  <PolyData>\n");
    let _ = writeln!(
        xml,
        "    <Piece NumberOfPoints=\"{}\" NumberOfVerts=\"0\" NumberOfLines=\"{}\" NumberOfStrips=\"0\" NumberOfPolys=\"{}\">",
        points.len(),
        n_lines,
        n_polys
    );

    match radii {
        Some(radii) => {
            let _ = writeln!(xml, "      <PointData Scalars=\"{}\">", RADIUS_ARRAY);
            push_data_array(&mut xml, "Float64", RADIUS_ARRAY, 1, &join(radii.iter()));
            xml.push_str("      </PointData>\n");
        }
        None => xml.push_str("      <PointData>\n      </PointData>\n"),
    }

    xml.push_str("      <Points>\n");
    push_data_array(&mut xml, "Float64", "Points", 3, &point_text(points.iter().copied()));
    xml.push_str("      </Points>\n");

    for (element, cells) in [("Lines", lines), ("Polys", polys)] {
        if let Some((connectivity, offsets)) = cells {
            let _ = writeln!(xml, "      <{}>", element);
            push_data_array(&mut xml, "Int64", "connectivity", 1, &join(connectivity));
            push_data_array(&mut xml, "Int64", "offsets", 1, &join(offsets));
            let _ = writeln!(xml, "      </{}>", element);
        }
    }

    xml.push_str("    </Piece>\n  </PolyData>\n</VTKFile>\n");
    xml
}

/// Save a polygonal mesh as ASCII `.vtp`.
pub fn save_vtp_mesh(mesh: &Mesh, path: &Path) -> CenterlineResult<()> {
    let points: Vec<Point3<f64>> = mesh.vertices.iter().map(|v| v.position).collect();
    let connectivity: Vec<u32> = mesh.faces.iter().flatten().copied().collect();
    let offsets: Vec<u32> = mesh
        .faces
        .iter()
        .scan(0u32, |acc, f| {
            *acc += f.len() as u32;
            Some(*acc)
        })
        .collect();
    let xml = vtp_document(&points, None, None, Some((connectivity, offsets)));
    write_text(path, &xml, "save_vtp")?;
    info!(
        "Saved {} vertices and {} faces to {:?} (VTP)",
        mesh.vertex_count(),
        mesh.face_count(),
        path
    );
    Ok(())
}

// ============================================================================
// Centerlines
// ============================================================================

/// Load a centerline with its minimum radii, if the file carries them.
///
/// VTP files are read as one ordered polyline: points in file order, line cells
/// ignored.
pub fn load_centerline(path: &Path) -> CenterlineResult<Centerline> {
    let format = CenterlineFormat::from_path(path).ok_or_else(|| unsupported(path))?;
    let result = match format {
        CenterlineFormat::Vtp => read_vtp(path).and_then(|arrays| {
            let points = to_points(&arrays.points);
            let radii = arrays.radii.unwrap_or_default();
            if !radii.is_empty() && radii.len() != points.len() {
                return Err(CenterlineError::parse_error(
                    path,
                    format!("{} radii for {} points", radii.len(), points.len()),
                ));
            }
            Ok(Centerline {
                points,
                min_radii: radii,
                ..Default::default()
            })
        }),
        CenterlineFormat::Text => std::fs::read_to_string(path)
            .map_err(|e| CenterlineError::io_read(path, e))
            .and_then(|text| parse_text_centerline(&text, path)),
    };
    log_io("load_centerline", path, &result);

    let centerline = result?;
    if centerline.len() < 2 {
        return Err(CenterlineError::invalid_centerline(format!(
            "{} has {} points",
            path.display(),
            centerline.len()
        )));
    }
    if centerline.min_radii.is_empty() {
        debug!("Centerline has no minimum radii");
    }
    info!(
        points = centerline.len(),
        length = centerline.total_length(),
        "Loaded centerline"
    );
    Ok(centerline)
}

/// Parse `x y z [r]` lines. Blank lines and `#` comments are skipped; commas count
/// as separators. Either every line has a radius or none does.
pub fn parse_text_centerline(text: &str, path: &Path) -> CenterlineResult<Centerline> {
    let mut points = Vec::new();
    let mut radii = Vec::new();
    let mut with_radius: Option<bool> = None;

    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let values: Vec<f64> = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|e| CenterlineError::parse_error(path, format!("line {}: {}", i + 1, e)))?;

        let has_radius = match values.len() {
            3 => false,
            4 => true,
            n => {
                return Err(CenterlineError::parse_error(
                    path,
                    format!("line {}: expected 3 or 4 values, found {}", i + 1, n),
                ));
            }
        };
        if *with_radius.get_or_insert(has_radius) != has_radius {
            return Err(CenterlineError::parse_error(
                path,
                format!("line {}: radius column present on some lines only", i + 1),
            ));
        }
        points.push(Point3::new(values[0], values[1], values[2]));
        if has_radius {
            radii.push(values[3]);
        }
    }

    Ok(Centerline {
        points,
        min_radii: radii,
        ..Default::default()
    })
}

/// Save a centerline as `.vtp` (one polyline cell) or text.
pub fn save_centerline(centerline: &Centerline, path: &Path) -> CenterlineResult<()> {
    centerline.validate()?;
    let format = CenterlineFormat::from_path(path).ok_or_else(|| unsupported(path))?;
    let radii = (!centerline.min_radii.is_empty()).then_some(centerline.min_radii.as_slice());

    let text = match format {
        CenterlineFormat::Vtp => {
            let n = centerline.len() as u32;
            let lines = (n > 0).then(|| ((0..n).collect(), vec![n]));
            vtp_document(&centerline.points, radii, lines, None)
        }
        CenterlineFormat::Text => {
            let mut text = String::new();
            for (i, p) in centerline.points.iter().enumerate() {
                let _ = write!(text, "{} {} {}", p.x, p.y, p.z);
                if let Some(radii) = radii {
                    let _ = write!(text, " {}", radii[i]);
                }
                text.push('\n');
            }
            text
        }
    };
    write_text(path, &text, "save_centerline")?;
    if format == CenterlineFormat::Text && radii.is_none() {
        debug!("Centerline written without radius column");
    }
    info!(points = centerline.len(), path = %path.display(), "Saved centerline");
    Ok(())
}

/// Write every retained cross-section into one mesh file.
pub fn save_sections(centerline: &Centerline, path: &Path) -> CenterlineResult<()> {
    if centerline.sections.is_empty() {
        return Err(CenterlineError::MissingData {
            what: "cross-sections",
            prerequisite: "centerline sections",
        });
    }
    let mut mesh = Mesh::new();
    for section in &centerline.sections {
        mesh.append(&section.geometry);
    }
    if mesh.is_empty() {
        warn!("All cross-sections are empty");
    }
    save_mesh(&mesh, path)
}
