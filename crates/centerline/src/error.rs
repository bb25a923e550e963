//! Error types for centerline operations with rich diagnostics.
//!
//! Every error carries:
//! - A machine-readable error code
//! - A category (configuration, topology, input, I/O, cancellation)
//! - Location information where one exists (centerline vertex, face, file line)
//! - A recovery suggestion for the CLI
//!
//! # Error Codes
//!
//! Each error has a unique code in the format `XSEC-XXXX`:
//! - `XSEC-1xxx`: I/O errors (file reading, writing, parsing)
//! - `XSEC-2xxx`: Input errors (empty meshes, malformed centerlines, missing data)
//! - `XSEC-3xxx`: Geometry errors raised while computing a cross-section
//! - `XSEC-4xxx`: Report and configuration errors
//!
//! # Example
//!
//! ```rust,ignore
//! use centerline::{CenterlineError, ErrorCategory};
//!
//! let err = CenterlineError::sparse_region("axon_07", 12, 40, 100, 0.5, 1e-5);
//! assert_eq!(err.code().as_str(), "XSEC-3001");
//! assert_eq!(err.category(), ErrorCategory::Configuration);
//! ```

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for centerline operations.
pub type CenterlineResult<T> = Result<T, CenterlineError>;

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // I/O errors (1xxx)
    /// XSEC-1001: Failed to read file
    IoRead = 1001,
    /// XSEC-1002: Failed to write file
    IoWrite = 1002,
    /// XSEC-1003: Failed to parse file contents
    ParseError = 1003,
    /// XSEC-1004: Unsupported file extension
    UnsupportedFormat = 1004,

    // Input errors (2xxx)
    /// XSEC-2001: Mesh has no vertices or faces
    EmptyMesh = 2001,
    /// XSEC-2002: Face references a vertex that does not exist
    InvalidVertexIndex = 2002,
    /// XSEC-2003: Centerline is too short or malformed
    InvalidCenterline = 2003,
    /// XSEC-2004: Two consecutive centerline points coincide
    DegenerateSegment = 2004,
    /// XSEC-2005: Per-vertex array length differs from the point count
    MisalignedArray = 2005,
    /// XSEC-2006: A prerequisite metric has not been computed
    MissingData = 2006,

    // Geometry errors (3xxx)
    /// XSEC-3001: Too few mesh vertices inside the search radius
    SparseRegion = 3001,
    /// XSEC-3002: Plane cut produced no cross-section candidate
    NoCrossSection = 3002,
    /// XSEC-3003: No surface path between two vertices
    PathNotFound = 3003,
    /// XSEC-3004: Operation cancelled by the caller
    Cancelled = 3004,

    // Report and config errors (4xxx)
    /// XSEC-4001: Malformed report file
    ReportParse = 4001,
    /// XSEC-4002: Invalid parameter value or config file
    InvalidConfig = 4002,
}

impl ErrorCode {
    /// Returns the error code as a string in the format `XSEC-XXXX`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::IoRead => "XSEC-1001",
            ErrorCode::IoWrite => "XSEC-1002",
            ErrorCode::ParseError => "XSEC-1003",
            ErrorCode::UnsupportedFormat => "XSEC-1004",
            ErrorCode::EmptyMesh => "XSEC-2001",
            ErrorCode::InvalidVertexIndex => "XSEC-2002",
            ErrorCode::InvalidCenterline => "XSEC-2003",
            ErrorCode::DegenerateSegment => "XSEC-2004",
            ErrorCode::MisalignedArray => "XSEC-2005",
            ErrorCode::MissingData => "XSEC-2006",
            ErrorCode::SparseRegion => "XSEC-3001",
            ErrorCode::NoCrossSection => "XSEC-3002",
            ErrorCode::PathNotFound => "XSEC-3003",
            ErrorCode::Cancelled => "XSEC-3004",
            ErrorCode::ReportParse => "XSEC-4001",
            ErrorCode::InvalidConfig => "XSEC-4002",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Broad classes of failure.
///
/// `Configuration` and `Topology` are fatal for the centerline vertex that raised
/// them; `Input` errors end an operation before it modifies any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The search radius or another parameter does not suit the mesh scale.
    Configuration,
    /// The plane cut produced geometry the resolver cannot interpret.
    Topology,
    /// Wrong or incomplete inputs supplied by the caller.
    Input,
    /// Filesystem or format problems.
    Io,
    /// The caller asked the operation to stop.
    Cancelled,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Topology => "topology",
            ErrorCategory::Input => "input",
            ErrorCategory::Io => "i/o",
            ErrorCategory::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Recovery suggestions shown next to an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Change one or more parameters.
    AdjustParameters { parameters: Vec<(String, String)> },
    /// Check the source data for the listed problems.
    CheckSourceData { checks: Vec<String> },
    /// Run another command first.
    RunFirst { command: String },
    /// Use a different file format.
    UseDifferentFormat { suggested: Vec<String> },
    /// No automatic recovery available.
    None,
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoverySuggestion::AdjustParameters { parameters } => {
                let params: Vec<String> = parameters
                    .iter()
                    .map(|(k, v)| format!("{} = {}", k, v))
                    .collect();
                write!(f, "Try adjusting: {}", params.join(", "))
            }
            RecoverySuggestion::CheckSourceData { checks } => {
                write!(f, "Check the input for: {}", checks.join(", "))
            }
            RecoverySuggestion::RunFirst { command } => {
                write!(f, "Run `{}` first", command)
            }
            RecoverySuggestion::UseDifferentFormat { suggested } => {
                write!(f, "Try using a different format: {}", suggested.join(", "))
            }
            RecoverySuggestion::None => write!(f, "No automatic recovery available"),
        }
    }
}

/// Where an error happened.
#[derive(Debug, Clone)]
pub enum ErrorLocation {
    /// A centerline vertex, optionally with the mesh it was cut against.
    CenterlineVertex { index: usize, mesh: Option<String> },
    /// A mesh face.
    Face { index: usize },
    /// A position in a file.
    File { path: PathBuf, line: Option<usize> },
}

impl std::fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorLocation::CenterlineVertex { index, mesh } => match mesh {
                Some(name) => write!(f, "centerline vertex {} (mesh '{}')", index, name),
                None => write!(f, "centerline vertex {}", index),
            },
            ErrorLocation::Face { index } => write!(f, "face {}", index),
            ErrorLocation::File { path, line } => match line {
                Some(l) => write!(f, "{}:{}", path.display(), l),
                None => write!(f, "{}", path.display()),
            },
        }
    }
}

/// Errors that can occur while computing centerline metrics.
#[derive(Debug, Error, Diagnostic)]
pub enum CenterlineError {
    /// Error reading from a file.
    #[error("failed to read {path}")]
    #[diagnostic(
        code(centerline::io::read),
        help("Check that the file exists and is readable")
    )]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error writing to a file.
    #[error("failed to write {path}")]
    #[diagnostic(
        code(centerline::io::write),
        help("Check that the directory exists and is writable")
    )]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error parsing a mesh or centerline file.
    #[error("failed to parse {path}: {details}")]
    #[diagnostic(code(centerline::parse::error))]
    ParseError { path: PathBuf, details: String },

    /// Unsupported file extension.
    #[error("unsupported file format: {extension:?}")]
    #[diagnostic(
        code(centerline::format::unsupported),
        help("Meshes: OBJ, STL. Centerlines: VTP, TXT, XYZ")
    )]
    UnsupportedFormat { extension: Option<String> },

    /// Mesh without vertices or faces.
    #[error("mesh is empty: {details}")]
    #[diagnostic(code(centerline::input::empty_mesh))]
    EmptyMesh { details: String },

    /// Face references a vertex that does not exist.
    #[error(
        "invalid vertex index: face {face_index} references vertex {vertex_index}, but mesh only has {vertex_count} vertices"
    )]
    #[diagnostic(code(centerline::input::vertex_index))]
    InvalidVertexIndex {
        face_index: usize,
        vertex_index: u32,
        vertex_count: usize,
    },

    /// Centerline unusable for the requested operation.
    #[error("invalid centerline: {details}")]
    #[diagnostic(code(centerline::input::centerline))]
    InvalidCenterline { details: String },

    /// Two consecutive centerline points coincide, so no tangent exists.
    #[error("centerline points {index} and {} coincide", .index + 1)]
    #[diagnostic(
        code(centerline::input::degenerate_segment),
        help("Remove duplicate points or resample the centerline")
    )]
    DegenerateSegment { index: usize },

    /// A per-vertex array does not have one entry per centerline point.
    #[error("{name} has {actual} entries, expected {expected}")]
    #[diagnostic(code(centerline::input::misaligned))]
    MisalignedArray {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A prerequisite metric is missing.
    #[error("no {what} found on this centerline")]
    #[diagnostic(code(centerline::input::missing))]
    MissingData {
        what: &'static str,
        prerequisite: &'static str,
    },

    /// Too few mesh vertices inside the search radius.
    #[error(
        "found {found} mesh vertices within {search_radius} of centerline vertex {index} on '{mesh}', expected at least {required} (no cut attempted, tolerance {tolerance:e})"
    )]
    #[diagnostic(
        code(centerline::geometry::sparse_region),
        help("The search radius is too small for this mesh scale")
    )]
    SparseRegion {
        mesh: String,
        index: usize,
        found: usize,
        required: usize,
        search_radius: f64,
        /// Tolerance the first cut would have used; the region check runs before any cut.
        tolerance: f64,
    },

    /// The plane cut produced no face large enough to be a cross-section.
    #[error(
        "no cross-section at centerline vertex {index} on '{mesh}' (tolerance {tolerance:e}): {details}"
    )]
    #[diagnostic(
        code(centerline::geometry::no_cross_section),
        help("The centerline may leave the mesh here, or the mesh may need cleaning")
    )]
    NoCrossSection {
        mesh: String,
        index: usize,
        tolerance: f64,
        face_count: usize,
        details: String,
    },

    /// No connected surface path between two mesh vertices.
    #[error("no surface path between vertices {start} and {end}")]
    #[diagnostic(code(centerline::geometry::no_path))]
    PathNotFound { start: usize, end: usize },

    /// The caller cancelled the operation.
    #[error("cancelled before centerline vertex {index}")]
    #[diagnostic(code(centerline::cancelled))]
    Cancelled { index: usize },

    /// Malformed report file.
    #[error("report line {line}: {details}")]
    #[diagnostic(code(centerline::report::parse))]
    ReportParse { line: usize, details: String },

    /// Invalid parameter value or config file.
    #[error("invalid configuration: {details}")]
    #[diagnostic(code(centerline::config::invalid))]
    InvalidConfig { details: String },
}

impl CenterlineError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            CenterlineError::IoRead { .. } => ErrorCode::IoRead,
            CenterlineError::IoWrite { .. } => ErrorCode::IoWrite,
            CenterlineError::ParseError { .. } => ErrorCode::ParseError,
            CenterlineError::UnsupportedFormat { .. } => ErrorCode::UnsupportedFormat,
            CenterlineError::EmptyMesh { .. } => ErrorCode::EmptyMesh,
            CenterlineError::InvalidVertexIndex { .. } => ErrorCode::InvalidVertexIndex,
            CenterlineError::InvalidCenterline { .. } => ErrorCode::InvalidCenterline,
            CenterlineError::DegenerateSegment { .. } => ErrorCode::DegenerateSegment,
            CenterlineError::MisalignedArray { .. } => ErrorCode::MisalignedArray,
            CenterlineError::MissingData { .. } => ErrorCode::MissingData,
            CenterlineError::SparseRegion { .. } => ErrorCode::SparseRegion,
            CenterlineError::NoCrossSection { .. } => ErrorCode::NoCrossSection,
            CenterlineError::PathNotFound { .. } => ErrorCode::PathNotFound,
            CenterlineError::Cancelled { .. } => ErrorCode::Cancelled,
            CenterlineError::ReportParse { .. } => ErrorCode::ReportParse,
            CenterlineError::InvalidConfig { .. } => ErrorCode::InvalidConfig,
        }
    }

    /// Returns the failure class.
    pub fn category(&self) -> ErrorCategory {
        match self {
            CenterlineError::IoRead { .. }
            | CenterlineError::IoWrite { .. }
            | CenterlineError::ParseError { .. }
            | CenterlineError::UnsupportedFormat { .. }
            | CenterlineError::ReportParse { .. } => ErrorCategory::Io,
            CenterlineError::SparseRegion { .. } | CenterlineError::InvalidConfig { .. } => {
                ErrorCategory::Configuration
            }
            CenterlineError::NoCrossSection { .. } | CenterlineError::PathNotFound { .. } => {
                ErrorCategory::Topology
            }
            CenterlineError::Cancelled { .. } => ErrorCategory::Cancelled,
            CenterlineError::EmptyMesh { .. }
            | CenterlineError::InvalidVertexIndex { .. }
            | CenterlineError::InvalidCenterline { .. }
            | CenterlineError::DegenerateSegment { .. }
            | CenterlineError::MisalignedArray { .. }
            | CenterlineError::MissingData { .. } => ErrorCategory::Input,
        }
    }

    /// True for errors that abort the computation at one centerline vertex.
    pub fn is_fatal_geometry(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Configuration | ErrorCategory::Topology
        ) && self.vertex_index().is_some()
    }

    /// Centerline vertex the error refers to, if any.
    pub fn vertex_index(&self) -> Option<usize> {
        match self {
            CenterlineError::SparseRegion { index, .. }
            | CenterlineError::NoCrossSection { index, .. }
            | CenterlineError::DegenerateSegment { index }
            | CenterlineError::Cancelled { index } => Some(*index),
            _ => None,
        }
    }

    /// Returns a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self {
            CenterlineError::IoRead { .. } => RecoverySuggestion::CheckSourceData {
                checks: vec!["file exists".into(), "file permissions".into()],
            },
            CenterlineError::IoWrite { .. } => RecoverySuggestion::CheckSourceData {
                checks: vec!["directory exists".into(), "write permissions".into()],
            },
            CenterlineError::ParseError { .. } => RecoverySuggestion::CheckSourceData {
                checks: vec!["file encoding".into(), "export settings".into()],
            },
            CenterlineError::UnsupportedFormat { .. } => RecoverySuggestion::UseDifferentFormat {
                suggested: vec!["OBJ".into(), "STL".into(), "VTP".into()],
            },
            CenterlineError::EmptyMesh { .. } | CenterlineError::InvalidVertexIndex { .. } => {
                RecoverySuggestion::CheckSourceData {
                    checks: vec!["mesh has geometry".into(), "face indices".into()],
                }
            }
            CenterlineError::InvalidCenterline { .. } => RecoverySuggestion::CheckSourceData {
                checks: vec!["centerline has at least two points".into()],
            },
            CenterlineError::DegenerateSegment { .. } => RecoverySuggestion::RunFirst {
                command: "centerline resample".into(),
            },
            CenterlineError::MisalignedArray { .. } => RecoverySuggestion::CheckSourceData {
                checks: vec!["one value per centerline point".into()],
            },
            CenterlineError::MissingData { prerequisite, .. } => RecoverySuggestion::RunFirst {
                command: (*prerequisite).to_string(),
            },
            CenterlineError::SparseRegion { search_radius, .. } => {
                RecoverySuggestion::AdjustParameters {
                    parameters: vec![(
                        "search_radius".into(),
                        format!("larger than {}", search_radius),
                    )],
                }
            }
            CenterlineError::NoCrossSection { .. } => RecoverySuggestion::RunFirst {
                command: "centerline trim".into(),
            },
            CenterlineError::PathNotFound { .. } => RecoverySuggestion::CheckSourceData {
                checks: vec!["both vertices lie on the same connected surface".into()],
            },
            CenterlineError::Cancelled { .. } => RecoverySuggestion::None,
            CenterlineError::ReportParse { .. } => RecoverySuggestion::CheckSourceData {
                checks: vec!["header row".into(), "semicolon delimiters".into()],
            },
            CenterlineError::InvalidConfig { .. } => RecoverySuggestion::CheckSourceData {
                checks: vec!["parameter names".into(), "value ranges".into()],
            },
        }
    }

    /// Returns location information if available.
    pub fn location(&self) -> Option<ErrorLocation> {
        match self {
            CenterlineError::SparseRegion { index, mesh, .. }
            | CenterlineError::NoCrossSection { index, mesh, .. } => {
                Some(ErrorLocation::CenterlineVertex {
                    index: *index,
                    mesh: Some(mesh.clone()),
                })
            }
            CenterlineError::DegenerateSegment { index } | CenterlineError::Cancelled { index } => {
                Some(ErrorLocation::CenterlineVertex {
                    index: *index,
                    mesh: None,
                })
            }
            CenterlineError::InvalidVertexIndex { face_index, .. } => Some(ErrorLocation::Face {
                index: *face_index,
            }),
            CenterlineError::IoRead { path, .. }
            | CenterlineError::IoWrite { path, .. }
            | CenterlineError::ParseError { path, .. } => Some(ErrorLocation::File {
                path: path.clone(),
                line: None,
            }),
            _ => None,
        }
    }

    // Constructor helpers for common error patterns

    /// Create an IoRead error.
    pub fn io_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CenterlineError::IoRead {
            path: path.into(),
            source,
        }
    }

    /// Create an IoWrite error.
    pub fn io_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CenterlineError::IoWrite {
            path: path.into(),
            source,
        }
    }

    /// Create a ParseError.
    pub fn parse_error(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        CenterlineError::ParseError {
            path: path.into(),
            details: details.into(),
        }
    }

    /// Create an InvalidCenterline error.
    pub fn invalid_centerline(details: impl Into<String>) -> Self {
        CenterlineError::InvalidCenterline {
            details: details.into(),
        }
    }

    /// Create a SparseRegion error.
    pub fn sparse_region(
        mesh: impl Into<String>,
        index: usize,
        found: usize,
        required: usize,
        search_radius: f64,
        tolerance: f64,
    ) -> Self {
        CenterlineError::SparseRegion {
            mesh: mesh.into(),
            index,
            found,
            required,
            search_radius,
            tolerance,
        }
    }

    /// Create a NoCrossSection error.
    pub fn no_cross_section(
        mesh: impl Into<String>,
        index: usize,
        tolerance: f64,
        face_count: usize,
        details: impl Into<String>,
    ) -> Self {
        CenterlineError::NoCrossSection {
            mesh: mesh.into(),
            index,
            tolerance,
            face_count,
            details: details.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(details: impl Into<String>) -> Self {
        CenterlineError::InvalidConfig {
            details: details.into(),
        }
    }
}
