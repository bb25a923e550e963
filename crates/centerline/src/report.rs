//! Semicolon-delimited per-vertex report.
//!
//! ```text
//! distance along curve;cross-sectional area at vertex;maximum radius at vertex
//!
//! 0.0;0.7853981633974483;0.5
//! 0.25;0.7812;0.4987
//! ```
//!
//! The distance column is always present. The other columns appear, in a fixed order,
//! only when the matching centerline array is populated. Floats use the shortest
//! round-trip representation with a trailing `.0` on integral values and exponent
//! notation outside `[1e-4, 1e16)`; counts are plain integers.

use std::fmt::Write as _;
use std::path::Path;

use tracing::info;

use crate::curve::Centerline;
use crate::error::{CenterlineError, CenterlineResult};
use crate::tracing_ext::log_io;

/// Report columns in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum ReportColumn {
    Distance,
    MinRadius,
    Area,
    MaxRadius,
    VesicleCount,
    AreaSum,
}

impl ReportColumn {
    pub const ALL: [ReportColumn; 6] = [
        ReportColumn::Distance,
        ReportColumn::MinRadius,
        ReportColumn::Area,
        ReportColumn::MaxRadius,
        ReportColumn::VesicleCount,
        ReportColumn::AreaSum,
    ];

    /// Header label.
    pub fn label(&self) -> &'static str {
        match self {
            ReportColumn::Distance => "distance along curve",
            ReportColumn::MinRadius => "minimum radius at vertex",
            ReportColumn::Area => "cross-sectional area at vertex",
            ReportColumn::MaxRadius => "maximum radius at vertex",
            ReportColumn::VesicleCount => "number of spheres (vesicles) closest to this vertex",
            ReportColumn::AreaSum => "sum of surface areas projected to this vertex",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label.trim())
    }
}

/// The columns of one report, each either empty or one value per centerline vertex.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
pub struct Report {
    pub distances: Vec<f64>,
    pub min_radii: Vec<f64>,
    pub areas: Vec<f64>,
    pub max_radii: Vec<f64>,
    pub vesicle_counts: Vec<u32>,
    pub area_sums: Vec<f64>,
}

impl Report {
    /// Collect the populated arrays of a centerline.
    pub fn from_centerline(centerline: &Centerline) -> CenterlineResult<Self> {
        centerline.validate()?;
        Ok(Self {
            distances: centerline.arc_lengths(),
            min_radii: centerline.min_radii.clone(),
            areas: centerline.cross_sectional_areas.clone(),
            max_radii: centerline.max_radii.clone(),
            vesicle_counts: centerline.vesicle_counts.clone(),
            area_sums: centerline.area_sums.clone(),
        })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// Columns present, in file order.
    pub fn columns(&self) -> Vec<ReportColumn> {
        ReportColumn::ALL
            .into_iter()
            .filter(|c| match c {
                ReportColumn::Distance => true,
                ReportColumn::MinRadius => !self.min_radii.is_empty(),
                ReportColumn::Area => !self.areas.is_empty(),
                ReportColumn::MaxRadius => !self.max_radii.is_empty(),
                ReportColumn::VesicleCount => !self.vesicle_counts.is_empty(),
                ReportColumn::AreaSum => !self.area_sums.is_empty(),
            })
            .collect()
    }

    fn cell(&self, column: ReportColumn, row: usize) -> String {
        match column {
            ReportColumn::Distance => format_float(self.distances[row]),
            ReportColumn::MinRadius => format_float(self.min_radii[row]),
            ReportColumn::Area => format_float(self.areas[row]),
            ReportColumn::MaxRadius => format_float(self.max_radii[row]),
            ReportColumn::VesicleCount => self.vesicle_counts[row].to_string(),
            ReportColumn::AreaSum => format_float(self.area_sums[row]),
        }
    }

    fn check_alignment(&self) -> CenterlineResult<()> {
        let n = self.distances.len();
        let lengths = [
            ("min_radii", self.min_radii.len()),
            ("cross_sectional_areas", self.areas.len()),
            ("max_radii", self.max_radii.len()),
            ("vesicle_counts", self.vesicle_counts.len()),
            ("area_sums", self.area_sums.len()),
        ];
        for (name, actual) in lengths {
            if actual != 0 && actual != n {
                return Err(CenterlineError::MisalignedArray {
                    name,
                    expected: n,
                    actual,
                });
            }
        }
        Ok(())
    }

    /// Render the report text.
    pub fn render(&self) -> CenterlineResult<String> {
        self.check_alignment()?;
        let columns = self.columns();

        let header: Vec<&str> = columns.iter().map(ReportColumn::label).collect();
        let mut out = header.join(";");
        out.push_str("\n\n");

        for row in 0..self.len() {
            let cells: Vec<String> = columns.iter().map(|&c| self.cell(c, row)).collect();
            // Writing to a String cannot fail.
            let _ = writeln!(out, "{}", cells.join(";"));
        }
        Ok(out)
    }

    /// Parse report text.
    pub fn parse(text: &str) -> CenterlineResult<Self> {
        let mut lines = text.lines().enumerate();
        let (_, header) = lines.next().ok_or_else(|| CenterlineError::ReportParse {
            line: 1,
            details: "empty report".into(),
        })?;

        let columns = header
            .split(';')
            .map(|label| {
                ReportColumn::from_label(label).ok_or_else(|| CenterlineError::ReportParse {
                    line: 1,
                    details: format!("unknown column '{}'", label),
                })
            })
            .collect::<CenterlineResult<Vec<_>>>()?;
        if columns.first() != Some(&ReportColumn::Distance) {
            return Err(CenterlineError::ReportParse {
                line: 1,
                details: "first column must be the distance along the curve".into(),
            });
        }

        let mut report = Report::default();
        for (i, line) in lines {
            let line_no = i + 1;
            if line.trim().is_empty() {
                continue;
            }
            let cells: Vec<&str> = line.split(';').collect();
            if cells.len() != columns.len() {
                return Err(CenterlineError::ReportParse {
                    line: line_no,
                    details: format!("expected {} columns, found {}", columns.len(), cells.len()),
                });
            }
            for (&column, cell) in columns.iter().zip(cells) {
                report.push_cell(column, cell.trim(), line_no)?;
            }
        }
        Ok(report)
    }

    fn push_cell(&mut self, column: ReportColumn, cell: &str, line: usize) -> CenterlineResult<()> {
        let bad = |what: &str| CenterlineError::ReportParse {
            line,
            details: format!("invalid {} '{}'", what, cell),
        };
        if column == ReportColumn::VesicleCount {
            self.vesicle_counts
                .push(cell.parse().map_err(|_| bad("count"))?);
            return Ok(());
        }
        let value: f64 = cell.parse().map_err(|_| bad("number"))?;
        match column {
            ReportColumn::Distance => self.distances.push(value),
            ReportColumn::MinRadius => self.min_radii.push(value),
            ReportColumn::Area => self.areas.push(value),
            ReportColumn::MaxRadius => self.max_radii.push(value),
            ReportColumn::AreaSum => self.area_sums.push(value),
            ReportColumn::VesicleCount => {}
        }
        Ok(())
    }

    /// Write the report to a file.
    pub fn save(&self, path: &Path) -> CenterlineResult<()> {
        let text = self.render()?;
        let result = std::fs::write(path, text).map_err(|e| CenterlineError::io_write(path, e));
        log_io("save_report", path, &result);
        result?;
        info!(path = %path.display(), rows = self.len(), columns = self.columns().len(), "Wrote report");
        Ok(())
    }

    /// Read a report file.
    pub fn load(path: &Path) -> CenterlineResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| CenterlineError::io_read(path, e))?;
        let report = Self::parse(&text);
        log_io("load_report", path, &report);
        report
    }
}

/// Shortest round-trip text of `x`, in the conventional scripting-language style:
/// `1.0`, `0.25`, `1e-05`, `1.5e+16`, `nan`, `inf`.
pub fn format_float(x: f64) -> String {
    if x.is_nan() {
        return "nan".into();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf".into() } else { "-inf".into() };
    }
    if x == 0.0 {
        return if x.is_sign_negative() { "-0.0".into() } else { "0.0".into() };
    }

    // `{:e}` yields the shortest round-trip digits, e.g. "-1.2345e-5".
    let sci = format!("{:e}", x);
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let mut out = String::new();
    if x < 0.0 {
        out.push('-');
    }

    if !(-4..16).contains(&exponent) {
        out.push_str(&digits[..1]);
        if digits.len() > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        let sign = if exponent < 0 { '-' } else { '+' };
        let _ = write!(out, "e{}{:02}", sign, exponent.abs());
    } else if exponent < 0 {
        out.push_str("0.");
        out.push_str(&"0".repeat((-exponent - 1) as usize));
        out.push_str(&digits);
    } else {
        let int_len = exponent as usize + 1;
        if digits.len() <= int_len {
            out.push_str(&digits);
            out.push_str(&"0".repeat(int_len - digits.len()));
            out.push_str(".0");
        } else {
            out.push_str(&digits[..int_len]);
            out.push('.');
            out.push_str(&digits[int_len..]);
        }
    }
    out
}
