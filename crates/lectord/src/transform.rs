//! Shapes raw engine output into detection records.
//!
//! Engines hand back loosely typed JSON: `null` or an empty array when
//! nothing was found, otherwise an ordered array whose entries look like
//! `[[[x, y], [x, y], [x, y], [x, y]], [text, confidence]]`. The raw value is
//! validated into [`RawDetection`]s first so a malformed engine reply turns
//! into an [`EngineOutputError`] instead of a bogus record.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// A point in image coordinates as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

/// One validated engine detection, still in engine units.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    /// Quadrilateral enclosing the text region.
    pub polygon: [Point; 4],
    /// Recognised text.
    pub text: String,
    /// Engine confidence, copied as reported.
    pub confidence: f64,
}

/// A recognised text region as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionRecord {
    /// Recognised text.
    pub text: String,
    /// Engine confidence.
    pub confidence: f64,
    /// Axis-aligned box `[x, y, width, height]` enclosing the polygon.
    pub bbox: [i64; 4],
    /// Source polygon with coordinates truncated toward zero.
    pub polygon: [[i64; 2]; 4],
}

impl From<&RawDetection> for DetectionRecord {
    fn from(detection: &RawDetection) -> Self {
        Self {
            text: detection.text.clone(),
            confidence: detection.confidence,
            bbox: bounding_box(&detection.polygon),
            polygon: detection.polygon.map(|point| [truncate(point.x), truncate(point.y)]),
        }
    }
}

/// Reasons a raw engine reply could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineOutputError {
    /// The reply was neither absent nor an array.
    #[error("engine output must be an array of detections, found {found}")]
    NotASequence {
        /// JSON type that was found instead.
        found: &'static str,
    },
    /// A single detection was malformed.
    #[error("malformed detection {index}: {problem}")]
    Detection {
        /// Zero-based position of the detection in the reply.
        index: usize,
        /// What was wrong with it.
        problem: DetectionProblem,
    },
}

/// Structural problems within a single detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DetectionProblem {
    /// The entry was not `[polygon, [text, confidence]]`.
    #[error("expected [polygon, [text, confidence]]")]
    Shape,
    /// The polygon did not have four points.
    #[error("polygon must contain exactly 4 points, found {0}")]
    PointCount(usize),
    /// A polygon point was not a pair of numbers.
    #[error("point {0} must be a pair of numbers")]
    Point(usize),
    /// The recognised text was not a string.
    #[error("text must be a string")]
    Text,
    /// The confidence was not a number.
    #[error("confidence must be a number")]
    Confidence,
}

/// Validates the engine's raw per-image output.
///
/// # Errors
///
/// Returns an [`EngineOutputError`] when the value is not `null` or an array,
/// or when any detection deviates from the expected shape.
pub fn parse_raw_output(raw: &Value) -> Result<Vec<RawDetection>, EngineOutputError> {
    let entries = match raw {
        Value::Null => return Ok(Vec::new()),
        Value::Array(entries) => entries,
        other => {
            return Err(EngineOutputError::NotASequence {
                found: json_type(other),
            });
        }
    };

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            parse_detection(entry).map_err(|problem| EngineOutputError::Detection { index, problem })
        })
        .collect()
}

/// Validates and converts raw engine output in one step, preserving order.
///
/// # Errors
///
/// Propagates any [`EngineOutputError`] from [`parse_raw_output`].
pub fn records_from_raw(raw: &Value) -> Result<Vec<DetectionRecord>, EngineOutputError> {
    let detections = parse_raw_output(raw)?;
    Ok(detections.iter().map(DetectionRecord::from).collect())
}

fn parse_detection(entry: &Value) -> Result<RawDetection, DetectionProblem> {
    let Some([polygon, recognition]) = as_pair(entry) else {
        return Err(DetectionProblem::Shape);
    };
    let Some([text, confidence]) = as_pair(recognition) else {
        return Err(DetectionProblem::Shape);
    };

    Ok(RawDetection {
        polygon: parse_polygon(polygon)?,
        text: text.as_str().ok_or(DetectionProblem::Text)?.to_owned(),
        confidence: confidence.as_f64().ok_or(DetectionProblem::Confidence)?,
    })
}

fn parse_polygon(value: &Value) -> Result<[Point; 4], DetectionProblem> {
    let points = value.as_array().ok_or(DetectionProblem::Shape)?;
    let [first, second, third, fourth] = points.as_slice() else {
        return Err(DetectionProblem::PointCount(points.len()));
    };
    Ok([
        parse_point(0, first)?,
        parse_point(1, second)?,
        parse_point(2, third)?,
        parse_point(3, fourth)?,
    ])
}

fn parse_point(index: usize, value: &Value) -> Result<Point, DetectionProblem> {
    let Some([x, y]) = as_pair(value) else {
        return Err(DetectionProblem::Point(index));
    };
    match (x.as_f64(), y.as_f64()) {
        (Some(x), Some(y)) => Ok(Point { x, y }),
        _ => Err(DetectionProblem::Point(index)),
    }
}

fn as_pair(value: &Value) -> Option<&[Value; 2]> {
    value.as_array()?.as_slice().try_into().ok()
}

/// Axis-aligned box enclosing the polygon.
///
/// Extents are measured on the engine's coordinates and only then truncated,
/// so `width` may differ by one from the difference of truncated corners.
#[must_use]
pub fn bounding_box(polygon: &[Point; 4]) -> [i64; 4] {
    let xs = polygon.map(|point| point.x);
    let ys = polygon.map(|point| point.y);
    let (min_x, max_x) = extent(&xs);
    let (min_y, max_y) = extent(&ys);
    [
        truncate(min_x),
        truncate(min_y),
        truncate(max_x - min_x),
        truncate(max_y - min_y),
    ]
}

fn extent(values: &[f64; 4]) -> (f64, f64) {
    values.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), &value| {
        (low.min(value), high.max(value))
    })
}

/// Truncates toward zero; `as` saturates on overflow.
fn truncate(value: f64) -> i64 {
    value.trunc() as i64
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
