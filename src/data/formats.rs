//! Input shorthands accepted besides GeoJSON: bare coordinate arrays and WKT

use crate::{
    data::geojson::{Geometry, Position},
    Result, StudioError,
};
use serde_json::Value;

/// Supported raw input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    GeoJson,
    /// `[lng, lat]` or `[[lng, lat], ...]`
    Coordinates,
    /// Well-Known Text
    Wkt,
}

const WKT_KEYWORDS: [&str; 6] = [
    "POINT",
    "LINESTRING",
    "POLYGON",
    "MULTIPOINT",
    "MULTILINESTRING",
    "MULTIPOLYGON",
];

impl InputFormat {
    /// Detects the format of a raw text payload
    pub fn detect(data: &str) -> Option<InputFormat> {
        let trimmed = data.trim_start();

        if trimmed.starts_with('{') {
            return Some(InputFormat::GeoJson);
        }
        if trimmed.starts_with('[') {
            return Some(InputFormat::Coordinates);
        }

        let keyword = wkt_keyword(trimmed).to_ascii_uppercase();
        WKT_KEYWORDS
            .contains(&keyword.as_str())
            .then_some(InputFormat::Wkt)
    }
}

fn wkt_keyword(text: &str) -> &str {
    let end = text
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(text.len());
    &text[..end]
}

/// Interprets a bare coordinate array.
///
/// `[lng, lat]` is a point. A list of positions is a line, or a polygon when
/// it has more than two positions and the first equals the last.
pub fn parse_coordinates(coords: &[Value]) -> Result<Geometry> {
    let first = coords
        .first()
        .ok_or_else(|| StudioError::ParseError("Empty coordinates array".into()))?;

    if first.is_number() {
        let position = position_from_values(coords).ok_or_else(|| {
            StudioError::ParseError("Could not interpret coordinate array".into())
        })?;
        return Ok(Geometry::Point {
            coordinates: position,
        });
    }

    let positions = coords
        .iter()
        .map(|value| value.as_array().and_then(|v| position_from_values(v)))
        .collect::<Option<Vec<Position>>>()
        .ok_or_else(|| StudioError::ParseError("Could not interpret coordinate array".into()))?;

    if positions.len() > 2 && positions.first() == positions.last() {
        Ok(Geometry::Polygon {
            coordinates: vec![positions],
        })
    } else {
        Ok(Geometry::LineString {
            coordinates: positions,
        })
    }
}

/// A position needs at least two finite numbers
fn position_from_values(values: &[Value]) -> Option<Position> {
    if values.len() < 2 {
        return None;
    }
    values
        .iter()
        .map(|v| v.as_f64().filter(|n| n.is_finite()))
        .collect()
}

/// Parsed parenthesized WKT body
#[derive(Debug, Clone, PartialEq)]
enum WktNode {
    Position(Position),
    Group(Vec<WktNode>),
}

struct WktReader<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> WktReader<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn expect(&mut self, c: char) -> Result<()> {
        self.skip_whitespace();
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", c)))
        }
    }

    fn error(&self, message: &str) -> StudioError {
        StudioError::ParseError(format!("Could not parse WKT at offset {}: {}", self.pos, message))
    }

    fn group(&mut self) -> Result<Vec<WktNode>> {
        self.expect('(')?;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            let item = if self.peek() == Some('(') {
                WktNode::Group(self.group()?)
            } else {
                WktNode::Position(self.position()?)
            };
            items.push(item);

            self.skip_whitespace();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(')') => {
                    self.pos += 1;
                    return Ok(items);
                }
                _ => return Err(self.error("expected ',' or ')'")),
            }
        }
    }

    fn position(&mut self) -> Result<Position> {
        let rest = self.rest();
        let end = rest.find([',', ')', '(']).unwrap_or(rest.len());
        let text = &rest[..end];
        self.pos += end;

        let position = text
            .split_whitespace()
            .map(|n| n.parse::<f64>().ok().filter(|v| v.is_finite()))
            .collect::<Option<Vec<f64>>>()
            .filter(|p| p.len() >= 2)
            .ok_or_else(|| self.error(&format!("invalid position '{}'", text.trim())))?;
        Ok(position)
    }
}

fn positions(nodes: Vec<WktNode>) -> Result<Vec<Position>> {
    nodes
        .into_iter()
        .map(|node| match node {
            WktNode::Position(p) => Ok(p),
            // MULTIPOINT ((1 2), (3 4))
            WktNode::Group(mut inner) if inner.len() == 1 => match inner.pop() {
                Some(WktNode::Position(p)) => Ok(p),
                _ => Err(StudioError::ParseError("Nested WKT group where a position was expected".into())),
            },
            WktNode::Group(_) => Err(StudioError::ParseError(
                "Nested WKT group where a position was expected".into(),
            )),
        })
        .collect()
}

fn rings(nodes: Vec<WktNode>) -> Result<Vec<Vec<Position>>> {
    nodes
        .into_iter()
        .map(|node| match node {
            WktNode::Group(inner) => positions(inner),
            WktNode::Position(_) => Err(StudioError::ParseError(
                "WKT position where a ring was expected".into(),
            )),
        })
        .collect()
}

fn polygons(nodes: Vec<WktNode>) -> Result<Vec<Vec<Vec<Position>>>> {
    nodes
        .into_iter()
        .map(|node| match node {
            WktNode::Group(inner) => rings(inner),
            WktNode::Position(_) => Err(StudioError::ParseError(
                "WKT position where a polygon was expected".into(),
            )),
        })
        .collect()
}

/// Parses a single WKT geometry. `EMPTY` geometries and collections are rejected.
pub fn parse_wkt(text: &str) -> Result<Geometry> {
    let trimmed = text.trim();
    let keyword = wkt_keyword(trimmed).to_ascii_uppercase();
    let body = &trimmed[keyword.len()..];

    if body.trim().eq_ignore_ascii_case("EMPTY") {
        return Err(StudioError::ParseError(format!("{} EMPTY has no coordinates", keyword)));
    }

    let mut reader = WktReader::new(body);
    let nodes = reader.group()?;
    reader.skip_whitespace();
    if !reader.rest().is_empty() {
        return Err(reader.error("trailing characters"));
    }

    match keyword.as_str() {
        "POINT" => {
            let mut points = positions(nodes)?;
            if points.len() != 1 {
                return Err(StudioError::ParseError("POINT takes exactly one position".into()));
            }
            Ok(Geometry::Point {
                coordinates: points.remove(0),
            })
        }
        "LINESTRING" => Ok(Geometry::LineString {
            coordinates: positions(nodes)?,
        }),
        "POLYGON" => Ok(Geometry::Polygon {
            coordinates: rings(nodes)?,
        }),
        "MULTIPOINT" => Ok(Geometry::MultiPoint {
            coordinates: positions(nodes)?,
        }),
        "MULTILINESTRING" => Ok(Geometry::MultiLineString {
            coordinates: rings(nodes)?,
        }),
        "MULTIPOLYGON" => Ok(Geometry::MultiPolygon {
            coordinates: polygons(nodes)?,
        }),
        other => Err(StudioError::UnsupportedFormat(format!(
            "WKT geometry type '{}'",
            other
        ))),
    }
}
