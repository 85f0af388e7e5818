use crate::geom::*;
use nalgebra_glm as glm;
use roxmltree as xml;
use serde::{Serialize, Deserialize};
use std::fmt;

/// The fixed set of floors a building drawing may contain, in stacking
/// order. Floor groups in the drawing are recognized by these names.
#[derive(Copy,Clone,PartialEq,Eq,Hash,PartialOrd,Ord)]
#[derive(Debug)]
#[derive(Serialize,Deserialize)]
pub enum FloorId { Ground, Mezzanine }

impl FloorId {
    pub const ALL :[FloorId; 2] = [FloorId::Ground, FloorId::Mezzanine];

    pub fn as_str(&self) -> &'static str {
        match self {
            FloorId::Ground => "ground",
            FloorId::Mezzanine => "mezzanine",
        }
    }

    pub fn from_str(s :&str) -> Option<FloorId> {
        match s {
            "ground" => Some(FloorId::Ground),
            "mezzanine" => Some(FloorId::Mezzanine),
            _ => None,
        }
    }
}

impl fmt::Display for FloorId {
    fn fmt(&self, f :&mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One straight piece of walkable route. Polylines in the drawing are
/// decomposed into these before anything else sees them.
#[derive(Copy,Clone)]
#[derive(Debug)]
#[derive(Serialize,Deserialize)]
pub struct Segment {
    pub p1 :PtC,
    pub p2 :PtC,
}

/// A place or transition marker: a circle with a semantic identifier.
#[derive(Clone)]
#[derive(Debug)]
#[derive(Serialize,Deserialize)]
pub struct Marker {
    pub id :String,
    pub point :PtC,
    pub label :Option<String>,
}

#[derive(Clone)]
#[derive(Debug)]
#[derive(Serialize,Deserialize)]
pub struct FloorScene {
    pub floor :FloorId,
    pub segments :Vec<Segment>,
    pub places :Vec<Marker>,
    pub transitions :Vec<Marker>,
}

/// Immutable intermediate representation of one floorplan drawing: every
/// navigation annotation pulled out of the SVG as plain records. The
/// renderable geometry stays with the caller; graph construction only
/// ever reads this.
#[derive(Clone)]
#[derive(Debug)]
#[derive(Serialize,Deserialize)]
pub struct FloorPlan {
    pub floors :Vec<FloorScene>,
}

pub type ByteOffset = usize;

#[derive(Debug)]
pub enum SceneError {
    Xml(xml::Error),
    MissingSection { section :&'static str, floor :Option<FloorId> },
    MissingAttribute { name :&'static str, pos :ByteOffset },
    BadNumber { attr :&'static str, pos :ByteOffset },
}

impl fmt::Display for SceneError {
    fn fmt(&self, f :&mut fmt::Formatter) -> fmt::Result {
        match self {
            SceneError::Xml(e) => write!(f, "svg parse error: {}", e),
            SceneError::MissingSection { section, floor: Some(floor) } =>
                write!(f, "#{} group not found in floor {}", section, floor),
            SceneError::MissingSection { section, floor: None } =>
                write!(f, "#{} group not found in svg", section),
            SceneError::MissingAttribute { name, pos } =>
                write!(f, "missing attribute {} at byte {}", name, pos),
            SceneError::BadNumber { attr, pos } =>
                write!(f, "malformed number in attribute {} at byte {}", attr, pos),
        }
    }
}

impl std::error::Error for SceneError {}

impl From<xml::Error> for SceneError {
    fn from(e :xml::Error) -> SceneError { SceneError::Xml(e) }
}

impl FloorPlan {
    /// Parse an SVG floorplan document into the IR. The drawing must
    /// contain a `map` group with one child group per floor, each holding
    /// `routes`, `places` and `transitions` sub-groups.
    pub fn parse(data :&str) -> Result<FloorPlan, SceneError> {
        let doc = xml::Document::parse(data)?;
        let root = doc.root_element();

        let map = find_group(&root, "map")
            .ok_or(SceneError::MissingSection { section: "map", floor: None })?;

        let mut floors = Vec::new();
        for child in map.children().filter(|c| c.is_element()) {
            if let Some(floor) = element_name(&child).and_then(FloorId::from_str) {
                floors.push(parse_floor(&child, floor)?);
            }
        }
        Ok(FloorPlan { floors })
    }
}

/// Semantic element name: the `data-name` attribute when present, falling
/// back to `id`. Drawing tools export generated `id`s and keep the
/// author's name in `data-name`.
fn element_name<'a>(node :&xml::Node<'a, '_>) -> Option<&'a str> {
    node.attribute("data-name").or_else(|| node.attribute("id"))
}

fn has_tag(node :&xml::Node, tag :&str) -> bool {
    node.is_element() && node.tag_name().name() == tag
}

fn find_group<'a, 'i>(node :&xml::Node<'a, 'i>, name :&str) -> Option<xml::Node<'a, 'i>> {
    node.descendants().find(|d| d.is_element() && element_name(d) == Some(name))
}

fn parse_floor(floor_svg :&xml::Node, floor :FloorId) -> Result<FloorScene, SceneError> {
    let routes = find_group(floor_svg, "routes")
        .ok_or(SceneError::MissingSection { section: "routes", floor: Some(floor) })?;
    let places = find_group(floor_svg, "places")
        .ok_or(SceneError::MissingSection { section: "places", floor: Some(floor) })?;
    let transitions = find_group(floor_svg, "transitions")
        .ok_or(SceneError::MissingSection { section: "transitions", floor: Some(floor) })?;

    Ok(FloorScene {
        floor,
        segments: parse_segments(&routes)?,
        places: parse_markers(&places)?,
        transitions: parse_markers(&transitions)?,
    })
}

fn parse_segments(group :&xml::Node) -> Result<Vec<Segment>, SceneError> {
    let mut segments = Vec::new();
    for line in group.descendants().filter(|d| has_tag(d, "line")) {
        segments.push(Segment {
            p1: glm::vec2(num_attr(&line, "x1")?, num_attr(&line, "y1")?),
            p2: glm::vec2(num_attr(&line, "x2")?, num_attr(&line, "y2")?),
        });
    }
    for polyline in group.descendants().filter(|d| has_tag(d, "polyline")) {
        let points = parse_polyline_points(&polyline)?;
        for pair in points.windows(2) {
            segments.push(Segment { p1: pair[0], p2: pair[1] });
        }
    }
    Ok(segments)
}

fn parse_polyline_points(polyline :&xml::Node) -> Result<Vec<PtC>, SceneError> {
    let pos = polyline.range().start;
    let text = polyline.attribute("points")
        .ok_or(SceneError::MissingAttribute { name: "points", pos })?;

    let mut coords = Vec::new();
    for piece in text.split(|c :char| c.is_whitespace() || c == ',').filter(|p| !p.is_empty()) {
        coords.push(piece.parse::<f64>()
            .map_err(|_| SceneError::BadNumber { attr: "points", pos })?);
    }
    if coords.len() % 2 != 0 {
        return Err(SceneError::BadNumber { attr: "points", pos });
    }
    Ok(coords.chunks(2).map(|c| glm::vec2(c[0], c[1])).collect())
}

fn parse_markers(group :&xml::Node) -> Result<Vec<Marker>, SceneError> {
    let mut markers = Vec::new();
    for circle in group.descendants().filter(|d| has_tag(d, "circle")) {
        let id = element_name(&circle)
            .ok_or(SceneError::MissingAttribute { name: "data-name", pos: circle.range().start })?;
        let center = glm::vec2(num_attr(&circle, "cx")?, num_attr(&circle, "cy")?);
        markers.push(Marker {
            id: id.to_string(),
            // marker coordinates live on the same grid as route nodes
            point: unsnap(snap(center)),
            label: circle.attribute("data-label").map(|l| l.to_string()),
        });
    }
    Ok(markers)
}

fn num_attr(node :&xml::Node, name :&'static str) -> Result<f64, SceneError> {
    let pos = node.range().start;
    let s = node.attribute(name)
        .ok_or(SceneError::MissingAttribute { name, pos })?;
    s.trim().parse::<f64>().map_err(|_| SceneError::BadNumber { attr: name, pos })
}
