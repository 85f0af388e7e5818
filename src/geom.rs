use nalgebra_glm as glm;

/// Snapped grid point in centi-units (two decimal places of the drawing
/// coordinate system). Keys into the node arena are exact integers, so
/// endpoints that round to the same location compare equal.
pub type Pt = glm::I64Vec2;

/// Continuous drawing coordinate.
pub type PtC = glm::DVec2;

const GRID :f64 = 100.0; // centi-units per drawing unit

pub fn snap_coord(c :f64) -> i64 {
    (c * GRID).round() as i64
}

pub fn snap(p :PtC) -> Pt {
    glm::vec2(snap_coord(p.x), snap_coord(p.y))
}

pub fn unsnap(p :Pt) -> PtC {
    glm::vec2(p.x as f64 / GRID, p.y as f64 / GRID)
}

pub fn dist(a :PtC, b :PtC) -> f64 {
    glm::distance(&a, &b)
}

/// Minimal decimal rendering of a grid coordinate ("10", "10.5", "0.01"),
/// used when node keys are turned into identifier strings.
pub fn fmt_coord(c :i64) -> String {
    format!("{}", c as f64 / GRID)
}
