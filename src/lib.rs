//! Indoor floorplan routing: compiles hand-drawn SVG floor artwork into a
//! weighted multi-floor route graph, answers shortest-path queries between
//! named places, and turns the resulting path into a timed draw schedule
//! for the rendering surface.

pub mod geom;
pub mod scene;
pub mod map;
pub mod route;
pub mod timeline;

pub use crate::geom::{Pt, PtC};
pub use crate::scene::{FloorId, FloorPlan, SceneError};
pub use crate::map::{BuildingMap, MapError, NodeId, NodeKey, Place, RouteEdge, RouteNode, Transition};
pub use crate::timeline::{DrawCommand, DrawKind, FloorSchedule};

#[cfg(test)]
mod tests {
    use crate::map::{BuildingMap, VIRTUAL_EDGE_WEIGHT};
    use crate::scene::FloorPlan;
    use crate::timeline;

    const TWO_FLOOR_SVG :&str = r##"
        <svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100">
            <g data-name="map">
                <g data-name="ground">
                    <g data-name="routes">
                        <line x1="0" y1="0" x2="10" y2="0"/>
                    </g>
                    <g data-name="places">
                        <circle data-name="P1" cx="0" cy="0" r="1" data-label="Entrance"/>
                    </g>
                    <g data-name="transitions">
                        <circle data-name="T1" cx="10" cy="0" r="1"/>
                    </g>
                </g>
                <g data-name="mezzanine">
                    <g data-name="routes">
                        <polyline points="0,0 10,0"/>
                    </g>
                    <g data-name="places">
                        <circle data-name="P2" cx="0" cy="0" r="1" data-label="Balcony"/>
                    </g>
                    <g data-name="transitions">
                        <circle data-name="T1" cx="10" cy="0" r="1"/>
                    </g>
                </g>
            </g>
        </svg>"##;

    fn two_floor_map() -> BuildingMap {
        let plan = FloorPlan::parse(TWO_FLOOR_SVG).expect("svg parse failed");
        BuildingMap::create(&plan).expect("map compile failed")
    }

    #[test]
    fn route_crosses_floors_through_the_transition() {
        let map = two_floor_map();
        assert_eq!(map.floor_ids().iter().map(|f| f.as_str()).collect::<Vec<_>>(),
                   vec!["ground", "mezzanine"]);

        let places :Vec<_> = map.place_nodes().collect();
        assert_eq!(places.len(), 2);
        let (p1, _) = places[0];
        let (p2, _) = places[1];

        let path = map.find_best_path(p1, Some(p2)).expect("no path found");
        let ids :Vec<String> = path.iter().map(|n| map.node(*n).id()).collect();
        assert_eq!(ids, vec!["ground,0,0", "ground,10,0", "mezzanine,10,0", "mezzanine,0,0"]);

        let total = map.path_weight(&path);
        assert!((total - (10.0 + VIRTUAL_EDGE_WEIGHT + 10.0)).abs() < 1e-9);

        // the two middle hops are the transition's bound nodes
        assert_eq!(map.node(path[1]).transition.as_ref().map(|t| t.id.as_str()), Some("T1"));
        assert_eq!(map.node(path[2]).transition.as_ref().map(|t| t.id.as_str()), Some("T1"));
    }

    #[test]
    fn path_compiles_to_one_schedule_per_floor() {
        let map = two_floor_map();
        let p1 = map.resolve("ground,0,0").unwrap();
        let p2 = map.resolve("mezzanine,0,0").unwrap();
        let path = map.find_best_path(p1, Some(p2)).unwrap();

        let schedules = timeline::compile(&map.path_nodes(&path));
        assert_eq!(schedules.len(), 2);
        // reveal + edge + reveal on each floor
        assert_eq!(schedules[0].commands.len(), 3);
        assert_eq!(schedules[1].commands.len(), 3);

        let again = timeline::compile(&map.path_nodes(&path));
        assert_eq!(timeline::to_json(&schedules).unwrap(),
                   timeline::to_json(&again).unwrap());
    }

    #[test]
    fn place_labels_reach_the_selector_list() {
        let map = two_floor_map();
        let labels :Vec<_> = map.place_nodes()
            .filter_map(|(_, node)| node.place.as_ref().and_then(|p| p.label.clone()))
            .collect();
        assert_eq!(labels, vec!["Entrance", "Balcony"]);
    }
}
