use crate::geom::*;
use crate::route;
use crate::scene::{FloorId, FloorPlan, FloorScene, Marker};
use log::*;
use serde::{Serialize, Deserialize};
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Weight of the synthetic edge joining the two sides of a floor
/// transition. Nodes it connects are virtually the same point.
pub const VIRTUAL_EDGE_WEIGHT :f64 = 0.0001;

#[derive(Copy,Clone,PartialEq,Eq,Hash,PartialOrd,Ord)]
#[derive(Debug)]
#[derive(Serialize,Deserialize)]
pub struct NodeId(pub usize);

#[derive(Copy,Clone,PartialEq,Eq,Hash)]
#[derive(Debug)]
#[derive(Serialize,Deserialize)]
pub struct EdgeId(pub usize);

/// Semantic node key: floor plus snapped grid location. Renders as
/// `floor,x,y`, which is the identifier the UI shell addresses nodes by.
#[derive(Copy,Clone,PartialEq,Eq,Hash)]
#[derive(Debug)]
#[derive(Serialize,Deserialize)]
pub struct NodeKey {
    pub floor :FloorId,
    pub pt :Pt,
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f :&mut fmt::Formatter) -> fmt::Result {
        write!(f, "{},{},{}", self.floor, fmt_coord(self.pt.x), fmt_coord(self.pt.y))
    }
}

impl NodeKey {
    pub fn parse(s :&str) -> Option<NodeKey> {
        let mut parts = s.splitn(3, ',');
        let floor = FloorId::from_str(parts.next()?)?;
        let x = parts.next()?.trim().parse::<f64>().ok()?;
        let y = parts.next()?.trim().parse::<f64>().ok()?;
        Some(NodeKey { floor, pt: snap(nalgebra_glm::vec2(x, y)) })
    }
}

#[derive(Clone)]
#[derive(Debug)]
#[derive(Serialize,Deserialize)]
pub struct Place {
    pub id :String,
    pub point :PtC,
    pub label :Option<String>,
}

#[derive(Clone)]
#[derive(Debug)]
#[derive(Serialize,Deserialize)]
pub struct Transition {
    pub id :String,
    pub point :PtC,
}

/// A graph vertex: one snapped geometric point on one floor, optionally
/// carrying a place and/or transition binding.
#[derive(Clone)]
#[derive(Debug)]
#[derive(Serialize,Deserialize)]
pub struct RouteNode {
    pub key :NodeKey,
    pub point :PtC,
    pub place :Option<Place>,
    pub transition :Option<Transition>,
}

impl RouteNode {
    pub fn floor(&self) -> FloorId { self.key.floor }
    pub fn id(&self) -> String { self.key.to_string() }
}

#[derive(Clone)]
#[derive(Debug)]
#[derive(Serialize,Deserialize)]
pub struct RouteEdge {
    pub weight :f64,
    pub nodes :(NodeId, NodeId),
    pub is_virtual :bool,
}

#[derive(Debug)]
pub enum MapError {
    DuplicateAssignment { kind :MarkerKind, marker :String, node :String, existing :String },
    NoRouteNodes(FloorId),
    UnknownNode(String),
    NoPathFound { source :String, target :String },
}

#[derive(Copy,Clone,PartialEq,Eq)]
#[derive(Debug)]
pub enum MarkerKind { Place, Transition }

impl fmt::Display for MarkerKind {
    fn fmt(&self, f :&mut fmt::Formatter) -> fmt::Result {
        match self {
            MarkerKind::Place => write!(f, "place"),
            MarkerKind::Transition => write!(f, "floor transition"),
        }
    }
}

impl fmt::Display for MapError {
    fn fmt(&self, f :&mut fmt::Formatter) -> fmt::Result {
        match self {
            MapError::DuplicateAssignment { kind, marker, node, existing } =>
                write!(f, "impossible to assign {} {} to node {}: {} {} already assigned to it",
                       kind, marker, node, kind, existing),
            MapError::NoRouteNodes(floor) =>
                write!(f, "no route nodes on floor {} to bind markers to", floor),
            MapError::UnknownNode(id) =>
                write!(f, "unknown node id {}", id),
            MapError::NoPathFound { source, target } =>
                write!(f, "impossible to find a path from {} to {}", source, target),
        }
    }
}

impl std::error::Error for MapError {}

/// The compiled multi-floor route graph. Nodes and edges live in dense
/// arenas; semantic keys map to arena indices on the side. Built once per
/// floorplan load and read-only afterwards.
pub struct BuildingMap {
    nodes :Vec<RouteNode>,
    edges :Vec<RouteEdge>,
    node_ids :HashMap<NodeKey, NodeId>,
    edge_ids :HashMap<(NodeId, NodeId), EdgeId>,
    adjacency :Vec<SmallVec<[(NodeId, EdgeId); 4]>>,
    floor_ids :Vec<FloorId>,
    place_nodes :Vec<NodeId>,
    transition_nodes :Vec<NodeId>,
}

impl BuildingMap {
    /// Compile a parsed floorplan into the route graph. Fatal on malformed
    /// artwork; callers build a fresh map per floorplan load.
    pub fn create(plan :&FloorPlan) -> Result<BuildingMap, MapError> {
        let mut map = BuildingMap {
            nodes: Vec::new(),
            edges: Vec::new(),
            node_ids: HashMap::new(),
            edge_ids: HashMap::new(),
            adjacency: Vec::new(),
            floor_ids: Vec::new(),
            place_nodes: Vec::new(),
            transition_nodes: Vec::new(),
        };

        for scene in &plan.floors {
            map.floor_ids.push(scene.floor);
            map.add_routes(scene);
            map.assign_markers(scene.floor, &scene.places, MarkerKind::Place)?;
            map.assign_markers(scene.floor, &scene.transitions, MarkerKind::Transition)?;
        }
        map.link_transitions();

        info!("compiled building map: {} floors, {} nodes, {} edges, {} places",
              map.floor_ids.len(), map.nodes.len(), map.edges.len(), map.place_nodes.len());
        Ok(map)
    }

    fn add_routes(&mut self, scene :&FloorScene) {
        for seg in &scene.segments {
            let n1 = self.insert_node(scene.floor, seg.p1);
            let n2 = self.insert_node(scene.floor, seg.p2);
            if n1 == n2 {
                debug!("degenerate route segment at {} collapsed away", self.nodes[n1.0].key);
                continue;
            }
            let weight = dist(self.nodes[n1.0].point, self.nodes[n2.0].point);
            self.insert_edge(n1, n2, weight, false);
        }
        debug!("floor {}: {} route segments", scene.floor, scene.segments.len());
    }

    fn insert_node(&mut self, floor :FloorId, p :PtC) -> NodeId {
        let key = NodeKey { floor, pt: snap(p) };
        if let Some(id) = self.node_ids.get(&key) {
            return *id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(RouteNode {
            key,
            point: unsnap(key.pt),
            place: None,
            transition: None,
        });
        self.adjacency.push(SmallVec::new());
        self.node_ids.insert(key, id);
        id
    }

    /// Real edges are deduplicated by endpoint pair: a duplicate segment
    /// in the artwork re-derives the identical weight, so it overwrites.
    /// Virtual edges never take that path — transition nodes already
    /// joined by a walking route keep that edge and gain a parallel
    /// virtual one.
    fn insert_edge(&mut self, a :NodeId, b :NodeId, weight :f64, is_virtual :bool) {
        let key = order_pair(a, b);
        if !is_virtual {
            if let Some(eid) = self.edge_ids.get(&key) {
                self.edges[eid.0].weight = weight;
                return;
            }
        }
        let eid = EdgeId(self.edges.len());
        self.edges.push(RouteEdge { weight, nodes: (a, b), is_virtual });
        self.adjacency[a.0].push((b, eid));
        self.adjacency[b.0].push((a, eid));
        if !is_virtual {
            self.edge_ids.insert(key, eid);
        }
    }

    fn assign_markers(&mut self, floor :FloorId, markers :&[Marker], kind :MarkerKind)
        -> Result<(), MapError>
    {
        for marker in markers {
            let node = self.nearest_node(floor, marker.point)?;
            let node_key = self.nodes[node.0].key.to_string();
            match kind {
                MarkerKind::Place => {
                    if let Some(existing) = &self.nodes[node.0].place {
                        return Err(MapError::DuplicateAssignment {
                            kind, marker: marker.id.clone(),
                            node: node_key, existing: existing.id.clone(),
                        });
                    }
                    self.nodes[node.0].place = Some(Place {
                        id: marker.id.clone(),
                        point: marker.point,
                        label: marker.label.clone(),
                    });
                    self.place_nodes.push(node);
                },
                MarkerKind::Transition => {
                    if let Some(existing) = &self.nodes[node.0].transition {
                        return Err(MapError::DuplicateAssignment {
                            kind, marker: marker.id.clone(),
                            node: node_key, existing: existing.id.clone(),
                        });
                    }
                    self.nodes[node.0].transition = Some(Transition {
                        id: marker.id.clone(),
                        point: marker.point,
                    });
                    self.transition_nodes.push(node);
                },
            }
        }
        Ok(())
    }

    /// Closest route node on the floor; first minimum encountered in
    /// insertion order wins ties.
    fn nearest_node(&self, floor :FloorId, p :PtC) -> Result<NodeId, MapError> {
        let mut best :Option<(NodeId, f64)> = None;
        for (i, node) in self.nodes.iter().enumerate() {
            if node.key.floor != floor { continue; }
            let d = dist(node.point, p);
            if best.map(|(_, bd)| d < bd).unwrap_or(true) {
                best = Some((NodeId(i), d));
            }
        }
        best.map(|(n, _)| n).ok_or(MapError::NoRouteNodes(floor))
    }

    /// Chain the nodes of each transition id across floors with
    /// near-zero-weight edges. N occurrences give N-1 edges, consecutive
    /// in assignment order, never a full clique.
    fn link_transitions(&mut self) {
        let mut groups :BTreeMap<String, Vec<NodeId>> = BTreeMap::new();
        for node in &self.transition_nodes {
            if let Some(t) = &self.nodes[node.0].transition {
                groups.entry(t.id.clone()).or_insert_with(Vec::new).push(*node);
            }
        }

        for (transition_id, members) in groups {
            for pair in members.windows(2) {
                self.insert_edge(pair[0], pair[1], VIRTUAL_EDGE_WEIGHT, true);
            }
            debug!("transition {} links {} nodes", transition_id, members.len());
        }
    }

    /// Minimum-weight path between two nodes. With no target the
    /// selection is still in progress and the source alone is returned.
    pub fn find_best_path(&self, source :NodeId, target :Option<NodeId>)
        -> Result<Vec<NodeId>, MapError>
    {
        let target = match target {
            None => return Ok(vec![source]),
            Some(t) => t,
        };
        route::bidirectional(self, source, target)
            .ok_or_else(|| MapError::NoPathFound {
                source: self.nodes[source.0].key.to_string(),
                target: self.nodes[target.0].key.to_string(),
            })
    }

    /// Same query addressed by semantic id strings, as the UI shell sends
    /// them.
    pub fn find_best_path_by_id(&self, source :&str, target :Option<&str>)
        -> Result<Vec<NodeId>, MapError>
    {
        let source = self.resolve(source)
            .ok_or_else(|| MapError::UnknownNode(source.to_string()))?;
        let target = match target {
            None => None,
            Some(t) => Some(self.resolve(t)
                .ok_or_else(|| MapError::UnknownNode(t.to_string()))?),
        };
        self.find_best_path(source, target)
    }

    pub fn resolve(&self, id :&str) -> Option<NodeId> {
        let key = NodeKey::parse(id)?;
        self.node_ids.get(&key).copied()
    }

    pub fn node(&self, id :NodeId) -> &RouteNode { &self.nodes[id.0] }
    pub fn nodes(&self) -> &[RouteNode] { &self.nodes }
    pub fn edges(&self) -> &[RouteEdge] { &self.edges }
    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn floor_ids(&self) -> &[FloorId] { &self.floor_ids }

    /// Nodes carrying a place binding, in assignment order, for the UI
    /// shell's selectors.
    pub fn place_nodes(&self) -> impl Iterator<Item = (NodeId, &RouteNode)> {
        self.place_nodes.iter().map(move |id| (*id, &self.nodes[id.0]))
    }

    pub fn neighbors<'a>(&'a self, n :NodeId) -> impl Iterator<Item = (NodeId, f64)> + 'a {
        self.adjacency[n.0].iter().map(move |(m, e)| (*m, self.edges[e.0].weight))
    }

    /// Resolve a path of node ids into node records, for the timeline
    /// compiler and the rendering surface.
    pub fn path_nodes(&self, path :&[NodeId]) -> Vec<RouteNode> {
        path.iter().map(|id| self.nodes[id.0].clone()).collect()
    }

    /// Total edge weight along a path of adjacent nodes, taking the
    /// cheapest edge where a pair is joined by both a real and a virtual
    /// one. Consecutive nodes that are not adjacent are a caller error.
    pub fn path_weight(&self, path :&[NodeId]) -> f64 {
        path.windows(2).map(|pair| {
            let weight = self.adjacency[pair[0].0].iter()
                .filter(|(m, _)| *m == pair[1])
                .map(|(_, e)| self.edges[e.0].weight)
                .fold(f64::INFINITY, f64::min);
            debug_assert!(weight.is_finite(), "path nodes {} and {} are not adjacent",
                          self.nodes[pair[0].0].key, self.nodes[pair[1].0].key);
            if weight.is_finite() { weight } else { 0.0 }
        }).sum()
    }
}

fn order_pair(a :NodeId, b :NodeId) -> (NodeId, NodeId) {
    if b < a { (b, a) } else { (a, b) }
}
