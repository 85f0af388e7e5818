use crate::map::{BuildingMap, NodeId};
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

const NONE :usize = usize::MAX;

/// Bidirectional Dijkstra over the compiled route graph: one search from
/// each endpoint, meeting in the middle. Virtual cross-floor edges are
/// ordinary edges here; the engine has no floor awareness.
///
/// Returns the ordered node sequence from source to target inclusive, or
/// `None` when the endpoints lie in disconnected components.
pub fn bidirectional(map :&BuildingMap, source :NodeId, target :NodeId) -> Option<Vec<NodeId>> {
    if source == target {
        return Some(vec![source]);
    }

    let n = map.node_count();
    // index 0 forward from source, index 1 backward from target
    let mut dist = [vec![f64::INFINITY; n], vec![f64::INFINITY; n]];
    let mut prev = [vec![NONE; n], vec![NONE; n]];
    let mut settled = [vec![false; n], vec![false; n]];
    let mut frontier = [BinaryHeap::new(), BinaryHeap::new()];

    dist[0][source.0] = 0.0;
    dist[1][target.0] = 0.0;
    frontier[0].push(Reverse((OrderedFloat(0.0), source)));
    frontier[1].push(Reverse((OrderedFloat(0.0), target)));

    let mut best = f64::INFINITY;
    let mut meet :Option<NodeId> = None;

    loop {
        let head = |h :&BinaryHeap<Reverse<(OrderedFloat<f64>, NodeId)>>| {
            h.peek().map(|Reverse((OrderedFloat(k), _))| *k)
        };
        // expand the side with the nearer frontier; stop when the two
        // frontiers together cannot beat the best meeting seen so far
        let side = match (head(&frontier[0]), head(&frontier[1])) {
            (None, None) => break,
            (Some(a), None) => { if a >= best { break; } 0 },
            (None, Some(b)) => { if b >= best { break; } 1 },
            (Some(a), Some(b)) => {
                if a + b >= best { break; }
                if a <= b { 0 } else { 1 }
            },
        };

        let (d_u, u) = match frontier[side].pop() {
            Some(Reverse((d, u))) => (d.into_inner(), u),
            None => break,
        };
        if settled[side][u.0] { continue; }
        settled[side][u.0] = true;

        for (v, weight) in map.neighbors(u) {
            let d_v = d_u + weight;
            if d_v < dist[side][v.0] {
                dist[side][v.0] = d_v;
                prev[side][v.0] = u.0;
                frontier[side].push(Reverse((OrderedFloat(d_v), v)));
            }
            let other = dist[1 - side][v.0];
            if other.is_finite() && dist[side][v.0] + other < best {
                best = dist[side][v.0] + other;
                meet = Some(v);
            }
        }
    }

    let meet = meet?;

    let mut path = Vec::new();
    let mut u = meet.0;
    while u != NONE {
        path.push(NodeId(u));
        u = prev[0][u];
    }
    path.reverse();
    let mut u = prev[1][meet.0];
    while u != NONE {
        path.push(NodeId(u));
        u = prev[1][u];
    }
    Some(path)
}
