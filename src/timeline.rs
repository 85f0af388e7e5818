use crate::geom::dist;
use crate::map::RouteNode;
use crate::scene::FloorId;
use serde::Serialize;

pub const NODE_RADIUS :f64 = 2.0;
pub const NODE_REVEAL_SPEED :f64 = 250.0;
pub const EDGE_DRAW_SPEED :f64 = 250.0;

#[derive(Clone,PartialEq)]
#[derive(Debug)]
#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DrawKind {
    Reveal { node :String },
    DrawLine { from :String, to :String },
}

/// One timed drawing step for the rendering surface: start the visual at
/// `delay` and run it for `duration`. Times are in the renderer's clock
/// units; the compiler only fixes their ratios.
#[derive(Clone,PartialEq)]
#[derive(Debug)]
#[derive(Serialize)]
pub struct DrawCommand {
    #[serde(flatten)]
    pub kind :DrawKind,
    pub delay :f64,
    pub duration :f64,
}

#[derive(Clone,PartialEq)]
#[derive(Debug)]
#[derive(Serialize)]
pub struct FloorSchedule {
    pub floor :FloorId,
    pub commands :Vec<DrawCommand>,
}

/// Compile an ordered path of route nodes into per-floor draw schedules.
///
/// The path is split into contiguous runs of equal floor, each scheduled
/// independently from offset zero: reveal the first node, draw each edge
/// in sequence, then reveal the last node. A transition node therefore
/// appears in two schedules, as floor-local end and start. The schedule
/// is a pure function of the path; replaying the same path gives the
/// identical schedule.
pub fn compile(path :&[RouteNode]) -> Vec<FloorSchedule> {
    group_by_floor(path).into_iter().map(floor_schedule).collect()
}

pub fn to_json(schedules :&[FloorSchedule]) -> serde_json::Result<String> {
    serde_json::to_string(schedules)
}

fn group_by_floor(path :&[RouteNode]) -> Vec<&[RouteNode]> {
    let mut groups = Vec::new();
    let mut start = 0;
    for i in 1..=path.len() {
        if i == path.len() || path[i].floor() != path[start].floor() {
            groups.push(&path[start..i]);
            start = i;
        }
    }
    groups
}

fn floor_schedule(nodes :&[RouteNode]) -> FloorSchedule {
    let reveal_duration = NODE_RADIUS / NODE_REVEAL_SPEED;
    let mut commands = Vec::new();
    let mut offset = 0.0;

    for (i, node) in nodes.iter().enumerate() {
        if i == 0 {
            commands.push(DrawCommand {
                kind: DrawKind::Reveal { node: node.id() },
                delay: offset,
                duration: reveal_duration,
            });
            offset += reveal_duration;
        }
        if i == nodes.len() - 1 {
            commands.push(DrawCommand {
                kind: DrawKind::Reveal { node: node.id() },
                delay: offset,
                duration: reveal_duration,
            });
            break;
        }

        let next = &nodes[i + 1];
        let duration = dist(node.point, next.point) / EDGE_DRAW_SPEED;
        commands.push(DrawCommand {
            kind: DrawKind::DrawLine { from: node.id(), to: next.id() },
            delay: offset,
            duration,
        });
        offset += duration;
    }

    FloorSchedule { floor: nodes[0].floor(), commands }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::snap;
    use crate::map::NodeKey;
    use nalgebra_glm as glm;

    fn node(floor :FloorId, x :f64, y :f64) -> RouteNode {
        let pt = snap(glm::vec2(x, y));
        RouteNode {
            key: NodeKey { floor, pt },
            point: glm::vec2(x, y),
            place: None,
            transition: None,
        }
    }

    #[test]
    fn single_floor_schedule_shape() {
        let path = vec![
            node(FloorId::Ground, 0.0, 0.0),
            node(FloorId::Ground, 10.0, 0.0),
            node(FloorId::Ground, 10.0, 5.0),
        ];
        let schedules = compile(&path);
        assert_eq!(schedules.len(), 1);
        let commands = &schedules[0].commands;
        // reveal, line, line, reveal
        assert_eq!(commands.len(), 4);

        let reveal_duration = NODE_RADIUS / NODE_REVEAL_SPEED;
        assert_eq!(commands[0].delay, 0.0);
        assert_eq!(commands[0].duration, reveal_duration);
        assert_eq!(commands[1].delay, reveal_duration);
        assert_eq!(commands[1].duration, 10.0 / EDGE_DRAW_SPEED);
        assert_eq!(commands[2].delay, reveal_duration + 10.0 / EDGE_DRAW_SPEED);
        assert_eq!(commands[3].delay,
                   reveal_duration + 10.0 / EDGE_DRAW_SPEED + 5.0 / EDGE_DRAW_SPEED);
    }

    #[test]
    fn cross_floor_path_splits_into_groups() {
        let path = vec![
            node(FloorId::Ground, 0.0, 0.0),
            node(FloorId::Ground, 10.0, 0.0),
            node(FloorId::Mezzanine, 10.0, 0.0),
            node(FloorId::Mezzanine, 0.0, 0.0),
        ];
        let schedules = compile(&path);
        assert_eq!(schedules.len(), 2);
        assert_eq!(schedules[0].floor, FloorId::Ground);
        assert_eq!(schedules[1].floor, FloorId::Mezzanine);
        // each group restarts its clock
        assert_eq!(schedules[1].commands[0].delay, 0.0);
        // the transition point is revealed in both groups
        match (&schedules[0].commands.last().unwrap().kind, &schedules[1].commands[0].kind) {
            (DrawKind::Reveal { node: end }, DrawKind::Reveal { node: start }) => {
                assert_eq!(end, "ground,10,0");
                assert_eq!(start, "mezzanine,10,0");
            },
            other => panic!("unexpected commands: {:?}", other),
        }
    }

    #[test]
    fn floor_reentry_produces_separate_groups() {
        let path = vec![
            node(FloorId::Ground, 0.0, 0.0),
            node(FloorId::Mezzanine, 0.0, 0.0),
            node(FloorId::Ground, 10.0, 0.0),
        ];
        let schedules = compile(&path);
        assert_eq!(schedules.len(), 3);
        assert_eq!(schedules[0].floor, FloorId::Ground);
        assert_eq!(schedules[1].floor, FloorId::Mezzanine);
        assert_eq!(schedules[2].floor, FloorId::Ground);
    }

    #[test]
    fn single_node_group_gets_start_and_terminal_reveal() {
        let path = vec![node(FloorId::Ground, 0.0, 0.0)];
        let schedules = compile(&path);
        assert_eq!(schedules.len(), 1);
        let commands = &schedules[0].commands;
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].delay, 0.0);
        assert_eq!(commands[1].delay, NODE_RADIUS / NODE_REVEAL_SPEED);
    }

    #[test]
    fn empty_path_compiles_to_nothing() {
        assert!(compile(&[]).is_empty());
    }

    #[test]
    fn schedule_is_deterministic() {
        let path = vec![
            node(FloorId::Ground, 0.0, 0.0),
            node(FloorId::Ground, 7.5, 1.25),
            node(FloorId::Mezzanine, 7.5, 1.25),
        ];
        let a = to_json(&compile(&path)).unwrap();
        let b = to_json(&compile(&path)).unwrap();
        assert_eq!(a, b);
    }
}
