use eframe::egui::{Vec2, vec2};
use log::warn;

use super::quadtree::{DEFAULT_LEAF_CAPACITY, PointMass, QuadTree, Rect};

const ALPHA_MIN: f32 = 0.005;

const COLLISION_QUERY_SCALE: f32 = 4.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct LayoutOptions {
    pub theta: f32,
    pub repulsion: f32,
    pub link_distance: f32,
    pub link_strength: f32,
    pub collision_strength: f32,
    pub alpha_decay: f32,
    pub velocity_decay: f32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            theta: 0.8,
            repulsion: 30.0,
            link_distance: 60.0,
            link_strength: 0.1,
            collision_strength: 0.5,
            alpha_decay: 0.0228,
            velocity_decay: 0.4,
        }
    }
}

#[derive(Clone, Debug)]
pub(in crate::app) struct BodySeed {
    pub id: String,
    pub pos: Option<Vec2>,
    pub mass: f32,
    pub radius: f32,
}

#[derive(Clone, Copy, Debug)]
pub(in crate::app) struct LinkSpec {
    pub source: usize,
    pub target: usize,
    pub weight: f32,
}

#[derive(Clone, Copy, Debug)]
pub(in crate::app) struct SimPoint {
    pub index: usize,
    pub pos: Vec2,
    pub vel: Vec2,
}

struct Body {
    pos: Vec2,
    vel: Vec2,
    mass: f32,
    radius: f32,
}

/// Owns the authoritative positions and velocities while the layout runs.
/// One `tick` = rebuild spatial index, Barnes-Hut repulsion, local collision,
/// edge attraction, integration, bounds clamp, alpha decay.
pub(in crate::app) struct SimulationEngine {
    bodies: Vec<Body>,
    links: Vec<LinkSpec>,
    bounds: Rect,
    options: LayoutOptions,
    alpha: f32,
    query_scratch: Vec<PointMass>,
}

impl SimulationEngine {
    pub(in crate::app) fn new(
        seeds: Vec<BodySeed>,
        links: Vec<LinkSpec>,
        width: f32,
        height: f32,
        options: LayoutOptions,
    ) -> Self {
        let width = width.max(1.0);
        let height = height.max(1.0);
        let body_count = seeds.len();

        let bodies = seeds
            .into_iter()
            .enumerate()
            .map(|(index, seed)| {
                let pos = seed.pos.unwrap_or_else(|| {
                    let (a, b) = crate::util::stable_pair(&seed.id);
                    vec2(a * width, b * height)
                });
                Body {
                    pos: clamp_to(pos, width, height),
                    vel: Vec2::ZERO,
                    mass: seed.mass.max(0.0),
                    radius: seed.radius.max(0.5),
                }
            })
            .collect::<Vec<_>>();

        let links = links
            .into_iter()
            .filter(|link| {
                let ok = link.source < body_count
                    && link.target < body_count
                    && link.source != link.target;
                if !ok {
                    warn!(
                        "dropping layout link {} -> {} outside body range",
                        link.source, link.target
                    );
                }
                ok
            })
            .collect();

        Self {
            bodies,
            links,
            bounds: Rect::new(0.0, 0.0, width, height),
            options,
            alpha: 1.0,
            query_scratch: Vec::new(),
        }
    }

    pub(in crate::app) fn alpha(&self) -> f32 {
        self.alpha
    }

    pub(in crate::app) fn restart(&mut self, alpha: f32) {
        // annealing resumes; velocities are deliberately kept
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    pub(in crate::app) fn snapshot(&self) -> Vec<SimPoint> {
        self.bodies
            .iter()
            .enumerate()
            .map(|(index, body)| SimPoint {
                index,
                pos: body.pos,
                vel: body.vel,
            })
            .collect()
    }

    /// Advances one step. Returns whether further ticks should be scheduled.
    pub(in crate::app) fn tick(&mut self) -> bool {
        let alpha = self.alpha;
        let options = self.options;

        if !self.bodies.is_empty() {
            let tree = self.build_index();

            for index in 0..self.bodies.len() {
                let probe = PointMass {
                    index,
                    pos: self.bodies[index].pos,
                    mass: self.bodies[index].mass,
                };
                let force = tree.force_at(&probe, options.theta, -options.repulsion);
                self.bodies[index].vel += force * alpha;
            }

            for index in 0..self.bodies.len() {
                let reach = self.bodies[index].radius * COLLISION_QUERY_SCALE;
                let probe_pos = self.bodies[index].pos;
                let range = Rect::new(
                    probe_pos.x - reach,
                    probe_pos.y - reach,
                    reach * 2.0,
                    reach * 2.0,
                );

                self.query_scratch.clear();
                tree.query(&range, &mut self.query_scratch);

                let mut impulse = Vec2::ZERO;
                for other in &self.query_scratch {
                    if other.index == index {
                        continue;
                    }

                    let delta = probe_pos - other.pos;
                    let distance = delta.length();
                    let min_distance =
                        self.bodies[index].radius + self.bodies[other.index].radius;
                    if distance >= min_distance {
                        continue;
                    }

                    let direction = if distance > 1e-4 {
                        delta / distance
                    } else {
                        let angle = ((index as f32) * 0.618_034
                            + (other.index as f32) * 0.414_214)
                            * std::f32::consts::TAU;
                        vec2(angle.cos(), angle.sin())
                    };

                    // each pair is visited from both endpoints' queries, so
                    // half the overlap per visit keeps the pair impulse whole
                    let overlap = min_distance - distance;
                    impulse += direction * overlap * 0.5 * options.collision_strength;
                }
                self.bodies[index].vel += impulse;
            }
        }

        for link in &self.links {
            let delta = self.bodies[link.target].pos - self.bodies[link.source].pos;
            let distance = delta.length();
            if distance < 1e-4 {
                continue;
            }

            let direction = delta / distance;
            let displacement =
                (distance - options.link_distance) * options.link_strength * link.weight * alpha;
            self.bodies[link.source].vel += direction * displacement;
            self.bodies[link.target].vel -= direction * displacement;
        }

        let (width, height) = (self.bounds.width, self.bounds.height);
        for body in &mut self.bodies {
            body.vel *= options.velocity_decay;
            body.pos += body.vel;
            body.pos = clamp_to(body.pos, width, height);
        }

        self.alpha *= 1.0 - options.alpha_decay;
        self.alpha > ALPHA_MIN
    }

    fn build_index(&self) -> QuadTree {
        let mut tree = QuadTree::new(self.bounds, DEFAULT_LEAF_CAPACITY);
        for (index, body) in self.bodies.iter().enumerate() {
            let accepted = tree.insert(PointMass {
                index,
                pos: body.pos,
                mass: body.mass,
            });
            if !accepted {
                // positions are clamped to the bounds every tick, so a
                // rejected insert indicates a caller error upstream
                warn!("body {index} fell outside simulation bounds");
            }
        }
        tree
    }
}

fn clamp_to(pos: Vec2, width: f32, height: f32) -> Vec2 {
    vec2(pos.x.clamp(0.0, width), pos.y.clamp(0.0, height))
}
