use eframe::egui::{Vec2, vec2};

pub(in crate::app) const DEFAULT_LEAF_CAPACITY: usize = 1;

const MIN_FORCE_DISTANCE: f32 = 1e-6;

// coincident points would otherwise subdivide without end
const MIN_SUBDIVIDE_EXTENT: f32 = 1e-3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub(in crate::app) fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub(in crate::app) fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    pub(in crate::app) fn intersects(&self, other: &Rect) -> bool {
        !(other.x > self.x + self.width
            || other.x + other.width < self.x
            || other.y > self.y + self.height
            || other.y + other.height < self.y)
    }

    pub(in crate::app) fn center(&self) -> Vec2 {
        vec2(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    fn quadrant_for(&self, point: Vec2) -> usize {
        let center = self.center();
        let east = point.x >= center.x;
        let south = point.y >= center.y;
        match (east, south) {
            (false, false) => 0, // NW
            (true, false) => 1,  // NE
            (false, true) => 2,  // SW
            (true, true) => 3,   // SE
        }
    }

    fn quadrant(&self, index: usize) -> Rect {
        let half_w = self.width * 0.5;
        let half_h = self.height * 0.5;
        match index {
            0 => Rect::new(self.x, self.y, half_w, half_h),
            1 => Rect::new(self.x + half_w, self.y, half_w, half_h),
            2 => Rect::new(self.x, self.y + half_h, half_w, half_h),
            _ => Rect::new(self.x + half_w, self.y + half_h, half_w, half_h),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub(in crate::app) struct PointMass {
    pub index: usize,
    pub pos: Vec2,
    pub mass: f32,
}

/// Point quadtree with incrementally maintained center of mass, rebuilt from
/// scratch every simulation tick.
pub(in crate::app) struct QuadTree {
    boundary: Rect,
    capacity: usize,
    points: Vec<PointMass>,
    children: Option<Box<[QuadTree; 4]>>,
    center_of_mass: Vec2,
    total_mass: f32,
}

impl QuadTree {
    pub(in crate::app) fn new(boundary: Rect, capacity: usize) -> Self {
        Self {
            boundary,
            capacity: capacity.max(1),
            points: Vec::new(),
            children: None,
            center_of_mass: Vec2::ZERO,
            total_mass: 0.0,
        }
    }

    #[cfg(test)]
    pub(in crate::app) fn center_of_mass(&self) -> (Vec2, f32) {
        (self.center_of_mass, self.total_mass)
    }

    #[cfg(test)]
    pub(in crate::app) fn children(&self) -> Option<&[QuadTree; 4]> {
        self.children.as_deref()
    }

    #[cfg(test)]
    pub(in crate::app) fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Returns false when the point lies outside this node's boundary. The
    /// caller must insert at the root, whose boundary covers the whole
    /// simulated area; a false return there is a caller error.
    pub(in crate::app) fn insert(&mut self, point: PointMass) -> bool {
        if !self.boundary.contains(point.pos) {
            return false;
        }

        let combined = self.total_mass + point.mass;
        if combined > 0.0 {
            self.center_of_mass = (self.center_of_mass * self.total_mass
                + point.pos * point.mass)
                / combined;
        }
        self.total_mass = combined;

        if self.children.is_none() {
            let too_small =
                self.boundary.width.max(self.boundary.height) <= MIN_SUBDIVIDE_EXTENT;
            if self.points.len() < self.capacity || too_small {
                self.points.push(point);
                return true;
            }
            self.subdivide();
        }

        self.insert_into_child(point)
    }

    fn insert_into_child(&mut self, point: PointMass) -> bool {
        let quadrant = self.boundary.quadrant_for(point.pos);
        let Some(children) = self.children.as_mut() else {
            return false;
        };
        children[quadrant].insert(point)
    }

    fn subdivide(&mut self) {
        let capacity = self.capacity;
        let children = Box::new([
            QuadTree::new(self.boundary.quadrant(0), capacity),
            QuadTree::new(self.boundary.quadrant(1), capacity),
            QuadTree::new(self.boundary.quadrant(2), capacity),
            QuadTree::new(self.boundary.quadrant(3), capacity),
        ]);
        self.children = Some(children);

        // held points are re-routed into exactly one child each; quadrant
        // routing never drops a point that the parent boundary accepted
        let held = std::mem::take(&mut self.points);
        for point in held {
            self.insert_into_child(point);
        }
    }

    /// Collects every inserted point whose position lies inside `range`. The
    /// node-boundary test is a coarse prefilter; final inclusion is the exact
    /// point-in-rectangle test.
    pub(in crate::app) fn query(&self, range: &Rect, out: &mut Vec<PointMass>) {
        if !self.boundary.intersects(range) {
            return;
        }

        for point in &self.points {
            if range.contains(point.pos) {
                out.push(*point);
            }
        }

        if let Some(children) = &self.children {
            for child in children.iter() {
                child.query(range, out);
            }
        }
    }

    /// Barnes-Hut force on `point`. Subtrees whose `size / distance` ratio is
    /// below `theta` act as a single mass at their center of mass; `gravity`
    /// is negative for repulsion.
    pub(in crate::app) fn force_at(&self, point: &PointMass, theta: f32, gravity: f32) -> Vec2 {
        if self.total_mass <= 0.0 {
            return Vec2::ZERO;
        }

        if let Some(children) = &self.children {
            let delta = self.center_of_mass - point.pos;
            let distance = delta.length();
            let size = self.boundary.width.max(self.boundary.height);
            // a subtree holding the query point must open, or the point's own
            // mass would fold into the approximated cluster
            if !self.boundary.contains(point.pos)
                && distance > MIN_FORCE_DISTANCE
                && size / distance < theta
            {
                return pair_force(
                    point.pos,
                    point.mass,
                    self.center_of_mass,
                    self.total_mass,
                    gravity,
                );
            }

            let mut force = Vec2::ZERO;
            for child in children.iter() {
                force += child.force_at(point, theta, gravity);
            }
            return force;
        }

        let mut force = Vec2::ZERO;
        for other in &self.points {
            if other.index == point.index {
                continue;
            }
            force += pair_force(point.pos, point.mass, other.pos, other.mass, gravity);
        }
        force
    }
}

fn pair_force(pos: Vec2, mass: f32, other_pos: Vec2, other_mass: f32, gravity: f32) -> Vec2 {
    let delta = other_pos - pos;
    let distance = delta.length();
    if distance < MIN_FORCE_DISTANCE {
        return Vec2::ZERO;
    }

    let strength = gravity * mass * other_mass / (distance * distance * distance);
    delta * strength
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(index: usize, x: f32, y: f32) -> PointMass {
        PointMass {
            index,
            pos: vec2(x, y),
            mass: 1.0,
        }
    }

    fn brute_force(points: &[PointMass], target: &PointMass, gravity: f32) -> Vec2 {
        let mut force = Vec2::ZERO;
        for other in points {
            if other.index == target.index {
                continue;
            }
            force += pair_force(target.pos, target.mass, other.pos, other.mass, gravity);
        }
        force
    }

    #[test]
    fn root_mass_equals_sum_of_inserted_masses() {
        let mut tree = QuadTree::new(Rect::new(0.0, 0.0, 200.0, 200.0), 1);
        for index in 0..40 {
            let x = (index % 8) as f32 * 23.0 + 5.0;
            let y = (index / 8) as f32 * 31.0 + 5.0;
            assert!(tree.insert(point(index, x, y)));
        }

        let (_, mass) = tree.center_of_mass();
        assert!((mass - 40.0).abs() < 1e-3);
    }

    #[test]
    fn insert_rejects_points_outside_boundary() {
        let mut tree = QuadTree::new(Rect::new(0.0, 0.0, 100.0, 100.0), 1);
        assert!(!tree.insert(point(0, -1.0, 50.0)));
        assert!(!tree.insert(point(1, 50.0, 101.0)));
        assert!(tree.insert(point(2, 0.0, 0.0)));
        assert!(tree.insert(point(3, 100.0, 100.0)));

        let (_, mass) = tree.center_of_mass();
        assert!((mass - 2.0).abs() < 1e-6);
    }

    #[test]
    fn query_returns_exactly_the_points_in_range() {
        let mut tree = QuadTree::new(Rect::new(0.0, 0.0, 100.0, 100.0), 1);
        let mut inside = Vec::new();
        for index in 0..25 {
            let x = (index % 5) as f32 * 20.0 + 3.0;
            let y = (index / 5) as f32 * 20.0 + 3.0;
            assert!(tree.insert(point(index, x, y)));
            if (20.0..=60.0).contains(&x) && (20.0..=60.0).contains(&y) {
                inside.push(index);
            }
        }

        let mut found = Vec::new();
        tree.query(&Rect::new(20.0, 20.0, 40.0, 40.0), &mut found);

        let mut found_indices = found.iter().map(|p| p.index).collect::<Vec<_>>();
        found_indices.sort_unstable();
        assert_eq!(found_indices, inside);
        for reported in &found {
            assert!(Rect::new(20.0, 20.0, 40.0, 40.0).contains(reported.pos));
        }
    }

    #[test]
    fn barnes_hut_converges_to_brute_force_as_theta_shrinks() {
        let mut tree = QuadTree::new(Rect::new(0.0, 0.0, 400.0, 400.0), 1);
        let mut points = Vec::new();
        for index in 0..18 {
            let (a, b) = crate::util::hash_unit_pair(index as u64 * 7919);
            let p = point(index, 20.0 + a * 360.0, 20.0 + b * 360.0);
            points.push(p);
            assert!(tree.insert(p));
        }

        let gravity = -30.0;
        let target = points[4];
        let exact = brute_force(&points, &target, gravity);

        let zero_theta = tree.force_at(&target, 0.0, gravity);
        assert!((zero_theta - exact).length() < 1e-4);

        let coarse = (tree.force_at(&target, 1.2, gravity) - exact).length();
        let fine = (tree.force_at(&target, 0.1, gravity) - exact).length();
        assert!(fine <= coarse + 1e-6);
        assert!(fine < exact.length() * 0.05 + 1e-4);
    }

    #[test]
    fn coincident_points_do_not_subdivide_forever() {
        let mut tree = QuadTree::new(Rect::new(0.0, 0.0, 100.0, 100.0), 1);
        for index in 0..3 {
            assert!(tree.insert(point(index, 42.0, 42.0)));
        }

        let (com, mass) = tree.center_of_mass();
        assert!((mass - 3.0).abs() < 1e-6);
        assert!((com - vec2(42.0, 42.0)).length() < 1e-3);

        let mut found = Vec::new();
        tree.query(&Rect::new(41.0, 41.0, 2.0, 2.0), &mut found);
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn self_interaction_contributes_no_force() {
        let mut tree = QuadTree::new(Rect::new(0.0, 0.0, 10.0, 10.0), 1);
        let only = point(0, 5.0, 5.0);
        assert!(tree.insert(only));
        assert_eq!(tree.force_at(&only, 0.5, -30.0), Vec2::ZERO);
    }

    #[test]
    fn four_corner_square_subdivides_once_with_mean_center_of_mass() {
        let mut tree = QuadTree::new(Rect::new(0.0, 0.0, 100.0, 100.0), 1);
        let corners = [
            point(0, 0.0, 0.0),
            point(1, 100.0, 0.0),
            point(2, 0.0, 100.0),
            point(3, 100.0, 100.0),
        ];
        for corner in corners {
            assert!(tree.insert(corner));
        }

        assert_eq!(tree.point_count(), 0, "internal node holds no points");
        let children = tree.children().expect("root subdivides");
        for child in children.iter() {
            assert!(child.children().is_none(), "one subdivision level");
            assert_eq!(child.point_count(), 1);
        }

        let (com, mass) = tree.center_of_mass();
        assert!((mass - 4.0).abs() < 1e-6);
        assert!((com - vec2(50.0, 50.0)).length() < 1e-3);
    }
}
