//! Polygon soup and BSP-tree boolean operations used by the CSG engine

use glam::{DMat4, DVec3};

use super::Aabb;

/// Distance below which a vertex counts as lying on a plane
pub(crate) const PLANE_EPSILON: f64 = 1e-5;

const COPLANAR: u8 = 0;
const FRONT: u8 = 1;
const BACK: u8 = 2;
const SPANNING: u8 = 3;

/// Oriented plane `normal · p = w`
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Plane {
    pub normal: DVec3,
    pub w: f64,
}

impl Plane {
    fn flip(&mut self) {
        self.normal = -self.normal;
        self.w = -self.w;
    }

    /// Sort `polygon` into the four buckets relative to this plane,
    /// splitting it when it spans the plane.
    fn split_polygon(
        &self,
        polygon: &Polygon,
        coplanar_front: &mut Vec<Polygon>,
        coplanar_back: &mut Vec<Polygon>,
        front: &mut Vec<Polygon>,
        back: &mut Vec<Polygon>,
    ) {
        let mut polygon_type = COPLANAR;
        let types: Vec<u8> = polygon
            .vertices
            .iter()
            .map(|v| {
                let t = self.normal.dot(*v) - self.w;
                let ty = if t < -PLANE_EPSILON {
                    BACK
                } else if t > PLANE_EPSILON {
                    FRONT
                } else {
                    COPLANAR
                };
                polygon_type |= ty;
                ty
            })
            .collect();

        match polygon_type {
            COPLANAR => {
                if self.normal.dot(polygon.plane.normal) > 0.0 {
                    coplanar_front.push(polygon.clone());
                } else {
                    coplanar_back.push(polygon.clone());
                }
            }
            FRONT => front.push(polygon.clone()),
            BACK => back.push(polygon.clone()),
            _ => {
                let n = polygon.vertices.len();
                let mut f = Vec::with_capacity(n + 1);
                let mut b = Vec::with_capacity(n + 1);
                for i in 0..n {
                    let j = (i + 1) % n;
                    let (ti, tj) = (types[i], types[j]);
                    let (vi, vj) = (polygon.vertices[i], polygon.vertices[j]);
                    if ti != BACK {
                        f.push(vi);
                    }
                    if ti != FRONT {
                        b.push(vi);
                    }
                    if (ti | tj) == SPANNING {
                        let t = (self.w - self.normal.dot(vi)) / self.normal.dot(vj - vi);
                        let v = vi.lerp(vj, t);
                        f.push(v);
                        b.push(v);
                    }
                }
                if f.len() >= 3 {
                    front.push(Polygon {
                        vertices: f,
                        plane: polygon.plane,
                    });
                }
                if b.len() >= 3 {
                    back.push(Polygon {
                        vertices: b,
                        plane: polygon.plane,
                    });
                }
            }
        }
    }
}

/// Planar convex polygon with counter-clockwise winding seen from outside
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Polygon {
    pub vertices: Vec<DVec3>,
    pub plane: Plane,
}

impl Polygon {
    /// Build a polygon, dropping repeated vertices. Returns `None` for
    /// degenerate input (fewer than three distinct vertices or zero area).
    pub fn new(mut vertices: Vec<DVec3>) -> Option<Self> {
        vertices.dedup_by(|a, b| a.distance_squared(*b) < PLANE_EPSILON * PLANE_EPSILON);
        while vertices.len() > 1
            && vertices[0].distance_squared(vertices[vertices.len() - 1])
                < PLANE_EPSILON * PLANE_EPSILON
        {
            vertices.pop();
        }
        if vertices.len() < 3 {
            return None;
        }

        // Newell's method tolerates slightly non-planar input
        let mut normal = DVec3::ZERO;
        for (i, a) in vertices.iter().enumerate() {
            let b = vertices[(i + 1) % vertices.len()];
            normal += DVec3::new(
                (a.y - b.y) * (a.z + b.z),
                (a.z - b.z) * (a.x + b.x),
                (a.x - b.x) * (a.y + b.y),
            );
        }
        let length = normal.length();
        if length < 1e-12 {
            return None;
        }
        let normal = normal / length;
        let w = normal.dot(vertices[0]);
        Some(Self {
            vertices,
            plane: Plane { normal, w },
        })
    }

    pub fn flip(&mut self) {
        self.vertices.reverse();
        self.plane.flip();
    }

    /// Apply an affine matrix; mirrored matrices keep the outward winding.
    pub fn transformed(&self, matrix: &DMat4) -> Option<Self> {
        let mut vertices: Vec<DVec3> = self
            .vertices
            .iter()
            .map(|v| matrix.transform_point3(*v))
            .collect();
        if matrix.determinant() < 0.0 {
            vertices.reverse();
        }
        Polygon::new(vertices)
    }

    pub fn centroid(&self) -> DVec3 {
        self.vertices.iter().copied().sum::<DVec3>() / self.vertices.len() as f64
    }
}

/// Bounding box of a polygon set
pub(crate) fn bounds(polygons: &[Polygon]) -> Option<Aabb> {
    Aabb::from_points(polygons.iter().flat_map(|p| p.vertices.iter()))
}

/// Signed volume enclosed by a closed polygon set (positive when outward)
pub(crate) fn signed_volume(polygons: &[Polygon]) -> f64 {
    polygons
        .iter()
        .map(|p| {
            let a = p.vertices[0];
            p.vertices[1..]
                .windows(2)
                .map(|w| a.dot(w[0].cross(w[1])))
                .sum::<f64>()
        })
        .sum::<f64>()
        / 6.0
}

/// Flip the whole set if it encloses negative volume
pub(crate) fn orient_outward(mut polygons: Vec<Polygon>) -> Vec<Polygon> {
    if signed_volume(&polygons) < 0.0 {
        for p in &mut polygons {
            p.flip();
        }
    }
    polygons
}

/// BSP tree node
///
/// Trees built from convex solids degenerate into long chains, so every
/// traversal uses an explicit stack instead of recursion.
#[derive(Debug, Default)]
struct Node {
    plane: Option<Plane>,
    front: Option<Box<Node>>,
    back: Option<Box<Node>>,
    polygons: Vec<Polygon>,
}

impl Drop for Node {
    fn drop(&mut self) {
        let mut stack: Vec<Box<Node>> = self.front.take().into_iter().chain(self.back.take()).collect();
        while let Some(mut node) = stack.pop() {
            stack.extend(node.front.take());
            stack.extend(node.back.take());
        }
    }
}

impl Node {
    fn new(polygons: Vec<Polygon>) -> Self {
        let mut node = Node::default();
        node.build(polygons);
        node
    }

    /// Swap solid space and empty space
    fn invert(&mut self) {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            for p in &mut node.polygons {
                p.flip();
            }
            if let Some(plane) = node.plane.as_mut() {
                plane.flip();
            }
            std::mem::swap(&mut node.front, &mut node.back);
            if let Some(front) = node.front.as_deref_mut() {
                stack.push(front);
            }
            if let Some(back) = node.back.as_deref_mut() {
                stack.push(back);
            }
        }
    }

    /// Remove the parts of `polygons` that are inside this tree
    fn clip_polygons(&self, polygons: Vec<Polygon>) -> Vec<Polygon> {
        let mut out = Vec::new();
        let mut stack = vec![(self, polygons)];
        while let Some((node, polygons)) = stack.pop() {
            let Some(plane) = node.plane else {
                out.extend(polygons);
                continue;
            };
            let mut front = Vec::new();
            let mut back = Vec::new();
            let mut coplanar_front = Vec::new();
            let mut coplanar_back = Vec::new();
            for p in &polygons {
                plane.split_polygon(p, &mut coplanar_front, &mut coplanar_back, &mut front, &mut back);
            }
            front.append(&mut coplanar_front);
            back.append(&mut coplanar_back);

            match node.front.as_deref() {
                Some(child) if !front.is_empty() => stack.push((child, front)),
                Some(_) => {}
                None => out.extend(front),
            }
            // Polygons behind a leaf are inside the solid and dropped
            if let Some(child) = node.back.as_deref()
                && !back.is_empty()
            {
                stack.push((child, back));
            }
        }
        out
    }

    /// Remove the parts of this tree that are inside `other`
    fn clip_to(&mut self, other: &Node) {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            node.polygons = other.clip_polygons(std::mem::take(&mut node.polygons));
            if let Some(front) = node.front.as_deref_mut() {
                stack.push(front);
            }
            if let Some(back) = node.back.as_deref_mut() {
                stack.push(back);
            }
        }
    }

    fn all_polygons(&self) -> Vec<Polygon> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.extend(node.polygons.iter().cloned());
            stack.extend(node.front.as_deref());
            stack.extend(node.back.as_deref());
        }
        out
    }

    fn build(&mut self, polygons: Vec<Polygon>) {
        let mut stack = vec![(self, polygons)];
        while let Some((node, polygons)) = stack.pop() {
            let Some(first) = polygons.first() else {
                continue;
            };
            let plane = *node.plane.get_or_insert(first.plane);
            let mut front = Vec::new();
            let mut back = Vec::new();
            let mut coplanar_front = Vec::new();
            let mut coplanar_back = Vec::new();
            for p in &polygons {
                plane.split_polygon(p, &mut coplanar_front, &mut coplanar_back, &mut front, &mut back);
            }
            node.polygons.append(&mut coplanar_front);
            node.polygons.append(&mut coplanar_back);

            let Node {
                front: front_child,
                back: back_child,
                ..
            } = node;
            if !front.is_empty() {
                stack.push((front_child.get_or_insert_with(Box::default).as_mut(), front));
            }
            if !back.is_empty() {
                stack.push((back_child.get_or_insert_with(Box::default).as_mut(), back));
            }
        }
    }
}

/// `a ∪ b`
pub(crate) fn union(a: Vec<Polygon>, b: Vec<Polygon>) -> Vec<Polygon> {
    if !overlapping(&a, &b) {
        let mut a = a;
        a.extend(b);
        return a;
    }
    let mut a = Node::new(a);
    let mut b = Node::new(b);
    a.clip_to(&b);
    b.clip_to(&a);
    b.invert();
    b.clip_to(&a);
    b.invert();
    a.build(b.all_polygons());
    a.all_polygons()
}

/// `a − b`
pub(crate) fn subtract(a: Vec<Polygon>, b: Vec<Polygon>) -> Vec<Polygon> {
    if !overlapping(&a, &b) {
        return a;
    }
    let mut a = Node::new(a);
    let mut b = Node::new(b);
    a.invert();
    a.clip_to(&b);
    b.clip_to(&a);
    b.invert();
    b.clip_to(&a);
    b.invert();
    a.build(b.all_polygons());
    a.invert();
    a.all_polygons()
}

/// `a ∩ b`
pub(crate) fn intersect(a: Vec<Polygon>, b: Vec<Polygon>) -> Vec<Polygon> {
    if !overlapping(&a, &b) {
        return Vec::new();
    }
    let mut a = Node::new(a);
    let mut b = Node::new(b);
    a.invert();
    b.clip_to(&a);
    b.invert();
    a.clip_to(&b);
    b.clip_to(&a);
    a.build(b.all_polygons());
    a.invert();
    a.all_polygons()
}

fn overlapping(a: &[Polygon], b: &[Polygon]) -> bool {
    match (bounds(a), bounds(b)) {
        (Some(ba), Some(bb)) => ba.intersects(&bb),
        _ => false,
    }
}
