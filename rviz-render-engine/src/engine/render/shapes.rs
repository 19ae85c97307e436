/// Drawable primitives and their tessellation
use std::f32::consts::TAU;

use bevy::color::LinearRgba;
use bevy::math::{Mat4, Quat, Vec3};

use crate::engine::geometry::utility::correct_quaternion;
use crate::messages::visualization_msgs::Marker;

const SPHERE_RINGS: usize = 6;
const ROUND_SEGMENTS: usize = 12;

/// Shapes are defined in their own unit space; size comes from the model
/// matrix they are drawn with.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Unit cube centred on the origin.
    Cube,
    /// Unit-diameter sphere centred on the origin.
    Sphere,
    /// Unit-diameter, unit-height cylinder along Z, centred on the origin.
    Cylinder,
    /// Arrow from the origin along +X. The shaft is `length` long and the
    /// head adds `head_length` beyond it.
    Arrow {
        shaft_diameter: f32,
        head_diameter: f32,
        head_length: f32,
        length: f32,
    },
    /// Flat annulus in the YZ plane, normal along X.
    Ring {
        inner_radius: f32,
        outer_radius: f32,
        segments: usize,
    },
    LineStrip(Vec<Vec3>),
    LineList(Vec<Vec3>),
    Points(Vec<Vec3>),
    /// Flat triangle list, three vertices per triangle.
    Triangles(Vec<Vec3>),
}

impl Shape {
    /// Edges for wireframe canvases, in shape space.
    pub fn outline(&self) -> Vec<(Vec3, Vec3)> {
        match self {
            Shape::Cube => cube_edges(),
            Shape::Sphere => {
                let mut edges = circle(Vec3::ZERO, Vec3::X, 0.5, ROUND_SEGMENTS);
                edges.extend(circle(Vec3::ZERO, Vec3::Y, 0.5, ROUND_SEGMENTS));
                edges.extend(circle(Vec3::ZERO, Vec3::Z, 0.5, ROUND_SEGMENTS));
                edges
            }
            Shape::Cylinder => {
                let mut edges = circle(Vec3::Z * 0.5, Vec3::Z, 0.5, ROUND_SEGMENTS);
                edges.extend(circle(Vec3::Z * -0.5, Vec3::Z, 0.5, ROUND_SEGMENTS));
                for side in [Vec3::X, Vec3::Y, -Vec3::X, -Vec3::Y] {
                    edges.push((side * 0.5 - Vec3::Z * 0.5, side * 0.5 + Vec3::Z * 0.5));
                }
                edges
            }
            Shape::Arrow {
                shaft_diameter,
                head_diameter,
                head_length,
                length,
            } => {
                let shaft = shaft_diameter * 0.5;
                let head = head_diameter * 0.5;
                let tip = Vec3::X * (length + head_length);
                let mut edges = Vec::new();
                for side in [Vec3::Y, Vec3::Z, -Vec3::Y, -Vec3::Z] {
                    edges.push((side * shaft, Vec3::X * *length + side * shaft));
                    edges.push((Vec3::X * *length + side * head, tip));
                }
                edges.extend(circle(Vec3::X * *length, Vec3::X, head, ROUND_SEGMENTS));
                edges
            }
            Shape::Ring {
                inner_radius,
                outer_radius,
                segments,
            } => {
                let mut edges = circle(Vec3::ZERO, Vec3::X, *inner_radius, *segments);
                edges.extend(circle(Vec3::ZERO, Vec3::X, *outer_radius, *segments));
                edges
            }
            Shape::LineStrip(points) => points.windows(2).map(|w| (w[0], w[1])).collect(),
            Shape::LineList(points) => points.chunks_exact(2).map(|p| (p[0], p[1])).collect(),
            Shape::Points(points) => points
                .iter()
                .flat_map(|p| {
                    let d = 0.01;
                    [
                        (*p - Vec3::X * d, *p + Vec3::X * d),
                        (*p - Vec3::Y * d, *p + Vec3::Y * d),
                    ]
                })
                .collect(),
            Shape::Triangles(vertices) => vertices
                .chunks_exact(3)
                .flat_map(|t| [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])])
                .collect(),
        }
    }

    /// Filled surface used by the pick buffer. Line and point shapes have
    /// no surface and are picked by proximity instead.
    pub fn triangles(&self) -> Vec<[Vec3; 3]> {
        match self {
            Shape::Cube => cube_triangles(),
            Shape::Sphere => sphere_triangles(),
            Shape::Cylinder => {
                let mut tris = disc(Vec3::Z * 0.5, 0.0, 0.5, ROUND_SEGMENTS, Vec3::Z);
                tris.extend(disc(Vec3::Z * -0.5, 0.0, 0.5, ROUND_SEGMENTS, Vec3::Z));
                tris.extend(tube(0.5, -0.5, 0.5, ROUND_SEGMENTS));
                tris
            }
            Shape::Arrow {
                shaft_diameter,
                head_diameter,
                head_length,
                length,
            } => {
                let shaft = Mat4::from_scale_rotation_translation(
                    Vec3::new(*length, *shaft_diameter, *shaft_diameter),
                    Quat::IDENTITY,
                    Vec3::X * (length * 0.5),
                );
                let mut tris: Vec<[Vec3; 3]> = cube_triangles()
                    .into_iter()
                    .map(|t| t.map(|v| shaft.transform_point3(v)))
                    .collect();
                let base = Vec3::X * *length;
                let tip = Vec3::X * (length + head_length);
                let head = head_diameter * 0.5;
                let corners = [Vec3::Y, Vec3::Z, -Vec3::Y, -Vec3::Z].map(|d| base + d * head);
                for i in 0..4 {
                    let (a, b) = (corners[i], corners[(i + 1) % 4]);
                    tris.push([a, b, tip]);
                    tris.push([a, b, base]);
                }
                tris
            }
            Shape::Ring {
                inner_radius,
                outer_radius,
                segments,
            } => disc(Vec3::ZERO, *inner_radius, *outer_radius, *segments, Vec3::X),
            Shape::Triangles(vertices) => {
                vertices.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect()
            }
            Shape::LineStrip(_) | Shape::LineList(_) | Shape::Points(_) => Vec::new(),
        }
    }

    /// Shape-space points picked by proximity when the shape has no surface.
    pub fn pick_points(&self) -> &[Vec3] {
        match self {
            Shape::LineStrip(points) | Shape::LineList(points) | Shape::Points(points) => points,
            _ => &[],
        }
    }
}

/// Geometry of a visualization marker message: the shape, where it sits in
/// the marker's frame, and its colour.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerGeometry {
    pub shape: Shape,
    pub transform: Mat4,
    pub colour: LinearRgba,
}

impl MarkerGeometry {
    /// `None` for types that need resources this engine does not load
    /// (text and mesh markers).
    pub fn from_message(marker: &Marker) -> Option<Self> {
        let pose = &marker.pose;
        let rotation = correct_quaternion(Quat::from(&pose.orientation));
        let position = Vec3::from(&pose.position);
        let scale = Vec3::from(&marker.scale);
        let colour = LinearRgba::new(marker.color.r, marker.color.g, marker.color.b, marker.color.a);
        let points: Vec<Vec3> = marker.points.iter().map(Vec3::from).collect();

        // Line and point markers carry their size in scale.x; their points
        // are already in marker space.
        let unscaled = Mat4::from_rotation_translation(rotation, position);
        let scaled = Mat4::from_scale_rotation_translation(scale, rotation, position);

        let (shape, transform) = match marker.marker_type {
            Marker::ARROW => (
                Shape::Arrow {
                    shaft_diameter: 0.1,
                    head_diameter: 0.2,
                    head_length: 0.23,
                    length: 0.77,
                },
                scaled,
            ),
            Marker::CUBE => (Shape::Cube, scaled),
            Marker::SPHERE => (Shape::Sphere, scaled),
            Marker::CYLINDER => (Shape::Cylinder, scaled),
            Marker::LINE_STRIP => (Shape::LineStrip(points), unscaled),
            Marker::LINE_LIST => (Shape::LineList(points), unscaled),
            Marker::POINTS => (Shape::Points(points), unscaled),
            Marker::CUBE_LIST | Marker::SPHERE_LIST => (Shape::Points(points), unscaled),
            Marker::TRIANGLE_LIST => (Shape::Triangles(points), scaled),
            _ => return None,
        };
        Some(Self {
            shape,
            transform,
            colour,
        })
    }
}

fn cube_corners() -> [Vec3; 8] {
    let h = 0.5;
    [
        Vec3::new(-h, -h, -h),
        Vec3::new(h, -h, -h),
        Vec3::new(h, h, -h),
        Vec3::new(-h, h, -h),
        Vec3::new(-h, -h, h),
        Vec3::new(h, -h, h),
        Vec3::new(h, h, h),
        Vec3::new(-h, h, h),
    ]
}

fn cube_edges() -> Vec<(Vec3, Vec3)> {
    let c = cube_corners();
    let pairs = [
        (0, 1), (1, 2), (2, 3), (3, 0),
        (4, 5), (5, 6), (6, 7), (7, 4),
        (0, 4), (1, 5), (2, 6), (3, 7),
    ];
    pairs.iter().map(|(a, b)| (c[*a], c[*b])).collect()
}

fn cube_triangles() -> Vec<[Vec3; 3]> {
    let c = cube_corners();
    let faces = [
        [0, 1, 2, 3],
        [4, 5, 6, 7],
        [0, 1, 5, 4],
        [2, 3, 7, 6],
        [1, 2, 6, 5],
        [0, 3, 7, 4],
    ];
    faces
        .iter()
        .flat_map(|f| [[c[f[0]], c[f[1]], c[f[2]]], [c[f[0]], c[f[2]], c[f[3]]]])
        .collect()
}

/// Orthonormal pair spanning the plane with the given normal.
fn plane_basis(normal: Vec3) -> (Vec3, Vec3) {
    let normal = normal.normalize_or(Vec3::Z);
    normal.any_orthonormal_pair()
}

fn circle(centre: Vec3, normal: Vec3, radius: f32, segments: usize) -> Vec<(Vec3, Vec3)> {
    let (u, v) = plane_basis(normal);
    let segments = segments.max(3);
    let point = |i: usize| {
        let angle = TAU * i as f32 / segments as f32;
        centre + (u * angle.cos() + v * angle.sin()) * radius
    };
    (0..segments).map(|i| (point(i), point(i + 1))).collect()
}

fn disc(centre: Vec3, inner: f32, outer: f32, segments: usize, normal: Vec3) -> Vec<[Vec3; 3]> {
    let (u, v) = plane_basis(normal);
    let segments = segments.max(3);
    let at = |i: usize, radius: f32| {
        let angle = TAU * i as f32 / segments as f32;
        centre + (u * angle.cos() + v * angle.sin()) * radius
    };
    let mut tris = Vec::with_capacity(segments * 2);
    for i in 0..segments {
        let (a, b) = (at(i, outer), at(i + 1, outer));
        if inner <= 0.0 {
            tris.push([centre, a, b]);
        } else {
            let (c, d) = (at(i, inner), at(i + 1, inner));
            tris.push([c, a, b]);
            tris.push([c, b, d]);
        }
    }
    tris
}

fn tube(radius: f32, z0: f32, z1: f32, segments: usize) -> Vec<[Vec3; 3]> {
    let at = |i: usize, z: f32| {
        let angle = TAU * i as f32 / segments as f32;
        Vec3::new(angle.cos() * radius, angle.sin() * radius, z)
    };
    (0..segments)
        .flat_map(|i| {
            let (a, b, c, d) = (at(i, z0), at(i + 1, z0), at(i, z1), at(i + 1, z1));
            [[a, b, d], [a, d, c]]
        })
        .collect()
}

fn sphere_triangles() -> Vec<[Vec3; 3]> {
    let at = |ring: usize, segment: usize| {
        let polar = std::f32::consts::PI * ring as f32 / SPHERE_RINGS as f32;
        let azimuth = TAU * segment as f32 / ROUND_SEGMENTS as f32;
        Vec3::new(
            polar.sin() * azimuth.cos(),
            polar.sin() * azimuth.sin(),
            polar.cos(),
        ) * 0.5
    };
    let mut tris = Vec::new();
    for ring in 0..SPHERE_RINGS {
        for segment in 0..ROUND_SEGMENTS {
            let (a, b) = (at(ring, segment), at(ring, segment + 1));
            let (c, d) = (at(ring + 1, segment), at(ring + 1, segment + 1));
            tris.push([a, c, d]);
            tris.push([a, d, b]);
        }
    }
    tris
}
