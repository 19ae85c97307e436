//! Default control geometry for controls the server sent without markers.

use std::f32::consts::PI;

use bevy::color::LinearRgba;
use bevy::math::{Mat4, Quat, Vec3};
use constants::interactive_markers::{
    ARROW_HEAD_DIAMETER, ARROW_HEAD_LENGTH, ARROW_LENGTH, ARROW_OFFSET, ARROW_SHAFT_DIAMETER,
    AUTO_TINT_ALPHA, RING_INNER_RADIUS, RING_OUTER_RADIUS, RING_SEGMENTS,
};
use constants::selection::SELECTED_COLOUR;

use super::modes::InteractionMode;
use crate::engine::geometry::utility::cap;
use crate::engine::render::{MarkerGeometry, Shape};

pub fn selected_colour() -> LinearRgba {
    LinearRgba::rgb(SELECTED_COLOUR[0], SELECTED_COLOUR[1], SELECTED_COLOUR[2])
}

/// Tint from the control orientation: the magnitudes of where the rotated
/// X axis points, scaled so the largest component is 1. A control along
/// world X is red, along Y green, along Z blue.
pub fn orientation_tint(orientation: Quat) -> LinearRgba {
    let (x, y, z, w) = (orientation.x, orientation.y, orientation.z, orientation.w);
    let mx = (1.0 - 2.0 * y * y - 2.0 * z * z).abs();
    let my = (2.0 * x * y + 2.0 * z * w).abs();
    let mz = (2.0 * x * z - 2.0 * y * w).abs();
    let max = mx.max(my).max(mz);
    if max <= 0.0 {
        return LinearRgba::new(1.0, 1.0, 1.0, AUTO_TINT_ALPHA);
    }
    LinearRgba::new(
        cap(mx / max, 0.0, 1.0),
        cap(my / max, 0.0, 1.0),
        cap(mz / max, 0.0, 1.0),
        AUTO_TINT_ALPHA,
    )
}

fn arrow() -> Shape {
    Shape::Arrow {
        shaft_diameter: ARROW_SHAFT_DIAMETER,
        head_diameter: ARROW_HEAD_DIAMETER,
        head_length: ARROW_HEAD_LENGTH,
        length: ARROW_LENGTH,
    }
}

/// Geometry synthesised for a control by its interaction mode: a ring for
/// rotation and plane motion, opposed arrows for axis motion, a cube for
/// menus. Nothing for `None`.
pub fn auto_markers(mode: InteractionMode, orientation: Quat) -> Vec<MarkerGeometry> {
    let colour = orientation_tint(orientation);
    match mode {
        InteractionMode::RotateAxis | InteractionMode::MovePlane | InteractionMode::MoveRotate => {
            vec![MarkerGeometry {
                shape: Shape::Ring {
                    inner_radius: RING_INNER_RADIUS,
                    outer_radius: RING_OUTER_RADIUS,
                    segments: RING_SEGMENTS,
                },
                transform: Mat4::IDENTITY,
                colour,
            }]
        }
        InteractionMode::MoveAxis => vec![
            MarkerGeometry {
                shape: arrow(),
                transform: Mat4::from_translation(Vec3::X * ARROW_OFFSET),
                colour,
            },
            MarkerGeometry {
                shape: arrow(),
                transform: Mat4::from_rotation_translation(
                    Quat::from_rotation_z(PI),
                    Vec3::X * -ARROW_OFFSET,
                ),
                colour,
            },
        ],
        InteractionMode::Menu => vec![MarkerGeometry {
            shape: Shape::Cube,
            transform: Mat4::IDENTITY,
            colour,
        }],
        InteractionMode::None => Vec::new(),
    }
}
