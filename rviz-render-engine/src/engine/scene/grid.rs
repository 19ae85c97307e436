/// Flat reference grid in the fixed frame's ground plane
use bevy::color::LinearRgba;
use bevy::math::Vec3;
use constants::render_settings::{GRID_CELL_COUNT, GRID_CELL_SIZE, GRID_COLOUR};

use crate::engine::render::{DrawContext, Layer, LayerCapabilities, Shape};

pub struct GridLayer {
    lines: Shape,
    colour: LinearRgba,
    enabled: bool,
}

impl Default for GridLayer {
    fn default() -> Self {
        Self::new(GRID_CELL_COUNT, GRID_CELL_SIZE)
    }
}

impl GridLayer {
    /// Grid of `cell_count` x `cell_count` cells centred on the origin.
    pub fn new(cell_count: u32, cell_size: f32) -> Self {
        let cell_count = cell_count.max(1);
        let mut points = Vec::new();
        create_grid_lines_x_direction(&mut points, cell_count, cell_size);
        create_grid_lines_y_direction(&mut points, cell_count, cell_size);
        let [r, g, b, a] = GRID_COLOUR;

        Self {
            lines: Shape::LineList(points),
            colour: LinearRgba::new(r, g, b, a),
            enabled: true,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn line_count(&self) -> usize {
        match &self.lines {
            Shape::LineList(points) => points.len() / 2,
            _ => 0,
        }
    }
}

/// Lines running along Y at fixed X positions
fn create_grid_lines_x_direction(points: &mut Vec<Vec3>, cell_count: u32, cell_size: f32) {
    let half = cell_count as f32 * cell_size * 0.5;
    for i in 0..=cell_count {
        let x = -half + i as f32 * cell_size;
        points.push(Vec3::new(x, -half, 0.0));
        points.push(Vec3::new(x, half, 0.0));
    }
}

/// Lines running along X at fixed Y positions
fn create_grid_lines_y_direction(points: &mut Vec<Vec3>, cell_count: u32, cell_size: f32) {
    let half = cell_count as f32 * cell_size * 0.5;
    for i in 0..=cell_count {
        let y = -half + i as f32 * cell_size;
        points.push(Vec3::new(-half, y, 0.0));
        points.push(Vec3::new(half, y, 0.0));
    }
}

impl Layer for GridLayer {
    fn name(&self) -> &str {
        "Grid"
    }

    fn capabilities(&self) -> LayerCapabilities {
        LayerCapabilities::DRAWABLE
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn draw(&self, ctx: &mut DrawContext<'_>) {
        ctx.draw(&self.lines, self.colour);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_has_both_line_families() {
        let grid = GridLayer::new(4, 0.5);
        assert_eq!(grid.line_count(), 10);
        let Shape::LineList(points) = &grid.lines else {
            panic!("grid is a line list");
        };
        assert_eq!(points[0], Vec3::new(-1.0, -1.0, 0.0));
        assert!(points.iter().all(|p| p.z == 0.0 && p.x.abs() <= 1.0 && p.y.abs() <= 1.0));
    }
}
