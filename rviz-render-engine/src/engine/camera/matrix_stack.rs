use bevy::math::{Mat4, Quat, Vec3};
use constants::render_settings::MATRIX_STACK_DEPTH;

use crate::engine::transforms::FrameTransform;

/// Current model matrix plus a fixed-depth save/restore stack.
///
/// Every draw routine pushes before touching the model matrix and pops
/// before returning. An unbalanced pop or a push beyond the fixed depth
/// is a drawing bug and aborts.
#[derive(Debug, Clone)]
pub struct ModelMatrixStack {
    current: Mat4,
    saved: Vec<Mat4>,
    capacity: usize,
}

impl Default for ModelMatrixStack {
    fn default() -> Self {
        Self::with_capacity(MATRIX_STACK_DEPTH)
    }
}

impl ModelMatrixStack {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            current: Mat4::IDENTITY,
            saved: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn current(&self) -> Mat4 {
        self.current
    }

    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn load_identity(&mut self) {
        self.current = Mat4::IDENTITY;
    }

    pub fn push(&mut self) {
        if self.saved.len() >= self.capacity {
            panic!("model matrix stack overflow (depth {})", self.capacity);
        }
        self.saved.push(self.current);
    }

    pub fn pop(&mut self) {
        let Some(previous) = self.saved.pop() else {
            panic!("model matrix stack underflow: pop without matching push");
        };
        self.current = previous;
    }

    /// Compose `matrix` into the current model matrix, in its local frame.
    pub fn multiply(&mut self, matrix: Mat4) {
        self.current *= matrix;
    }

    /// A missing transform leaves the model matrix untouched.
    pub fn apply_transform(&mut self, transform: Option<&FrameTransform>) {
        if let Some(transform) = transform {
            self.multiply(transform.to_matrix());
        }
    }

    pub fn translate(&mut self, offset: Vec3) {
        self.multiply(Mat4::from_translation(offset));
    }

    pub fn rotate(&mut self, rotation: Quat) {
        self.multiply(Mat4::from_quat(rotation));
    }

    pub fn scale(&mut self, factor: Vec3) {
        self.multiply(Mat4::from_scale(factor));
    }
}
