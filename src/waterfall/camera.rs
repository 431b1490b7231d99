//! Perspective camera for the waterfall scene.

use cgmath::{perspective, Matrix4, Point3, Rad, SquareMatrix, Vector3};

/// Perspective camera producing a combined world-to-clip transform.
#[derive(Debug, Clone)]
pub struct Camera {
    fovy: Rad<f32>,
    aspect: f32,
    near: f32,
    far: f32,
    projection: Matrix4<f32>,
    view: Matrix4<f32>,
}

impl Camera {
    pub fn new(fovy: Rad<f32>, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            fovy,
            aspect,
            near,
            far,
            projection: Matrix4::identity(),
            view: Matrix4::identity(),
        };
        camera.update_projection();
        camera
    }

    fn update_projection(&mut self) {
        self.projection = perspective(self.fovy, self.aspect, self.near, self.far);
    }

    /// Updates the output aspect ratio and rebuilds the projection.
    pub fn set_aspect(&mut self, aspect: f32) {
        // Degenerate viewports (collapsed terminal) would produce a singular
        // projection; clamp instead.
        self.aspect = aspect.max(0.01);
        self.update_projection();
    }

    /// Places the camera at `eye`, looking at `target` with the given up vector.
    pub fn look_at(&mut self, eye: Point3<f32>, target: Point3<f32>, up: Vector3<f32>) {
        self.view = Matrix4::look_at_rh(eye, target, up);
    }

    pub fn world_to_clip_matrix(&self) -> Matrix4<f32> {
        self.projection * self.view
    }
}
