//! World-to-listener transform.
//!
//! Built from the listener's `at`/`up` vectors via `right = at × up`,
//! matching `Libaudioverse`'s `environment.cpp`: the listener-to-world
//! rotation has columns `(right, up, -at)`, and world-to-listener is its
//! transpose (the rotation is orthonormal) with the translation baked in as
//! `-(R · position)` rather than composed as a separate translate-then-
//! rotate pair.

/// A position or direction in world space.
pub type Vec3 = [f32; 3];

fn length(v: Vec3) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

fn normalize(v: Vec3) -> Vec3 {
    let len = length(v);
    if len < 1e-9 {
        [0.0, 0.0, -1.0]
    } else {
        [v[0] / len, v[1] / len, v[2] / len]
    }
}

fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [a[1] * b[2] - a[2] * b[1], a[2] * b[0] - a[0] * b[2], a[0] * b[1] - a[1] * b[0]]
}

fn neg(v: Vec3) -> Vec3 {
    [-v[0], -v[1], -v[2]]
}

fn mat_vec(m: [[f32; 3]; 3], v: Vec3) -> Vec3 {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

fn add(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

/// The affine transform from world space into listener-relative space,
/// recomputed once per block when the listener's position/orientation
/// changes (see `EnvironmentNode::will_tick`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldToListener {
    rotation: [[f32; 3]; 3],
    translation: Vec3,
}

impl WorldToListener {
    /// Builds the transform for a listener at `position`, facing `at` with
    /// `up` as the up direction. `at` and `up` need not be unit length or
    /// exactly orthogonal; `up` is re-orthogonalized against `at`.
    pub fn look_at(position: Vec3, at: Vec3, up: Vec3) -> Self {
        let at_n = normalize(at);
        let right = normalize(cross(at_n, up));
        let up_n = cross(right, at_n);

        // Columns of the listener-to-world rotation.
        let cols = [right, up_n, neg(at_n)];
        // World-to-listener is the transpose (the basis is orthonormal).
        let rotation = [
            [cols[0][0], cols[1][0], cols[2][0]],
            [cols[0][1], cols[1][1], cols[2][1]],
            [cols[0][2], cols[1][2], cols[2][2]],
        ];
        let translation = neg(mat_vec(rotation, position));
        Self { rotation, translation }
    }

    /// The default transform: listener at the origin, facing `-z`, `+y` up.
    pub fn identity() -> Self {
        Self::look_at([0.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0])
    }

    /// Transforms a world-space position into listener-relative space.
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        add(mat_vec(self.rotation, p), self.translation)
    }
}

impl Default for WorldToListener {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_transform_is_identity_for_default_orientation() {
        let t = WorldToListener::identity();
        let p = [1.0, 2.0, -3.0];
        let out = t.transform_point(p);
        for i in 0..3 {
            assert!((out[i] - p[i]).abs() < 1e-5);
        }
    }

    #[test]
    fn listener_translation_is_subtracted() {
        let t = WorldToListener::look_at([5.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]);
        let out = t.transform_point([5.0, 0.0, -1.0]);
        assert!((out[0]).abs() < 1e-5);
        assert!((out[2] + 1.0).abs() < 1e-5);
    }

    #[test]
    fn listener_facing_positive_x_rotates_forward_axis() {
        // Facing +x: a point directly ahead should land on listener -z.
        let t = WorldToListener::look_at([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        let out = t.transform_point([1.0, 0.0, 0.0]);
        assert!(out[2] < -0.99);
    }
}
