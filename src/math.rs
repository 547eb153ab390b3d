//! Pose and projection matrix conversions.
//!
//! VR runtimes hand out row-major matrices: a 3×4 rigid pose per tracked
//! device and a 4×4 projection per eye. OpenGL wants column-major, so every
//! consumer ends up writing the same expand-and-transpose helpers; they live
//! here instead. [`PoseMatrix`] and [`RawProjection`] are `#[repr(C)]`
//! mirrors of the runtime's wire layout, safe to construct from whatever the
//! device API returned.

/// A 4x4 matrix, by convention in column-major format.
pub type Matrix4 = [[f32; 4]; 4];

/// A 3-dimensional vector, with (in order) x, y, and z components.
pub type Vector3 = [f32; 3];

/// A rigid device pose: row-major 3×4, the upper three rows of an affine
/// transform. Layout matches the matrices VR runtimes return for tracked
/// device poses.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoseMatrix {
    pub m: [[f32; 4]; 3],
}

impl PoseMatrix {
    pub fn identity() -> PoseMatrix {
        PoseMatrix {
            m: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
            ],
        }
    }

    /// Expand to a full 4×4 transform in column-major format. The missing
    /// bottom row is the affine 0 0 0 1.
    pub fn to_matrix4(&self) -> Matrix4 {
        // device matrices are row-major, so we must invert
        let p = &self.m;
        [
            [p[0][0], p[1][0], p[2][0], 0.0],
            [p[0][1], p[1][1], p[2][1], 0.0],
            [p[0][2], p[1][2], p[2][2], 0.0],
            [p[0][3], p[1][3], p[2][3], 1.0],
        ]
    }

    /// The pose's origin: the translation column.
    pub fn translation(&self) -> Vector3 {
        [self.m[0][3], self.m[1][3], self.m[2][3]]
    }
}

/// A projection matrix as returned by the runtime: row-major 4×4.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawProjection {
    pub m: [[f32; 4]; 4],
}

impl RawProjection {
    /// Transpose into column-major format.
    pub fn to_matrix4(&self) -> Matrix4 {
        let p = &self.m;
        [
            [p[0][0], p[1][0], p[2][0], p[3][0]],
            [p[0][1], p[1][1], p[2][1], p[3][1]],
            [p[0][2], p[1][2], p[2][2], p[3][2]],
            [p[0][3], p[1][3], p[2][3], p[3][3]],
        ]
    }
}

#[cfg(feature = "cgmath")]
mod cgmath_conv {
    //! Conversions into `cgmath` types, for applications that do their scene
    //! math there. `cgmath::Matrix4` is column-major, so these are the same
    //! transposes with a typed destination.

    use super::{PoseMatrix, RawProjection};

    impl From<PoseMatrix> for cgmath::Matrix4<f32> {
        fn from(pose: PoseMatrix) -> cgmath::Matrix4<f32> {
            cgmath::Matrix4::from(pose.to_matrix4())
        }
    }

    impl From<RawProjection> for cgmath::Matrix4<f32> {
        fn from(projection: RawProjection) -> cgmath::Matrix4<f32> {
            cgmath::Matrix4::from(projection.to_matrix4())
        }
    }

    impl PoseMatrix {
        /// The pose's origin as a `cgmath` vector.
        pub fn translation_vec(&self) -> cgmath::Vector3<f32> {
            cgmath::Vector3::from(self.translation())
        }
    }
}
