use nalgebra_glm as glm;

/// Local transform of a joint kept as separate translation, rotation and
/// scale so that each part can be interpolated on its own.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: glm::Vec3,
    pub rotation: glm::Quat,
    pub scale: glm::Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    #[must_use]
    pub const fn new(
        translation: glm::Vec3,
        rotation: glm::Quat,
        scale: glm::Vec3,
    ) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    #[must_use]
    pub fn identity() -> Self {
        Self {
            translation: glm::Vec3::zeros(),
            rotation: glm::Quat::identity(),
            scale: glm::vec3(1.0_f32, 1.0_f32, 1.0_f32),
        }
    }

    /// Builds the matrix `T * R * S`, so a point is scaled first, then
    /// rotated, then translated.
    #[must_use]
    pub fn to_mat4(&self) -> glm::Mat4 {
        glm::translation(&self.translation)
            * glm::quat_to_mat4(&self.rotation)
            * glm::scaling(&self.scale)
    }

    /// Decomposes an affine matrix. Any shear is lost. A matrix with a
    /// negative determinant is treated as a mirror on the x axis.
    #[must_use]
    pub fn from_mat4(m: &glm::Mat4) -> Self {
        let translation = glm::vec3(m[(0, 3)], m[(1, 3)], m[(2, 3)]);
        let basis = glm::mat4_to_mat3(m);
        let mut scale = glm::vec3(
            glm::length(&basis.column(0).into_owned()),
            glm::length(&basis.column(1).into_owned()),
            glm::length(&basis.column(2).into_owned()),
        );
        if basis.determinant() < 0.0_f32 {
            scale.x = -scale.x;
        }

        // A zero scale leaves no rotation to recover
        let divisor = scale.map(|s| if s.abs() > f32::EPSILON { s } else { 1.0 });
        let rotation_matrix = glm::Mat3::from_columns(&[
            basis.column(0) / divisor.x,
            basis.column(1) / divisor.y,
            basis.column(2) / divisor.z,
        ]);
        let rotation = glm::mat3_to_quat(&rotation_matrix).normalize();

        Self {
            translation,
            rotation,
            scale,
        }
    }
}

impl From<Transform> for glm::Mat4 {
    fn from(t: Transform) -> Self {
        t.to_mat4()
    }
}
