use crate::geometry::FloatType;

pub type Color = nalgebra::Vector3<FloatType>;

/// Surface behavior of a sphere.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Material {
    /// Lambertian reflector
    Diffuse { color: Color },
    /// Mirror-like reflector; fuzz 0 is a perfect mirror, 1 is very rough
    Metal { color: Color, fuzz: FloatType },
    /// Glass-like material that both reflects and refracts
    Dielectric { color: Color, ior: FloatType },
    /// Light source, emits its color and doesn't scatter
    Emissive { color: Color },
}

/// Material tag as stored in the packed sphere records.
#[repr(i32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SurfaceType {
    Diffuse = 0,
    Metal = 1,
    Dielectric = 2,
    Emissive = 3,
}

impl Material {
    pub fn diffuse(color: Color) -> Material {
        Material::Diffuse { color }
    }

    /// Metal material, fuzz gets clamped to [0, 1].
    pub fn metal(color: Color, fuzz: FloatType) -> Material {
        Material::Metal {
            color,
            fuzz: fuzz.clamp(0.0, 1.0),
        }
    }

    pub fn dielectric(color: Color, ior: FloatType) -> Material {
        Material::Dielectric { color, ior }
    }

    pub fn emissive(color: Color) -> Material {
        Material::Emissive { color }
    }

    pub fn color(&self) -> Color {
        match *self {
            Material::Diffuse { color }
            | Material::Metal { color, .. }
            | Material::Dielectric { color, .. }
            | Material::Emissive { color } => color,
        }
    }

    pub fn surface_type(&self) -> SurfaceType {
        match self {
            Material::Diffuse { .. } => SurfaceType::Diffuse,
            Material::Metal { .. } => SurfaceType::Metal,
            Material::Dielectric { .. } => SurfaceType::Dielectric,
            Material::Emissive { .. } => SurfaceType::Emissive,
        }
    }

    /// Roughness as stored on the wire, zero for everything except metals.
    pub fn fuzz(&self) -> FloatType {
        match *self {
            Material::Metal { fuzz, .. } => fuzz,
            _ => 0.0,
        }
    }

    /// Index of refraction as stored on the wire, 1.0 for everything except dielectrics.
    pub fn index_of_refraction(&self) -> FloatType {
        match *self {
            Material::Dielectric { ior, .. } => ior,
            _ => 1.0,
        }
    }
}

impl TryFrom<i32> for SurfaceType {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SurfaceType::Diffuse),
            1 => Ok(SurfaceType::Metal),
            2 => Ok(SurfaceType::Dielectric),
            3 => Ok(SurfaceType::Emissive),
            other => Err(other),
        }
    }
}
