//! # Fractal Turbulence
//!
//! Combines octaves of a [`NoiseField`] into turbulence: each octave doubles
//! the frequency and scales the amplitude by `persistence`. The sum is divided
//! by the total amplitude, so the result stays in [-1, 1] for any octave count.

use crate::noise::{NoiseField, WorldSeed};

/// Upper bound on octaves; beyond this the extra layers are sub-voxel detail.
pub const MAX_OCTAVES: u32 = 16;

/// Persistence used when the caller passes a non-finite or non-positive value.
pub const DEFAULT_PERSISTENCE: f64 = 0.5;

/// Multi-octave turbulence over one noise field.
#[derive(Clone)]
pub struct FractalSynthesizer {
    field: NoiseField,
}

impl FractalSynthesizer {
    /// Creates a synthesizer over a fresh field for `seed`.
    #[must_use]
    pub fn new(seed: WorldSeed) -> Self {
        Self {
            field: NoiseField::new(seed),
        }
    }

    /// Wraps an existing field.
    #[must_use]
    pub const fn from_field(field: NoiseField) -> Self {
        Self { field }
    }

    /// The underlying single-octave field.
    #[must_use]
    pub const fn field(&self) -> &NoiseField {
        &self.field
    }

    /// 3D turbulence.
    ///
    /// `octaves == 0` is treated as 1.
    #[must_use]
    pub fn turbulence_3d(&self, x: f64, y: f64, z: f64, octaves: u32, persistence: f64) -> f64 {
        let persistence = sanitize_persistence(persistence);
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut max_amplitude = 0.0;

        for _ in 0..clamp_octaves(octaves) {
            total += self.field.sample_3d(x * frequency, y * frequency, z * frequency) * amplitude;
            max_amplitude += amplitude;
            amplitude *= persistence;
            frequency *= 2.0;
        }

        total / max_amplitude
    }

    /// 2D turbulence over the horizontal plane, used for height maps.
    ///
    /// `octaves == 0` is treated as 1.
    #[must_use]
    pub fn turbulence_2d(&self, x: f64, z: f64, octaves: u32, persistence: f64) -> f64 {
        let persistence = sanitize_persistence(persistence);
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut max_amplitude = 0.0;

        for _ in 0..clamp_octaves(octaves) {
            total += self.field.sample_2d(x * frequency, z * frequency) * amplitude;
            max_amplitude += amplitude;
            amplitude *= persistence;
            frequency *= 2.0;
        }

        total / max_amplitude
    }
}

#[inline]
fn clamp_octaves(octaves: u32) -> u32 {
    octaves.clamp(1, MAX_OCTAVES)
}

#[inline]
fn sanitize_persistence(persistence: f64) -> f64 {
    if persistence.is_finite() && persistence > 0.0 {
        persistence
    } else {
        DEFAULT_PERSISTENCE
    }
}
