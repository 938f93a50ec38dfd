//! Material palette: material id -> RGB color.
//!
//! Ids are resolved to colors only when the mesh is built, never during
//! generation, so a palette can change without regenerating the grid.

use serde::{Deserialize, Serialize};

use crate::chunk::Material;

/// Linear RGB color, each channel in [0, 1].
pub type Rgb = [f32; 3];

/// Color returned for ids with no palette entry.
pub const MISSING_COLOR: Rgb = [1.0, 0.0, 1.0];

/// Colors for the six terrain materials.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialPalette {
    /// Grass surface color.
    pub grass: Rgb,
    /// Dirt color.
    pub dirt: Rgb,
    /// Stone color.
    pub stone: Rgb,
    /// Sand color.
    pub sand: Rgb,
    /// Trunk color.
    pub wood: Rgb,
    /// Canopy color.
    pub leaves: Rgb,
}

impl Default for MaterialPalette {
    fn default() -> Self {
        Self {
            grass: [0.34, 0.62, 0.24],
            dirt: [0.45, 0.31, 0.18],
            stone: [0.50, 0.50, 0.52],
            sand: [0.86, 0.79, 0.55],
            wood: [0.40, 0.26, 0.13],
            leaves: [0.18, 0.45, 0.16],
        }
    }
}

impl MaterialPalette {
    /// Color for a material.
    #[must_use]
    pub const fn color(&self, material: Material) -> Rgb {
        match material {
            Material::Grass => self.grass,
            Material::Dirt => self.dirt,
            Material::Stone => self.stone,
            Material::Sand => self.sand,
            Material::Wood => self.wood,
            Material::Leaves => self.leaves,
        }
    }

    /// Color for a raw material id; unknown ids get [`MISSING_COLOR`].
    #[must_use]
    pub const fn color_for_id(&self, id: u8) -> Rgb {
        match Material::from_id(id) {
            Some(material) => self.color(material),
            None => MISSING_COLOR,
        }
    }

    /// Replaces the color for one material.
    pub fn set(&mut self, material: Material, color: Rgb) {
        let slot = match material {
            Material::Grass => &mut self.grass,
            Material::Dirt => &mut self.dirt,
            Material::Stone => &mut self.stone,
            Material::Sand => &mut self.sand,
            Material::Wood => &mut self.wood,
            Material::Leaves => &mut self.leaves,
        };
        *slot = color.map(|c| if c.is_finite() { c.clamp(0.0, 1.0) } else { 0.0 });
    }

    /// Lookup table indexed by material id (index 0 is air).
    #[must_use]
    pub fn to_table(&self) -> [Rgb; 7] {
        let mut table = [MISSING_COLOR; 7];
        for material in Material::ALL {
            table[material.id() as usize] = self.color(material);
        }
        table
    }
}
