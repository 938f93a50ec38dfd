//! # Gradient Noise
//!
//! Seeded improved-Perlin noise in two and three dimensions.
//!
//! ## Determinism Guarantee
//!
//! Given the same `WorldSeed`, a `NoiseField` produces **exactly** the
//! same values on any platform, any time. Every sample is a fixed sequence
//! of IEEE-754 operations on the inputs and a seed-derived permutation
//! table; nothing is reduced across threads.

/// World seed for deterministic generation.
///
/// All procedural generation derives from this seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorldSeed(u64);

impl WorldSeed {
    /// Creates a new world seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Returns the raw seed value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Derives a sub-seed for a specific purpose (e.g., cave noise).
    ///
    /// Uses a hash function to create independent streams from one seed.
    #[inline]
    #[must_use]
    pub const fn derive(self, purpose: u64) -> Self {
        // FNV-1a style mixing
        let mut hash = self.0;
        hash ^= purpose;
        hash = hash.wrapping_mul(0x517c_c1b7_2722_0a95);
        hash ^= hash >> 32;
        Self(hash)
    }
}

impl Default for WorldSeed {
    fn default() -> Self {
        Self(0xDEAD_BEEF_CAFE_BABE)
    }
}

impl From<u32> for WorldSeed {
    fn from(seed: u32) -> Self {
        Self(u64::from(seed))
    }
}

/// Gradient directions for 3D noise (cube edge midpoints, padded to 16).
const GRADIENTS_3D: [[i8; 3]; 16] = [
    [1, 1, 0],
    [-1, 1, 0],
    [1, -1, 0],
    [-1, -1, 0],
    [1, 0, 1],
    [-1, 0, 1],
    [1, 0, -1],
    [-1, 0, -1],
    [0, 1, 1],
    [0, -1, 1],
    [0, 1, -1],
    [0, -1, -1],
    [1, 1, 0],
    [0, -1, 1],
    [-1, 1, 0],
    [0, -1, -1],
];

/// Gradient directions for 2D noise.
const GRADIENTS_2D: [[i8; 2]; 8] = [
    [1, 1],
    [-1, 1],
    [1, -1],
    [-1, -1],
    [1, 0],
    [-1, 0],
    [0, 1],
    [0, -1],
];

/// Pre-computed permutation table for noise.
///
/// Computed once from the seed and read-only afterwards, so a single
/// table is shared freely between worker threads.
#[derive(Clone)]
struct PermutationTable {
    /// 512-entry permutation table (256 entries, doubled for overflow handling).
    perm: [u8; 512],
}

impl PermutationTable {
    /// Creates a new permutation table from a seed.
    fn new(seed: WorldSeed) -> Self {
        let mut perm = [0u8; 512];

        for (i, slot) in perm.iter_mut().take(256).enumerate() {
            *slot = i as u8;
        }

        // Fisher-Yates shuffle with deterministic RNG.
        // xorshift64 has a fixed point at zero, so keep the state odd.
        let mut rng_state = seed.value() | 1;
        for i in (1..256).rev() {
            rng_state ^= rng_state << 13;
            rng_state ^= rng_state >> 7;
            rng_state ^= rng_state << 17;

            let j = (rng_state % (i as u64 + 1)) as usize;
            perm.swap(i, j);
        }

        // Double the table to avoid index wrapping
        for i in 0..256 {
            perm[256 + i] = perm[i];
        }

        Self { perm }
    }

    /// Gets a permutation value (with automatic wrapping).
    #[inline]
    fn get(&self, index: usize) -> usize {
        self.perm[index & 511] as usize
    }
}

/// Seeded gradient noise field.
///
/// Produces smooth, continuous values in the range [-1, 1].
///
/// # Example
///
/// ```rust
/// use terravox_procedural::noise::{NoiseField, WorldSeed};
///
/// let field = NoiseField::new(WorldSeed::new(42));
/// let value = field.sample_3d(10.5, 3.25, -7.75);
/// assert!((-1.0..=1.0).contains(&value));
/// ```
#[derive(Clone)]
pub struct NoiseField {
    /// The permutation table.
    perm_table: PermutationTable,
    /// Seed the table was built from (also keys the lattice hash).
    seed: WorldSeed,
}

impl NoiseField {
    /// Creates a new noise field from a seed.
    #[must_use]
    pub fn new(seed: WorldSeed) -> Self {
        Self {
            perm_table: PermutationTable::new(seed),
            seed,
        }
    }

    /// Returns the seed this field was built from.
    #[must_use]
    pub const fn seed(&self) -> WorldSeed {
        self.seed
    }

    /// Samples 3D gradient noise.
    ///
    /// # Returns
    ///
    /// A value in the range [-1, 1]. Exactly zero on integer lattice points.
    #[must_use]
    pub fn sample_3d(&self, x: f64, y: f64, z: f64) -> f64 {
        let xi = fast_floor(x);
        let yi = fast_floor(y);
        let zi = fast_floor(z);

        let xf = x - f64::from(xi);
        let yf = y - f64::from(yi);
        let zf = z - f64::from(zi);

        let u = fade(xf);
        let v = fade(yf);
        let w = fade(zf);

        let p = &self.perm_table;
        let xx = (xi & 255) as usize;
        let yy = (yi & 255) as usize;
        let zz = (zi & 255) as usize;

        let a = p.get(xx) + yy;
        let aa = p.get(a) + zz;
        let ab = p.get(a + 1) + zz;
        let b = p.get(xx + 1) + yy;
        let ba = p.get(b) + zz;
        let bb = p.get(b + 1) + zz;

        let x1 = lerp(
            u,
            grad_3d(p.get(aa), xf, yf, zf),
            grad_3d(p.get(ba), xf - 1.0, yf, zf),
        );
        let x2 = lerp(
            u,
            grad_3d(p.get(ab), xf, yf - 1.0, zf),
            grad_3d(p.get(bb), xf - 1.0, yf - 1.0, zf),
        );
        let y1 = lerp(v, x1, x2);

        let x3 = lerp(
            u,
            grad_3d(p.get(aa + 1), xf, yf, zf - 1.0),
            grad_3d(p.get(ba + 1), xf - 1.0, yf, zf - 1.0),
        );
        let x4 = lerp(
            u,
            grad_3d(p.get(ab + 1), xf, yf - 1.0, zf - 1.0),
            grad_3d(p.get(bb + 1), xf - 1.0, yf - 1.0, zf - 1.0),
        );
        let y2 = lerp(v, x3, x4);

        lerp(w, y1, y2).clamp(-1.0, 1.0)
    }

    /// Samples 2D gradient noise on the horizontal (x, z) plane.
    ///
    /// # Returns
    ///
    /// A value in the range [-1, 1].
    #[must_use]
    pub fn sample_2d(&self, x: f64, z: f64) -> f64 {
        let xi = fast_floor(x);
        let zi = fast_floor(z);

        let xf = x - f64::from(xi);
        let zf = z - f64::from(zi);

        let u = fade(xf);
        let v = fade(zf);

        let p = &self.perm_table;
        let xx = (xi & 255) as usize;
        let zz = (zi & 255) as usize;

        let a = p.get(xx) + zz;
        let b = p.get(xx + 1) + zz;

        let n00 = grad_2d(p.get(a), xf, zf);
        let n10 = grad_2d(p.get(b), xf - 1.0, zf);
        let n01 = grad_2d(p.get(a + 1), xf, zf - 1.0);
        let n11 = grad_2d(p.get(b + 1), xf - 1.0, zf - 1.0);

        lerp(v, lerp(u, n00, n10), lerp(u, n01, n11)).clamp(-1.0, 1.0)
    }

    /// Seeded white-noise value for an integer lattice point.
    ///
    /// Gradient noise vanishes on the lattice, so discrete per-cell
    /// decisions (tree selection) use this instead.
    ///
    /// # Returns
    ///
    /// A value in the range [0, 1).
    #[must_use]
    pub fn lattice_hash(&self, x: i64, y: i64, z: i64) -> f64 {
        let mut h = self.seed.value();
        h = mix64(h ^ (x as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
        h = mix64(h ^ (y as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F));
        h = mix64(h ^ (z as u64).wrapping_mul(0x1656_67B1_9E37_79F9));
        // Top 53 bits -> [0, 1)
        (h >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

/// Quintic fade curve `6t^5 - 15t^4 + 10t^3`.
#[inline]
fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(t: f64, a: f64, b: f64) -> f64 {
    a + t * (b - a)
}

#[inline]
fn grad_3d(hash: usize, x: f64, y: f64, z: f64) -> f64 {
    let g = GRADIENTS_3D[hash & 15];
    x * f64::from(g[0]) + y * f64::from(g[1]) + z * f64::from(g[2])
}

#[inline]
fn grad_2d(hash: usize, x: f64, z: f64) -> f64 {
    let g = GRADIENTS_2D[hash & 7];
    x * f64::from(g[0]) + z * f64::from(g[1])
}

/// SplitMix64 finalizer.
#[inline]
const fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Fast floor function.
///
/// Faster than `f64::floor()` for our use case.
#[inline]
fn fast_floor(x: f64) -> i32 {
    let xi = x as i32;
    if x < f64::from(xi) {
        xi - 1
    } else {
        xi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determinism() {
        let seed = WorldSeed::new(12345);
        let field1 = NoiseField::new(seed);
        let field2 = NoiseField::new(seed);

        for i in 0..200 {
            let x = i as f64 * 0.13;
            let y = i as f64 * 0.07;
            let z = i as f64 * 0.17;
            assert_eq!(
                field1.sample_3d(x, y, z).to_bits(),
                field2.sample_3d(x, y, z).to_bits(),
                "3D noise should be bit-for-bit deterministic"
            );
            assert_eq!(
                field1.sample_2d(x, z).to_bits(),
                field2.sample_2d(x, z).to_bits(),
                "2D noise should be bit-for-bit deterministic"
            );
        }
    }

    #[test]
    fn test_different_seeds_different_results() {
        let field1 = NoiseField::new(WorldSeed::new(1));
        let field2 = NoiseField::new(WorldSeed::new(2));

        let differs = (0..50).any(|i| {
            let x = i as f64 * 0.31 + 0.5;
            field1.sample_3d(x, 0.25, x * 0.5) != field2.sample_3d(x, 0.25, x * 0.5)
        });

        assert!(differs, "Different seeds should produce different results");
    }

    #[test]
    fn test_zero_seed_is_usable() {
        let field = NoiseField::new(WorldSeed::new(0));
        let nonzero = (0..100).any(|i| field.sample_2d(i as f64 * 0.37 + 0.1, 0.6).abs() > 1e-6);
        assert!(nonzero, "Seed 0 must still produce a varied field");
    }

    #[test]
    fn test_range() {
        let field = NoiseField::new(WorldSeed::new(42));

        for i in 0..10_000 {
            let x = (i as f64 * 0.1) - 500.0;
            let y = (i as f64 * 0.07) - 20.0;
            let z = (i as f64 * 0.13) - 650.0;

            let v3 = field.sample_3d(x, y, z);
            let v2 = field.sample_2d(x, z);

            assert!((-1.0..=1.0).contains(&v3), "3D value {v3} out of range");
            assert!((-1.0..=1.0).contains(&v2), "2D value {v2} out of range");
        }
    }

    #[test]
    fn test_continuity() {
        let field = NoiseField::new(WorldSeed::new(42));

        let (x, y, z) = (100.3, 12.7, 55.1);
        let delta = 0.001;

        let v = field.sample_3d(x, y, z);
        let dx = (v - field.sample_3d(x + delta, y, z)).abs();
        let dy = (v - field.sample_3d(x, y + delta, z)).abs();
        let dz = (v - field.sample_3d(x, y, z + delta)).abs();

        assert!(dx < 0.01, "Noise should be continuous in x: diff = {dx}");
        assert!(dy < 0.01, "Noise should be continuous in y: diff = {dy}");
        assert!(dz < 0.01, "Noise should be continuous in z: diff = {dz}");
    }

    #[test]
    fn test_gradient_noise_vanishes_on_lattice() {
        let field = NoiseField::new(WorldSeed::new(7));
        for i in -10..10 {
            let v = field.sample_3d(f64::from(i), f64::from(i * 2), f64::from(-i));
            assert!(v.abs() < 1e-12, "Lattice sample should be zero, got {v}");
        }
    }

    #[test]
    fn test_lattice_hash_range_and_spread() {
        let field = NoiseField::new(WorldSeed::new(42));

        let mut sum = 0.0;
        let n = 10_000;
        for i in 0..n {
            let v = field.lattice_hash(i, i * 3 - 7, 42);
            assert!((0.0..1.0).contains(&v), "Hash {v} out of [0, 1)");
            sum += v;
        }

        let mean = sum / n as f64;
        assert!((mean - 0.5).abs() < 0.02, "Hash should be roughly uniform, mean = {mean}");
        assert_eq!(field.lattice_hash(5, 6, 7), field.lattice_hash(5, 6, 7));
    }

    #[test]
    fn test_seed_derivation() {
        let base = WorldSeed::new(42);
        let derived1 = base.derive(1);
        let derived2 = base.derive(2);
        let derived1_again = base.derive(1);

        assert_ne!(derived1, derived2, "Different purposes should give different seeds");
        assert_eq!(derived1, derived1_again, "Same purpose should give same seed");
        assert_ne!(derived1, base, "Derived seed should differ from base");
    }

    #[test]
    fn test_field_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NoiseField>();
    }
}
