//! Seeded multi-harmonic noise fields normalized to `[0, 1]`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use fastnoise_lite::{FastNoiseLite, NoiseType};
use serde::{Deserialize, Serialize};

/// Octave layout of a [`NoiseField`].
///
/// Octave `i` samples with period `base_period / spread^i` and contributes
/// with amplitude `gain^i`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HarmonicSpec {
    #[serde(default = "d_harmonics")]
    pub harmonics: u32,
    #[serde(default = "d_base_period")]
    pub base_period: f32,
    #[serde(default = "d_spread")]
    pub spread: f32,
    #[serde(default = "d_gain")]
    pub gain: f32,
}
fn d_harmonics() -> u32 {
    4
}
fn d_base_period() -> f32 {
    256.0
}
fn d_spread() -> f32 {
    2.0
}
fn d_gain() -> f32 {
    0.5
}

impl Default for HarmonicSpec {
    fn default() -> Self {
        Self {
            harmonics: d_harmonics(),
            base_period: d_base_period(),
            spread: d_spread(),
            gain: d_gain(),
        }
    }
}

impl HarmonicSpec {
    pub const fn new(harmonics: u32, base_period: f32, spread: f32, gain: f32) -> Self {
        Self {
            harmonics,
            base_period,
            spread,
            gain,
        }
    }

    #[inline]
    pub fn period(&self, octave: u32) -> f32 {
        self.base_period / self.spread.powi(octave as i32)
    }

    #[inline]
    pub fn amplitude(&self, octave: u32) -> f32 {
        self.gain.powi(octave as i32)
    }
}

/// FNV-1a over the seed string. Stable across runs and platforms.
pub fn seed_hash(seed: &str) -> u32 {
    let mut h: u32 = 0x811c_9dc5;
    for b in seed.as_bytes() {
        h ^= u32::from(*b);
        h = h.wrapping_mul(0x0100_0193);
    }
    h
}

struct Octave {
    generator: FastNoiseLite,
    amplitude: f32,
}

pub struct NoiseField {
    seed: String,
    spec: HarmonicSpec,
    octaves: Vec<Octave>,
    total_amplitude: f32,
    anomalies: AtomicU64,
}

impl NoiseField {
    pub fn new(seed: &str, spec: HarmonicSpec) -> Self {
        let mut field = Self {
            seed: seed.to_string(),
            spec,
            octaves: Vec::new(),
            total_amplitude: 0.0,
            anomalies: AtomicU64::new(0),
        };
        field.rebuild();
        field
    }

    fn rebuild(&mut self) {
        let base = seed_hash(&self.seed);
        let count = self.spec.harmonics.max(1);
        self.octaves.clear();
        self.total_amplitude = 0.0;
        for i in 0..count {
            let octave_seed = base.wrapping_add(i.wrapping_mul(0x9E37_79B9)) as i32;
            let mut generator = FastNoiseLite::with_seed(octave_seed);
            generator.set_noise_type(Some(NoiseType::OpenSimplex2));
            let period = self.spec.period(i).max(f32::EPSILON);
            generator.set_frequency(Some(1.0 / period));
            let amplitude = self.spec.amplitude(i);
            self.total_amplitude += amplitude;
            self.octaves.push(Octave {
                generator,
                amplitude,
            });
        }
    }

    /// Replaces the seed and rebuilds every octave.
    pub fn reseed(&mut self, seed: &str) {
        self.seed = seed.to_string();
        self.rebuild();
    }

    pub fn set_spec(&mut self, spec: HarmonicSpec) {
        self.spec = spec;
        self.rebuild();
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn spec(&self) -> HarmonicSpec {
        self.spec
    }

    /// Number of samples that fell outside `[0, 1]` before clamping.
    pub fn anomalies(&self) -> u64 {
        self.anomalies.load(Ordering::Relaxed)
    }

    pub fn eval2(&self, x: f32, z: f32) -> f32 {
        let mut sum = 0.0_f32;
        for o in &self.octaves {
            sum += o.amplitude * (o.generator.get_noise_2d(x, z) * 0.5 + 0.5);
        }
        self.normalize(sum)
    }

    pub fn eval3(&self, x: f32, y: f32, z: f32) -> f32 {
        let mut sum = 0.0_f32;
        for o in &self.octaves {
            sum += o.amplitude * (o.generator.get_noise_3d(x, y, z) * 0.5 + 0.5);
        }
        self.normalize(sum)
    }

    #[inline]
    fn normalize(&self, sum: f32) -> f32 {
        let v = if self.total_amplitude > 0.0 {
            sum / self.total_amplitude
        } else {
            0.0
        };
        if !(0.0..=1.0).contains(&v) {
            self.anomalies.fetch_add(1, Ordering::Relaxed);
            if v.is_nan() {
                return 0.0;
            }
        }
        v.clamp(0.0, 1.0)
    }
}

impl Clone for NoiseField {
    fn clone(&self) -> Self {
        Self::new(&self.seed, self.spec)
    }
}

impl fmt::Debug for NoiseField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoiseField")
            .field("seed", &self.seed)
            .field("spec", &self.spec)
            .field("anomalies", &self.anomalies())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_hash_is_stable() {
        assert_eq!(seed_hash(""), 0x811c_9dc5);
        assert_eq!(seed_hash("a"), 0xe40c_292c);
        assert_ne!(seed_hash("strata"), seed_hash("strata:heat"));
    }

    #[test]
    fn octave_periods_shrink_by_spread() {
        let spec = HarmonicSpec::new(3, 128.0, 2.0, 0.5);
        assert_eq!(spec.period(0), 128.0);
        assert_eq!(spec.period(2), 32.0);
        assert_eq!(spec.amplitude(2), 0.25);
    }

    #[test]
    fn reseed_changes_output() {
        let mut f = NoiseField::new("one", HarmonicSpec::default());
        let a: Vec<f32> = (0..32).map(|i| f.eval2(i as f32 * 7.3, i as f32 * 3.1)).collect();
        f.reseed("two");
        let b: Vec<f32> = (0..32).map(|i| f.eval2(i as f32 * 7.3, i as f32 * 3.1)).collect();
        assert_ne!(a, b);
        f.reseed("one");
        let c: Vec<f32> = (0..32).map(|i| f.eval2(i as f32 * 7.3, i as f32 * 3.1)).collect();
        assert_eq!(a, c);
    }

    #[test]
    fn zero_harmonics_still_yields_one_octave() {
        let f = NoiseField::new("s", HarmonicSpec::new(0, 64.0, 2.0, 0.5));
        let v = f.eval2(10.0, 10.0);
        assert!((0.0..=1.0).contains(&v));
    }
}
