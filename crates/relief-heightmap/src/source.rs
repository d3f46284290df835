//! Height sample sources: file-backed and procedural.

use std::path::Path;

use noise::{NoiseFn, Simplex};

use crate::HeightmapError;

/// A square grid of terrain height samples in `[0, 1]`.
///
/// Row 0 is the north edge of the terrain and `y` grows southward, matching
/// image row order, so file-backed maps need no vertical flip.
pub trait HeightSource {
    /// Samples per edge. The grid is `width() x width()`.
    fn width(&self) -> u32;

    /// Height at integer sample coordinates, in `[0, 1]`.
    fn sample(&self, x: u32, y: u32) -> f32;

    /// Height at possibly out-of-range coordinates, clamped to the grid
    /// edge. Boundary guard for neighbor reads near the map border.
    fn sample_clamped(&self, x: i64, y: i64) -> f32 {
        let max = (self.width() - 1) as i64;
        self.sample(x.clamp(0, max) as u32, y.clamp(0, max) as u32)
    }

    /// Bilinear height at fractional sample coordinates.
    fn sample_bilinear(&self, x: f32, y: f32) -> f32 {
        let max = (self.width() - 1) as f32;
        let x = x.clamp(0.0, max);
        let y = y.clamp(0.0, max);
        let x0 = x.floor();
        let y0 = y.floor();
        let tx = x - x0;
        let ty = y - y0;
        let x0 = x0 as i64;
        let y0 = y0 as i64;

        let h00 = self.sample_clamped(x0, y0);
        let h10 = self.sample_clamped(x0 + 1, y0);
        let h01 = self.sample_clamped(x0, y0 + 1);
        let h11 = self.sample_clamped(x0 + 1, y0 + 1);

        let north = h00 + (h10 - h00) * tx;
        let south = h01 + (h11 - h01) * tx;
        north + (south - north) * ty
    }
}

/// Heightmap backed by a grayscale image file.
#[derive(Debug)]
pub struct ImageHeightmap {
    samples: Vec<f32>,
    width: u32,
}

impl ImageHeightmap {
    /// Load a heightmap from a PNG file, taking the luma channel as height.
    ///
    /// Non-square images are rejected: the quadtree covers a square region.
    pub fn load(path: &Path) -> Result<Self, HeightmapError> {
        let bytes = std::fs::read(path).map_err(HeightmapError::Read)?;
        let image = image::load_from_memory(&bytes).map_err(HeightmapError::Decode)?;
        let gray = image.into_luma16();
        let (width, height) = gray.dimensions();
        if width != height {
            return Err(HeightmapError::NotSquare { width, height });
        }
        let samples = gray
            .pixels()
            .map(|p| f32::from(p.0[0]) / f32::from(u16::MAX))
            .collect();
        Ok(Self { samples, width })
    }

    /// Wrap an existing row-major sample grid.
    ///
    /// # Panics
    ///
    /// Panics if `samples.len() != width * width`.
    pub fn from_samples(samples: Vec<f32>, width: u32) -> Self {
        assert_eq!(
            samples.len(),
            (width * width) as usize,
            "sample count must match width * width"
        );
        Self { samples, width }
    }
}

impl HeightSource for ImageHeightmap {
    fn width(&self) -> u32 {
        self.width
    }

    fn sample(&self, x: u32, y: u32) -> f32 {
        self.samples[(y * self.width + x) as usize]
    }
}

/// Parameters for the procedural fBm height source.
#[derive(Clone, Debug)]
pub struct FbmParams {
    /// Seed for deterministic generation.
    pub seed: u64,
    /// Number of noise octaves to composite.
    pub octaves: u32,
    /// Frequency multiplier between successive octaves.
    pub lacunarity: f64,
    /// Amplitude multiplier between successive octaves.
    pub persistence: f64,
    /// Frequency of the first octave, in cycles per sample.
    pub base_frequency: f64,
    /// Amplitude of the first octave.
    pub amplitude: f64,
}

impl Default for FbmParams {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 6,
            lacunarity: 2.0,
            persistence: 0.5,
            base_frequency: 0.01,
            amplitude: 1.0,
        }
    }
}

/// Procedural height source compositing multiple octaves of simplex noise.
///
/// Each successive octave doubles in frequency and halves in amplitude
/// (by default), producing self-similar detail at progressively finer
/// scales. Output is normalized into `[0, 1]`.
pub struct FbmHeightmap {
    noise: Simplex,
    params: FbmParams,
    width: u32,
    max_amplitude: f64,
}

impl FbmHeightmap {
    /// Create a source of `width` samples per edge.
    pub fn new(width: u32, params: FbmParams) -> Self {
        let noise = Simplex::new(params.seed as u32);
        // geometric series sum of octave amplitudes, for normalization
        let mut max_amplitude = 0.0;
        let mut amplitude = params.amplitude;
        for _ in 0..params.octaves {
            max_amplitude += amplitude;
            amplitude *= params.persistence;
        }
        Self {
            noise,
            params,
            width,
            max_amplitude,
        }
    }

    fn fbm(&self, x: f64, y: f64) -> f64 {
        let mut total = 0.0;
        let mut frequency = self.params.base_frequency;
        let mut amplitude = self.params.amplitude;
        for _ in 0..self.params.octaves {
            total += self.noise.get([x * frequency, y * frequency]) * amplitude;
            frequency *= self.params.lacunarity;
            amplitude *= self.params.persistence;
        }
        total
    }
}

impl HeightSource for FbmHeightmap {
    fn width(&self) -> u32 {
        self.width
    }

    fn sample(&self, x: u32, y: u32) -> f32 {
        if self.max_amplitude == 0.0 {
            return 0.5;
        }
        let value = self.fbm(f64::from(x), f64::from(y)) / self.max_amplitude;
        ((value * 0.5 + 0.5).clamp(0.0, 1.0)) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_samples_row_major_indexing() {
        let source = ImageHeightmap::from_samples(vec![0.0, 0.1, 0.2, 0.3], 2);
        assert_eq!(source.sample(0, 0), 0.0);
        assert_eq!(source.sample(1, 0), 0.1);
        assert_eq!(source.sample(0, 1), 0.2);
        assert_eq!(source.sample(1, 1), 0.3);
    }

    #[test]
    #[should_panic(expected = "width * width")]
    fn test_from_samples_wrong_length_panics() {
        ImageHeightmap::from_samples(vec![0.0; 5], 2);
    }

    #[test]
    fn test_sample_clamped_at_borders() {
        let source = ImageHeightmap::from_samples(vec![0.0, 0.1, 0.2, 0.3], 2);
        assert_eq!(source.sample_clamped(-3, 0), 0.0);
        assert_eq!(source.sample_clamped(5, 0), 0.1);
        assert_eq!(source.sample_clamped(0, 9), 0.2);
        assert_eq!(source.sample_clamped(7, 7), 0.3);
    }

    #[test]
    fn test_sample_bilinear_midpoints() {
        let source = ImageHeightmap::from_samples(vec![0.0, 1.0, 0.0, 1.0], 2);
        assert!((source.sample_bilinear(0.5, 0.0) - 0.5).abs() < 1e-6);
        assert!((source.sample_bilinear(0.5, 1.0) - 0.5).abs() < 1e-6);
        assert!((source.sample_bilinear(0.0, 0.5) - 0.0).abs() < 1e-6);
        assert!((source.sample_bilinear(0.5, 0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_load_rejects_non_square_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.png");
        let image = image::GrayImage::new(4, 2);
        image.save(&path).unwrap();

        match ImageHeightmap::load(&path) {
            Err(HeightmapError::NotSquare { width: 4, height: 2 }) => {}
            other => panic!("expected NotSquare, got {other:?}"),
        }
    }

    #[test]
    fn test_load_round_trips_pixel_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.png");
        let mut image = image::GrayImage::new(2, 2);
        image.put_pixel(0, 0, image::Luma([0]));
        image.put_pixel(1, 0, image::Luma([255]));
        image.put_pixel(0, 1, image::Luma([128]));
        image.put_pixel(1, 1, image::Luma([64]));
        image.save(&path).unwrap();

        let source = ImageHeightmap::load(&path).unwrap();
        assert_eq!(source.width(), 2);
        assert!((source.sample(0, 0) - 0.0).abs() < 1e-3);
        assert!((source.sample(1, 0) - 1.0).abs() < 1e-3);
        assert!((source.sample(0, 1) - 128.0 / 255.0).abs() < 1e-2);
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let result = ImageHeightmap::load(Path::new("/nonexistent/map.png"));
        assert!(matches!(result, Err(HeightmapError::Read(_))));
    }

    #[test]
    fn test_fbm_determinism_same_seed() {
        let a = FbmHeightmap::new(64, FbmParams {
            seed: 42,
            ..Default::default()
        });
        let b = FbmHeightmap::new(64, FbmParams {
            seed: 42,
            ..Default::default()
        });
        for (x, y) in [(0, 0), (13, 7), (63, 63)] {
            assert_eq!(a.sample(x, y), b.sample(x, y));
        }
    }

    #[test]
    fn test_fbm_different_seeds_differ() {
        let a = FbmHeightmap::new(64, FbmParams {
            seed: 1,
            ..Default::default()
        });
        let b = FbmHeightmap::new(64, FbmParams {
            seed: 999,
            ..Default::default()
        });
        let differs = (0..64).any(|i| a.sample(i, i) != b.sample(i, i));
        assert!(differs, "different seeds should produce different heights");
    }

    #[test]
    fn test_fbm_output_within_unit_range() {
        let source = FbmHeightmap::new(128, FbmParams::default());
        for y in 0..128 {
            for x in 0..128 {
                let h = source.sample(x, y);
                assert!((0.0..=1.0).contains(&h), "height {h} out of range at ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_fbm_zero_amplitude_is_flat() {
        let source = FbmHeightmap::new(16, FbmParams {
            amplitude: 0.0,
            ..Default::default()
        });
        assert_eq!(source.sample(3, 9), 0.5);
    }
}
