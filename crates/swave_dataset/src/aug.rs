//! Image transformation pipeline applied when a sample is accessed.

use crate::types::DatasetSample;
use image::imageops::FilterType;
use rand::{Rng, SeedableRng};

/// Per-channel normalization, applied after scaling pixels to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalize {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Default for Normalize {
    fn default() -> Self {
        Self {
            mean: [0.5, 0.5, 0.5],
            std: [0.5, 0.5, 0.5],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransformPipeline {
    /// Resize every image to this (width, height). If None, images keep their size.
    pub target_size: Option<(u32, u32)>,
    /// Probability of a horizontal flip.
    pub flip_horizontal_prob: f32,
    pub normalize: Option<Normalize>,
    /// Seed for per-sample augmentation; mixed with the sample index.
    pub seed: Option<u64>,
}

impl TransformPipeline {
    pub fn builder() -> TransformPipelineBuilder {
        TransformPipelineBuilder::new()
    }

    /// Same geometry and normalization, no random augmentation.
    pub fn eval(&self) -> Self {
        Self {
            flip_horizontal_prob: 0.0,
            ..self.clone()
        }
    }

    pub fn describe(&self) -> String {
        let ts = self
            .target_size
            .map(|(w, h)| format!("{}x{}", w, h))
            .unwrap_or_else(|| "none".to_string());
        let norm = self
            .normalize
            .map(|n| format!("mean={:?} std={:?}", n.mean, n.std))
            .unwrap_or_else(|| "none".to_string());
        format!(
            "target_size={} flip_p={:.2} normalize={} seed={}",
            ts,
            self.flip_horizontal_prob,
            norm,
            self.seed
                .map(|s| s.to_string())
                .unwrap_or_else(|| "none".to_string())
        )
    }

    pub(crate) fn apply(
        &self,
        img: image::RgbImage,
        index: usize,
        label: i64,
    ) -> DatasetSample {
        let mut rng_local;
        let mut seeded_rng;
        let rng: &mut dyn rand::RngCore = if let Some(seed) = self.seed {
            seeded_rng = rand::rngs::StdRng::seed_from_u64(seed ^ index as u64);
            &mut seeded_rng
        } else {
            rng_local = rand::rng();
            &mut rng_local
        };

        let mut img = match self.target_size {
            Some((w, h)) if img.dimensions() != (w, h) => {
                image::imageops::resize(&img, w, h, FilterType::Triangle)
            }
            _ => img,
        };
        maybe_hflip(&mut img, self.flip_horizontal_prob, rng);

        let mut sample = to_chw_sample(&img, index, label);
        if let Some(norm) = self.normalize {
            normalize_chw(&mut sample.image_chw, &norm);
        }
        sample
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransformPipelineBuilder {
    inner: TransformPipeline,
}

impl TransformPipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn target_size(mut self, size: Option<(u32, u32)>) -> Self {
        self.inner.target_size = size;
        self
    }
    pub fn flip_horizontal_prob(mut self, p: f32) -> Self {
        self.inner.flip_horizontal_prob = p;
        self
    }
    pub fn normalize(mut self, norm: Option<Normalize>) -> Self {
        self.inner.normalize = norm;
        self
    }
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.inner.seed = seed;
        self
    }
    pub fn build(self) -> TransformPipeline {
        self.inner
    }
}

/// Raw RGB pixels scaled to [0, 1] in CHW order.
pub(crate) fn to_chw_sample(img: &image::RgbImage, index: usize, label: i64) -> DatasetSample {
    let (width, height) = img.dimensions();
    let plane = (width * height) as usize;
    let mut image_chw = vec![0.0f32; plane * 3];
    for (x, y, pixel) in img.enumerate_pixels() {
        let base = (y * width + x) as usize;
        image_chw[base] = pixel[0] as f32 / 255.0;
        image_chw[plane + base] = pixel[1] as f32 / 255.0;
        image_chw[2 * plane + base] = pixel[2] as f32 / 255.0;
    }
    DatasetSample {
        index,
        image_chw,
        width,
        height,
        label,
    }
}

fn normalize_chw(chw: &mut [f32], norm: &Normalize) {
    let plane = chw.len() / 3;
    for (c, channel) in chw.chunks_mut(plane.max(1)).enumerate().take(3) {
        let std = if norm.std[c].abs() > f32::EPSILON {
            norm.std[c]
        } else {
            1.0
        };
        for v in channel.iter_mut() {
            *v = (*v - norm.mean[c]) / std;
        }
    }
}

pub(crate) fn maybe_hflip(img: &mut image::RgbImage, prob: f32, rng: &mut dyn rand::RngCore) {
    if prob <= 0.0 {
        return;
    }
    if rng.random_range(0.0..1.0) < prob {
        image::imageops::flip_horizontal_in_place(img);
    }
}

#[cfg(test)]
mod aug_tests {
    use super::{maybe_hflip, normalize_chw, Normalize};
    use rand::rng;

    #[test]
    fn hflip_mirrors_columns() {
        let mut img = image::RgbImage::from_fn(2, 1, |x, _| image::Rgb([x as u8 * 200, 0, 0]));
        let mut rng = rng();
        maybe_hflip(&mut img, 1.0, &mut rng);
        assert_eq!(img.get_pixel(0, 0)[0], 200);
        assert_eq!(img.get_pixel(1, 0)[0], 0);
    }

    #[test]
    fn normalize_centers_each_channel() {
        let mut chw = vec![0.5, 1.0, 0.0, 0.5, 1.0, 1.0];
        normalize_chw(&mut chw, &Normalize::default());
        assert_eq!(chw, vec![0.0, 1.0, -1.0, 0.0, 1.0, 1.0]);
    }
}
