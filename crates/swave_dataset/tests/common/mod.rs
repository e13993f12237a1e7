#![allow(dead_code)]

use image::{Luma, Rgb};
use std::fs;
use std::path::{Path, PathBuf};
use swave_dataset::{DatasetConfig, SampleLayout};

/// Alternating-ish labels for `cases` cases: every third case is positive.
pub fn case_labels(cases: usize) -> Vec<i64> {
    (0..cases).map(|c| i64::from(c % 3 == 1)).collect()
}

pub fn write_json_labels(path: &Path, key: &str, labels: &[i64]) -> anyhow::Result<()> {
    let doc = serde_json::json!({ key: labels });
    fs::write(path, serde_json::to_vec(&doc)?)?;
    Ok(())
}

/// Write every image the layout expects as a small solid PNG whose red channel
/// encodes the sample position.
pub fn write_images(dir: &Path, cases: usize, layout: SampleLayout) -> anyhow::Result<()> {
    fs::create_dir_all(dir)?;
    let per_case = layout.samples_per_case();
    for case in 1..=cases {
        for plane in 1..=per_case {
            let shade = (((case - 1) * per_case + plane - 1) % 256) as u8;
            let img = image::RgbImage::from_pixel(4, 4, Rgb([shade, 64, 128]));
            img.save(dir.join(layout.file_name("SWAVE", case, plane)))?;
        }
    }
    Ok(())
}

pub fn write_gray_image(path: &Path, w: u32, h: u32, value: u8) -> anyhow::Result<()> {
    image::GrayImage::from_pixel(w, h, Luma([value])).save(path)?;
    Ok(())
}

/// Full synthetic dataset on disk; returns the config pointing at it.
pub fn synthetic_dataset(
    root: &Path,
    labels: &[i64],
    layout: SampleLayout,
) -> anyhow::Result<DatasetConfig> {
    let image_dir = root.join("images");
    write_images(&image_dir, labels.len(), layout)?;
    let label_file = root.join("label.json");
    write_json_labels(&label_file, "label", labels)?;
    Ok(DatasetConfig {
        image_dir,
        label_file,
        label_key: "label".to_string(),
        case_count: labels.len(),
        layout,
        ..Default::default()
    })
}

/// Minimal level-5 MAT file holding one `1 x n` double array named `name`.
pub fn write_mat_doubles(path: &Path, name: &str, values: &[f64]) -> anyhow::Result<PathBuf> {
    const MI_INT8: u32 = 1;
    const MI_INT32: u32 = 5;
    const MI_UINT32: u32 = 6;
    const MI_DOUBLE: u32 = 9;
    const MI_MATRIX: u32 = 14;
    const MX_DOUBLE_CLASS: u32 = 6;

    fn pad8(len: usize) -> usize {
        len.div_ceil(8) * 8
    }
    fn tag(buf: &mut Vec<u8>, ty: u32, len: usize) {
        buf.extend_from_slice(&ty.to_le_bytes());
        buf.extend_from_slice(&(len as u32).to_le_bytes());
    }

    let mut body = Vec::new();
    tag(&mut body, MI_UINT32, 8);
    body.extend_from_slice(&MX_DOUBLE_CLASS.to_le_bytes());
    body.extend_from_slice(&0u32.to_le_bytes());
    tag(&mut body, MI_INT32, 8);
    body.extend_from_slice(&1i32.to_le_bytes());
    body.extend_from_slice(&(values.len() as i32).to_le_bytes());
    tag(&mut body, MI_INT8, name.len());
    body.extend_from_slice(name.as_bytes());
    body.resize(body.len() + pad8(name.len()) - name.len(), 0);
    tag(&mut body, MI_DOUBLE, values.len() * 8);
    for v in values {
        body.extend_from_slice(&v.to_le_bytes());
    }

    let mut text = b"MATLAB 5.0 MAT-file, Platform: GLNXA64, Created by: swave_dataset tests".to_vec();
    text.resize(116, b' ');
    let mut out = text;
    out.extend_from_slice(&[0u8; 8]);
    out.extend_from_slice(&0x0100u16.to_le_bytes());
    out.extend_from_slice(b"IM");
    tag(&mut out, MI_MATRIX, body.len());
    out.extend_from_slice(&body);
    fs::write(path, out)?;
    Ok(path.to_path_buf())
}
