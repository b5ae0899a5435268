use ndarray::{Array2, Axis};
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

/// Separable Gaussian blur. Borders are clamped (edge pixels repeat).
pub fn gaussian_blur_array(data: &Array2<f32>, sigma: f32) -> Array2<f32> {
    if sigma <= 0.0 || data.is_empty() {
        return data.clone();
    }
    let kernel = make_gaussian_kernel(sigma);
    let row_pass = convolve(data, &kernel, Axis(1));
    convolve(&row_pass, &kernel, Axis(0))
}

fn make_gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil() as usize;
    let size = 2 * radius + 1;
    let mut kernel = vec![0.0f32; size];
    let s2 = 2.0 * sigma * sigma;
    let mut sum = 0.0f32;

    for (i, k) in kernel.iter_mut().enumerate() {
        let x = i as f32 - radius as f32;
        *k = (-x * x / s2).exp();
        sum += *k;
    }

    for v in &mut kernel {
        *v /= sum;
    }

    kernel
}

/// Convolve along `axis` (Axis(1) = along rows, Axis(0) = along columns).
fn convolve(data: &Array2<f32>, kernel: &[f32], axis: Axis) -> Array2<f32> {
    let (h, w) = data.dim();
    let radius = kernel.len() as isize / 2;
    let along_rows = axis == Axis(1);
    let limit = if along_rows { w } else { h } as isize;

    let tap = |row: usize, col: usize| -> f32 {
        let mut sum = 0.0f32;
        for (ki, &kv) in kernel.iter().enumerate() {
            let offset = ki as isize - radius;
            let v = if along_rows {
                let c = (col as isize + offset).clamp(0, limit - 1) as usize;
                data[[row, c]]
            } else {
                let r = (row as isize + offset).clamp(0, limit - 1) as usize;
                data[[r, col]]
            };
            sum += v * kv;
        }
        sum
    };

    let mut result = Array2::<f32>::zeros((h, w));
    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        result
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(row, mut out)| {
                for col in 0..w {
                    out[col] = tap(row, col);
                }
            });
    } else {
        for row in 0..h {
            for col in 0..w {
                result[[row, col]] = tap(row, col);
            }
        }
    }
    result
}
