// 该文件是 Hongguo （红果） 项目的一部分。
// src/vision/enhance.rs - 光照归一化（CLAHE + 伽马校正）
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::{GrayImage, Luma};
use tracing::debug;

use crate::frame::Frame;
use crate::vision::color::{lab_to_rgb, rgb_to_lab};

const HISTOGRAM_BINS: usize = 256;

const DEFAULT_TILE_GRID: (u32, u32) = (8, 8);
const DEFAULT_CLIP_LIMIT: f32 = 3.0;
const DEFAULT_LUMINANCE_GAIN: f32 = 1.2;
const DEFAULT_GAMMA: f32 = 1.5;

/// 生成伽马查找表：`lut[i] = clamp((i / 255)^(1 / gamma) * 255, 0, 255)`，截断取整
pub fn gamma_lut(gamma: f32) -> [u8; HISTOGRAM_BINS] {
  let mut lut = [0u8; HISTOGRAM_BINS];
  for (i, entry) in lut.iter_mut().enumerate() {
    let value = (i as f64 / 255.0).powf(1.0 / gamma as f64) * 255.0;
    *entry = value.clamp(0.0, 255.0) as u8;
  }
  lut
}

/// 对比度受限的自适应直方图均衡
///
/// 图像被划分为 `tiles.0 × tiles.1` 个块，每块计算一个裁剪后的均衡查找表，
/// 像素值由相邻四个块的查找表双线性插值得到。
pub fn clahe(image: &GrayImage, tiles: (u32, u32), clip_limit: f32) -> GrayImage {
  let (width, height) = image.dimensions();
  if width == 0 || height == 0 {
    return image.clone();
  }

  let tile_w = width.div_ceil(tiles.0.clamp(1, width));
  let tile_h = height.div_ceil(tiles.1.clamp(1, height));
  let tiles_x = width.div_ceil(tile_w);
  let tiles_y = height.div_ceil(tile_h);

  let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
  for ty in 0..tiles_y {
    for tx in 0..tiles_x {
      let x0 = tx * tile_w;
      let y0 = ty * tile_h;
      let x1 = (x0 + tile_w).min(width);
      let y1 = (y0 + tile_h).min(height);
      luts.push(tile_lut(image, (x0, y0, x1, y1), clip_limit));
    }
  }

  let inv_tw = 1.0 / tile_w as f32;
  let inv_th = 1.0 / tile_h as f32;

  GrayImage::from_fn(width, height, |x, y| {
    let value = image.get_pixel(x, y)[0] as usize;

    let txf = x as f32 * inv_tw - 0.5;
    let tyf = y as f32 * inv_th - 0.5;
    let tx1 = txf.floor();
    let ty1 = tyf.floor();
    let xa = txf - tx1;
    let ya = tyf - ty1;

    let tx1 = (tx1.max(0.0) as u32).min(tiles_x - 1);
    let ty1 = (ty1.max(0.0) as u32).min(tiles_y - 1);
    let tx2 = (tx1 + 1).min(tiles_x - 1);
    let ty2 = (ty1 + 1).min(tiles_y - 1);
    // 左/上越界时 floor 为 -1，权重需要对应到同一块
    let (xa, ya) = (
      if txf < 0.0 { 0.0 } else { xa },
      if tyf < 0.0 { 0.0 } else { ya },
    );

    let lut = |tx: u32, ty: u32| luts[(ty * tiles_x + tx) as usize][value] as f32;
    let top = lut(tx1, ty1) * (1.0 - xa) + lut(tx2, ty1) * xa;
    let bottom = lut(tx1, ty2) * (1.0 - xa) + lut(tx2, ty2) * xa;

    Luma([(top * (1.0 - ya) + bottom * ya).round().clamp(0.0, 255.0) as u8])
  })
}

fn tile_lut(image: &GrayImage, region: (u32, u32, u32, u32), clip_limit: f32) -> [u8; HISTOGRAM_BINS] {
  let (x0, y0, x1, y1) = region;
  let area = ((x1 - x0) * (y1 - y0)) as usize;

  let mut histogram = [0usize; HISTOGRAM_BINS];
  for y in y0..y1 {
    for x in x0..x1 {
      histogram[image.get_pixel(x, y)[0] as usize] += 1;
    }
  }

  if clip_limit > 0.0 {
    let clip = ((clip_limit * area as f32 / HISTOGRAM_BINS as f32) as usize).max(1);

    let mut clipped = 0usize;
    for bin in histogram.iter_mut() {
      if *bin > clip {
        clipped += *bin - clip;
        *bin = clip;
      }
    }

    let batch = clipped / HISTOGRAM_BINS;
    let residual = clipped % HISTOGRAM_BINS;
    for bin in histogram.iter_mut() {
      *bin += batch;
    }
    if residual > 0 {
      let step = (HISTOGRAM_BINS / residual).max(1);
      for bin in histogram.iter_mut().step_by(step).take(residual) {
        *bin += 1;
      }
    }
  }

  let scale = 255.0 / area as f32;
  let mut lut = [0u8; HISTOGRAM_BINS];
  let mut cumulative = 0usize;
  for (entry, count) in lut.iter_mut().zip(histogram.iter()) {
    cumulative += count;
    *entry = (cumulative as f32 * scale).round().clamp(0.0, 255.0) as u8;
  }
  lut
}

/// 图像增强器
///
/// 在 Lab 空间对亮度做 CLAHE 与增益，再回到 RGB 做伽马校正。
#[derive(Debug, Clone)]
pub struct ImageEnhancer {
  tile_grid: (u32, u32),
  clip_limit: f32,
  luminance_gain: f32,
  gamma_lut: [u8; HISTOGRAM_BINS],
}

impl Default for ImageEnhancer {
  fn default() -> Self {
    Self::new(
      DEFAULT_TILE_GRID,
      DEFAULT_CLIP_LIMIT,
      DEFAULT_LUMINANCE_GAIN,
      DEFAULT_GAMMA,
    )
  }
}

impl ImageEnhancer {
  pub fn new(tile_grid: (u32, u32), clip_limit: f32, luminance_gain: f32, gamma: f32) -> Self {
    Self {
      tile_grid,
      clip_limit,
      luminance_gain,
      gamma_lut: gamma_lut(gamma),
    }
  }

  pub fn gamma_table(&self) -> &[u8; HISTOGRAM_BINS] {
    &self.gamma_lut
  }

  /// 返回增强后的新帧，输入帧保持不变
  pub fn enhance(&self, frame: &Frame) -> Frame {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
      return frame.clone();
    }

    let lab: Vec<[u8; 3]> = frame.pixels().map(rgb_to_lab).collect();
    let luminance = GrayImage::from_fn(width, height, |x, y| {
      Luma([lab[(y * width + x) as usize][0]])
    });
    let equalized = clahe(&luminance, self.tile_grid, self.clip_limit);
    debug!("亮度通道均衡完成: {}x{}", width, height);

    Frame::from_fn(width, height, |x, y| {
      let [_, a, b] = lab[(y * width + x) as usize];
      let l = equalized.get_pixel(x, y)[0] as f32 * self.luminance_gain;
      let l = l.round().clamp(0.0, 255.0) as u8;
      let rgb = lab_to_rgb([l, a, b]);
      image::Rgb(rgb.0.map(|c| self.gamma_lut[c as usize]))
    })
  }
}
