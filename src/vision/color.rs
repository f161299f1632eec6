// 该文件是 Hongguo （红果） 项目的一部分。
// src/vision/color.rs - 颜色空间转换
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

//! 8 位颜色空间转换。
//!
//! 编码与常见视觉库的 8 位约定一致：
//! - Lab: `L * 255 / 100`，`a + 128`，`b + 128`，sRGB 伽马，D65 白点
//! - HSV: 色相 `[0, 180]`，饱和度与明度 `[0, 255]`

use image::Rgb;

// D65 白点
const WHITE_X: f32 = 0.950456;
const WHITE_Z: f32 = 1.088754;

const LAB_EPSILON: f32 = 0.008856;
const LAB_KAPPA: f32 = 903.3;

fn srgb_to_linear(value: u8) -> f32 {
  let c = value as f32 / 255.0;
  if c <= 0.04045 {
    c / 12.92
  } else {
    ((c + 0.055) / 1.055).powf(2.4)
  }
}

fn linear_to_srgb(value: f32) -> u8 {
  let c = value.clamp(0.0, 1.0);
  let c = if c <= 0.003_130_8 {
    12.92 * c
  } else {
    1.055 * c.powf(1.0 / 2.4) - 0.055
  };
  saturate(c * 255.0)
}

fn lab_f(t: f32) -> f32 {
  if t > LAB_EPSILON {
    t.cbrt()
  } else {
    7.787 * t + 16.0 / 116.0
  }
}

fn lab_f_inv(t: f32) -> f32 {
  if t > 0.206_893 {
    t * t * t
  } else {
    (t - 16.0 / 116.0) / 7.787
  }
}

fn saturate(value: f32) -> u8 {
  value.round().clamp(0.0, 255.0) as u8
}

/// RGB 转 8 位 Lab
pub fn rgb_to_lab(pixel: &Rgb<u8>) -> [u8; 3] {
  let [r, g, b] = pixel.0.map(srgb_to_linear);

  let x = (0.412_453 * r + 0.357_580 * g + 0.180_423 * b) / WHITE_X;
  let y = 0.212_671 * r + 0.715_160 * g + 0.072_169 * b;
  let z = (0.019_334 * r + 0.119_193 * g + 0.950_227 * b) / WHITE_Z;

  let (fx, fy, fz) = (lab_f(x), lab_f(y), lab_f(z));
  let l = if y > LAB_EPSILON {
    116.0 * fy - 16.0
  } else {
    LAB_KAPPA * y
  };

  [
    saturate(l * 255.0 / 100.0),
    saturate(500.0 * (fx - fy) + 128.0),
    saturate(200.0 * (fy - fz) + 128.0),
  ]
}

/// 8 位 Lab 转 RGB，超出色域的分量被裁剪
pub fn lab_to_rgb(lab: [u8; 3]) -> Rgb<u8> {
  let l = lab[0] as f32 * 100.0 / 255.0;
  let a = lab[1] as f32 - 128.0;
  let b = lab[2] as f32 - 128.0;

  let fy = (l + 16.0) / 116.0;
  let fx = fy + a / 500.0;
  let fz = fy - b / 200.0;

  let x = lab_f_inv(fx) * WHITE_X;
  let y = lab_f_inv(fy);
  let z = lab_f_inv(fz) * WHITE_Z;

  let r = 3.240_479 * x - 1.537_150 * y - 0.498_535 * z;
  let g = -0.969_256 * x + 1.875_991 * y + 0.041_556 * z;
  let b = 0.055_648 * x - 0.204_043 * y + 1.057_311 * z;

  Rgb([linear_to_srgb(r), linear_to_srgb(g), linear_to_srgb(b)])
}

/// RGB 转 8 位 HSV
pub fn rgb_to_hsv(pixel: &Rgb<u8>) -> [u8; 3] {
  let [r, g, b] = pixel.0.map(|c| c as f32);
  let max = r.max(g).max(b);
  let min = r.min(g).min(b);
  let delta = max - min;

  let saturation = if max > 0.0 { delta * 255.0 / max } else { 0.0 };

  let mut hue = if delta == 0.0 {
    0.0
  } else if max == r {
    60.0 * (g - b) / delta
  } else if max == g {
    120.0 + 60.0 * (b - r) / delta
  } else {
    240.0 + 60.0 * (r - g) / delta
  };
  if hue < 0.0 {
    hue += 360.0;
  }

  [saturate(hue / 2.0), saturate(saturation), max as u8]
}
