// 该文件是 Hongguo （红果） 项目的一部分。
// src/output/draw.rs - 成熟度结果可视化
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

use std::path::{Path, PathBuf};

use ab_glyph::{FontArc, PxScale};
use image::Rgb;
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  frame::{BoundingBox, Frame},
  model::{Classification, Ripeness},
};

pub const RIPE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const UNRIPE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 22.0;
const LABEL_BASELINE_OFFSET: i32 = 10;
const BOX_THICKNESS: u32 = 2;

const EMBEDDED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

#[derive(Error, Debug)]
pub enum LabelFontError {
  #[error("字体文件读取失败 {0}: {1}")]
  IoError(PathBuf, std::io::Error),
  #[error("无效的字体数据: {0}")]
  InvalidFont(#[from] ab_glyph::InvalidFont),
}

/// 标注文字使用的 TrueType 字体
#[derive(Clone)]
pub struct LabelFont {
  font: FontArc,
}

impl LabelFont {
  pub fn from_bytes(data: Vec<u8>) -> Result<Self, LabelFontError> {
    Ok(Self {
      font: FontArc::try_from_vec(data)?,
    })
  }

  pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LabelFontError> {
    let path = path.as_ref();
    let data =
      std::fs::read(path).map_err(|e| LabelFontError::IoError(path.to_path_buf(), e))?;
    Self::from_bytes(data)
  }

  /// 随程序内嵌的 DejaVu Sans
  pub fn embedded() -> Result<Self, LabelFontError> {
    Ok(Self {
      font: FontArc::try_from_slice(EMBEDDED_FONT)?,
    })
  }

  /// 显式指定的字体必须可用，否则使用内嵌字体
  pub fn discover(explicit: Option<&Path>) -> Result<Self, LabelFontError> {
    match explicit {
      Some(path) => {
        info!("加载标注字体: {}", path.display());
        Self::from_path(path)
      }
      None => {
        debug!("使用内嵌标注字体");
        Self::embedded()
      }
    }
  }
}

/// 在帧上绘制候选框与成熟度标签
#[derive(Clone)]
pub struct AnnotationRenderer {
  font: Option<LabelFont>,
  font_scale: PxScale,
}

impl Default for AnnotationRenderer {
  fn default() -> Self {
    let font = LabelFont::embedded()
      .inspect_err(|e| warn!("内嵌字体不可用，标注将只绘制边框: {}", e))
      .ok();
    Self::new(font)
  }
}

impl AnnotationRenderer {
  /// `None` 时只绘制边框
  pub fn new(font: Option<LabelFont>) -> Self {
    Self {
      font,
      font_scale: PxScale::from(LABEL_FONT_SIZE),
    }
  }

  pub fn has_font(&self) -> bool {
    self.font.is_some()
  }

  pub fn color_for(label: Ripeness) -> Rgb<u8> {
    match label {
      Ripeness::Ripe => RIPE_COLOR,
      Ripeness::Unripe => UNRIPE_COLOR,
    }
  }

  /// 返回标注后的副本，原帧不变
  pub fn render(&self, base: &Frame, results: &[Classification]) -> Frame {
    let mut canvas = base.clone();
    for result in results {
      self.draw_result(&mut canvas, result);
    }
    canvas
  }

  fn draw_result(&self, canvas: &mut Frame, result: &Classification) {
    let color = Self::color_for(result.label);
    draw_box(canvas, &result.position, color);

    let Some(font) = &self.font else {
      return;
    };

    let caption = result.caption();
    let (text_width, text_height) = text_size(self.font_scale, &font.font, &caption);

    // 基线位于框上方 10 像素，文字整体保持在图像内
    let max_x = (canvas.width() as i32 - text_width as i32).max(0);
    let max_y = (canvas.height() as i32 - text_height as i32).max(0);
    let x = (result.position.x as i32).clamp(0, max_x);
    let y = (result.position.y as i32 - LABEL_BASELINE_OFFSET - text_height as i32).clamp(0, max_y);

    draw_text_mut(canvas, color, x, y, self.font_scale, &font.font, &caption);
  }
}

// 向内加粗的矩形边框
fn draw_box(canvas: &mut Frame, bbox: &BoundingBox, color: Rgb<u8>) {
  for inset in 0..BOX_THICKNESS {
    let width = bbox.width.saturating_sub(2 * inset);
    let height = bbox.height.saturating_sub(2 * inset);
    if width == 0 || height == 0 {
      break;
    }
    let rect = Rect::at((bbox.x + inset) as i32, (bbox.y + inset) as i32).of_size(width, height);
    draw_hollow_rect_mut(canvas, rect, color);
  }
}
