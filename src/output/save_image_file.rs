// 该文件是 Hongguo （红果） 项目的一部分。
// src/output/save_image_file.rs - 保存 JPEG 图像文件
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

use image::codecs::jpeg::JpegEncoder;
use thiserror::Error;
use tracing::debug;

use crate::frame::Frame;

const DEFAULT_JPEG_QUALITY: u8 = 95;

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像编码错误: {0}")]
  ImageError(#[from] image::ImageError),
}

/// 把标注帧编码为 JPEG 并写到固定路径
#[derive(Debug, Clone)]
pub struct JpegWriter {
  path: PathBuf,
  quality: u8,
}

impl JpegWriter {
  pub fn new(path: impl AsRef<Path>) -> Self {
    Self {
      path: path.as_ref().to_path_buf(),
      quality: DEFAULT_JPEG_QUALITY,
    }
  }

  pub fn with_quality(mut self, quality: u8) -> Self {
    self.quality = quality.clamp(1, 100);
    self
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn encode(&self, frame: &Frame) -> Result<Vec<u8>, SaveImageFileError> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, self.quality).encode_image(frame)?;
    Ok(bytes)
  }

  /// 写入文件并返回写入的字节，上传使用同一份数据
  pub fn write(&self, frame: &Frame) -> Result<Vec<u8>, SaveImageFileError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    let bytes = self.encode(frame)?;
    std::fs::write(&self.path, &bytes)?;
    debug!("保存图像到文件: {} ({} 字节)", self.path.display(), bytes.len());

    Ok(bytes)
  }
}
