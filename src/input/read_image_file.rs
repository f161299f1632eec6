// 该文件是 Hongguo （红果） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use image::ImageReader;
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Frame, input::Camera};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

/// 把磁盘上的图像当作摄像头，每次采集重新读取文件
pub struct ImageFileCamera {
  path: PathBuf,
}

impl FromUrlWithScheme for ImageFileCamera {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileCamera {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    Ok(Self::new(url.path()))
  }
}

impl ImageFileCamera {
  pub fn new(path: impl AsRef<Path>) -> Self {
    Self {
      path: path.as_ref().to_path_buf(),
    }
  }
}

impl Camera for ImageFileCamera {
  type Error = ImageFileInputError;

  fn capture(&mut self) -> Result<Frame, Self::Error> {
    let image = ImageReader::open(&self.path)?.decode()?.into_rgb8();
    debug!(
      "读取图像文件 {}: {}x{}",
      self.path.display(),
      image.width(),
      image.height()
    );
    Ok(image)
  }
}
