// 该文件是 Hongguo （红果） 项目的一部分。
// src/input.rs - 摄像头/图像输入
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

use thiserror::Error;

use crate::{FromUrl, FromUrlWithScheme, frame::Frame};

/// 按需获取单帧的输入源
///
/// 每次调用内完成设备的打开、读取与释放，调用之间不持有设备。
pub trait Camera {
  type Error;
  fn capture(&mut self) -> Result<Frame, Self::Error>;
}

mod read_image_file;
pub use self::read_image_file::{ImageFileCamera, ImageFileInputError};

#[cfg(feature = "v4l_input")]
mod v4l_camera;
#[cfg(feature = "v4l_input")]
pub use self::v4l_camera::{V4lCamera, V4lInputError, yuyv_to_rgb};

#[derive(Error, Debug)]
pub enum InputError {
  #[error("Image file input error: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[cfg(feature = "v4l_input")]
  #[error("V4L input error: {0}")]
  V4lInputError(#[from] V4lInputError),
  #[error("URI scheme mismatch: {0}")]
  SchemeMismatch(String),
}

pub enum CameraWrapper {
  ImageFile(ImageFileCamera),
  #[cfg(feature = "v4l_input")]
  V4l(V4lCamera),
}

impl FromUrl for CameraWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "v4l_input")]
    {
      if url.scheme() == V4lCamera::SCHEME {
        return Ok(CameraWrapper::V4l(V4lCamera::from_url(url)?));
      }
    }

    if url.scheme() == ImageFileCamera::SCHEME {
      return Ok(CameraWrapper::ImageFile(ImageFileCamera::from_url(url)?));
    }

    Err(InputError::SchemeMismatch(url.scheme().to_string()))
  }
}

impl Camera for CameraWrapper {
  type Error = InputError;

  fn capture(&mut self) -> Result<Frame, Self::Error> {
    match self {
      CameraWrapper::ImageFile(camera) => camera.capture().map_err(InputError::from),
      #[cfg(feature = "v4l_input")]
      CameraWrapper::V4l(camera) => camera.capture().map_err(InputError::from),
    }
  }
}
