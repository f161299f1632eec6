// 该文件是 Hongguo （红果） 项目的一部分。
// src/input/v4l_camera.rs - V4L2 摄像头单帧采集
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

use image::{ImageFormat, RgbImage};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;
use v4l::FourCC;
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;

use crate::{FromUrl, FromUrlWithScheme, frame::Frame, input::Camera};

const DEFAULT_DEVICE: &str = "/dev/video0";
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const BUFFER_COUNT: u32 = 4;

const FOURCC_YUYV: &[u8; 4] = b"YUYV";
const FOURCC_MJPG: &[u8; 4] = b"MJPG";

#[derive(Error, Debug)]
pub enum V4lInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("V4L error on {0}: {1}")]
  DeviceError(String, std::io::Error),
  #[error("Unsupported pixel format: {0}")]
  UnsupportedPixelFormat(String),
  #[error("Captured buffer size mismatch: expected {expected}, got {actual}")]
  BufferSizeMismatch { expected: usize, actual: usize },
  #[error("MJPG decode error: {0}")]
  DecodeError(#[from] image::ImageError),
}

/// V4L2 摄像头
///
/// 每次 [`Camera::capture`] 打开设备、协商格式、取一帧后立即关闭，
/// 任何错误路径上设备与缓冲区都会随作用域释放。
#[derive(Debug, Clone)]
pub struct V4lCamera {
  device_path: String,
  width: u32,
  height: u32,
}

impl FromUrlWithScheme for V4lCamera {
  const SCHEME: &'static str = "v4l";
}

impl FromUrl for V4lCamera {
  type Error = V4lInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(V4lInputError::SchemaMismatch);
    }

    // v4l:///dev/video0，路径为空时使用默认设备
    let device_path = if url.path().is_empty() || url.path() == "/" {
      DEFAULT_DEVICE.to_string()
    } else {
      url.path().to_string()
    };

    let mut camera = Self::new(device_path);
    for (key, value) in url.query_pairs() {
      match key.as_ref() {
        "width" => camera.width = value.parse().unwrap_or(DEFAULT_WIDTH),
        "height" => camera.height = value.parse().unwrap_or(DEFAULT_HEIGHT),
        _ => {}
      }
    }
    Ok(camera)
  }
}

impl V4lCamera {
  pub fn new(device_path: impl Into<String>) -> Self {
    Self {
      device_path: device_path.into(),
      width: DEFAULT_WIDTH,
      height: DEFAULT_HEIGHT,
    }
  }

  fn device_error(&self, err: std::io::Error) -> V4lInputError {
    V4lInputError::DeviceError(self.device_path.clone(), err)
  }
}

impl Camera for V4lCamera {
  type Error = V4lInputError;

  fn capture(&mut self) -> Result<Frame, Self::Error> {
    let device = Device::with_path(&self.device_path).map_err(|e| self.device_error(e))?;

    let mut format = device.format().map_err(|e| self.device_error(e))?;
    format.width = self.width;
    format.height = self.height;
    format.fourcc = FourCC::new(FOURCC_YUYV);
    let format = device
      .set_format(&format)
      .map_err(|e| self.device_error(e))?;
    debug!(
      "设备 {} 协商格式: {}x{} {}",
      self.device_path, format.width, format.height, format.fourcc
    );

    let mut stream = Stream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT)
      .map_err(|e| self.device_error(e))?;
    let (buffer, meta) = stream.next().map_err(|e| self.device_error(e))?;
    decode_frame(format.fourcc, format.width, format.height, buffer, meta.bytesused)
  }
}

/// 按协商的像素格式解码一帧，`bytes_used` 为 0 时使用整个缓冲区
fn decode_frame(
  fourcc: FourCC,
  width: u32,
  height: u32,
  buffer: &[u8],
  bytes_used: u32,
) -> Result<Frame, V4lInputError> {
  let used = match bytes_used as usize {
    0 => buffer.len(),
    n => n.min(buffer.len()),
  };
  let data = &buffer[..used];

  if fourcc == FourCC::new(FOURCC_YUYV) {
    let expected = width as usize * height as usize * 2;
    if data.is_empty() || data.len() < expected {
      return Err(V4lInputError::BufferSizeMismatch {
        expected,
        actual: data.len(),
      });
    }
    let rgb = yuyv_to_rgb(&data[..expected]);
    RgbImage::from_raw(width, height, rgb).ok_or(V4lInputError::BufferSizeMismatch {
      expected,
      actual: data.len(),
    })
  } else if fourcc == FourCC::new(FOURCC_MJPG) {
    if data.is_empty() {
      return Err(V4lInputError::BufferSizeMismatch {
        expected: 1,
        actual: 0,
      });
    }
    Ok(image::load_from_memory_with_format(data, ImageFormat::Jpeg)?.into_rgb8())
  } else {
    Err(V4lInputError::UnsupportedPixelFormat(fourcc.to_string()))
  }
}

/// 将 YUYV 格式转换为 RGB
pub fn yuyv_to_rgb(yuyv: &[u8]) -> Vec<u8> {
  let mut rgb = Vec::with_capacity(yuyv.len() / 2 * 3);

  for chunk in yuyv.chunks_exact(4) {
    let y0 = chunk[0] as f32;
    let u = chunk[1] as f32 - 128.0;
    let y1 = chunk[2] as f32;
    let v = chunk[3] as f32 - 128.0;

    for y in [y0, y1] {
      let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
      let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
      let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
      rgb.extend_from_slice(&[r, g, b]);
    }
  }

  rgb
}
