// 该文件是 Hongguo （红果） 项目的一部分。
// src/output.rs - 标注绘制、图像保存与上传接口
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

mod draw;
mod save_image_file;

pub use self::draw::{AnnotationRenderer, LabelFont, LabelFontError, RIPE_COLOR, UNRIPE_COLOR};
pub use self::save_image_file::{JpegWriter, SaveImageFileError};

/// 远端发布目标，例如 Cumulocity 的二进制资源
pub trait Publish {
  type Error;

  /// 目标的名称与内容类型，用于日志与错误信息
  fn target_name(&self) -> &str;
  fn content_type(&self) -> &str;

  /// 查找待覆盖的目标标识，找不到时返回 `None`
  fn resolve_target(&self) -> Result<Option<String>, Self::Error>;

  /// 用 JPEG 字节替换目标内容
  fn publish(&self, target: &str, jpeg: &[u8]) -> Result<(), Self::Error>;
}
