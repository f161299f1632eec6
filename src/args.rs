// 该文件是 Hongguo （红果） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::{path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use thiserror::Error;
use url::Url;

use hongguo::task::Pacing;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum OperationError {
  #[error("操作参数字段不足: 需要至少 4 个逗号分隔字段，实际 {0} 个")]
  MissingFields(usize),
  #[error("无效的时长（分钟）: {0}")]
  InvalidMinutes(String),
}

/// 设备管理下发的操作参数，形如 `c8y_Startstream,<name>,<device>,<minutes>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartStream {
  pub device_id: String,
  pub minutes: u64,
}

impl StartStream {
  pub fn duration(&self) -> Duration {
    Duration::from_secs(self.minutes.saturating_mul(60))
  }
}

impl FromStr for StartStream {
  type Err = OperationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let fields: Vec<&str> = s.split(',').collect();
    if fields.len() < 4 {
      return Err(OperationError::MissingFields(fields.len()));
    }

    // 换算成秒后也不能溢出
    let minutes = fields[3]
      .trim()
      .parse::<u64>()
      .ok()
      .filter(|minutes| minutes.checked_mul(60).is_some())
      .ok_or_else(|| OperationError::InvalidMinutes(fields[3].to_string()))?;

    Ok(Self {
      device_id: fields[2].trim().to_string(),
      minutes,
    })
  }
}

/// Hongguo 番茄成熟度上传任务
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 逗号分隔的操作参数，第 3 个字段为设备 id，第 4 个字段为运行分钟数
  #[arg(value_name = "OPERATION")]
  pub operation: StartStream,

  /// ONNX 模型
  #[arg(long, value_name = "MODEL", default_value = "onnx:///etc/tedge/tomato_model.onnx")]
  pub model: Url,

  /// 输入来源（v4l:///dev/video0 或 image:///path/to/file.jpg）
  #[arg(long, value_name = "SOURCE", default_value = "v4l:///dev/video0")]
  pub input: Url,

  /// Cumulocity 凭据文件
  #[arg(long, value_name = "FILE", default_value = hongguo::cloud::DEFAULT_CONFIG_PATH)]
  pub config: PathBuf,

  /// 标注后 JPEG 的本地保存路径
  #[arg(long, value_name = "OUTPUT", default_value = "/etc/tedge/webcam_image.jpg")]
  pub output: PathBuf,

  /// 标注字体（TrueType），缺省时使用内嵌字体
  #[arg(long, value_name = "FONT")]
  pub font: Option<PathBuf>,

  /// 上传周期（秒）
  #[arg(long, value_name = "SECONDS", default_value = "30")]
  pub interval_secs: u64,

  /// 等待时间的计算方式
  #[arg(long, value_enum, default_value_t = Pacing::Fractional)]
  pub pacing: Pacing,

  /// HTTP 请求超时（秒）
  #[arg(long, value_name = "SECONDS", default_value = "30")]
  pub http_timeout_secs: u64,

  /// 直接在一次增强的图像上做颜色分割
  #[arg(long)]
  pub single_enhance: bool,

  /// ONNX Runtime 线程数
  #[arg(long, value_name = "THREADS")]
  pub threads: Option<usize>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn operation_fields_are_positional() {
    let op: StartStream = "c8y_Startstream,start,tomato-cam-01,5".parse().unwrap();
    assert_eq!(
      op,
      StartStream {
        device_id: "tomato-cam-01".into(),
        minutes: 5
      }
    );
    assert_eq!(op.duration(), Duration::from_secs(300));
  }

  #[test]
  fn short_operation_is_rejected() {
    assert_eq!(
      "c8y_Startstream,start,cam".parse::<StartStream>(),
      Err(OperationError::MissingFields(3))
    );
  }

  #[test]
  fn non_numeric_minutes_are_rejected() {
    assert!(matches!(
      "a,b,cam,ten".parse::<StartStream>(),
      Err(OperationError::InvalidMinutes(_))
    ));
  }

  #[test]
  fn minutes_overflowing_seconds_are_rejected() {
    let largest = u64::MAX / 60;
    let op: StartStream = format!("a,b,cam,{}", largest).parse().unwrap();
    assert_eq!(op.duration(), Duration::from_secs(largest * 60));

    assert_eq!(
      format!("a,b,cam,{}", largest + 1).parse::<StartStream>(),
      Err(OperationError::InvalidMinutes((largest + 1).to_string()))
    );
    assert_eq!(
      "a,b,cam,18446744073709551615".parse::<StartStream>(),
      Err(OperationError::InvalidMinutes("18446744073709551615".into()))
    );
  }

  #[test]
  fn defaults_match_deployment() {
    let args = Args::try_parse_from(["hongguo", "a,b,cam,1"]).unwrap();
    assert_eq!(args.model.path(), "/etc/tedge/tomato_model.onnx");
    assert_eq!(args.input.as_str(), "v4l:///dev/video0");
    assert_eq!(args.output, PathBuf::from("/etc/tedge/webcam_image.jpg"));
    assert_eq!(args.interval_secs, 30);
    assert_eq!(args.pacing, Pacing::Fractional);
  }

  #[test]
  fn pacing_is_selectable() {
    let args = Args::try_parse_from(["hongguo", "a,b,cam,1", "--pacing", "whole-seconds"]).unwrap();
    assert_eq!(args.pacing, Pacing::WholeSeconds);
  }
}
