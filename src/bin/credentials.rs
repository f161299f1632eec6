// 该文件是 Hongguo （红果） 项目的一部分。
// src/bin/credentials.rs - 创建 Cumulocity 凭据文件
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

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use hongguo::cloud::{CloudConfig, DEFAULT_CONFIG_PATH};

/// 写入仅属主可读写的凭据文件
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// Cumulocity 基础地址
  #[arg(long, value_name = "URL")]
  pub base_url: String,
  /// 租户 id
  #[arg(long, value_name = "TENANT")]
  pub tenant: String,
  #[arg(long, value_name = "USERNAME")]
  pub username: String,
  #[arg(long, value_name = "PASSWORD")]
  pub password: String,
  /// 凭据文件路径
  #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
  pub path: PathBuf,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  let config = CloudConfig::new(args.base_url, args.tenant, args.username, args.password);
  info!("写入凭据: {:?}", config);
  config.store(&args.path)?;

  Ok(())
}
