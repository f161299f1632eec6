// 该文件是 Hongguo （红果） 项目的一部分。
// src/cloud/config.rs - Cumulocity 凭据加载与保存
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

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/tedge/c8y_credentials.json";

const ENV_BASE_URL: &str = "C8Y_BASEURL";
const ENV_TENANT: &str = "C8Y_TENANT";
const ENV_USERNAME: &str = "C8Y_USERNAME";
const ENV_PASSWORD: &str = "C8Y_PASSWORD";

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error(
    "配置文件不存在: {0}，请设置环境变量 C8Y_BASEURL、C8Y_TENANT、C8Y_USERNAME、C8Y_PASSWORD 或创建配置文件"
  )]
  NotFound(PathBuf),
  #[error("配置文件 JSON 格式无效 {0}: {1}")]
  Invalid(PathBuf, serde_json::Error),
  #[error("配置文件读写失败 {0}: {1}")]
  Io(PathBuf, std::io::Error),
}

/// Cumulocity 连接凭据
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudConfig {
  #[serde(rename = "C8Y_BASEURL")]
  pub base_url: String,
  #[serde(rename = "TENANT_ID")]
  pub tenant: String,
  #[serde(rename = "USERNAME")]
  pub username: String,
  #[serde(rename = "PASSWORD")]
  pub password: String,
}

impl fmt::Debug for CloudConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CloudConfig")
      .field("base_url", &self.base_url)
      .field("tenant", &self.tenant)
      .field("username", &self.username)
      .field("password", &"***")
      .finish()
  }
}

impl CloudConfig {
  pub fn new(
    base_url: impl Into<String>,
    tenant: impl Into<String>,
    username: impl Into<String>,
    password: impl Into<String>,
  ) -> Self {
    Self {
      base_url: base_url.into(),
      tenant: tenant.into(),
      username: username.into(),
      password: password.into(),
    }
  }

  /// 去掉末尾斜杠的基础地址
  pub fn api_root(&self) -> &str {
    self.base_url.trim_end_matches('/')
  }

  /// 先读进程环境变量，四项都非空时直接使用，否则读取配置文件
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    Self::load_with(path, |key| std::env::var(key).ok())
  }

  pub fn load_with<F>(path: impl AsRef<Path>, lookup: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let env = [ENV_BASE_URL, ENV_TENANT, ENV_USERNAME, ENV_PASSWORD]
      .map(|key| lookup(key).filter(|value| !value.is_empty()));

    match env {
      [Some(base_url), Some(tenant), Some(username), Some(password)] => {
        info!("使用环境变量中的 Cumulocity 凭据");
        return Ok(Self::new(base_url, tenant, username, password));
      }
      [None, None, None, None] => {}
      _ => warn!("Cumulocity 环境变量不完整，改为读取配置文件"),
    }

    Self::from_file(path)
  }

  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let content = match std::fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        return Err(ConfigError::NotFound(path.to_path_buf()));
      }
      Err(e) => return Err(ConfigError::Io(path.to_path_buf(), e)),
    };

    let config: Self =
      serde_json::from_str(&content).map_err(|e| ConfigError::Invalid(path.to_path_buf(), e))?;
    debug!("从 {} 加载凭据: {:?}", path.display(), config);
    Ok(config)
  }

  /// 写入格式化 JSON，文件权限限制为仅属主可读写
  pub fn store(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let io_error = |e: std::io::Error| ConfigError::Io(path.to_path_buf(), e);

    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent).map_err(io_error)?;
    }

    let content = serde_json::to_string_pretty(self)
      .map_err(|e| ConfigError::Invalid(path.to_path_buf(), e))?;

    #[cfg(unix)]
    {
      use std::io::Write;
      use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

      // 已存在的文件先收紧权限再覆盖
      if path.exists() {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(io_error)?;
      }
      let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .map_err(io_error)?;
      file.write_all(content.as_bytes()).map_err(io_error)?;
      std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(io_error)?;
    }

    #[cfg(not(unix))]
    std::fs::write(path, content).map_err(io_error)?;

    info!("凭据已写入 {}", path.display());
    Ok(())
  }
}
