// 该文件是 Hongguo （红果） 项目的一部分。
// src/cloud/binaries.rs - Cumulocity 资产库二进制文件更新
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

use std::time::Duration;

use reqwest::blocking::{Client, Request};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::{cloud::CloudConfig, output::Publish};

pub const DEFAULT_ASSET_NAME: &str = "webcam_image.jpg";
pub const DEFAULT_ASSET_MIME: &str = "image/jpeg";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PAGE_SIZE: &str = "2000";

#[derive(Error, Debug)]
pub enum InventoryError {
  #[error("HTTP 请求失败: {0}")]
  HttpError(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct BinaryList {
  #[serde(rename = "managedObjects", default)]
  managed_objects: Vec<BinaryEntry>,
}

#[derive(Debug, Deserialize)]
struct BinaryEntry {
  id: serde_json::Value,
  #[serde(default)]
  name: Option<String>,
}

impl BinaryEntry {
  fn id_string(&self) -> Option<String> {
    match &self.id {
      serde_json::Value::String(id) => Some(id.clone()),
      serde_json::Value::Number(id) => Some(id.to_string()),
      _ => None,
    }
  }
}

fn find_binary_id(list: &BinaryList, name: &str) -> Option<String> {
  list
    .managed_objects
    .iter()
    .find(|entry| entry.name.as_deref() == Some(name))
    .and_then(BinaryEntry::id_string)
}

/// 资产库中的一个具名二进制文件，每轮用新的 JPEG 覆盖
pub struct InventoryBinaries {
  client: Client,
  api_root: String,
  username: String,
  password: String,
  asset_name: String,
  mime: String,
}

impl InventoryBinaries {
  pub fn new(config: &CloudConfig, timeout: Duration) -> Result<Self, InventoryError> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self {
      client,
      api_root: config.api_root().to_string(),
      username: config.username.clone(),
      password: config.password.clone(),
      asset_name: DEFAULT_ASSET_NAME.to_string(),
      mime: DEFAULT_ASSET_MIME.to_string(),
    })
  }

  pub fn with_asset(mut self, name: impl Into<String>, mime: impl Into<String>) -> Self {
    self.asset_name = name.into();
    self.mime = mime.into();
    self
  }

  fn collection_url(&self) -> String {
    format!("{}/inventory/binaries", self.api_root)
  }

  fn binary_url(&self, id: &str) -> String {
    format!("{}/inventory/binaries/{}", self.api_root, id)
  }

  /// 按 MIME 类型列出二进制文件
  fn lookup_request(&self) -> reqwest::Result<Request> {
    self
      .client
      .get(self.collection_url())
      .query(&[("pageSize", PAGE_SIZE), ("type", self.mime.as_str())])
      .basic_auth(&self.username, Some(&self.password))
      .build()
  }

  fn upload_request(&self, id: &str, jpeg: &[u8]) -> reqwest::Result<Request> {
    self
      .client
      .put(self.binary_url(id))
      .header(CONTENT_TYPE, self.mime.as_str())
      .basic_auth(&self.username, Some(&self.password))
      .body(jpeg.to_vec())
      .build()
  }
}

impl Publish for InventoryBinaries {
  type Error = InventoryError;

  fn target_name(&self) -> &str {
    &self.asset_name
  }

  fn content_type(&self) -> &str {
    &self.mime
  }

  fn resolve_target(&self) -> Result<Option<String>, Self::Error> {
    let list: BinaryList = self
      .client
      .execute(self.lookup_request()?)?
      .error_for_status()?
      .json()?;

    let id = find_binary_id(&list, &self.asset_name);
    debug!(
      "在 {} 个二进制文件中查找 {}: {:?}",
      list.managed_objects.len(),
      self.asset_name,
      id
    );
    Ok(id)
  }

  fn publish(&self, target: &str, jpeg: &[u8]) -> Result<(), Self::Error> {
    self
      .client
      .execute(self.upload_request(target, jpeg)?)?
      .error_for_status()?;

    debug!("已上传 {} 字节到二进制文件 {}", jpeg.len(), target);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use reqwest::Method;
  use reqwest::header::AUTHORIZATION;

  use super::*;

  fn device_binaries() -> InventoryBinaries {
    let config = CloudConfig::new("https://tenant.example", "t1", "device01", "s3cret");
    InventoryBinaries::new(&config, DEFAULT_HTTP_TIMEOUT).unwrap()
  }

  fn parse(json: &str) -> BinaryList {
    serde_json::from_str(json).unwrap()
  }

  #[test]
  fn finds_first_matching_name() {
    let list = parse(
      r#"{"managedObjects":[
        {"id":"11","name":"other.jpg"},
        {"id":"12","name":"webcam_image.jpg"},
        {"id":"13","name":"webcam_image.jpg"}
      ]}"#,
    );
    assert_eq!(find_binary_id(&list, DEFAULT_ASSET_NAME), Some("12".into()));
  }

  #[test]
  fn no_match_is_none() {
    let list = parse(r#"{"managedObjects":[{"id":"11","name":"other.jpg"},{"id":"14"}]}"#);
    assert_eq!(find_binary_id(&list, DEFAULT_ASSET_NAME), None);
    assert_eq!(find_binary_id(&parse("{}"), DEFAULT_ASSET_NAME), None);
  }

  #[test]
  fn numeric_id_is_accepted() {
    let list = parse(r#"{"managedObjects":[{"id":42,"name":"webcam_image.jpg"}]}"#);
    assert_eq!(find_binary_id(&list, DEFAULT_ASSET_NAME), Some("42".into()));
  }

  #[test]
  fn urls_are_built_from_api_root() {
    let config = CloudConfig::new("https://tenant.example/", "t", "u", "p");
    let binaries = InventoryBinaries::new(&config, DEFAULT_HTTP_TIMEOUT).unwrap();
    assert_eq!(
      binaries.collection_url(),
      "https://tenant.example/inventory/binaries"
    );
    assert_eq!(
      binaries.binary_url("12"),
      "https://tenant.example/inventory/binaries/12"
    );
    assert_eq!(binaries.target_name(), "webcam_image.jpg");
    assert_eq!(binaries.content_type(), "image/jpeg");
  }

  #[test]
  fn lookup_filters_by_mime_with_basic_auth() {
    let request = device_binaries().lookup_request().unwrap();
    assert_eq!(request.method(), &Method::GET);
    assert_eq!(request.url().path(), "/inventory/binaries");

    let query: Vec<(String, String)> = request.url().query_pairs().into_owned().collect();
    assert!(query.contains(&("pageSize".into(), "2000".into())));
    assert!(query.contains(&("type".into(), "image/jpeg".into())));

    assert_eq!(
      request.headers()[AUTHORIZATION],
      "Basic ZGV2aWNlMDE6czNjcmV0"
    );
    assert!(request.body().is_none());
  }

  #[test]
  fn upload_puts_jpeg_body_to_binary() {
    let jpeg = [0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10, 0xff, 0xd9];
    let request = device_binaries().upload_request("12", &jpeg).unwrap();
    assert_eq!(request.method(), &Method::PUT);
    assert_eq!(
      request.url().as_str(),
      "https://tenant.example/inventory/binaries/12"
    );
    assert_eq!(request.headers()[CONTENT_TYPE], "image/jpeg");
    assert_eq!(
      request.headers()[AUTHORIZATION],
      "Basic ZGV2aWNlMDE6czNjcmV0"
    );
    assert_eq!(
      request.body().and_then(|body| body.as_bytes()),
      Some(&jpeg[..])
    );
  }

  #[test]
  fn custom_asset_changes_lookup_type() {
    let request = device_binaries()
      .with_asset("snapshot.png", "image/png")
      .lookup_request()
      .unwrap();
    let query: Vec<(String, String)> = request.url().query_pairs().into_owned().collect();
    assert!(query.contains(&("type".into(), "image/png".into())));
  }
}
