// 该文件是 Lukuang （路况） 项目的一部分。
// src/assets.rs - 模型资源校验
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

use std::{
  fs::File,
  io::{self, BufRead, BufReader},
  path::{Path, PathBuf},
};

use md5::{Digest, Md5};
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub const YOLOV3_NAMES: &str = "coco.names";
pub const YOLOV3_WEIGHTS: &str = "yolov3.weights";
pub const YOLOV3_CONFIG: &str = "yolov3.cfg";

#[derive(Error, Debug)]
pub enum AssetError {
  #[error("未知资源文件: {0}")]
  UnknownAsset(String),
  #[error("读取资源 {path} 失败: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
  #[error("资源 {name} 校验失败: 期望 MD5 {expected}, 实际 {}", .actual.as_deref().unwrap_or("文件不存在"))]
  Corrupted {
    name: String,
    expected: String,
    actual: Option<String>,
  },
  #[error("下载资源 {name} 失败: {source}")]
  Fetch {
    name: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

impl AssetError {
  fn io(path: &Path, source: io::Error) -> Self {
    AssetError::Io {
      path: path.to_path_buf(),
      source,
    }
  }
}

/// 一个需要校验的资源文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSpec {
  pub name: String,
  pub md5: String,
  pub url: String,
}

impl AssetSpec {
  pub fn new(name: impl Into<String>, md5: impl Into<String>, url: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      md5: md5.into(),
      url: url.into(),
    }
  }
}

/// 有序的资源清单
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetManifest {
  entries: Vec<AssetSpec>,
}

impl AssetManifest {
  pub fn new(entries: Vec<AssetSpec>) -> Self {
    Self { entries }
  }

  /// YOLOv3 (darknet) 所需的三个文件
  pub fn yolov3() -> Self {
    Self::new(vec![
      AssetSpec::new(
        YOLOV3_WEIGHTS,
        "c84e5b99d0e52cd466ae710cadf6d84c",
        "https://pjreddie.com/media/files/yolov3.weights",
      ),
      AssetSpec::new(
        YOLOV3_NAMES,
        "8fc50561361f8bcf96b0177086e7616c",
        "https://raw.githubusercontent.com/pjreddie/darknet/master/data/coco.names",
      ),
      AssetSpec::new(
        YOLOV3_CONFIG,
        "b969a43a848bbf26901643b833cfb96c",
        "https://raw.githubusercontent.com/pjreddie/darknet/master/cfg/yolov3.cfg",
      ),
    ])
  }

  pub fn get(&self, name: &str) -> Result<&AssetSpec, AssetError> {
    self
      .entries
      .iter()
      .find(|spec| spec.name == name)
      .ok_or_else(|| AssetError::UnknownAsset(name.to_string()))
  }

  pub fn iter(&self) -> std::slice::Iter<'_, AssetSpec> {
    self.entries.iter()
  }
}

impl Default for AssetManifest {
  fn default() -> Self {
    Self::yolov3()
  }
}

/// 下载器边界：把资源写到 `dest`
pub trait Fetch {
  type Error: std::error::Error + Send + Sync + 'static;

  fn fetch(&self, spec: &AssetSpec, dest: &Path) -> Result<(), Self::Error>;
}

/// 计算文件的 MD5，文件不存在时返回 `None`
pub fn file_md5(path: &Path) -> Result<Option<String>, AssetError> {
  let mut file = match File::open(path) {
    Ok(file) => file,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
    Err(e) => return Err(AssetError::io(path, e)),
  };

  let mut hasher = Md5::new();
  io::copy(&mut file, &mut hasher).map_err(|e| AssetError::io(path, e))?;
  Ok(Some(format!("{:x}", hasher.finalize())))
}

/// 资源校验器，资源存放在 `root` 目录下
#[derive(Debug, Clone)]
pub struct AssetGuard {
  root: PathBuf,
  manifest: AssetManifest,
}

impl AssetGuard {
  pub fn new(root: impl Into<PathBuf>, manifest: AssetManifest) -> Self {
    Self {
      root: root.into(),
      manifest,
    }
  }

  pub fn manifest(&self) -> &AssetManifest {
    &self.manifest
  }

  pub fn path_of(&self, name: &str) -> Result<PathBuf, AssetError> {
    let spec = self.manifest.get(name)?;
    Ok(self.root.join(&spec.name))
  }

  /// 资源存在且 MD5 匹配
  pub fn is_verified(&self, name: &str) -> Result<bool, AssetError> {
    let spec = self.manifest.get(name)?;
    let digest = file_md5(&self.root.join(&spec.name))?;
    Ok(digest.as_deref() == Some(spec.md5.as_str()))
  }

  fn check(&self, spec: &AssetSpec) -> Result<(), AssetError> {
    let actual = file_md5(&self.root.join(&spec.name))?;
    if actual.as_deref() == Some(spec.md5.as_str()) {
      return Ok(());
    }

    error!("资源 {} 校验失败", spec.name);
    Err(AssetError::Corrupted {
      name: spec.name.clone(),
      expected: spec.md5.clone(),
      actual,
    })
  }

  /// 只校验，不下载
  pub fn verify(&self) -> Result<VerifiedAssets, AssetError> {
    for spec in self.manifest.iter() {
      self.check(spec)?;
      debug!("资源 {} 校验通过", spec.name);
    }
    self.verified()
  }

  /// 校验全部资源，缺失或损坏的资源调用 `fetcher` 下载一次后重新校验
  ///
  /// 下载后仍不通过视为致命错误，不再重试。
  pub fn ensure<F: Fetch>(&self, fetcher: &F) -> Result<VerifiedAssets, AssetError> {
    for spec in self.manifest.iter() {
      if self.is_verified(&spec.name)? {
        debug!("资源 {} 校验通过", spec.name);
        continue;
      }

      warn!("资源 {} 缺失或已损坏，开始下载", spec.name);
      let dest = self.root.join(&spec.name);
      if !self.root.as_os_str().is_empty() {
        std::fs::create_dir_all(&self.root).map_err(|e| AssetError::io(&self.root, e))?;
      }
      fetcher
        .fetch(spec, &dest)
        .map_err(|e| AssetError::Fetch {
          name: spec.name.clone(),
          source: Box::new(e),
        })?;

      self.check(spec)?;
      info!("资源 {} 下载并校验完成", spec.name);
    }
    self.verified()
  }

  fn verified(&self) -> Result<VerifiedAssets, AssetError> {
    Ok(VerifiedAssets {
      names: self.path_of(YOLOV3_NAMES)?,
      weights: self.path_of(YOLOV3_WEIGHTS)?,
      config: self.path_of(YOLOV3_CONFIG)?,
    })
  }
}

/// 已通过校验的模型资源路径，只能由 [`AssetGuard`] 构造
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedAssets {
  names: PathBuf,
  weights: PathBuf,
  config: PathBuf,
}

impl VerifiedAssets {
  pub fn names_path(&self) -> &Path {
    &self.names
  }

  pub fn weights_path(&self) -> &Path {
    &self.weights
  }

  pub fn config_path(&self) -> &Path {
    &self.config
  }

  /// 读取类别名称列表，每行一个，忽略首尾空行
  pub fn class_names(&self) -> Result<Vec<String>, AssetError> {
    let file = File::open(&self.names).map_err(|e| AssetError::io(&self.names, e))?;
    let lines = BufReader::new(file)
      .lines()
      .collect::<Result<Vec<_>, _>>()
      .map_err(|e| AssetError::io(&self.names, e))?;

    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());
    let names = match (start, end) {
      (Some(start), Some(end)) => lines[start..=end]
        .iter()
        .map(|l| l.trim().to_string())
        .collect(),
      _ => Vec::new(),
    };
    Ok(names)
  }
}

#[cfg(feature = "download")]
mod http_fetch;
#[cfg(feature = "download")]
pub use self::http_fetch::{HttpFetch, HttpFetchError};

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::Cell;
  use tempfile::tempdir;

  fn md5_of(bytes: &[u8]) -> String {
    format!("{:x}", Md5::digest(bytes))
  }

  fn manifest(names: &[u8], weights: &[u8], config: &[u8]) -> AssetManifest {
    AssetManifest::new(vec![
      AssetSpec::new(YOLOV3_WEIGHTS, md5_of(weights), "mem://weights"),
      AssetSpec::new(YOLOV3_NAMES, md5_of(names), "mem://names"),
      AssetSpec::new(YOLOV3_CONFIG, md5_of(config), "mem://config"),
    ])
  }

  /// 从内存写入资源的下载器
  struct MemoryFetch<'a> {
    files: &'a [(&'a str, &'a [u8])],
    calls: Cell<usize>,
  }

  impl Fetch for MemoryFetch<'_> {
    type Error = io::Error;

    fn fetch(&self, spec: &AssetSpec, dest: &Path) -> Result<(), Self::Error> {
      self.calls.set(self.calls.get() + 1);
      let (_, bytes) = self
        .files
        .iter()
        .find(|(name, _)| *name == spec.name)
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, spec.name.clone()))?;
      std::fs::write(dest, bytes)
    }
  }

  #[test]
  fn yolov3_manifest_order() {
    let names: Vec<_> = AssetManifest::yolov3()
      .iter()
      .map(|s| s.name.clone())
      .collect();
    assert_eq!(names, [YOLOV3_WEIGHTS, YOLOV3_NAMES, YOLOV3_CONFIG]);
  }

  #[test]
  fn unknown_asset_is_configuration_error() {
    let guard = AssetGuard::new("/nonexistent", AssetManifest::yolov3());
    assert!(matches!(
      guard.is_verified("yolov4.weights"),
      Err(AssetError::UnknownAsset(name)) if name == "yolov4.weights"
    ));
  }

  #[test]
  fn missing_and_corrupted_are_not_verified() {
    let dir = tempdir().unwrap();
    let guard = AssetGuard::new(dir.path(), manifest(b"car\n", b"w", b"c"));
    assert!(!guard.is_verified(YOLOV3_NAMES).unwrap());

    std::fs::write(dir.path().join(YOLOV3_NAMES), b"bus\n").unwrap();
    assert!(!guard.is_verified(YOLOV3_NAMES).unwrap());

    std::fs::write(dir.path().join(YOLOV3_NAMES), b"car\n").unwrap();
    assert!(guard.is_verified(YOLOV3_NAMES).unwrap());
  }

  #[test]
  fn ensure_downloads_missing_only() {
    let dir = tempdir().unwrap();
    let guard = AssetGuard::new(dir.path(), manifest(b"car\nperson\n", b"weights", b"[net]"));
    std::fs::write(dir.path().join(YOLOV3_CONFIG), b"[net]").unwrap();

    let fetcher = MemoryFetch {
      files: &[
        (YOLOV3_NAMES, &b"car\nperson\n"[..]),
        (YOLOV3_WEIGHTS, &b"weights"[..]),
      ],
      calls: Cell::new(0),
    };
    let assets = guard.ensure(&fetcher).unwrap();
    assert_eq!(fetcher.calls.get(), 2);
    assert_eq!(assets.class_names().unwrap(), ["car", "person"]);
    assert_eq!(assets.config_path(), dir.path().join(YOLOV3_CONFIG));

    // 再次校验不会触发下载
    guard.ensure(&fetcher).unwrap();
    assert_eq!(fetcher.calls.get(), 2);
  }

  #[test]
  fn corrupted_after_download_is_fatal() {
    let dir = tempdir().unwrap();
    let guard = AssetGuard::new(dir.path(), manifest(b"car\n", b"weights", b"cfg"));
    let fetcher = MemoryFetch {
      files: &[(YOLOV3_WEIGHTS, &b"truncated"[..])],
      calls: Cell::new(0),
    };
    let err = guard.ensure(&fetcher).unwrap_err();
    assert!(matches!(err, AssetError::Corrupted { ref name, .. } if name == YOLOV3_WEIGHTS));
    assert_eq!(fetcher.calls.get(), 1);
  }

  #[test]
  fn fetch_failure_is_reported() {
    let dir = tempdir().unwrap();
    let guard = AssetGuard::new(dir.path(), manifest(b"car\n", b"weights", b"cfg"));
    let fetcher = MemoryFetch {
      files: &[],
      calls: Cell::new(0),
    };
    assert!(matches!(
      guard.ensure(&fetcher),
      Err(AssetError::Fetch { .. })
    ));
  }

  #[test]
  fn verify_without_fetch() {
    let dir = tempdir().unwrap();
    let guard = AssetGuard::new(dir.path(), manifest(b"car\n", b"w", b"c"));
    assert!(matches!(guard.verify(), Err(AssetError::Corrupted { actual: None, .. })));

    std::fs::write(dir.path().join(YOLOV3_WEIGHTS), b"w").unwrap();
    std::fs::write(dir.path().join(YOLOV3_NAMES), b"\ncar\n\n").unwrap();
    std::fs::write(dir.path().join(YOLOV3_CONFIG), b"c").unwrap();
    // names 内容不同，MD5 不匹配
    assert!(guard.verify().is_err());

    std::fs::write(dir.path().join(YOLOV3_NAMES), b"car\n").unwrap();
    let assets = guard.verify().unwrap();
    assert_eq!(assets.class_names().unwrap(), ["car"]);
  }
}
