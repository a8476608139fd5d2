// 该文件是 Lukuang （路况） 项目的一部分。
// src/assets/http_fetch.rs - HTTP 资源下载
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
  io::{self, BufWriter, Read, Write},
  path::{Path, PathBuf},
};

use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use tracing::{info, warn};

use crate::assets::{AssetSpec, Fetch};

const MEGABYTES: f64 = 1.0 / (1024.0 * 1024.0);

#[derive(Error, Debug)]
pub enum HttpFetchError {
  #[error("HTTP 请求失败: {0}")]
  Request(#[from] Box<ureq::Error>),
  #[error("I/O 错误: {0}")]
  Io(#[from] io::Error),
}

/// 通过 HTTP 下载资源，先写入 `.part` 文件，完成后再改名
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpFetch;

fn part_path(dest: &Path) -> PathBuf {
  let mut name = dest.as_os_str().to_os_string();
  name.push(".part");
  PathBuf::from(name)
}

/// 已知长度时显示进度条，否则显示已下载字节数
fn progress_bar(name: &str, length: Option<u64>) -> ProgressBar {
  let (bar, template) = match length {
    Some(length) => (
      ProgressBar::new(length),
      "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
    ),
    None => (
      ProgressBar::new_spinner(),
      "{spinner:.cyan} {msg} {bytes} ({bytes_per_sec})",
    ),
  };
  let style = ProgressStyle::with_template(template)
    .map(|style| style.progress_chars("=>-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
  bar.set_style(style);
  bar.set_message(format!("正在下载 {}", name));
  bar
}

fn copy_to(reader: impl Read, path: &Path, bar: &ProgressBar) -> io::Result<u64> {
  let mut writer = BufWriter::new(File::create(path)?);
  let written = io::copy(&mut bar.wrap_read(reader), &mut writer)?;
  writer.flush()?;
  Ok(written)
}

/// 写入 `dest.part`，成功后改名为 `dest`；失败时删除 `.part`
fn write_part(reader: impl Read, dest: &Path, bar: &ProgressBar) -> io::Result<u64> {
  let part = part_path(dest);
  let result = copy_to(reader, &part, bar).and_then(|written| {
    std::fs::rename(&part, dest)?;
    Ok(written)
  });

  if result.is_err() {
    bar.abandon();
    if let Err(e) = std::fs::remove_file(&part) {
      if e.kind() != io::ErrorKind::NotFound {
        warn!("无法删除 {}: {}", part.display(), e);
      }
    }
  }
  result
}

impl Fetch for HttpFetch {
  type Error = HttpFetchError;

  fn fetch(&self, spec: &AssetSpec, dest: &Path) -> Result<(), Self::Error> {
    info!("正在下载 {}...", spec.name);
    let response = ureq::get(&spec.url).call().map_err(Box::new)?;
    let length = response
      .header("Content-Length")
      .and_then(|v| v.parse::<u64>().ok());

    let bar = progress_bar(&spec.name, length);
    let written = write_part(response.into_reader(), dest, &bar)?;
    bar.finish_and_clear();

    info!(
      "{} 下载完成，共 {:.2} MB",
      spec.name,
      written as f64 * MEGABYTES
    );
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  /// 读出若干字节后报错
  struct Broken(usize);

  impl Read for Broken {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
      if self.0 == 0 {
        return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
      }
      let n = self.0.min(buf.len());
      buf[..n].fill(7);
      self.0 -= n;
      Ok(n)
    }
  }

  #[test]
  fn part_file_next_to_dest() {
    assert_eq!(
      part_path(Path::new("/tmp/models/yolov3.weights")),
      PathBuf::from("/tmp/models/yolov3.weights.part")
    );
  }

  #[test]
  fn completed_download_is_renamed() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("coco.names");
    let written = write_part(&b"person\ncar\n"[..], &dest, &ProgressBar::hidden()).unwrap();
    assert_eq!(written, 11);
    assert_eq!(std::fs::read(&dest).unwrap(), b"person\ncar\n");
    assert!(!part_path(&dest).exists());
  }

  #[test]
  fn interrupted_download_leaves_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("yolov3.weights");
    let err = write_part(Broken(20000), &dest, &ProgressBar::hidden()).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
    assert!(!part_path(&dest).exists());
    assert!(!dest.exists());
  }
}
