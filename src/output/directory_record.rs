// 该文件是 Lukuang （路况） 项目的一部分。
// src/output/directory_record.rs - 按帧记录对比结果到目录
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

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  FromUrl, FromUrlWithScheme,
  dataset::REQUIRED_COLUMNS,
  detection::BoxSet,
  output::{Comparison, Render, draw::annotate},
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 每帧分别保存真值图与检测图
///
/// `folder:///dir?record` 额外把检测框写成与标注文件同格式的 CSV。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  record: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let record = uri.query_pairs().any(|(k, _)| k == "record");

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(uri.path()),
      record,
    })
  }
}

fn frame_stem(frame: &str) -> String {
  Path::new(frame)
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_else(|| frame.to_string())
}

fn records_csv(frame: &str, boxes: &BoxSet) -> String {
  let mut out = REQUIRED_COLUMNS.join(",");
  out.push('\n');
  for bbox in boxes {
    out.push_str(&format!(
      "{},{},{},{},{},{}\n",
      frame, bbox.xmin, bbox.ymin, bbox.xmax, bbox.ymax, bbox.label
    ));
  }
  out
}

impl DirectoryRecordOutput {
  pub fn new(directory: impl Into<PathBuf>, record: bool) -> Self {
    Self {
      directory: directory.into(),
      record,
    }
  }

  pub fn truth_path(&self, frame: &str) -> PathBuf {
    self.directory.join(format!("{}-truth.png", frame_stem(frame)))
  }

  pub fn detection_path(&self, frame: &str) -> PathBuf {
    self
      .directory
      .join(format!("{}-detection.png", frame_stem(frame)))
  }

  pub fn record_path(&self, frame: &str) -> PathBuf {
    self
      .directory
      .join(format!("{}-detection.csv", frame_stem(frame)))
  }
}

impl Render<RgbImage, Comparison> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &RgbImage, result: &Comparison) -> Result<(), Self::Error> {
    std::fs::create_dir_all(&self.directory)?;

    let truth = self.truth_path(&result.frame);
    annotate(frame, &result.truth).save(&truth)?;
    debug!("保存真值图: {}", truth.display());

    if let Some(detection) = &result.detection {
      let path = self.detection_path(&result.frame);
      annotate(frame, detection).save(&path)?;
      debug!("保存检测图: {}", path.display());

      if self.record {
        let path = self.record_path(&result.frame);
        std::fs::write(&path, records_csv(&result.frame, detection))?;
        debug!("保存检测记录: {}", path.display());
      }
    }

    info!(
      "帧 {} 已记录到目录 {}",
      result.frame,
      self.directory.display()
    );
    Ok(())
  }
}
