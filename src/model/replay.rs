// 该文件是 Lukuang （路况） 项目的一部分。
// src/model/replay.rs - 回放已记录的网络输出
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

use std::{fs::File, io::BufReader, path::Path};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::YoloV3Blob,
  model::{Layer, LayerShapeError, Network, RawOutput},
};

#[derive(Error, Debug)]
pub enum ReplayError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{actual}'")]
  SchemeMismatch { expected: String, actual: String },
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 解析错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("输出层 {layer} 形状错误: {source}")]
  LayerShape {
    layer: usize,
    #[source]
    source: LayerShapeError,
  },
}

/// 记录文件格式: `{"layers": [[[cx, cy, w, h, obj, s0, ...], ...], ...]}`
#[derive(Debug, Deserialize)]
struct Recording {
  layers: Vec<Vec<Vec<f32>>>,
}

/// 忽略输入，总是返回同一份记录下来的网络输出
///
/// 用于离线复现某一帧的检测结果，以及在没有推理后端时调试后处理。
#[derive(Debug, Clone)]
pub struct ReplayNetwork {
  output: RawOutput,
}

impl ReplayNetwork {
  pub fn new(output: RawOutput) -> Self {
    Self { output }
  }

  pub fn from_json(json: &str) -> Result<Self, ReplayError> {
    let recording: Recording = serde_json::from_str(json)?;
    Self::from_recording(recording)
  }

  pub fn open(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
    let path = path.as_ref();
    info!("读取网络输出记录: {}", path.display());
    let reader = BufReader::new(File::open(path)?);
    let recording: Recording = serde_json::from_reader(reader)?;
    Self::from_recording(recording)
  }

  fn from_recording(recording: Recording) -> Result<Self, ReplayError> {
    let layers = recording
      .layers
      .iter()
      .enumerate()
      .map(|(idx, rows)| {
        Layer::from_rows(rows).map_err(|source| ReplayError::LayerShape { layer: idx, source })
      })
      .collect::<Result<Vec<_>, _>>()?;

    debug!(
      "记录包含 {} 个输出层, 共 {} 行",
      layers.len(),
      layers.iter().map(Layer::len).sum::<usize>()
    );
    Ok(Self::new(layers.into()))
  }
}

impl FromUrlWithScheme for ReplayNetwork {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayNetwork {
  type Error = ReplayError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ReplayError::SchemeMismatch {
        expected: Self::SCHEME.to_string(),
        actual: url.scheme().to_string(),
      });
    }

    Self::open(url.path())
  }
}

impl Network for ReplayNetwork {
  type Error = std::convert::Infallible;

  fn forward(&self, _blob: &YoloV3Blob) -> Result<RawOutput, Self::Error> {
    Ok(self.output.clone())
  }
}
