// 该文件是 Lukuang （路况） 项目的一部分。
// src/model.rs - 模型
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

use thiserror::Error;

use crate::frame::YoloV3Blob;

/// 网络前向计算边界
///
/// 实现者只负责 `blob → 原始输出`，解码、抑制与标签映射在本库内完成。
pub trait Network {
  type Error;

  fn forward(&self, blob: &YoloV3Blob) -> Result<RawOutput, Self::Error>;
}

/// 置信度与重叠阈值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
  /// 类别分数严格大于该值才保留
  pub confidence: f32,
  /// 与已保留框 IoU 严格大于该值的框被抑制
  pub overlap: f32,
}

impl Default for Thresholds {
  fn default() -> Self {
    Self {
      confidence: 0.5,
      overlap: 0.3,
    }
  }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerShapeError {
  #[error("输出层行宽不一致: 第 {row} 行宽度 {actual}, 期望 {expected}")]
  RaggedRow {
    row: usize,
    expected: usize,
    actual: usize,
  },
  #[error("输出层数据长度 {len} 不是行宽 {cols} 的整数倍")]
  Length { len: usize, cols: usize },
}

/// 单个输出层，行主序，每行是一个锚点的预测
/// `[cx, cy, w, h, objectness, class_score_0 … class_score_{K-1}]`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layer {
  cols: usize,
  data: Box<[f32]>,
}

impl Layer {
  pub fn new(cols: usize, data: Vec<f32>) -> Result<Self, LayerShapeError> {
    if (cols == 0 && !data.is_empty()) || (cols != 0 && data.len() % cols != 0) {
      return Err(LayerShapeError::Length {
        len: data.len(),
        cols,
      });
    }

    Ok(Self {
      cols,
      data: data.into_boxed_slice(),
    })
  }

  pub fn from_rows<R: AsRef<[f32]>>(rows: &[R]) -> Result<Self, LayerShapeError> {
    let cols = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
    let mut data = Vec::with_capacity(cols * rows.len());
    for (row, values) in rows.iter().enumerate() {
      let values = values.as_ref();
      if values.len() != cols {
        return Err(LayerShapeError::RaggedRow {
          row,
          expected: cols,
          actual: values.len(),
        });
      }
      data.extend_from_slice(values);
    }
    Self::new(cols, data)
  }

  pub fn cols(&self) -> usize {
    self.cols
  }

  pub fn len(&self) -> usize {
    if self.cols == 0 {
      0
    } else {
      self.data.len() / self.cols
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// 类别数；行宽不足以容纳任何类别分数时为 `None`
  pub fn num_classes(&self) -> Option<usize> {
    self
      .cols
      .checked_sub(decode::ROW_HEADER)
      .filter(|&classes| classes > 0)
  }

  pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
    self.data.chunks_exact(self.cols.max(1))
  }
}

/// 网络一次前向计算的全部输出层
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawOutput {
  pub layers: Vec<Layer>,
}

impl From<Vec<Layer>> for RawOutput {
  fn from(layers: Vec<Layer>) -> Self {
    Self { layers }
  }
}

pub mod decode;
pub mod nms;

mod yolov3;
pub use self::yolov3::{DetectorError, YoloV3, YoloV3Builder, postprocess};

#[cfg(feature = "replay_network")]
mod replay;
#[cfg(feature = "replay_network")]
pub use self::replay::{ReplayError, ReplayNetwork};

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn layer_from_rows() {
    let layer = Layer::from_rows(&[vec![0.0; 7], vec![1.0; 7]]).unwrap();
    assert_eq!(layer.cols(), 7);
    assert_eq!(layer.len(), 2);
    assert_eq!(layer.num_classes(), Some(2));
    assert_eq!(layer.rows().nth(1), Some(&[1.0; 7][..]));
  }

  #[test]
  fn ragged_rows_rejected() {
    let err = Layer::from_rows(&[vec![0.0; 7], vec![0.0; 6]]).unwrap_err();
    assert_eq!(
      err,
      LayerShapeError::RaggedRow {
        row: 1,
        expected: 7,
        actual: 6
      }
    );
  }

  #[test]
  fn narrow_layer_has_no_classes() {
    let layer = Layer::new(5, vec![0.0; 10]).unwrap();
    assert_eq!(layer.num_classes(), None);
    assert!(Layer::new(5, vec![0.0; 7]).is_err());
  }

  #[test]
  fn empty_layer() {
    let layer = Layer::from_rows::<Vec<f32>>(&[]).unwrap();
    assert!(layer.is_empty());
    assert_eq!(layer.rows().count(), 0);
  }
}
