// 该文件是 Lukuang （路况） 项目的一部分。
// src/model/decode.rs - 原始输出解码
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

use tracing::debug;

use crate::{detection::Candidate, model::Layer};

/// 每行在类别分数之前的字段数: cx, cy, w, h, objectness
pub const ROW_HEADER: usize = 5;

/// 取最大类别分数及其索引，分数相同取索引最小者
pub fn best_class(scores: &[f32]) -> Option<(usize, f32)> {
  let (&first, rest) = scores.split_first()?;
  let mut best = (0usize, first);
  for (i, &score) in rest.iter().enumerate() {
    if score > best.1 {
      best = (i + 1, score);
    }
  }
  Some(best)
}

/// 将所有输出层解码为像素坐标的候选框
///
/// 置信度只取最大类别分数，objectness 不参与计算；保留条件为
/// `confidence > confidence_threshold`。行宽不足的行直接跳过。
pub fn decode_layers(
  layers: &[Layer],
  width: u32,
  height: u32,
  confidence_threshold: f32,
) -> Vec<Candidate> {
  let (w, h) = (width as f32, height as f32);
  let mut candidates = Vec::new();

  for (layer_idx, layer) in layers.iter().enumerate() {
    let before = candidates.len();

    for row in layer.rows() {
      if row.len() <= ROW_HEADER {
        continue;
      }

      let Some((class_id, confidence)) = best_class(&row[ROW_HEADER..]) else {
        continue;
      };

      if confidence.is_nan() || confidence <= confidence_threshold {
        continue;
      }

      candidates.push(Candidate {
        center_x: row[0] * w,
        center_y: row[1] * h,
        width: row[2] * w,
        height: row[3] * h,
        confidence,
        class_id,
      });
    }

    debug!(
      "输出层 {}: {} 行, 保留 {} 个候选框",
      layer_idx,
      layer.len(),
      candidates.len() - before
    );
  }

  candidates
}
