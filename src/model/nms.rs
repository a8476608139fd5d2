// 该文件是 Lukuang （路况） 项目的一部分。
// src/model/nms.rs - 非极大值抑制
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

use crate::detection::PixelRect;

/// 贪心非极大值抑制，返回保留框的下标（按置信度从高到低）
///
/// 不区分类别。置信度相同时先出现的框优先；与已保留框 IoU 大于
/// `overlap_threshold` 的框被丢弃。
pub fn non_max_suppression(
  rects: &[PixelRect],
  scores: &[f32],
  overlap_threshold: f32,
) -> Vec<usize> {
  debug_assert_eq!(rects.len(), scores.len());
  let len = rects.len().min(scores.len());

  // 稳定排序保证同分时保持原顺序
  let mut order: Vec<usize> = (0..len).collect();
  order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

  let mut kept: Vec<usize> = Vec::new();
  for idx in order {
    let suppressed = kept
      .iter()
      .any(|&k| rects[k].iou(&rects[idx]) > overlap_threshold);
    if !suppressed {
      kept.push(idx);
    }
  }

  debug!("NMS: 输入 {} 个框, 保留 {} 个", len, kept.len());
  kept
}
