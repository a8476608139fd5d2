// 该文件是 Lukuang （路况） 项目的一部分。
// src/detection.rs - 检测候选框与标注框定义
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

use crate::label::Label;

/// 解码后尚未抑制的候选框，坐标为图像像素
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
  pub center_x: f32,
  pub center_y: f32,
  pub width: f32,
  pub height: f32,
  pub confidence: f32,
  pub class_id: usize,
}

impl Candidate {
  /// 转为整数像素的左上角 + 宽高
  ///
  /// 中心与宽高先各自截断为整数，再由中心减去半宽得到左上角。
  pub fn to_rect(&self) -> PixelRect {
    let center_x = self.center_x as i32;
    let center_y = self.center_y as i32;
    let width = self.width as i32;
    let height = self.height as i32;

    PixelRect {
      x: (center_x as f32 - width as f32 / 2.0) as i32,
      y: (center_y as f32 - height as f32 / 2.0) as i32,
      width,
      height,
    }
  }
}

/// 左上角 + 宽高形式的像素矩形
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
  pub x: i32,
  pub y: i32,
  pub width: i32,
  pub height: i32,
}

impl PixelRect {
  pub fn area(&self) -> i64 {
    self.width.max(0) as i64 * self.height.max(0) as i64
  }

  pub fn right(&self) -> i32 {
    self.x.saturating_add(self.width)
  }

  pub fn bottom(&self) -> i32 {
    self.y.saturating_add(self.height)
  }

  /// 交并比，并集为零时返回 0
  ///
  /// 角点与面积在 `i64` 中计算，饱和后的极端坐标不会溢出。
  pub fn iou(&self, other: &PixelRect) -> f32 {
    let x1 = i64::from(self.x.max(other.x));
    let y1 = i64::from(self.y.max(other.y));
    let x2 = (i64::from(self.x) + i64::from(self.width))
      .min(i64::from(other.x) + i64::from(other.width));
    let y2 = (i64::from(self.y) + i64::from(self.height))
      .min(i64::from(other.y) + i64::from(other.height));

    let intersection = (x2 - x1).max(0) as i128 * (y2 - y1).max(0) as i128;
    let union = self.area() as i128 + other.area() as i128 - intersection;

    if union > 0 {
      (intersection as f64 / union as f64) as f32
    } else {
      0.0
    }
  }
}

/// 带标签的像素框，真值与模型输出共用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BBox {
  pub xmin: i32,
  pub ymin: i32,
  pub xmax: i32,
  pub ymax: i32,
  pub label: Label,
}

impl BBox {
  /// 创建标注框，坐标对会被整理为 `min ≤ max`
  pub fn new(xmin: i32, ymin: i32, xmax: i32, ymax: i32, label: Label) -> Self {
    Self {
      xmin: xmin.min(xmax),
      ymin: ymin.min(ymax),
      xmax: xmin.max(xmax),
      ymax: ymin.max(ymax),
      label,
    }
  }

  /// 右下角饱和到 `i32` 范围内
  pub fn from_rect(rect: PixelRect, label: Label) -> Self {
    Self::new(rect.x, rect.y, rect.right(), rect.bottom(), label)
  }
}

/// 按插入顺序排列的标注框集合
///
/// 顺序即绘制顺序：后面的框叠加在前面框的混合结果之上。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoxSet {
  items: Box<[BBox]>,
}

impl BoxSet {
  pub fn empty() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, BBox> {
    self.items.iter()
  }

  pub fn as_slice(&self) -> &[BBox] {
    &self.items
  }
}

impl From<Vec<BBox>> for BoxSet {
  fn from(items: Vec<BBox>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

impl FromIterator<BBox> for BoxSet {
  fn from_iter<T: IntoIterator<Item = BBox>>(iter: T) -> Self {
    iter.into_iter().collect::<Vec<_>>().into()
  }
}

impl<'a> IntoIterator for &'a BoxSet {
  type Item = &'a BBox;
  type IntoIter = std::slice::Iter<'a, BBox>;

  fn into_iter(self) -> Self::IntoIter {
    self.items.iter()
  }
}
