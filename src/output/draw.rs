// 该文件是 Lukuang （路况） 项目的一部分。
// src/output/draw.rs - 在图像上叠加标注框
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

use image::{ImageBuffer, Rgb, RgbImage, imageops};
use imageproc::rect::Rect;

use crate::detection::{BBox, BoxSet};

const CHANNELS: usize = 3;

/// 裁剪到图像范围内的区域，完全落在图像外时为 `None`
fn clip(bbox: &BBox, width: u32, height: u32) -> Option<Rect> {
  let (w, h) = (i64::from(width), i64::from(height));
  let x0 = i64::from(bbox.xmin).clamp(0, w);
  let y0 = i64::from(bbox.ymin).clamp(0, h);
  let x1 = i64::from(bbox.xmax).clamp(0, w);
  let y1 = i64::from(bbox.ymax).clamp(0, h);
  if x0 >= x1 || y0 >= y1 {
    return None;
  }
  Some(Rect::at(x0 as i32, y0 as i32).of_size((x1 - x0) as u32, (y1 - y0) as u32))
}

/// 将标注框以半透明的方式叠加到图像副本上
///
/// 按集合顺序逐个混合：框内每个像素的每个通道变为 `(像素 + 颜色) / 2`。
/// 所有框共用同一个浮点缓冲区，最后一次性截断回 8 位，因此重叠区域的
/// 结果与绘制顺序有关。原图不会被修改；超出图像的部分被裁掉。
pub fn annotate(image: &RgbImage, boxes: &BoxSet) -> RgbImage {
  let (width, height) = image.dimensions();
  let mut buffer: Vec<f64> = image.as_raw().iter().map(|&v| f64::from(v)).collect();
  let stride = width as usize * CHANNELS;

  for bbox in boxes {
    let Some(rect) = clip(bbox, width, height) else {
      continue;
    };
    let color = bbox.label.color();
    for y in rect.top()..=rect.bottom() {
      let row = y as usize * stride;
      for x in rect.left()..=rect.right() {
        let offset = row + x as usize * CHANNELS;
        for (value, &c) in buffer[offset..offset + CHANNELS].iter_mut().zip(color.0.iter()) {
          *value = (*value + f64::from(c)) / 2.0;
        }
      }
    }
  }

  let data: Vec<u8> = buffer.into_iter().map(|v| v as u8).collect();
  // 缓冲区长度与原图一致
  ImageBuffer::from_raw(width, height, data).unwrap_or_else(|| image.clone())
}

/// 左右拼接两张图像，高度不足处以黑色填充
pub fn side_by_side(left: &RgbImage, right: &RgbImage) -> RgbImage {
  let width = left.width() + right.width();
  let height = left.height().max(right.height());
  let mut canvas = RgbImage::from_pixel(width, height, Rgb([0, 0, 0]));
  imageops::replace(&mut canvas, left, 0, 0);
  imageops::replace(&mut canvas, right, i64::from(left.width()), 0);
  canvas
}
