// 该文件是 Lukuang （路况） 项目的一部分。
// src/frame.rs - NCHW 网络输入定义
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

use image::{RgbImage, imageops::FilterType};
use thiserror::Error;

const RGB_CHANNELS: usize = 3;
const PIXEL_SCALE: f32 = 1.0 / 255.0;

/// YOLOv3 输入边长
pub const YOLOV3_INPUT_SIZE: u32 = 416;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
pub struct BlobShapeError {
  pub expected: usize,
  pub actual: usize,
}

/// 归一化到 [0, 1] 的 NCHW 浮点输入，批大小为 1
#[derive(Debug, Clone, PartialEq)]
pub struct NchwBlob<const W: u32, const H: u32> {
  data: Box<[f32]>,
}

pub type YoloV3Blob = NchwBlob<YOLOV3_INPUT_SIZE, YOLOV3_INPUT_SIZE>;

impl<const W: u32, const H: u32> TryFrom<Vec<f32>> for NchwBlob<W, H> {
  type Error = BlobShapeError;

  fn try_from(data: Vec<f32>) -> Result<Self, Self::Error> {
    let expected = RGB_CHANNELS * W as usize * H as usize;
    if data.len() != expected {
      return Err(BlobShapeError {
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      data: data.into_boxed_slice(),
    })
  }
}

impl<const W: u32, const H: u32> Default for NchwBlob<W, H> {
  fn default() -> Self {
    let size = RGB_CHANNELS * (W as usize) * (H as usize);
    let data = vec![0f32; size].into_boxed_slice();
    Self { data }
  }
}

impl<const W: u32, const H: u32> NchwBlob<W, H> {
  /// 由 RGB 图像构造网络输入
  ///
  /// 图像被拉伸（不裁剪）到 `W×H`，像素乘以 1/255。`swap_rb` 为真时交换
  /// R 与 B 通道，YOLOv3 (darknet) 权重期望的就是交换后的顺序。
  pub fn from_image(image: &RgbImage, swap_rb: bool) -> Self {
    let resized = if image.dimensions() == (W, H) {
      image.clone()
    } else {
      image::imageops::resize(image, W, H, FilterType::Triangle)
    };

    let plane = (W as usize) * (H as usize);
    let mut data = vec![0f32; RGB_CHANNELS * plane];
    let (r_dst, b_dst) = if swap_rb { (2, 0) } else { (0, 2) };

    for (idx, pixel) in resized.pixels().enumerate() {
      data[r_dst * plane + idx] = pixel[0] as f32 * PIXEL_SCALE;
      data[plane + idx] = pixel[1] as f32 * PIXEL_SCALE;
      data[b_dst * plane + idx] = pixel[2] as f32 * PIXEL_SCALE;
    }

    Self {
      data: data.into_boxed_slice(),
    }
  }

  /// `[N, C, H, W]`
  pub fn shape(&self) -> [usize; 4] {
    [1, RGB_CHANNELS, H as usize, W as usize]
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }
}
