// 该文件是 Lukuang （路况） 项目的一部分。
// src/model/yolov3.rs - YOLOv3 检测器
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

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::{
  assets::{AssetError, VerifiedAssets},
  detection::{BBox, BoxSet, PixelRect},
  frame::YoloV3Blob,
  model::{Network, RawOutput, Thresholds, decode::decode_layers, nms::non_max_suppression},
  taxonomy::{Taxonomy, TaxonomyMismatch},
};

#[derive(Error, Debug)]
pub enum DetectorError {
  #[error("模型资源错误: {0}")]
  Asset(#[from] AssetError),
  #[error("类别映射错误: {0}")]
  Taxonomy(#[from] TaxonomyMismatch),
  #[error("网络推理错误: {0}")]
  Network(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// 原始输出后处理：解码 → 非极大值抑制 → 标签映射
///
/// 纯函数，相同输入得到相同的框序列。置信度只使用最大类别分数，
/// 不乘 objectness。输出层的类别数必须与映射表长度一致。
pub fn postprocess(
  output: &RawOutput,
  width: u32,
  height: u32,
  taxonomy: &Taxonomy<'_>,
  thresholds: Thresholds,
) -> Result<BoxSet, TaxonomyMismatch> {
  for layer in &output.layers {
    if let Some(classes) = layer.num_classes() {
      taxonomy.check_class_count(classes)?;
    }
  }

  let candidates = decode_layers(&output.layers, width, height, thresholds.confidence);
  if candidates.is_empty() {
    debug!("没有候选框超过置信度阈值 {}", thresholds.confidence);
    return Ok(BoxSet::empty());
  }

  let rects: Vec<PixelRect> = candidates.iter().map(|c| c.to_rect()).collect();
  let scores: Vec<f32> = candidates.iter().map(|c| c.confidence).collect();
  let kept = non_max_suppression(&rects, &scores, thresholds.overlap);

  let boxes: BoxSet = kept
    .into_iter()
    .filter_map(|i| {
      let label = taxonomy.remap(candidates[i].class_id)?;
      Some(BBox::from_rect(rects[i], label))
    })
    .collect();

  debug!(
    "候选框 {} 个, 映射后保留 {} 个",
    candidates.len(),
    boxes.len()
  );
  Ok(boxes)
}

pub struct YoloV3Builder {
  assets: VerifiedAssets,
  taxonomy: Taxonomy<'static>,
  thresholds: Thresholds,
}

impl YoloV3Builder {
  /// 构建检测器必须先通过资源校验
  pub fn new(assets: VerifiedAssets) -> Self {
    Self {
      assets,
      taxonomy: Taxonomy::COCO,
      thresholds: Thresholds::default(),
    }
  }

  pub fn taxonomy(mut self, taxonomy: Taxonomy<'static>) -> Self {
    self.taxonomy = taxonomy;
    self
  }

  pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
    self.thresholds = thresholds;
    self
  }

  pub fn build<N: Network>(self, network: N) -> Result<YoloV3<N>, DetectorError> {
    info!("读取类别列表: {}", self.assets.names_path().display());
    let class_names = self.assets.class_names()?;
    if let Err(e) = self.taxonomy.check_class_count(class_names.len()) {
      error!(
        "类别列表有 {} 项，映射表有 {} 项",
        class_names.len(),
        self.taxonomy.len()
      );
      return Err(e.into());
    }
    debug!("类别列表: {:?}", class_names);

    info!("模型权重: {}", self.assets.weights_path().display());
    info!("模型配置: {}", self.assets.config_path().display());

    Ok(YoloV3 {
      network,
      assets: self.assets,
      taxonomy: self.taxonomy,
      thresholds: self.thresholds,
    })
  }
}

/// YOLOv3 检测器：网络前向计算由 `N` 提供
pub struct YoloV3<N> {
  network: N,
  assets: VerifiedAssets,
  taxonomy: Taxonomy<'static>,
  thresholds: Thresholds,
}

impl<N> YoloV3<N>
where
  N: Network,
  N::Error: std::error::Error + Send + Sync + 'static,
{
  pub fn network(&self) -> &N {
    &self.network
  }

  pub fn assets(&self) -> &VerifiedAssets {
    &self.assets
  }

  pub fn thresholds(&self) -> Thresholds {
    self.thresholds
  }

  /// 仅执行网络前向计算
  pub fn forward(&self, image: &RgbImage) -> Result<RawOutput, DetectorError> {
    // darknet 权重期望 BGR 顺序
    let blob = YoloV3Blob::from_image(image, true);
    debug!("网络输入形状: {:?}", blob.shape());

    let now = std::time::Instant::now();
    let output = self
      .network
      .forward(&blob)
      .map_err(|e| DetectorError::Network(Box::new(e)))?;
    debug!(
      "前向计算完成，耗时: {:.2?}, 输出层 {} 个",
      now.elapsed(),
      output.layers.len()
    );
    Ok(output)
  }

  /// 对已有的网络输出做后处理
  pub fn postprocess(
    &self,
    output: &RawOutput,
    image: &RgbImage,
    thresholds: Thresholds,
  ) -> Result<BoxSet, DetectorError> {
    let (width, height) = image.dimensions();
    Ok(postprocess(
      output,
      width,
      height,
      &self.taxonomy,
      thresholds,
    )?)
  }

  pub fn detect(&self, image: &RgbImage) -> Result<BoxSet, DetectorError> {
    self.detect_with(image, self.thresholds)
  }

  pub fn detect_with(
    &self,
    image: &RgbImage,
    thresholds: Thresholds,
  ) -> Result<BoxSet, DetectorError> {
    let output = self.forward(image)?;
    self.postprocess(&output, image, thresholds)
  }
}
