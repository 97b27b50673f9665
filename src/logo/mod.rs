//! # Logo 模块（logo）
//!
//! ## 设计思路
//!
//! Logo 相关能力拆为三层：
//! - `registry`：本地资源句柄的创建 / 释放（`ResourceRegistry`）
//! - `manager`：句柄生命周期与 `logo.reference` 的唯一写入口（`LogoAssetManager`）
//! - `loader`：把引用解析为可合成的像素（句柄 / data URI / URL / 本地路径）
//!
//! `LogoFile` 是“用户选中的文件”：读入时即做体积限制与图片签名校验，
//! 之后在各层之间以 `Arc<[u8]>` 共享，不再复制字节。

mod loader;
mod manager;
mod registry;

use std::path::Path;
use std::sync::Arc;

use crate::error::AppError;

pub use loader::{LoadedLogo, LogoLoader, LogoReference};
pub use manager::LogoAssetManager;
pub use registry::{is_local_handle, BlobRegistry, ResourceRegistry, HANDLE_PREFIX};

/// 用户选择的本地图片文件。
#[derive(Debug, Clone)]
pub struct LogoFile {
    name: String,
    mime_type: &'static str,
    bytes: Arc<[u8]>,
}

impl LogoFile {
    /// 由内存字节构造，校验其为图片。
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, AppError> {
        let mime_type = validate_image_signature(&bytes)?;
        Ok(Self {
            name: name.into(),
            mime_type,
            bytes: Arc::from(bytes),
        })
    }

    /// 从磁盘读取图片文件。
    pub fn read(path: &Path, max_bytes: u64) -> Result<Self, AppError> {
        log::info!("📁 开始读取本地 Logo - 路径: {}", path.display());

        if !path.exists() {
            return Err(AppError::Logo(format!("文件不存在：{}", path.display())));
        }

        let metadata = std::fs::metadata(path)?;
        if metadata.len() > max_bytes {
            return Err(AppError::Logo(format!(
                "文件过大：{:.2} MB（限制：{:.2} MB）",
                metadata.len() as f64 / 1024.0 / 1024.0,
                max_bytes as f64 / 1024.0 / 1024.0
            )));
        }

        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "logo".to_string());
        Self::from_bytes(name, bytes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// 通过文件签名（magic bytes）校验输入是否为图片，返回 MIME 类型。
pub(crate) fn validate_image_signature(bytes: &[u8]) -> Result<&'static str, AppError> {
    if bytes.is_empty() {
        return Err(AppError::Logo("图片内容为空".to_string()));
    }

    let kind = infer::get(bytes)
        .ok_or_else(|| AppError::Logo("无法识别图片类型".to_string()))?;

    if kind.matcher_type() != infer::MatcherType::Image {
        return Err(AppError::Logo(format!(
            "文件签名不是图片类型：{}",
            kind.mime_type()
        )));
    }

    Ok(kind.mime_type())
}
