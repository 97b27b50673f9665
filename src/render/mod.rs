//! # 渲染模块（render）
//!
//! ## 设计思路
//!
//! 渲染目标是外部协作者：给定配置与已解码的 Logo，产出一块可寻址的像素画布。
//! 核心层只依赖 `RenderTarget` / `SurfaceLookup` 两个 trait：
//! - `render` 返回 `SurfaceId`，导出与复制都显式携带这个句柄；
//! - `surface` 按句柄查找画布，找不到即 `SurfaceNotFound`。
//!
//! `QrRenderer` 是随附的默认实现（`qrcode` 生成矩阵 + `image` 绘制）。
//!
//! ## 画布导出能力
//!
//! `Surface` 提供两种序列化：
//! - `to_image_data_uri`：同步，供下载链路使用；
//! - `to_png_blob`：异步（阻塞线程编码），失败时返回 `None`，对应剪贴板链路的“无 blob”。
//!
//! 合成了远程 Logo 且未启用跨域加载的画布是“被污染”的，两种序列化都会失败。

mod color;
mod paint;
mod qr;

use std::fmt;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use image::{ImageFormat, RgbaImage};
use serde::Serialize;

use crate::config::QrConfig;
use crate::data_uri;
use crate::error::AppError;
use crate::logo::LoadedLogo;

pub use color::parse_css_color;
pub use qr::QrRenderer;

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// 画布句柄。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SurfaceId(u64);

impl SurfaceId {
    /// 分配一个进程内唯一的新句柄。
    pub fn allocate() -> Self {
        Self(NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface-{}", self.0)
    }
}

/// 渲染完成的像素画布（只读，克隆代价为一次 `Arc` 计数）。
#[derive(Debug, Clone)]
pub struct Surface {
    id: SurfaceId,
    pixels: Arc<RgbaImage>,
    tainted: bool,
}

impl Surface {
    pub fn new(id: SurfaceId, pixels: RgbaImage, tainted: bool) -> Self {
        Self {
            id,
            pixels: Arc::new(pixels),
            tainted,
        }
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// 是否因跨域 Logo 被污染。
    pub fn is_tainted(&self) -> bool {
        self.tainted
    }

    /// 同步编码为 PNG 字节。
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, AppError> {
        if self.tainted {
            return Err(AppError::Encode(
                "画布已被跨域 Logo 污染，禁止导出".to_string(),
            ));
        }
        let (width, height) = self.pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(AppError::Encode(format!("画布尺寸无效：{}x{}", width, height)));
        }

        let mut cursor = Cursor::new(Vec::new());
        self.pixels
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| AppError::Encode(format!("PNG 编码失败：{}", e)))?;
        Ok(cursor.into_inner())
    }

    /// 序列化为 `data:image/png;base64,...`。
    pub fn to_image_data_uri(&self) -> Result<String, AppError> {
        self.to_png_bytes().map(|bytes| data_uri::encode_png(&bytes))
    }

    /// 在阻塞线程中编码为 PNG blob；任何失败都返回 `None`。
    pub async fn to_png_blob(&self) -> Option<Vec<u8>> {
        let surface = self.clone();
        match tokio::task::spawn_blocking(move || surface.to_png_bytes()).await {
            Ok(Ok(bytes)) => Some(bytes),
            Ok(Err(err)) => {
                log::warn!("❌ 画布编码失败 - {}: {}", self.id, err);
                None
            }
            Err(err) => {
                log::warn!("❌ 画布编码线程执行失败 - {}: {}", self.id, err);
                None
            }
        }
    }
}

/// 按句柄查找画布。
pub trait SurfaceLookup {
    fn surface(&self, id: SurfaceId) -> Option<Surface>;
}

/// 渲染目标：配置变更后重新绘制，返回画布句柄。
pub trait RenderTarget: SurfaceLookup + Send {
    fn render(&mut self, config: &QrConfig, logo: Option<&LoadedLogo>)
        -> Result<SurfaceId, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn tainted_surface_refuses_every_export() {
        let surface = Surface::new(
            SurfaceId::allocate(),
            RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255])),
            true,
        );
        assert!(matches!(surface.to_png_bytes(), Err(AppError::Encode(_))));
        assert!(matches!(surface.to_image_data_uri(), Err(AppError::Encode(_))));
    }

    #[test]
    fn empty_surface_cannot_be_encoded() {
        let surface = Surface::new(SurfaceId::allocate(), RgbaImage::new(0, 0), false);
        assert!(matches!(surface.to_png_bytes(), Err(AppError::Encode(_))));
    }

    #[tokio::test]
    async fn png_blob_matches_sync_encoding() {
        let surface = Surface::new(
            SurfaceId::allocate(),
            RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255])),
            false,
        );
        let blob = surface.to_png_blob().await.expect("blob");
        assert_eq!(blob, surface.to_png_bytes().unwrap());

        let decoded = image::load_from_memory(&blob).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (3, 2));
    }

    #[test]
    fn surface_ids_are_distinct() {
        let a = SurfaceId::allocate();
        let b = SurfaceId::allocate();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("surface-"));
    }
}
