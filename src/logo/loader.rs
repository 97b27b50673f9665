//! # Logo 加载模块
//!
//! ## 设计思路
//!
//! 把 `logo.reference` 解析为可直接合成的 RGBA 像素。引用有四种形态：
//! - 本地资源句柄：从 `ResourceRegistry` 取回字节；
//! - `data:image/...;base64,`：直接解码；
//! - `http(s)://`：经 `reqwest` 下载，受超时与体积限制；
//! - 其他：按本地文件路径读取。
//!
//! 远程 Logo 会被标记为 `remote`，渲染器据此决定画布是否被“跨域污染”。
//!
//! ## 实现思路
//!
//! - 本地形态为同步路径（`load_local`），远程形态走异步下载（`load`）。
//! - 下载按块读取并累计字节数，超过上限立即中止。
//! - 解码前先做签名校验，避免把 HTML 错误页当成图片解码。

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;

use super::{is_local_handle, validate_image_signature, LogoFile, ResourceRegistry};
use crate::data_uri;
use crate::error::AppError;
use crate::settings::LogoSettings;

/// 引用形态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoReference<'a> {
    None,
    LocalHandle(&'a str),
    DataUri(&'a str),
    Remote(&'a str),
    FilePath(&'a str),
}

impl<'a> LogoReference<'a> {
    pub fn classify(reference: &'a str) -> Self {
        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return Self::None;
        }
        if is_local_handle(trimmed) {
            return Self::LocalHandle(trimmed);
        }
        if trimmed.starts_with("data:") {
            return Self::DataUri(trimmed);
        }
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Self::Remote(trimmed);
        }
        Self::FilePath(trimmed)
    }
}

/// 已解码、可合成的 Logo。
#[derive(Debug, Clone)]
pub struct LoadedLogo {
    reference: String,
    image: Arc<RgbaImage>,
    remote: bool,
}

impl LoadedLogo {
    pub fn new(reference: impl Into<String>, image: RgbaImage, remote: bool) -> Self {
        Self {
            reference: reference.into(),
            image: Arc::new(image),
            remote,
        }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// 是否来自远程地址（决定跨域污染）。
    pub fn is_remote(&self) -> bool {
        self.remote
    }
}

pub struct LogoLoader {
    client: reqwest::Client,
    settings: LogoSettings,
}

impl LogoLoader {
    pub fn new(settings: LogoSettings) -> Result<Self, AppError> {
        let timeout = Duration::from_secs(settings.fetch_timeout_secs.max(1));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| AppError::Network(format!("创建 HTTP 客户端失败：{}", e)))?;

        Ok(Self { client, settings })
    }

    /// 加载任意形态的引用。空引用返回 `Ok(None)`。
    pub async fn load(
        &self,
        reference: &str,
        registry: &dyn ResourceRegistry,
    ) -> Result<Option<LoadedLogo>, AppError> {
        match LogoReference::classify(reference) {
            LogoReference::Remote(url) => {
                let bytes = self.download(url).await?;
                decode(url, &bytes, true).map(Some)
            }
            _ => self.load_local(reference, registry),
        }
    }

    /// 同步加载非远程引用；远程引用返回错误，交由 `load` 处理。
    pub fn load_local(
        &self,
        reference: &str,
        registry: &dyn ResourceRegistry,
    ) -> Result<Option<LoadedLogo>, AppError> {
        match LogoReference::classify(reference) {
            LogoReference::None => Ok(None),
            LogoReference::LocalHandle(handle) => {
                let file = registry
                    .resolve(handle)
                    .ok_or_else(|| AppError::Logo(format!("本地资源句柄已失效：{}", handle)))?;
                decode(handle, file.bytes(), false).map(Some)
            }
            LogoReference::DataUri(uri) => {
                let bytes = data_uri::decode_image(uri, self.settings.max_bytes)?;
                decode("data-uri", &bytes, false).map(Some)
            }
            LogoReference::FilePath(path) => {
                let file = LogoFile::read(Path::new(path), self.settings.max_bytes)?;
                decode(path, file.bytes(), false).map(Some)
            }
            LogoReference::Remote(url) => Err(AppError::Logo(format!(
                "远程 Logo 需要异步加载：{}",
                url
            ))),
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, AppError> {
        if !self.settings.allow_remote {
            return Err(AppError::Logo("已禁用远程 Logo".to_string()));
        }

        log::info!("🌐 开始下载 Logo - URL: {}", redact_url_for_log(url));

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Network(format!("请求失败：{}", e)))?
            .error_for_status()
            .map_err(|e| AppError::Network(format!("HTTP 状态异常：{}", e)))?;

        let limit = self.settings.max_bytes;
        if let Some(length) = response.content_length() {
            if length > limit {
                return Err(AppError::Logo(format!(
                    "远程 Logo 过大：{} 字节（限制：{} 字节）",
                    length, limit
                )));
            }
        }

        let mut bytes = Vec::with_capacity(16 * 1024);
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AppError::Network(format!("读取响应失败：{}", e)))?
        {
            if bytes.len() as u64 + chunk.len() as u64 > limit {
                return Err(AppError::Logo(format!(
                    "远程 Logo 超过体积限制：{} 字节",
                    limit
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        log::info!("✅ Logo 下载完成 - {} 字节", bytes.len());
        Ok(bytes)
    }
}

fn decode(source: &str, bytes: &[u8], remote: bool) -> Result<LoadedLogo, AppError> {
    validate_image_signature(bytes)?;
    let image = image::load_from_memory(bytes)
        .map_err(|e| AppError::Logo(format!("图片解码失败：{}", e)))?
        .to_rgba8();

    log::debug!(
        "🖼️ Logo 解码成功 - 来源: {} 尺寸: {}x{} remote={}",
        if remote { redact_url_for_log(source) } else { source.to_string() },
        image.width(),
        image.height(),
        remote
    );

    Ok(LoadedLogo::new(source, image, remote))
}

/// 日志中去掉查询串与片段，避免泄露签名参数。
fn redact_url_for_log(url: &str) -> String {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    url[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logo::BlobRegistry;
    use crate::logo::tests::{png_bytes, png_logo};

    fn loader() -> LogoLoader {
        LogoLoader::new(LogoSettings::default()).expect("loader init failed")
    }

    #[test]
    fn classify_recognizes_each_form() {
        assert_eq!(LogoReference::classify("  "), LogoReference::None);
        assert_eq!(
            LogoReference::classify("blob:qr-studio/3"),
            LogoReference::LocalHandle("blob:qr-studio/3")
        );
        assert!(matches!(
            LogoReference::classify("data:image/png;base64,AAAA"),
            LogoReference::DataUri(_)
        ));
        assert!(matches!(
            LogoReference::classify("HTTPS://example.com/a.png"),
            LogoReference::Remote(_)
        ));
        assert!(matches!(
            LogoReference::classify("./logo.png"),
            LogoReference::FilePath(_)
        ));
    }

    #[test]
    fn load_local_resolves_registry_handle() {
        let registry = BlobRegistry::new();
        let handle = registry.create(png_logo("red.png"));

        let logo = loader().load_local(&handle, &registry).unwrap().unwrap();
        assert_eq!(logo.image().dimensions(), (8, 8));
        assert!(!logo.is_remote());
    }

    #[test]
    fn load_local_reports_released_handle() {
        let registry = BlobRegistry::new();
        let handle = registry.create(png_logo("red.png"));
        registry.release(&handle);

        let result = loader().load_local(&handle, &registry);
        assert!(matches!(result, Err(AppError::Logo(_))));
    }

    #[test]
    fn load_local_decodes_data_uri() {
        let registry = BlobRegistry::new();
        let uri = data_uri::encode_png(&png_bytes(4, 6, [0, 255, 0, 255]));

        let logo = loader().load_local(&uri, &registry).unwrap().unwrap();
        assert_eq!(logo.image().dimensions(), (4, 6));
    }

    #[test]
    fn load_local_rejects_remote_reference() {
        let registry = BlobRegistry::new();
        let result = loader().load_local("https://example.com/logo.png", &registry);
        assert!(matches!(result, Err(AppError::Logo(_))));
    }

    #[tokio::test]
    async fn remote_load_respects_disabled_setting() {
        let registry = BlobRegistry::new();
        let settings = LogoSettings {
            allow_remote: false,
            ..LogoSettings::default()
        };
        let loader = LogoLoader::new(settings).unwrap();

        let result = loader.load("https://example.com/logo.png", &registry).await;
        assert!(matches!(result, Err(AppError::Logo(_))));
    }

    #[test]
    fn redact_url_for_log_removes_query_and_fragment() {
        assert_eq!(
            redact_url_for_log("https://example.com:8443/img.png?token=abc#x"),
            "https://example.com:8443/img.png"
        );
    }
}
