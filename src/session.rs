//! # 会话（session）
//!
//! ## 设计思路
//!
//! `Session` 是配置、Logo 句柄、渲染目标与两条导出链路的唯一所有者：
//! - 任何配置修改都立即触发重新渲染，导出与复制总是作用于当前画布；
//! - 复制到剪贴板与重置是**可选能力**，构建时决定是否启用，未启用时返回
//!   `CapabilityUnavailable`，不再维护两套几乎相同的流程；
//! - `teardown()` 释放本地 Logo 句柄、取消剪贴板定时器，`Drop` 时自动调用；
//!   销毁后的任何操作返回 `SessionClosed`。
//!
//! ## 实现思路
//!
//! - Logo 像素按引用缓存：引用不变时直接复用，变化时重新解析。
//!   本地句柄 / data URI / 文件路径同步解析；远程 URL 只在 `set_logo_url` 中异步下载。
//! - Logo 解析失败只记日志，二维码照常渲染（不带 Logo）。
//! - 渲染目标以泛型参数持有，默认 `QrRenderer`。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::clipboard::{ArboardClipboard, ClipboardBackend, ClipboardExporter, CopyStatus};
use crate::config::{ConfigField, QrConfig};
use crate::error::AppError;
use crate::export::{DownloadSink, ExportPipeline, FsDownloadSink};
use crate::logo::{BlobRegistry, LoadedLogo, LogoAssetManager, LogoFile, LogoLoader, ResourceRegistry};
use crate::render::{QrRenderer, RenderTarget, SurfaceId};
use crate::reset::ResetController;
use crate::settings::AppSettings;

/// 已解析的 Logo：引用 + 解析结果（失败为 `None`）。
struct ResolvedLogo {
    reference: String,
    logo: Option<LoadedLogo>,
}

/// 会话构建器。
pub struct SessionBuilder<R: RenderTarget = QrRenderer> {
    settings: AppSettings,
    renderer: R,
    config: QrConfig,
    registry: Option<Arc<dyn ResourceRegistry>>,
    clipboard: Option<Arc<dyn ClipboardBackend>>,
    enable_reset: bool,
    sink: Option<Box<dyn DownloadSink>>,
}

impl SessionBuilder<QrRenderer> {
    pub fn new(settings: AppSettings) -> Self {
        Self {
            settings,
            renderer: QrRenderer::new(),
            config: QrConfig::default(),
            registry: None,
            clipboard: None,
            enable_reset: false,
            sink: None,
        }
    }
}

impl<R: RenderTarget> SessionBuilder<R> {
    /// 替换渲染目标。
    pub fn renderer<T: RenderTarget>(self, renderer: T) -> SessionBuilder<T> {
        SessionBuilder {
            settings: self.settings,
            renderer,
            config: self.config,
            registry: self.registry,
            clipboard: self.clipboard,
            enable_reset: self.enable_reset,
            sink: self.sink,
        }
    }

    /// 初始配置（Logo 引用不随之带入，始终由 `LogoAssetManager` 管理）。
    pub fn config(mut self, config: QrConfig) -> Self {
        self.config = config;
        self.config.set_logo_reference(String::new());
        self
    }

    pub fn registry(mut self, registry: Arc<dyn ResourceRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// 启用复制到剪贴板，使用指定后端。
    pub fn clipboard_backend(mut self, backend: Arc<dyn ClipboardBackend>) -> Self {
        self.clipboard = Some(backend);
        self
    }

    /// 启用复制到剪贴板，使用系统剪贴板。
    pub fn system_clipboard(self) -> Self {
        let backend = Arc::new(ArboardClipboard::new(&self.settings.clipboard));
        self.clipboard_backend(backend)
    }

    pub fn enable_reset(mut self, enabled: bool) -> Self {
        self.enable_reset = enabled;
        self
    }

    pub fn download_sink(mut self, sink: Box<dyn DownloadSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// 构建会话并完成首次渲染。
    pub fn build(self) -> Result<Session<R>, AppError> {
        let loader = LogoLoader::new(self.settings.logo.clone())?;
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(BlobRegistry::new()));
        let sink = match self.sink {
            Some(sink) => sink,
            None => Box::new(FsDownloadSink::new(self.settings.resolve_download_dir())),
        };
        let clipboard = self
            .clipboard
            .map(|backend| ClipboardExporter::new(backend, self.settings.clipboard.clone()));

        let mut renderer = self.renderer;
        let surface_id = renderer.render(&self.config, None)?;

        log::info!(
            "🚀 会话已创建 - 剪贴板: {}，重置: {}",
            if clipboard.is_some() { "启用" } else { "未启用" },
            if self.enable_reset { "启用" } else { "未启用" }
        );

        Ok(Session {
            logos: LogoAssetManager::new(Arc::clone(&registry)),
            config: self.config,
            registry,
            loader,
            renderer,
            export: ExportPipeline::new(sink),
            clipboard,
            reset: self.enable_reset.then(ResetController::new),
            logo: None,
            surface_id,
            max_logo_bytes: self.settings.logo.max_bytes,
            closed: false,
        })
    }
}

/// 一次编辑会话。
pub struct Session<R: RenderTarget = QrRenderer> {
    config: QrConfig,
    logos: LogoAssetManager,
    registry: Arc<dyn ResourceRegistry>,
    loader: LogoLoader,
    renderer: R,
    export: ExportPipeline,
    clipboard: Option<ClipboardExporter>,
    reset: Option<ResetController>,
    logo: Option<ResolvedLogo>,
    surface_id: SurfaceId,
    max_logo_bytes: u64,
    closed: bool,
}

impl Session<QrRenderer> {
    pub fn builder(settings: AppSettings) -> SessionBuilder<QrRenderer> {
        SessionBuilder::new(settings)
    }
}

impl<R: RenderTarget> Session<R> {
    pub fn config(&self) -> &QrConfig {
        &self.config
    }

    /// 当前画布句柄。
    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// 修改配置并重新渲染。
    pub fn update<F>(&mut self, mutate: F) -> Result<SurfaceId, AppError>
    where
        F: FnOnce(&mut QrConfig),
    {
        self.ensure_open()?;
        mutate(&mut self.config);
        self.rerender()
    }

    /// 以表单文本修改单个字段，例如 `apply_input("size", "300")`。
    pub fn apply_input(&mut self, field: &str, text: &str) -> Result<SurfaceId, AppError> {
        self.ensure_open()?;
        let field: ConfigField = field.parse()?;
        self.config.apply_input(field, text)?;
        self.rerender()
    }

    /// 以用户选择的文件作为 Logo，返回新建的本地句柄。
    pub fn acquire_logo_file(&mut self, file: LogoFile) -> Result<String, AppError> {
        self.ensure_open()?;
        let handle = self.logos.acquire_from_file(&mut self.config, file);
        self.rerender()?;
        Ok(handle)
    }

    /// 读取本地路径并作为 Logo。
    pub fn acquire_logo_path(&mut self, path: &Path) -> Result<String, AppError> {
        self.ensure_open()?;
        let file = LogoFile::read(path, self.max_logo_bytes)?;
        self.acquire_logo_file(file)
    }

    /// 以 URL 作为 Logo；远程地址在这里异步下载。
    pub async fn set_logo_url(&mut self, url: &str) -> Result<SurfaceId, AppError> {
        self.ensure_open()?;
        self.logos.set_from_url(&mut self.config, url);

        let reference = self.config.logo().reference().to_string();
        let logo = match self.loader.load(&reference, self.registry.as_ref()).await {
            Ok(logo) => logo,
            Err(err) => {
                log::warn!("⚠️ Logo 加载失败，将不带 Logo 渲染: {}", err);
                None
            }
        };
        self.logo = Some(ResolvedLogo { reference, logo });
        self.rerender()
    }

    pub fn clear_logo(&mut self) -> Result<SurfaceId, AppError> {
        self.ensure_open()?;
        self.logos.clear(&mut self.config);
        self.rerender()
    }

    /// 当前 Logo 是否已成功解析。
    pub fn has_resolved_logo(&self) -> bool {
        self.logo.as_ref().is_some_and(|resolved| resolved.logo.is_some())
    }

    /// 当前本地 Logo 句柄。
    pub fn logo_handle(&self) -> Option<&str> {
        self.logos.owned_handle()
    }

    /// 导出当前画布为 PNG 文件。
    pub fn download(&self, filename: Option<&str>) -> Result<PathBuf, AppError> {
        self.ensure_open()?;
        self.export
            .download_as_file(&self.renderer, self.surface_id, filename)
    }

    /// 复制当前画布到剪贴板。
    pub async fn copy_to_clipboard(&self) -> Result<CopyStatus, AppError> {
        self.ensure_open()?;
        let clipboard = self
            .clipboard
            .as_ref()
            .ok_or(AppError::CapabilityUnavailable("clipboard"))?;
        clipboard.copy(&self.renderer, self.surface_id).await
    }

    /// 剪贴板导出器（共享同一状态机）。
    pub fn clipboard(&self) -> Option<ClipboardExporter> {
        self.clipboard.clone()
    }

    pub fn copy_status(&self) -> Option<CopyStatus> {
        self.clipboard.as_ref().map(ClipboardExporter::status)
    }

    /// 恢复默认配置并重新渲染。
    pub fn reset(&mut self) -> Result<SurfaceId, AppError> {
        self.ensure_open()?;
        let controller = self.reset.ok_or(AppError::CapabilityUnavailable("reset"))?;
        controller.reset(&mut self.config, &mut self.logos, self.clipboard.as_ref());
        self.logo = None;
        self.rerender()
    }

    /// 销毁会话。可重复调用。
    pub fn teardown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.logos.release_all();
        if let Some(clipboard) = &self.clipboard {
            clipboard.teardown();
        }
        self.logo = None;
        log::info!("🧹 会话已销毁");
    }

    fn ensure_open(&self) -> Result<(), AppError> {
        if self.closed {
            Err(AppError::SessionClosed)
        } else {
            Ok(())
        }
    }

    /// 引用变化时同步解析 Logo；远程引用没有缓存时不带 Logo 渲染。
    fn refresh_logo(&mut self) {
        let reference = self.config.logo().reference();
        if self
            .logo
            .as_ref()
            .is_some_and(|resolved| resolved.reference == reference)
        {
            return;
        }

        let logo = match self.loader.load_local(reference, self.registry.as_ref()) {
            Ok(logo) => logo,
            Err(err) => {
                log::warn!("⚠️ Logo 加载失败，将不带 Logo 渲染: {}", err);
                None
            }
        };
        self.logo = Some(ResolvedLogo {
            reference: reference.to_string(),
            logo,
        });
    }

    fn rerender(&mut self) -> Result<SurfaceId, AppError> {
        self.refresh_logo();
        let logo = self.logo.as_ref().and_then(|resolved| resolved.logo.as_ref());
        match self.renderer.render(&self.config, logo) {
            Ok(id) => {
                self.surface_id = id;
                Ok(id)
            }
            Err(err) => {
                log::warn!("❌ 重新渲染失败: {}", err);
                Err(err)
            }
        }
    }
}

impl<R: RenderTarget> Drop for Session<R> {
    fn drop(&mut self) {
        self.teardown();
    }
}
