//! 重置控制器
//!
//! 把会话恢复到默认状态：Logo 经由 `LogoAssetManager::clear` 清空（释放本地句柄），
//! 其余字段回到默认表，复制状态回到 `idle` 并取消挂起的定时器。

use crate::clipboard::ClipboardExporter;
use crate::config::QrConfig;
use crate::logo::LogoAssetManager;

#[derive(Debug, Default, Clone, Copy)]
pub struct ResetController;

impl ResetController {
    pub fn new() -> Self {
        Self
    }

    pub fn reset(
        &self,
        config: &mut QrConfig,
        logos: &mut LogoAssetManager,
        clipboard: Option<&ClipboardExporter>,
    ) {
        logos.clear(config);
        *config = QrConfig::default();
        if let Some(clipboard) = clipboard {
            clipboard.reset_status();
        }
        log::info!("🔄 配置已重置为默认值");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::{EcLevel, ModuleStyle, PaddingStyle};
    use crate::logo::tests::png_logo;
    use crate::logo::{BlobRegistry, ResourceRegistry};

    #[test]
    fn reset_restores_defaults_and_releases_handle() {
        let registry = Arc::new(BlobRegistry::new());
        let mut logos = LogoAssetManager::new(registry.clone());
        let mut config = QrConfig::default();

        config.set_content("hello");
        config.set_size(900);
        config.set_ec_level(EcLevel::H);
        config.set_logo_padding_style(PaddingStyle::Circle);
        config.set_module_style(ModuleStyle::Dots);
        config.set_eye_color("#ff0000");
        config.set_sync_logo_dimensions(true);
        logos.acquire_from_file(&mut config, png_logo("a.png"));
        assert_eq!(registry.live_count(), 1);

        ResetController::new().reset(&mut config, &mut logos, None);

        assert_eq!(config, QrConfig::default());
        assert_eq!(registry.live_count(), 0);
        assert!(logos.owned_handle().is_none());
    }
}
