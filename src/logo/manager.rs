//! # Logo 资源生命周期
//!
//! ## 设计思路
//!
//! `LogoAssetManager` 是唯一能修改 `logo.reference` 的入口，并独占
//! 至多一个由自己创建的本地资源句柄：
//! - 换成新文件 / 改用 URL / 清空：先释放旧句柄，再写入新引用；
//! - 销毁（`release_all` 或 `Drop`）：释放残留句柄，不依赖后续操作。
//!
//! 不是本管理器创建的引用（普通 URL，或外部传入的句柄字符串）永远不会被它释放。

use std::sync::Arc;

use super::{LogoFile, ResourceRegistry};
use crate::config::QrConfig;

pub struct LogoAssetManager {
    registry: Arc<dyn ResourceRegistry>,
    owned: Option<String>,
}

impl LogoAssetManager {
    pub fn new(registry: Arc<dyn ResourceRegistry>) -> Self {
        Self {
            registry,
            owned: None,
        }
    }

    /// 当前由本管理器持有的本地句柄。
    pub fn owned_handle(&self) -> Option<&str> {
        self.owned.as_deref()
    }

    /// 以本地文件作为 Logo，返回新句柄。
    pub fn acquire_from_file(&mut self, config: &mut QrConfig, file: LogoFile) -> String {
        self.release_owned();

        let reference = self.registry.create(file);
        self.owned = Some(reference.clone());
        config.set_logo_reference(reference.clone());

        log::info!("🖼️ Logo 已切换为本地文件 - {}", reference);
        reference
    }

    /// 以 URL（或任意外部引用）作为 Logo。
    pub fn set_from_url(&mut self, config: &mut QrConfig, url: impl Into<String>) {
        self.release_owned();
        let url = url.into();
        log::info!("🌐 Logo 已切换为外部引用 - {}", url);
        config.set_logo_reference(url);
    }

    /// 清空 Logo。
    pub fn clear(&mut self, config: &mut QrConfig) {
        self.release_owned();
        config.set_logo_reference(String::new());
        log::debug!("🧽 Logo 已清空");
    }

    /// 销毁钩子：释放残留句柄，无句柄时为空操作。
    pub fn release_all(&mut self) {
        self.release_owned();
    }

    fn release_owned(&mut self) {
        if let Some(handle) = self.owned.take() {
            self.registry.release(&handle);
        }
    }
}

impl Drop for LogoAssetManager {
    fn drop(&mut self) {
        self.release_owned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logo::BlobRegistry;
    use crate::logo::tests::png_logo;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRegistry {
        inner: BlobRegistry,
        events: Mutex<Vec<String>>,
    }

    impl ResourceRegistry for RecordingRegistry {
        fn create(&self, file: LogoFile) -> String {
            let handle = self.inner.create(file);
            self.events.lock().unwrap().push(format!("create {}", handle));
            handle
        }

        fn release(&self, reference: &str) -> bool {
            self.events.lock().unwrap().push(format!("release {}", reference));
            self.inner.release(reference)
        }

        fn resolve(&self, reference: &str) -> Option<LogoFile> {
            self.inner.resolve(reference)
        }

        fn live_count(&self) -> usize {
            self.inner.live_count()
        }
    }

    #[test]
    fn second_acquire_releases_first_before_creating() {
        let registry = Arc::new(RecordingRegistry::default());
        let mut manager = LogoAssetManager::new(registry.clone());
        let mut config = QrConfig::default();

        let first = manager.acquire_from_file(&mut config, png_logo("one.png"));
        let second = manager.acquire_from_file(&mut config, png_logo("two.png"));

        let events = registry.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                format!("create {}", first),
                format!("release {}", first),
                format!("create {}", second),
            ]
        );
        assert_eq!(config.logo().reference(), second);
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn url_and_clear_release_local_handle() {
        let registry = Arc::new(BlobRegistry::new());
        let mut manager = LogoAssetManager::new(registry.clone());
        let mut config = QrConfig::default();

        manager.acquire_from_file(&mut config, png_logo("one.png"));
        manager.set_from_url(&mut config, "https://example.com/logo.png");
        assert_eq!(registry.live_count(), 0);
        assert_eq!(config.logo().reference(), "https://example.com/logo.png");

        manager.acquire_from_file(&mut config, png_logo("two.png"));
        manager.clear(&mut config);
        assert_eq!(registry.live_count(), 0);
        assert_eq!(config.logo().reference(), "");
        assert!(manager.owned_handle().is_none());
    }

    #[test]
    fn foreign_handle_is_never_released() {
        let registry = Arc::new(BlobRegistry::new());
        let foreign = registry.create(png_logo("foreign.png"));
        let mut manager = LogoAssetManager::new(registry.clone());
        let mut config = QrConfig::default();

        manager.set_from_url(&mut config, foreign.clone());
        manager.clear(&mut config);
        manager.release_all();

        assert!(registry.resolve(&foreign).is_some());
    }

    #[test]
    fn release_all_is_idempotent_and_drop_releases() {
        let registry = Arc::new(BlobRegistry::new());
        let mut config = QrConfig::default();
        {
            let mut manager = LogoAssetManager::new(registry.clone());
            manager.release_all();
            manager.acquire_from_file(&mut config, png_logo("one.png"));
            assert_eq!(registry.live_count(), 1);
        }
        assert_eq!(registry.live_count(), 0);
    }
}
