//! # 本地资源句柄登记表
//!
//! ## 设计思路
//!
//! 用户选择的本地图片不直接写进配置，而是先登记为一个短生命周期的
//! “本地资源句柄”（形如 `blob:qr-studio/7`），配置里只存句柄字符串。
//! 句柄必须显式释放，否则登记表里的字节会一直驻留。
//!
//! `ResourceRegistry` 是这一能力的抽象；`BlobRegistry` 是进程内实现。

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use super::LogoFile;

/// 本地资源句柄前缀。
pub const HANDLE_PREFIX: &str = "blob:qr-studio/";

/// 判断引用是否为本地资源句柄（不区分由谁创建）。
pub fn is_local_handle(reference: &str) -> bool {
    reference.starts_with(HANDLE_PREFIX)
}

/// 本地资源句柄能力。
pub trait ResourceRegistry: Send + Sync {
    /// 登记文件并返回新句柄。
    fn create(&self, file: LogoFile) -> String;
    /// 释放句柄；句柄不存在时返回 `false`。
    fn release(&self, reference: &str) -> bool;
    /// 按句柄取回文件。
    fn resolve(&self, reference: &str) -> Option<LogoFile>;
    /// 当前存活的句柄数量。
    fn live_count(&self) -> usize;
}

/// 进程内句柄登记表。
#[derive(Default)]
pub struct BlobRegistry {
    next_id: AtomicU64,
    entries: Mutex<HashMap<String, LogoFile>>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, LogoFile>> {
        // 持锁期间不会 panic，中毒时直接取回内部数据
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ResourceRegistry for BlobRegistry {
    fn create(&self, file: LogoFile) -> String {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let reference = format!("{}{}", HANDLE_PREFIX, id);
        log::debug!(
            "🔗 创建本地资源句柄 - {} ({}, {} 字节)",
            reference,
            file.name(),
            file.len()
        );
        self.entries().insert(reference.clone(), file);
        reference
    }

    fn release(&self, reference: &str) -> bool {
        let removed = self.entries().remove(reference).is_some();
        if removed {
            log::debug!("🧹 已释放本地资源句柄 - {}", reference);
        } else {
            log::warn!("⚠️ 释放了不存在的本地资源句柄 - {}", reference);
        }
        removed
    }

    fn resolve(&self, reference: &str) -> Option<LogoFile> {
        self.entries().get(reference).cloned()
    }

    fn live_count(&self) -> usize {
        self.entries().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logo::tests::png_logo;

    #[test]
    fn handles_are_unique_and_prefixed() {
        let registry = BlobRegistry::new();
        let first = registry.create(png_logo("a.png"));
        let second = registry.create(png_logo("b.png"));

        assert_ne!(first, second);
        assert!(is_local_handle(&first));
        assert_eq!(registry.live_count(), 2);
    }

    #[test]
    fn release_is_reported_once() {
        let registry = BlobRegistry::new();
        let handle = registry.create(png_logo("a.png"));

        assert!(registry.release(&handle));
        assert!(!registry.release(&handle));
        assert!(registry.resolve(&handle).is_none());
        assert_eq!(registry.live_count(), 0);
    }
}
