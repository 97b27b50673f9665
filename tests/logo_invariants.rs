mod common;

use std::sync::Arc;

use proptest::prelude::*;

use common::{RecordingRegistry, logo_file};
use qr_studio::config::QrConfig;
use qr_studio::logo::{LogoAssetManager, ResourceRegistry};

#[derive(Debug, Clone)]
enum SizeOp {
    Width(f64),
    Height(f64),
    Sync(bool),
}

fn size_op() -> impl Strategy<Value = SizeOp> {
    prop_oneof![
        (-500.0..2_000.0f64).prop_map(SizeOp::Width),
        (-500.0..2_000.0f64).prop_map(SizeOp::Height),
        any::<bool>().prop_map(SizeOp::Sync),
    ]
}

#[derive(Debug, Clone)]
enum LogoOp {
    Acquire,
    Url(String),
    Clear,
}

fn logo_op() -> impl Strategy<Value = LogoOp> {
    prop_oneof![
        Just(LogoOp::Acquire),
        "https://[a-z]{1,8}\\.example/[a-z]{1,8}\\.png".prop_map(LogoOp::Url),
        Just(LogoOp::Clear),
    ]
}

proptest! {
    #[test]
    fn synced_logo_dimensions_stay_equal(ops in prop::collection::vec(size_op(), 1..40)) {
        let mut config = QrConfig::default();
        for op in ops {
            match op {
                SizeOp::Width(w) => config.set_logo_width(w),
                SizeOp::Height(h) => config.set_logo_height(h),
                SizeOp::Sync(on) => config.set_sync_logo_dimensions(on),
            }
            if config.behavior().sync_logo_dimensions() {
                prop_assert_eq!(config.logo().width(), config.logo().height());
            }
        }
    }

    #[test]
    fn at_most_one_local_handle_is_live(ops in prop::collection::vec(logo_op(), 1..30)) {
        let registry = Arc::new(RecordingRegistry::default());
        let mut config = QrConfig::default();
        let mut manager = LogoAssetManager::new(registry.clone());

        for op in ops {
            match op {
                LogoOp::Acquire => {
                    let handle = manager.acquire_from_file(&mut config, logo_file("logo.png"));
                    prop_assert_eq!(config.logo().reference(), handle.as_str());
                }
                LogoOp::Url(url) => {
                    manager.set_from_url(&mut config, url.clone());
                    prop_assert_eq!(config.logo().reference(), url.as_str());
                }
                LogoOp::Clear => {
                    manager.clear(&mut config);
                    prop_assert_eq!(config.logo().reference(), "");
                }
            }
            prop_assert!(registry.live_count() <= 1);
            prop_assert_eq!(registry.live_count(), usize::from(manager.owned_handle().is_some()));
        }

        manager.release_all();
        manager.release_all();
        prop_assert_eq!(registry.live_count(), 0);

        // 每个句柄恰好创建一次、释放一次；URL 从不进入注册表
        let events = registry.events();
        let created: Vec<_> = events.iter().filter_map(|e| e.strip_prefix("create ")).collect();
        let released: Vec<_> = events.iter().filter_map(|e| e.strip_prefix("release ")).collect();
        prop_assert_eq!(created.len(), released.len());
        for handle in &created {
            prop_assert_eq!(released.iter().filter(|r| *r == handle).count(), 1);
        }
    }
}
