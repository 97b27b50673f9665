//! # 配置模块（config）
//!
//! - `state`：`QrConfig` 及其子结构、默认值与 setter
//! - `field`：字段名解析与表单文本输入适配

mod field;
mod state;

pub use field::ConfigField;
pub use state::{
    BehaviorOptions, EcLevel, LogoOptions, ModuleStyle, PaddingStyle, QrConfig, StyleOptions,
    DEFAULT_BACKGROUND, DEFAULT_CONTENT, DEFAULT_FOREGROUND, DEFAULT_LOGO_EDGE,
    DEFAULT_QUIET_ZONE, DEFAULT_SIZE,
};
