//! 应用设置模块
//!
//! # 设计思路
//!
//! 运行参数（下载目录、剪贴板状态回落时间、重试策略、Logo 加载限制）
//! 集中在 `AppSettings`，从 JSON 文件读取；文件不存在时使用默认值。
//! 会话配置本身不落盘，这里只承载“工具怎么运行”的参数。
//!
//! # 实现思路
//!
//! - 默认路径：`dirs::config_dir()/qr-studio/settings.json`。
//! - 所有字段都有 `serde(default)`，允许只写部分字段。
//! - 读取失败统一映射为 `AppError::Settings`。

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

const APP_DIR_NAME: &str = "qr-studio";
const SETTINGS_FILE_NAME: &str = "settings.json";

/// 剪贴板相关设置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipboardSettings {
    /// 复制成功后保持 `copied` 的时长（毫秒）。
    pub copied_revert_ms: u64,
    /// 复制失败后保持 `error` 的时长（毫秒）。
    pub error_revert_ms: u64,
    /// 写入失败时的最大尝试次数。
    pub retries: u32,
    /// 首次重试前的等待（毫秒），之后指数退避。
    pub retry_delay_ms: u64,
    /// 单次退避等待上限（毫秒）。
    pub retry_max_delay_ms: u64,
    /// 所有重试加起来的时间预算（毫秒）。
    pub retry_budget_ms: u64,
    /// Linux 上写入后保持剪贴板所有权的上限（毫秒），剪贴板管理器接手即提前返回。
    /// 0 表示不等待，适合常驻进程。
    pub hold_ownership_ms: u64,
}

impl Default for ClipboardSettings {
    fn default() -> Self {
        Self {
            copied_revert_ms: 2_000,
            error_revert_ms: 2_500,
            retries: 3,
            retry_delay_ms: 100,
            retry_max_delay_ms: 900,
            retry_budget_ms: 1_500,
            hold_ownership_ms: 0,
        }
    }
}

impl ClipboardSettings {
    pub fn copied_revert(&self) -> Duration {
        Duration::from_millis(self.copied_revert_ms)
    }

    pub fn error_revert(&self) -> Duration {
        Duration::from_millis(self.error_revert_ms)
    }
}

/// Logo 加载设置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogoSettings {
    /// 本地文件 / 远程下载 / data URI 允许的最大字节数。
    pub max_bytes: u64,
    /// 远程 Logo 下载超时（秒）。
    pub fetch_timeout_secs: u64,
    /// 是否允许加载 http(s) Logo。
    pub allow_remote: bool,
}

impl Default for LogoSettings {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            fetch_timeout_secs: 10,
            allow_remote: true,
        }
    }
}

/// 应用设置。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// 导出目录；未设置时使用系统下载目录。
    pub download_dir: Option<String>,
    pub clipboard: ClipboardSettings,
    pub logo: LogoSettings,
}

impl AppSettings {
    /// 默认设置文件路径。
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(SETTINGS_FILE_NAME))
    }

    /// 读取设置文件。
    ///
    /// - 显式路径不存在：报错（用户指定的文件必须存在）。
    /// - 默认路径不存在：返回默认设置。
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let (settings_path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::default_path() {
                Some(p) => (p, false),
                None => {
                    log::debug!("⚙️ 无法确定配置目录，使用默认设置");
                    return Ok(Self::default());
                }
            },
        };

        if !settings_path.exists() {
            if explicit {
                return Err(AppError::Settings(format!(
                    "设置文件不存在: {}",
                    settings_path.display()
                )));
            }
            log::debug!("⚙️ 未找到设置文件 {}，使用默认设置", settings_path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&settings_path)?;
        let settings = Self::from_json(&content)?;
        log::info!("⚙️ 已加载设置文件: {}", settings_path.display());
        Ok(settings)
    }

    pub fn from_json(content: &str) -> Result<Self, AppError> {
        serde_json::from_str::<Self>(content)
            .map_err(|e| AppError::Settings(format!("解析设置文件失败: {}", e)))
    }

    /// 解析导出目录：设置 → 系统下载目录 → 当前目录。
    pub fn resolve_download_dir(&self) -> PathBuf {
        if let Some(dir) = self.download_dir.as_deref() {
            if !dir.is_empty() {
                return PathBuf::from(dir);
            }
        }
        dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
    }
}
