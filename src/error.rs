//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，配置、Logo、渲染、导出与剪贴板各阶段
//! 都返回 `Result<T, AppError>`，避免 `.map_err(|e| e.to_string())` 式的分散处理。
//!
//! 错误分两类：
//! - **上报型**：`SurfaceNotFound`、`CopyInProgress` 等，调用方需要感知；
//! - **本地恢复型**：`Encode`、`ClipboardDenied`，在剪贴板状态机内部被吸收为
//!   `error` 状态并自动回落到 `idle`。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 实现 `Serialize` 将错误序列化为字符串，CLI 输出 JSON 报告时直接复用。

use serde::Serialize;

use crate::render::SurfaceId;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 指定的像素画布不存在（尚未渲染，或渲染失败后已被移除）
    #[error("找不到渲染画布: {0}")]
    SurfaceNotFound(SurfaceId),

    /// 画布编码为图片失败（含跨域污染的画布）
    #[error("图片编码失败: {0}")]
    Encode(String),

    /// 剪贴板拒绝写入（权限不足 / 平台不支持 / 持续占用）
    #[error("剪贴板写入被拒绝: {0}")]
    ClipboardDenied(String),

    /// 数值字段收到无法解析的文本
    #[error("字段 {field} 需要数值，收到: {value:?}")]
    InvalidNumericInput { field: &'static str, value: String },

    /// 枚举 / 布尔字段收到无法识别的取值
    #[error("字段 {field} 的取值无效: {value:?}")]
    InvalidChoice { field: &'static str, value: String },

    /// 未知的配置字段名
    #[error("未知配置字段: {0}")]
    UnknownField(String),

    /// 上一次复制尚未结束
    #[error("正在复制中，请稍候")]
    CopyInProgress,

    /// 会话已销毁
    #[error("会话已关闭")]
    SessionClosed,

    /// 当前会话未启用该能力
    #[error("当前会话未启用能力: {0}")]
    CapabilityUnavailable(&'static str),

    /// 二维码矩阵生成或绘制失败
    #[error("渲染失败: {0}")]
    Render(String),

    /// Logo 读取 / 校验 / 解码失败
    #[error("Logo 加载失败: {0}")]
    Logo(String),

    /// 远程 Logo 下载失败
    #[error("网络错误: {0}")]
    Network(String),

    /// 设置文件读取 / 解析失败
    #[error("设置错误: {0}")]
    Settings(String),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// 是否属于剪贴板状态机内部可恢复的错误。
    pub fn is_locally_recoverable(&self) -> bool {
        matches!(self, Self::Encode(_) | Self::ClipboardDenied(_))
    }
}

/// 将错误序列化为人类可读的字符串，供 JSON 报告使用。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
