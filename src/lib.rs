//! # 二维码工作室 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 调用方 (CLI / 嵌入的 UI)                  │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↕ Result<T, AppError>
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕                session                           │
//! │  ┌─ config ────── QrConfig + 字段文本输入                │
//! │  │                                                       │
//! │  ├─ logo ──────── 句柄生命周期 · 注册表 · 像素加载       │
//! │  │                                                       │
//! │  ├─ render ────── RenderTarget → SurfaceId → Surface     │
//! │  │                                                       │
//! │  ├─ export ────── 画布 → data URI → 下载目录             │
//! │  ├─ clipboard ─── idle/copying/copied/error 状态机       │
//! │  └─ reset ─────── 恢复默认值（可选能力）                 │
//! │                                                          │
//! │  error · settings · data_uri （横切）                    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError` |
//! | [`settings`] | 运行参数（下载目录、剪贴板回落时间、Logo 限制） |
//! | [`config`] | 二维码配置状态、默认值、宽高同步不变式、文本输入适配 |
//! | [`logo`] | Logo 本地句柄的创建/释放、引用解析与下载 |
//! | [`render`] | 渲染目标 trait、画布句柄、默认二维码渲染器 |
//! | [`export`] | 导出为 `qrcode.png` |
//! | [`clipboard`] | 复制到剪贴板的异步状态机与系统剪贴板后端 |
//! | [`reset`] | 重置控制器 |
//! | [`session`] | 持有以上组件的会话，负责重渲染与销毁 |
//! | [`data_uri`] | data URI 编解码 |

pub mod error;
pub mod clipboard;
pub mod config;
pub mod data_uri;
pub mod export;
pub mod logo;
pub mod render;
pub mod reset;
pub mod session;
pub mod settings;

pub use error::AppError;
pub use session::{Session, SessionBuilder};
