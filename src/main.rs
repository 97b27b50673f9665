//! # 二维码工作室 — 命令行入口
//!
//! 本文件只负责参数解析、日志初始化与会话驱动。
//! 字段修改统一走 `Session::apply_input`（与表单文本输入同一条路径），
//! 结束时以 JSON 报告输出最终配置与导出结果。

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;

use qr_studio::clipboard::CopyStatus;
use qr_studio::config::{ConfigField, QrConfig};
use qr_studio::logo::LogoReference;
use qr_studio::render::SurfaceId;
use qr_studio::settings::AppSettings;
use qr_studio::{AppError, Session};

/// 生成带样式与 Logo 的二维码，导出为 PNG 文件或复制到剪贴板
#[derive(Parser, Debug)]
#[command(name = "qr-studio")]
#[command(version, about, long_about = None)]
struct Args {
    /// 二维码内容
    #[arg(long)]
    content: Option<String>,

    /// 符号边长（像素）
    #[arg(long)]
    size: Option<String>,

    /// 静区宽度（像素）
    #[arg(long)]
    quiet_zone: Option<String>,

    /// 背景色
    #[arg(long)]
    bg_color: Option<String>,

    /// 前景色
    #[arg(long)]
    fg_color: Option<String>,

    /// 纠错等级（L / M / Q / H）
    #[arg(long)]
    ec_level: Option<String>,

    /// Logo 宽度
    #[arg(long)]
    logo_width: Option<String>,

    /// Logo 高度
    #[arg(long)]
    logo_height: Option<String>,

    /// Logo 不透明度（0 ~ 1）
    #[arg(long)]
    logo_opacity: Option<String>,

    /// Logo 内边距
    #[arg(long)]
    logo_padding: Option<String>,

    /// Logo 内边距形状（square / circle）
    #[arg(long)]
    logo_padding_style: Option<String>,

    /// Logo 内边距圆角
    #[arg(long)]
    logo_padding_radius: Option<String>,

    /// 清除 Logo 下方的模块
    #[arg(long)]
    remove_behind_logo: Option<String>,

    /// 模块样式（squares / dots / fluid）
    #[arg(long)]
    module_style: Option<String>,

    /// 定位点圆角
    #[arg(long)]
    eye_radius: Option<String>,

    /// 定位点颜色（留空沿用前景色）
    #[arg(long)]
    eye_color: Option<String>,

    /// Logo 宽高同步
    #[arg(long)]
    sync_logo_size: Option<String>,

    /// 允许跨域加载远程 Logo（否则画布被污染，无法导出）
    #[arg(long)]
    cross_origin: Option<String>,

    /// 以 `字段=值` 形式设置任意字段，可重复
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    assignments: Vec<String>,

    /// Logo：本地路径、http(s) URL 或 data URI
    #[arg(long)]
    logo: Option<String>,

    /// 导出目录（覆盖设置文件）
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// 导出文件名
    #[arg(long, default_value = "qrcode.png")]
    filename: String,

    /// 不保存文件
    #[arg(long)]
    no_save: bool,

    /// 复制到系统剪贴板
    #[arg(long)]
    copy: bool,

    /// 复制后保持剪贴板所有权的上限（毫秒，仅 Linux），进程退出前等待剪贴板管理器接手
    #[arg(long, value_name = "MS", default_value_t = 3_000)]
    clipboard_hold_ms: u64,

    /// 设置文件路径
    #[arg(long)]
    settings: Option<PathBuf>,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// 命令行上显式给出的字段，按字段表顺序。
    fn field_inputs(&self) -> Vec<(ConfigField, &str)> {
        ConfigField::ALL
            .iter()
            .filter_map(|&field| {
                let value = match field {
                    ConfigField::Content => &self.content,
                    ConfigField::Size => &self.size,
                    ConfigField::QuietZone => &self.quiet_zone,
                    ConfigField::BackgroundColor => &self.bg_color,
                    ConfigField::ForegroundColor => &self.fg_color,
                    ConfigField::EcLevel => &self.ec_level,
                    ConfigField::LogoWidth => &self.logo_width,
                    ConfigField::LogoHeight => &self.logo_height,
                    ConfigField::LogoOpacity => &self.logo_opacity,
                    ConfigField::LogoPadding => &self.logo_padding,
                    ConfigField::LogoPaddingStyle => &self.logo_padding_style,
                    ConfigField::LogoPaddingRadius => &self.logo_padding_radius,
                    ConfigField::RemoveSymbolBehindLogo => &self.remove_behind_logo,
                    ConfigField::ModuleStyle => &self.module_style,
                    ConfigField::EyeRadius => &self.eye_radius,
                    ConfigField::EyeColor => &self.eye_color,
                    ConfigField::SyncLogoDimensions => &self.sync_logo_size,
                    ConfigField::EnableCrossOriginLoad => &self.cross_origin,
                };
                value.as_deref().map(|text| (field, text))
            })
            .collect()
    }
}

#[derive(Serialize)]
struct Report<'a> {
    surface: SurfaceId,
    config: &'a QrConfig,
    logo_handle: Option<&'a str>,
    logo_resolved: bool,
    saved_to: Option<PathBuf>,
    copy_status: Option<CopyStatus>,
}

#[derive(Serialize)]
struct FailureReport {
    error: AppError,
}

fn split_assignment(raw: &str) -> Result<(&str, &str), AppError> {
    raw.split_once('=')
        .ok_or_else(|| AppError::UnknownField(format!("缺少 '='：{}", raw)))
}

async fn run(args: Args) -> Result<(), AppError> {
    let mut settings = AppSettings::load(args.settings.as_deref())?;
    if let Some(dir) = &args.out_dir {
        settings.download_dir = Some(dir.display().to_string());
    }

    if args.copy {
        // 进程写完即退出，X11 / Wayland 上内容随所有者一起消失
        settings.clipboard.hold_ownership_ms = args.clipboard_hold_ms;
    }

    let mut builder = Session::builder(settings);
    if args.copy {
        builder = builder.system_clipboard();
    }
    let mut session = builder.build()?;

    // ── 字段 ───────────────────────────────────────
    for (field, text) in args.field_inputs() {
        session.apply_input(field.name(), text)?;
    }
    for raw in &args.assignments {
        let (field, text) = split_assignment(raw)?;
        session.apply_input(field, text)?;
    }

    // ── Logo ───────────────────────────────────────
    if let Some(logo) = args.logo.as_deref() {
        match LogoReference::classify(logo) {
            LogoReference::FilePath(path) => {
                session.acquire_logo_path(Path::new(path))?;
            }
            _ => {
                session.set_logo_url(logo).await?;
            }
        }
    }

    // ── 导出 ───────────────────────────────────────
    let saved_to = if args.no_save {
        None
    } else {
        Some(session.download(Some(&args.filename))?)
    };

    let copy_status = if args.copy {
        Some(session.copy_to_clipboard().await?)
    } else {
        None
    };

    let report = Report {
        surface: session.surface_id(),
        config: session.config(),
        logo_handle: session.logo_handle(),
        logo_resolved: session.has_resolved_logo(),
        saved_to,
        copy_status,
    };
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| AppError::Settings(format!("序列化报告失败: {}", e)))?;
    println!("{}", json);

    session.teardown();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!("❌ 执行失败: {}", error);
            if let Ok(json) = serde_json::to_string_pretty(&FailureReport { error }) {
                println!("{}", json);
            }
            ExitCode::FAILURE
        }
    }
}
