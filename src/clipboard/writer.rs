//! # 剪贴板写入模块
//!
//! ## 设计思路
//!
//! 与操作系统剪贴板的交互独立在 `ClipboardBackend` 之后，状态机只关心“成功 / 被拒绝”。
//! 写入是阻塞调用，由状态机放进 `spawn_blocking` 执行。
//!
//! ## 实现思路
//!
//! `ArboardClipboard`：
//! 1. 在打开剪贴板之前把 PNG 解码为 RGBA，持有剪贴板的窗口只剩一次 `set_image`；
//! 2. 失败按类型分为 busy / transient / fatal，fatal（平台不支持）立即放弃；
//! 3. 其余失败做有限次重试：指数退避 + 抖动，且总等待不超过时间预算。
//!
//! 重试耗尽后统一映射为 `ClipboardDenied`，由状态机吸收为 `error`。
//!
//! Linux 上剪贴板内容由写入进程持有，进程退出即丢失。配置了 `hold_ownership_ms`
//! 时写入改用 `SetExtLinux::wait_until`，直到剪贴板管理器接手或到达截止时间。

use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::error::AppError;
use crate::settings::ClipboardSettings;

/// 系统剪贴板能力：写入一张 PNG 图片。
pub trait ClipboardBackend: Send + Sync + 'static {
    fn write_png(&self, png: &[u8]) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    Busy,
    Transient,
    Fatal,
}

#[derive(Debug)]
struct WriteFailure {
    kind: FailureKind,
    message: String,
}

impl WriteFailure {
    fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    fn is_retryable(&self) -> bool {
        self.kind != FailureKind::Fatal
    }
}

impl From<arboard::Error> for WriteFailure {
    fn from(err: arboard::Error) -> Self {
        match err {
            arboard::Error::ClipboardNotSupported => {
                Self::new(FailureKind::Fatal, format!("当前平台不支持图片剪贴板：{}", err))
            }
            arboard::Error::ClipboardOccupied => {
                Self::new(FailureKind::Busy, format!("剪贴板被占用：{}", err))
            }
            other => Self::new(FailureKind::Transient, format!("写入失败：{}", other)),
        }
    }
}

static JITTER_COUNTER: AtomicU64 = AtomicU64::new(0);

/// splitmix64：以时间与调用计数为种子的轻量抖动源。
fn next_jitter() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let mut z = nanos
        .wrapping_add(JITTER_COUNTER.fetch_add(1, Ordering::Relaxed))
        .wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// 第 `attempt` 次重试前的等待：`base * 2^(attempt-1)` 封顶后，再加至多三分之一的抖动。
fn backoff_with_jitter(base_delay_ms: u64, attempt: u32, max_delay_ms: u64) -> u64 {
    let exponent = attempt.saturating_sub(1).min(16);
    let capped = base_delay_ms
        .saturating_mul(1_u64 << exponent)
        .min(max_delay_ms.max(base_delay_ms));
    let jitter_bound = (capped / 3).max(1);
    capped.saturating_add(next_jitter() % (jitter_bound + 1))
}

fn exceeds_budget(elapsed_ms: u64, wait_ms: u64, budget_ms: u64) -> bool {
    elapsed_ms.saturating_add(wait_ms) > budget_ms
}

/// 基于 `arboard` 的系统剪贴板。
pub struct ArboardClipboard {
    retries: u32,
    retry_delay_ms: u64,
    retry_max_delay_ms: u64,
    retry_budget_ms: u64,
    hold_ownership_ms: u64,
}

#[cfg(target_os = "linux")]
fn set_image(
    clipboard: &mut arboard::Clipboard,
    image: arboard::ImageData<'_>,
    hold_until: Option<Instant>,
) -> Result<(), arboard::Error> {
    use arboard::SetExtLinux;

    match hold_until {
        Some(deadline) => clipboard.set().wait_until(deadline).image(image),
        None => clipboard.set_image(image),
    }
}

#[cfg(not(target_os = "linux"))]
fn set_image(
    clipboard: &mut arboard::Clipboard,
    image: arboard::ImageData<'_>,
    _hold_until: Option<Instant>,
) -> Result<(), arboard::Error> {
    clipboard.set_image(image)
}

impl ArboardClipboard {
    pub fn new(settings: &ClipboardSettings) -> Self {
        Self {
            retries: settings.retries,
            retry_delay_ms: settings.retry_delay_ms,
            retry_max_delay_ms: settings.retry_max_delay_ms,
            retry_budget_ms: settings.retry_budget_ms,
            hold_ownership_ms: settings.hold_ownership_ms,
        }
    }

    fn ownership_deadline(&self) -> Option<Instant> {
        (self.hold_ownership_ms > 0)
            .then(|| Instant::now() + Duration::from_millis(self.hold_ownership_ms))
    }

    fn try_write(&self, width: usize, height: usize, rgba: &[u8]) -> Result<(), WriteFailure> {
        let mut clipboard = arboard::Clipboard::new().map_err(|e| {
            WriteFailure::new(FailureKind::Busy, format!("无法打开剪贴板：{}", e))
        })?;
        let image = arboard::ImageData {
            width,
            height,
            bytes: Cow::Borrowed(rgba),
        };
        set_image(&mut clipboard, image, self.ownership_deadline()).map_err(WriteFailure::from)
    }
}

impl ClipboardBackend for ArboardClipboard {
    fn write_png(&self, png: &[u8]) -> Result<(), AppError> {
        // ── 预解码（不持有剪贴板）──────────────────
        let rgba = image::load_from_memory(png)
            .map_err(|e| AppError::Encode(format!("PNG 解码失败：{}", e)))?
            .to_rgba8();
        let (width, height) = (rgba.width() as usize, rgba.height() as usize);
        let bytes = rgba.into_raw();
        log::debug!("📋 写入剪贴板 - {}x{}", width, height);

        // ── 写入 + 重试 ─────────────────────────────
        let attempts = self.retries.max(1);
        let started = Instant::now();
        let mut last_message = String::from("未尝试写入");

        for attempt in 1..=attempts {
            if attempt > 1 {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                let wait_ms =
                    backoff_with_jitter(self.retry_delay_ms.max(1), attempt - 1, self.retry_max_delay_ms);
                if exceeds_budget(elapsed_ms, wait_ms, self.retry_budget_ms) {
                    log::warn!(
                        "⏱️ 放弃第 {} 次尝试：已用 {}ms，再等 {}ms 将超出预算 {}ms",
                        attempt,
                        elapsed_ms,
                        wait_ms,
                        self.retry_budget_ms
                    );
                    break;
                }
                log::debug!("🔄 第 {}/{} 次尝试，先等待 {}ms", attempt, attempts, wait_ms);
                std::thread::sleep(Duration::from_millis(wait_ms));
            }

            match self.try_write(width, height, &bytes) {
                Ok(()) => {
                    log::debug!("✅ 剪贴板写入成功（第 {} 次尝试）", attempt);
                    return Ok(());
                }
                Err(failure) => {
                    log::warn!(
                        "❌ 第 {} 次写入失败：{}（kind={:?}）",
                        attempt,
                        failure.message,
                        failure.kind
                    );
                    let retryable = failure.is_retryable();
                    last_message = failure.message;
                    if !retryable {
                        break;
                    }
                }
            }
        }

        Err(AppError::ClipboardDenied(last_message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps_with_bounded_jitter() {
        for _ in 0..64 {
            let first = backoff_with_jitter(100, 1, 900);
            assert!((100..=133).contains(&first), "{}", first);

            let third = backoff_with_jitter(100, 3, 900);
            assert!((400..=533).contains(&third), "{}", third);

            let capped = backoff_with_jitter(100, 40, 900);
            assert!((900..=1_200).contains(&capped), "{}", capped);
        }
    }

    #[test]
    fn backoff_never_drops_below_base() {
        assert!(backoff_with_jitter(300, 1, 100) >= 300);
    }

    #[test]
    fn retry_budget_is_inclusive() {
        assert!(!exceeds_budget(1_000, 500, 1_500));
        assert!(exceeds_budget(1_001, 500, 1_500));
        assert!(exceeds_budget(u64::MAX, 1, 1_500));
    }

    #[test]
    fn only_unsupported_platform_is_fatal() {
        assert!(!WriteFailure::from(arboard::Error::ClipboardNotSupported).is_retryable());
        assert!(WriteFailure::from(arboard::Error::ClipboardOccupied).is_retryable());
        assert!(WriteFailure::from(arboard::Error::ContentNotAvailable).is_retryable());
    }

    #[test]
    fn ownership_is_held_only_when_configured() {
        let clipboard = ArboardClipboard::new(&ClipboardSettings::default());
        assert!(clipboard.ownership_deadline().is_none());

        let settings = ClipboardSettings {
            hold_ownership_ms: 3_000,
            ..ClipboardSettings::default()
        };
        let before = Instant::now();
        let deadline = ArboardClipboard::new(&settings)
            .ownership_deadline()
            .expect("hold configured");
        assert!(deadline >= before + Duration::from_millis(3_000));
        assert!(deadline <= Instant::now() + Duration::from_millis(3_000));
    }

    #[test]
    fn invalid_png_is_an_encode_error_before_touching_clipboard() {
        let clipboard = ArboardClipboard::new(&ClipboardSettings::default());
        let result = clipboard.write_png(b"not a png");
        assert!(matches!(result, Err(AppError::Encode(_))));
    }

    #[test]
    #[ignore = "requires system clipboard access"]
    fn writes_png_to_system_clipboard() {
        let img = image::RgbaImage::from_pixel(16, 16, image::Rgba([0, 0, 0, 255]));
        let mut cursor = std::io::Cursor::new(Vec::new());
        img.write_to(&mut cursor, image::ImageFormat::Png).unwrap();

        let clipboard = ArboardClipboard::new(&ClipboardSettings::default());
        clipboard
            .write_png(&cursor.into_inner())
            .expect("clipboard write should succeed");
    }
}
