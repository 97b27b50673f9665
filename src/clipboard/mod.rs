//! 剪贴板导出模块
//!
//! # 设计思路
//!
//! 把“复制到剪贴板”建模成显式的异步状态机：
//!
//! ```text
//! idle → copying → { copied, error } → idle
//! ```
//!
//! - 写入线程结束之前拒绝新的复制请求（`CopyInProgress`），同一时刻最多一次写入在途；
//!   “在途”单独记录，`reset_status` 把状态拨回 `idle` 也不会放行第二次写入；
//! - `copied` / `error` 各自挂一个回落到 `idle` 的定时器，任意时刻最多一个；
//! - 任何新的状态迁移之前先取消挂起的定时器；
//! - 定时器与异步续体都携带“代号”（generation），代号过期即不再生效，
//!   旧一轮复制的定时器永远不会覆盖新一轮的状态；
//! - `copy` 的 future 被中途丢弃时，`Drop` 守卫把状态转为 `error`，照常回落；
//! - `teardown` 之后不再发生任何迁移。
//!
//! # 实现思路
//!
//! - 状态放在 `Arc<Inner>` 的 `Mutex` 里，锁从不跨 `.await` 持有。
//! - 画布编码与剪贴板写入都是阻塞操作，放进 `spawn_blocking`。
//! - 回落定时器是 `tokio::spawn` 出来的任务，截止时间在挂载时确定；
//!   任务只持有 `Weak<Inner>`，导出器被丢弃后自然失效。
//! - 状态变化通过 `tokio::sync::watch` 广播，供 UI / 测试订阅。

mod writer;

pub use writer::{ArboardClipboard, ClipboardBackend};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::AppError;
use crate::render::{SurfaceId, SurfaceLookup};
use crate::settings::ClipboardSettings;

/// 复制状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyStatus {
    #[default]
    Idle,
    Copying,
    Copied,
    Error,
}

impl CopyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Copying => "copying",
            Self::Copied => "copied",
            Self::Error => "error",
        }
    }
}

struct CopyState {
    status: CopyStatus,
    generation: u64,
    /// 写入线程仍在运行；与 `status` 分开，`reset_status` 不会清除它。
    in_flight: bool,
    revert_timer: Option<JoinHandle<()>>,
    torn_down: bool,
}

impl CopyState {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.revert_timer.take() {
            timer.abort();
            log::debug!("⏹️ 已取消挂起的状态回落定时器");
        }
    }
}

struct Inner {
    backend: Arc<dyn ClipboardBackend>,
    settings: ClipboardSettings,
    state: Mutex<CopyState>,
    status_tx: watch::Sender<CopyStatus>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, CopyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, state: &mut CopyState, status: CopyStatus) {
        if state.status != status {
            log::debug!("📋 复制状态: {} → {}", state.status.as_str(), status.as_str());
        }
        state.status = status;
        self.status_tx.send_replace(status);
    }

    fn revert_to_idle(&self, generation: u64) {
        let mut state = self.lock();
        if state.torn_down || state.generation != generation {
            return;
        }
        state.revert_timer = None;
        self.transition(&mut state, CopyStatus::Idle);
    }

    /// 落定本代复制的结果。过期的续体不改动状态，只返回自己的结果。
    fn finish(
        self: &Arc<Self>,
        generation: u64,
        status: CopyStatus,
        revert_after: Duration,
    ) -> Result<CopyStatus, AppError> {
        let mut state = self.lock();
        if state.torn_down {
            log::debug!("🚫 导出器已销毁，丢弃复制结果 {}", status.as_str());
            return Err(AppError::SessionClosed);
        }
        if state.generation != generation {
            log::debug!("🚫 复制结果已过期，不再改动状态：{}", status.as_str());
            return Ok(status);
        }

        state.cancel_timer();
        self.transition(&mut state, status);
        state.revert_timer = self.arm_revert(generation, revert_after);
        if state.revert_timer.is_none() {
            self.transition(&mut state, CopyStatus::Idle);
        }
        Ok(status)
    }

    /// `copy` 的 future 在落定前被丢弃：转为 `error` 并照常回落。
    fn abandon(self: &Arc<Self>, generation: u64) {
        let mut state = self.lock();
        if state.torn_down || state.generation != generation {
            return;
        }
        log::warn!("⚠️ 复制请求在完成前被取消，状态转为 error");
        state.cancel_timer();
        state.generation += 1;
        let generation = state.generation;
        self.transition(&mut state, CopyStatus::Error);
        state.revert_timer = self.arm_revert(generation, self.settings.error_revert());
        if state.revert_timer.is_none() {
            // 运行时已关闭，没有定时器可挂，直接回落
            self.transition(&mut state, CopyStatus::Idle);
        }
    }

    fn arm_revert(self: &Arc<Self>, generation: u64, delay: Duration) -> Option<JoinHandle<()>> {
        let handle = tokio::runtime::Handle::try_current().ok()?;
        let deadline = Instant::now() + delay;
        let inner: Weak<Inner> = Arc::downgrade(self);
        Some(handle.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(inner) = inner.upgrade() {
                inner.revert_to_idle(generation);
            }
        }))
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        state.cancel_timer();
    }
}

/// 在途写入的占位：随写入闭包一起进入阻塞线程，写入真正结束时才释放。
struct InFlightSlot {
    inner: Arc<Inner>,
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.inner.lock().in_flight = false;
    }
}

/// 一次尚未落定的复制。`copy` 的 future 被丢弃时由 `Drop` 收尾。
struct PendingCopy {
    inner: Arc<Inner>,
    generation: u64,
    settled: bool,
}

impl PendingCopy {
    fn settle(mut self, status: CopyStatus, revert_after: Duration) -> Result<CopyStatus, AppError> {
        self.settled = true;
        self.inner.finish(self.generation, status, revert_after)
    }
}

impl Drop for PendingCopy {
    fn drop(&mut self) {
        if !self.settled {
            self.inner.abandon(self.generation);
        }
    }
}

/// 剪贴板导出器（克隆共享同一个状态机）。
#[derive(Clone)]
pub struct ClipboardExporter {
    inner: Arc<Inner>,
}

impl ClipboardExporter {
    pub fn new(backend: Arc<dyn ClipboardBackend>, settings: ClipboardSettings) -> Self {
        let (status_tx, _) = watch::channel(CopyStatus::Idle);
        Self {
            inner: Arc::new(Inner {
                backend,
                settings,
                state: Mutex::new(CopyState {
                    status: CopyStatus::Idle,
                    generation: 0,
                    in_flight: false,
                    revert_timer: None,
                    torn_down: false,
                }),
                status_tx,
            }),
        }
    }

    /// 当前状态。
    pub fn status(&self) -> CopyStatus {
        self.inner.lock().status
    }

    /// 订阅状态变化。
    pub fn subscribe(&self) -> watch::Receiver<CopyStatus> {
        self.inner.status_tx.subscribe()
    }

    /// 是否仍有一次剪贴板写入在运行（包括已被 `reset_status` 作废的那次）。
    pub fn is_write_in_flight(&self) -> bool {
        self.inner.lock().in_flight
    }

    /// 把画布复制到剪贴板。
    ///
    /// 返回本次复制落定的状态（`copied` 或 `error`）。编码失败与剪贴板拒绝
    /// 在状态机内部吸收为 `error`，不作为 `Err` 返回。
    ///
    /// 若复制途中被 `reset_status` 打断，返回本次自己的结果，但不再改动状态；
    /// 若途中执行了 `teardown`，返回 `SessionClosed`。
    /// future 在落定前被丢弃时，状态转为 `error` 并照常回落到 `idle`。
    pub async fn copy(
        &self,
        lookup: &dyn SurfaceLookup,
        id: SurfaceId,
    ) -> Result<CopyStatus, AppError> {
        let (surface, pending, slot) = {
            let mut state = self.inner.lock();
            if state.torn_down {
                return Err(AppError::SessionClosed);
            }
            let surface = lookup.surface(id).ok_or(AppError::SurfaceNotFound(id))?;
            if state.in_flight {
                log::warn!("⏳ 上一次复制尚未结束，忽略本次请求");
                return Err(AppError::CopyInProgress);
            }
            state.cancel_timer();
            state.generation += 1;
            state.in_flight = true;
            self.inner.transition(&mut state, CopyStatus::Copying);
            let pending = PendingCopy {
                inner: Arc::clone(&self.inner),
                generation: state.generation,
                settled: false,
            };
            let slot = InFlightSlot {
                inner: Arc::clone(&self.inner),
            };
            (surface, pending, slot)
        };

        log::info!("📋 开始复制画布到剪贴板 - {}", id);
        let settings = &self.inner.settings;

        // ── 阶段 1：编码 ───────────────────────────
        let Some(blob) = surface.to_png_blob().await else {
            log::warn!("❌ 画布未产出图片数据 - {}", id);
            drop(slot);
            return pending.settle(CopyStatus::Error, settings.error_revert());
        };

        // ── 阶段 2：写入剪贴板 ─────────────────────
        let backend = Arc::clone(&self.inner.backend);
        let outcome = tokio::task::spawn_blocking(move || {
            let _slot = slot;
            backend.write_png(&blob)
        })
        .await
        .unwrap_or_else(|e| Err(AppError::ClipboardDenied(format!("剪贴板写入线程执行失败：{}", e))));

        match outcome {
            Ok(()) => {
                log::info!("✅ 已复制到剪贴板 - {}", id);
                pending.settle(CopyStatus::Copied, settings.copied_revert())
            }
            Err(err) => {
                log::warn!("❌ 复制到剪贴板失败 - {}: {}", id, err);
                pending.settle(CopyStatus::Error, settings.error_revert())
            }
        }
    }

    /// 回到 `idle`，取消挂起的定时器并作废在途复制的结果。
    ///
    /// 在途的写入不会被中断，结束之前新的 `copy` 仍返回 `CopyInProgress`。
    pub fn reset_status(&self) {
        let mut state = self.inner.lock();
        if state.torn_down {
            return;
        }
        state.cancel_timer();
        state.generation += 1;
        self.inner.transition(&mut state, CopyStatus::Idle);
    }

    /// 销毁：取消定时器，此后不再发生任何状态迁移。可重复调用。
    pub fn teardown(&self) {
        let mut state = self.inner.lock();
        if state.torn_down {
            return;
        }
        state.torn_down = true;
        state.cancel_timer();
        state.generation += 1;
        log::debug!("🧹 剪贴板导出器已销毁");
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.lock().torn_down
    }
}
