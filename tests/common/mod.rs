#![allow(dead_code)]

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{ImageFormat, Rgba, RgbaImage};

use qr_studio::AppError;
use qr_studio::clipboard::ClipboardBackend;
use qr_studio::export::DownloadSink;
use qr_studio::logo::{BlobRegistry, LogoFile, ResourceRegistry};

pub fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, ImageFormat::Png)
        .expect("encode test png");
    cursor.into_inner()
}

pub fn logo_file(name: &str) -> LogoFile {
    LogoFile::from_bytes(name, png_bytes(8, 8, [0, 0, 255, 255])).expect("valid png")
}

/// 记录写入次数，可配置为拒绝写入。
#[derive(Default)]
pub struct FakeClipboard {
    pub writes: AtomicUsize,
    pub deny: bool,
}

impl FakeClipboard {
    pub fn accepting() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn denying() -> Arc<Self> {
        Arc::new(Self {
            writes: AtomicUsize::new(0),
            deny: true,
        })
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl ClipboardBackend for FakeClipboard {
    fn write_png(&self, png: &[u8]) -> Result<(), AppError> {
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.deny {
            Err(AppError::ClipboardDenied("permission denied".into()))
        } else {
            Ok(())
        }
    }
}

/// 写入阻塞在闸门上，直到测试放行。
pub struct GatedClipboard {
    gate: Mutex<Receiver<()>>,
    started: AtomicUsize,
}

impl GatedClipboard {
    pub fn new() -> (Arc<Self>, Sender<()>) {
        let (tx, rx) = mpsc::channel();
        let backend = Self {
            gate: Mutex::new(rx),
            started: AtomicUsize::new(0),
        };
        (Arc::new(backend), tx)
    }

    /// 已进入 `write_png` 的次数。
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// 等到第 `count` 次写入进入闸门。
    pub async fn wait_started(&self, count: usize) {
        while self.started() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl ClipboardBackend for GatedClipboard {
    fn write_png(&self, _png: &[u8]) -> Result<(), AppError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.gate
            .lock()
            .unwrap()
            .recv_timeout(Duration::from_secs(5))
            .map_err(|e| AppError::ClipboardDenied(e.to_string()))
    }
}

/// 保存在内存里的下载目标。
#[derive(Default, Clone)]
pub struct MemorySink {
    pub saved: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl DownloadSink for MemorySink {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, AppError> {
        self.saved
            .lock()
            .unwrap()
            .push((filename.to_string(), bytes.to_vec()));
        Ok(PathBuf::from(filename))
    }
}

/// 包装 `BlobRegistry`，按顺序记录 create / release 事件。
#[derive(Default)]
pub struct RecordingRegistry {
    inner: BlobRegistry,
    pub events: Mutex<Vec<String>>,
}

impl RecordingRegistry {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl ResourceRegistry for RecordingRegistry {
    fn create(&self, file: LogoFile) -> String {
        let handle = self.inner.create(file);
        self.events.lock().unwrap().push(format!("create {}", handle));
        handle
    }

    fn release(&self, reference: &str) -> bool {
        self.events
            .lock()
            .unwrap()
            .push(format!("release {}", reference));
        self.inner.release(reference)
    }

    fn resolve(&self, reference: &str) -> Option<LogoFile> {
        self.inner.resolve(reference)
    }

    fn live_count(&self) -> usize {
        self.inner.live_count()
    }
}
