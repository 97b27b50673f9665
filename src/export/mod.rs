//! 文件导出模块
//!
//! # 设计思路
//!
//! 下载链路与浏览器的“右键另存为”一致：画布 → PNG data URI → 字节 → 下载目录。
//! 落盘能力抽象为 `DownloadSink`，测试可以换成内存实现。
//!
//! # 实现思路
//!
//! - 画布按 `SurfaceId` 查找，找不到返回 `SurfaceNotFound`。
//! - 被跨域 Logo 污染的画布在序列化阶段失败，返回 `Encode`。
//! - `FsDownloadSink` 不覆盖已有文件：`qrcode.png` 已存在时依次尝试
//!   `qrcode (1).png`、`qrcode (2).png`……，以 `create_new` 打开保证不会竞争覆盖。

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::data_uri;
use crate::error::AppError;
use crate::render::{SurfaceId, SurfaceLookup};

/// 默认导出文件名。
pub const DEFAULT_EXPORT_FILENAME: &str = "qrcode.png";

const MAX_DEDUPE_ATTEMPTS: u32 = 10_000;

/// 下载落盘能力。
pub trait DownloadSink: Send + Sync {
    /// 以 `filename` 保存字节，返回实际写入的路径。
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, AppError>;
}

/// 保存到本地目录的下载实现。
#[derive(Debug, Clone)]
pub struct FsDownloadSink {
    dir: PathBuf,
}

impl FsDownloadSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// 拆出主名与扩展名：`qrcode.png` → (`qrcode`, `.png`)。
fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => filename.split_at(idx),
        _ => (filename, ""),
    }
}

fn candidate_name(filename: &str, attempt: u32) -> String {
    if attempt == 0 {
        return filename.to_string();
    }
    let (stem, ext) = split_extension(filename);
    format!("{} ({}){}", stem, attempt, ext)
}

/// 只保留最后一个路径分量，空名回退到默认文件名。
fn sanitize_filename(filename: &str) -> String {
    let name = Path::new(filename.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    if name.is_empty() {
        DEFAULT_EXPORT_FILENAME.to_string()
    } else {
        name.to_string()
    }
}

impl DownloadSink for FsDownloadSink {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, AppError> {
        fs::create_dir_all(&self.dir)?;
        let filename = sanitize_filename(filename);

        for attempt in 0..MAX_DEDUPE_ATTEMPTS {
            let path = self.dir.join(candidate_name(&filename, attempt));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(bytes)?;
                    file.flush()?;
                    log::info!("💾 已保存文件: {} ({} 字节)", path.display(), bytes.len());
                    return Ok(path);
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err.into()),
            }
        }

        Err(AppError::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("{} 下同名文件过多: {}", self.dir.display(), filename),
        )))
    }
}

/// 下载导出链路。
pub struct ExportPipeline {
    sink: Box<dyn DownloadSink>,
}

impl ExportPipeline {
    pub fn new(sink: Box<dyn DownloadSink>) -> Self {
        Self { sink }
    }

    /// 把画布导出为 PNG 文件，`filename` 缺省为 `qrcode.png`。
    pub fn download_as_file(
        &self,
        lookup: &dyn SurfaceLookup,
        id: SurfaceId,
        filename: Option<&str>,
    ) -> Result<PathBuf, AppError> {
        let surface = lookup.surface(id).ok_or(AppError::SurfaceNotFound(id))?;

        let uri = surface.to_image_data_uri()?;
        let bytes = data_uri::decode_image(&uri, u64::MAX)
            .map_err(|e| AppError::Encode(format!("画布 data URI 无法还原: {}", e)))?;

        let filename = filename.unwrap_or(DEFAULT_EXPORT_FILENAME);
        log::debug!("⬇️ 导出画布 {} → {}", id, filename);
        self.sink.save(filename, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use image::{Rgba, RgbaImage};

    use crate::render::Surface;

    #[derive(Default, Clone)]
    struct MemorySink {
        saved: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
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

    struct OneSurface(Surface);

    impl SurfaceLookup for OneSurface {
        fn surface(&self, id: SurfaceId) -> Option<Surface> {
            (self.0.id() == id).then(|| self.0.clone())
        }
    }

    fn lookup(tainted: bool) -> OneSurface {
        OneSurface(Surface::new(
            SurfaceId::allocate(),
            RgbaImage::from_pixel(6, 6, Rgba([0, 0, 0, 255])),
            tainted,
        ))
    }

    #[test]
    fn exports_surface_png_under_default_name() {
        let sink = MemorySink::default();
        let pipeline = ExportPipeline::new(Box::new(sink.clone()));
        let lookup = lookup(false);

        pipeline.download_as_file(&lookup, lookup.0.id(), None).unwrap();

        let saved = sink.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].0, DEFAULT_EXPORT_FILENAME);
        assert_eq!(saved[0].1, lookup.0.to_png_bytes().unwrap());
    }

    #[test]
    fn unknown_surface_is_reported() {
        let sink = MemorySink::default();
        let pipeline = ExportPipeline::new(Box::new(sink.clone()));
        let missing = SurfaceId::allocate();

        let result = pipeline.download_as_file(&lookup(false), missing, None);
        assert!(matches!(result, Err(AppError::SurfaceNotFound(id)) if id == missing));
        assert!(sink.saved.lock().unwrap().is_empty());
    }

    #[test]
    fn tainted_surface_fails_as_encode_error() {
        let sink = MemorySink::default();
        let pipeline = ExportPipeline::new(Box::new(sink.clone()));
        let lookup = lookup(true);

        let result = pipeline.download_as_file(&lookup, lookup.0.id(), Some("x.png"));
        assert!(matches!(result, Err(AppError::Encode(_))));
        assert!(sink.saved.lock().unwrap().is_empty());
    }

    #[test]
    fn fs_sink_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsDownloadSink::new(dir.path().join("downloads"));

        let first = sink.save("qrcode.png", b"one").unwrap();
        let second = sink.save("qrcode.png", b"two").unwrap();
        let third = sink.save("qrcode.png", b"three").unwrap();

        assert_eq!(first.file_name().unwrap(), "qrcode.png");
        assert_eq!(second.file_name().unwrap(), "qrcode (1).png");
        assert_eq!(third.file_name().unwrap(), "qrcode (2).png");
        assert_eq!(fs::read(&first).unwrap(), b"one");
        assert_eq!(fs::read(&third).unwrap(), b"three");
    }

    #[test]
    fn fs_sink_strips_directories_from_filename() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsDownloadSink::new(dir.path());

        let path = sink.save("../escape/evil.png", b"x").unwrap();
        assert_eq!(path, dir.path().join("evil.png"));

        let fallback = sink.save("   ", b"y").unwrap();
        assert_eq!(fallback, dir.path().join(DEFAULT_EXPORT_FILENAME));
    }

    #[test]
    fn candidate_names_keep_extension() {
        assert_eq!(candidate_name("qrcode.png", 0), "qrcode.png");
        assert_eq!(candidate_name("qrcode.png", 3), "qrcode (3).png");
        assert_eq!(candidate_name("README", 1), "README (1)");
        assert_eq!(candidate_name(".hidden", 1), ".hidden (1)");
    }
}
