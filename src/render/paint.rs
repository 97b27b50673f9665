//! # 绘制原语
//!
//! 在 `RgbaImage` 上按“像素中心落在形状内”的规则填充矩形、圆、圆角矩形，
//! 颜色按 source-over 规则混合。Logo 缩放沿用 `fast_image_resize`，
//! 失败时回退 `image::imageops::resize`。

use fast_image_resize as fr;
use image::{ImageBuffer, Rgba, RgbaImage};

use crate::error::AppError;

/// 轴对齐矩形（像素坐标，浮点）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn inflate(self, by: f64) -> Self {
        Self::new(self.x - by, self.y - by, self.w + by * 2.0, self.h + by * 2.0)
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }

    /// 与画布相交的整数像素范围 `[x0, x1) × [y0, y1)`。
    fn pixel_bounds(&self, canvas: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
        if !(self.w > 0.0 && self.h > 0.0) {
            return None;
        }
        let x0 = self.x.floor().max(0.0) as u32;
        let y0 = self.y.floor().max(0.0) as u32;
        let x1 = ((self.x + self.w).ceil().max(0.0) as u32).min(canvas.width());
        let y1 = ((self.y + self.h).ceil().max(0.0) as u32).min(canvas.height());
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0, y0, x1, y1))
    }
}

/// source-over 混合，`coverage` 额外乘到源 alpha 上。
pub(crate) fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>, coverage: f64) {
    let sa = (src[3] as f64 / 255.0) * coverage.clamp(0.0, 1.0);
    if sa <= 0.0 {
        return;
    }
    let da = dst[3] as f64 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    for c in 0..3 {
        let s = src[c] as f64;
        let d = dst[c] as f64;
        let v = (s * sa + d * da * (1.0 - sa)) / out_a;
        dst[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

fn fill_where<F>(canvas: &mut RgbaImage, bounds: Rect, color: Rgba<u8>, inside: F)
where
    F: Fn(f64, f64) -> bool,
{
    let Some((x0, y0, x1, y1)) = bounds.pixel_bounds(canvas) else {
        return;
    };
    for y in y0..y1 {
        for x in x0..x1 {
            let (cx, cy) = (x as f64 + 0.5, y as f64 + 0.5);
            if inside(cx, cy) {
                blend(canvas.get_pixel_mut(x, y), color, 1.0);
            }
        }
    }
}

pub(crate) fn fill_rect(canvas: &mut RgbaImage, rect: Rect, color: Rgba<u8>) {
    fill_where(canvas, rect, color, |px, py| {
        px >= rect.x && px < rect.x + rect.w && py >= rect.y && py < rect.y + rect.h
    });
}

pub(crate) fn fill_circle(canvas: &mut RgbaImage, cx: f64, cy: f64, radius: f64, color: Rgba<u8>) {
    if !(radius > 0.0) {
        return;
    }
    let bounds = Rect::new(cx - radius, cy - radius, radius * 2.0, radius * 2.0);
    let r2 = radius * radius;
    fill_where(canvas, bounds, color, |px, py| {
        let (dx, dy) = (px - cx, py - cy);
        dx * dx + dy * dy <= r2
    });
}

/// 圆角矩形；半径夹取到 `[0, min(w, h) / 2]`，非有限值视为 0。
pub(crate) fn fill_rounded_rect(canvas: &mut RgbaImage, rect: Rect, radius: f64, color: Rgba<u8>) {
    let max_radius = rect.w.min(rect.h) / 2.0;
    let r = if radius.is_finite() {
        radius.clamp(0.0, max_radius.max(0.0))
    } else {
        0.0
    };
    if r <= 0.0 {
        fill_rect(canvas, rect, color);
        return;
    }

    let (left, top) = (rect.x + r, rect.y + r);
    let (right, bottom) = (rect.x + rect.w - r, rect.y + rect.h - r);
    fill_where(canvas, rect, color, |px, py| {
        if px < rect.x || px >= rect.x + rect.w || py < rect.y || py >= rect.y + rect.h {
            return false;
        }
        let nx = px.clamp(left, right);
        let ny = py.clamp(top, bottom);
        let (dx, dy) = (px - nx, py - ny);
        dx * dx + dy * dy <= r * r
    });
}

/// 将 Logo 缩放后按透明度合成到目标矩形。
pub(crate) fn draw_image(canvas: &mut RgbaImage, image: &RgbaImage, target: Rect, opacity: f64) {
    let width = target.w.round();
    let height = target.h.round();
    if !(width >= 1.0 && height >= 1.0) {
        return;
    }
    let (width, height) = (width as u32, height as u32);

    let scaled = if image.dimensions() == (width, height) {
        image.clone()
    } else {
        match resize_with_fast_image_resize(image, width, height) {
            Ok(resized) => resized,
            Err(err) => {
                log::warn!("⚠️ fast_image_resize 缩放 Logo 失败，回退 image::resize：{}", err);
                image::imageops::resize(image, width, height, image::imageops::FilterType::Triangle)
            }
        }
    };

    let origin_x = target.x.round() as i64;
    let origin_y = target.y.round() as i64;
    for (sx, sy, pixel) in scaled.enumerate_pixels() {
        let x = origin_x + sx as i64;
        let y = origin_y + sy as i64;
        if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
            continue;
        }
        blend(canvas.get_pixel_mut(x as u32, y as u32), *pixel, opacity);
    }
}

fn resize_with_fast_image_resize(
    image: &RgbaImage,
    target_width: u32,
    target_height: u32,
) -> Result<RgbaImage, AppError> {
    let (src_width, src_height) = image.dimensions();
    let src_image = fr::images::Image::from_vec_u8(
        src_width,
        src_height,
        image.as_raw().clone(),
        fr::PixelType::U8x4,
    )
    .map_err(|e| AppError::Render(format!("构建源图像缓冲失败：{}", e)))?;

    let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

    let mut resizer = fr::Resizer::new();
    let options = fr::ResizeOptions::new()
        .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear));

    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| AppError::Render(format!("fast_image_resize 执行失败：{}", e)))?;

    ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(target_width, target_height, dst_image.into_vec())
        .ok_or_else(|| AppError::Render("fast_image_resize 输出缓冲长度异常".to_string()))
}
