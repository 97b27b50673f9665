//! # 默认渲染器
//!
//! ## 实现思路
//!
//! 1. `qrcode` 按内容与纠错等级生成模块矩阵；
//! 2. 画布边长 = `size + 2 * quiet_zone`，模块边长 = `size / 模块数`（浮点）；
//! 3. 铺背景色，按风格绘制数据模块（三个定位点区域跳过）；
//! 4. 定位点单独绘制：外框 7×7、内衬 5×5（背景色）、中心 3×3，支持圆角与独立颜色；
//! 5. 有 Logo 时：可选清除其后模块、绘制衬底（方形 / 圆形），再按透明度合成 Logo。
//!
//! 远程 Logo 且未启用跨域加载时，画布标记为被污染。

use image::{Rgba, RgbaImage};
use qrcode::{Color, QrCode};

use super::color::color_or;
use super::paint::{draw_image, fill_circle, fill_rect, fill_rounded_rect, Rect};
use super::{RenderTarget, Surface, SurfaceId, SurfaceLookup};
use crate::config::{EcLevel, ModuleStyle, PaddingStyle, QrConfig};
use crate::error::AppError;
use crate::logo::LoadedLogo;

/// 单边像素上限，防止误输入导致超大内存分配。
pub const MAX_CANVAS_EDGE: u32 = 8192;

const FINDER_MODULES: usize = 7;
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

fn to_qr_level(level: EcLevel) -> qrcode::EcLevel {
    match level {
        EcLevel::L => qrcode::EcLevel::L,
        EcLevel::M => qrcode::EcLevel::M,
        EcLevel::Q => qrcode::EcLevel::Q,
        EcLevel::H => qrcode::EcLevel::H,
    }
}

/// 持有一块固定句柄的画布，每次渲染覆盖其内容。
pub struct QrRenderer {
    id: SurfaceId,
    current: Option<Surface>,
}

impl Default for QrRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl QrRenderer {
    pub fn new() -> Self {
        Self {
            id: SurfaceId::allocate(),
            current: None,
        }
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.id
    }
}

impl SurfaceLookup for QrRenderer {
    fn surface(&self, id: SurfaceId) -> Option<Surface> {
        self.current.as_ref().filter(|s| s.id() == id).cloned()
    }
}

impl RenderTarget for QrRenderer {
    fn render(
        &mut self,
        config: &QrConfig,
        logo: Option<&LoadedLogo>,
    ) -> Result<SurfaceId, AppError> {
        match draw_symbol(config, logo) {
            Ok((pixels, tainted)) => {
                log::debug!(
                    "🖌️ 渲染完成 - {} {}x{} tainted={}",
                    self.id,
                    pixels.width(),
                    pixels.height(),
                    tainted
                );
                self.current = Some(Surface::new(self.id, pixels, tainted));
                Ok(self.id)
            }
            Err(err) => {
                self.current = None;
                Err(err)
            }
        }
    }
}

struct Layout {
    quiet_zone: f64,
    cell: f64,
    modules: usize,
}

impl Layout {
    fn module_rect(&self, row: usize, col: usize) -> Rect {
        Rect::new(
            self.quiet_zone + col as f64 * self.cell,
            self.quiet_zone + row as f64 * self.cell,
            self.cell,
            self.cell,
        )
    }

    fn in_finder(&self, row: usize, col: usize) -> bool {
        let far = self.modules - FINDER_MODULES;
        (row < FINDER_MODULES && col < FINDER_MODULES)
            || (row < FINDER_MODULES && col >= far)
            || (row >= far && col < FINDER_MODULES)
    }

    fn finder_origins(&self) -> [(usize, usize); 3] {
        let far = self.modules - FINDER_MODULES;
        [(0, 0), (0, far), (far, 0)]
    }
}

/// Logo 在画布上的摆放。
struct LogoPlacement<'a> {
    image: &'a RgbaImage,
    area: Rect,
    padded: Rect,
}

fn place_logo<'a>(config: &QrConfig, logo: Option<&'a LoadedLogo>) -> Option<LogoPlacement<'a>> {
    let logo = logo?;
    let options = config.logo();
    let (w, h) = (options.width(), options.height());
    if !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0) {
        log::debug!("🖼️ Logo 尺寸无效（{}x{}），跳过合成", w, h);
        return None;
    }

    let size = config.size() as f64;
    let quiet_zone = config.quiet_zone() as f64;
    let area = Rect::new(
        quiet_zone + (size - w) / 2.0,
        quiet_zone + (size - h) / 2.0,
        w,
        h,
    );
    let padding = if options.padding().is_finite() {
        options.padding().max(0.0)
    } else {
        0.0
    };

    Some(LogoPlacement {
        image: logo.image(),
        area,
        padded: area.inflate(padding),
    })
}

fn draw_symbol(config: &QrConfig, logo: Option<&LoadedLogo>) -> Result<(RgbaImage, bool), AppError> {
    let code = QrCode::with_error_correction_level(
        config.content().as_bytes(),
        to_qr_level(config.ec_level()),
    )
    .map_err(|e| AppError::Render(format!("二维码编码失败：{}", e)))?;

    let edge = config
        .size()
        .checked_add(config.quiet_zone().saturating_mul(2))
        .filter(|edge| *edge <= MAX_CANVAS_EDGE)
        .ok_or_else(|| {
            AppError::Render(format!("画布过大（单边上限 {} 像素）", MAX_CANVAS_EDGE))
        })?;

    let modules = code.width();
    let colors = code.to_colors();
    let layout = Layout {
        quiet_zone: config.quiet_zone() as f64,
        cell: config.size() as f64 / modules as f64,
        modules,
    };

    let background = color_or(config.background_color(), WHITE, "背景");
    let foreground = color_or(config.foreground_color(), BLACK, "前景");
    let eye = color_or(config.effective_eye_color(), foreground, "定位点");

    let mut canvas = RgbaImage::from_pixel(edge, edge, background);
    let placement = place_logo(config, logo);
    let clear_behind = config.logo().remove_symbol_behind_logo();

    let is_dark = |row: usize, col: usize| -> bool {
        row < modules && col < modules && colors[row * modules + col] == Color::Dark
    };

    let is_data_dark = |row: usize, col: usize| is_dark(row, col) && !layout.in_finder(row, col);
    let style = config.style().module_style();

    for row in 0..modules {
        for col in 0..modules {
            if !is_dark(row, col) || layout.in_finder(row, col) {
                continue;
            }
            if clear_behind {
                if let Some(p) = &placement {
                    if layout.module_rect(row, col).intersects(&p.padded) {
                        continue;
                    }
                }
            }
            draw_module(&mut canvas, &layout, style, foreground, (row, col), &is_data_dark);
        }
    }

    for (row, col) in layout.finder_origins() {
        draw_eye(&mut canvas, &layout, row, col, config.style().eye_radius(), eye, background);
    }

    if let Some(p) = &placement {
        draw_logo_padding(&mut canvas, config, p, background);
        let opacity = config.logo().opacity();
        let opacity = if opacity.is_finite() { opacity.clamp(0.0, 1.0) } else { 1.0 };
        draw_image(&mut canvas, p.image, p.area, opacity);
    }

    let tainted = logo.is_some_and(|l| l.is_remote())
        && placement.is_some()
        && !config.behavior().enable_cross_origin_load();
    if tainted {
        log::warn!("⚠️ 远程 Logo 未启用跨域加载，画布将无法导出");
    }

    Ok((canvas, tainted))
}

fn draw_module<F>(
    canvas: &mut RgbaImage,
    layout: &Layout,
    style: ModuleStyle,
    color: Rgba<u8>,
    (row, col): (usize, usize),
    is_data_dark: &F,
) where
    F: Fn(usize, usize) -> bool,
{
    let rect = layout.module_rect(row, col);
    match style {
        ModuleStyle::Squares => fill_rect(canvas, rect, color),
        ModuleStyle::Dots => {
            let half = layout.cell / 2.0;
            fill_circle(canvas, rect.x + half, rect.y + half, half, color);
        }
        ModuleStyle::Fluid => {
            // 圆点 + 向右 / 向下的暗邻居方向补齐，相邻模块连成圆润的条带
            let half = layout.cell / 2.0;
            let (cx, cy) = (rect.x + half, rect.y + half);
            fill_circle(canvas, cx, cy, half, color);
            if is_data_dark(row, col + 1) {
                fill_rect(canvas, Rect::new(cx, rect.y, layout.cell, layout.cell), color);
            }
            if is_data_dark(row + 1, col) {
                fill_rect(canvas, Rect::new(rect.x, cy, layout.cell, layout.cell), color);
            }
        }
    }
}

fn draw_eye(
    canvas: &mut RgbaImage,
    layout: &Layout,
    row: usize,
    col: usize,
    radius: f64,
    eye: Rgba<u8>,
    background: Rgba<u8>,
) {
    let cell = layout.cell;
    let radius = if radius.is_finite() { radius.max(0.0) } else { 0.0 };
    let origin = layout.module_rect(row, col);

    let outer = Rect::new(origin.x, origin.y, cell * 7.0, cell * 7.0);
    let ring = Rect::new(origin.x + cell, origin.y + cell, cell * 5.0, cell * 5.0);
    let center = Rect::new(origin.x + cell * 2.0, origin.y + cell * 2.0, cell * 3.0, cell * 3.0);

    fill_rounded_rect(canvas, outer, radius, eye);
    fill_rounded_rect(canvas, ring, (radius - cell).max(0.0), background);
    fill_rounded_rect(canvas, center, radius * 3.0 / 7.0, eye);
}

fn draw_logo_padding(
    canvas: &mut RgbaImage,
    config: &QrConfig,
    placement: &LogoPlacement<'_>,
    background: Rgba<u8>,
) {
    if placement.padded == placement.area {
        return;
    }
    match config.logo().padding_style() {
        PaddingStyle::Square => {
            fill_rounded_rect(canvas, placement.padded, config.logo().padding_radius(), background);
        }
        PaddingStyle::Circle => {
            let p = placement.padded;
            let radius = p.w.max(p.h) / 2.0;
            fill_circle(canvas, p.x + p.w / 2.0, p.y + p.h / 2.0, radius, background);
        }
    }
}
