//! # 配置状态
//!
//! ## 设计思路
//!
//! `QrConfig` 持有渲染与导出所需的全部参数，是纯数据 + 变更方法。
//! 字段私有，只能通过 setter 修改，这样“宽高同步”不变量无法被绕过；
//! Logo 引用没有公开 setter，必须经由 `LogoAssetManager` 中转。
//!
//! ## 实现思路
//!
//! - 每个 setter 都是全函数：不拒绝、不夹取，原样交给渲染器。
//! - `set_logo_width` / `set_logo_height` 在同步开启时联动另一边。
//! - 打开同步开关时，高度立即对齐到当前宽度。

use serde::Serialize;

/// 重置与首次启动时使用的示例内容。
pub const DEFAULT_CONTENT: &str = "https://example.com/qr-studio";
pub const DEFAULT_SIZE: u32 = 250;
pub const DEFAULT_QUIET_ZONE: u32 = 10;
pub const DEFAULT_BACKGROUND: &str = "#ffffff";
pub const DEFAULT_FOREGROUND: &str = "#000000";
pub const DEFAULT_LOGO_EDGE: f64 = 50.0;

/// 纠错等级。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum EcLevel {
    L,
    #[default]
    M,
    Q,
    H,
}

impl EcLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::L => "L",
            Self::M => "M",
            Self::Q => "Q",
            Self::H => "H",
        }
    }

    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "L" => Some(Self::L),
            "M" => Some(Self::M),
            "Q" => Some(Self::Q),
            "H" => Some(Self::H),
            _ => None,
        }
    }
}

/// 码点绘制风格。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleStyle {
    #[default]
    Squares,
    Dots,
    Fluid,
}

impl ModuleStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Squares => "squares",
            Self::Dots => "dots",
            Self::Fluid => "fluid",
        }
    }

    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "squares" => Some(Self::Squares),
            "dots" => Some(Self::Dots),
            "fluid" => Some(Self::Fluid),
            _ => None,
        }
    }
}

/// Logo 衬底形状。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaddingStyle {
    #[default]
    Square,
    Circle,
}

impl PaddingStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Square => "square",
            Self::Circle => "circle",
        }
    }

    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "square" => Some(Self::Square),
            "circle" => Some(Self::Circle),
            _ => None,
        }
    }
}

/// 内嵌 Logo 参数。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogoOptions {
    /// URL、data URI、本地路径或本地资源句柄；空串表示无 Logo。
    pub(crate) reference: String,
    pub(crate) width: f64,
    pub(crate) height: f64,
    pub(crate) opacity: f64,
    pub(crate) padding: f64,
    pub(crate) padding_style: PaddingStyle,
    pub(crate) padding_radius: f64,
    pub(crate) remove_symbol_behind_logo: bool,
}

impl Default for LogoOptions {
    fn default() -> Self {
        Self {
            reference: String::new(),
            width: DEFAULT_LOGO_EDGE,
            height: DEFAULT_LOGO_EDGE,
            opacity: 1.0,
            padding: 0.0,
            padding_style: PaddingStyle::Square,
            padding_radius: 0.0,
            remove_symbol_behind_logo: false,
        }
    }
}

impl LogoOptions {
    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn padding(&self) -> f64 {
        self.padding
    }

    pub fn padding_style(&self) -> PaddingStyle {
        self.padding_style
    }

    pub fn padding_radius(&self) -> f64 {
        self.padding_radius
    }

    pub fn remove_symbol_behind_logo(&self) -> bool {
        self.remove_symbol_behind_logo
    }
}

/// 码点与定位点样式。
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StyleOptions {
    pub(crate) module_style: ModuleStyle,
    pub(crate) eye_radius: f64,
    /// 空串表示沿用前景色。
    pub(crate) eye_color: String,
}

impl StyleOptions {
    pub fn module_style(&self) -> ModuleStyle {
        self.module_style
    }

    pub fn eye_radius(&self) -> f64 {
        self.eye_radius
    }

    pub fn eye_color(&self) -> &str {
        &self.eye_color
    }
}

/// 行为开关。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BehaviorOptions {
    pub(crate) sync_logo_dimensions: bool,
    pub(crate) enable_cross_origin_load: bool,
}

impl BehaviorOptions {
    pub fn sync_logo_dimensions(&self) -> bool {
        self.sync_logo_dimensions
    }

    pub fn enable_cross_origin_load(&self) -> bool {
        self.enable_cross_origin_load
    }
}

/// 会话配置状态。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QrConfig {
    content: String,
    size: u32,
    quiet_zone: u32,
    background_color: String,
    foreground_color: String,
    ec_level: EcLevel,
    logo: LogoOptions,
    style: StyleOptions,
    behavior: BehaviorOptions,
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            content: DEFAULT_CONTENT.to_string(),
            size: DEFAULT_SIZE,
            quiet_zone: DEFAULT_QUIET_ZONE,
            background_color: DEFAULT_BACKGROUND.to_string(),
            foreground_color: DEFAULT_FOREGROUND.to_string(),
            ec_level: EcLevel::default(),
            logo: LogoOptions::default(),
            style: StyleOptions::default(),
            behavior: BehaviorOptions::default(),
        }
    }
}

impl QrConfig {
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn quiet_zone(&self) -> u32 {
        self.quiet_zone
    }

    pub fn background_color(&self) -> &str {
        &self.background_color
    }

    pub fn foreground_color(&self) -> &str {
        &self.foreground_color
    }

    pub fn ec_level(&self) -> EcLevel {
        self.ec_level
    }

    pub fn logo(&self) -> &LogoOptions {
        &self.logo
    }

    pub fn style(&self) -> &StyleOptions {
        &self.style
    }

    pub fn behavior(&self) -> &BehaviorOptions {
        &self.behavior
    }

    /// 实际用于定位点的颜色：未设置时沿用前景色。
    pub fn effective_eye_color(&self) -> &str {
        if self.style.eye_color.is_empty() {
            &self.foreground_color
        } else {
            &self.style.eye_color
        }
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub fn set_size(&mut self, size: u32) {
        self.size = size;
    }

    pub fn set_quiet_zone(&mut self, quiet_zone: u32) {
        self.quiet_zone = quiet_zone;
    }

    pub fn set_background_color(&mut self, color: impl Into<String>) {
        self.background_color = color.into();
    }

    pub fn set_foreground_color(&mut self, color: impl Into<String>) {
        self.foreground_color = color.into();
    }

    pub fn set_ec_level(&mut self, level: EcLevel) {
        self.ec_level = level;
    }

    /// 设置 Logo 宽度；同步开启时高度随之变化。
    pub fn set_logo_width(&mut self, width: f64) {
        self.logo.width = width;
        if self.behavior.sync_logo_dimensions {
            self.logo.height = width;
        }
    }

    /// 设置 Logo 高度；同步开启时宽度随之变化。
    pub fn set_logo_height(&mut self, height: f64) {
        self.logo.height = height;
        if self.behavior.sync_logo_dimensions {
            self.logo.width = height;
        }
    }

    pub fn set_logo_opacity(&mut self, opacity: f64) {
        self.logo.opacity = opacity;
    }

    pub fn set_logo_padding(&mut self, padding: f64) {
        self.logo.padding = padding;
    }

    pub fn set_logo_padding_style(&mut self, style: PaddingStyle) {
        self.logo.padding_style = style;
    }

    pub fn set_logo_padding_radius(&mut self, radius: f64) {
        self.logo.padding_radius = radius;
    }

    pub fn set_remove_symbol_behind_logo(&mut self, remove: bool) {
        self.logo.remove_symbol_behind_logo = remove;
    }

    pub fn set_module_style(&mut self, style: ModuleStyle) {
        self.style.module_style = style;
    }

    pub fn set_eye_radius(&mut self, radius: f64) {
        self.style.eye_radius = radius;
    }

    pub fn set_eye_color(&mut self, color: impl Into<String>) {
        self.style.eye_color = color.into();
    }

    /// 切换宽高同步。开启时以宽度为准对齐高度。
    pub fn set_sync_logo_dimensions(&mut self, enabled: bool) {
        self.behavior.sync_logo_dimensions = enabled;
        if enabled {
            self.logo.height = self.logo.width;
        }
    }

    pub fn set_enable_cross_origin_load(&mut self, enabled: bool) {
        self.behavior.enable_cross_origin_load = enabled;
    }

    /// Logo 引用只允许 `LogoAssetManager` 修改。
    pub(crate) fn set_logo_reference(&mut self, reference: impl Into<String>) {
        self.logo.reference = reference.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_table() {
        let config = QrConfig::default();
        assert_eq!(config.content(), DEFAULT_CONTENT);
        assert_eq!(config.size(), 250);
        assert_eq!(config.quiet_zone(), 10);
        assert_eq!(config.background_color(), "#ffffff");
        assert_eq!(config.foreground_color(), "#000000");
        assert_eq!(config.ec_level(), EcLevel::M);
        assert_eq!(config.logo().reference(), "");
        assert_eq!(config.logo().width(), 50.0);
        assert_eq!(config.logo().height(), 50.0);
        assert_eq!(config.logo().opacity(), 1.0);
        assert_eq!(config.style().module_style(), ModuleStyle::Squares);
        assert_eq!(config.style().eye_color(), "");
        assert!(!config.behavior().sync_logo_dimensions());
        assert!(!config.behavior().enable_cross_origin_load());
    }

    #[test]
    fn logo_dimensions_independent_without_sync() {
        let mut config = QrConfig::default();
        config.set_logo_width(80.0);
        config.set_logo_height(30.0);
        assert_eq!(config.logo().width(), 80.0);
        assert_eq!(config.logo().height(), 30.0);
    }

    #[test]
    fn enabling_sync_snaps_height_to_width() {
        let mut config = QrConfig::default();
        config.set_logo_width(72.0);
        config.set_logo_height(20.0);
        config.set_sync_logo_dimensions(true);
        assert_eq!(config.logo().height(), 72.0);

        config.set_logo_height(40.0);
        assert_eq!(config.logo().width(), 40.0);
    }

    #[test]
    fn disabling_sync_keeps_current_values() {
        let mut config = QrConfig::default();
        config.set_sync_logo_dimensions(true);
        config.set_logo_width(64.0);
        config.set_sync_logo_dimensions(false);
        config.set_logo_width(10.0);
        assert_eq!(config.logo().width(), 10.0);
        assert_eq!(config.logo().height(), 64.0);
    }

    #[test]
    fn eye_color_falls_back_to_foreground() {
        let mut config = QrConfig::default();
        config.set_foreground_color("#112233");
        assert_eq!(config.effective_eye_color(), "#112233");
        config.set_eye_color("red");
        assert_eq!(config.effective_eye_color(), "red");
    }

    #[test]
    fn setters_pass_values_through_unclamped() {
        let mut config = QrConfig::default();
        config.set_size(0);
        config.set_logo_opacity(3.5);
        config.set_eye_radius(-4.0);
        assert_eq!(config.size(), 0);
        assert_eq!(config.logo().opacity(), 3.5);
        assert_eq!(config.style().eye_radius(), -4.0);
    }
}
