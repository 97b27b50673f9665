//! # 文本输入适配
//!
//! 表单控件与 CLI 的 `--set key=value` 传来的都是原始文本。
//! 这里把字段名映射到 `ConfigField`，再把文本转换成对应 setter 的参数。
//!
//! 数值规则：
//! - 空串按 0 处理（与数字输入框清空后的取值一致）；
//! - 无法解析或非有限值返回 `InvalidNumericInput`，配置保持不变；
//! - 整数字段截断小数部分，负数无法表示，同样视为无效输入；
//! - 解析成功的数值不做范围夹取。

use std::fmt;
use std::str::FromStr;

use super::{EcLevel, ModuleStyle, PaddingStyle, QrConfig};
use crate::error::AppError;

/// 可编辑的配置字段。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    Content,
    Size,
    QuietZone,
    BackgroundColor,
    ForegroundColor,
    EcLevel,
    LogoWidth,
    LogoHeight,
    LogoOpacity,
    LogoPadding,
    LogoPaddingStyle,
    LogoPaddingRadius,
    RemoveSymbolBehindLogo,
    ModuleStyle,
    EyeRadius,
    EyeColor,
    SyncLogoDimensions,
    EnableCrossOriginLoad,
}

impl ConfigField {
    pub const ALL: [ConfigField; 18] = [
        Self::Content,
        Self::Size,
        Self::QuietZone,
        Self::BackgroundColor,
        Self::ForegroundColor,
        Self::EcLevel,
        Self::LogoWidth,
        Self::LogoHeight,
        Self::LogoOpacity,
        Self::LogoPadding,
        Self::LogoPaddingStyle,
        Self::LogoPaddingRadius,
        Self::RemoveSymbolBehindLogo,
        Self::ModuleStyle,
        Self::EyeRadius,
        Self::EyeColor,
        Self::SyncLogoDimensions,
        Self::EnableCrossOriginLoad,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Size => "size",
            Self::QuietZone => "quiet-zone",
            Self::BackgroundColor => "bg-color",
            Self::ForegroundColor => "fg-color",
            Self::EcLevel => "ec-level",
            Self::LogoWidth => "logo-width",
            Self::LogoHeight => "logo-height",
            Self::LogoOpacity => "logo-opacity",
            Self::LogoPadding => "logo-padding",
            Self::LogoPaddingStyle => "logo-padding-style",
            Self::LogoPaddingRadius => "logo-padding-radius",
            Self::RemoveSymbolBehindLogo => "remove-behind-logo",
            Self::ModuleStyle => "module-style",
            Self::EyeRadius => "eye-radius",
            Self::EyeColor => "eye-color",
            Self::SyncLogoDimensions => "sync-logo-size",
            Self::EnableCrossOriginLoad => "cross-origin",
        }
    }
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConfigField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.name() == normalized)
            .ok_or_else(|| AppError::UnknownField(s.to_string()))
    }
}

fn parse_number(field: ConfigField, text: &str) -> Result<f64, AppError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(AppError::InvalidNumericInput {
            field: field.name(),
            value: text.to_string(),
        }),
    }
}

fn parse_pixels(field: ConfigField, text: &str) -> Result<u32, AppError> {
    let value = parse_number(field, text)?;
    if value < 0.0 || value > u32::MAX as f64 {
        return Err(AppError::InvalidNumericInput {
            field: field.name(),
            value: text.to_string(),
        });
    }
    Ok(value.trunc() as u32)
}

fn parse_flag(field: ConfigField, text: &str) -> Result<bool, AppError> {
    match text.trim().to_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" | "" => Ok(false),
        _ => Err(AppError::InvalidChoice {
            field: field.name(),
            value: text.to_string(),
        }),
    }
}

fn invalid_choice(field: ConfigField, text: &str) -> AppError {
    AppError::InvalidChoice {
        field: field.name(),
        value: text.to_string(),
    }
}

impl QrConfig {
    /// 以表单文本更新单个字段。
    ///
    /// 失败时配置保持原样。
    ///
    /// # 示例
    /// ```rust
    /// use qr_studio::config::{ConfigField, QrConfig};
    ///
    /// let mut config = QrConfig::default();
    /// config.apply_input(ConfigField::Size, "320")?;
    /// assert_eq!(config.size(), 320);
    /// assert!(config.apply_input(ConfigField::Size, "big").is_err());
    /// # Ok::<(), qr_studio::error::AppError>(())
    /// ```
    pub fn apply_input(&mut self, field: ConfigField, text: &str) -> Result<(), AppError> {
        match field {
            ConfigField::Content => self.set_content(text),
            ConfigField::Size => self.set_size(parse_pixels(field, text)?),
            ConfigField::QuietZone => self.set_quiet_zone(parse_pixels(field, text)?),
            ConfigField::BackgroundColor => self.set_background_color(text),
            ConfigField::ForegroundColor => self.set_foreground_color(text),
            ConfigField::EcLevel => {
                let level = EcLevel::parse(text).ok_or_else(|| invalid_choice(field, text))?;
                self.set_ec_level(level);
            }
            ConfigField::LogoWidth => self.set_logo_width(parse_number(field, text)?),
            ConfigField::LogoHeight => self.set_logo_height(parse_number(field, text)?),
            ConfigField::LogoOpacity => self.set_logo_opacity(parse_number(field, text)?),
            ConfigField::LogoPadding => self.set_logo_padding(parse_number(field, text)?),
            ConfigField::LogoPaddingStyle => {
                let style = PaddingStyle::parse(text).ok_or_else(|| invalid_choice(field, text))?;
                self.set_logo_padding_style(style);
            }
            ConfigField::LogoPaddingRadius => {
                self.set_logo_padding_radius(parse_number(field, text)?)
            }
            ConfigField::RemoveSymbolBehindLogo => {
                self.set_remove_symbol_behind_logo(parse_flag(field, text)?)
            }
            ConfigField::ModuleStyle => {
                let style = ModuleStyle::parse(text).ok_or_else(|| invalid_choice(field, text))?;
                self.set_module_style(style);
            }
            ConfigField::EyeRadius => self.set_eye_radius(parse_number(field, text)?),
            ConfigField::EyeColor => self.set_eye_color(text),
            ConfigField::SyncLogoDimensions => {
                self.set_sync_logo_dimensions(parse_flag(field, text)?)
            }
            ConfigField::EnableCrossOriginLoad => {
                self.set_enable_cross_origin_load(parse_flag(field, text)?)
            }
        }

        log::debug!("⚙️ 字段已更新 - {} = {:?}", field, text);
        Ok(())
    }
}
