//! 颜色字符串解析
//!
//! 支持 `#rgb` / `#rgba` / `#rrggbb` / `#rrggbbaa`、`rgb()` / `rgba()` 与常用颜色名。
//! 无法解析时返回 `None`，由调用方决定回退色。

use std::collections::HashMap;

use image::Rgba;
use once_cell::sync::Lazy;

static NAMED_COLORS: Lazy<HashMap<&'static str, [u8; 4]>> = Lazy::new(|| {
    HashMap::from([
        ("black", [0, 0, 0, 255]),
        ("white", [255, 255, 255, 255]),
        ("red", [255, 0, 0, 255]),
        ("green", [0, 128, 0, 255]),
        ("lime", [0, 255, 0, 255]),
        ("blue", [0, 0, 255, 255]),
        ("yellow", [255, 255, 0, 255]),
        ("cyan", [0, 255, 255, 255]),
        ("aqua", [0, 255, 255, 255]),
        ("magenta", [255, 0, 255, 255]),
        ("fuchsia", [255, 0, 255, 255]),
        ("gray", [128, 128, 128, 255]),
        ("grey", [128, 128, 128, 255]),
        ("silver", [192, 192, 192, 255]),
        ("maroon", [128, 0, 0, 255]),
        ("navy", [0, 0, 128, 255]),
        ("olive", [128, 128, 0, 255]),
        ("purple", [128, 0, 128, 255]),
        ("teal", [0, 128, 128, 255]),
        ("orange", [255, 165, 0, 255]),
        ("transparent", [0, 0, 0, 0]),
    ])
});

fn hex_digit_pair(s: &str) -> Option<u8> {
    u8::from_str_radix(s, 16).ok()
}

fn hex_digit_single(s: &str) -> Option<u8> {
    u8::from_str_radix(s, 16).ok().map(|v| v * 17)
}

fn parse_hex(hex: &str) -> Option<[u8; 4]> {
    // from_str_radix 接受前导 '+'，先逐字符校验
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 | 4 => {
            let mut out = [255u8; 4];
            for (i, slot) in out.iter_mut().enumerate().take(hex.len()) {
                *slot = hex_digit_single(&hex[i..i + 1])?;
            }
            Some(out)
        }
        6 | 8 => {
            let mut out = [255u8; 4];
            for (i, slot) in out.iter_mut().enumerate().take(hex.len() / 2) {
                *slot = hex_digit_pair(&hex[i * 2..i * 2 + 2])?;
            }
            Some(out)
        }
        _ => None,
    }
}

fn parse_functional(body: &str, with_alpha: bool) -> Option<[u8; 4]> {
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();
    let expected = if with_alpha { 4 } else { 3 };
    if parts.len() != expected {
        return None;
    }

    let mut out = [255u8; 4];
    for (i, part) in parts.iter().take(3).enumerate() {
        let value = part.parse::<f64>().ok()?;
        if !value.is_finite() {
            return None;
        }
        out[i] = value.clamp(0.0, 255.0).round() as u8;
    }
    if with_alpha {
        let alpha = parts[3].parse::<f64>().ok()?;
        if !alpha.is_finite() {
            return None;
        }
        out[3] = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
    Some(out)
}

/// 解析颜色字符串。
pub fn parse_css_color(value: &str) -> Option<Rgba<u8>> {
    let normalized = value.trim().to_lowercase();

    if let Some(hex) = normalized.strip_prefix('#') {
        return parse_hex(hex).map(Rgba);
    }
    if let Some(body) = normalized
        .strip_prefix("rgba(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return parse_functional(body, true).map(Rgba);
    }
    if let Some(body) = normalized
        .strip_prefix("rgb(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return parse_functional(body, false).map(Rgba);
    }

    NAMED_COLORS.get(normalized.as_str()).copied().map(Rgba)
}

/// 解析失败时回退到指定颜色，并记录调试日志。
pub(crate) fn color_or(value: &str, fallback: Rgba<u8>, what: &str) -> Rgba<u8> {
    parse_css_color(value).unwrap_or_else(|| {
        log::debug!("🎨 无法解析{}颜色 {:?}，使用回退色", what, value);
        fallback
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_forms() {
        assert_eq!(parse_css_color("#fff"), Some(Rgba([255, 255, 255, 255])));
        assert_eq!(parse_css_color("#FF000080"), Some(Rgba([255, 0, 0, 128])));
        assert_eq!(parse_css_color("#1a2b3c"), Some(Rgba([0x1a, 0x2b, 0x3c, 255])));
        assert_eq!(parse_css_color("#0f08"), Some(Rgba([0, 255, 0, 136])));
    }

    #[test]
    fn parses_functional_and_named_forms() {
        assert_eq!(
            parse_css_color("rgb(10, 20, 30)"),
            Some(Rgba([10, 20, 30, 255]))
        );
        assert_eq!(
            parse_css_color("rgba(10,20,30,0.5)"),
            Some(Rgba([10, 20, 30, 128]))
        );
        assert_eq!(parse_css_color(" Navy "), Some(Rgba([0, 0, 128, 255])));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_css_color("#12"), None);
        assert_eq!(parse_css_color("#gggggg"), None);
        assert_eq!(parse_css_color("#+f+f+f"), None);
        assert_eq!(parse_css_color("#+f+"), None);
        assert_eq!(parse_css_color("rgb(1,2)"), None);
        assert_eq!(parse_css_color("not-a-color"), None);
        assert_eq!(parse_css_color(""), None);
    }
}
