//! Data URI 编解码
//!
//! 导出链路把 PNG 画布序列化为 `data:image/png;base64,...`，
//! Logo 引用也可能直接是 data URI，两边共用这里的实现。

use base64::{Engine as _, engine::general_purpose};

use crate::error::AppError;

pub const PNG_MIME: &str = "image/png";

/// 将 PNG 字节编码为 data URI。
pub fn encode_png(bytes: &[u8]) -> String {
    format!("data:{};base64,{}", PNG_MIME, general_purpose::STANDARD.encode(bytes))
}

fn estimate_decoded_upper_bound(base64_data: &str) -> u64 {
    let len = base64_data.trim().len() as u64;
    len.saturating_add(3) / 4 * 3
}

/// 解析图片 data URI（也接受纯 Base64 字符串），返回原始字节。
///
/// 在解码前按长度估算体积，超过 `max_bytes` 直接拒绝。
pub fn decode_image(data: &str, max_bytes: u64) -> Result<Vec<u8>, AppError> {
    let normalized = data.trim();

    let payload = if let Some(rest) = normalized.strip_prefix("data:") {
        if !rest.starts_with("image/") {
            return Err(AppError::Logo("data URI 不是图片类型".to_string()));
        }
        let start = rest
            .find(";base64,")
            .ok_or_else(|| AppError::Logo("缺少 base64 标记".to_string()))?;
        &rest[start + 8..]
    } else {
        normalized
    };

    let estimated = estimate_decoded_upper_bound(payload);
    if estimated > max_bytes {
        return Err(AppError::Logo(format!(
            "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
            estimated as f64 / 1024.0 / 1024.0,
            max_bytes as f64 / 1024.0 / 1024.0
        )));
    }

    general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| AppError::Logo(format!("Base64 解码失败：{}", e)))
}
