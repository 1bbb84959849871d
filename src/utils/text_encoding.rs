// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use tracing::debug;

/// 从Content-Type中提取charset参数
pub fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
        .and_then(|(_, value)| Encoding::for_label(value.trim().trim_matches('"').as_bytes()))
}

/// 将响应体解码为UTF-8文本
///
/// 优先使用声明的charset；否则合法UTF-8直接返回，其余交给chardetng检测
pub fn decode_body(bytes: &[u8], content_type: &str) -> String {
    if let Some(encoding) = charset_from_content_type(content_type) {
        let (decoded, _, had_errors) = encoding.decode(bytes);
        if !had_errors {
            return decoded.into_owned();
        }
        debug!(
            declared = encoding.name(),
            "Declared charset produced errors, detecting"
        );
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    debug!(detected = encoding.name(), "Detected body encoding");

    let encoding = if encoding == UTF_8 {
        encoding_rs::WINDOWS_1252
    } else {
        encoding
    };
    let (decoded, _, _) = encoding.decode(bytes);
    decoded.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charset_parameter() {
        assert_eq!(
            charset_from_content_type("text/html; charset=ISO-8859-1"),
            Some(encoding_rs::WINDOWS_1252)
        );
        assert_eq!(charset_from_content_type("application/json"), None);
    }

    #[test]
    fn test_utf8_passthrough() {
        let text = "Ingeniero de Datos, Ciudad de México";
        assert_eq!(decode_body(text.as_bytes(), "text/html"), text);
    }

    #[test]
    fn test_latin1_declared() {
        let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode("Sin descripción");
        assert_eq!(
            decode_body(&bytes, "text/html; charset=latin1"),
            "Sin descripción"
        );
    }

    #[test]
    fn test_latin1_detected() {
        let (bytes, _, _) =
            encoding_rs::WINDOWS_1252.encode("Ubicación: Bogotá. Años de experiencia: 5.");
        let decoded = decode_body(&bytes, "text/html");
        assert!(decoded.contains("Bogotá"));
    }
}
