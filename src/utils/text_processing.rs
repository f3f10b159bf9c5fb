// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 网页文本处理
//!
//! 把 HTML 转成适合邮箱提取的纯文本：去掉标签、脚本和样式，
//! 并把 `mailto:` 链接的目标地址追加到文本末尾。

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

/// 内容不参与提取的元素
const SKIPPED_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

static LINK_SELECTOR: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("a[href]").ok());

/// 将 HTML 转换为纯文本
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let mut parts: Vec<String> = document
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let skipped = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .map(|e| SKIPPED_ELEMENTS.contains(&e.name()))
                    .unwrap_or(false)
            });
            if skipped {
                return None;
            }
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .collect();

    parts.extend(mailto_targets(&document));
    parts.join(" ")
}

/// 提取所有 `mailto:` 链接的目标地址
fn mailto_targets(document: &Html) -> Vec<String> {
    let Some(selector) = LINK_SELECTOR.as_ref() else {
        return Vec::new();
    };

    document
        .select(selector)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| {
            href.get(..7)
                .map(|p| p.eq_ignore_ascii_case("mailto:"))
                .unwrap_or(false)
        })
        .filter_map(|href| {
            let target = href.get("mailto:".len()..)?;
            let target = target.split('?').next().unwrap_or_default().trim();
            (!target.is_empty()).then(|| target.replace("%40", "@"))
        })
        .flat_map(|target| {
            target
                .split(',')
                .map(|s| s.trim().to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// 规整空白字符
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_markup_and_scripts() {
        let html = r#"
            <html>
              <head><style>.a { color: red }</style><script>var x = "hidden@example.com";</script></head>
              <body><h1>Contact</h1><p>Write to <b>jane@example.com</b></p></body>
            </html>
        "#;
        let text = html_to_text(html);

        assert!(text.contains("Contact"));
        assert!(text.contains("jane@example.com"));
        assert!(!text.contains("hidden@example.com"));
        assert!(!text.contains("color"));
    }

    #[test]
    fn test_keeps_mailto_targets() {
        let html = r#"<a href="mailto:sales@example.com?subject=Hi">Email us</a>
                      <a href="MAILTO:a@example.com,b@example.com">Both</a>"#;
        let text = html_to_text(html);

        assert!(text.contains("Email us"));
        assert!(text.contains("sales@example.com"));
        assert!(!text.contains("subject"));
        assert!(text.contains("a@example.com"));
        assert!(text.contains("b@example.com"));
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(html_to_text("just text"), "just text");
        assert_eq!(html_to_text(""), "");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b  c "), "a b c");
    }
}
