//! 系列/章节链接解析与 ID 提取。

use regex::Regex;
use std::sync::OnceLock;

static RE_URL: OnceLock<Regex> = OnceLock::new();
static RE_CHAPTER: OnceLock<Regex> = OnceLock::new();
static RE_SERIES: OnceLock<Regex> = OnceLock::new();

fn re_url() -> &'static Regex {
    RE_URL.get_or_init(|| Regex::new(r"https?://\S+").expect("compile RE_URL"))
}

fn re_chapter() -> &'static Regex {
    RE_CHAPTER.get_or_init(|| {
        Regex::new(r"(?:https?://)?mangadex\.(?:org|com)/chapter/([0-9]+)")
            .expect("compile RE_CHAPTER")
    })
}

fn re_series() -> &'static Regex {
    RE_SERIES.get_or_init(|| {
        Regex::new(r"(?:https?://)?mangadex\.(?:org|com)/[^/]+/([0-9]+)")
            .expect("compile RE_SERIES")
    })
}

/// 从用户输入提取章节 ID；纯数字输入按 ID 原样接受。
pub fn parse_chapter_id(input: &str) -> Option<String> {
    let target = extract_target(input)?;
    if target.chars().all(|c| c.is_ascii_digit()) {
        return Some(target.to_string());
    }
    re_chapter()
        .captures(target)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// 从用户输入提取系列 ID。
///
/// 章节链接同样匹配 `/{slug}/{digits}` 形状，调用方应先尝试
/// [`parse_chapter_id`] 再落到这里。
pub fn parse_series_id(input: &str) -> Option<String> {
    let target = extract_target(input)?;
    if target.chars().all(|c| c.is_ascii_digit()) {
        return Some(target.to_string());
    }
    re_series()
        .captures(target)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn extract_target(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    // If user pasted extra text around the URL, try to extract URL first.
    Some(
        re_url()
            .find(trimmed)
            .map(|m| m.as_str())
            .unwrap_or(trimmed),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chapter_id_from_url() {
        assert_eq!(
            parse_chapter_id("https://mangadex.org/chapter/143258").as_deref(),
            Some("143258")
        );
        assert_eq!(
            parse_chapter_id("mangadex.com/chapter/7"),
            Some("7".to_string())
        );
        assert_eq!(parse_chapter_id("143258").as_deref(), Some("143258"));
        assert!(parse_chapter_id("https://mangadex.org/title/123").is_none());
    }

    #[test]
    fn series_id_from_url() {
        assert_eq!(
            parse_series_id("https://mangadex.org/title/5876").as_deref(),
            Some("5876")
        );
        assert_eq!(
            parse_series_id("https://mangadex.org/manga/5876/some-slug").as_deref(),
            Some("5876")
        );
        assert!(parse_series_id("https://example.com/title/5876").is_none());
        assert!(parse_series_id("   ").is_none());
    }

    #[test]
    fn url_is_extracted_from_pasted_text() {
        assert_eq!(
            parse_chapter_id("看这个 https://mangadex.org/chapter/99 不错").as_deref(),
            Some("99")
        );
    }
}
