//! 系列目录解析与章节枚举。
//!
//! 站点的章节字段偶尔塞进整段标题（如 `Ch. 7 - Read Online`、
//! `Vol. 01 Ch. 001-013 - Read Online`、`Ch. 8 v2 - Read Online`），
//! 这里统一归一成纯章节号。

use regex::Regex;
use std::sync::OnceLock;
use tracing::info;

use crate::base_system::context::Config;
use crate::network::client::SiteClient;
use crate::network::models::{ChapterEntry, SeriesInfo};

use super::models::DownloadError;

static RE_CHAPTER_LABEL: OnceLock<Regex> = OnceLock::new();

fn re_chapter_label() -> &'static Regex {
    RE_CHAPTER_LABEL.get_or_init(|| {
        Regex::new(r"^Ch\. ?([A-Za-z0-9.\-]*)(?: v[0-9]+)?(?: - (.*))")
            .expect("compile RE_CHAPTER_LABEL")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterRef {
    pub id: String,
    pub chapter: String,
    pub title: Option<String>,
    pub group: Option<String>,
    pub lang_code: String,
}

#[derive(Debug, Clone)]
pub struct SeriesPlan {
    pub series_id: String,
    pub title: String,
    pub chapters: Vec<ChapterRef>,
}

/// 拉取系列目录并按配置的语言过滤；无匹配章节视同系列不存在。
pub fn prepare_series_plan(
    client: &SiteClient,
    config: &Config,
    series_id: &str,
) -> Result<SeriesPlan, DownloadError> {
    info!(target: "download", series_id, "准备系列下载计划");
    let info = client.series_info(series_id)?;
    let chapters = chapters_from_info(&info, &config.lang_codes);
    if chapters.is_empty() {
        return Err(DownloadError::NotFound);
    }
    Ok(SeriesPlan {
        series_id: series_id.to_string(),
        title: info.manga.title,
        chapters,
    })
}

/// 由章节 ID 反查所属系列计划与目录内的章节条目。
///
/// 目录查找不做语言过滤：用户直接贴章节链接时，语言以链接为准。
pub fn chapter_ref_for(
    client: &SiteClient,
    chapter_id: &str,
) -> Result<(String, ChapterRef), DownloadError> {
    let info = client.chapter_info(chapter_id)?;
    let manga_id = info.manga_id.ok_or(DownloadError::NotFound)?;

    let series = client.series_info(&manga_id.to_string())?;
    let entry = series
        .chapter
        .get(chapter_id)
        .ok_or(DownloadError::NotFound)?;

    Ok((
        series.manga.title.clone(),
        chapter_ref_from_entry(chapter_id, entry),
    ))
}

pub(crate) fn chapters_from_info(info: &SeriesInfo, lang_codes: &[String]) -> Vec<ChapterRef> {
    info.chapter
        .iter()
        .filter(|(_, entry)| lang_codes.iter().any(|code| code == &entry.lang_code))
        .map(|(id, entry)| chapter_ref_from_entry(id, entry))
        .collect()
}

fn chapter_ref_from_entry(id: &str, entry: &ChapterEntry) -> ChapterRef {
    let title = entry.title.trim();
    ChapterRef {
        id: id.to_string(),
        chapter: normalize_chapter_label(&entry.chapter),
        title: (!title.is_empty()).then(|| title.to_string()),
        group: entry.group_name.clone(),
        lang_code: entry.lang_code.clone(),
    }
}

/// 章节字段形如 `Ch. X - ...` 时提取章节号，否则原样返回。
pub(crate) fn normalize_chapter_label(raw: &str) -> String {
    re_chapter_label()
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chapter_labels_are_normalized() {
        assert_eq!(normalize_chapter_label("18"), "18");
        assert_eq!(normalize_chapter_label("Ch. 7 - Read Online"), "7");
        assert_eq!(normalize_chapter_label("Ch. 001-013 - Read Online"), "001-013");
        assert_eq!(normalize_chapter_label("Ch. 8 v2 - Read Online"), "8");
        assert_eq!(normalize_chapter_label("Oneshot"), "Oneshot");
    }

    #[test]
    fn chapters_are_filtered_by_language() {
        let info: SeriesInfo = serde_json::from_value(json!({
            "manga": { "title": "T" },
            "chapter": {
                "11": { "lang_code": "gb", "chapter": "1", "group_name": "g1", "title": "One" },
                "12": { "lang_code": "it", "chapter": "1", "group_name": "g2", "title": "Uno" },
                "13": { "lang_code": "us", "chapter": "2", "group_name": "g1", "title": "  " }
            }
        }))
        .unwrap();

        let chapters = chapters_from_info(&info, &["gb".to_string(), "us".to_string()]);
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].id, "11");
        assert_eq!(chapters[0].title.as_deref(), Some("One"));
        // 空白标题归一为 None
        assert_eq!(chapters[1].id, "13");
        assert!(chapters[1].title.is_none());
    }

    #[test]
    fn same_input_yields_equal_plans() {
        let value = json!({
            "manga": { "title": "T" },
            "chapter": {
                "21": { "lang_code": "gb", "chapter": "Ch. 3 - X", "group_name": "g", "title": "a" },
                "22": { "lang_code": "gb", "chapter": "4", "group_name": "g", "title": "b" }
            }
        });
        let a: SeriesInfo = serde_json::from_value(value.clone()).unwrap();
        let b: SeriesInfo = serde_json::from_value(value).unwrap();
        let langs = vec!["gb".to_string()];
        assert_eq!(chapters_from_info(&a, &langs), chapters_from_info(&b, &langs));
    }
}
