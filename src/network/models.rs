//! 远端 API 响应的数据模型。
//!
//! 站点 API 只有两种形状：`type=manga`（系列元数据 + 章节目录）和
//! `type=chapter`（章节哈希 / 图片服务器 / 页面文件名数组）。

use serde::Deserialize;
use std::collections::BTreeMap;

/// `GET /api/?id={seriesId}&type=manga` 的响应。
///
/// 章节目录用 BTreeMap 保存，保证同一系列两次解析得到的章节顺序一致。
#[derive(Debug, Clone, Deserialize)]
pub struct SeriesInfo {
    pub manga: MangaInfo,
    #[serde(default)]
    pub chapter: BTreeMap<String, ChapterEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MangaInfo {
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChapterEntry {
    pub lang_code: String,
    #[serde(default)]
    pub chapter: String,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub title: String,
}

/// `GET /api/?id={chapterId}&type=chapter` 的响应。
#[derive(Debug, Clone, Deserialize)]
pub struct ChapterInfo {
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub page_array: Vec<String>,
    #[serde(default)]
    pub manga_id: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn series_info_decodes_chapter_map() {
        let value = json!({
            "manga": { "title": "Strange Ramen" },
            "chapter": {
                "101": { "lang_code": "gb", "chapter": "1", "group_name": "g", "title": "One" },
                "102": { "lang_code": "it", "chapter": "2", "group_name": null, "title": "" }
            }
        });
        let info: SeriesInfo = serde_json::from_value(value).unwrap();
        assert_eq!(info.manga.title, "Strange Ramen");
        assert_eq!(info.chapter.len(), 2);
        assert_eq!(info.chapter["101"].lang_code, "gb");
        assert!(info.chapter["102"].group_name.is_none());
    }

    #[test]
    fn series_info_tolerates_missing_chapter_map() {
        let value = json!({ "manga": { "title": "Oneshot" } });
        let info: SeriesInfo = serde_json::from_value(value).unwrap();
        assert!(info.chapter.is_empty());
    }

    #[test]
    fn chapter_info_decodes_page_array() {
        let value = json!({
            "hash": "abc123",
            "server": "/data/",
            "page_array": ["p0.jpg", "p1.png"],
            "manga_id": 42
        });
        let info: ChapterInfo = serde_json::from_value(value).unwrap();
        assert_eq!(info.hash, "abc123");
        assert_eq!(info.page_array, vec!["p0.jpg", "p1.png"]);
        assert_eq!(info.manga_id, Some(42));
    }

    #[test]
    fn chapter_info_defaults_absent_fields() {
        let info: ChapterInfo = serde_json::from_value(json!({})).unwrap();
        assert!(info.hash.is_empty());
        assert!(info.page_array.is_empty());
        assert!(info.manga_id.is_none());
    }
}
