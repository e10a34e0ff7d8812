//! 全局配置结构（Config）与默认值。
//!
//! 该模块同时提供生成 `config.yml` 的字段元信息。

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::config::{ConfigSpec, FieldMeta};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // 网络配置
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    // 章节目录配置
    #[serde(default = "default_lang_codes")]
    pub lang_codes: Vec<String>,

    // 路径配置
    #[serde(default)]
    pub save_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            request_timeout: default_request_timeout(),
            lang_codes: default_lang_codes(),
            save_path: String::new(),
        }
    }
}

impl Config {
    /// 归档输出目录：未配置时落到工作目录下的 `downloads/`。
    pub fn default_save_dir(&self) -> PathBuf {
        let trimmed = self.save_path.trim();
        if trimmed.is_empty() {
            PathBuf::from("downloads")
        } else {
            PathBuf::from(trimmed)
        }
    }
}

impl ConfigSpec for Config {
    const FILE_NAME: &'static str = "config.yml";

    fn fields() -> &'static [FieldMeta] {
        static FIELDS: [FieldMeta; 4] = [
            FieldMeta {
                name: "max_workers",
                description: "页面下载工作池大小（进程级，启动后固定）",
            },
            FieldMeta {
                name: "request_timeout",
                description: "请求超时时间（秒）",
            },
            FieldMeta {
                name: "lang_codes",
                description: "章节语言过滤（站点 lang_code 列表）",
            },
            FieldMeta {
                name: "save_path",
                description: "归档保存目录（留空时使用 ./downloads）",
            },
        ];
        &FIELDS
    }
}

fn default_max_workers() -> usize {
    8
}

fn default_request_timeout() -> u64 {
    15
}

fn default_lang_codes() -> Vec<String> {
    vec!["gb".to_string(), "us".to_string()]
}

/// 清理文件名中各平台的非法字符，超长时按字符截断。
pub fn safe_fs_name(name: &str, replacement: &str, max_len: usize) -> String {
    let mut cleaned: String = name
        .chars()
        .map(|ch| match ch {
            ':' => '：',
            '"' => '\u{201c}',
            '<' => '《',
            '>' => '》',
            '/' | '\\' => '、',
            '|' => '｜',
            '?' => '？',
            '*' => '＊',
            c if (c as u32) < 32 => replacement.chars().next().unwrap_or('_'),
            _ => ch,
        })
        .collect();

    let trimmed = cleaned.trim();
    if trimmed.len() != cleaned.len() {
        cleaned = trimmed.to_string();
    }
    if cleaned.is_empty() {
        return replacement.to_string();
    }
    if cleaned.chars().count() > max_len {
        cleaned = cleaned.chars().take(max_len).collect();
    }
    cleaned
}
