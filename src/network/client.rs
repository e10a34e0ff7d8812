//! 站点 API 的阻塞 HTTP 客户端。

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::base_system::context::Config;
use crate::download::models::{DownloadError, PageOutcome};

use super::models::{ChapterInfo, SeriesInfo};

/// 站点规范 origin，用于把服务器下发的相对图片路径补全成绝对 URL。
pub const SITE_ORIGIN: &str = "https://mangadex.org";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120 Safari/537.36";

#[derive(Debug, Clone)]
pub struct SiteClient {
    client: Client,
    origin: String,
}

impl SiteClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));

        let client = Client::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(config.request_timeout.max(1)))
            .build()?;

        Ok(Self {
            client,
            origin: SITE_ORIGIN.to_string(),
        })
    }

    /// 系列元数据：标题 + 章节目录。
    pub fn series_info(&self, series_id: &str) -> Result<SeriesInfo, DownloadError> {
        let url = format!("{}/api/?id={}&type=manga", self.origin, series_id);
        self.get_json(&url)
    }

    /// 章节元数据：图片服务器、哈希与页面文件名数组。
    pub fn chapter_info(&self, chapter_id: &str) -> Result<ChapterInfo, DownloadError> {
        let url = format!("{}/api/?id={}&type=chapter", self.origin, chapter_id);
        self.get_json(&url)
    }

    /// 单页图片 GET，按响应分类终态；不重试。
    pub fn get_page(&self, url: &str) -> PageOutcome {
        debug!(target: "network", url, "请求页面图片");
        let resp = match self
            .client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("image/*,*/*;q=0.8"))
            .send()
        {
            Ok(resp) => resp,
            Err(err) => return PageOutcome::Upstream(err.to_string()),
        };

        if resp.status().as_u16() == 404 {
            return PageOutcome::NotFound;
        }
        if !resp.status().is_success() {
            return PageOutcome::Upstream(format!("HTTP {}", resp.status()));
        }

        match resp.bytes() {
            Ok(bytes) => PageOutcome::Success(bytes.to_vec()),
            Err(err) => PageOutcome::Upstream(err.to_string()),
        }
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, DownloadError> {
        debug!(target: "network", url, "请求站点 API");
        let resp = self
            .client
            .get(url)
            .header(
                ACCEPT,
                HeaderValue::from_static("application/json, text/plain, */*"),
            )
            .send()
            .map_err(|err| DownloadError::Upstream(err.to_string()))?;

        if resp.status().as_u16() == 404 {
            return Err(DownloadError::NotFound);
        }
        let resp = resp
            .error_for_status()
            .map_err(|err| DownloadError::Upstream(err.to_string()))?;

        resp.json::<T>()
            .map_err(|err| DownloadError::Upstream(err.to_string()))
    }
}
