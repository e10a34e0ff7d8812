//! 单页抓取与媒体类型校验。

use std::sync::Arc;

use crate::network::client::SiteClient;

use super::models::{ChapterManifest, PageDescriptor, PageOutcome};

/// 已知图片类型表；表外扩展名在发请求之前直接判废。
const KNOWN_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "avif"];

/// 工作池任务使用的抓取入口，测试中可替换为合成实现。
pub type PageFetchFn =
    Arc<dyn Fn(&ChapterManifest, &PageDescriptor) -> PageOutcome + Send + Sync>;

pub fn media_type_known(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(stem, ext)| {
            !stem.is_empty() && KNOWN_IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
        })
        .unwrap_or(false)
}

#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: SiteClient,
}

impl PageFetcher {
    pub fn new(client: SiteClient) -> Self {
        Self { client }
    }

    /// 抓一页并分类终态。扩展名校验发生在请求之前。
    pub fn fetch(&self, manifest: &ChapterManifest, page: &PageDescriptor) -> PageOutcome {
        if !media_type_known(&page.filename) {
            return PageOutcome::UnknownMediaType;
        }
        self.client.get_page(&manifest.page_url(page))
    }

    pub fn fetch_fn(&self) -> PageFetchFn {
        let fetcher = self.clone();
        Arc::new(move |manifest, page| fetcher.fetch(manifest, page))
    }
}
