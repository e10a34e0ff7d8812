//! 章节清单解析。
//!
//! 单次网络往返拿到章节元数据，整理成不可变的 [`ChapterManifest`]；
//! 不做任何重试，失败直接向调用方传播。

use tracing::debug;

use crate::network::client::{SITE_ORIGIN, SiteClient};
use crate::network::models::ChapterInfo;

use super::models::{ChapterManifest, DownloadError, PageDescriptor};

/// 解析章节的页面清单。页面列表为空视同章节不存在。
pub fn resolve(client: &SiteClient, chapter_id: &str) -> Result<ChapterManifest, DownloadError> {
    let info = client.chapter_info(chapter_id)?;
    let manifest = manifest_from_info(info)?;
    debug!(target: "download", chapter_id, pages = manifest.pages.len(), "章节清单解析完成");
    Ok(manifest)
}

/// 章节是否有可下载页面；空目录和解析失败都按"不可用"处理，不报错。
pub fn available(client: &SiteClient, chapter_id: &str) -> bool {
    client
        .chapter_info(chapter_id)
        .map(|info| has_pages(&info))
        .unwrap_or(false)
}

pub(crate) fn has_pages(info: &ChapterInfo) -> bool {
    !info.page_array.is_empty()
}

pub(crate) fn manifest_from_info(info: ChapterInfo) -> Result<ChapterManifest, DownloadError> {
    if !has_pages(&info) {
        return Err(DownloadError::NotFound);
    }

    let pages = info
        .page_array
        .into_iter()
        .enumerate()
        .map(|(index, filename)| PageDescriptor { index, filename })
        .collect();

    Ok(ChapterManifest {
        hash: info.hash,
        image_base_url: normalize_image_base(&info.server),
        pages,
    })
}

/// 服务器下发的相对路径（`/data/...`）补全为站点绝对 URL，其余原样使用。
fn normalize_image_base(server: &str) -> String {
    if server.starts_with("/data/") {
        format!("{SITE_ORIGIN}{server}")
    } else {
        server.to_string()
    }
}
