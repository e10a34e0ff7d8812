//! 下载主流程编排。

use std::fs;
use std::path::PathBuf;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Instant;

use tracing::{error, info};

use crate::base_system::context::{Config, safe_fs_name};
use crate::network::client::SiteClient;

use super::archive;
use super::fetcher::PageFetcher;
use super::models::{ChapterManifest, DownloadError, DownloadResult, ProgressSnapshot};
use super::page_pool::PageDownloadPool;
use super::plan::{ChapterRef, SeriesPlan};
use super::progress::make_reporter;
use super::resolver;

pub type ProgressCallback = Box<dyn FnMut(ProgressSnapshot) + Send>;

/// 下载单个章节并组装归档，返回归档路径。
///
/// `prefetched` 允许调用方复用已经解析好的清单（例如直接下载单章时
/// 入口已经解析过一次），避免重复的网络往返。
#[allow(clippy::too_many_arguments)]
pub fn download_chapter(
    client: &SiteClient,
    pool: &PageDownloadPool,
    config: &Config,
    series_title: &str,
    chapter: &ChapterRef,
    prefetched: Option<ChapterManifest>,
    progress_cb: Option<ProgressCallback>,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<PathBuf, DownloadError> {
    let start = Instant::now();
    let manifest = match prefetched {
        Some(manifest) => manifest,
        None => resolver::resolve(client, &chapter.id)?,
    };

    info!(
        target: "download",
        chapter = %chapter.chapter,
        pages = manifest.pages.len(),
        "开始下载章节"
    );

    let mut reporter = make_reporter(manifest.pages.len(), &chapter.chapter, progress_cb);
    let fetcher = PageFetcher::new(client.clone());
    let outcome = pool.download_pages(fetcher.fetch_fn(), &manifest, &mut reporter, cancel);
    reporter.finish();
    let slots = outcome?;

    let path = archive_path(config, series_title, chapter)?;
    archive::assemble(&path, &manifest, slots)?;

    info!(
        target: "download",
        chapter = %chapter.chapter,
        "章节下载完成，用时 {:.1}s",
        start.elapsed().as_secs_f32()
    );
    Ok(path)
}

/// 按目录顺序下载整个系列；单章失败不影响其余章节。
pub fn download_series(
    client: &SiteClient,
    pool: &PageDownloadPool,
    config: &Config,
    plan: &SeriesPlan,
    cancel: Option<Arc<AtomicBool>>,
) -> DownloadResult {
    let start = Instant::now();
    info!(
        target: "download",
        series_id = %plan.series_id,
        "开始下载：{} ({} 章)",
        plan.title,
        plan.chapters.len()
    );

    let mut result = DownloadResult::default();
    for chapter in &plan.chapters {
        if cancel
            .as_ref()
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(false)
        {
            info!(target: "download", "收到停止信号，结束任务");
            result.canceled += 1;
            break;
        }

        // 可用性检查：不可用（空目录或清单获取失败）的章节跳过，不算失败
        if !resolver::available(client, &chapter.id) {
            info!(target: "download", chapter = %chapter.chapter, "章节不可用，跳过");
            continue;
        }

        match download_chapter(
            client,
            pool,
            config,
            &plan.title,
            chapter,
            None,
            None,
            cancel.clone(),
        ) {
            Ok(path) => {
                info!(target: "download", "已保存到 {}", path.display());
                result.success += 1;
            }
            Err(DownloadError::NotFound) => {
                // 可用性检查之后目录才清空的罕见竞争，同样按跳过处理
                info!(target: "download", chapter = %chapter.chapter, "章节暂无页面，跳过");
            }
            Err(DownloadError::Canceled) => {
                result.canceled += 1;
                break;
            }
            Err(err) => {
                error!(target: "download", chapter = %chapter.chapter, "章节下载失败: {err}");
                result.failed += 1;
            }
        }
    }

    info!(
        "下载完成：{} 成功 {} 章，失败 {} 章，取消 {} 章，用时 {:.1}s",
        plan.title,
        result.success,
        result.failed,
        result.canceled,
        start.elapsed().as_secs_f32()
    );
    result
}

fn archive_path(
    config: &Config,
    series_title: &str,
    chapter: &ChapterRef,
) -> Result<PathBuf, DownloadError> {
    let save_dir = config.default_save_dir();
    fs::create_dir_all(&save_dir)?;

    let series = safe_fs_name(series_title, "_", 120);
    let label = safe_fs_name(&chapter.chapter, "_", 40);
    Ok(save_dir.join(format!("{series} c{label}.zip")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_path_sanitizes_names() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            save_path: dir.path().to_string_lossy().to_string(),
            ..Config::default()
        };
        let chapter = ChapterRef {
            id: "1".to_string(),
            chapter: "001-013".to_string(),
            title: None,
            group: None,
            lang_code: "gb".to_string(),
        };

        let path = archive_path(&config, "Some/Series: B", &chapter).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            "Some、Series： B c001-013.zip"
        );
        assert!(path.parent().unwrap().exists());
    }
}
