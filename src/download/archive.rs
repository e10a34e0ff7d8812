//! 章节归档组装。
//!
//! 把填满的页面槽位按序号顺序写成单个 zip，条目名用页面原始文件名。

use std::fs::File;
use std::io::Write;
use std::path::Path;

use tracing::info;
use zip::CompressionMethod;
use zip::write::FileOptions;

use super::models::{ChapterManifest, DownloadError, PageOutcome, PageResult, PageSlots};

/// 组装章节归档。
///
/// 槽位必须全部是成功终态：工作池汇合收满每页后才会走到这里，
/// 未填充或非成功的槽位直接拒绝整次组装，不落半截的归档文件。
pub fn assemble(
    path: &Path,
    manifest: &ChapterManifest,
    slots: PageSlots,
) -> Result<(), DownloadError> {
    let pages = collect_pages(slots)?;

    let file = File::create(path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (page, bytes) in manifest.pages.iter().zip(&pages) {
        zip.start_file(page.filename.as_str(), options)?;
        zip.write_all(bytes)?;
    }
    zip.finish()?;

    info!(target: "download", path = %path.display(), pages = pages.len(), "归档完成");
    Ok(())
}

/// 先整体校验再写盘，避免中途失败留下残缺文件。
fn collect_pages(slots: PageSlots) -> Result<Vec<Vec<u8>>, DownloadError> {
    let mut pages = Vec::with_capacity(slots.len());
    for (index, slot) in slots.into_iter().enumerate() {
        match slot {
            Some(PageResult {
                outcome: PageOutcome::Success(bytes),
                ..
            }) => pages.push(bytes),
            _ => return Err(DownloadError::IncompleteChapter { index }),
        }
    }
    Ok(pages)
}
