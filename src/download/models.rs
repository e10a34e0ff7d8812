//! 下载相关的数据模型定义。
//!
//! 包含页面描述、章节清单、页面结果槽位、下载结果与进度快照等核心数据结构。

use thiserror::Error;

/// 章节内单页的描述：序号 + 服务器侧文件名。
///
/// `index` 从 0 开始、连续且唯一；清单中的顺序即最终归档内的页序。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDescriptor {
    pub index: usize,
    pub filename: String,
}

/// 一次下载调用解析出的章节清单，构造后不再修改。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterManifest {
    pub hash: String,
    pub image_base_url: String,
    pub pages: Vec<PageDescriptor>,
}

impl ChapterManifest {
    /// 拼出单页图片的完整 URL：`{base}{hash}/{filename}`。
    pub fn page_url(&self, page: &PageDescriptor) -> String {
        format!("{}{}/{}", self.image_base_url, self.hash, page.filename)
    }
}

/// 单页抓取的终态。
#[derive(Debug, Clone)]
pub enum PageOutcome {
    Success(Vec<u8>),
    /// 上游返回 404：整章判废，不产出截断的归档。
    NotFound,
    /// 文件名扩展名不在已知图片类型表内，未发起请求。
    UnknownMediaType,
    Upstream(String),
    /// 停止或判废标志已置位，任务未发起请求直接收尾。
    Skipped,
}

impl PageOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PageOutcome::Success(_))
    }
}

/// 每页恰好写入槽位一次，绝不覆盖。
#[derive(Debug, Clone)]
pub struct PageResult {
    pub index: usize,
    pub outcome: PageOutcome,
}

/// 固定长度、按页序号寻址的结果槽位集合。
pub type PageSlots = Vec<Option<PageResult>>;

#[derive(Debug, Default, Clone, Copy)]
pub struct DownloadResult {
    pub success: u32,
    pub failed: u32,
    pub canceled: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressSnapshot {
    pub pages_done: usize,
    pub page_total: usize,
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("章节不存在或页面列表为空")]
    NotFound,
    #[error("页面 {filename} 上游缺失 (HTTP 404)")]
    PageMissing { index: usize, filename: String },
    #[error("无法识别的图片类型: {filename}")]
    UnknownMediaType { filename: String },
    #[error("上游请求失败: {0}")]
    Upstream(String),
    #[error("页面槽位 {index} 未完成，归档被拒绝")]
    IncompleteChapter { index: usize },
    #[error("下载已取消")]
    Canceled,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}
