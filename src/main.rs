//! Mangadex 章节下载器。
//!
//! 本 crate 负责：配置加载、系列/章节链接解析、页面并发下载与归档导出。
//!
//! 代码结构（读代码入口）：
//! - `base_system`：配置/日志/链接解析等基础设施
//! - `network`：站点 API 客户端与响应模型
//! - `download`：下载流程（清单解析、页面工作池、进度、归档）

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

mod base_system;
mod download;
mod network;

use base_system::chapter_url;
use base_system::config::load_or_create;
use base_system::context::Config;
use base_system::logging::{LogOptions, LogSystem};
use download::downloader;
use download::page_pool::PageDownloadPool;
use network::client::SiteClient;
use tracing::info;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "mangadex-downloader")]
#[command(about = "Mangadex chapter downloader")]
struct Cli {
    /// 系列或章节链接（纯数字输入按章节 ID 处理）
    url: Option<String>,

    /// 只列出章节目录，不下载
    #[arg(long, default_value_t = false)]
    list: bool,

    /// 覆盖配置中的归档保存目录
    #[arg(long)]
    output: Option<String>,

    /// 覆盖配置中的工作池大小
    #[arg(long)]
    workers: Option<usize>,

    /// 启用调试日志输出
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// 显示版本信息后退出
    #[arg(long, default_value_t = false)]
    version: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("Mangadex Downloader v{VERSION}");
        return Ok(());
    }
    let Some(url) = cli.url else {
        return Err(anyhow!("缺少系列或章节链接，--help 查看用法"));
    };

    let _log = LogSystem::init(LogOptions {
        debug: cli.debug,
        ..LogOptions::default()
    })
    .map_err(|e| anyhow!(e))?;

    let mut config = load_or_create::<Config>(None).map_err(|e| anyhow!(e.to_string()))?;
    if let Some(output) = cli.output {
        config.save_path = output;
    }
    if let Some(workers) = cli.workers {
        config.max_workers = workers.max(1);
    }

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        ctrlc::set_handler(move || {
            if cancel.swap(true, Ordering::Relaxed) {
                // 第二次 Ctrl-C 直接退出
                std::process::exit(130);
            }
            eprintln!("收到停止信号，等待在途页面收尾…");
        })
        .context("install ctrl-c handler")?;
    }

    let client = SiteClient::new(&config)?;
    let pool = PageDownloadPool::new(config.max_workers);
    info!(target: "startup", version = VERSION, workers = config.max_workers, "启动完成");

    if let Some(chapter_id) = chapter_url::parse_chapter_id(&url) {
        let (series_title, chapter) = download::plan::chapter_ref_for(&client, &chapter_id)
            .with_context(|| format!("resolve chapter {chapter_id}"))?;
        // 先解析清单，再把它作为预取参数传给下载，避免重复往返
        let manifest = download::resolver::resolve(&client, &chapter.id)
            .with_context(|| format!("resolve pages for chapter {chapter_id}"))?;
        let path = downloader::download_chapter(
            &client,
            &pool,
            &config,
            &series_title,
            &chapter,
            Some(manifest),
            None,
            Some(cancel),
        )?;
        info!("已保存到 {}", path.display());
        return Ok(());
    }

    let Some(series_id) = chapter_url::parse_series_id(&url) else {
        return Err(anyhow!("无法从输入中识别系列或章节 ID: {url}"));
    };
    let plan = download::plan::prepare_series_plan(&client, &config, &series_id)
        .with_context(|| format!("resolve series {series_id}"))?;

    if cli.list {
        println!("{} （{} 章）", plan.title, plan.chapters.len());
        for chapter in &plan.chapters {
            let title = chapter.title.as_deref().unwrap_or("-");
            let group = chapter.group.as_deref().unwrap_or("-");
            println!("  c{:<8} [{}] {} ({})", chapter.chapter, chapter.lang_code, title, group);
        }
        return Ok(());
    }

    let result = downloader::download_series(&client, &pool, &config, &plan, Some(cancel));
    if result.failed > 0 {
        return Err(anyhow!("{} 章下载失败，详情见日志", result.failed));
    }
    Ok(())
}
