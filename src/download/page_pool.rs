//! 页面并发下载工作池。
//!
//! 固定大小、进程内长驻的工作线程池：每章的页面任务投入同一个池子，
//! 结果按页序号写回固定长度的槽位集合，与任务的完成顺序无关。
//! 池实例由调用方显式构造并注入，而不是进程级全局查找。

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;

use crossbeam_channel as channel;
use tracing::{debug, warn};

use super::fetcher::PageFetchFn;
use super::models::{
    ChapterManifest, DownloadError, PageOutcome, PageResult, PageSlots,
};
use super::progress::ProgressReporter;

struct PageJob {
    manifest: Arc<ChapterManifest>,
    index: usize,
    fetch: PageFetchFn,
    cancel: Arc<AtomicBool>,
    condemned: Arc<AtomicBool>,
    done: channel::Sender<PageResult>,
}

impl PageJob {
    fn run(self) {
        // 发起请求前先看两类标志：用户要求停止，或兄弟任务已判废本章。
        let outcome = if self.cancel.load(Ordering::Relaxed)
            || self.condemned.load(Ordering::Relaxed)
        {
            PageOutcome::Skipped
        } else {
            (self.fetch)(&self.manifest, &self.manifest.pages[self.index])
        };
        let _ = self.done.send(PageResult {
            index: self.index,
            outcome,
        });
    }
}

pub struct PageDownloadPool {
    tx: Option<channel::Sender<PageJob>>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl PageDownloadPool {
    /// `workers` 为进程启动时固定的并发上限。
    pub fn new(workers: usize) -> Self {
        let workers = workers.clamp(1, 32);
        let (tx, rx) = channel::unbounded::<PageJob>();

        let mut handles = Vec::with_capacity(workers);
        for n in 0..workers {
            let rx = rx.clone();
            handles.push(
                thread::Builder::new()
                    .name(format!("page-dl-{n}"))
                    .spawn(move || {
                        while let Ok(job) = rx.recv() {
                            job.run();
                        }
                    })
                    .expect("spawn page download worker"),
            );
        }

        Self {
            tx: Some(tx),
            handles,
        }
    }

    /// 下载一章的全部页面。
    ///
    /// 提交循环不等待任何单个任务；提交完成后在本线程阻塞汇合，
    /// 收满每页的终态才返回。第一个致命终态（404 / 未知类型 / 上游失败）
    /// 判废整章并置位本章的判废标志，已提交的兄弟任务据此短路；
    /// 失败时归档永远不会发生。`cancel` 是进程级停止标志，这里只读不写。
    pub fn download_pages(
        &self,
        fetch: PageFetchFn,
        manifest: &ChapterManifest,
        progress: &mut ProgressReporter,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<PageSlots, DownloadError> {
        if manifest.pages.is_empty() {
            return Err(DownloadError::NotFound);
        }

        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| DownloadError::Upstream("下载池已关闭".to_string()))?;

        let total = manifest.pages.len();
        let mut slots: PageSlots = vec![None; total];
        let cancel = cancel.unwrap_or_else(|| Arc::new(AtomicBool::new(false)));
        // 判废标志按章新建：致命终态只短路本章的兄弟任务，不触碰进程级停止标志
        let condemned = Arc::new(AtomicBool::new(false));
        let manifest = Arc::new(manifest.clone());
        let (done_tx, done_rx) = channel::bounded::<PageResult>(total);

        for page in &manifest.pages {
            let job = PageJob {
                manifest: Arc::clone(&manifest),
                index: page.index,
                fetch: Arc::clone(&fetch),
                cancel: Arc::clone(&cancel),
                condemned: Arc::clone(&condemned),
                done: done_tx.clone(),
            };
            if tx.send(job).is_err() {
                return Err(DownloadError::Upstream("下载池工作线程已退出".to_string()));
            }
        }
        drop(done_tx);

        let mut failure: Option<DownloadError> = None;
        for _ in 0..total {
            let result = done_rx
                .recv()
                .map_err(|_| DownloadError::Upstream("结果通道提前关闭".to_string()))?;

            if failure.is_none() {
                if let Some(err) = fatal_outcome(&manifest, &result) {
                    warn!(target: "download", index = result.index, "页面失败，整章判废: {err}");
                    condemned.store(true, Ordering::Relaxed);
                    failure = Some(err);
                }
            }

            // 每个任务独占一个槽位，只写一次
            let slot = &mut slots[result.index];
            debug_assert!(slot.is_none(), "slot written twice");
            *slot = Some(result);
            progress.inc_page();
        }

        if let Some(err) = failure {
            return Err(err);
        }
        // 无致命终态时，非成功的槽位只可能是被取消短路的任务
        if let Some(skipped) = slots.iter().flatten().find(|r| !r.outcome.is_success()) {
            debug!(target: "download", index = skipped.index, "下载被取消");
            return Err(DownloadError::Canceled);
        }

        Ok(slots)
    }
}

impl Drop for PageDownloadPool {
    fn drop(&mut self) {
        self.tx.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn fatal_outcome(manifest: &ChapterManifest, result: &PageResult) -> Option<DownloadError> {
    let filename = || manifest.pages[result.index].filename.clone();
    match &result.outcome {
        PageOutcome::NotFound => Some(DownloadError::PageMissing {
            index: result.index,
            filename: filename(),
        }),
        PageOutcome::UnknownMediaType => Some(DownloadError::UnknownMediaType {
            filename: filename(),
        }),
        PageOutcome::Upstream(msg) => Some(DownloadError::Upstream(msg.clone())),
        PageOutcome::Success(_) | PageOutcome::Skipped => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::models::PageDescriptor;
    use crate::download::progress::make_reporter;
    use std::time::{Duration, Instant};

    fn manifest(pages: &[&str]) -> ChapterManifest {
        ChapterManifest {
            hash: "h".to_string(),
            image_base_url: "https://img.example/".to_string(),
            pages: pages
                .iter()
                .enumerate()
                .map(|(index, filename)| PageDescriptor {
                    index,
                    filename: filename.to_string(),
                })
                .collect(),
        }
    }

    fn silent_reporter(total: usize) -> ProgressReporter {
        make_reporter(total, "test", Some(Box::new(|_| {})))
    }

    #[test]
    fn slots_follow_descriptor_order_not_completion_order() {
        let pool = PageDownloadPool::new(4);
        let manifest = manifest(&["a.jpg", "b.jpg", "c.jpg", "d.jpg", "e.jpg", "f.jpg"]);
        let total = manifest.pages.len();

        // 页序越靠前睡得越久，完成顺序与页序相反
        let fetch: PageFetchFn = Arc::new(move |_, page| {
            std::thread::sleep(Duration::from_millis(((total - page.index) * 15) as u64));
            PageOutcome::Success(vec![page.index as u8])
        });

        let mut progress = silent_reporter(total);
        let slots = pool
            .download_pages(fetch, &manifest, &mut progress, None)
            .unwrap();

        assert_eq!(slots.len(), total);
        for (index, slot) in slots.iter().enumerate() {
            let result = slot.as_ref().unwrap();
            assert_eq!(result.index, index);
            match &result.outcome {
                PageOutcome::Success(bytes) => assert_eq!(bytes, &vec![index as u8]),
                other => panic!("unexpected outcome at {index}: {other:?}"),
            }
        }
    }

    #[test]
    fn missing_page_fails_whole_chapter() {
        let pool = PageDownloadPool::new(2);
        let manifest = manifest(&["p0.jpg", "p1.png", "p2.jpg", "p3.jpg"]);
        let cancel = Arc::new(AtomicBool::new(false));

        // 致命页返回前置位 gate，其余页等 gate 后才返回，模拟仍在途的兄弟任务
        let gate = Arc::new(AtomicBool::new(false));
        let fetch: PageFetchFn = {
            let gate = Arc::clone(&gate);
            Arc::new(move |_, page| {
                if page.index == 1 {
                    gate.store(true, Ordering::Relaxed);
                    return PageOutcome::NotFound;
                }
                let deadline = Instant::now() + Duration::from_secs(2);
                while !gate.load(Ordering::Relaxed) && Instant::now() < deadline {
                    std::thread::sleep(Duration::from_millis(5));
                }
                PageOutcome::Success(vec![page.index as u8])
            })
        };

        let mut progress = silent_reporter(manifest.pages.len());
        let err = pool
            .download_pages(fetch, &manifest, &mut progress, Some(Arc::clone(&cancel)))
            .unwrap_err();

        match err {
            DownloadError::PageMissing { index, filename } => {
                assert_eq!(index, 1);
                assert_eq!(filename, "p1.png");
            }
            other => panic!("expected PageMissing, got {other:?}"),
        }
        // 判废只作用于本章，进程级停止标志保持原样
        assert!(!cancel.load(Ordering::Relaxed));
        // 汇合完成：每页都到达终态并上报过进度
        assert_eq!(progress.snapshot.pages_done, 4);
    }

    #[test]
    fn failed_chapter_does_not_poison_user_cancel() {
        let pool = PageDownloadPool::new(2);
        let cancel = Arc::new(AtomicBool::new(false));

        let failing: PageFetchFn = Arc::new(|_, page| {
            if page.index == 0 {
                PageOutcome::NotFound
            } else {
                PageOutcome::Success(vec![page.index as u8])
            }
        });
        let mut progress = silent_reporter(2);
        let err = pool
            .download_pages(
                failing,
                &manifest(&["p0.jpg", "p1.jpg"]),
                &mut progress,
                Some(Arc::clone(&cancel)),
            )
            .unwrap_err();
        assert!(matches!(err, DownloadError::PageMissing { index: 0, .. }));

        // 同一个停止标志接着用于下一章，下一章照常成功
        let ok: PageFetchFn = Arc::new(|_, page| PageOutcome::Success(vec![page.index as u8]));
        let mut progress = silent_reporter(2);
        let slots = pool
            .download_pages(ok, &manifest(&["q0.jpg", "q1.jpg"]), &mut progress, Some(cancel))
            .unwrap();
        assert!(slots.iter().flatten().all(|r| r.outcome.is_success()));
    }

    #[test]
    fn upstream_failure_aborts_chapter() {
        let pool = PageDownloadPool::new(2);
        let manifest = manifest(&["p0.jpg", "p1.jpg"]);

        let fetch: PageFetchFn = Arc::new(|_, page| {
            if page.index == 0 {
                PageOutcome::Upstream("HTTP 502 Bad Gateway".to_string())
            } else {
                PageOutcome::Success(vec![1])
            }
        });

        let mut progress = silent_reporter(2);
        let err = pool
            .download_pages(fetch, &manifest, &mut progress, None)
            .unwrap_err();
        assert!(matches!(err, DownloadError::Upstream(msg) if msg.contains("502")));
    }

    #[test]
    fn preset_cancel_skips_every_page() {
        let pool = PageDownloadPool::new(2);
        let manifest = manifest(&["p0.jpg", "p1.jpg"]);
        let cancel = Arc::new(AtomicBool::new(true));

        let fetch: PageFetchFn =
            Arc::new(|_, _| panic!("fetch must not run once cancel is set"));

        let mut progress = silent_reporter(2);
        let err = pool
            .download_pages(fetch, &manifest, &mut progress, Some(cancel))
            .unwrap_err();
        assert!(matches!(err, DownloadError::Canceled));
    }

    #[test]
    fn empty_manifest_is_rejected() {
        let pool = PageDownloadPool::new(1);
        let manifest = manifest(&[]);
        let fetch: PageFetchFn = Arc::new(|_, _| PageOutcome::Skipped);
        let mut progress = silent_reporter(0);
        assert!(matches!(
            pool.download_pages(fetch, &manifest, &mut progress, None),
            Err(DownloadError::NotFound)
        ));
    }

    #[test]
    fn pool_is_reusable_across_chapters() {
        let pool = PageDownloadPool::new(3);
        let fetch: PageFetchFn =
            Arc::new(|_, page| PageOutcome::Success(vec![page.index as u8]));

        for _ in 0..3 {
            let manifest = manifest(&["p0.jpg", "p1.jpg", "p2.jpg"]);
            let mut progress = silent_reporter(3);
            let slots = pool
                .download_pages(Arc::clone(&fetch), &manifest, &mut progress, None)
                .unwrap();
            assert_eq!(slots.len(), 3);
            assert!(slots.iter().flatten().all(|r| r.outcome.is_success()));
        }
    }
}
