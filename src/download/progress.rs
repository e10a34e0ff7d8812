//! 进度上报与 CLI 进度条管理。

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::models::ProgressSnapshot;

pub(crate) struct ProgressReporter {
    pub(crate) snapshot: ProgressSnapshot,
    cb: Option<Box<dyn FnMut(ProgressSnapshot) + Send>>, // optional UI callback
    bar: Option<ProgressBar>,
}

impl ProgressReporter {
    fn emit(&mut self) {
        if let Some(cb) = self.cb.as_mut() {
            cb(self.snapshot);
        }
    }

    /// 每页终态（成功或失败）恰好调用一次；计数只增不减。
    pub(crate) fn inc_page(&mut self) {
        if self.snapshot.page_total == 0 {
            return;
        }
        self.snapshot.pages_done = (self.snapshot.pages_done + 1).min(self.snapshot.page_total);
        if let Some(bar) = self.bar.as_ref() {
            bar.inc(1);
        }
        self.emit();
    }

    pub(crate) fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.finish();
    }
}

pub(crate) fn make_reporter(
    total: usize,
    label: &str,
    cb: Option<Box<dyn FnMut(ProgressSnapshot) + Send>>,
) -> ProgressReporter {
    let use_cli_bar = cb.is_none() && total > 0;

    let bar = if use_cli_bar {
        let style = ProgressStyle::with_template(
            "{prefix} [{elapsed_precise}] {wide_bar} {pos}/{len} ({eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        let bar = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stderr());
        bar.set_style(style);
        bar.set_prefix(format!("页面下载 {label}"));
        Some(bar)
    } else {
        None
    };

    let mut reporter = ProgressReporter {
        snapshot: ProgressSnapshot {
            pages_done: 0,
            page_total: total,
        },
        cb,
        bar,
    };
    reporter.emit();
    reporter
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn page_count_is_monotone_and_clamped() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut reporter = make_reporter(
            2,
            "c1",
            Some(Box::new(move |snap| {
                sink.lock().unwrap().push(snap.pages_done);
            })),
        );

        reporter.inc_page();
        reporter.inc_page();
        // 超额 tick 被钳制，不会超过总数
        reporter.inc_page();

        assert_eq!(reporter.snapshot.pages_done, 2);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[0, 1, 2, 2]);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }
}
