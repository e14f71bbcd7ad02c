//! Presentation of test progress and the final verdict.
//!
//! Banners go to stdout, logs to stderr. With `--json` the banners are
//! suppressed and a single report document is printed at the end.

mod context;

pub use context::{Banner, OutputContext, OutputMode};

use crate::runner::{CaseOutcome, Observer, Report};

/// Observer that prints a banner per test case.
#[derive(Debug, Clone, Copy)]
pub struct BannerObserver<'a> {
    ctx: &'a OutputContext,
}

impl<'a> BannerObserver<'a> {
    #[must_use]
    pub const fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }
}

impl Observer for BannerObserver<'_> {
    fn case_started(&self, label: &str) {
        self.ctx
            .banner(Banner::Runs, &format!("Snapshot testing {label}"));
    }

    fn case_finished(&self, outcome: &CaseOutcome) {
        let Some(err) = outcome.error() else {
            return;
        };
        self.ctx.banner(
            Banner::Fail,
            &format!("{} {}", outcome.label(), err.summary()),
        );
        if let crate::error::SnapError::SnapshotMismatch { diff, .. } = err {
            self.ctx.detail(diff);
        }
        if let Some(hint) = err.suggestion() {
            self.ctx.detail(&format!("  hint: {hint}"));
        }
    }
}

/// Print the aggregate verdict (or the JSON report).
pub fn print_summary(ctx: &OutputContext, report: &Report) {
    if ctx.is_json() {
        ctx.json_pretty(&report.to_json());
        return;
    }
    ctx.banner(
        if report.all_passed() {
            Banner::Pass
        } else {
            Banner::Fail
        },
        &summary_message(report),
    );
}

/// One-line aggregate message.
#[must_use]
pub fn summary_message(report: &Report) -> String {
    let total = report.outcomes.len();
    if report.all_passed() {
        let updated = report.outcomes.iter().filter(|o| o.updated).count();
        if updated > 0 {
            format!("{updated} snapshot(s) updated")
        } else {
            format!("All {total} snapshot test(s) passed")
        }
    } else {
        let failed = total - report.passed_count();
        format!("{failed} of {total} snapshot test(s) failed")
    }
}
