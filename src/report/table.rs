//! Console summary of a sweep.

use crate::bench::harness::SweepReport;
use crate::core::{BenchmarkRecord, HostInfo, RecordStatus};

/// Human-readable duration for a value in milliseconds.
pub fn format_ms(value: f64) -> String {
    if value >= 1000.0 {
        format!("{:.2}s", value / 1000.0)
    } else if value >= 10.0 {
        format!("{:.0}ms", value)
    } else {
        format!("{:.3}ms", value)
    }
}

/// Render one Markdown table row per sweep point, grouped in sweep order.
/// Job counts above the host's logical cores are starred.
pub fn render_table(report: &SweepReport, host: &HostInfo) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "## rectquad sweep `{}`\n\n",
        report.sweep_id.get(..12).unwrap_or(&report.sweep_id)
    ));
    out.push_str(&format!(
        "| | |\n|---|---|\n\
         | **Integrand** | `{}` |\n\
         | **Interval** | [{}, {}] |\n\
         | **Repetitions** | {} (+{} warmup) |\n\n",
        report.integrand,
        report.a,
        report.b,
        report.run_config.measured_iterations,
        report.run_config.warmup_iterations
    ));

    out.push_str("| Backend | Jobs | n_iter | Value | Mean | Stddev | Speedup |\n");
    out.push_str("|---------|------|--------|-------|------|--------|---------|\n");
    let mut oversubscribed = false;
    for c in &report.configs {
        let backend = c.point.backend;
        let jobs = if host.oversubscribed(backend.n_jobs) {
            oversubscribed = true;
            format!("{}*", backend.n_jobs)
        } else {
            backend.n_jobs.to_string()
        };
        match (&c.error, &c.stats) {
            (None, Some(stats)) => {
                out.push_str(&format!(
                    "| {} | {} | {} | {:.6} | {} | {} | {} |\n",
                    backend.kind,
                    jobs,
                    c.point.n_iter,
                    c.value.unwrap_or(f64::NAN),
                    format_ms(stats.mean_ms),
                    stats.stddev_ms.map(format_ms).unwrap_or_else(|| "-".to_string()),
                    report
                        .speedup_of(c)
                        .map(|s| format!("{:.2}x", s))
                        .unwrap_or_else(|| "-".to_string()),
                ));
            }
            (err, _) => {
                out.push_str(&format!(
                    "| {} | {} | {} | FAILED | - | - | - |\n",
                    backend.kind, jobs, c.point.n_iter
                ));
                if let Some(e) = err {
                    out.push_str(&format!("|   | | | `{}` | | | |\n", e.replace('|', "/")));
                }
            }
        }
    }

    if oversubscribed {
        out.push_str(&format!(
            "\n`*` more jobs than the {} logical cores on this host\n",
            host.logical_cores
        ));
    }
    let failed = report.failures().count();
    if failed > 0 {
        out.push_str(&format!("\n{} of {} points failed\n", failed, report.configs.len()));
    }
    out
}

/// Stored records, one row each, in file order. Each record's job count is
/// starred against the host it was measured on.
pub fn render_records(records: &[BenchmarkRecord]) -> String {
    if records.is_empty() {
        return "No matching records.\n".to_string();
    }
    let mut out = String::new();
    out.push_str("| Sweep | Timestamp | Integrand | Backend | Jobs | n_iter | Mean | Speedup | Status |\n");
    out.push_str("|-------|-----------|-----------|---------|------|--------|------|---------|--------|\n");
    for r in records {
        let star = if r.host.oversubscribed(r.backend.n_jobs) { "*" } else { "" };
        let status = match r.status {
            RecordStatus::Ok => "ok".to_string(),
            RecordStatus::Failed => format!(
                "failed: {}",
                r.error.as_deref().unwrap_or("unknown").replace('|', "/")
            ),
        };
        out.push_str(&format!(
            "| {} | {} | {} | {} | {}{} | {} | {} | {} | {} |\n",
            r.sweep_id.get(..12).unwrap_or(&r.sweep_id),
            r.timestamp,
            r.integrand,
            r.backend.kind,
            r.backend.n_jobs,
            star,
            r.n_iter,
            r.stats.as_ref().map(|s| format_ms(s.mean_ms)).unwrap_or_else(|| "-".to_string()),
            r.speedup.map(|s| format!("{:.2}x", s)).unwrap_or_else(|| "-".to_string()),
            status,
        ));
    }
    out
}
