//! Statistics for crawl runs and snapshot files
//!
//! This module provides functionality for summarizing snapshots and
//! displaying crawl reports on stdout.

use crate::crawler::{CrawlReport, QueryStatus};
use crate::store::InstitutionRecord;
use std::collections::BTreeMap;

/// Aggregate view of a snapshot file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotSummary {
    /// Total number of records
    pub total: usize,

    /// Records per `type` tag (`"N/A"` when absent)
    pub by_type: BTreeMap<String, usize>,

    /// Records per `state` (`"N/A"` when absent)
    pub by_state: BTreeMap<String, usize>,

    /// Records per query that first surfaced them
    pub by_query: BTreeMap<String, usize>,
}

/// Summarizes a list of records
pub fn summarize(records: &[InstitutionRecord]) -> SnapshotSummary {
    let mut summary = SnapshotSummary {
        total: records.len(),
        ..SnapshotSummary::default()
    };

    for record in records {
        let kind = record.kind.clone().unwrap_or_else(|| "N/A".to_string());
        *summary.by_type.entry(kind).or_default() += 1;

        let state = record.state.clone().unwrap_or_else(|| "N/A".to_string());
        *summary.by_state.entry(state).or_default() += 1;

        *summary
            .by_query
            .entry(record.query_found.clone())
            .or_default() += 1;
    }

    summary
}

/// Prints a snapshot summary to stdout, largest groups first
pub fn print_summary(summary: &SnapshotSummary, sample: &[InstitutionRecord]) {
    println!("=== Snapshot Summary ===\n");
    println!("Total institutions: {}", summary.total);

    print_group("By type", &summary.by_type, summary.total);
    print_group("By state", &summary.by_state, summary.total);

    if !sample.is_empty() {
        println!("\nSample institutions:");
        for (i, record) in sample.iter().enumerate() {
            let name: String = record.name.chars().take(40).collect();
            println!(
                "  {:2}. {} [{}]",
                i + 1,
                name,
                record.kind.as_deref().unwrap_or("N/A")
            );
        }
    }
}

fn print_group(title: &str, counts: &BTreeMap<String, usize>, total: usize) {
    if counts.is_empty() {
        return;
    }

    println!("\n{}:", title);
    let mut sorted: Vec<_> = counts.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    for (key, count) in sorted {
        let percentage = if total > 0 {
            (*count as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", key, count, percentage);
    }
}

/// Prints the statistics of a finished crawl to stdout
pub fn print_report(report: &CrawlReport) {
    let stats = &report.stats;

    println!("=== Crawl Statistics ===\n");
    println!("Requests:");
    println!("  Total: {}", stats.total_requests);
    println!("  Successful: {}", stats.successful_requests);
    println!("  Rate limited: {}", stats.rate_limited);
    println!("  Errors: {}", stats.errors);
    println!();

    println!("Records:");
    println!("  Found: {}", stats.total_found);
    println!("  Unique saved: {}", stats.institutions_saved);
    println!("  Filtered out: {}", stats.filtered_out);
    println!("  Duplicates removed: {}", stats.duplicates_removed);
    println!();

    println!("Queries:");
    println!(
        "  Completed: {}",
        report.count_status(QueryStatus::Completed)
    );
    println!("  Hit offset cap: {}", stats.max_offset_reached);
    println!("  Skipped (too long): {}", stats.queries_skipped);
    if report.interrupted {
        println!(
            "  Interrupted: {}",
            report.count_status(QueryStatus::Interrupted)
        );
    }
    if report.failed_tasks > 0 {
        println!("  Failed tasks: {}", report.failed_tasks);
    }
    println!();

    let secs = report.elapsed.as_secs_f64();
    println!("Elapsed: {:.1}s", secs);
    if secs > 0.0 {
        println!(
            "Speed: {:.0} institutions/minute",
            stats.institutions_saved as f64 / secs * 60.0
        );
    }

    match &report.final_write_error {
        None if report.records_written > 0 => println!(
            "Saved {} unique institutions to {}",
            report.records_written,
            report.output_path.display()
        ),
        None => println!("No institutions found; nothing written"),
        Some(e) => println!(
            "FAILED to save results to {}: {}",
            report.output_path.display(),
            e
        ),
    }
}
