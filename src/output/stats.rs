//! Harvest statistics display
//!
//! Renders a [`HarvestReport`] for the terminal.

use crate::output::report::HarvestReport;

/// Formats the failure section: per-stage counts, then up to `max_failures` entries
pub fn failure_lines(report: &HarvestReport, max_failures: usize) -> Vec<String> {
    let failures = &report.failures;
    if failures.is_empty() {
        return Vec::new();
    }

    let mut lines = vec![format!("Failures ({}):", failures.total())];
    for (stage, count) in failures.counts() {
        lines.push(format!("  {}: {}", stage, count));
    }

    let mut shown = 0u64;
    for failure in failures.iter().take(max_failures) {
        lines.push(format!(
            "  - [{}] {}: {}",
            failure.stage, failure.url, failure.message
        ));
        shown += 1;
    }
    if failures.total() > shown {
        lines.push(format!("  ... {} more", failures.total() - shown));
    }
    lines
}

/// Prints a report to stdout in a formatted manner
///
/// # Arguments
///
/// * `report` - The report to display
/// * `max_failures` - How many individual failures to list
pub fn print_report(report: &HarvestReport, max_failures: usize) {
    println!("=== Harvest Report: {} ===\n", report.retailer);

    println!("Discovery:");
    println!("  Pages visited: {}", report.pages_visited);
    println!("  Product URLs discovered: {}", report.products_discovered);
    println!();

    println!("Downloads:");
    println!("  Products processed: {}", report.products_processed);
    println!("  Images written: {}", report.images_written);
    println!("  Swatches skipped: {}", report.swatches_skipped);
    if report.duplicates_skipped > 0 {
        println!("  Repeated images skipped: {}", report.duplicates_skipped);
    }
    if report.unnamed_skipped > 0 {
        println!("  Unnamed images skipped: {}", report.unnamed_skipped);
    }
    println!();

    let failure_section = failure_lines(report, max_failures);
    if !failure_section.is_empty() {
        for line in &failure_section {
            println!("{}", line);
        }
        println!();
    }

    if let Some(seconds) = report.duration_seconds() {
        println!("Duration: {}s", seconds);
    }

    if report.cancelled {
        println!("Status: cancelled");
    } else if report.failures.is_empty() {
        println!("Status: complete");
    } else {
        println!("Status: complete with failures");
    }
}
