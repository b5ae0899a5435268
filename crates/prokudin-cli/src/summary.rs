use std::path::{Path, PathBuf};

use console::Style;
use prokudin_core::io::export::ExportReport;
use prokudin_core::pipeline::config::ProjectConfig;
use prokudin_core::session::Session;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    ok: Style,
    failed: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            ok: Style::new().green(),
            failed: Style::new().red().bold(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_run_summary(inputs: &[&PathBuf; 3], output: &Path, config: &ProjectConfig) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Prokudin"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(8)));
    println!();

    for (i, path) in inputs.iter().enumerate() {
        println!(
            "  {:<14}{}",
            s.label.apply_to(format!("Channel {i}")),
            s.path.apply_to(path.display())
        );
    }
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(output.display())
    );
    println!();

    let align = &config.alignment;
    println!("  {}", s.header.apply_to("Alignment"));
    println!(
        "    {:<14}{}",
        s.label.apply_to("Features"),
        s.value.apply_to(align.max_features)
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Min matches"),
        s.value.apply_to(align.min_matches)
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("RANSAC"),
        s.value.apply_to(format!(
            "{} px, {} iterations",
            align.ransac.inlier_threshold, align.ransac.max_iterations
        ))
    );
    println!();

    println!("  {}", s.header.apply_to("Export"));
    println!(
        "    {:<14}{}",
        s.label.apply_to("Source"),
        s.value.apply_to(config.export.source)
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Suffixes"),
        s.value.apply_to(&config.export.naming)
    );
    println!();
}

pub fn print_alignment_summary(session: &Session) {
    let s = Styles::new();

    if let Some(err) = session.alignment_error() {
        println!(
            "  {:<14}{}",
            s.header.apply_to("Alignment"),
            s.failed.apply_to(err)
        );
        println!();
        return;
    }
    let reports = session.alignment_reports();
    if reports.is_empty() {
        return;
    }
    println!("  {}", s.header.apply_to("Alignment"));
    for r in reports {
        println!(
            "    {:<14}{}",
            s.label.apply_to(format!("Channel {}", r.channel)),
            s.value.apply_to(format!(
                "{}/{} inliers, {}",
                r.inliers, r.matches, r.transform
            ))
        );
    }
    println!();
}

pub fn print_export_report(report: &ExportReport) {
    let s = Styles::new();

    for outcome in &report.outcomes {
        match &outcome.error {
            None => println!(
                "  {} {}",
                s.ok.apply_to("\u{2713}"),
                s.path.apply_to(outcome.path.display())
            ),
            Some(e) => println!("  {} {}", s.failed.apply_to("\u{2717}"), e),
        }
    }
    println!();

    let style = if report.all_succeeded() {
        &s.ok
    } else {
        &s.failed
    };
    println!("  {}", style.apply_to(report.summary()));
}
