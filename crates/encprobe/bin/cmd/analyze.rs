use clap::Parser;
use colored::*;
use encprobe::analysis::{analyze, parse_report, Analysis};
use encprobe::Stage;
use eyre::{Result, WrapErr};
use prettytable::{color, Attr, Cell, Row, Table};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Parser)]
pub struct AnalyzeArgs {
    #[arg(help = "Timing report written by write_timing_report")]
    report: PathBuf,

    #[arg(long, help = "Only analyze pictures numbered below N")]
    frames: Option<u32>,

    #[arg(long, help = "Print the analysis as JSON")]
    json: bool,
}

impl AnalyzeArgs {
    pub fn run(&self) -> Result<()> {
        let text = fs::read_to_string(&self.report)
            .wrap_err_with(|| format!("failed to read {}", self.report.display()))?;
        let records = parse_report(&text)
            .wrap_err_with(|| format!("failed to parse {}", self.report.display()))?;

        let analysis = analyze(&records, self.frames);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&analysis)?);
            return Ok(());
        }

        if analysis.frames.is_empty() {
            println!("no timing records in {}", self.report.display());
            return Ok(());
        }

        frames_table(&analysis).printstd();
        println!();
        stages_table(&analysis).printstd();
        println!(
            "{} average latency: {:7.2}, max latency: {:7.2}, average CPU: {:7.2} ({} of {} frames averaged)",
            "[encprobe]".blue().bold(),
            analysis.avg_latency_ms,
            analysis.max_latency_ms,
            analysis.avg_cpu_ms,
            analysis.averaged_frames,
            analysis.frames.len()
        );
        Ok(())
    }
}

fn header(labels: &[&str]) -> Row {
    let use_colors = std::env::var("NO_COLOR").is_err();
    Row::new(
        labels
            .iter()
            .map(|label| {
                let cell = Cell::new(label).with_style(Attr::Bold);
                if use_colors {
                    cell.with_style(Attr::ForegroundColor(color::CYAN))
                } else {
                    cell
                }
            })
            .collect(),
    )
}

fn ms(value: f64) -> Cell {
    Cell::new(&format!("{value:.2}"))
}

fn frames_table(analysis: &Analysis) -> Table {
    let mut labels = vec!["POC", "Latency", "CPU"];
    labels.extend(Stage::ALL.iter().map(|stage| stage.name()));
    if let Some(frame) = analysis.frames.first() {
        labels.extend(frame.gaps.iter().map(|gap| gap.gap));
    }

    let mut table = Table::new();
    table.add_row(header(&labels));

    for frame in &analysis.frames {
        let mut cells = vec![
            Cell::new(&frame.work_id.to_string()),
            ms(frame.latency_ms),
            ms(frame.cpu_ms),
        ];
        cells.extend(Stage::ALL.iter().map(|stage| {
            frame
                .stages
                .iter()
                .find(|row| row.stage == *stage)
                .map_or_else(|| Cell::new("-"), |row| ms(row.latency_ms))
        }));
        cells.extend(frame.gaps.iter().map(|gap| ms(gap.ms)));
        table.add_row(Row::new(cells));
    }
    table
}

fn stages_table(analysis: &Analysis) -> Table {
    let mut table = Table::new();
    table.add_row(header(&[
        "Stage", "Avg latency", "Avg CPU", "Records", "P50", "P95", "P99",
    ]));

    for stage in analysis.stages.iter().filter(|s| s.records > 0) {
        table.add_row(Row::new(vec![
            Cell::new(stage.stage.name()),
            ms(stage.avg_latency_ms),
            ms(stage.avg_cpu_ms),
            Cell::new(&stage.records.to_string()),
            ms(stage.p50_ms),
            ms(stage.p95_ms),
            ms(stage.p99_ms),
        ]));
    }
    for gap in &analysis.gaps {
        table.add_row(Row::new(vec![
            Cell::new(gap.gap),
            ms(gap.ms),
            Cell::new("-"),
            Cell::new("-"),
            Cell::new("-"),
            Cell::new("-"),
            Cell::new("-"),
        ]));
    }
    table.add_row(Row::new(vec![
        Cell::new("overhead"),
        ms(analysis.avg_overhead_ms),
        Cell::new("-"),
        Cell::new("-"),
        Cell::new("-"),
        Cell::new("-"),
        Cell::new("-"),
    ]));
    table
}
