//! `trendpress run` - drive one generation job end to end

use anyhow::{anyhow, Result};
use comfy_table::Color;
use serde::Serialize;
use tracing::warn;
use trendpress::{endpoints, Guarded};
use trendpress_jobs::{GenerationJob, JobMode, JobStage, PipelineMetricsSnapshot};

use crate::cli::error::HelpfulError;
use crate::cli::output::{format_ratio, format_usd, print_json, print_table_colored};
use crate::cli::{block_on, require_keyword, CommandContext, CLI_CLIENT};

#[derive(Debug)]
pub struct RunArgs {
    /// Generate for this keyword instead of the trend feed
    pub keyword: Option<String>,
    pub category: Option<String>,
    /// Number of trending topics to process
    pub batch: Option<u32>,
    pub json: bool,
}

#[derive(Serialize)]
struct RunOutput<'a> {
    job: &'a GenerationJob,
    metrics: PipelineMetricsSnapshot,
}

pub fn run(args: RunArgs, ctx: &CommandContext) -> Result<()> {
    let keyword = args.keyword.as_deref().map(require_keyword).transpose()?;
    let runtime = ctx.runtime()?;
    let service = &runtime.service;

    let outcome = block_on(async {
        match (keyword, args.batch) {
            (Some(keyword), _) => {
                service
                    .run_manual(CLI_CLIENT, keyword, args.category.as_deref())
                    .await
            }
            (None, Some(count)) => service.run_batch(CLI_CLIENT, Some(count)).await,
            (None, None) => service.run_single(CLI_CLIENT).await,
        }
    })??;

    let id = match outcome {
        Guarded::Allowed(id) => id,
        Guarded::Limited(decision) => {
            return Err(
                HelpfulError::rate_limited(endpoints::START_JOB, decision.retry_after_seconds).into(),
            )
        }
    };
    let job = service
        .job(&id)
        .ok_or_else(|| anyhow!("Job {} disappeared before it could be reported", id))?;

    if let Err(e) = runtime.history.append(&job) {
        warn!("Failed to record job {} in history: {:#}", id, e);
    }

    if args.json {
        return print_json(&RunOutput {
            job: &job,
            metrics: service.metrics(),
        });
    }

    print_summary(&job, &service.metrics());
    if job.stage == JobStage::Error {
        let mut err = HelpfulError::new(format!("Job {} failed", id.short()))
            .with_context(job.errors.join("; "));
        if job.mode != JobMode::Manual {
            err = err.with_suggestion(format!(
                "TRY: Provide trend candidates in {}",
                runtime.signals_path.display()
            ));
        }
        return Err(err
            .with_suggestion("TRY: Generate for a specific keyword: trendpress run --keyword \"...\"")
            .into());
    }
    Ok(())
}

fn print_summary(job: &GenerationJob, metrics: &PipelineMetricsSnapshot) {
    println!(
        "Job {} ({}) finished: {} of {} succeeded",
        job.id.short(),
        job.mode,
        job.succeeded(),
        job.batch_total
    );

    if !job.results.is_empty() {
        println!();
        print_table_colored(
            &["Keyword", "Title", "Result"],
            job.results
                .iter()
                .map(|r| {
                    let (label, color) = if r.success {
                        ("stored", Color::Green)
                    } else {
                        ("failed", Color::Red)
                    };
                    vec![
                        (r.keyword.clone(), None),
                        (r.title.clone(), None),
                        (label.to_string(), Some(color)),
                    ]
                })
                .collect(),
        );
    }

    for error in &job.errors {
        println!("  ! {}", error);
    }

    println!();
    println!(
        "Stage: {}  Tokens: {} in / {} out  Cost: {}  Success: {}",
        job.stage,
        metrics.input_tokens,
        metrics.output_tokens,
        format_usd(metrics.cost_usd()),
        format_ratio(metrics.item_success_rate())
    );
}
