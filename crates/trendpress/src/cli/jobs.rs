//! `trendpress jobs` - inspect and prune the job history

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use trendpress::JobHistory;
use trendpress_jobs::GenerationJob;

use crate::cli::error::HelpfulError;
use crate::cli::output::{format_ago, print_json, print_table_colored, stage_color};
use crate::cli::CommandContext;

#[derive(Debug)]
pub struct JobsArgs {
    /// Show one job (full id or unique prefix)
    pub id: Option<String>,
    /// Remove one job (full id or unique prefix)
    pub dismiss: Option<String>,
    pub clear: bool,
    pub limit: usize,
    pub json: bool,
}

#[derive(Serialize)]
struct PruneOutput {
    removed: usize,
}

pub fn run(args: JobsArgs, ctx: &CommandContext) -> Result<()> {
    let history = JobHistory::new(
        ctx.config.paths.history_path(&ctx.home),
        ctx.config.jobs.history_limit,
    );

    if args.clear {
        let removed = history.clear()?;
        return report_prune(removed, args.json);
    }

    if let Some(prefix) = &args.dismiss {
        let job = resolve(&history.load()?, prefix)?;
        let removed = usize::from(history.remove(&job.id)?);
        return report_prune(removed, args.json);
    }

    let jobs = history.load()?;

    if let Some(prefix) = &args.id {
        let job = resolve(&jobs, prefix)?;
        if args.json {
            return print_json(&job);
        }
        print_detail(&job);
        return Ok(());
    }

    // newest first
    let recent: Vec<&GenerationJob> = jobs.iter().rev().take(args.limit).collect();
    if args.json {
        return print_json(&recent);
    }
    if recent.is_empty() {
        println!("No jobs recorded yet. Start one with: trendpress run");
        return Ok(());
    }

    let now = Utc::now();
    print_table_colored(
        &["ID", "Mode", "Stage", "Progress", "Keyword", "Started"],
        recent
            .iter()
            .map(|job| {
                vec![
                    (job.id.short().to_string(), None),
                    (job.mode.to_string(), None),
                    (job.stage.to_string(), stage_color(job.stage)),
                    (format!("{}/{}", job.succeeded(), job.batch_total), None),
                    (job.keyword.clone(), None),
                    (format_ago(job.started_at, now), None),
                ]
            })
            .collect(),
    );
    Ok(())
}

fn report_prune(removed: usize, json: bool) -> Result<()> {
    if json {
        return print_json(&PruneOutput { removed });
    }
    println!("Removed {} job{}", removed, if removed == 1 { "" } else { "s" });
    Ok(())
}

/// Find the single job whose id starts with `prefix`.
fn resolve(jobs: &[GenerationJob], prefix: &str) -> Result<GenerationJob> {
    let prefix = prefix.trim();
    let matches: Vec<&GenerationJob> = jobs
        .iter()
        .filter(|j| !prefix.is_empty() && j.id.as_str().starts_with(prefix))
        .collect();

    match matches.as_slice() {
        [job] => Ok((*job).clone()),
        [] => Err(HelpfulError::new(format!("Job not found: {}", prefix))
            .with_suggestion("TRY: List recorded jobs: trendpress jobs")
            .into()),
        many => Err(HelpfulError::new(format!("Job id '{}' is ambiguous", prefix))
            .with_context(format!("{} jobs share this prefix", many.len()))
            .with_suggestion("TRY: Use more characters of the id")
            .into()),
    }
}

fn print_detail(job: &GenerationJob) {
    println!("Job:      {}", job.id);
    println!("Mode:     {}", job.mode);
    println!("Stage:    {}", job.stage);
    if !job.keyword.is_empty() {
        println!("Keyword:  {}", job.keyword);
    }
    println!("Started:  {}", job.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    if let Some(finished) = job.finished_at {
        let secs = (finished - job.started_at).num_milliseconds() as f64 / 1000.0;
        println!("Finished: {} ({:.1}s)", finished.format("%Y-%m-%d %H:%M:%S UTC"), secs);
    }
    println!(
        "Progress: {}/{} ({:.0}%)",
        job.batch_current,
        job.batch_total,
        job.percentage()
    );

    for result in &job.results {
        let mark = if result.success { "+" } else { "x" };
        println!("  {} {} ({})", mark, result.title, result.keyword);
    }
    for error in &job.errors {
        println!("  ! {}", error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trendpress_jobs::JobMode;

    #[test]
    fn test_resolve_by_prefix() {
        let jobs = vec![
            GenerationJob::new(JobMode::Single, "", 1),
            GenerationJob::new(JobMode::Batch, "", 3),
        ];
        let full = jobs[1].id.as_str().to_string();

        assert_eq!(resolve(&jobs, &full).unwrap().id, jobs[1].id);
        assert_eq!(resolve(&jobs, &full[..8]).unwrap().mode, JobMode::Batch);
        assert!(resolve(&jobs, "").is_err());
        assert!(resolve(&jobs, "not-a-job").is_err());
    }
}
