//! `trendpress check`, `links`, and `inject` - vetting against stored content

use anyhow::{Context, Result};
use comfy_table::Color;
use serde::Serialize;
use std::path::PathBuf;
use trendpress_protocol::{DuplicateCheckResult, InternalLink, Recommendation};

use crate::cli::error::HelpfulError;
use crate::cli::output::{format_ratio, print_json, print_table, print_table_colored};
use crate::cli::{block_on, require_keyword, CommandContext};

#[derive(Debug)]
pub struct CheckArgs {
    pub keyword: String,
    pub category: Option<String>,
    pub json: bool,
}

pub fn check(args: CheckArgs, ctx: &CommandContext) -> Result<()> {
    let keyword = require_keyword(&args.keyword)?;
    let runtime = ctx.runtime()?;
    let result = block_on(
        runtime
            .service
            .check_duplicate(keyword, args.category.as_deref()),
    )?;

    if args.json {
        return print_json(&result);
    }
    print_check(keyword, &result);
    Ok(())
}

fn print_check(keyword: &str, result: &DuplicateCheckResult) {
    let (verdict, color) = match result.recommendation {
        Recommendation::Skip => ("SKIP - already covered", Color::Red),
        Recommendation::ModifyAngle => ("MODIFY ANGLE - similar posts exist", Color::Yellow),
        Recommendation::Proceed => ("PROCEED - no close match", Color::Green),
    };
    println!("{}: {}", keyword, verdict);

    if result.similar_posts.is_empty() {
        return;
    }
    println!();
    print_table_colored(
        &["Similarity", "Title", "Slug"],
        result
            .similar_posts
            .iter()
            .map(|p| {
                vec![
                    (format_ratio(p.similarity), Some(color)),
                    (p.title.clone(), None),
                    (p.slug.clone(), None),
                ]
            })
            .collect(),
    );
}

#[derive(Debug)]
pub struct LinksArgs {
    pub keyword: String,
    pub category: Option<String>,
    pub exclude: Option<String>,
    pub limit: Option<usize>,
    pub json: bool,
}

pub fn links(args: LinksArgs, ctx: &CommandContext) -> Result<()> {
    let keyword = require_keyword(&args.keyword)?;
    let runtime = ctx.runtime()?;
    let links = block_on(runtime.service.find_related_links(
        keyword,
        args.category.as_deref(),
        args.exclude.as_deref(),
        args.limit,
    ))?;

    if args.json {
        return print_json(&links);
    }
    if links.is_empty() {
        println!("No related published posts for '{}'.", keyword);
        return Ok(());
    }
    print_links(&links);
    Ok(())
}

fn print_links(links: &[InternalLink]) {
    print_table(
        &["Score", "Title", "Slug"],
        links
            .iter()
            .map(|l| {
                vec![
                    format!("{:.0}", l.relevance_score),
                    l.title.clone(),
                    l.slug.clone(),
                ]
            })
            .collect(),
    );
}

#[derive(Debug)]
pub struct InjectArgs {
    /// Markdown draft to enrich
    pub file: PathBuf,
    pub keyword: String,
    pub category: Option<String>,
    /// Slug of the draft itself, so it never links to itself
    pub exclude: Option<String>,
    pub limit: Option<usize>,
    /// Write here instead of stdout
    pub output: Option<PathBuf>,
    pub json: bool,
}

#[derive(Serialize)]
struct InjectOutput<'a> {
    links: &'a [InternalLink],
    markdown: &'a str,
}

pub fn inject(args: InjectArgs, ctx: &CommandContext) -> Result<()> {
    let keyword = require_keyword(&args.keyword)?;
    if !args.file.exists() {
        return Err(HelpfulError::file_not_found(&args.file).into());
    }
    let markdown = std::fs::read_to_string(&args.file)
        .map_err(|e| HelpfulError::cannot_read_file(&args.file, &e.to_string()))?;

    let runtime = ctx.runtime()?;
    let links = block_on(runtime.service.find_related_links(
        keyword,
        args.category.as_deref(),
        args.exclude.as_deref(),
        args.limit,
    ))?;
    let enriched = runtime.service.inject_links(&markdown, &links);

    if let Some(path) = &args.output {
        std::fs::write(path, &enriched)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    if args.json {
        return print_json(&InjectOutput {
            links: &links,
            markdown: &enriched,
        });
    }
    match &args.output {
        Some(path) => println!(
            "Wrote {} ({} related post{} found)",
            path.display(),
            links.len(),
            if links.len() == 1 { "" } else { "s" }
        ),
        None => print!("{}", enriched),
    }
    Ok(())
}
