//! `trendpress rank` - order candidate topics by revenue potential

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use trendpress::JsonSignalProvider;
use trendpress_jobs::FallbackSignals;
use trendpress_protocol::{KeywordAnalysis, SignalProvider};

use crate::cli::error::HelpfulError;
use crate::cli::output::{print_json, print_table, truncate};
use crate::cli::{block_on, CommandContext};

#[derive(Debug)]
pub struct RankArgs {
    /// Trend file; defaults to the configured signals path
    pub file: Option<PathBuf>,
    pub limit: usize,
    pub json: bool,
}

pub fn run(args: RankArgs, ctx: &CommandContext) -> Result<()> {
    let runtime = ctx.runtime()?;

    // an explicit file must exist; the configured one may fall back
    let signals: Box<dyn SignalProvider> = match args.file {
        Some(path) => {
            if !path.exists() {
                return Err(HelpfulError::file_not_found(&path).into());
            }
            Box::new(JsonSignalProvider::new(path))
        }
        None => Box::new(FallbackSignals::new(Arc::new(JsonSignalProvider::new(
            &runtime.signals_path,
        )))),
    };

    let mut ranked = block_on(async {
        let topics = signals.fetch_trends().await?;
        info!("Ranking {} topics from {}", topics.len(), signals.name());
        anyhow::Ok(runtime.service.rank_topics(&topics).await)
    })??;
    ranked.truncate(args.limit);

    if args.json {
        return print_json(&ranked);
    }

    if ranked.is_empty() {
        println!("No rankable topics.");
        return Ok(());
    }
    print_table(
        &["#", "Keyword", "Type", "CPC", "Competition", "Volume", "Potential", "Category", "Suggested title"],
        ranked.iter().enumerate().map(|(i, a)| row(i + 1, a)).collect(),
    );
    Ok(())
}

fn row(position: usize, analysis: &KeywordAnalysis) -> Vec<String> {
    vec![
        position.to_string(),
        analysis.keyword().to_string(),
        analysis.resolved_type.to_string(),
        format!("${:.2}", analysis.estimated_cpc),
        analysis.competition_level.to_string(),
        analysis.search_volume.to_string(),
        format!("{:.1}", analysis.revenue_potential),
        analysis.suggested_category.clone(),
        truncate(&analysis.suggested_title, 40),
    ]
}
