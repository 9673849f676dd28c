//! Internal link discovery and placement.
//!
//! [`LinkFinder`] scores published rows against a keyword; [`inject_links`]
//! places the winners into a markdown draft at heading-anchored points.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};
use trendpress_protocol::{ContentQuery, ContentStatus, ContentStore, InternalLink};

use crate::similarity::{normalize, tokenize};

const TITLE_TOKEN_WEIGHT: f64 = 3.0;
const TITLE_PHRASE_WEIGHT: f64 = 3.0;
const KEYWORD_TOKEN_WEIGHT: f64 = 2.0;
const KEYWORD_EXACT_WEIGHT: f64 = 2.0;
const CATEGORY_WEIGHT: f64 = 1.0;

/// Links placed into a single draft.
pub const MAX_INJECTED_LINKS: usize = 4;
/// Links in the trailing block when the draft has too few headings.
pub const MAX_APPENDED_LINKS: usize = 2;

fn heading_pattern() -> &'static Regex {
    static HEADING: OnceLock<Regex> = OnceLock::new();
    HEADING.get_or_init(|| Regex::new(r"^#{2,3}\s").expect("heading pattern is valid"))
}

/// How link blocks render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkStyle {
    #[serde(default = "default_label")]
    pub label: String,
    /// Prepended to the slug to build the link target.
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
}

impl Default for LinkStyle {
    fn default() -> Self {
        Self {
            label: default_label(),
            url_prefix: default_url_prefix(),
        }
    }
}

fn default_label() -> String { "함께 보면 좋은 글".to_string() }
fn default_url_prefix() -> String { "/posts/".to_string() }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Published rows scored per lookup.
    #[serde(default = "default_query_limit")]
    pub query_limit: usize,
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default)]
    pub style: LinkStyle,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            query_limit: default_query_limit(),
            default_limit: default_limit(),
            style: LinkStyle::default(),
        }
    }
}

fn default_query_limit() -> usize { 100 }
fn default_limit() -> usize { 5 }

pub struct LinkFinder {
    store: Arc<dyn ContentStore>,
    config: LinkConfig,
}

impl LinkFinder {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self::with_config(store, LinkConfig::default())
    }

    pub fn with_config(store: Arc<dyn ContentStore>, config: LinkConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Published rows related to `keyword`, best first.
    ///
    /// Store failures yield an empty list.
    pub async fn find_related(
        &self,
        keyword: &str,
        category_id: Option<&str>,
        exclude_slug: Option<&str>,
        limit: usize,
    ) -> Vec<InternalLink> {
        let query = ContentQuery::new(self.config.query_limit)
            .keyword(keyword)
            .category(category_id)
            .status(ContentStatus::Published);

        let rows = match self.store.query(&query).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Link lookup for '{}' failed open: {}", keyword, e);
                return Vec::new();
            }
        };

        let needle = normalize(keyword);
        let tokens = tokenize(keyword);

        let mut links: Vec<InternalLink> = rows
            .into_iter()
            .filter(|row| exclude_slug != Some(row.slug.as_str()))
            .filter_map(|row| {
                let title = normalize(&row.title);
                let stored: Vec<String> = row
                    .keywords
                    .iter()
                    .flatten()
                    .map(|k| normalize(k))
                    .collect();

                let mut score = 0.0;
                for token in &tokens {
                    if title.contains(token.as_str()) {
                        score += TITLE_TOKEN_WEIGHT;
                    }
                }
                if !needle.is_empty() && title.contains(&needle) {
                    score += TITLE_PHRASE_WEIGHT;
                }
                // an exact stored keyword replaces the per-token keyword score
                if !needle.is_empty() && stored.iter().any(|k| *k == needle) {
                    score += KEYWORD_EXACT_WEIGHT;
                } else {
                    for token in &tokens {
                        if stored.iter().any(|k| k.contains(token.as_str())) {
                            score += KEYWORD_TOKEN_WEIGHT;
                        }
                    }
                }
                if category_id.is_some() && category_id == row.category_id.as_deref() {
                    score += CATEGORY_WEIGHT;
                }

                (score > 0.0).then(|| InternalLink {
                    content_id: row.id,
                    title: row.title,
                    slug: row.slug,
                    relevance_score: score,
                })
            })
            .collect();

        // stable: equal scores keep store order
        links.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        links.truncate(limit);
        debug!("Found {} related links for '{}'", links.len(), keyword);
        links
    }
}

/// Insert link blocks into a markdown draft using the default style.
pub fn inject_links(markdown: &str, links: &[InternalLink]) -> String {
    inject_links_with(markdown, links, &LinkStyle::default())
}

/// Insert link blocks into a markdown draft.
///
/// With fewer than two `##`/`###` headings a single block is appended after
/// the untouched text. Otherwise blocks go midway through the second section
/// and, when it is far enough away, just before the last heading.
pub fn inject_links_with(markdown: &str, links: &[InternalLink], style: &LinkStyle) -> String {
    if links.is_empty() {
        return markdown.to_string();
    }
    let links = &links[..links.len().min(MAX_INJECTED_LINKS)];

    let mut lines: Vec<String> = markdown.split('\n').map(str::to_string).collect();
    let headings: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| heading_pattern().is_match(line))
        .map(|(idx, _)| idx)
        .collect();

    if headings.len() < 2 {
        let block = render_block(&links[..links.len().min(MAX_APPENDED_LINKS)], style);
        let separator = if markdown.ends_with('\n') { "\n" } else { "\n\n" };
        return format!("{}{}{}\n", markdown, separator, block.join("\n"));
    }

    let second = headings[1];
    let section_end = headings.get(2).copied().unwrap_or(lines.len());
    let first_point = ((second + section_end) / 2).max(second + 1);

    let mut points = vec![first_point];
    if let Some(&last) = headings.last() {
        if last > first_point + 2 {
            points.push(last);
        }
    }

    let chunk_size = links.len().div_ceil(points.len());
    let mut placements: Vec<(usize, &[InternalLink])> =
        points.into_iter().zip(links.chunks(chunk_size)).collect();
    // later positions first so earlier indices stay valid
    placements.sort_by(|a, b| b.0.cmp(&a.0));

    for (at, chunk) in placements {
        let mut block = vec![String::new()];
        block.extend(render_block(chunk, style));
        block.push(String::new());
        let at = at.min(lines.len());
        lines.splice(at..at, block);
    }

    lines.join("\n")
}

fn render_block(links: &[InternalLink], style: &LinkStyle) -> Vec<String> {
    match links {
        [single] => vec![format!(
            "**{}:** [{}]({}{})",
            style.label, single.title, style.url_prefix, single.slug
        )],
        many => {
            let mut out = vec![format!("**{}**", style.label)];
            out.extend(
                many.iter()
                    .map(|l| format!("- [{}]({}{})", l.title, style.url_prefix, l.slug)),
            );
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryContentStore;
    use trendpress_ids::ContentId;
    use trendpress_protocol::StoredContentSummary;

    fn link(n: usize) -> InternalLink {
        InternalLink {
            content_id: ContentId::from(format!("c{}", n)),
            title: format!("글 {}", n),
            slug: format!("post-{}", n),
            relevance_score: 1.0,
        }
    }

    fn links(n: usize) -> Vec<InternalLink> {
        (1..=n).map(link).collect()
    }

    fn row(id: &str, title: &str, keywords: &[&str], category: Option<&str>) -> StoredContentSummary {
        StoredContentSummary {
            id: ContentId::from(id),
            title: title.to_string(),
            slug: format!("slug-{}", id),
            keywords: Some(keywords.iter().map(|s| s.to_string()).collect()),
            category_id: category.map(str::to_string),
        }
    }

    const SECTIONED: &str = "intro\n## A\na1\na2\n## B\nb1\nb2\nb3\nb4\n## C\nc1\nc2\nc3\n## D\nd1";

    #[test]
    fn no_links_is_identity() {
        assert_eq!(inject_links(SECTIONED, &[]), SECTIONED);
        assert_eq!(inject_links("", &[]), "");
    }

    #[test]
    fn single_heading_appends_after_original() {
        let text = "# 제목\n\n본문\n## 하나뿐인 섹션\n내용";
        let out = inject_links(text, &links(4));

        assert!(out.starts_with(text));
        let tail = &out[text.len()..];
        assert!(tail.contains("post-1"));
        assert!(tail.contains("post-2"));
        assert!(!tail.contains("post-3"));
    }

    #[test]
    fn deeper_headings_are_not_section_markers() {
        let text = "#### a\nx\n#### b\ny";
        let out = inject_links(text, &links(1));
        assert!(out.starts_with(text));
    }

    #[test]
    fn links_split_between_midpoint_and_last_heading() {
        let out = inject_links(SECTIONED, &links(3));

        let pos = |needle: &str| out.find(needle).unwrap();
        // two links as a list midway through section B
        assert!(pos("b1") < pos("- [글 1]"));
        assert!(pos("- [글 2]") < pos("b2"));
        // the remaining one as a single line before the last heading
        assert!(pos("c3") < pos("**함께 보면 좋은 글:** [글 3](/posts/post-3)"));
        assert!(pos("(/posts/post-3)") < pos("## D"));
        // original lines all survive
        for line in SECTIONED.lines() {
            assert!(out.lines().any(|l| l == line));
        }
    }

    #[test]
    fn nearby_last_heading_gets_no_second_block() {
        let text = "## A\na\n## B\nb\n## C\nc";
        let out = inject_links(text, &links(4));

        assert_eq!(out.matches("**함께 보면 좋은 글**").count(), 1);
        for n in 1..=4 {
            assert!(out.contains(&format!("post-{}", n)));
        }
    }

    #[test]
    fn at_most_four_links_are_placed() {
        let out = inject_links(SECTIONED, &links(7));
        assert!(out.contains("post-4"));
        assert!(!out.contains("post-5"));
    }

    #[test]
    fn custom_style_is_applied() {
        let style = LinkStyle {
            label: "Related".to_string(),
            url_prefix: "https://blog.example/".to_string(),
        };
        let out = inject_links_with("body", &links(1), &style);
        assert!(out.ends_with("**Related:** [글 1](https://blog.example/post-1)\n"));
    }

    #[tokio::test]
    async fn find_related_scores_and_excludes_slug() {
        let store = Arc::new(MemoryContentStore::with_published(vec![
            row("1", "청년 월세 지원 총정리", &["청년 월세"], Some("policy")),
            row("2", "청년 취업 가이드", &["취업"], None),
            row("3", "제주 여행 코스", &["여행"], None),
            row("4", "청년 월세 신청 후기", &["청년 월세"], Some("policy")),
        ]));
        let finder = LinkFinder::new(store);

        let found = finder
            .find_related("청년 월세", Some("policy"), Some("slug-4"), 5)
            .await;

        let slugs: Vec<&str> = found.iter().map(|l| l.slug.as_str()).collect();
        assert_eq!(slugs, vec!["slug-1", "slug-2"]);
        // 3+3 title tokens, +3 phrase, +2 exact keyword, +1 category
        assert_eq!(found[0].relevance_score, 12.0);
        assert_eq!(found[1].relevance_score, 3.0);
    }

    #[tokio::test]
    async fn exact_keyword_scores_flat_instead_of_per_token() {
        let store = Arc::new(MemoryContentStore::with_published(vec![
            row("1", "제주 여행 코스", &["청년 월세"], None),
            row("2", "부산 맛집 지도", &["청년 월세 지원"], None),
        ]));
        let finder = LinkFinder::new(store);

        let found = finder.find_related("청년 월세", None, None, 5).await;

        let scores: Vec<(&str, f64)> = found
            .iter()
            .map(|l| (l.slug.as_str(), l.relevance_score))
            .collect();
        assert_eq!(scores, vec![("slug-2", 4.0), ("slug-1", 2.0)]);
    }

    #[tokio::test]
    async fn find_related_respects_limit() {
        let rows = (0..10)
            .map(|i| row(&i.to_string(), "청년 정책", &[], None))
            .collect::<Vec<_>>();
        let finder = LinkFinder::new(Arc::new(MemoryContentStore::with_published(rows)));
        assert_eq!(finder.find_related("청년", None, None, 3).await.len(), 3);
    }
}
