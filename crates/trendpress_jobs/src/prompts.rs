//! Prompt construction and draft post-processing helpers.

use trendpress_protocol::{GenerationConstraints, KeywordAnalysis};

/// Build the article prompt for one analyzed keyword.
///
/// `avoid_titles` lists existing posts the draft must not repeat; it is
/// filled when the duplicate guard asked for a different angle.
pub fn build_article_prompt(
    analysis: &KeywordAnalysis,
    avoid_titles: &[String],
    constraints: &GenerationConstraints,
) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "Write a blog article in language '{}' of about {} words.\n\n",
        constraints.language, constraints.target_words
    ));
    prompt.push_str(&format!("Main keyword: {}\n", analysis.keyword()));
    prompt.push_str(&format!("Working title: {}\n", analysis.suggested_title));
    prompt.push_str(&format!("Category: {}\n", analysis.suggested_category));
    prompt.push_str(&format!("Keyword type: {}\n", analysis.resolved_type));

    if !analysis.long_tail_variants.is_empty() {
        prompt.push_str("\nWork these related phrases in naturally:\n");
        for variant in &analysis.long_tail_variants {
            prompt.push_str(&format!("- {}\n", variant));
        }
    }

    if !avoid_titles.is_empty() {
        prompt.push_str("\nThese posts already exist. Take a clearly different angle:\n");
        for title in avoid_titles {
            prompt.push_str(&format!("- {}\n", title));
        }
    }

    prompt.push_str(
        "\nFormat:\n\
         - Start with a single '# ' title line\n\
         - Use '## ' section headings, at least four sections\n\
         - Markdown only, no front matter\n",
    );

    prompt
}

/// Text of the first `# ` line, if any.
pub fn extract_title(markdown: &str) -> Option<String> {
    markdown
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("# "))
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
}

/// URL slug: lower-cased alphanumeric runs joined by `-`. Hangul is kept.
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
