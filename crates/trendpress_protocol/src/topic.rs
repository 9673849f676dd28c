//! Candidate topics and their revenue analysis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a candidate topic was surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    GoogleTrends,
    Naver,
    News,
    Community,
    /// Typed in by an operator.
    Manual,
    /// Served from the built-in dataset after the live provider failed.
    Fallback,
}

impl SignalSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalSource::GoogleTrends => "google_trends",
            SignalSource::Naver => "naver",
            SignalSource::News => "news",
            SignalSource::Community => "community",
            SignalSource::Manual => "manual",
            SignalSource::Fallback => "fallback",
        }
    }
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordType {
    Trending,
    Evergreen,
    Seasonal,
}

impl KeywordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeywordType::Trending => "trending",
            KeywordType::Evergreen => "evergreen",
            KeywordType::Seasonal => "seasonal",
        }
    }
}

impl fmt::Display for KeywordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for KeywordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trending" => Ok(KeywordType::Trending),
            "evergreen" => Ok(KeywordType::Evergreen),
            "seasonal" => Ok(KeywordType::Seasonal),
            _ => Err(format!(
                "Invalid keyword type: '{}'. Expected: trending, evergreen, or seasonal",
                s
            )),
        }
    }
}

/// A keyword surfaced by a trend signal, not yet vetted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateTopic {
    pub keyword: String,
    pub source: SignalSource,
    #[serde(default)]
    pub category: String,
    /// 0-100
    pub trend_score: f64,
    #[serde(default)]
    pub related_keywords: Vec<String>,
    pub fetched_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword_type: Option<KeywordType>,
}

impl CandidateTopic {
    pub fn new(keyword: impl Into<String>, source: SignalSource, trend_score: f64) -> Self {
        Self {
            keyword: keyword.into(),
            source,
            category: String::new(),
            trend_score: trend_score.clamp(0.0, 100.0),
            related_keywords: Vec::new(),
            fetched_at: Utc::now(),
            keyword_type: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_related(mut self, related: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.related_keywords = related.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_type(mut self, keyword_type: KeywordType) -> Self {
        self.keyword_type = Some(keyword_type);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionLevel {
    Low,
    Medium,
    High,
}

impl CompetitionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompetitionLevel::Low => "low",
            CompetitionLevel::Medium => "medium",
            CompetitionLevel::High => "high",
        }
    }
}

impl fmt::Display for CompetitionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchVolume {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl SearchVolume {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchVolume::Low => "low",
            SearchVolume::Medium => "medium",
            SearchVolume::High => "high",
            SearchVolume::VeryHigh => "very_high",
        }
    }
}

impl fmt::Display for SearchVolume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Market signals for one keyword, as reported by an estimation provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeywordSignals {
    /// Estimated cost per click in USD.
    pub estimated_cpc: f64,
    pub competition_level: CompetitionLevel,
    pub search_volume: SearchVolume,
}

/// A candidate topic plus everything the ranker derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordAnalysis {
    #[serde(flatten)]
    pub topic: CandidateTopic,
    /// Resolved type; equals `topic.keyword_type` when the signal provided one.
    pub resolved_type: KeywordType,
    pub estimated_cpc: f64,
    pub competition_level: CompetitionLevel,
    pub search_volume: SearchVolume,
    /// 0-100, higher is more valuable.
    pub revenue_potential: f64,
    pub suggested_title: String,
    pub suggested_category: String,
    pub long_tail_variants: Vec<String>,
}

impl KeywordAnalysis {
    pub fn keyword(&self) -> &str {
        &self.topic.keyword
    }
}
