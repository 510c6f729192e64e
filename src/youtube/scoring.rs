//! Relevance scoring for search results against a curriculum entry

use super::SearchHit;
use serde::{Deserialize, Serialize};

/// Placeholder creator name that never matches a channel
pub const UNKNOWN_CREATOR: &str = "Coming Soon";

/// Title words that hint at tutorial content
const RELEVANT_KEYWORDS: &[&str] = &["roblox", "studio", "blender", "tutorial", "guide", "basics"];

/// Minimum score a result needs to be accepted
pub const MATCH_THRESHOLD: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn from_score(score: i32) -> Self {
        if score > 10 {
            Confidence::High
        } else if score > 5 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::High => write!(f, "high"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::Low => write!(f, "low"),
        }
    }
}

/// A search result that cleared the threshold
#[derive(Debug, Clone)]
pub struct ScoredMatch {
    pub hit: SearchHit,
    pub score: i32,
    pub confidence: Confidence,
}

/// Search query for a curriculum video: title and creator, without the
/// placeholder creator text
pub fn build_search_query(title: &str, creator: &str) -> String {
    format!("{} {}", title, creator)
        .replace(UNKNOWN_CREATOR, "")
        .trim()
        .to_string()
}

/// Score a result: +2 per query term in the title, +5 when the channel
/// contains the creator, +1 per tutorial keyword in the title
pub fn score_candidate(query: &str, creator: Option<&str>, title: &str, channel: &str) -> i32 {
    let title = title.to_lowercase();
    let channel = channel.to_lowercase();
    let mut score = 0;

    for term in query.to_lowercase().split_whitespace() {
        if title.contains(term) {
            score += 2;
        }
    }

    if let Some(creator) = creator {
        let creator = creator.trim();
        if !creator.is_empty()
            && creator != UNKNOWN_CREATOR
            && channel.contains(&creator.to_lowercase())
        {
            score += 5;
        }
    }

    score += RELEVANT_KEYWORDS
        .iter()
        .filter(|keyword| title.contains(*keyword))
        .count() as i32;

    score
}

/// Highest-scoring result above the threshold; ties keep API order
pub fn pick_best_match(query: &str, creator: Option<&str>, hits: &[SearchHit]) -> Option<ScoredMatch> {
    let mut best: Option<(i32, &SearchHit)> = None;
    for hit in hits {
        let score = score_candidate(query, creator, &hit.title, &hit.channel_title);
        match best {
            Some((top, _)) if score <= top => {}
            _ => best = Some((score, hit)),
        }
    }

    let (score, hit) = best?;
    (score > MATCH_THRESHOLD).then(|| ScoredMatch {
        hit: hit.clone(),
        score,
        confidence: Confidence::from_score(score),
    })
}
