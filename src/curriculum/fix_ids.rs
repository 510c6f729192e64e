//! Repair of composite video ids and legacy placeholder ids

use super::{Curriculum, VideoPosition, PLACEHOLDER_ID};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// One rewritten video id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdChange {
    pub location: String,
    pub old_id: String,
    pub new_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FixIdsSummary {
    pub video_ids: Vec<IdChange>,
    /// `placeholder_*` YouTube ids moved to the standard placeholder
    pub placeholders: usize,
}

impl FixIdsSummary {
    pub fn is_empty(&self) -> bool {
        self.video_ids.is_empty() && self.placeholders == 0
    }
}

fn is_legacy_placeholder(youtube_id: &str) -> bool {
    youtube_id.starts_with("placeholder")
}

/// Which videos need their positional id.
///
/// Malformed ids and duplicates not sitting at their own position are
/// rewritten. A kept id that a rewrite would collide with is rewritten too,
/// repeated until nothing changes, so every id ends up unique.
fn ids_to_rewrite(videos: &[(VideoPosition, String)]) -> Vec<bool> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for (_, id) in videos {
        *counts.entry(id.as_str()).or_default() += 1;
    }

    let mut rewrite: Vec<bool> = videos
        .iter()
        .map(|(position, id)| match id.parse::<VideoPosition>() {
            Err(_) => true,
            Ok(parsed) => parsed != *position && counts.get(id.as_str()).copied().unwrap_or(0) > 1,
        })
        .collect();

    loop {
        let claimed: HashSet<String> = videos
            .iter()
            .zip(&rewrite)
            .filter(|(_, r)| **r)
            .map(|((position, _), _)| position.to_string())
            .collect();

        let mut changed = false;
        for ((position, id), r) in videos.iter().zip(rewrite.iter_mut()) {
            if !*r && claimed.contains(id) && *id != position.to_string() {
                *r = true;
                changed = true;
            }
        }
        if !changed {
            return rewrite;
        }
    }
}

impl Curriculum {
    /// Rebuild malformed or duplicated video ids from their position and
    /// move legacy placeholder YouTube ids to [`PLACEHOLDER_ID`]. Running it
    /// on its own output changes nothing.
    pub fn fix_ids(&mut self) -> FixIdsSummary {
        let videos: Vec<(VideoPosition, String)> = self
            .videos()
            .map(|v| (v.position, v.video.id.clone()))
            .collect();
        let rewrite = ids_to_rewrite(&videos);
        let mut plan = videos.into_iter().zip(rewrite);
        let mut summary = FixIdsSummary::default();

        for module in &mut self.modules {
            for week in &mut module.weeks {
                for day in &mut week.days {
                    for video in &mut day.videos {
                        let Some(((position, old_id), rewrite)) = plan.next() else {
                            return summary;
                        };
                        if rewrite {
                            let new_id = position.to_string();
                            video.id = new_id.clone();
                            summary.video_ids.push(IdChange {
                                location: format!(
                                    "Module {}, Week {}, Day {}, Video {}",
                                    position.module, position.week, position.day, position.index
                                ),
                                old_id,
                                new_id,
                            });
                        }
                        if is_legacy_placeholder(&video.youtube_id) {
                            video.youtube_id = PLACEHOLDER_ID.to_string();
                            summary.placeholders += 1;
                        }
                    }
                }
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::tests::sample;

    fn day_ids(curriculum: &Curriculum, day: &str) -> Vec<String> {
        curriculum
            .find_day("module-1", "week-1", day)
            .unwrap()
            .videos
            .iter()
            .map(|v| v.id.clone())
            .collect()
    }

    #[test]
    fn test_clean_curriculum_is_untouched() {
        let mut curriculum = sample();
        assert!(curriculum.fix_ids().is_empty());
        assert_eq!(curriculum, sample());
    }

    #[test]
    fn test_duplicate_keeps_the_one_in_place() {
        let mut curriculum = sample();
        curriculum.modules[0].weeks[0].days[0].videos[1].id = "video-1-1-1-1".to_string();

        let summary = curriculum.fix_ids();
        assert_eq!(summary.video_ids.len(), 1);
        assert_eq!(summary.video_ids[0].new_id, "video-1-1-1-2");
        assert_eq!(day_ids(&curriculum, "day-1"), ["video-1-1-1-1", "video-1-1-1-2"]);
    }

    #[test]
    fn test_rewrite_displaces_colliding_id() {
        let mut curriculum = sample();
        let week = &mut curriculum.modules[0].weeks[0];
        week.days[0].videos[1].id = "intro".to_string();
        week.days[1].videos[0].id = "video-1-1-1-2".to_string();

        let summary = curriculum.fix_ids();
        assert_eq!(summary.video_ids.len(), 2);
        assert_eq!(day_ids(&curriculum, "day-1"), ["video-1-1-1-1", "video-1-1-1-2"]);
        assert_eq!(day_ids(&curriculum, "day-2"), ["video-1-1-2-1"]);
    }

    #[test]
    fn test_legacy_placeholder_ids() {
        let mut curriculum = sample();
        curriculum.modules[0].weeks[0].days[1].videos[0].youtube_id = "placeholder_welding".to_string();

        let summary = curriculum.fix_ids();
        assert_eq!(summary.placeholders, 1);
        let day = curriculum.find_day("module-1", "week-1", "day-2").unwrap();
        assert_eq!(day.videos[0].youtube_id, PLACEHOLDER_ID);

        assert!(curriculum.fix_ids().is_empty());
    }
}
