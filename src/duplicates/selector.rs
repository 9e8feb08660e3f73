//! Keeper selection.
//!
//! [`WinnerSelector`] ranks the members of a group by an ordered list of
//! [`KeepCriterion`]s and keeps the best one. Ranking is a lexicographic
//! descending sort on the criterion values; remaining ties go to the
//! longer path (then the lexicographically greater path), which makes the
//! order total and the result reproducible.
//!
//! # Example
//!
//! ```
//! use mediadupe::duplicates::{KeepCriterion, WinnerSelector};
//!
//! let selector = WinnerSelector::new(vec![KeepCriterion::Resolution, KeepCriterion::Newer]);
//! assert_eq!(selector.priority().len(), 2);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::groups::{Disposition, Group};
use crate::scanner::FileRecord;

/// A named preference used to pick the keeper of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeepCriterion {
    /// Prefer the longest duration (unknown ranks last)
    Longer,
    /// Prefer the largest `width * height`
    Resolution,
    /// Prefer the highest video bitrate (unknown counts as 0)
    VideoBitrate,
    /// Prefer the most recently modified file
    Newer,
    /// Prefer the smallest file
    Smaller,
    /// Prefer the path with the most components
    Deeper,
}

impl KeepCriterion {
    /// Every recognized criterion.
    pub const ALL: [KeepCriterion; 6] = [
        Self::Longer,
        Self::Resolution,
        Self::VideoBitrate,
        Self::Newer,
        Self::Smaller,
        Self::Deeper,
    ];

    /// Configuration name of the criterion.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Longer => "longer",
            Self::Resolution => "resolution",
            Self::VideoBitrate => "video_bitrate",
            Self::Newer => "newer",
            Self::Smaller => "smaller",
            Self::Deeper => "deeper",
        }
    }

    /// Compare two records under this criterion; `Greater` means `a` is preferred.
    #[must_use]
    pub fn compare(self, a: &FileRecord, b: &FileRecord) -> Ordering {
        match self {
            Self::Longer => {
                let da = a.duration().unwrap_or(-1.0);
                let db = b.duration().unwrap_or(-1.0);
                da.total_cmp(&db)
            }
            Self::Resolution => a.resolution_area().cmp(&b.resolution_area()),
            Self::VideoBitrate => video_bitrate(a).cmp(&video_bitrate(b)),
            Self::Newer => a.modified.cmp(&b.modified),
            Self::Smaller => b.size.cmp(&a.size),
            Self::Deeper => a.depth().cmp(&b.depth()),
        }
    }
}

fn video_bitrate(record: &FileRecord) -> u64 {
    record
        .media
        .as_ref()
        .and_then(|m| m.video_bitrate_bps)
        .unwrap_or(0)
}

impl fmt::Display for KeepCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for an unrecognized criterion name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCriterion {
    /// Name as given
    pub name: String,
    /// Closest recognized name, if any is close enough
    pub suggestion: Option<&'static str>,
}

impl fmt::Display for UnknownCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown keep criterion '{}'", self.name)?;
        if let Some(suggestion) = self.suggestion {
            write!(f, " (did you mean '{suggestion}'?)")?;
        }
        Ok(())
    }
}

impl std::error::Error for UnknownCriterion {}

impl FromStr for KeepCriterion {
    type Err = UnknownCriterion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        if let Some(criterion) = Self::ALL.into_iter().find(|c| c.name() == normalized) {
            return Ok(criterion);
        }

        let suggestion = Self::ALL
            .into_iter()
            .map(|c| (c.name(), strsim::jaro_winkler(&normalized, c.name())))
            .filter(|(_, score)| *score > 0.8)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(name, _)| name);

        Err(UnknownCriterion {
            name: s.to_string(),
            suggestion,
        })
    }
}

/// Picks one keeper per group by a priority list of criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinnerSelector {
    priority: Vec<KeepCriterion>,
}

impl Default for WinnerSelector {
    fn default() -> Self {
        Self::new(vec![
            KeepCriterion::Resolution,
            KeepCriterion::VideoBitrate,
            KeepCriterion::Longer,
            KeepCriterion::Newer,
        ])
    }
}

impl WinnerSelector {
    /// Create a selector. Repeated criteria after the first occurrence have
    /// no effect and are dropped.
    #[must_use]
    pub fn new(priority: Vec<KeepCriterion>) -> Self {
        let mut deduped = Vec::with_capacity(priority.len());
        for criterion in priority {
            if !deduped.contains(&criterion) {
                deduped.push(criterion);
            }
        }
        Self { priority: deduped }
    }

    /// Criteria in priority order.
    #[must_use]
    pub fn priority(&self) -> &[KeepCriterion] {
        &self.priority
    }

    /// Total preference order; `Greater` means `a` ranks before `b`.
    #[must_use]
    pub fn compare(&self, a: &FileRecord, b: &FileRecord) -> Ordering {
        self.priority
            .iter()
            .map(|c| c.compare(a, b))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| {
                let (pa, pb) = (a.path.as_os_str(), b.path.as_os_str());
                pa.len().cmp(&pb.len()).then_with(|| pa.cmp(pb))
            })
    }

    /// Members sorted best-first.
    #[must_use]
    pub fn rank(&self, members: &[Arc<FileRecord>]) -> Vec<Arc<FileRecord>> {
        let mut ranked = members.to_vec();
        ranked.sort_by(|a, b| self.compare(b, a));
        ranked
    }

    /// Split a group into its keeper and losers.
    ///
    /// Pure: no I/O, and the same input always yields the same keeper.
    /// Returns `None` only for an empty group.
    #[must_use]
    pub fn select(&self, group: &Group) -> Option<Disposition> {
        let mut ranked = self.rank(&group.members).into_iter();
        let keep = ranked.next()?;
        let losers: Vec<Arc<FileRecord>> = ranked.collect();

        log::trace!(
            "Group {}: keep {} ({} loser(s))",
            group.id,
            keep.path.display(),
            losers.len()
        );

        Some(Disposition {
            group_id: group.id.clone(),
            keep,
            losers,
        })
    }

    /// Select keepers for every group.
    #[must_use]
    pub fn select_all(&self, groups: &[Group]) -> Vec<Disposition> {
        groups.iter().filter_map(|g| self.select(g)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplicates::groups::GroupId;
    use crate::scanner::MediaInfo;
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime};

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn video(path: &str, size: u64, mtime: u64, media: MediaInfo) -> Arc<FileRecord> {
        Arc::new(FileRecord::new(PathBuf::from(path), size, at(mtime)).with_media(media))
    }

    fn res(w: u32, h: u32) -> MediaInfo {
        MediaInfo {
            width: Some(w),
            height: Some(h),
            ..Default::default()
        }
    }

    fn group(members: Vec<Arc<FileRecord>>) -> Group {
        Group::new(GroupId::Meta(0), members)
    }

    #[test]
    fn test_criterion_parse() {
        assert_eq!("longer".parse::<KeepCriterion>().unwrap(), KeepCriterion::Longer);
        assert_eq!(
            "video-bitrate".parse::<KeepCriterion>().unwrap(),
            KeepCriterion::VideoBitrate
        );
        assert_eq!(" Newer ".parse::<KeepCriterion>().unwrap(), KeepCriterion::Newer);
    }

    #[test]
    fn test_criterion_parse_suggestion() {
        let err = "newr".parse::<KeepCriterion>().unwrap_err();
        assert_eq!(err.suggestion, Some("newer"));
        assert!(err.to_string().contains("did you mean 'newer'"));

        let err = "zzzz".parse::<KeepCriterion>().unwrap_err();
        assert_eq!(err.suggestion, None);
    }

    #[test]
    fn test_resolution_then_newer() {
        let records = vec![
            video("/a.mp4", 10, 100, res(1920, 1080)),
            video("/b.mp4", 10, 300, res(1280, 720)),
            video("/c.mp4", 10, 200, res(1920, 1080)),
        ];
        let selector = WinnerSelector::new(vec![KeepCriterion::Resolution, KeepCriterion::Newer]);

        for _ in 0..10 {
            let d = selector.select(&group(records.clone())).unwrap();
            assert_eq!(d.keep.path, PathBuf::from("/c.mp4"));
            assert_eq!(d.losers.len(), 2);
        }
    }

    #[test]
    fn test_longer_unknown_sorts_last() {
        let records = vec![
            video("/unknown.mp4", 10, 0, MediaInfo::default()),
            video(
                "/short.mp4",
                10,
                0,
                MediaInfo {
                    duration_seconds: Some(0.0),
                    ..Default::default()
                },
            ),
        ];
        let selector = WinnerSelector::new(vec![KeepCriterion::Longer]);
        let d = selector.select(&group(records)).unwrap();
        assert_eq!(d.keep.path, PathBuf::from("/short.mp4"));
    }

    #[test]
    fn test_smaller_prefers_small_size() {
        let records = vec![
            video("/big", 500, 0, MediaInfo::default()),
            video("/small", 5, 0, MediaInfo::default()),
        ];
        let selector = WinnerSelector::new(vec![KeepCriterion::Smaller]);
        assert_eq!(
            selector.select(&group(records)).unwrap().keep.path,
            PathBuf::from("/small")
        );
    }

    #[test]
    fn test_deeper_prefers_more_components() {
        let records = vec![
            video("/a/x", 1, 0, MediaInfo::default()),
            video("/a/b/c/x", 1, 0, MediaInfo::default()),
        ];
        let selector = WinnerSelector::new(vec![KeepCriterion::Deeper]);
        assert_eq!(
            selector.select(&group(records)).unwrap().keep.path,
            PathBuf::from("/a/b/c/x")
        );
    }

    #[test]
    fn test_video_bitrate_unknown_is_zero() {
        let records = vec![
            video("/none", 1, 0, MediaInfo::default()),
            video(
                "/some",
                1,
                0,
                MediaInfo {
                    video_bitrate_bps: Some(1),
                    ..Default::default()
                },
            ),
        ];
        let selector = WinnerSelector::new(vec![KeepCriterion::VideoBitrate]);
        assert_eq!(
            selector.select(&group(records)).unwrap().keep.path,
            PathBuf::from("/some")
        );
    }

    #[test]
    fn test_tie_break_longer_path() {
        let records = vec![
            video("/short", 1, 0, MediaInfo::default()),
            video("/much/longer/path", 1, 0, MediaInfo::default()),
        ];
        let selector = WinnerSelector::new(Vec::new());
        assert_eq!(
            selector.select(&group(records)).unwrap().keep.path,
            PathBuf::from("/much/longer/path")
        );
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let a = video("/a", 1, 5, MediaInfo::default());
        let b = video("/b", 1, 5, MediaInfo::default());
        let selector = WinnerSelector::new(vec![KeepCriterion::Newer]);

        let first = selector.select(&group(vec![a.clone(), b.clone()])).unwrap();
        let second = selector.select(&group(vec![b, a])).unwrap();
        assert_eq!(first.keep.path, second.keep.path);
    }

    #[test]
    fn test_losers_disjoint_and_complete() {
        let records: Vec<_> = (0..5)
            .map(|i| video(&format!("/f{i}"), 1, i, MediaInfo::default()))
            .collect();
        let selector = WinnerSelector::new(vec![KeepCriterion::Newer]);
        let d = selector.select(&group(records.clone())).unwrap();

        assert!(!d.losers.iter().any(|l| l.path == d.keep.path));
        assert_eq!(d.losers.len(), records.len() - 1);
        for record in &records {
            let count = d.losers.iter().filter(|l| l.path == record.path).count()
                + usize::from(d.keep.path == record.path);
            assert_eq!(count, 1);
        }
    }

    #[test]
    fn test_duplicate_criteria_dropped() {
        let selector = WinnerSelector::new(vec![
            KeepCriterion::Newer,
            KeepCriterion::Newer,
            KeepCriterion::Smaller,
        ]);
        assert_eq!(
            selector.priority(),
            &[KeepCriterion::Newer, KeepCriterion::Smaller]
        );
    }
}
