use std::collections::BTreeMap;

use crate::models::{CandidatePhoto, CaseStatus, PhotoCaseRow};

/// Case statuses whose photos are compared against new sightings
///
/// Never contains a terminal status and is never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveStatuses(Vec<CaseStatus>);

impl ActiveStatuses {
    pub fn new(statuses: Vec<CaseStatus>) -> Result<Self, String> {
        if statuses.is_empty() {
            return Err("at least one active case status is required".to_string());
        }
        if let Some(terminal) = statuses.iter().find(|s| s.is_terminal()) {
            return Err(format!("status '{}' cannot be treated as active", terminal));
        }

        let mut unique = Vec::with_capacity(statuses.len());
        for status in statuses {
            if !unique.contains(&status) {
                unique.push(status);
            }
        }
        Ok(Self(unique))
    }

    pub fn contains(&self, status: CaseStatus) -> bool {
        self.0.contains(&status)
    }

    pub fn as_slice(&self) -> &[CaseStatus] {
        &self.0
    }
}

impl Default for ActiveStatuses {
    fn default() -> Self {
        Self(vec![
            CaseStatus::ActiveSearch,
            CaseStatus::HighPriority,
            CaseStatus::New,
        ])
    }
}

/// Reduce photo/case rows to the photos eligible for comparison
///
/// A photo is eligible when any of its cases has an active status. Each
/// eligible photo appears once and the result is ordered by photo id, so
/// the same rows always give the same candidate list.
pub fn select_candidates(rows: Vec<PhotoCaseRow>, active: &ActiveStatuses) -> Vec<CandidatePhoto> {
    let mut eligible: BTreeMap<i64, String> = BTreeMap::new();

    for row in rows {
        if row.case_status.is_terminal() || !active.contains(row.case_status) {
            continue;
        }
        eligible.entry(row.photo_id).or_insert(row.image_url);
    }

    eligible
        .into_iter()
        .map(|(photo_id, image_url)| CandidatePhoto { photo_id, image_url })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(photo_id: i64, status: CaseStatus) -> PhotoCaseRow {
        PhotoCaseRow {
            photo_id,
            image_url: format!("https://img.test/{}.jpg", photo_id),
            case_status: status,
        }
    }

    #[test]
    fn test_closed_only_photo_is_excluded() {
        let rows = vec![row(1, CaseStatus::Closed), row(2, CaseStatus::New)];

        let candidates = select_candidates(rows, &ActiveStatuses::default());

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].photo_id, 2);
    }

    #[test]
    fn test_photo_with_any_open_case_is_included_once() {
        let rows = vec![
            row(5, CaseStatus::Closed),
            row(5, CaseStatus::HighPriority),
            row(5, CaseStatus::ActiveSearch),
        ];

        let candidates = select_candidates(rows, &ActiveStatuses::default());

        assert_eq!(candidates, vec![CandidatePhoto {
            photo_id: 5,
            image_url: "https://img.test/5.jpg".to_string(),
        }]);
    }

    #[test]
    fn test_candidates_ordered_by_photo_id() {
        let rows = vec![
            row(9, CaseStatus::New),
            row(3, CaseStatus::ActiveSearch),
            row(6, CaseStatus::HighPriority),
        ];

        let ids: Vec<i64> = select_candidates(rows, &ActiveStatuses::default())
            .into_iter()
            .map(|c| c.photo_id)
            .collect();

        assert_eq!(ids, vec![3, 6, 9]);
    }

    #[test]
    fn test_narrowed_active_set() {
        let active = ActiveStatuses::new(vec![CaseStatus::HighPriority]).unwrap();
        let rows = vec![row(1, CaseStatus::New), row(2, CaseStatus::HighPriority)];

        let candidates = select_candidates(rows, &active);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].photo_id, 2);
    }

    #[test]
    fn test_active_statuses_reject_closed_and_empty() {
        assert!(ActiveStatuses::new(vec![CaseStatus::New, CaseStatus::Closed]).is_err());
        assert!(ActiveStatuses::new(vec![]).is_err());
    }

    #[test]
    fn test_no_rows_gives_no_candidates() {
        assert!(select_candidates(vec![], &ActiveStatuses::default()).is_empty());
    }
}
