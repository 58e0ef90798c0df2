//! Validity-window overlap validation for amendments.
//!
//! Run at approval time: at most one amendment may be effective at any
//! reference date, so a new window is tested against every other approved
//! amendment of the contract. Renewals are not part of this check; they
//! are sequential by construction.

use serde::{Deserialize, Serialize};

use crate::types::{Amendment, ApprovalState, DateWindow, DocumentId};

/// A validity-window conflict with an already-approved amendment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "conflict", rename_all = "snake_case")]
pub enum OverlapConflict {
    /// The new window starts inside an existing one.
    #[error("start date overlaps {label} ({window})")]
    StartInside { label: String, window: DateWindow },

    /// The new window ends inside an existing one.
    #[error("end date overlaps {label} ({window})")]
    EndInside { label: String, window: DateWindow },

    /// The new window fully contains an existing one.
    #[error("window envelops {label} ({window})")]
    Envelops { label: String, window: DateWindow },

    /// An existing amendment is open-ended and the new window starts at or
    /// after its start.
    #[error("overlaps open-ended {label} starting {window}")]
    OpenEnded { label: String, window: DateWindow },
}

/// Validate that `window` does not overlap any other approved amendment.
///
/// `excluding` skips one document, for re-validation during administrative
/// correction of an existing amendment.
pub fn validate_no_overlap(
    amendments: &[Amendment],
    window: DateWindow,
    excluding: Option<&DocumentId>,
) -> Result<(), OverlapConflict> {
    for existing in amendments {
        if existing.state != ApprovalState::Approved {
            continue;
        }
        if excluding == Some(&existing.id) {
            continue;
        }

        let other = existing.window;

        match other.until {
            // Open-ended: anything starting at or after its start collides.
            None => {
                if window.from >= other.from {
                    return Err(OverlapConflict::OpenEnded {
                        label: existing.label(),
                        window: other,
                    });
                }
            }
            Some(other_until) => {
                if other.from <= window.from && window.from <= other_until {
                    return Err(OverlapConflict::StartInside {
                        label: existing.label(),
                        window: other,
                    });
                }
            }
        }

        if let Some(until) = window.until {
            match other.until {
                None => {
                    if until >= other.from {
                        return Err(OverlapConflict::EndInside {
                            label: existing.label(),
                            window: other,
                        });
                    }
                }
                Some(other_until) => {
                    if other.from <= until && until <= other_until {
                        return Err(OverlapConflict::EndInside {
                            label: existing.label(),
                            window: other,
                        });
                    }
                }
            }
        }

        if let Some(other_until) = other.until {
            let envelops = match window.until {
                None => window.from <= other.from,
                Some(until) => window.from <= other.from && until >= other_until,
            };
            if envelops {
                return Err(OverlapConflict::Envelops {
                    label: existing.label(),
                    window: DateWindow::new(other.from, Some(other_until)),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldOverlay;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn approved(id: &str, sequence: u32, window: DateWindow) -> Amendment {
        Amendment {
            id: id.to_string(),
            contract_id: "c-1".to_string(),
            sequence,
            window,
            state: ApprovalState::Approved,
            approved_at: None,
            version: 1,
            modifies_policies: false,
            overlay: FieldOverlay::default(),
        }
    }

    #[test]
    fn test_overlapping_start_is_rejected() {
        let existing = vec![approved(
            "a-1",
            1,
            DateWindow::new(d(2024, 1, 1), Some(d(2024, 4, 30))),
        )];
        let window = DateWindow::new(d(2024, 2, 1), Some(d(2024, 6, 30)));

        let conflict = validate_no_overlap(&existing, window, None).unwrap_err();
        assert!(matches!(conflict, OverlapConflict::StartInside { .. }));
    }

    #[test]
    fn test_disjoint_window_is_accepted() {
        let existing = vec![approved(
            "a-1",
            1,
            DateWindow::new(d(2024, 1, 1), Some(d(2024, 4, 30))),
        )];
        let window = DateWindow::new(d(2024, 5, 1), Some(d(2024, 8, 31)));

        assert!(validate_no_overlap(&existing, window, None).is_ok());
    }

    #[test]
    fn test_end_inside_existing_is_rejected() {
        let existing = vec![approved(
            "a-1",
            1,
            DateWindow::new(d(2024, 3, 1), Some(d(2024, 9, 30))),
        )];
        let window = DateWindow::new(d(2024, 1, 1), Some(d(2024, 4, 15)));

        let conflict = validate_no_overlap(&existing, window, None).unwrap_err();
        assert!(matches!(conflict, OverlapConflict::EndInside { .. }));
    }

    #[test]
    fn test_enveloping_window_is_rejected() {
        let existing = vec![approved(
            "a-1",
            1,
            DateWindow::new(d(2024, 3, 1), Some(d(2024, 5, 31))),
        )];
        let window = DateWindow::new(d(2024, 1, 1), Some(d(2024, 12, 31)));

        let conflict = validate_no_overlap(&existing, window, None).unwrap_err();
        assert!(matches!(conflict, OverlapConflict::Envelops { .. }));
    }

    #[test]
    fn test_open_ended_existing_blocks_later_start() {
        let existing = vec![approved("a-1", 1, DateWindow::open(d(2024, 1, 1)))];

        let later = DateWindow::new(d(2024, 6, 1), Some(d(2024, 12, 31)));
        let conflict = validate_no_overlap(&existing, later, None).unwrap_err();
        assert!(matches!(conflict, OverlapConflict::OpenEnded { .. }));

        // Starting strictly before the open-ended window but ending inside
        // it is still a conflict.
        let before = DateWindow::new(d(2023, 6, 1), Some(d(2024, 3, 1)));
        let conflict = validate_no_overlap(&existing, before, None).unwrap_err();
        assert!(matches!(conflict, OverlapConflict::EndInside { .. }));
    }

    #[test]
    fn test_unapproved_and_excluded_amendments_do_not_constrain() {
        let mut draft = approved("a-1", 1, DateWindow::open(d(2024, 1, 1)));
        draft.state = ApprovalState::Draft;
        let own = approved("a-2", 2, DateWindow::new(d(2024, 2, 1), Some(d(2024, 7, 31))));
        let existing = vec![draft, own];

        let window = DateWindow::new(d(2024, 2, 1), Some(d(2024, 7, 31)));
        let own_id = "a-2".to_string();
        assert!(validate_no_overlap(&existing, window, Some(&own_id)).is_ok());
        assert!(validate_no_overlap(&existing, window, None).is_err());
    }
}
