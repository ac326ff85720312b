//! User-facing notices for intent results.
//!
//! # Invariants
//! - `Notice::from_result` is the only place where `DashError` values are
//!   turned into text shown to a user.

use crate::error::{DashError, DashResult};
use crate::model::catalog::{CALENDAR, COUNTRY_CALLS};
use crate::model::table::RecordId;
use crate::service::table_service::Outcome;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Message,
    Error,
}

impl NoticeLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Message,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }

    /// Builds the notice for one intent on `table`.
    ///
    /// `subject` names the entry in messages (advisor or country).
    pub fn from_result(table: &str, subject: &str, result: &DashResult<Outcome>) -> Self {
        match result {
            Ok(Outcome::Added(_)) => Self::message(format!(
                "New entry for {subject} added to {}, thank you!",
                registry_label(table)
            )),
            Ok(Outcome::Edited(_)) => {
                Self::message(format!("Updated entry for {subject}, thank you!"))
            }
            Ok(Outcome::Deleted(ids)) => {
                Self::message(format!("Removing the following row(s): {}", id_list(ids)))
            }
            Err(DashError::NoSelection) => {
                Self::error("Please select one or more rows to be deleted")
            }
            Err(err) => Self::error(format!("Oops, something went wrong: {err}. Retry!")),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl Display for Notice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.level.as_str(), self.text)
    }
}

fn registry_label(table: &str) -> String {
    match table {
        CALENDAR => "the calendar".to_string(),
        COUNTRY_CALLS => "the country calls registry".to_string(),
        other => format!("`{other}`"),
    }
}

fn id_list(ids: &[RecordId]) -> String {
    let joined = ids
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{joined}]")
}

#[cfg(test)]
mod tests {
    use super::{Notice, NoticeLevel};
    use crate::error::DashError;
    use crate::model::table::RecordId;
    use crate::service::table_service::Outcome;

    #[test]
    fn added_notice_names_subject_and_registry() {
        let notice = Notice::from_result("calendar", "JD", &Ok(Outcome::Added(RecordId::new(4))));
        assert_eq!(notice.level, NoticeLevel::Message);
        assert_eq!(notice.text, "New entry for JD added to the calendar, thank you!");
    }

    #[test]
    fn empty_selection_has_dedicated_wording() {
        let notice = Notice::from_result("calendar", "", &Err(DashError::NoSelection));
        assert!(notice.is_error());
        assert_eq!(notice.text, "Please select one or more rows to be deleted");
    }

    #[test]
    fn deleted_notice_lists_ids() {
        let ids = vec![RecordId::new(2), RecordId::new(7)];
        let notice = Notice::from_result("country_calls", "", &Ok(Outcome::Deleted(ids)));
        assert_eq!(notice.text, "Removing the following row(s): [2, 7]");
    }

    #[test]
    fn other_errors_use_retry_wording() {
        let err = DashError::NotFound(RecordId::new(9));
        let notice = Notice::from_result("calendar", "JD", &Err(err));
        assert!(notice.text.starts_with("Oops, something went wrong: "));
        assert!(notice.text.ends_with(". Retry!"));
    }
}
