//! User-facing error and success notices.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NoticeRegion {
    Jobs,
    JobCount,
    SearchBar,
    Chips,
    Filters,
    Page,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    FetchingJobs,
    JobCountInvalid,
    SearchNotFound,
    FetchingChips,
    FetchingCategories,
    Initialize,
    HandleSearchingEvent,
    GettingSeenJobs,
    GettingFavorites,
    SavingPreferences,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::FetchingJobs => "fetchingJobs",
            ErrorKind::JobCountInvalid => "jobCountInvalid",
            ErrorKind::SearchNotFound => "searchNotFound",
            ErrorKind::FetchingChips => "fetchingChips",
            ErrorKind::FetchingCategories => "fetchingCategories",
            ErrorKind::Initialize => "initialize",
            ErrorKind::HandleSearchingEvent => "handleSearchingEvent",
            ErrorKind::GettingSeenJobs => "gettingSeenJobs",
            ErrorKind::GettingFavorites => "gettingFavorites",
            ErrorKind::SavingPreferences => "savingPreferences",
        }
    }

    pub fn region(self) -> NoticeRegion {
        match self {
            ErrorKind::FetchingJobs => NoticeRegion::Jobs,
            ErrorKind::JobCountInvalid => NoticeRegion::JobCount,
            ErrorKind::SearchNotFound => NoticeRegion::SearchBar,
            ErrorKind::FetchingChips => NoticeRegion::Chips,
            ErrorKind::FetchingCategories => NoticeRegion::Filters,
            ErrorKind::Initialize | ErrorKind::HandleSearchingEvent => NoticeRegion::Page,
            ErrorKind::GettingSeenJobs
            | ErrorKind::GettingFavorites
            | ErrorKind::SavingPreferences => NoticeRegion::Storage,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::FetchingJobs => "Unable to load jobs. Please try refreshing the page.",
            ErrorKind::JobCountInvalid => "Please enter a number between 1 and 30",
            ErrorKind::SearchNotFound => "No results found. Try different keywords.",
            ErrorKind::FetchingChips => "Unable to load categories. Please try refreshing.",
            ErrorKind::FetchingCategories => "Unable to load filters. Please try refreshing.",
            ErrorKind::Initialize | ErrorKind::HandleSearchingEvent => {
                "Something went wrong. Please refresh the page."
            }
            ErrorKind::GettingSeenJobs => "Unable to load your seen jobs.",
            ErrorKind::GettingFavorites => "Unable to load your favorite filters.",
            ErrorKind::SavingPreferences => "Unable to save your preferences.",
        }
    }

    /// Blocking notices need a manual reload; the rest are inline hints.
    pub fn is_blocking(self) -> bool {
        matches!(self, ErrorKind::Initialize | ErrorKind::HandleSearchingEvent)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorNotice {
    pub kind: ErrorKind,
    pub region: NoticeRegion,
    pub message: &'static str,
    pub blocking: bool,
    pub code: Option<u16>,
    pub detail: String,
}

impl ErrorNotice {
    pub fn new(kind: ErrorKind, code: Option<u16>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            region: kind.region(),
            message: kind.message(),
            blocking: kind.is_blocking(),
            code,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SuccessKind {
    SearchSuccess,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessNotice {
    pub kind: SuccessKind,
    pub region: NoticeRegion,
    pub message: &'static str,
}

impl SuccessNotice {
    pub fn new(kind: SuccessKind) -> Self {
        match kind {
            SuccessKind::SearchSuccess => Self {
                kind,
                region: NoticeRegion::SearchBar,
                message: "Found matching jobs!",
            },
        }
    }
}
