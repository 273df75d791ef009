//! Typed error hierarchy for the Mingle navigation core.
//!
//! - `FilterError`: bad property / operator / value in a card filter
//! - `ViewError`: request parameters that cannot form a card list view
//! - `TabError`: tab and favorite validation failures
//! - `InvalidResourceError`: stale tokens and vanished subscription targets
//! - `AuthError`: access authorization failures, always propagated
//! - `SubscriptionError`: history subscription lifecycle failures

use thiserror::Error;

/// Errors raised while parsing or validating a single card filter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("Property {name} does not exist")]
    UnknownProperty { name: String },

    #[error("{value} is an invalid numeric value")]
    InvalidNumericValue { property: String, value: String },

    #[error("{value} is an invalid date")]
    InvalidDate { property: String, value: String },

    #[error("Card type {name} does not exist")]
    UnknownCardType { name: String },

    #[error("Operator '{operator}' is not supported")]
    UnknownOperator { operator: String },

    #[error("Operator '{operator}' cannot be used with property {property}")]
    UnsupportedOperator { property: String, operator: String },

    #[error("Malformed filter '{raw}': expected [property][operator][value]")]
    Malformed { raw: String },

    #[error("Filters must be given either as [property][operator][value] terms or as MQL, not both")]
    AmbiguousFilters,

    #[error("Invalid MQL: {message}")]
    InvalidMql { message: String },

    #[error("{value} is not a valid {name}")]
    InvalidHistoryParam { name: String, value: String },
}

/// Errors from turning request parameters into a `ViewParams`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error("Filter is invalid. {0}")]
    Filter(#[from] FilterError),

    #[error("'{style}' is not a valid view style")]
    InvalidStyle { style: String },

    #[error("'{order}' is not a valid sort order")]
    InvalidSortOrder { order: String },

    #[error("The {style} view requires a tree to be selected")]
    TreeRequired { style: String },

    #[error("Tree {name} does not exist")]
    UnknownTree { name: String },

    #[error("Property {name} cannot be used as a column")]
    UnknownColumn { name: String },
}

/// Errors from access authorization checks.
///
/// These are never recovered inside the core: callers receive them through
/// `Result` and hand them to their own top-level handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error(
        "Either the resource you requested does not exist or you do not have access rights to that resource."
    )]
    AccessDenied { login: String, action: String },
}

/// Errors from tab and favorite management.
#[derive(Debug, Error)]
pub enum TabError {
    #[error("Name can't be blank")]
    BlankName,

    #[error("Name {name} is already being used")]
    NameTaken { name: String },

    #[error("{name} is a predefined tab and cannot be changed")]
    Predefined { name: String },

    #[error("Tab identifier {identifier} does not exist")]
    UnknownIdentifier { identifier: String },

    #[error("Tab identifier {identifier} appears more than once")]
    DuplicateIdentifier { identifier: String },

    #[error("Favorite {id} not found")]
    FavoriteNotFound { id: i64 },

    #[error("Page {identifier} not found")]
    PageNotFound { identifier: String },

    #[error(transparent)]
    Access(#[from] AuthError),

    #[error("Storage error: {0}")]
    Store(#[source] anyhow::Error),
}

/// Where a caller should send the user after an `InvalidResourceError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    ProjectOverview,
    History,
}

/// Errors for resources that were valid once but no longer resolve.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidResourceError {
    #[error("The history feed link you followed is invalid.")]
    InvalidSpec,

    #[error(
        "The Mingle history notification from which you are trying to unsubscribe is no longer valid or no longer exists."
    )]
    SubscriptionGone { id: i64 },

    #[error("Card #{number} does not exist")]
    CardNotFound { number: u32 },

    #[error("Page {identifier} does not exist")]
    PageNotFound { identifier: String },
}

impl InvalidResourceError {
    /// The safe page to redirect to for this error.
    pub fn fallback(&self) -> Fallback {
        match self {
            Self::InvalidSpec => Fallback::History,
            Self::SubscriptionGone { .. } | Self::CardNotFound { .. } | Self::PageNotFound { .. } => {
                Fallback::ProjectOverview
            }
        }
    }
}

/// Errors from the history subscription service.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error(transparent)]
    Invalid(#[from] InvalidResourceError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Access(#[from] AuthError),

    #[error("Storage error: {0}")]
    Store(#[source] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_filter_error_names_the_value() {
        let err = FilterError::InvalidNumericValue {
            property: "Estimate".into(),
            value: "abc".into(),
        };
        assert_eq!(err.to_string(), "abc is an invalid numeric value");
    }

    #[test]
    fn view_error_wraps_filter_error() {
        let err: ViewError = FilterError::UnknownProperty {
            name: "Colour".into(),
        }
        .into();
        match &err {
            ViewError::Filter(FilterError::UnknownProperty { name }) => assert_eq!(name, "Colour"),
            _ => panic!("Expected ViewError::Filter(UnknownProperty)"),
        }
        assert!(err.to_string().contains("Colour"));
    }

    #[test]
    fn subscription_gone_redirects_to_overview() {
        let err = InvalidResourceError::SubscriptionGone { id: 7 };
        assert_eq!(err.fallback(), Fallback::ProjectOverview);
        assert_eq!(
            err.to_string(),
            "The Mingle history notification from which you are trying to unsubscribe is no longer valid or no longer exists."
        );
    }

    #[test]
    fn invalid_spec_redirects_to_history() {
        assert_eq!(InvalidResourceError::InvalidSpec.fallback(), Fallback::History);
    }

    #[test]
    fn tab_error_converts_from_auth_error() {
        let auth = AuthError::AccessDenied {
            login: "bob".into(),
            action: "rename tab".into(),
        };
        let err: TabError = auth.clone().into();
        match err {
            TabError::Access(inner) => assert_eq!(inner, auth),
            _ => panic!("Expected TabError::Access"),
        }
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&FilterError::AmbiguousFilters);
        assert_std_error(&ViewError::InvalidStyle { style: "x".into() });
        assert_std_error(&TabError::BlankName);
        assert_std_error(&InvalidResourceError::InvalidSpec);
        assert_std_error(&SubscriptionError::Invalid(InvalidResourceError::InvalidSpec));
    }
}
