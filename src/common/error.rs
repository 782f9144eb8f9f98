use thiserror::Error;

/// poll-catalog error
#[must_use]
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    StdIo(#[from] std::io::Error),
    #[error(transparent)]
    StdTryFromInt(#[from] std::num::TryFromIntError),
    #[error(transparent)]
    SeaOrm(#[from] sea_orm::DbErr),
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
    #[error(transparent)]
    Semver(#[from] semver::Error),
    #[error("{0}")]
    PollCatalog(String),
    #[error("No {kind} matches the given query: `{id}`")]
    NotFound { kind: &'static str, id: i32 },
    #[error("The {field} must be at most {max} characters, got {len}")]
    TextTooLong {
        field: &'static str,
        max: usize,
        len: usize,
    },
    #[error("The {field} field is required")]
    Blank { field: &'static str },
    #[error("The model `{0}` is already registered")]
    AlreadyRegistered(String),
    #[error("The model `{0}` is not registered")]
    NotRegistered(String),
}

impl Error {
    pub(crate) fn question_not_found(id: i32) -> Self {
        Self::NotFound {
            kind: "question",
            id,
        }
    }

    pub(crate) fn choice_not_found(id: i32) -> Self {
        Self::NotFound { kind: "choice", id }
    }

    /// Whether the error means the requested record is absent or hidden,
    /// which a serving layer reports as "not found"
    #[must_use]
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn not_found() {
        let err = Error::question_not_found(7);
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "No question matches the given query: `7`"
        );

        assert!(!Error::Blank { field: "question_text" }.is_not_found());
    }
}
