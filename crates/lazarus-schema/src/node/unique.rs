use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

///
/// UniqueDef
///
/// One uniqueness constraint over a single field path or a combination of
/// paths (field order is significant for diagnostics only).
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct UniqueDef {
    pub fields: Vec<String>,
}

impl UniqueDef {
    #[must_use]
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether a change to `path` can alter this constraint's key.
    #[must_use]
    pub fn touches(&self, path: &str) -> bool {
        self.fields.iter().any(|field| {
            field == path
                || field
                    .strip_prefix(path)
                    .is_some_and(|rest| rest.starts_with('.'))
                || path
                    .strip_prefix(field.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }
}

impl Display for UniqueDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fields.join("+"))
    }
}
