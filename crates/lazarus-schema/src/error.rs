use std::{collections::BTreeMap, fmt};
use thiserror::Error as ThisError;

///
/// err!
///
/// Push one formatted message into an `ErrorTree`.
///

#[macro_export]
macro_rules! err {
    ($errs:expr, $($arg:tt)*) => {{
        $errs.add(format!($($arg)*));
    }};
}

///
/// ErrorTree
///
/// Hierarchical collection of configuration errors keyed by route
/// (type name, then field or policy segment). Validation passes push into
/// one tree so a single report lists every problem, not just the first.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ErrorTree {
    messages: Vec<String>,
    children: BTreeMap<String, Self>,
}

impl ErrorTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree holding exactly one message.
    #[must_use]
    pub fn from_message(message: impl Into<String>) -> Self {
        let mut tree = Self::new();
        tree.add(message);
        tree
    }

    pub fn add(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Add one message under a child route.
    pub fn add_for(&mut self, route: impl Into<String>, message: impl Into<String>) {
        self.children
            .entry(route.into())
            .or_default()
            .add(message);
    }

    /// Merge another tree under a child route, skipping empty trees.
    pub fn merge_for(&mut self, route: impl Into<String>, other: Self) {
        if other.is_empty() {
            return;
        }

        let child = self.children.entry(route.into()).or_default();
        child.merge(other);
    }

    /// Merge another tree into this level.
    pub fn merge(&mut self, other: Self) {
        self.messages.extend(other.messages);
        for (route, tree) in other.children {
            self.merge_for(route, tree);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.children.values().all(Self::is_empty)
    }

    /// Number of messages in the whole tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len() + self.children.values().map(Self::len).sum::<usize>()
    }

    /// Flatten to `route: message` lines, depth-first in route order.
    #[must_use]
    pub fn flatten(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.flatten_into("", &mut out);
        out
    }

    fn flatten_into(&self, prefix: &str, out: &mut Vec<String>) {
        for message in &self.messages {
            if prefix.is_empty() {
                out.push(message.clone());
            } else {
                out.push(format!("{prefix}: {message}"));
            }
        }

        for (route, child) in &self.children {
            let next = if prefix.is_empty() {
                route.clone()
            } else {
                format!("{prefix}.{route}")
            };
            child.flatten_into(&next, out);
        }
    }

    /// Convert to `Ok(())` when empty.
    pub fn result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ErrorTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.flatten().iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{line}")?;
        }

        Ok(())
    }
}

///
/// ConfigurationError
///
/// Fatal schema/policy misconfiguration detected while registering types or
/// resolving a type name at call time. Never recovered at runtime.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("configuration error: {tree}")]
pub struct ConfigurationError {
    tree: ErrorTree,
}

impl ConfigurationError {
    #[must_use]
    pub const fn new(tree: ErrorTree) -> Self {
        Self { tree }
    }

    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(ErrorTree::from_message(message))
    }

    /// Unknown type name referenced by a policy, edge, or caller.
    #[must_use]
    pub fn unknown_type(name: &str) -> Self {
        Self::message(format!("unknown type '{name}'"))
    }

    #[must_use]
    pub const fn tree(&self) -> &ErrorTree {
        &self.tree
    }

    /// Flattened messages, one per problem.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.tree.flatten()
    }
}

impl From<ErrorTree> for ConfigurationError {
    fn from(tree: ErrorTree) -> Self {
        Self::new(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tree_is_ok() {
        assert!(ErrorTree::new().result().is_ok());
    }

    #[test]
    fn flatten_prefixes_nested_routes() {
        let mut tree = ErrorTree::new();
        tree.add("top");
        tree.add_for("User", "bad field");

        let mut policy = ErrorTree::new();
        err!(policy, "unknown type '{}'", "Ghost");
        tree.merge_for("Shop", policy);

        assert_eq!(
            tree.flatten(),
            vec![
                "top".to_string(),
                "Shop: unknown type 'Ghost'".to_string(),
                "User: bad field".to_string(),
            ]
        );
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn merging_empty_child_keeps_tree_empty() {
        let mut tree = ErrorTree::new();
        tree.merge_for("User", ErrorTree::new());

        assert!(tree.is_empty(), "empty child trees must not count as errors");
    }

    #[test]
    fn configuration_error_lists_every_message() {
        let mut tree = ErrorTree::new();
        tree.add_for("User", "first");
        tree.add_for("User", "second");
        let err = ConfigurationError::from(tree);

        assert_eq!(err.messages().len(), 2);
        assert!(err.to_string().contains("User: second"));
    }
}
