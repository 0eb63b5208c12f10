use crate::ResourceId;
use std::fmt;

/// The path of a field within a source object, e.g.
/// `metadata.annotations[nginx.ingress.kubernetes.io/limit-rps]`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<Segment>);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Segment {
    Field(String),
    Key(String),
    Index(usize),
}

/// A malformed or unsupported value in a source object.
///
/// Field errors never abort a conversion; they are collected and returned to
/// the caller alongside whatever output could be produced.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{object}: {path}: invalid value {value:?}: {detail}")]
pub struct FieldError {
    pub object: ResourceId,
    pub path: FieldPath,
    pub value: String,
    pub detail: String,
}

pub type ErrorList = Vec<FieldError>;

// === impl FieldPath ===

impl FieldPath {
    pub fn new(root: impl Into<String>) -> Self {
        Self(vec![Segment::Field(root.into())])
    }

    /// `metadata.annotations[<key>]`
    pub fn annotation(key: impl Into<String>) -> Self {
        Self::new("metadata").child("annotations").key(key)
    }

    pub fn child(mut self, name: impl Into<String>) -> Self {
        self.0.push(Segment::Field(name.into()));
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.0.push(Segment::Key(key.into()));
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.0.push(Segment::Index(index));
        self
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Field(name) if i == 0 => f.write_str(name)?,
                Segment::Field(name) => write!(f, ".{name}")?,
                Segment::Key(key) => write!(f, "[{key}]")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

// === impl FieldError ===

impl FieldError {
    pub fn invalid(
        object: ResourceId,
        path: FieldPath,
        value: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            object,
            path,
            value: value.into(),
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_annotation_paths() {
        let path = FieldPath::annotation("nginx.ingress.kubernetes.io/limit-rps");
        assert_eq!(
            path.to_string(),
            "metadata.annotations[nginx.ingress.kubernetes.io/limit-rps]"
        );
    }

    #[test]
    fn formats_indexed_paths() {
        let path = FieldPath::new("spec")
            .child("rules")
            .index(0)
            .child("http")
            .child("paths")
            .index(2);
        assert_eq!(path.to_string(), "spec.rules[0].http.paths[2]");
    }

    #[test]
    fn error_names_object_and_field() {
        let err = FieldError::invalid(
            ResourceId::new("ns-0", "web"),
            FieldPath::annotation("a"),
            "abc",
            "must be an integer",
        );
        assert_eq!(
            err.to_string(),
            "ns-0/web: metadata.annotations[a]: invalid value \"abc\": must be an integer"
        );
    }
}
