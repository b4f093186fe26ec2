use super::path::{DELIMITER, Namespace, ScopedKey};
use std::str::FromStr;
use thiserror::Error;

/// One position in a [`Shape`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    /// `{ns}`: the caller's namespace segment. Matches only the user's own name, or any single
    /// segment for administrators.
    Namespace,
    /// `{any}`: exactly one segment, whatever it is.
    Any,
    /// A segment that must match verbatim.
    Literal(String),
}

/// A structured path pattern, written as a slash separated string such as `{ns}/{any}/image`.
/// A trailing `{rest}` makes the shape accept the whole subtree, including the directory itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shape {
    segments: Vec<Segment>,
    subtree: bool,
}

/// The error returned for a malformed shape pattern.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShapeError {
    /// `{rest}` found before the end of the pattern.
    #[error("{{rest}} may only end a pattern: {0}")]
    MisplacedRest(String),
    /// `{ns}` found after the start of the pattern.
    #[error("{{ns}} may only start a pattern: {0}")]
    MisplacedNamespace(String),
}

impl FromStr for Shape {
    type Err = ShapeError;

    fn from_str(pattern: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = pattern.split(DELIMITER).filter(|s| !s.is_empty()).collect();
        let mut segments = Vec::with_capacity(parts.len());
        let mut subtree = false;
        for (i, part) in parts.iter().enumerate() {
            match *part {
                "{rest}" if i + 1 == parts.len() => subtree = true,
                "{rest}" => return Err(ShapeError::MisplacedRest(pattern.to_string())),
                "{ns}" if i == 0 => segments.push(Segment::Namespace),
                "{ns}" => return Err(ShapeError::MisplacedNamespace(pattern.to_string())),
                "{any}" => segments.push(Segment::Any),
                literal => segments.push(Segment::Literal(literal.to_string())),
            }
        }
        Ok(Shape { segments, subtree })
    }
}

impl Shape {
    /// A shape matching exactly the given segments. Use this over parsing when a literal comes
    /// from configuration.
    pub fn new(segments: Vec<Segment>) -> Self {
        Shape { segments, subtree: false }
    }

    /// Makes the shape accept everything below it as well.
    pub fn with_subtree(mut self) -> Self {
        self.subtree = true;
        self
    }

    /// Whether `key` has this shape when seen from `namespace`.
    pub fn matches(&self, key: &ScopedKey, namespace: &Namespace) -> bool {
        let parts: Vec<&str> = key.segments().collect();
        if parts.len() < self.segments.len() || (!self.subtree && parts.len() != self.segments.len()) {
            return false;
        }
        self.segments.iter().zip(parts).all(|(segment, part)| match segment {
            Segment::Namespace => namespace.accepts(part),
            Segment::Any => true,
            Segment::Literal(literal) => literal == part,
        })
    }
}

/// An ordered table of shapes, each tagged with a value the back-end uses to tell the matched
/// places apart. The first matching row wins; a key matching no row is outside what the back-end
/// serves.
#[derive(Clone, Debug)]
pub struct ShapeTable<T> {
    rows: Vec<(Shape, T)>,
}

impl<T> Default for ShapeTable<T> {
    fn default() -> Self {
        ShapeTable { rows: Vec::new() }
    }
}

impl<T> ShapeTable<T> {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row given as a pattern string.
    pub fn row(self, pattern: &str, tag: T) -> Result<Self, ShapeError> {
        Ok(self.shape(pattern.parse()?, tag))
    }

    /// Appends a row given as a prepared [`Shape`].
    pub fn shape(mut self, shape: Shape, tag: T) -> Self {
        self.rows.push((shape, tag));
        self
    }

    /// The tag of the first row `key` matches.
    pub fn classify(&self, key: &ScopedKey, namespace: &Namespace) -> Option<&T> {
        self.rows.iter().find(|(shape, _)| shape.matches(key, namespace)).map(|(_, tag)| tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn own() -> Namespace {
        Namespace::Own("alice".to_string())
    }

    fn key(s: &str) -> ScopedKey {
        ScopedKey::new(s)
    }

    #[test]
    fn parses_patterns() {
        let shape: Shape = "{ns}/{any}/image/*".parse().unwrap();
        assert_eq!(
            shape,
            Shape {
                segments: vec![Segment::Namespace, Segment::Any, Segment::Literal("image".into()), Segment::Literal("*".into())],
                subtree: false,
            }
        );
        assert_eq!("a/{rest}/b".parse::<Shape>(), Err(ShapeError::MisplacedRest("a/{rest}/b".into())));
        assert_eq!("a/{ns}".parse::<Shape>(), Err(ShapeError::MisplacedNamespace("a/{ns}".into())));
    }

    #[test]
    fn exact_shapes() {
        let shape: Shape = "{ns}/{any}/image".parse().unwrap();
        assert!(shape.matches(&key("alice/store1/image"), &own()));
        assert!(!shape.matches(&key("alice/store1/image/a.png"), &own()));
        assert!(!shape.matches(&key("alice/store1"), &own()));
        assert!(!shape.matches(&key("bob/store1/image"), &own()));
        assert!(shape.matches(&key("bob/store1/image"), &Namespace::Global));
    }

    #[test]
    fn subtree_shapes_include_the_directory() {
        let shape: Shape = "{ns}/{rest}".parse().unwrap();
        assert!(shape.matches(&key("alice"), &own()));
        assert!(shape.matches(&key("alice/a/b/c"), &own()));
        assert!(!shape.matches(&key("bob/a"), &own()));
        assert!(!shape.matches(&key(""), &own()));
    }

    #[test]
    fn empty_pattern_is_the_store_root() {
        let shape: Shape = "".parse().unwrap();
        assert!(shape.matches(&key(""), &Namespace::Global));
        assert!(!shape.matches(&key("alice"), &Namespace::Global));
    }

    #[test]
    fn first_matching_row_wins() {
        let table = ShapeTable::new().row("{ns}/{any}/data.csv", 1).unwrap().row("{ns}/{any}/{any}", 2).unwrap();
        assert_eq!(table.classify(&key("alice/s/data.csv"), &own()), Some(&1));
        assert_eq!(table.classify(&key("alice/s/other.csv"), &own()), Some(&2));
        assert_eq!(table.classify(&key("alice/s"), &own()), None);
    }

    #[test]
    fn prepared_shapes_keep_literals_verbatim() {
        let shape = Shape::new(vec![Segment::Namespace, Segment::Literal("{any}".into())]);
        let table = ShapeTable::new().shape(shape, "literal").shape(Shape::new(vec![Segment::Namespace]).with_subtree(), "tree");
        assert_eq!(table.classify(&key("alice/{any}"), &own()), Some(&"literal"));
        assert_eq!(table.classify(&key("alice/other"), &own()), Some(&"tree"));
    }
}
