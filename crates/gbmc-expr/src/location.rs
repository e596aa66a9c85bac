//! Source positions attached to instructions.

use std::fmt;

/// A source location. All fields empty/zero means "no location".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: String,
    /// Line number (1-indexed, 0 when unknown).
    pub line: u32,
    /// Column number (1-indexed, 0 when unknown).
    pub column: u32,
    /// Enclosing function.
    pub function: String,
    /// User-facing message, e.g. the text of a violated property.
    pub comment: String,
    /// Property class such as `assertion` or `pointer dereference`.
    pub property: String,
}

impl Location {
    pub fn new(file: &str, line: u32) -> Self {
        Self {
            file: file.to_string(),
            line,
            ..Self::default()
        }
    }

    pub fn with_column(mut self, column: u32) -> Self {
        self.column = column;
        self
    }

    pub fn with_function(mut self, function: &str) -> Self {
        self.function = function.to_string();
        self
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = comment.to_string();
        self
    }

    pub fn with_property(mut self, property: &str) -> Self {
        self.property = property.to_string();
        self
    }

    pub fn is_nil(&self) -> bool {
        self.file.is_empty() && self.line == 0 && self.function.is_empty()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.file.is_empty() {
            parts.push(format!("file {}", self.file));
        }
        if self.line != 0 {
            parts.push(format!("line {}", self.line));
        }
        if self.column != 0 {
            parts.push(format!("column {}", self.column));
        }
        if !self.function.is_empty() {
            parts.push(format!("function {}", self.function));
        }
        write!(f, "{}", parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        let loc = Location::new("main.c", 12).with_function("main");
        assert_eq!(loc.to_string(), "file main.c line 12 function main");
        let loc = loc.with_column(5);
        assert_eq!(loc.to_string(), "file main.c line 12 column 5 function main");
    }

    #[test]
    fn test_nil_location() {
        assert!(Location::default().is_nil());
        assert_eq!(Location::default().to_string(), "");
        assert!(!Location::new("a.c", 1).is_nil());
    }
}
