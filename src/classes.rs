use std::path::Path;

use anyhow::{Context, Result};

/// Class names of the detector, indexed by class id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassNames {
    names: Vec<String>,
}

impl ClassNames {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Read a names file: one class per line, surrounding whitespace trimmed.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read class names {}", path.display()))?;
        Ok(Self::parse(&raw))
    }

    pub fn parse(raw: &str) -> Self {
        Self {
            names: raw.lines().map(|line| line.trim().to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Label for a class id; ids without a name get a generic label.
    pub fn label(&self, class_id: usize) -> String {
        match self.names.get(class_id) {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("class_{class_id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_one_name_per_line() {
        let names = ClassNames::parse("belt\r\n  belt_corner \n");
        assert_eq!(names.len(), 2);
        assert_eq!(names.label(0), "belt");
        assert_eq!(names.label(1), "belt_corner");
    }

    #[test]
    fn unknown_ids_get_generic_label() {
        let names = ClassNames::parse("belt\n");
        assert_eq!(names.label(3), "class_3");
        assert_eq!(ClassNames::default().label(0), "class_0");
    }
}
