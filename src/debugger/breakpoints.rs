use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    pub number: usize,
    pub file: PathBuf,
    pub line: usize,
}

/// Numbered `file:line` breakpoints. Numbers are never reused.
#[derive(Debug, Default)]
pub struct Breakpoints {
    points: Vec<Breakpoint>,
    last_number: usize,
}

impl Breakpoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, file: impl Into<PathBuf>, line: usize) -> &Breakpoint {
        self.last_number += 1;
        let point = Breakpoint {
            number: self.last_number,
            file: file.into(),
            line,
        };
        tracing::debug!(number = point.number, file = %point.file.display(), line, "breakpoint set");
        self.points.push(point);
        &self.points[self.points.len() - 1]
    }

    pub fn remove(&mut self, number: usize) -> Option<Breakpoint> {
        let index = self.points.iter().position(|p| p.number == number)?;
        let point = self.points.remove(index);
        tracing::debug!(number, "breakpoint removed");
        Some(point)
    }

    pub fn contains(&self, file: &Path, line: usize) -> bool {
        self.points.iter().any(|p| p.line == line && p.file == file)
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Breakpoint> {
        self.points.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_keep_growing_after_removal() {
        let mut points = Breakpoints::new();
        points.add("/src/a.py", 3);
        points.add("/src/a.py", 9);
        assert!(points.remove(1).is_some());
        assert_eq!(points.add("/src/b.py", 1).number, 3);
        assert!(points.contains(Path::new("/src/a.py"), 9));
        assert!(!points.contains(Path::new("/src/a.py"), 3));
        assert!(points.remove(1).is_none());
    }
}
