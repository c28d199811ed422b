//! Test case discovery

use std::path::{Path, PathBuf};

use super::case::{CaseId, TestCase};

/// Cases stored as `<input_dir>/<id>.txt`
#[derive(Debug, Clone)]
pub struct TestSuite {
    input_dir: PathBuf,
    case_count: usize,
}

impl TestSuite {
    pub fn new(input_dir: impl Into<PathBuf>, case_count: usize) -> Self {
        Self {
            input_dir: input_dir.into(),
            case_count,
        }
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn len(&self) -> usize {
        self.case_count
    }

    pub fn is_empty(&self) -> bool {
        self.case_count == 0
    }

    pub fn case(&self, ordinal: u32) -> TestCase {
        let id = CaseId::new(ordinal);
        TestCase {
            id,
            input_path: self.input_dir.join(id.file_name()),
        }
    }

    pub fn cases(&self) -> impl Iterator<Item = TestCase> + '_ {
        (0..self.case_count as u32).map(|i| self.case(i))
    }

    /// Cases whose input file is absent
    pub fn missing(&self) -> Vec<CaseId> {
        self.cases()
            .filter(|c| !c.input_path.is_file())
            .map(|c| c.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_paths() {
        let suite = TestSuite::new("/data/in", 3);
        let case = suite.case(2);
        assert_eq!(case.id, CaseId::new(2));
        assert_eq!(case.input_path, PathBuf::from("/data/in/0002.txt"));
        assert_eq!(suite.cases().count(), 3);
    }

    #[test]
    fn test_missing_inputs() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("0000.txt"), "1\n").unwrap();
        std::fs::write(dir.path().join("0002.txt"), "3\n").unwrap();

        let suite = TestSuite::new(dir.path(), 4);
        assert_eq!(suite.missing(), vec![CaseId::new(1), CaseId::new(3)]);
    }
}
