use std::path::PathBuf;

/// Ordered snapshot of a folder listing. Positions in this list are what
/// "first", "last", "odd" and "even" refer to.
pub type FileList = Vec<PathBuf>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    /// 1st, 3rd, 5th ... file.
    Odd,
    /// 2nd, 4th, 6th ... file.
    Even,
}

impl Parity {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "odd" => Some(Parity::Odd),
            "even" => Some(Parity::Even),
            _ => None,
        }
    }
}

/// A single exclusion criterion. Positions are 1-based and may be out of
/// range, in which case nothing matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSpec {
    Parity(Parity),
    FromStart(i64),
    FromEnd(i64),
}

impl FilterSpec {
    /// Builds a filter from its configuration keyword. `num` is ignored for
    /// the parity kinds.
    pub fn from_kind(kind: &str, num: i64) -> Option<Self> {
        match kind {
            "first" => Some(FilterSpec::FromStart(num)),
            "last" => Some(FilterSpec::FromEnd(num)),
            other => Parity::parse(other).map(FilterSpec::Parity),
        }
    }

    /// Whether the file at 0-based `index` of a list with `len` entries is matched.
    pub fn matches(&self, index: usize, len: usize) -> bool {
        match *self {
            FilterSpec::Parity(Parity::Odd) => index % 2 == 0,
            FilterSpec::Parity(Parity::Even) => index % 2 != 0,
            FilterSpec::FromStart(n) => i64::try_from(index + 1).is_ok_and(|first| first == n),
            FilterSpec::FromEnd(n) => {
                index < len && i64::try_from(len - index).is_ok_and(|last| last == n)
            }
        }
    }

    pub fn matching_indices(self, len: usize) -> impl Iterator<Item = usize> {
        (0..len).filter(move |&i| self.matches(i, len))
    }
}

pub fn select(files: &[PathBuf], filter: FilterSpec) -> Vec<&PathBuf> {
    filter
        .matching_indices(files.len())
        .map(|i| &files[i])
        .collect()
}

/// Keyword-driven variant of [`select`]. Unknown kinds select nothing.
pub fn select_by_kind<'a>(files: &'a [PathBuf], kind: &str, num: i64) -> Vec<&'a PathBuf> {
    match FilterSpec::from_kind(kind, num) {
        Some(filter) => select(files, filter),
        None => Vec::new(),
    }
}
