use std::collections::HashMap;

/// Maps header names to column positions.
///
/// When a name occurs more than once, lookups find its last occurrence.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct HeaderIndex {
    names: Vec<String>,
    exact: HashMap<String, usize>,
    folded: HashMap<String, usize>,
}

impl HeaderIndex {
    /// Build an index over the given names, in column order.
    pub fn new(names: Vec<String>) -> HeaderIndex {
        let mut exact = HashMap::with_capacity(names.len());
        let mut folded = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            exact.insert(name.clone(), i);
            folded.insert(name.to_lowercase(), i);
        }
        HeaderIndex { names, exact, folded }
    }

    /// All header names in column order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The name of column `i`, if there is one.
    pub fn get(&self, i: usize) -> Option<&str> {
        self.names.get(i).map(|name| name.as_str())
    }

    /// The number of headers.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if there are no headers.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The column position of `name`.
    pub fn index_of(&self, name: &str, case_sensitive: bool) -> Option<usize> {
        if case_sensitive {
            self.exact.get(name).copied()
        } else {
            self.folded.get(&name.to_lowercase()).copied()
        }
    }
}
