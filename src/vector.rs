//! A growable, ordered list of owned strings.
//!
//! [`Vector`] backs the token list of a command line and the key list of the
//! alias table. It grows and shrinks one element at a time and reallocates its
//! storage on every insertion or deletion, which is fine for the handful of
//! tokens a single command line produces.

/// Ordered container of strings with positional insert and delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vector {
    elements: Vec<String>,
}

impl Vector {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a container of `size` slots, each holding an empty string.
    pub fn with_len(size: usize) -> Self {
        Self {
            elements: vec![String::new(); size],
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn get(&self, index: usize) -> &str {
        &self.elements[index]
    }

    /// Overwrite the element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn set(&mut self, index: usize, value: impl Into<String>) {
        self.elements[index] = value.into();
    }

    /// Insert `value` at `index`, shifting the elements at and after `index`
    /// up by one position.
    ///
    /// # Panics
    ///
    /// Panics if `index > self.len()`.
    pub fn add(&mut self, index: usize, value: impl Into<String>) {
        assert!(
            index <= self.elements.len(),
            "insertion index {index} out of range for length {}",
            self.elements.len()
        );
        log::trace!("vector: adding value at index {index}");
        let mut grown = Vec::with_capacity(self.elements.len() + 1);
        let mut old = std::mem::take(&mut self.elements).into_iter();
        grown.extend(old.by_ref().take(index));
        grown.push(value.into());
        grown.extend(old);
        self.elements = grown;
    }

    /// Remove and return the element at `index`, compacting the elements after
    /// it down by one position.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn delete(&mut self, index: usize) -> String {
        assert!(
            index < self.elements.len(),
            "deletion index {index} out of range for length {}",
            self.elements.len()
        );
        log::trace!("vector: deleting value at index {index}");
        let mut shrunk = Vec::with_capacity(self.elements.len() - 1);
        let mut old = std::mem::take(&mut self.elements).into_iter();
        shrunk.extend(old.by_ref().take(index));
        let removed = old.next().unwrap_or_default();
        shrunk.extend(old);
        self.elements = shrunk;
        removed
    }

    /// Release the backing storage and reset the length to zero.
    pub fn empty(&mut self) {
        self.elements = Vec::new();
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.elements
    }

    /// Hand the elements over as a plain argument vector.
    pub fn into_inner(self) -> Vec<String> {
        self.elements
    }
}

impl FromIterator<String> for Vector {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Vector {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}
