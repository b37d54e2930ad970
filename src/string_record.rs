use std::iter::FromIterator;
use std::ops;
use std::slice;

/// A single CSV record: an ordered sequence of text fields.
///
/// Every record returned by a reader is freshly allocated, so it can be kept
/// around after the reader moves on.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct StringRecord(Vec<String>);

impl StringRecord {
    /// Create a new empty `StringRecord`.
    pub fn new() -> StringRecord {
        StringRecord(vec![])
    }

    /// Create a new empty `StringRecord` with room for `capacity` fields.
    pub fn with_capacity(capacity: usize) -> StringRecord {
        StringRecord(Vec::with_capacity(capacity))
    }

    /// Return the field at index `i`.
    ///
    /// If no field at index `i` exists, then this returns `None`.
    pub fn get(&self, i: usize) -> Option<&str> {
        self.0.get(i).map(|f| &**f)
    }

    /// Returns true if and only if this record has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of fields in this record.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Add a field to the end of this record.
    pub fn push_field(&mut self, field: &str) {
        self.0.push(field.to_string());
    }

    /// Clear this record so that it has zero fields.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Returns the index of the first field equal to `name`.
    ///
    /// This is mostly useful on header records.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|f| f == name)
    }

    /// Returns an iterator over all fields in this record.
    pub fn iter(&self) -> StringRecordIter {
        StringRecordIter(self.0.iter())
    }

    /// The fields of this record as a slice.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Convert this record into its fields.
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for StringRecord {
    fn from(fields: Vec<String>) -> StringRecord {
        StringRecord(fields)
    }
}

impl<'a> From<Vec<&'a str>> for StringRecord {
    fn from(fields: Vec<&'a str>) -> StringRecord {
        fields.into_iter().collect()
    }
}

impl<'a> From<&'a [&'a str]> for StringRecord {
    fn from(fields: &'a [&'a str]) -> StringRecord {
        fields.iter().cloned().collect()
    }
}

impl<T: AsRef<str>> FromIterator<T> for StringRecord {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> StringRecord {
        StringRecord(iter.into_iter().map(|f| f.as_ref().to_string()).collect())
    }
}

impl<T: AsRef<str>> Extend<T> for StringRecord {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for f in iter {
            self.push_field(f.as_ref());
        }
    }
}

impl ops::Index<usize> for StringRecord {
    type Output = str;

    fn index(&self, i: usize) -> &str {
        &self.0[i]
    }
}

impl<T: AsRef<str>> PartialEq<[T]> for StringRecord {
    fn eq(&self, other: &[T]) -> bool {
        self.len() == other.len()
            && self.iter().zip(other).all(|(a, b)| a == b.as_ref())
    }
}

impl<T: AsRef<str>> PartialEq<Vec<T>> for StringRecord {
    fn eq(&self, other: &Vec<T>) -> bool {
        self == other.as_slice()
    }
}

impl<'a> IntoIterator for &'a StringRecord {
    type IntoIter = StringRecordIter<'a>;
    type Item = &'a str;

    fn into_iter(self) -> StringRecordIter<'a> {
        self.iter()
    }
}

/// An iterator over the fields in a string record.
#[derive(Clone, Debug)]
pub struct StringRecordIter<'r>(slice::Iter<'r, String>);

impl<'r> Iterator for StringRecordIter<'r> {
    type Item = &'r str;

    fn next(&mut self) -> Option<&'r str> {
        self.0.next().map(|f| &**f)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<'r> DoubleEndedIterator for StringRecordIter<'r> {
    fn next_back(&mut self) -> Option<&'r str> {
        self.0.next_back().map(|f| &**f)
    }
}

impl<'r> ExactSizeIterator for StringRecordIter<'r> {}
