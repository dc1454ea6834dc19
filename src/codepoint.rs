// Copyright (c) 2018 Fabian Schuiki

//! Character code points and sets thereof.
//!
//! Parse tables key their actions by sets of characters. A set is stored as a
//! sorted list of disjoint, non-adjacent inclusive ranges. The end of the input
//! is a separate member of the set and never part of a numeric range.

use std::fmt;

/// The largest valid character code point.
pub const MAX: u32 = 0x10_FFFF;

/// A character code point, or the end of the input.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CodePoint(u32);

impl CodePoint {
    /// The end-of-input marker.
    pub const EOF: CodePoint = CodePoint(MAX + 1);

    /// Create a code point from an integer.
    ///
    /// Returns `None` if the value lies outside `[0, 0x10FFFF]`.
    pub fn new(value: u32) -> Option<CodePoint> {
        if value <= MAX {
            Some(CodePoint(value))
        } else {
            None
        }
    }

    /// Check whether this is the end-of-input marker.
    pub fn is_eof(self) -> bool {
        self == CodePoint::EOF
    }

    /// The numeric value of this code point, or `None` for the end of input.
    pub fn value(self) -> Option<u32> {
        if self.is_eof() {
            None
        } else {
            Some(self.0)
        }
    }

    /// The character this code point denotes, if any.
    pub fn as_char(self) -> Option<char> {
        self.value().and_then(std::char::from_u32)
    }
}

impl From<char> for CodePoint {
    fn from(c: char) -> CodePoint {
        CodePoint(c as u32)
    }
}

impl fmt::Display for CodePoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.as_char() {
            None if self.is_eof() => write!(f, "end of input"),
            Some(c) if !c.is_control() => write!(f, "'{}'", c.escape_default()),
            _ => write!(f, "U+{:04X}", self.0),
        }
    }
}

impl fmt::Debug for CodePoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_eof() {
            write!(f, "EOF")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// A set of code points.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct CodePointSet {
    ranges: Vec<(u32, u32)>,
    eof: bool,
}

impl CodePointSet {
    /// Create an empty set.
    pub fn new() -> CodePointSet {
        CodePointSet::default()
    }

    /// Check whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty() && !self.eof
    }

    /// Check whether the set contains a code point.
    pub fn contains(&self, cp: CodePoint) -> bool {
        if cp.is_eof() {
            return self.eof;
        }
        let v = cp.0;
        // The ranges are sorted and disjoint, so at most one can contain `v`.
        match self.ranges.binary_search_by(|&(lo, _)| lo.cmp(&v)) {
            Ok(_) => true,
            Err(0) => false,
            Err(i) => self.ranges[i - 1].1 >= v,
        }
    }

    /// Add a single code point.
    pub fn insert(&mut self, cp: CodePoint) {
        if cp.is_eof() {
            self.eof = true;
        } else {
            self.insert_range(cp, cp);
        }
    }

    /// Add all code points in the inclusive range `[lo, hi]`.
    ///
    /// The end-of-input marker may only be added on its own; a range with
    /// `lo > hi` adds nothing.
    pub fn insert_range(&mut self, lo: CodePoint, hi: CodePoint) {
        if lo.is_eof() || hi.is_eof() {
            if lo == hi {
                self.eof = true;
            }
            return;
        }
        let (mut lo, mut hi) = (lo.0, hi.0);
        if lo > hi {
            return;
        }

        // Absorb every range that overlaps or touches the new one.
        let start = self
            .ranges
            .iter()
            .position(|&(_, h)| h.saturating_add(1) >= lo)
            .unwrap_or(self.ranges.len());
        let mut end = start;
        while end < self.ranges.len() && self.ranges[end].0 <= hi.saturating_add(1) {
            lo = lo.min(self.ranges[end].0);
            hi = hi.max(self.ranges[end].1);
            end += 1;
        }
        self.ranges.splice(start..end, Some((lo, hi)));
    }

    /// Remove a single code point.
    pub fn remove(&mut self, cp: CodePoint) {
        if cp.is_eof() {
            self.eof = false;
        } else {
            self.remove_range(cp, cp);
        }
    }

    /// Remove all code points in the inclusive range `[lo, hi]`.
    pub fn remove_range(&mut self, lo: CodePoint, hi: CodePoint) {
        if lo.is_eof() || hi.is_eof() || lo.0 > hi.0 {
            return;
        }
        let (lo, hi) = (lo.0, hi.0);
        let mut result = Vec::with_capacity(self.ranges.len() + 1);
        for &(l, h) in &self.ranges {
            if h < lo || l > hi {
                result.push((l, h));
                continue;
            }
            if l < lo {
                result.push((l, lo - 1));
            }
            if h > hi {
                result.push((hi + 1, h));
            }
        }
        self.ranges = result;
    }

    /// Add all members of another set.
    pub fn union_with(&mut self, other: &CodePointSet) {
        for &(lo, hi) in &other.ranges {
            self.insert_range(CodePoint(lo), CodePoint(hi));
        }
        self.eof |= other.eof;
    }

    /// The numeric ranges of this set, in ascending order.
    pub fn ranges(&self) -> &[(u32, u32)] {
        &self.ranges
    }
}

impl fmt::Debug for CodePointSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[")?;
        for (i, &(lo, hi)) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            if lo == hi {
                write!(f, "{}", lo)?;
            } else {
                write!(f, "{}-{}", lo, hi)?;
            }
        }
        if self.eof {
            if !self.ranges.is_empty() {
                write!(f, ",")?;
            }
            write!(f, "EOF")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cp(v: u32) -> CodePoint {
        CodePoint::new(v).unwrap()
    }

    #[test]
    fn ranges_coalesce() {
        let mut set = CodePointSet::new();
        set.insert_range(cp(10), cp(20));
        set.insert_range(cp(30), cp(40));
        set.insert_range(cp(21), cp(29));
        assert_eq!(set.ranges(), &[(10, 40)]);
        set.insert(cp(5));
        set.insert(cp(42));
        assert_eq!(set.ranges(), &[(5, 5), (10, 40), (42, 42)]);
        set.insert_range(cp(0), cp(50));
        assert_eq!(set.ranges(), &[(0, 50)]);
    }

    #[test]
    fn removal_splits() {
        let mut set = CodePointSet::new();
        set.insert_range(cp(0), cp(10));
        set.remove(cp(5));
        assert_eq!(set.ranges(), &[(0, 4), (6, 10)]);
        set.remove_range(cp(0), cp(4));
        assert_eq!(set.ranges(), &[(6, 10)]);
        assert!(!set.contains(cp(5)));
        assert!(set.contains(cp(6)));
    }

    #[test]
    fn eof_is_discrete() {
        let mut set = CodePointSet::new();
        set.insert_range(cp(0), cp(MAX));
        assert!(!set.contains(CodePoint::EOF));
        set.insert(CodePoint::EOF);
        assert!(set.contains(CodePoint::EOF));
        set.remove_range(cp(0), cp(MAX));
        assert!(!set.is_empty());
        assert_eq!(format!("{:?}", set), "[EOF]");
    }

    #[test]
    fn code_point_display() {
        assert_eq!(CodePoint::from('a').to_string(), "'a'");
        assert_eq!(CodePoint::from('\n').to_string(), "U+000A");
        assert_eq!(CodePoint::EOF.to_string(), "end of input");
        assert_eq!(CodePoint::new(MAX + 1), None);
    }
}
