//! Byte-range source spans

/// A half-open byte range into a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// A zero-width span at the given offset
    pub fn at(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest span covering both `self` and `other`
    pub fn merge(&self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Inclusive-range intersection check used by diagnostic deduplication
    pub fn overlaps(&self, other: Span) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge() {
        let a = Span::new(4, 10);
        let b = Span::new(8, 20);
        assert_eq!(a.merge(b), Span::new(4, 20));
    }

    #[test]
    fn test_overlaps() {
        assert!(Span::new(0, 5).overlaps(Span::new(5, 9)));
        assert!(Span::new(3, 8).overlaps(Span::new(0, 20)));
        assert!(!Span::new(0, 4).overlaps(Span::new(5, 9)));
    }
}
