/// A saturating position within a list of `len` items.
///
/// The position is `None` exactly when the list is empty, so callers never
/// observe an index that points past the end.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct Cursor {
    selected: usize,
    len: usize,
}

impl Cursor {
    pub fn new(len: usize) -> Self {
        Self { selected: 0, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn position(&self) -> Option<usize> {
        if self.len == 0 {
            None
        } else {
            Some(self.selected)
        }
    }

    /// Resize the underlying list, keeping the previous position when it is
    /// still in range.
    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    /// Move to `pos`, clamped to the last item.
    pub fn set(&mut self, pos: usize) {
        if self.len > 0 {
            self.selected = pos.min(self.len - 1);
        }
    }

    /// Move forward without wrapping. Returns true if moved.
    pub fn forward(&mut self) -> bool {
        if self.len > 0 && self.selected < self.len - 1 {
            self.selected += 1;
            true
        } else {
            false
        }
    }

    /// Move back without wrapping. Returns true if moved.
    pub fn back(&mut self) -> bool {
        if self.len > 0 && self.selected > 0 {
            self.selected -= 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_has_no_position() {
        let mut c = Cursor::new(0);
        assert_eq!(c.position(), None);
        assert!(!c.forward());
        assert!(!c.back());
        c.set(3);
        assert_eq!(c.position(), None);
    }

    #[test]
    fn saturates_at_both_ends() {
        let mut c = Cursor::new(3);
        assert!(!c.back());
        assert!(c.forward());
        assert!(c.forward());
        assert!(!c.forward());
        assert_eq!(c.position(), Some(2));
        assert!(c.back());
        assert_eq!(c.position(), Some(1));
    }

    #[test]
    fn shrinking_clamps_position() {
        let mut c = Cursor::new(5);
        c.set(4);
        c.set_len(2);
        assert_eq!(c.position(), Some(1));
        c.set_len(0);
        assert_eq!(c.position(), None);
        c.set_len(4);
        assert_eq!(c.position(), Some(0));
    }

    #[test]
    fn set_clamps_to_last() {
        let mut c = Cursor::new(3);
        c.set(10);
        assert_eq!(c.position(), Some(2));
    }
}
