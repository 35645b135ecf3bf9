use std::ops::Range;

/// Selection and scroll window over a list the caller owns.
///
/// The list length is passed to every operation so the helper works for
/// lists that change between calls. After any operation
/// `offset <= selection < offset + window` holds, and `selection < len`
/// whenever the list is non-empty. An empty list pins both to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagedList {
    selection: usize,
    offset: usize,
    window: usize,
}

impl PagedList {
    pub fn new(window: usize) -> Self {
        Self {
            selection: 0,
            offset: 0,
            window: window.max(1),
        }
    }

    pub fn selection(&self) -> usize {
        self.selection
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn reset(&mut self) {
        self.selection = 0;
        self.offset = 0;
    }

    pub fn move_up(&mut self, len: usize) {
        if len == 0 {
            self.reset();
            return;
        }
        self.selection = if self.selection == 0 || self.selection >= len {
            len - 1
        } else {
            self.selection - 1
        };
        self.follow();
    }

    pub fn move_down(&mut self, len: usize) {
        if len == 0 {
            self.reset();
            return;
        }
        self.selection = (self.selection + 1) % len;
        self.follow();
    }

    pub fn select(&mut self, index: usize, len: usize) {
        if len == 0 {
            self.reset();
            return;
        }
        self.selection = index.min(len - 1);
        self.follow();
    }

    /// Pulls the selection back inside a list that shrank.
    pub fn clamp(&mut self, len: usize) {
        self.select(self.selection, len);
    }

    /// Indices currently inside the window.
    pub fn visible(&self, len: usize) -> Range<usize> {
        let start = self.offset.min(len);
        start..(start + self.window).min(len)
    }

    fn follow(&mut self) {
        if self.selection < self.offset {
            self.offset = self.selection;
        } else if self.selection >= self.offset + self.window {
            self.offset = self.selection + 1 - self.window;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invariant(list: &PagedList, len: usize) {
        assert!(list.offset() <= list.selection());
        assert!(list.selection() < list.offset() + list.window());
        if len == 0 {
            assert_eq!(list.selection(), 0);
        } else {
            assert!(list.selection() < len);
        }
    }

    #[test]
    fn down_wraps_to_top() {
        let mut list = PagedList::new(4);
        for _ in 0..6 {
            list.move_down(6);
        }
        assert_eq!(list.selection(), 0);
        assert_eq!(list.offset(), 0);
    }

    #[test]
    fn up_from_top_wraps_to_last_page() {
        let mut list = PagedList::new(4);
        list.move_up(10);
        assert_eq!(list.selection(), 9);
        assert_eq!(list.offset(), 6);
        assert_eq!(list.visible(10), 6..10);
    }

    #[test]
    fn window_moves_minimally() {
        let mut list = PagedList::new(4);
        for _ in 0..4 {
            list.move_down(10);
        }
        assert_eq!((list.selection(), list.offset()), (4, 1));
        list.move_up(10);
        list.move_up(10);
        assert_eq!((list.selection(), list.offset()), (2, 1));
    }

    #[test]
    fn empty_list_is_inert() {
        let mut list = PagedList::new(4);
        list.move_down(0);
        list.move_up(0);
        list.select(3, 0);
        assert_eq!((list.selection(), list.offset()), (0, 0));
        assert_eq!(list.visible(0), 0..0);
    }

    #[test]
    fn invariant_holds_for_every_length_and_walk() {
        // Deterministic pseudo-random walk over lengths 0..12 and windows 1..6.
        let mut seed: u32 = 0x2545_F491;
        for len in 0..12 {
            for window in 1..6 {
                let mut list = PagedList::new(window);
                for _ in 0..200 {
                    seed ^= seed << 13;
                    seed ^= seed >> 17;
                    seed ^= seed << 5;
                    if seed & 1 == 0 {
                        list.move_up(len);
                    } else {
                        list.move_down(len);
                    }
                    assert_invariant(&list, len);
                }
            }
        }
    }

    #[test]
    fn clamp_after_shrink() {
        let mut list = PagedList::new(4);
        list.select(8, 10);
        list.clamp(3);
        assert_eq!(list.selection(), 2);
        assert_invariant(&list, 3);
    }
}
