/// Tracks transaction blocks of a fixed size. The boundary is checked before
/// each item, so a block closes only once its successor has arrived.
#[derive(Debug, Clone)]
pub struct BatchState {
    size: usize,
    count: usize,
    open: usize,
    closed: Vec<usize>,
}

impl BatchState {
    pub fn new(size: usize) -> Self {
        Self {
            size: size.max(1),
            count: 0,
            open: 0,
            closed: Vec::new(),
        }
    }

    /// Registers the next item. Returns `true` when the current block has to
    /// be committed and a new one opened before writing it.
    pub fn advance(&mut self) -> bool {
        let boundary = self.count > 0 && self.count % self.size == 0;
        if boundary {
            self.closed.push(self.open);
            self.open = 0;
        }
        self.count += 1;
        self.open += 1;
        boundary
    }

    /// Closes the trailing block. Returns `false` when nothing was written.
    pub fn finish(&mut self) -> bool {
        if self.open == 0 {
            return false;
        }
        self.closed.push(self.open);
        self.open = 0;
        true
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn closed_blocks(&self) -> &[usize] {
        &self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_twenty_five_items_in_blocks_of_ten() {
        let mut batch = BatchState::new(10);
        let boundaries = (0..25).filter(|_| batch.advance()).count();
        assert!(batch.finish());
        assert_eq!(boundaries, 2);
        assert_eq!(batch.closed_blocks(), &[10, 10, 5]);
        assert_eq!(batch.count(), 25);
    }

    #[test]
    fn test_exact_multiple_has_no_empty_block() {
        let mut batch = BatchState::new(5);
        for _ in 0..10 {
            batch.advance();
        }
        batch.finish();
        assert_eq!(batch.closed_blocks(), &[5, 5]);
    }

    #[test]
    fn test_empty_batch() {
        let mut batch = BatchState::new(3);
        assert!(!batch.finish());
        assert!(batch.closed_blocks().is_empty());
    }
}
