//! Bounded cursor over the images of one search result.
//!
//! Every navigation returns a new [`Cursor`]; the item list is shared between
//! successive values, so stepping through a large result set never copies it.
//! Operations whose preconditions fail are no-ops and return an unchanged
//! cursor rather than an error.

use std::sync::Arc;

use rand::Rng;

use crate::descriptor::ImageDescriptor;

#[derive(Debug, Clone, Default)]
pub struct Cursor {
    items: Arc<[ImageDescriptor]>,
    position: Option<usize>,
}

impl Cursor {
    /// Replace the item list wholesale.
    ///
    /// An empty list hides the cursor. Otherwise the position starts at `0`,
    /// or at a uniformly random index when `random_start` is set.
    #[must_use]
    pub fn with_items<R: Rng + ?Sized>(
        items: Vec<ImageDescriptor>,
        random_start: bool,
        rng: &mut R,
    ) -> Self {
        let items: Arc<[ImageDescriptor]> = items.into();
        let position = match items.len() {
            0 => None,
            len if random_start => Some(rng.random_range(0..len)),
            _ => Some(0),
        };
        Self { items, position }
    }

    /// Same as [`Cursor::with_items`] but keeps nothing from `self`.
    #[must_use]
    pub fn set_items<R: Rng + ?Sized>(
        &self,
        items: Vec<ImageDescriptor>,
        random_start: bool,
        rng: &mut R,
    ) -> Self {
        Self::with_items(items, random_start, rng)
    }

    /// Number of items contained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub const fn position(&self) -> Option<usize> {
        self.position
    }

    /// Image at the current position, if any.
    #[must_use]
    pub fn current_image(&self) -> Option<&ImageDescriptor> {
        self.position.and_then(|idx| self.items.get(idx))
    }

    /// Borrow the internal list (read-only).
    #[must_use]
    pub fn items(&self) -> &[ImageDescriptor] {
        &self.items
    }

    /// Whether there are items after the current one.
    #[must_use]
    pub fn in_the_past(&self) -> bool {
        match self.position {
            Some(pos) => pos + 1 < self.items.len(),
            None => false,
        }
    }

    /// Move `n` items ahead, stopping at the last one.
    #[must_use]
    pub fn forward(&self, n: usize) -> Self {
        match self.position {
            Some(pos) if n > 0 => self.at(pos.saturating_add(n).min(self.items.len() - 1)),
            _ => self.clone(),
        }
    }

    /// Move `n` items back, stopping at the first one.
    #[must_use]
    pub fn backward(&self, n: usize) -> Self {
        match self.position {
            Some(pos) if pos > 0 && n > 0 => self.at(pos.saturating_sub(n)),
            _ => self.clone(),
        }
    }

    /// Jump to the `n`th item from the start (1-based, clamped).
    #[must_use]
    pub fn first(&self, n: usize) -> Self {
        if self.items.is_empty() {
            return self.clone();
        }
        self.at(n.max(1).saturating_sub(1).min(self.items.len() - 1))
    }

    /// Jump to the `n`th item from the start (1-based, clamped), or to the
    /// last item when `n` is omitted.
    #[must_use]
    pub fn last(&self, n: Option<usize>) -> Self {
        if self.position.is_none() {
            return self.clone();
        }
        let last = self.items.len() - 1;
        match n {
            Some(n) => self.at(n.saturating_sub(1).min(last)),
            None => self.at(last),
        }
    }

    /// Jump to a uniformly random item; may land on the current one.
    #[must_use]
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        if self.items.is_empty() {
            return self.clone();
        }
        self.at(rng.random_range(0..self.items.len()))
    }

    /// Clear the position regardless of the items.
    #[must_use]
    pub fn hide(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            position: None,
        }
    }

    fn at(&self, position: usize) -> Self {
        debug_assert!(position < self.items.len());
        Self {
            items: Arc::clone(&self.items),
            position: Some(position),
        }
    }
}
