/*!
Fixed-capacity binary heap over scored items.

The heap stores its elements in a one-based binary layout: the parent of slot
`i` is `i / 2` and its children are `2i` and `2i + 1`. The layout is private;
callers only see the insert / delete / sort operations and read-only views of
the live elements.

A heap is allocated with an exact capacity. Inserting into a full heap or
deleting from an empty one is a sizing bug in the caller and panics.

The same structure is used in two places:

- per-context candidate lists in the language model (`Heap<Hpair>`), filled
  with `insert_min` at load time and then sorted once with `sort_max`
- the merge frontier of the substitute engine, used as a plain max-heap
*/

use crate::ngram::Token;

/// Anything that can live in a [`Heap`]: an item ordered by an `f32` score.
pub trait Scored: Copy {
    fn score(&self) -> f32;
}

/// A (token, log-probability) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hpair {
    pub token: Token,
    pub logp: f32,
}

impl Hpair {
    pub fn new(token: Token, logp: f32) -> Self {
        Self { token, logp }
    }
}

impl Scored for Hpair {
    fn score(&self) -> f32 {
        self.logp
    }
}

#[derive(Debug, Clone, Copy)]
enum Order {
    Min,
    Max,
}

impl Order {
    /// True when `upper` may sit above `lower` without violating the order.
    #[inline]
    fn holds(self, upper: f32, lower: f32) -> bool {
        match self {
            Order::Min => upper <= lower,
            Order::Max => upper >= lower,
        }
    }
}

/// Array-backed binary heap with a fixed capacity and an explicit size.
#[derive(Debug, Clone)]
pub struct Heap<T> {
    /// Storage, zero-based: slot `i` of the heap lives at `slots[i - 1]`.
    /// Elements past `size` are stale (or hold the sorted tail during a sort).
    slots: Vec<T>,
    size: usize,
    capacity: usize,
}

impl<T: Scored> Heap<T> {
    /// Create an empty heap able to hold exactly `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            size: 0,
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The root element (minimum or maximum depending on how the heap is used).
    ///
    /// After `sort_max` / `sort_min` this is the first element of the sorted order.
    pub fn peek(&self) -> Option<&T> {
        self.as_slice().first()
    }

    /// Live elements in storage order.
    ///
    /// For a sorted heap this is the sorted sequence.
    pub fn as_slice(&self) -> &[T] {
        &self.slots[..self.size]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Drop all live elements, keeping the allocation.
    pub fn clear(&mut self) {
        self.size = 0;
    }

    pub fn insert_min(&mut self, item: T) {
        self.insert(item, Order::Min);
    }

    pub fn insert_max(&mut self, item: T) {
        self.insert(item, Order::Max);
    }

    pub fn delete_min(&mut self) -> T {
        self.delete(Order::Min)
    }

    pub fn delete_max(&mut self) -> T {
        self.delete(Order::Max)
    }

    /// Sort the elements into descending order in place.
    ///
    /// Repeatedly extracts the minimum into the growing tail of the array, so
    /// the heap property is gone afterwards: do not insert into a sorted heap.
    pub fn sort_max(&mut self) {
        self.sort(Order::Min);
    }

    /// Sort the elements into ascending order in place.
    pub fn sort_min(&mut self) {
        self.sort(Order::Max);
    }

    fn insert(&mut self, item: T, order: Order) {
        assert!(
            self.size < self.capacity,
            "heap overflow: insert into full heap (size {}, capacity {})",
            self.size,
            self.capacity
        );
        let value = item.score();
        assert!(!value.is_nan(), "heap insert: NaN score");

        self.size += 1;
        if self.slots.len() < self.size {
            self.slots.push(item);
        }

        // sift up; equal values stop the walk
        let mut n = self.size;
        while n > 1 {
            let p = n >> 1;
            if order.holds(self.slots[p - 1].score(), value) {
                break;
            }
            self.slots[n - 1] = self.slots[p - 1];
            n = p;
        }
        self.slots[n - 1] = item;
    }

    fn delete(&mut self, order: Order) -> T {
        assert!(
            self.size > 0,
            "heap underflow: delete from empty heap (capacity {})",
            self.capacity
        );
        let top = self.slots[0];
        let bot = self.slots[self.size - 1];
        self.size -= 1;
        let end = self.size;

        let value = bot.score();
        let mut p = 1;
        loop {
            let mut n = p << 1;
            if n > end {
                break;
            }
            if n < end && order.holds(self.slots[n].score(), self.slots[n - 1].score()) {
                n += 1;
            }
            if order.holds(value, self.slots[n - 1].score()) {
                break;
            }
            self.slots[p - 1] = self.slots[n - 1];
            p = n;
        }
        self.slots[p - 1] = bot;
        top
    }

    fn sort(&mut self, extract: Order) {
        let size = self.size;
        for i in (2..=size).rev() {
            let extreme = self.delete(extract);
            self.slots[i - 1] = extreme;
        }
        self.size = size;
    }
}
