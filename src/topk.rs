//! Fixed-capacity retention of the highest-scoring elements
//!
//! [`TopKHeap`] is a binary min-heap keyed on [`TopScore::score`]. The root is
//! always the weakest retained element, so once the heap is full a new element
//! only enters by evicting it.

/// A scored element retained by a [`TopKHeap`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopScore {
    /// Ranking key
    pub score: u32,
    /// Caller-defined identifier, e.g. a record index
    pub id: u32,
    /// Secondary length field carried along with the element
    pub length: u32,
}
impl TopScore {
    #[must_use]
    pub fn new(score: u32, id: u32, length: u32) -> Self {
        Self { score, id, length }
    }
}

/// A min-heap that keeps the `capacity` largest scores it has been offered
#[derive(Debug, Clone)]
pub struct TopKHeap {
    capacity: usize,
    array: Vec<TopScore>,
}
impl TopKHeap {
    /// Creates an empty heap retaining at most `capacity` elements
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            array: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.array.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    /// Removes all elements, keeping the allocation
    #[inline]
    pub fn clear(&mut self) {
        self.array.clear();
    }

    /// The retained elements in storage order
    #[must_use]
    pub fn as_slice(&self) -> &[TopScore] {
        &self.array
    }

    /// The weakest retained element
    #[must_use]
    pub fn peek(&self) -> Option<&TopScore> {
        self.array.first()
    }

    /// Offers an element to the heap
    ///
    /// Below capacity the element is always inserted. At capacity it replaces
    /// the current minimum only if its score is strictly greater; otherwise it
    /// is discarded.
    pub fn add(&mut self, element: TopScore) {
        if self.array.len() < self.capacity {
            self.array.push(element);
            self.sift_up(self.array.len() - 1);
        } else if let Some(root) = self.array.first_mut() {
            if element.score > root.score {
                *root = element;
                self.sift_down(0, self.array.len());
            }
        }
    }

    /// Removes and returns the minimum element
    pub fn pop(&mut self) -> Option<TopScore> {
        if self.array.is_empty() {
            return None;
        }
        let last = self.array.len() - 1;
        self.array.swap(0, last);
        let min = self.array.pop();
        self.sift_down(0, self.array.len());
        min
    }

    /// Removes and returns the last leaf without restoring any ordering
    ///
    /// Meant for draining a heap whose order no longer matters, such as one
    /// that was just [`sort`](Self::sort)ed.
    pub fn pop_last(&mut self) -> Option<TopScore> {
        self.array.pop()
    }

    /// Sorts the retained elements in place, ascending by score
    ///
    /// An ascending array is itself a valid min-heap, so [`add`](Self::add)
    /// remains usable afterwards.
    pub fn sort(&mut self) {
        // heap sort on the min-heap yields descending order, then flip it
        for end in (1..self.array.len()).rev() {
            self.array.swap(0, end);
            self.sift_down(0, end);
        }
        self.array.reverse();
    }

    /// Consumes the heap, returning its elements ascending by score
    #[must_use]
    pub fn into_sorted_vec(mut self) -> Vec<TopScore> {
        self.sort();
        self.array
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.array[index].score >= self.array[parent].score {
                break;
            }
            self.array.swap(index, parent);
            index = parent;
        }
    }

    /// Restores heap order below `index`, considering only `array[..len]`
    fn sift_down(&mut self, mut index: usize, len: usize) {
        loop {
            let left = 2 * index + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let smallest = if right < len && self.array[right].score < self.array[left].score {
                right
            } else {
                left
            };
            if self.array[index].score <= self.array[smallest].score {
                break;
            }
            self.array.swap(index, smallest);
            index = smallest;
        }
    }
}
