/// An element waiting in a [`PQueue`], with the cost it is ordered by and
/// the element it was reached from, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem<T, C = u32> {
    pub element: T,
    pub cost: C,
    pub parent: Option<T>,
}

/// A min-priority queue that can also be searched by an equality predicate.
///
/// Items are kept sorted, so insertion is a binary search followed by a
/// splice. Lookups by predicate are linear scans. Among items of equal cost
/// the one enqueued first is dequeued first.
#[derive(Debug, Clone)]
pub struct PQueue<T, C = u32> {
    // sorted by descending cost; the next item out is at the end
    items: Vec<QueueItem<T, C>>,
}

impl<T, C> Default for PQueue<T, C> {
    fn default() -> Self {
        PQueue { items: Vec::new() }
    }
}

impl<T, C: Ord + Copy> PQueue<T, C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, element: T, cost: C, parent: Option<T>) {
        self.insert(QueueItem {
            element,
            cost,
            parent,
        });
    }

    fn insert(&mut self, item: QueueItem<T, C>) {
        // new items go behind (i.e. before, in storage) anything of equal cost
        let ix = self.items.partition_point(|it| it.cost > item.cost);
        self.items.insert(ix, item);
    }

    pub fn dequeue(&mut self) -> Option<T> {
        self.dequeue_item().map(|it| it.element)
    }

    pub fn dequeue_item(&mut self) -> Option<QueueItem<T, C>> {
        self.items.pop()
    }

    pub fn peek(&self) -> Option<&T> {
        self.items.last().map(|it| &it.element)
    }

    pub fn peek_item(&self) -> Option<&QueueItem<T, C>> {
        self.items.last()
    }

    // index of the first match in dequeue order
    fn position<F>(&self, target: &T, eq: F) -> Option<usize>
    where
        F: Fn(&T, &T) -> bool,
    {
        self.items.iter().rposition(|it| eq(&it.element, target))
    }

    pub fn contains<F>(&self, target: &T, eq: F) -> bool
    where
        F: Fn(&T, &T) -> bool,
    {
        self.position(target, eq).is_some()
    }

    /// The cost of the first stored element matching `target`, or `None`
    /// if there is none.
    pub fn cost_of<F>(&self, target: &T, eq: F) -> Option<C>
    where
        F: Fn(&T, &T) -> bool,
    {
        self.position(target, eq).map(|ix| self.items[ix].cost)
    }

    /// Re-queues the first element matching `target` with a new cost and
    /// parent. The stored element itself is kept. Returns whether a match
    /// was found.
    pub fn update_priority<F>(&mut self, target: &T, cost: C, parent: Option<T>, eq: F) -> bool
    where
        F: Fn(&T, &T) -> bool,
    {
        match self.position(target, eq) {
            Some(ix) => {
                let item = self.items.remove(ix);
                self.insert(QueueItem {
                    element: item.element,
                    cost,
                    parent,
                });
                true
            }
            None => false,
        }
    }

    pub fn remove<F>(&mut self, target: &T, eq: F) -> bool
    where
        F: Fn(&T, &T) -> bool,
    {
        match self.position(target, eq) {
            Some(ix) => {
                self.items.remove(ix);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Items in the order they would be dequeued.
    pub fn iter(&self) -> impl Iterator<Item = &QueueItem<T, C>> {
        self.items.iter().rev()
    }
}
