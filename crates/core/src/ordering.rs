//! Bucket ordering over an in-memory task list.
//!
//! Every function here is pure over the slice it is given: it rewrites the
//! affected tasks in place and returns the `order` writes the caller still has
//! to persist. Nothing here talks to a store or holds state between calls.
//!
//! A bucket's *display list* is the set of tasks a user can see and drag in
//! that bucket: open tasks, plus completed ones for checklist categories.
//! Append scans the whole bucket so a hidden completed task never ends up
//! sharing an order with a new one.

use std::cmp::Ordering;

use crate::model::{Bucket, Category, OrderWrite, Priority, Task, TaskPatch};

/// Display comparison: priority rank first, then `order` ascending.
pub fn compare_for_display(a: &Task, b: &Task) -> Ordering {
    a.priority()
        .rank()
        .cmp(&b.priority().rank())
        .then_with(|| a.order().cmp(&b.order()))
}

/// Stable sort, so equal keys keep their incoming sequence.
pub fn sort_for_display(tasks: &mut [Task]) {
    tasks.sort_by(compare_for_display);
}

pub fn is_displayed(task: &Task) -> bool {
    task.category.is_checklist() || !task.completed
}

/// `1 + max(order)` over the bucket, or `0` when the bucket is empty.
pub fn append_order(tasks: &[Task], bucket: Bucket) -> i64 {
    tasks
        .iter()
        .filter(|task| bucket.contains(task))
        .map(Task::order)
        .max()
        .map_or(0, |max| max + 1)
}

/// Indices into `tasks` of the bucket's display list, in display order.
fn display_indices(tasks: &[Task], bucket: Bucket) -> Vec<usize> {
    let mut indices: Vec<usize> = tasks
        .iter()
        .enumerate()
        .filter(|(_, task)| bucket.contains(task) && is_displayed(task))
        .map(|(index, _)| index)
        .collect();
    indices.sort_by_key(|&index| tasks[index].order());
    indices
}

/// The bucket's display list, cloned in display order.
pub fn display_bucket(tasks: &[Task], bucket: Bucket) -> Vec<Task> {
    display_indices(tasks, bucket)
        .into_iter()
        .map(|index| tasks[index].clone())
        .collect()
}

/// Assign `order = position` along `members`, returning writes for tasks whose order changed.
fn renumber(tasks: &mut [Task], members: &[usize]) -> Vec<OrderWrite> {
    let mut writes = Vec::new();
    for (position, &index) in members.iter().enumerate() {
        let order = position as i64;
        let task = &mut tasks[index];
        if task.order != Some(order) {
            task.order = Some(order);
            writes.push(OrderWrite::new(task.id.clone(), order));
        }
    }
    writes
}

/// Move the display-list entry at `from` to `to` and renumber the bucket `0..N-1`.
///
/// An out-of-range `from` is a no-op; `to` clamps to the end of the list.
pub fn reorder_within_bucket(
    tasks: &mut [Task],
    bucket: Bucket,
    from: usize,
    to: usize,
) -> Vec<OrderWrite> {
    let mut members = display_indices(tasks, bucket);
    if from >= members.len() {
        return Vec::new();
    }
    let moved = members.remove(from);
    members.insert(to.min(members.len()), moved);
    renumber(tasks, &members)
}

/// Drag a task into `destination` at display position `to`.
///
/// Both buckets are renumbered contiguously and the moved task takes the
/// destination's category and priority. Dragging inside the same bucket is a
/// plain reorder. Returns an empty list when `id` is unknown.
pub fn move_across_buckets(
    tasks: &mut [Task],
    id: &str,
    destination: Bucket,
    to: usize,
) -> Vec<OrderWrite> {
    let Some(moved) = tasks.iter().position(|task| task.id == id) else {
        return Vec::new();
    };
    let source = tasks[moved].bucket();

    if source == destination {
        let members = display_indices(tasks, source);
        return match members.iter().position(|&index| index == moved) {
            Some(from) => reorder_within_bucket(tasks, source, from, to),
            None => Vec::new(),
        };
    }

    let source_members: Vec<usize> = display_indices(tasks, source)
        .into_iter()
        .filter(|&index| index != moved)
        .collect();
    let mut destination_members = display_indices(tasks, destination);
    destination_members.insert(to.min(destination_members.len()), moved);

    tasks[moved].category = destination.category;
    tasks[moved].priority = Some(destination.priority);
    // Force a write for the moved task even if its numeric order happens to match.
    tasks[moved].order = None;

    let mut writes = renumber(tasks, &source_members);
    for write in renumber(tasks, &destination_members) {
        if write.id == id {
            writes.push(OrderWrite {
                bucket: Some(destination),
                ..write
            });
        } else {
            writes.push(write);
        }
    }
    writes
}

/// The category's display list: every displayed task, high priority first.
pub fn category_display(tasks: &[Task], category: Category) -> Vec<Task> {
    let mut visible: Vec<Task> = tasks
        .iter()
        .filter(|task| task.category == category && is_displayed(task))
        .cloned()
        .collect();
    sort_for_display(&mut visible);
    visible
}

/// Map a flat index in a category's display list to a bucket and a position inside it.
pub fn locate_flat_index(tasks: &[Task], category: Category, flat: usize) -> Option<(Bucket, usize)> {
    let mut offset = 0;
    for priority in Priority::ALL {
        let bucket = Bucket::new(category, priority);
        let len = display_indices(tasks, bucket).len();
        if flat < offset + len {
            return Some((bucket, flat - offset));
        }
        offset += len;
    }
    None
}

/// Fill in the priority of records written before priorities existed.
///
/// Returns the patch to persist for each migrated task. A list that has
/// already been migrated produces no patches and is left untouched.
pub fn migrate_defaults(tasks: &mut [Task]) -> Vec<(String, TaskPatch)> {
    let mut patches = Vec::new();
    for task in tasks.iter_mut().filter(|task| task.priority.is_none()) {
        let priority = Priority::legacy_default();
        let order = task.order();
        task.priority = Some(priority);
        task.order = Some(order);
        patches.push((
            task.id.clone(),
            TaskPatch {
                priority: Some(priority),
                order: Some(order),
                ..TaskPatch::default()
            },
        ));
    }
    patches
}
