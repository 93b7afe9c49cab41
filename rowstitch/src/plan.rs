use std::ops::Range;

/// Statement plan for replacing the stored children of one aggregate with its
/// current in-memory list, derived from the stored max index alone.
///
/// Child rows are kept dense and zero-based; position in `Invoice::lines` is
/// the stored index. Stored indices `0..=old_max_index` already exist, so the
/// overlap with `0..new_count` is updated in place, the surplus is inserted,
/// and whatever remains past the new length is deleted in one tail sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildIndexPlan {
    /// Indices rewritten in place.
    pub updates: Range<u32>,
    /// Indices appended after the stored tail.
    pub inserts: Range<u32>,
    /// First index of the stored tail to drop, when the list shrank.
    pub delete_from: Option<u32>,
}

impl ChildIndexPlan {
    /// `old_max_index` is the stored maximum (-1 when no children exist yet),
    /// `new_count` the length of the in-memory list.
    pub fn compute(old_max_index: i64, new_count: usize) -> ChildIndexPlan {
        debug_assert!(old_max_index >= -1, "stored max index below -1: {old_max_index}");
        let stored = u32::try_from(old_max_index + 1).unwrap_or(0);
        let wanted = u32::try_from(new_count).unwrap_or(u32::MAX);
        let overlap = stored.min(wanted);
        ChildIndexPlan {
            updates: 0..overlap,
            inserts: overlap..wanted,
            delete_from: (stored > wanted).then_some(wanted),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.updates.is_empty() && self.inserts.is_empty() && self.delete_from.is_none()
    }
}
