//! Field-by-field merging of partial configuration objects.

/// A raw (partial) configuration level that can be layered over another.
///
/// `merge_from` copies every field that is set in `other` onto `self`, recursing
/// into nested objects so a partial override never wipes sibling fields.
pub trait Merge {
    fn merge_from(&mut self, other: &Self);

    /// Returns `self` with `other` layered on top.
    fn merged(&self, other: &Self) -> Self
    where
        Self: Clone,
    {
        let mut out = self.clone();
        out.merge_from(other);
        out
    }
}

pub(crate) fn merge_value<T: Clone>(into: &mut Option<T>, from: &Option<T>) {
    if from.is_some() {
        *into = from.clone();
    }
}

pub(crate) fn merge_nested<T: Merge + Clone>(into: &mut Option<T>, from: &Option<T>) {
    match (into.as_mut(), from) {
        (Some(current), Some(over)) => current.merge_from(over),
        (None, Some(over)) => *into = Some(over.clone()),
        _ => {}
    }
}
