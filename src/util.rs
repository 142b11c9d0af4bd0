//! Small collection helpers.

/// The single element of `items`, or `None` if there are zero or several.
pub fn exactly_one<I: IntoIterator>(items: I) -> Option<I::Item> {
    let mut iter = items.into_iter();
    let only = iter.next()?;
    match iter.next() {
        Some(_) => None,
        None => Some(only),
    }
}
