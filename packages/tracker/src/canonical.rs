//! Caption normalization.
//!
//! The host decorates document captions when several windows show the same
//! logical file: a bracketed view qualifier (`Form1.cs [Design]`) and, for
//! extra window copies, a `!` marker (`Form1.cs!2 [Design]`). Focus events
//! and tracked entries are matched on the undecorated name.

/// Opens a view qualifier such as `[Design]`.
pub const QUALIFIER_OPEN: char = '[';
/// Separates a window-copy marker from the base caption.
pub const COPY_MARKER: char = '!';

/// Strip one layer of decoration from `identity`.
fn strip_once(identity: &str) -> &str {
    if !identity.contains(QUALIFIER_OPEN) {
        return identity;
    }

    let cut = match identity.find(COPY_MARKER) {
        Some(pos) => pos,
        // `contains` above guarantees a match
        None => identity.rfind(QUALIFIER_OPEN).unwrap_or(identity.len()),
    };
    identity[..cut].trim_end()
}

/// Reduce a raw caption to the name used for equality between focus events
/// and tracked entries.
///
/// Only captions containing `[` are rewritten. With a `!` present everything
/// from the first `!` is dropped, otherwise everything from the last `[`;
/// trailing whitespace is trimmed. Stripping repeats until nothing changes,
/// so `canonicalize(canonicalize(x)) == canonicalize(x)`.
pub fn canonicalize(identity: &str) -> &str {
    let mut current = identity;
    loop {
        let next = strip_once(current);
        if next.len() == current.len() {
            return current;
        }
        current = next;
    }
}

/// Whether the caption carries a bracketed qualifier, which is what makes a
/// renamed window recoverable by prefix search.
pub fn has_qualifier(identity: &str) -> bool {
    identity.contains(QUALIFIER_OPEN)
}

/// Prefix used to find a re-captioned window for `identity`.
///
/// This is the text before the first `!` when the caption has one, and the
/// whole caption otherwise. Without a copy marker only numbered copies of
/// the same window (`Form1.cs [Design]!2`) qualify, never a sibling view.
pub fn fallback_prefix(identity: &str) -> &str {
    match identity.find(COPY_MARKER) {
        Some(pos) => &identity[..pos],
        None => identity,
    }
}
