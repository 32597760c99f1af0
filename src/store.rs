use crate::segment::Segment;
use crate::toggle::Toggle;

/// Store is an interface for a data store that holds toggles and segments received by the
/// client.
///
/// Evaluation only ever reads through this trait, which is how conditions resolve segment keys
/// without holding on to the segments themselves. Ordinarily the only implementation is
/// [crate::Repository].
pub trait Store {
    /// Retrieve the toggle with key `toggle_key`.
    fn toggle(&self, toggle_key: &str) -> Option<&Toggle>;

    /// Retrieve the segment with key `segment_key`.
    fn segment(&self, segment_key: &str) -> Option<&Segment>;
}
