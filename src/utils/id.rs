pub const DEFAULT_ID_LEN: usize = 21;

/// URL-safe random id. Spikes and reviewer identities share the format with
/// ids minted by the hosted widget.
pub fn new_id() -> String {
    nanoid::nanoid!(DEFAULT_ID_LEN)
}
