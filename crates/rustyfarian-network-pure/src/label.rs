/// Associates an FSM state enum with a stable textual name, the way the
/// source's `EnumDefList` does for logging and console output.
///
/// `label()` must never panic on an unrecognized discriminant; implementers
/// route unknown codes to a catch-all (`"INVALID"` by convention) rather than
/// indexing out of bounds.
pub trait EnumLabel: Copy + Eq {
    fn label(&self) -> &'static str;
}
