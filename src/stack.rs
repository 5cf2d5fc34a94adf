//! Native stack headroom for the recursive parser, evaluator and decompiler.

/// Left for building and reporting a "Stack overflow" error.
pub(crate) const EVAL_RED_ZONE: usize = 256 * 1024;
/// Parsing stops with a syntax error below this.
pub(crate) const PARSE_RED_ZONE: usize = 128 * 1024;
/// Decompiled source is elided below this.
pub(crate) const DECOMPILE_RED_ZONE: usize = 32 * 1024;

/// True when less than `red_zone` bytes of stack are left on the current
/// thread. Platforms that cannot tell never report exhaustion.
pub(crate) fn exhausted(red_zone: usize) -> bool {
    stacker::remaining_stack().is_some_and(|left| left < red_zone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_thread_has_headroom() {
        assert!(!exhausted(EVAL_RED_ZONE));
        assert_eq!(exhausted(usize::MAX), stacker::remaining_stack().is_some());
    }
}
