//! Feature-gated logging shim shared by the decoder and the selector.
//!
//! `decode` and `select` each open one span and report their results as
//! events. Under the `tracing` feature these become `info`-level spans and
//! events of the `tracing` crate. Without it, spans are [`NoopSpan`] guards
//! and events only evaluate their field expressions.

/// Opens the span of one decode or selection pass.
///
/// Fields use `tracing` key/value syntax, e.g.
/// `trace_span!("decode", height = h, width = w)`.
#[cfg(feature = "tracing")]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        tracing::info_span!($name $(, $($field)*)?)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        $crate::trace::NoopSpan
    };
}

/// Records a named result such as a candidate count or a pick.
///
/// Every call site passes at least one `key = value` field.
#[cfg(feature = "tracing")]
macro_rules! trace_event {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        tracing::info!(name: $name, $($key = $value),+)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_event {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        let _ = ($($value,)+);
    };
}

pub(crate) use trace_event;
pub(crate) use trace_span;

/// Guard returned by `trace_span!` when logging is compiled out.
#[cfg(not(feature = "tracing"))]
pub struct NoopSpan;

#[cfg(not(feature = "tracing"))]
impl NoopSpan {
    /// Same call shape as `tracing::Span::entered`, so call sites need no
    /// feature gates.
    #[inline]
    pub fn entered(self) -> Self {
        self
    }
}
