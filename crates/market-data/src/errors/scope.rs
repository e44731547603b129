/// How far a failure reaches inside one client invocation.
///
/// Used by the client to decide what happens to the remaining work after an
/// error from the transport or the parser.
///
/// # Behavior Summary
///
/// | Scope | Symbol in result? | Remaining symbols attempted? |
/// |-------|-------------------|------------------------------|
/// | `Symbol` | No | Yes |
/// | `Invocation` | No | No (deferred to a later call) |
/// | `Empty` | No | Yes |
/// | `Fatal` | n/a | n/a (construction only) |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailureScope {
    /// Recover at symbol granularity: log, record the message, omit the
    /// symbol, continue with its siblings.
    Symbol,

    /// Stop issuing outbound calls for the rest of this invocation.
    ///
    /// Used for quota exhaustion and cancellation. Future invocations are
    /// unaffected.
    Invocation,

    /// Well-formed response without data. Yields an empty result rather
    /// than an error.
    Empty,

    /// The client cannot operate with its configuration.
    Fatal,
}
