/// A state machine whose transitions are driven by external inputs.
///
/// `transition` performs no I/O; the caller runs whatever effect the new
/// state calls for and feeds the result back as the next input.
pub trait FiniteStateMachine {
    type Input;
    type Context;

    #[must_use]
    fn transition(self, input: Self::Input, context: &mut Self::Context) -> Self;
}
