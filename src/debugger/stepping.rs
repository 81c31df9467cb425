/// Run modes for the debugger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Continue,
    StepOver,
    StepInto,
    StepOut,
    Quit,
}
