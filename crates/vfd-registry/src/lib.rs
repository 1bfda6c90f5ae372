//! Static schema of the vfd daemon API.
//!
//! Every remotely invokable action is declared once in [`actions::registry`],
//! together with its call signature and its conformance tests. The table is
//! pure data; all behavior (lowering tests to C, coverage auditing) lives in
//! the `vfdc` crate.

pub mod actions;
pub mod schema;

pub use schema::{
    Action, ArgKind, Assertion, CmpOp, ErrorSentinel, FieldCheck, FieldType, InitState,
    OptArgKind, Prereq, ReturnShape, Seq, StructDef, TestCase, TestInvocation,
};

/// Look up an action by name.
///
/// Callers that resolve references out of test invocation sequences must
/// treat `None` as a schema defect, not a runtime condition.
pub fn lookup<'a>(registry: &'a [Action], name: &str) -> Option<&'a Action> {
    registry.iter().find(|a| a.name == name)
}

/// Look up a struct schema referenced by a `Struct`/`StructList` return shape.
pub fn struct_def(name: &str) -> Option<&'static StructDef> {
    actions::STRUCTS.iter().find(|s| s.name == name)
}
