//! Generation entry point and shared generator state.

use std::fmt;

use vfd_registry::{Action, Assertion};

use crate::cgen::CWriter;
use crate::coverage;
use crate::driver_emit;
use crate::resolve;
use crate::unit_emit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenErrorKind {
    /// Structural registry defect: dangling action reference, arity
    /// mismatch, Pointer parameter in a test, unknown struct field.
    Schema,
    /// A literal that cannot be interpreted for its declared kind.
    Literal,
    /// An assertion applied to a return shape it cannot check.
    Unsupported,
    Internal,
}

#[derive(Debug, Clone)]
pub struct GenError {
    pub kind: GenErrorKind,
    pub message: String,
}

impl GenError {
    pub fn new(kind: GenErrorKind, message: String) -> Self {
        Self { kind, message }
    }
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            GenErrorKind::Schema => "schema error",
            GenErrorKind::Literal => "literal error",
            GenErrorKind::Unsupported => "unsupported",
            GenErrorKind::Internal => "internal error",
        };
        write!(f, "{}: {}", kind, self.message)
    }
}

impl std::error::Error for GenError {}

#[derive(Debug, Clone)]
pub struct GenOptions {
    /// Bound on session startup, cancelled once the session is ready.
    pub launch_timeout_secs: u32,
    /// Read-only reference image attached as the fourth drive.
    pub reference_image: String,
}

impl Default for GenOptions {
    fn default() -> Self {
        Self {
            launch_timeout_secs: 600,
            reference_image: "../data/test.iso".to_string(),
        }
    }
}

/// Mints collision-free synthetic identifiers for emitted C values.
///
/// Explicit state threaded through the emitters; one counter per generation
/// run, monotonically increasing.
#[derive(Debug, Default)]
pub struct NameGen {
    next: u32,
}

impl NameGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self, prefix: &str) -> String {
        self.next += 1;
        format!("{}{}", prefix, self.next)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GenStats {
    pub nr_actions: usize,
    pub nr_units: usize,
    pub nr_untested: usize,
}

#[derive(Debug, Clone)]
pub struct GenOutput {
    pub c_src: String,
    pub stats: GenStats,
}

/// Compile the registry into the standalone conformance-test program.
pub fn generate_tests(registry: &[Action], options: &GenOptions) -> Result<GenOutput, GenError> {
    validate_registry(registry)?;

    let untested = coverage::untested_actions(registry);
    let needs_md5 = registry.iter().any(|a| {
        a.tests
            .iter()
            .any(|t| matches!(t.assert, Assertion::OutputFileMd5Equals { .. }))
    });

    let mut w = CWriter::new();
    let mut ng = NameGen::new();

    driver_emit::emit_preamble(&mut w, &untested, needs_md5);

    let mut groups: Vec<(&Action, Vec<String>)> = Vec::with_capacity(registry.len());
    for action in registry {
        let mut units = Vec::with_capacity(action.tests.len());
        for (idx, test) in action.tests.iter().enumerate() {
            let name = unit_emit::emit_unit(&mut w, &mut ng, registry, action, idx, test)?;
            units.push(name);
        }
        groups.push((action, units));
    }

    driver_emit::emit_main(&mut w, options, &groups);

    let nr_units = groups.iter().map(|(_, units)| units.len()).sum();
    Ok(GenOutput {
        c_src: w.finish(),
        stats: GenStats {
            nr_actions: registry.len(),
            nr_units,
            nr_untested: untested.len(),
        },
    })
}

/// Resolve every reference and literal up front, including fixtures and
/// disabled tests, so schema defects fail generation even when the
/// offending unit would never run.
fn validate_registry(registry: &[Action]) -> Result<(), GenError> {
    for action in registry {
        for (idx, test) in action.tests.iter().enumerate() {
            let test_name = format!("test_{}_{}", action.name, idx);
            for call in test.assert.seq().iter().chain(test.init.fixture()) {
                let target = lookup_action(registry, call.action, &test_name)?;
                resolve::resolve_call(target, call.args, &test_name)?;
            }
        }
    }
    Ok(())
}

pub(crate) fn lookup_action<'a>(
    registry: &'a [Action],
    name: &str,
    test_name: &str,
) -> Result<&'a Action, GenError> {
    vfd_registry::lookup(registry, name).ok_or_else(|| {
        GenError::new(
            GenErrorKind::Schema,
            format!("{test_name}: reference to unknown action {name:?}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namegen_is_monotonic_and_collision_free() {
        let mut ng = NameGen::new();
        let a = ng.fresh("expected");
        let b = ng.fresh("expected");
        let c = ng.fresh("optargs");
        assert_eq!(a, "expected1");
        assert_eq!(b, "expected2");
        assert_eq!(c, "optargs3");
    }

    #[test]
    fn full_registry_generates() {
        let out = generate_tests(vfd_registry::actions::registry(), &GenOptions::default())
            .expect("generate");
        assert!(out.stats.nr_units > 0);
        assert!(out.c_src.contains("int\nmain (void)"));
    }

    #[test]
    fn dangling_action_reference_fails_generation() {
        use vfd_registry::{
            Action, ArgKind, Assertion, InitState, Prereq, ReturnShape, TestCase, TestInvocation,
        };
        static BROKEN: &[Action] = &[Action {
            name: "ping",
            call: "ping",
            args: &[(ArgKind::String, "msg")],
            optargs: &[],
            ret: ReturnShape::Err,
            group: None,
            tests: &[TestCase {
                init: InitState::Empty,
                prereq: Prereq::Always,
                assert: Assertion::Run(&[TestInvocation {
                    action: "no_such_action",
                    args: &[],
                }]),
            }],
        }];
        let err = generate_tests(BROKEN, &GenOptions::default()).unwrap_err();
        assert_eq!(err.kind, GenErrorKind::Schema);
        assert!(err.message.contains("no_such_action"));
        assert!(err.message.contains("test_ping_0"));
    }
}
