//! Lowers one test case into a self-contained C test unit.
//!
//! Also owns the invocation-lowering helpers shared with the assertion
//! backends: rendering one resolved call as C declarations plus a call
//! expression, with the error-sentinel check implied by the return shape.

use vfd_registry::{
    Action, ArgKind, ErrorSentinel, InitState, Prereq, ReturnShape, TestCase, TestInvocation,
};

use crate::assert_emit;
use crate::cgen::{c_int64, c_quote, CWriter};
use crate::compile::{lookup_action, GenError, GenErrorKind, NameGen};
use crate::resolve::{self, ArgValue, OptValue};

/// A lowered call: declarations to emit inside the enclosing block, the
/// call symbol, and the rendered argument tokens.
pub(crate) struct CallParts {
    pub decls: Vec<String>,
    pub sym: String,
    pub arg_tokens: Vec<String>,
    pub optargs_var: Option<String>,
}

impl CallParts {
    /// Assemble the full call expression. `extra_last` carries the
    /// trailing out-parameter of BufferOut calls (`&size`).
    pub fn expr(&self, extra_last: Option<&str>) -> String {
        let mut args = String::from("v");
        for t in &self.arg_tokens {
            args.push_str(", ");
            args.push_str(t);
        }
        if let Some(var) = &self.optargs_var {
            args.push_str(", &");
            args.push_str(var);
        }
        if let Some(e) = extra_last {
            args.push_str(", ");
            args.push_str(e);
        }
        format!("{} ({})", self.sym, args)
    }
}

fn quoted(s: &str) -> String {
    format!("\"{}\"", c_quote(s.as_bytes()))
}

fn string_array_decl(var: &str, items: &[String]) -> String {
    let mut out = format!("const char *{var}[] = {{ ");
    for item in items {
        out.push_str(&quoted(item));
        out.push_str(", ");
    }
    out.push_str("NULL };");
    out
}

/// Resolve one invocation's literals and render them as C.
pub(crate) fn lower_call(
    ng: &mut NameGen,
    action: &Action,
    literals: &[&str],
    test_name: &str,
) -> Result<CallParts, GenError> {
    let resolved = resolve::resolve_call(action, literals, test_name)?;

    let mut decls = Vec::new();
    let mut arg_tokens = Vec::new();
    for (name, kind, value) in &resolved.args {
        match value {
            ArgValue::Str(s) => arg_tokens.push(quoted(s)),
            ArgValue::OptStr(None) => arg_tokens.push("NULL".to_string()),
            ArgValue::OptStr(Some(s)) => arg_tokens.push(quoted(s)),
            ArgValue::Buffer(bytes) => {
                // Explicit length; the literal may contain embedded zero
                // bytes so the callee must never rely on a terminator.
                arg_tokens.push(quoted_bytes(bytes));
                arg_tokens.push(bytes.len().to_string());
            }
            ArgValue::List(items) => {
                let var = ng.fresh(name);
                decls.push(string_array_decl(&var, items));
                arg_tokens.push(format!("(char **) {var}"));
            }
            ArgValue::Int(v) => match kind {
                ArgKind::Int64 => arg_tokens.push(c_int64(*v)),
                _ => arg_tokens.push(v.to_string()),
            },
            ArgValue::Bool(b) => arg_tokens.push(if *b { "1" } else { "0" }.to_string()),
            ArgValue::FilePath(p) => arg_tokens.push(quoted(p)),
        }
    }

    let sym;
    let mut optargs_var = None;
    if action.optargs.is_empty() {
        sym = format!("vfd_{}", action.call);
    } else {
        sym = format!("vfd_{}_argv", action.call);
        let var = ng.fresh("optargs");
        decls.push(format!("struct vfd_{}_argv {var};", action.call));
        for slot in &resolved.optargs {
            let Some(value) = &slot.value else {
                continue;
            };
            match value {
                OptValue::Bool(b) => {
                    decls.push(format!("{var}.{} = {};", slot.name, i32::from(*b)));
                }
                OptValue::Int(v) => decls.push(format!("{var}.{} = {v};", slot.name)),
                OptValue::Int64(v) => {
                    decls.push(format!("{var}.{} = {};", slot.name, c_int64(*v)));
                }
                OptValue::Str(s) => decls.push(format!("{var}.{} = {};", slot.name, quoted(s))),
                OptValue::List(items) => {
                    let lvar = ng.fresh(slot.name);
                    decls.push(string_array_decl(&lvar, items));
                    decls.push(format!("{var}.{} = (char **) {lvar};", slot.name));
                }
            }
        }
        decls.push(format!(
            "{var}.bitmask = UINT64_C (0x{:x});",
            resolved.bitmask
        ));
        optargs_var = Some(var);
    }

    Ok(CallParts {
        decls,
        sym,
        arg_tokens,
        optargs_var,
    })
}

fn quoted_bytes(bytes: &[u8]) -> String {
    format!("\"{}\"", c_quote(bytes))
}

/// C declaration of a result variable for the given return shape.
pub(crate) fn ret_decl(shape: ReturnShape, var: &str) -> String {
    match shape {
        ReturnShape::Err | ReturnShape::Int | ReturnShape::Bool => format!("int {var};"),
        ReturnShape::Int64 => format!("int64_t {var};"),
        ReturnShape::ConstString | ReturnShape::ConstOptString => format!("const char *{var};"),
        ReturnShape::String | ReturnShape::BufferOut => format!("char *{var};"),
        ReturnShape::StringList | ReturnShape::Hashtable => format!("char **{var};"),
        ReturnShape::Struct(name) => format!("struct vfd_{name} *{var};"),
        ReturnShape::StructList(name) => format!("struct vfd_{name}_list *{var};"),
    }
}

/// Abort the unit when the sentinel reports failure.
pub(crate) fn emit_error_check(w: &mut CWriter, shape: ReturnShape, var: &str) {
    match shape.sentinel() {
        ErrorSentinel::CannotFail => {}
        ErrorSentinel::MinusOneIsError => {
            w.line(&format!("if ({var} == -1)"));
            w.line("  return -1;");
        }
        ErrorSentinel::NullIsError => {
            w.line(&format!("if ({var} == NULL)"));
            w.line("  return -1;");
        }
    }
}

/// Release an owned result.
pub(crate) fn emit_free(w: &mut CWriter, shape: ReturnShape, var: &str) {
    match shape {
        ReturnShape::Err
        | ReturnShape::Int
        | ReturnShape::Int64
        | ReturnShape::Bool
        | ReturnShape::ConstString
        | ReturnShape::ConstOptString => {}
        ReturnShape::String | ReturnShape::BufferOut => w.line(&format!("free ({var});")),
        ReturnShape::StringList | ReturnShape::Hashtable => {
            w.line(&format!("free_strings ({var});"))
        }
        ReturnShape::Struct(name) => w.line(&format!("vfd_free_{name} ({var});")),
        ReturnShape::StructList(name) => w.line(&format!("vfd_free_{name}_list ({var});")),
    }
}

/// The free statement for a shape, for emission inside failure branches.
pub(crate) fn free_stmt(shape: ReturnShape, var: &str) -> Option<String> {
    match shape {
        ReturnShape::Err
        | ReturnShape::Int
        | ReturnShape::Int64
        | ReturnShape::Bool
        | ReturnShape::ConstString
        | ReturnShape::ConstOptString => None,
        ReturnShape::String | ReturnShape::BufferOut => Some(format!("free ({var});")),
        ReturnShape::StringList | ReturnShape::Hashtable => Some(format!("free_strings ({var});")),
        ReturnShape::Struct(name) => Some(format!("vfd_free_{name} ({var});")),
        ReturnShape::StructList(name) => Some(format!("vfd_free_{name}_list ({var});")),
    }
}

/// One invocation whose result is checked and discarded.
pub(crate) fn emit_checked_call(
    w: &mut CWriter,
    ng: &mut NameGen,
    registry: &[Action],
    test_name: &str,
    inv: &TestInvocation,
) -> Result<(), GenError> {
    let action = lookup_action(registry, inv.action, test_name)?;
    let parts = lower_call(ng, action, inv.args, test_name)?;
    let shape = action.ret;

    w.open("{");
    if shape.sentinel() == ErrorSentinel::CannotFail {
        for d in &parts.decls {
            w.line(d);
        }
        if !parts.decls.is_empty() {
            w.blank();
        }
        w.line(&format!("(void) {};", parts.expr(None)));
        w.close("}");
        return Ok(());
    }

    w.line(&ret_decl(shape, "r"));
    let size_var = if shape == ReturnShape::BufferOut {
        let sv = ng.fresh("size");
        w.line(&format!("size_t {sv};"));
        Some(sv)
    } else {
        None
    };
    for d in &parts.decls {
        w.line(d);
    }
    w.blank();
    let extra = size_var.as_ref().map(|sv| format!("&{sv}"));
    w.line(&format!("r = {};", parts.expr(extra.as_deref())));
    emit_error_check(w, shape, "r");
    emit_free(w, shape, "r");
    w.close("}");
    Ok(())
}

/// One invocation assigned to a caller-declared variable and kept alive
/// (used by `Result` assertions).
pub(crate) fn emit_capture_call(
    w: &mut CWriter,
    ng: &mut NameGen,
    registry: &[Action],
    test_name: &str,
    inv: &TestInvocation,
    var: &str,
    size_var: Option<&str>,
) -> Result<(), GenError> {
    let action = lookup_action(registry, inv.action, test_name)?;
    let parts = lower_call(ng, action, inv.args, test_name)?;
    let shape = action.ret;

    w.open("{");
    for d in &parts.decls {
        w.line(d);
    }
    if !parts.decls.is_empty() {
        w.blank();
    }
    let extra = size_var.map(|sv| format!("&{sv}"));
    w.line(&format!("{var} = {};", parts.expr(extra.as_deref())));
    emit_error_check(w, shape, var);
    w.close("}");
    Ok(())
}

/// The final invocation of a LastFail assertion: the default error
/// reporter is suspended around the call, and success means the call
/// failed through its sentinel.
pub(crate) fn emit_expect_error_call(
    w: &mut CWriter,
    ng: &mut NameGen,
    registry: &[Action],
    test_name: &str,
    inv: &TestInvocation,
) -> Result<(), GenError> {
    let action = lookup_action(registry, inv.action, test_name)?;
    let shape = action.ret;
    let fail_check = match shape.sentinel() {
        ErrorSentinel::MinusOneIsError => "if (r != -1) {",
        ErrorSentinel::NullIsError => "if (r != NULL) {",
        ErrorSentinel::CannotFail => {
            return Err(GenError::new(
                GenErrorKind::Unsupported,
                format!(
                    "{}: LastFail applied to action {:?} whose return cannot fail",
                    test_name, action.name
                ),
            ));
        }
    };
    let parts = lower_call(ng, action, inv.args, test_name)?;

    w.open("{");
    w.line(&ret_decl(shape, "r"));
    let size_var = if shape == ReturnShape::BufferOut {
        let sv = ng.fresh("size");
        w.line(&format!("size_t {sv};"));
        Some(sv)
    } else {
        None
    };
    for d in &parts.decls {
        w.line(d);
    }
    w.blank();
    w.line("vfd_push_error_handler (v, NULL, NULL);");
    let extra = size_var.as_ref().map(|sv| format!("&{sv}"));
    w.line(&format!("r = {};", parts.expr(extra.as_deref())));
    w.line("vfd_pop_error_handler (v);");
    w.open(fail_check);
    w.line(&format!(
        "fprintf (stderr, \"%s: expected failure, got success\\n\", \"{test_name}\");"
    ));
    if let Some(free) = free_stmt(shape, "r") {
        w.line(&free);
    }
    w.line("return -1;");
    w.close("}");
    w.close("}");
    Ok(())
}

fn init_label(init: InitState) -> &'static str {
    match init {
        InitState::Empty => "InitEmpty",
        InitState::Partition => "InitPartition",
        InitState::Gpt => "InitGPT",
        InitState::BasicFs => "InitBasicFS",
        InitState::BasicFsOnLvm => "InitBasicFSonLVM",
        InitState::IsoFs => "InitISOFS",
        InitState::ScratchFs => "InitScratchFS",
    }
}

/// Emit the skip helper and the unit function for one test case.
/// Returns the unit's synthesized name.
pub fn emit_unit(
    w: &mut CWriter,
    ng: &mut NameGen,
    registry: &[Action],
    action: &Action,
    idx: usize,
    test: &TestCase,
) -> Result<String, GenError> {
    let name = format!("test_{}_{}", action.name, idx);

    w.line("static int");
    w.line(&format!("{name}_skip (void)"));
    w.open("{");
    w.line("const char *str;");
    w.blank();
    w.line("str = getenv (\"TEST_ONLY\");");
    w.line(&format!("if (str && strstr (\"{name}\", str) == NULL)"));
    w.line("  return 1;");
    w.line(&format!("str = getenv (\"SKIP_{}\");", name.to_uppercase()));
    w.line("if (str && STREQ (str, \"1\"))");
    w.line("  return 1;");
    w.line(&format!(
        "str = getenv (\"SKIP_TEST_{}\");",
        action.name.to_uppercase()
    ));
    w.line("if (str && STREQ (str, \"1\"))");
    w.line("  return 1;");
    w.line("return 0;");
    w.close("}");
    w.blank();

    w.line("static int");
    w.line(&format!("{name} (void)"));
    w.open("{");
    w.open(&format!("if ({name}_skip ()) {{"));
    w.line(&format!(
        "printf (\"        %s skipped (reason: environment variable set)\\n\", \"{name}\");"
    ));
    w.line("return 0;");
    w.close("}");

    // Feature gates run strictly before fixture initialization.
    let mut groups: Vec<&str> = Vec::new();
    if let Some(g) = action.group {
        groups.push(g);
    }
    if let Prereq::IfAvailable(g) = test.prereq {
        if !groups.contains(&g) {
            groups.push(g);
        }
    }
    for group in groups {
        let var = ng.fresh("groups");
        w.blank();
        w.open("{");
        w.line(&format!("const char *{var}[] = {{ \"{group}\", NULL }};"));
        w.open(&format!("if (!vfd_feature_available (v, (char **) {var})) {{"));
        w.line(&format!(
            "printf (\"        %s skipped (reason: group %s not available)\\n\", \"{name}\", \"{group}\");"
        ));
        w.line("return 0;");
        w.close("}");
        w.close("}");
    }

    if test.prereq == Prereq::Disabled {
        w.blank();
        w.line(&format!(
            "printf (\"        %s skipped (reason: test disabled)\\n\", \"{name}\");"
        ));
        w.line("return 0;");
        w.close("}");
        w.blank();
        return Ok(name);
    }

    w.blank();
    w.line(&format!("/* {} for {} */", init_label(test.init), name));
    for call in test.init.fixture() {
        emit_checked_call(w, ng, registry, &name, call)?;
    }

    w.blank();
    w.line(&format!(
        "/* {} for {} ({}) */",
        assert_emit::assert_label(&test.assert),
        action.name,
        idx
    ));
    assert_emit::emit_assertion(w, ng, registry, &name, &test.assert)?;
    w.line("return 0;");
    w.close("}");
    w.blank();
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vfd_registry::actions::registry;

    fn find(name: &str) -> &'static Action {
        vfd_registry::lookup(registry(), name).expect("action")
    }

    #[test]
    fn optargs_call_carries_struct_and_bitmask() {
        let mut ng = NameGen::new();
        let parts = lower_call(
            &mut ng,
            find("mkfs"),
            &["ext2", "/dev/sda1", "4096"],
            "test_mkfs_0",
        )
        .expect("lower");
        assert_eq!(parts.sym, "vfd_mkfs_opts_argv");
        assert!(parts
            .decls
            .iter()
            .any(|d| d == "struct vfd_mkfs_opts_argv optargs1;"));
        assert!(parts.decls.iter().any(|d| d == "optargs1.blocksize = 4096;"));
        assert!(parts
            .decls
            .iter()
            .any(|d| d == "optargs1.bitmask = UINT64_C (0x1);"));
        assert_eq!(
            parts.expr(None),
            "vfd_mkfs_opts_argv (v, \"ext2\", \"/dev/sda1\", &optargs1)"
        );
    }

    #[test]
    fn absent_optargs_yield_zero_bitmask_and_no_field_assignment() {
        let mut ng = NameGen::new();
        let parts = lower_call(
            &mut ng,
            find("mkfs"),
            &["ext2", "/dev/sda1", ""],
            "test_mkfs_1",
        )
        .expect("lower");
        assert!(parts
            .decls
            .iter()
            .all(|d| !d.contains("optargs1.blocksize")));
        assert!(parts
            .decls
            .iter()
            .any(|d| d == "optargs1.bitmask = UINT64_C (0x0);"));
    }

    #[test]
    fn buffer_argument_passes_explicit_length() {
        let mut ng = NameGen::new();
        let parts = lower_call(&mut ng, find("write"), &["/new", "abc\0abc"], "t").expect("lower");
        assert_eq!(
            parts.expr(None),
            "vfd_write (v, \"/new\", \"abc\\000abc\", 7)"
        );
    }

    #[test]
    fn disabled_test_skips_fixtures_and_invocations() {
        let mut w = CWriter::new();
        let mut ng = NameGen::new();
        let command = find("command");
        let test = &command.tests[0];
        assert_eq!(test.prereq, Prereq::Disabled);
        let name = emit_unit(&mut w, &mut ng, registry(), command, 0, test).expect("emit");
        let src = w.finish();
        assert_eq!(name, "test_command_0");
        assert!(src.contains("skipped (reason: test disabled)"));
        assert!(!src.contains("vfd_command"));
        assert!(!src.contains("vfd_blockdev_setrw"));
    }

    #[test]
    fn unit_checks_filter_then_unit_then_action_exclusions() {
        let mut w = CWriter::new();
        let mut ng = NameGen::new();
        let touch = find("touch");
        emit_unit(&mut w, &mut ng, registry(), touch, 0, &touch.tests[0]).expect("emit");
        let src = w.finish();
        let only = src.find("TEST_ONLY").expect("filter");
        let unit = src.find("SKIP_TEST_TOUCH_0").expect("unit skip");
        let action = src.find("SKIP_TEST_TOUCH\"").expect("action skip");
        assert!(only < unit && unit < action);
    }

    #[test]
    fn feature_gate_precedes_fixture() {
        let mut w = CWriter::new();
        let mut ng = NameGen::new();
        let pvs = find("pvs");
        emit_unit(&mut w, &mut ng, registry(), pvs, 0, &pvs.tests[0]).expect("emit");
        let src = w.finish();
        let gate = src.find("vfd_feature_available").expect("gate");
        let fixture = src.find("vfd_blockdev_setrw").expect("fixture");
        assert!(gate < fixture);
    }
}
