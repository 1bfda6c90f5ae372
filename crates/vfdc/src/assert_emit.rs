//! Assertion backends: one emitter per assertion kind.
//!
//! Every backend runs the prior invocations of the sequence through the
//! checked-call emitter, then renders the final invocation with the
//! comparison the assertion demands. Shape mismatches (say, a list
//! comparison against an integer-returning action) are generation-time
//! errors, never emitted C that fails at runtime.

use vfd_registry::{
    Action, Assertion, CmpOp, FieldCheck, FieldType, ReturnShape, Seq, StructDef, TestInvocation,
};

use crate::cgen::{c_int64, c_quote, CWriter};
use crate::compile::{lookup_action, GenError, GenErrorKind, NameGen};
use crate::unit_emit::{
    emit_capture_call, emit_checked_call, emit_error_check, emit_expect_error_call, free_stmt,
    lower_call, ret_decl,
};

/// Label used in the comment above each emitted assertion.
pub fn assert_label(assert: &Assertion) -> &'static str {
    match assert {
        Assertion::Run(_) => "Run",
        Assertion::Result { .. } => "Result",
        Assertion::ResultTrue(_) => "ResultTrue",
        Assertion::ResultFalse(_) => "ResultFalse",
        Assertion::LastFail(_) => "LastFail",
        Assertion::OutputEquals { .. } => "OutputEquals",
        Assertion::OutputListEquals { .. } => "OutputListEquals",
        Assertion::OutputListOfDevicesEquals { .. } => "OutputListOfDevicesEquals",
        Assertion::OutputIntEquals { .. } => "OutputIntEquals",
        Assertion::OutputIntCompare { .. } => "OutputIntCompare",
        Assertion::OutputTrue(_) => "OutputTrue",
        Assertion::OutputFalse(_) => "OutputFalse",
        Assertion::OutputLengthEquals { .. } => "OutputLengthEquals",
        Assertion::OutputBufferEquals { .. } => "OutputBufferEquals",
        Assertion::OutputStructEquals { .. } => "OutputStructEquals",
        Assertion::OutputFileMd5Equals { .. } => "OutputFileMd5Equals",
        Assertion::OutputDeviceEquals { .. } => "OutputDeviceEquals",
        Assertion::OutputHashtableEquals { .. } => "OutputHashtableEquals",
    }
}

/// Canonicalize a device path by rewriting the interface letter at the
/// fixed offset, so `/dev/vda1` and `/dev/hda1` compare equal to
/// `/dev/sda1`. Idempotent.
pub fn normalize_device(path: &str) -> String {
    path.chars()
        .enumerate()
        .map(|(i, c)| if i == 5 { 's' } else { c })
        .collect()
}

pub fn emit_assertion(
    w: &mut CWriter,
    ng: &mut NameGen,
    registry: &[Action],
    test_name: &str,
    assert: &Assertion,
) -> Result<(), GenError> {
    let seq = assert.seq();
    if seq.is_empty() {
        return Err(empty_seq_error(test_name));
    }

    match *assert {
        Assertion::Run(seq) => {
            for inv in seq {
                emit_checked_call(w, ng, registry, test_name, inv)?;
            }
            Ok(())
        }
        Assertion::Result { seq, expr } => emit_result(w, ng, registry, test_name, seq, expr),
        Assertion::ResultTrue(seq) => emit_result_bool(w, ng, registry, test_name, seq, true),
        Assertion::ResultFalse(seq) => emit_result_bool(w, ng, registry, test_name, seq, false),
        Assertion::LastFail(seq) => {
            let (last, prior) = split_seq(seq, test_name)?;
            for inv in prior {
                emit_checked_call(w, ng, registry, test_name, inv)?;
            }
            emit_expect_error_call(w, ng, registry, test_name, last)
        }
        Assertion::OutputEquals { seq, expected } => {
            emit_output_equals(w, ng, registry, test_name, seq, expected)
        }
        Assertion::OutputListEquals { seq, expected } => {
            emit_list_equals(w, ng, registry, test_name, seq, expected, false)
        }
        Assertion::OutputListOfDevicesEquals { seq, expected } => {
            emit_list_equals(w, ng, registry, test_name, seq, expected, true)
        }
        Assertion::OutputIntEquals { seq, expected } => {
            emit_int_check(w, ng, registry, test_name, seq, CmpOpOrEq::Eq, expected)
        }
        Assertion::OutputIntCompare { seq, op, expected } => {
            emit_int_check(w, ng, registry, test_name, seq, CmpOpOrEq::Cmp(op), expected)
        }
        Assertion::OutputTrue(seq) => emit_output_bool(w, ng, registry, test_name, seq, true),
        Assertion::OutputFalse(seq) => emit_output_bool(w, ng, registry, test_name, seq, false),
        Assertion::OutputLengthEquals { seq, expected } => {
            emit_length_equals(w, ng, registry, test_name, seq, expected)
        }
        Assertion::OutputBufferEquals { seq, expected } => {
            emit_buffer_equals(w, ng, registry, test_name, seq, expected)
        }
        Assertion::OutputStructEquals { seq, checks } => {
            emit_struct_equals(w, ng, registry, test_name, seq, checks)
        }
        Assertion::OutputFileMd5Equals { seq, path } => {
            emit_file_md5_equals(w, ng, registry, test_name, seq, path)
        }
        Assertion::OutputDeviceEquals { seq, expected } => {
            emit_device_equals(w, ng, registry, test_name, seq, expected)
        }
        Assertion::OutputHashtableEquals { seq, pairs } => {
            emit_hashtable_equals(w, ng, registry, test_name, seq, pairs)
        }
    }
}

fn empty_seq_error(test_name: &str) -> GenError {
    GenError::new(
        GenErrorKind::Schema,
        format!("{test_name}: assertion has an empty invocation sequence"),
    )
}

fn split_seq(
    seq: Seq,
    test_name: &str,
) -> Result<(&'static TestInvocation, &'static [TestInvocation]), GenError> {
    seq.split_last().ok_or_else(|| empty_seq_error(test_name))
}

fn shape_error(test_name: &str, label: &str, action: &Action) -> GenError {
    GenError::new(
        GenErrorKind::Unsupported,
        format!(
            "{}: {} applied to action {:?} returning {:?}",
            test_name, label, action.name, action.ret
        ),
    )
}

fn quoted(s: &str) -> String {
    format!("\"{}\"", c_quote(s.as_bytes()))
}

/// Run the prior invocations checked, then open a block, declare `r` plus
/// `aux` lines, call the final invocation into `r` and apply its error
/// check. The caller emits the comparison and closes the block.
fn begin_output<'a>(
    w: &mut CWriter,
    ng: &mut NameGen,
    registry: &'a [Action],
    test_name: &str,
    seq: Seq,
    aux: &[&str],
    size_var: Option<&str>,
) -> Result<&'a Action, GenError> {
    let (last, prior) = split_seq(seq, test_name)?;
    for inv in prior {
        emit_checked_call(w, ng, registry, test_name, inv)?;
    }
    let action = lookup_action(registry, last.action, test_name)?;
    let parts = lower_call(ng, action, last.args, test_name)?;

    w.open("{");
    w.line(&ret_decl(action.ret, "r"));
    for a in aux {
        w.line(a);
    }
    for d in &parts.decls {
        w.line(d);
    }
    w.blank();
    let extra = size_var.map(|sv| format!("&{sv}"));
    w.line(&format!("r = {};", parts.expr(extra.as_deref())));
    emit_error_check(w, action.ret, "r");
    Ok(action)
}

fn fail_and_return(w: &mut CWriter, shape: ReturnShape) {
    if let Some(free) = free_stmt(shape, "r") {
        w.line(&free);
    }
    w.line("return -1;");
    w.close("}");
}

fn end_output(w: &mut CWriter, shape: ReturnShape) {
    if let Some(free) = free_stmt(shape, "r") {
        w.line(&free);
    }
    w.close("}");
}

fn emit_result(
    w: &mut CWriter,
    ng: &mut NameGen,
    registry: &[Action],
    test_name: &str,
    seq: Seq,
    expr: &str,
) -> Result<(), GenError> {
    let n = seq.len();
    let mut vars: Vec<(String, ReturnShape, Option<String>)> = Vec::with_capacity(n);
    for (i, inv) in seq.iter().enumerate() {
        let action = lookup_action(registry, inv.action, test_name)?;
        let var = if i == n - 1 {
            "ret".to_string()
        } else {
            format!("ret{}", n - 1 - i)
        };
        let size_var = if action.ret == ReturnShape::BufferOut {
            Some(format!("{var}_size"))
        } else {
            None
        };
        vars.push((var, action.ret, size_var));
    }

    // Result variables live at function scope so the expression can see
    // all of them at once.
    for (var, shape, size_var) in &vars {
        w.line(&ret_decl(*shape, var));
        if let Some(sv) = size_var {
            w.line(&format!("size_t {sv};"));
        }
    }
    w.blank();
    for (inv, (var, _, size_var)) in seq.iter().zip(&vars) {
        emit_capture_call(w, ng, registry, test_name, inv, var, size_var.as_deref())?;
    }

    w.open(&format!("if (! ({expr})) {{"));
    w.line(&format!(
        "fprintf (stderr, \"%s: test failed: expected expression to evaluate true: %s\\n\", \"{test_name}\", {});",
        quoted(expr)
    ));
    emit_result_frees(w, &vars);
    w.line("return -1;");
    w.close("}");
    emit_result_frees(w, &vars);
    Ok(())
}

fn emit_result_frees(w: &mut CWriter, vars: &[(String, ReturnShape, Option<String>)]) {
    for (var, shape, _) in vars {
        if let Some(free) = free_stmt(*shape, var) {
            w.line(&free);
        }
    }
}

fn emit_result_bool(
    w: &mut CWriter,
    ng: &mut NameGen,
    registry: &[Action],
    test_name: &str,
    seq: Seq,
    expect_true: bool,
) -> Result<(), GenError> {
    let action = begin_output(w, ng, registry, test_name, seq, &[], None)?;
    let label = if expect_true {
        "ResultTrue"
    } else {
        "ResultFalse"
    };
    match action.ret {
        ReturnShape::Bool | ReturnShape::Int | ReturnShape::Int64 => {}
        _ => return Err(shape_error(test_name, label, action)),
    }
    emit_truth_check(w, test_name, action.ret, expect_true);
    Ok(())
}

fn emit_output_bool(
    w: &mut CWriter,
    ng: &mut NameGen,
    registry: &[Action],
    test_name: &str,
    seq: Seq,
    expect_true: bool,
) -> Result<(), GenError> {
    let action = begin_output(w, ng, registry, test_name, seq, &[], None)?;
    let label = if expect_true { "OutputTrue" } else { "OutputFalse" };
    if action.ret != ReturnShape::Bool {
        return Err(shape_error(test_name, label, action));
    }
    emit_truth_check(w, test_name, action.ret, expect_true);
    Ok(())
}

fn emit_truth_check(w: &mut CWriter, test_name: &str, shape: ReturnShape, expect_true: bool) {
    if expect_true {
        w.open("if (!r) {");
        w.line(&format!(
            "fprintf (stderr, \"%s: expected true, got false\\n\", \"{test_name}\");"
        ));
    } else {
        w.open("if (r) {");
        w.line(&format!(
            "fprintf (stderr, \"%s: expected false, got true\\n\", \"{test_name}\");"
        ));
    }
    fail_and_return(w, shape);
    w.close("}");
}

fn emit_output_equals(
    w: &mut CWriter,
    ng: &mut NameGen,
    registry: &[Action],
    test_name: &str,
    seq: Seq,
    expected: &str,
) -> Result<(), GenError> {
    let action = begin_output(w, ng, registry, test_name, seq, &[], None)?;
    let shape = action.ret;
    match shape {
        ReturnShape::String | ReturnShape::ConstString => {
            w.open(&format!("if (STRNEQ (r, {})) {{", quoted(expected)));
            w.line(&format!(
                "fprintf (stderr, \"%s: expected \\\"%s\\\" but got \\\"%s\\\"\\n\", \"{test_name}\", {}, r);",
                quoted(expected)
            ));
            fail_and_return(w, shape);
        }
        // No sentinel on this shape; NULL is an ordinary (unequal) value.
        ReturnShape::ConstOptString => {
            w.open(&format!(
                "if (r == NULL || STRNEQ (r, {})) {{",
                quoted(expected)
            ));
            w.line(&format!(
                "fprintf (stderr, \"%s: expected \\\"%s\\\" but got \\\"%s\\\"\\n\", \"{test_name}\", {}, r ? r : \"(null)\");",
                quoted(expected)
            ));
            fail_and_return(w, shape);
        }
        _ => return Err(shape_error(test_name, "OutputEquals", action)),
    }
    end_output(w, shape);
    Ok(())
}

fn emit_list_equals(
    w: &mut CWriter,
    ng: &mut NameGen,
    registry: &[Action],
    test_name: &str,
    seq: Seq,
    expected: &[&str],
    devices: bool,
) -> Result<(), GenError> {
    let needs_i = devices || !expected.is_empty();
    let aux: &[&str] = if needs_i { &["size_t i;"] } else { &[] };
    let action = begin_output(w, ng, registry, test_name, seq, aux, None)?;
    let shape = action.ret;
    if shape != ReturnShape::StringList {
        let label = if devices {
            "OutputListOfDevicesEquals"
        } else {
            "OutputListEquals"
        };
        return Err(shape_error(test_name, label, action));
    }

    if devices {
        // Canonicalize the interface letter so virtio and IDE names
        // compare equal to the sd names the registry uses.
        w.open("for (i = 0; r[i] != NULL; ++i) {");
        w.line("if (strlen (r[i]) >= 6)");
        w.line("  r[i][5] = 's';");
        w.close("}");
    }

    let normalized: Vec<String> = if devices {
        expected.iter().map(|e| normalize_device(e)).collect()
    } else {
        expected.iter().map(|e| e.to_string()).collect()
    };

    let n = normalized.len();
    if n > 0 {
        let evar = ng.fresh("expected");
        let mut decl = format!("const char *{evar}[] = {{ ");
        for e in &normalized {
            decl.push_str(&quoted(e));
            decl.push_str(", ");
        }
        decl.push_str("};");
        w.line(&decl);
        w.open(&format!("for (i = 0; i < {n}; ++i) {{"));
        w.open("if (r[i] == NULL) {");
        w.line(&format!(
            "fprintf (stderr, \"%s: list too short: expected %d elements\\n\", \"{test_name}\", {n});"
        ));
        fail_and_return(w, shape);
        w.open(&format!("if (STRNEQ (r[i], {evar}[i])) {{"));
        w.line(&format!(
            "fprintf (stderr, \"%s: expected \\\"%s\\\" at position %d but got \\\"%s\\\"\\n\", \"{test_name}\", {evar}[i], (int) i, r[i]);"
        ));
        fail_and_return(w, shape);
        w.close("}");
    }
    w.open(&format!("if (r[{n}] != NULL) {{"));
    w.line(&format!(
        "fprintf (stderr, \"%s: list too long: expected %d elements\\n\", \"{test_name}\", {n});"
    ));
    fail_and_return(w, shape);
    end_output(w, shape);
    Ok(())
}

enum CmpOpOrEq {
    Eq,
    Cmp(CmpOp),
}

fn emit_int_check(
    w: &mut CWriter,
    ng: &mut NameGen,
    registry: &[Action],
    test_name: &str,
    seq: Seq,
    op: CmpOpOrEq,
    expected: i64,
) -> Result<(), GenError> {
    let action = begin_output(w, ng, registry, test_name, seq, &[], None)?;
    let shape = action.ret;
    let label = match op {
        CmpOpOrEq::Eq => "OutputIntEquals",
        CmpOpOrEq::Cmp(_) => "OutputIntCompare",
    };
    let (fmt, expected_tok) = match shape {
        ReturnShape::Int => ("%d", expected.to_string()),
        ReturnShape::Int64 => ("%\" PRIi64 \"", c_int64(expected)),
        _ => return Err(shape_error(test_name, label, action)),
    };
    match op {
        CmpOpOrEq::Eq => {
            w.open(&format!("if (r != {expected_tok}) {{"));
            w.line(&format!(
                "fprintf (stderr, \"%s: expected {fmt} but got {fmt}\\n\", \"{test_name}\", {expected_tok}, r);"
            ));
        }
        CmpOpOrEq::Cmp(op) => {
            let c = op.c_op();
            w.open(&format!("if (! (r {c} {expected_tok})) {{"));
            w.line(&format!(
                "fprintf (stderr, \"%s: expected result {c} {fmt}, got {fmt}\\n\", \"{test_name}\", {expected_tok}, r);"
            ));
        }
    }
    fail_and_return(w, shape);
    w.close("}");
    Ok(())
}

fn emit_length_equals(
    w: &mut CWriter,
    ng: &mut NameGen,
    registry: &[Action],
    test_name: &str,
    seq: Seq,
    expected: usize,
) -> Result<(), GenError> {
    let (last, _) = split_seq(seq, test_name)?;
    let last_action = lookup_action(registry, last.action, test_name)?;
    match last_action.ret {
        ReturnShape::StringList | ReturnShape::Hashtable => {
            let action =
                begin_output(w, ng, registry, test_name, seq, &["size_t n;"], None)?;
            let shape = action.ret;
            w.line("for (n = 0; r[n] != NULL; ++n)");
            w.line("  ;");
            w.open(&format!("if (n != {expected}) {{"));
            w.line(&format!(
                "fprintf (stderr, \"%s: expected list of length %d but got %d\\n\", \"{test_name}\", {expected}, (int) n);"
            ));
            fail_and_return(w, shape);
            end_output(w, shape);
            Ok(())
        }
        ReturnShape::StructList(_) => {
            let action = begin_output(w, ng, registry, test_name, seq, &[], None)?;
            let shape = action.ret;
            w.open(&format!("if (r->len != {expected}) {{"));
            w.line(&format!(
                "fprintf (stderr, \"%s: expected list of length %d but got %d\\n\", \"{test_name}\", {expected}, (int) r->len);"
            ));
            fail_and_return(w, shape);
            end_output(w, shape);
            Ok(())
        }
        _ => Err(shape_error(test_name, "OutputLengthEquals", last_action)),
    }
}

fn emit_buffer_equals(
    w: &mut CWriter,
    ng: &mut NameGen,
    registry: &[Action],
    test_name: &str,
    seq: Seq,
    expected: &[u8],
) -> Result<(), GenError> {
    let action = begin_output(
        w,
        ng,
        registry,
        test_name,
        seq,
        &["size_t size;"],
        Some("size"),
    )?;
    let shape = action.ret;
    if shape != ReturnShape::BufferOut {
        return Err(shape_error(test_name, "OutputBufferEquals", action));
    }
    let n = expected.len();
    w.open(&format!("if (size != {n}) {{"));
    w.line(&format!(
        "fprintf (stderr, \"%s: returned size of buffer wrong, expected %d but got %d\\n\", \"{test_name}\", {n}, (int) size);"
    ));
    fail_and_return(w, shape);
    if n > 0 {
        w.open(&format!(
            "if (memcmp (r, \"{}\", {n}) != 0) {{",
            c_quote(expected)
        ));
        w.line(&format!(
            "fprintf (stderr, \"%s: buffer content mismatch\\n\", \"{test_name}\");"
        ));
        fail_and_return(w, shape);
    }
    end_output(w, shape);
    Ok(())
}

fn emit_struct_equals(
    w: &mut CWriter,
    ng: &mut NameGen,
    registry: &[Action],
    test_name: &str,
    seq: Seq,
    checks: &[FieldCheck],
) -> Result<(), GenError> {
    let action = begin_output(w, ng, registry, test_name, seq, &[], None)?;
    let shape = action.ret;
    let ReturnShape::Struct(struct_name) = shape else {
        return Err(shape_error(test_name, "OutputStructEquals", action));
    };
    let def = vfd_registry::struct_def(struct_name).ok_or_else(|| {
        GenError::new(
            GenErrorKind::Internal,
            format!("{test_name}: return shape names undeclared struct {struct_name:?}"),
        )
    })?;

    for check in checks {
        emit_field_check(w, test_name, shape, def, check)?;
    }
    end_output(w, shape);
    Ok(())
}

fn int_field(
    test_name: &str,
    def: &StructDef,
    field: &str,
) -> Result<FieldType, GenError> {
    match def.field(field) {
        Some(ty @ (FieldType::Int | FieldType::Int64)) => Ok(ty),
        Some(FieldType::Str) => Err(GenError::new(
            GenErrorKind::Schema,
            format!(
                "{}: field {:?} of struct {:?} is not an integer field",
                test_name, field, def.name
            ),
        )),
        None => Err(no_such_field(test_name, def, field)),
    }
}

fn str_field(test_name: &str, def: &StructDef, field: &str) -> Result<(), GenError> {
    match def.field(field) {
        Some(FieldType::Str) => Ok(()),
        Some(_) => Err(GenError::new(
            GenErrorKind::Schema,
            format!(
                "{}: field {:?} of struct {:?} is not a string field",
                test_name, field, def.name
            ),
        )),
        None => Err(no_such_field(test_name, def, field)),
    }
}

fn no_such_field(test_name: &str, def: &StructDef, field: &str) -> GenError {
    GenError::new(
        GenErrorKind::Schema,
        format!(
            "{}: struct {:?} has no field {:?}",
            test_name, def.name, field
        ),
    )
}

fn emit_field_check(
    w: &mut CWriter,
    test_name: &str,
    shape: ReturnShape,
    def: &StructDef,
    check: &FieldCheck,
) -> Result<(), GenError> {
    match *check {
        FieldCheck::Int { field, expected } => {
            let ty = int_field(test_name, def, field)?;
            let (fmt, tok) = int_render(ty, expected);
            w.open(&format!("if (r->{field} != {tok}) {{"));
            w.line(&format!(
                "fprintf (stderr, \"%s: {field} was {fmt}, expected {fmt}\\n\", \"{test_name}\", r->{field}, {tok});"
            ));
            fail_and_return(w, shape);
        }
        FieldCheck::IntCompare {
            field,
            op,
            expected,
        } => {
            let ty = int_field(test_name, def, field)?;
            let (fmt, tok) = int_render(ty, expected);
            let c = op.c_op();
            w.open(&format!("if (! (r->{field} {c} {tok})) {{"));
            w.line(&format!(
                "fprintf (stderr, \"%s: {field} was {fmt}, expected {c} {fmt}\\n\", \"{test_name}\", r->{field}, {tok});"
            ));
            fail_and_return(w, shape);
        }
        FieldCheck::Str { field, expected } => {
            str_field(test_name, def, field)?;
            w.open(&format!("if (STRNEQ (r->{field}, {})) {{", quoted(expected)));
            w.line(&format!(
                "fprintf (stderr, \"%s: {field} was \\\"%s\\\", expected \\\"%s\\\"\\n\", \"{test_name}\", r->{field}, {});",
                quoted(expected)
            ));
            fail_and_return(w, shape);
        }
        FieldCheck::FieldsIntEq { field, other } => {
            let a = int_field(test_name, def, field)?;
            let b = int_field(test_name, def, other)?;
            w.open(&format!("if (r->{field} != r->{other}) {{"));
            if a == FieldType::Int && b == FieldType::Int {
                w.line(&format!(
                    "fprintf (stderr, \"%s: {field} (%d) != {other} (%d)\\n\", \"{test_name}\", r->{field}, r->{other});"
                ));
            } else {
                w.line(&format!(
                    "fprintf (stderr, \"%s: {field} (%\" PRIi64 \") != {other} (%\" PRIi64 \")\\n\", \"{test_name}\", (int64_t) r->{field}, (int64_t) r->{other});"
                ));
            }
            fail_and_return(w, shape);
        }
        FieldCheck::FieldsStrEq { field, other } => {
            str_field(test_name, def, field)?;
            str_field(test_name, def, other)?;
            w.open(&format!("if (STRNEQ (r->{field}, r->{other})) {{"));
            w.line(&format!(
                "fprintf (stderr, \"%s: {field} (\\\"%s\\\") != {other} (\\\"%s\\\")\\n\", \"{test_name}\", r->{field}, r->{other});"
            ));
            fail_and_return(w, shape);
        }
    }
    Ok(())
}

fn int_render(ty: FieldType, expected: i64) -> (&'static str, String) {
    match ty {
        FieldType::Int => ("%d", expected.to_string()),
        _ => ("%\" PRIi64 \"", c_int64(expected)),
    }
}

fn emit_file_md5_equals(
    w: &mut CWriter,
    ng: &mut NameGen,
    registry: &[Action],
    test_name: &str,
    seq: Seq,
    path: &str,
) -> Result<(), GenError> {
    let (last, prior) = split_seq(seq, test_name)?;
    for inv in prior {
        emit_checked_call(w, ng, registry, test_name, inv)?;
    }
    let action = lookup_action(registry, last.action, test_name)?;
    if action.ret != ReturnShape::String {
        return Err(shape_error(test_name, "OutputFileMd5Equals", action));
    }
    let shape = action.ret;
    let parts = lower_call(ng, action, last.args, test_name)?;

    w.open("{");
    w.line("char expected[33];");
    w.line(&ret_decl(shape, "r"));
    for d in &parts.decls {
        w.line(d);
    }
    w.blank();
    w.line(&format!("md5sum ({}, expected);", quoted(path)));
    w.line(&format!("r = {};", parts.expr(None)));
    emit_error_check(w, shape, "r");
    w.open("if (STRNEQ (r, expected)) {");
    w.line(&format!(
        "fprintf (stderr, \"%s: expected \\\"%s\\\" but got \\\"%s\\\"\\n\", \"{test_name}\", expected, r);"
    ));
    fail_and_return(w, shape);
    end_output(w, shape);
    Ok(())
}

fn emit_device_equals(
    w: &mut CWriter,
    ng: &mut NameGen,
    registry: &[Action],
    test_name: &str,
    seq: Seq,
    expected: &str,
) -> Result<(), GenError> {
    let action = begin_output(w, ng, registry, test_name, seq, &[], None)?;
    let shape = action.ret;
    // Normalization rewrites the result in place, so an owned string is
    // required.
    if shape != ReturnShape::String {
        return Err(shape_error(test_name, "OutputDeviceEquals", action));
    }
    let expected = normalize_device(expected);
    w.line("if (strlen (r) >= 6)");
    w.line("  r[5] = 's';");
    w.open(&format!("if (STRNEQ (r, {})) {{", quoted(&expected)));
    w.line(&format!(
        "fprintf (stderr, \"%s: expected device \\\"%s\\\" but got \\\"%s\\\"\\n\", \"{test_name}\", {}, r);",
        quoted(&expected)
    ));
    fail_and_return(w, shape);
    end_output(w, shape);
    Ok(())
}

fn emit_hashtable_equals(
    w: &mut CWriter,
    ng: &mut NameGen,
    registry: &[Action],
    test_name: &str,
    seq: Seq,
    pairs: &[(&str, &str)],
) -> Result<(), GenError> {
    let action = begin_output(
        w,
        ng,
        registry,
        test_name,
        seq,
        &["size_t i;", "const char *val;"],
        None,
    )?;
    let shape = action.ret;
    if shape != ReturnShape::Hashtable {
        return Err(shape_error(test_name, "OutputHashtableEquals", action));
    }

    // Flat key/value array: even indices are keys.
    for (key, value) in pairs {
        w.line("val = NULL;");
        w.open("for (i = 0; r[i] != NULL; i += 2) {");
        w.open(&format!("if (STREQ (r[i], {})) {{", quoted(key)));
        w.line("val = r[i+1];");
        w.line("break;");
        w.close("}");
        w.close("}");
        w.open("if (val == NULL) {");
        w.line(&format!(
            "fprintf (stderr, \"%s: key \\\"%s\\\" not found\\n\", \"{test_name}\", {});",
            quoted(key)
        ));
        fail_and_return(w, shape);
        w.open(&format!("if (STRNEQ (val, {})) {{", quoted(value)));
        w.line(&format!(
            "fprintf (stderr, \"%s: key \\\"%s\\\": expected \\\"%s\\\" but got \\\"%s\\\"\\n\", \"{test_name}\", {}, {}, val);",
            quoted(key),
            quoted(value)
        ));
        fail_and_return(w, shape);
    }
    end_output(w, shape);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vfd_registry::actions::registry;

    fn find(name: &str) -> &'static Action {
        vfd_registry::lookup(registry(), name).expect("action")
    }

    fn render(action: &Action, idx: usize) -> String {
        let mut w = CWriter::new();
        let mut ng = NameGen::new();
        let test = &action.tests[idx];
        let name = format!("test_{}_{}", action.name, idx);
        emit_assertion(&mut w, &mut ng, registry(), &name, &test.assert).expect("emit");
        w.finish()
    }

    #[test]
    fn device_normalization_is_idempotent_and_canonicalizes() {
        assert_eq!(normalize_device("/dev/vda1"), "/dev/sda1");
        assert_eq!(normalize_device("/dev/hda"), "/dev/sda");
        assert_eq!(normalize_device("/dev/sda1"), "/dev/sda1");
        assert_eq!(
            normalize_device(&normalize_device("/dev/vdb2")),
            "/dev/sdb2"
        );
        // Too short to carry a device letter at the fixed offset.
        assert_eq!(normalize_device("/dev"), "/dev");
    }

    #[test]
    fn result_binds_final_and_prior_values() {
        let src = render(find("blockdev_getsize64"), 1);
        assert!(src.contains("int64_t ret;"));
        assert!(src.contains("int ret1;"));
        assert!(src.contains("ret = vfd_blockdev_getsize64 (v, \"/dev/sda\");"));
        assert!(src.contains("ret1 = vfd_blockdev_getss (v, \"/dev/sda\");"));
        assert!(src.contains("if (! (ret == INT64_C (524288000) && ret1 >= 512)) {"));
    }

    #[test]
    fn cannot_fail_result_has_no_sentinel_check() {
        let src = render(find("get_append"), 0);
        assert!(src.contains("ret = vfd_get_append (v);"));
        assert!(!src.contains("if (ret == NULL)\n  return -1;"));
        assert!(src.contains("if (! (ret == NULL)) {"));
    }

    #[test]
    fn list_equals_reports_short_long_and_mismatch_separately() {
        let src = render(find("lvs"), 0);
        assert!(src.contains("list too short"));
        assert!(src.contains("list too long"));
        assert!(src.contains("at position %d but got"));
    }

    #[test]
    fn device_list_normalizes_results_before_comparing() {
        let src = render(find("pvs"), 0);
        assert!(src.contains("r[i][5] = 's';"));
        assert!(src.contains("strlen (r[i]) >= 6"));
    }

    #[test]
    fn int64_comparisons_use_the_portable_format_macro() {
        let src = render(find("blockdev_getsize64"), 0);
        assert!(src.contains("if (r != INT64_C (524288000)) {"));
        assert!(src.contains("PRIi64"));
    }

    #[test]
    fn hashtable_distinguishes_missing_key_from_wrong_value() {
        let src = render(find("tune2fs_l"), 0);
        assert!(src.contains("not found"));
        assert!(src.contains("for (i = 0; r[i] != NULL; i += 2) {"));
        assert!(src.contains("free_strings (r);"));
    }

    #[test]
    fn buffer_equals_checks_size_before_content() {
        let src = render(find("read_file"), 0);
        let size = src.find("returned size of buffer wrong").expect("size check");
        let content = src.find("memcmp").expect("content check");
        assert!(size < content);
    }

    #[test]
    fn md5_assertion_computes_the_local_checksum_first() {
        let src = render(find("checksum"), 0);
        assert!(src.contains("char expected[33];"));
        assert!(src.contains("md5sum ("));
        assert!(src.contains("if (STRNEQ (r, expected)) {"));
    }

    #[test]
    fn expect_error_inverts_the_sentinel() {
        let src = render(find("part_disk"), 1);
        assert!(src.contains("vfd_push_error_handler (v, NULL, NULL);"));
        assert!(src.contains("vfd_pop_error_handler (v);"));
        assert!(src.contains("if (r != -1) {"));
        assert!(src.contains("expected failure, got success"));
    }

    #[test]
    fn expect_error_on_infallible_action_is_rejected() {
        let mut w = CWriter::new();
        let mut ng = NameGen::new();
        let assert = Assertion::LastFail(&[TestInvocation {
            action: "get_append",
            args: &[],
        }]);
        let err = emit_assertion(&mut w, &mut ng, registry(), "t", &assert).unwrap_err();
        assert_eq!(err.kind, GenErrorKind::Unsupported);
        assert!(err.message.contains("cannot fail"));
    }

    #[test]
    fn struct_field_formats_follow_field_types() {
        let src = render(find("stat"), 0);
        assert!(src.contains("r->size"));
        assert!(src.contains("vfd_free_statbuf (r);"));
    }

    #[test]
    fn result_true_renders_a_truth_check() {
        let mut w = CWriter::new();
        let mut ng = NameGen::new();
        let assert = Assertion::ResultTrue(&[TestInvocation {
            action: "blockdev_getro",
            args: &["/dev/sda"],
        }]);
        emit_assertion(&mut w, &mut ng, registry(), "t", &assert).expect("emit");
        let src = w.finish();
        assert!(src.contains("r = vfd_blockdev_getro (v, \"/dev/sda\");"));
        assert!(src.contains("if (r == -1)"));
        assert!(src.contains("if (!r) {"));
        assert!(src.contains("expected true, got false"));
    }

    #[test]
    fn result_false_renders_a_falsity_check() {
        let mut w = CWriter::new();
        let mut ng = NameGen::new();
        let assert = Assertion::ResultFalse(&[TestInvocation {
            action: "blockdev_getss",
            args: &["/dev/sda"],
        }]);
        emit_assertion(&mut w, &mut ng, registry(), "t", &assert).expect("emit");
        let src = w.finish();
        assert!(src.contains("r = vfd_blockdev_getss (v, \"/dev/sda\");"));
        assert!(src.contains("if (r) {"));
        assert!(src.contains("expected false, got true"));
    }

    #[test]
    fn result_bool_on_noninteger_return_is_rejected() {
        let mut w = CWriter::new();
        let mut ng = NameGen::new();
        let assert = Assertion::ResultTrue(&[TestInvocation {
            action: "get_path",
            args: &[],
        }]);
        let err = emit_assertion(&mut w, &mut ng, registry(), "t", &assert).unwrap_err();
        assert_eq!(err.kind, GenErrorKind::Unsupported);
        assert!(err.message.contains("ResultTrue"));
    }
}
