//! Emits the fixed frame of the generated program: file banner, includes
//! and helpers up front, and the `main` driver that provisions the
//! backing stores, launches the session and runs every unit.

use vfd_registry::Action;

use crate::cgen::{c_quote, CWriter};
use crate::compile::GenOptions;

/// Shared backing stores created by the driver, largest first. The first
/// three become /dev/sda../dev/sdc; the read-only reference image is the
/// fourth drive.
const DISKS: &[(&str, u64)] = &[
    ("test1.img", 524_288_000),
    ("test2.img", 52_428_800),
    ("test3.img", 10_485_760),
];

pub fn emit_preamble(w: &mut CWriter, untested: &[&str], needs_md5: bool) {
    w.line("/* Conformance tests of the vfd daemon API.");
    w.line(" *");
    w.line(" * Generated by vfdc from the action registry.  ANY CHANGES YOU");
    w.line(" * MAKE TO THIS FILE WILL BE LOST.");
    w.line(" */");
    w.blank();
    w.line("#include <stdio.h>");
    w.line("#include <stdlib.h>");
    w.line("#include <stdint.h>");
    w.line("#include <inttypes.h>");
    w.line("#include <string.h>");
    w.line("#include <unistd.h>");
    w.line("#include <sys/types.h>");
    w.line("#include <fcntl.h>");
    w.blank();
    w.line("#include \"vfd.h\"");
    w.blank();
    w.line("#define STREQ(a,b) (strcmp((a),(b)) == 0)");
    w.line("#define STRNEQ(a,b) (strcmp((a),(b)) != 0)");
    w.blank();
    w.line("static vfd_h *v;");
    w.blank();
    w.line("static int close_sentinel = 0;");
    w.blank();
    w.line("static void");
    w.line("incr_close_sentinel (vfd_h *v_, void *opaque)");
    w.open("{");
    w.line("close_sentinel++;");
    w.close("}");
    w.blank();
    w.line("static void");
    w.line("free_strings (char **argv)");
    w.open("{");
    w.line("size_t i;");
    w.blank();
    w.line("for (i = 0; argv[i] != NULL; ++i)");
    w.line("  free (argv[i]);");
    w.line("free (argv);");
    w.close("}");
    w.blank();

    if needs_md5 {
        emit_md5sum_helper(w);
    }

    w.line("static void");
    w.line("no_test_warnings (void)");
    w.open("{");
    if untested.is_empty() {
        w.line("/* Every action has at least one test. */");
    }
    for name in untested {
        w.line(&format!(
            "fprintf (stderr, \"warning: \\\"vfd_{name}\\\" has no tests\\n\");"
        ));
    }
    w.close("}");
    w.blank();
}

/// Local md5 of a host file, via the md5sum binary. The digest is 32 hex
/// characters plus the terminator.
fn emit_md5sum_helper(w: &mut CWriter) {
    w.line("static void");
    w.line("md5sum (const char *filename, char *result)");
    w.open("{");
    w.line("char cmd[256];");
    w.line("FILE *pp;");
    w.blank();
    w.line("snprintf (cmd, sizeof cmd, \"md5sum %s\", filename);");
    w.line("pp = popen (cmd, \"r\");");
    w.open("if (pp == NULL) {");
    w.line("perror (cmd);");
    w.line("exit (EXIT_FAILURE);");
    w.close("}");
    w.open("if (fread (result, 1, 32, pp) != 32) {");
    w.line("perror (\"md5sum: fread\");");
    w.line("exit (EXIT_FAILURE);");
    w.close("}");
    w.open("if (pclose (pp) != 0) {");
    w.line("perror (\"pclose\");");
    w.line("exit (EXIT_FAILURE);");
    w.close("}");
    w.line("result[32] = '\\0';");
    w.close("}");
    w.blank();
}

pub fn emit_main(w: &mut CWriter, options: &GenOptions, groups: &[(&Action, Vec<String>)]) {
    let nr_tests: usize = groups.iter().map(|(_, units)| units.len()).sum();

    w.line("int");
    w.line("main (void)");
    w.open("{");
    w.line("const char *filename;");
    w.line("int fd;");
    w.line("size_t nr_tests, test_num = 0;");
    w.line("size_t nr_failed = 0;");
    w.blank();
    w.line("no_test_warnings ();");
    w.blank();
    w.line("v = vfd_create ();");
    w.open("if (v == NULL) {");
    w.line("printf (\"FAIL: vfd_create\\n\");");
    w.line("exit (EXIT_FAILURE);");
    w.close("}");
    w.blank();
    w.line("vfd_register_close_callback (v, incr_close_sentinel, NULL);");
    w.blank();

    for (name, size) in DISKS {
        w.line(&format!("filename = \"{name}\";"));
        w.line("fd = open (filename, O_WRONLY|O_CREAT|O_NOCTTY|O_TRUNC, 0666);");
        w.open("if (fd == -1) {");
        w.line("perror (filename);");
        w.line("exit (EXIT_FAILURE);");
        w.close("}");
        w.open(&format!("if (ftruncate (fd, {size}) == -1) {{"));
        w.line("perror (\"ftruncate\");");
        w.line("close (fd);");
        w.line("unlink (filename);");
        w.line("exit (EXIT_FAILURE);");
        w.close("}");
        w.open("if (close (fd) == -1) {");
        w.line("perror (filename);");
        w.line("unlink (filename);");
        w.line("exit (EXIT_FAILURE);");
        w.close("}");
        w.open("if (vfd_add_drive (v, filename) == -1) {");
        w.line("printf (\"FAIL: vfd_add_drive %s\\n\", filename);");
        w.line("exit (EXIT_FAILURE);");
        w.close("}");
        w.blank();
    }

    let iso = c_quote(options.reference_image.as_bytes());
    w.open(&format!("if (vfd_add_drive_ro (v, \"{iso}\") == -1) {{"));
    w.line(&format!("printf (\"FAIL: vfd_add_drive_ro {iso}\\n\");"));
    w.line("exit (EXIT_FAILURE);");
    w.close("}");
    w.blank();

    // Watchdog in case launch wedges; cancelled once the session is up.
    w.line(&format!("alarm ({});", options.launch_timeout_secs));
    w.blank();
    w.open("if (vfd_launch (v) == -1) {");
    w.line("printf (\"FAIL: vfd_launch\\n\");");
    w.line("exit (EXIT_FAILURE);");
    w.close("}");
    w.blank();
    w.line("alarm (0);");
    w.blank();

    // The scratch filesystem is made once here; ScratchFS fixtures only
    // remount it.
    w.open("{");
    w.line("struct vfd_mkfs_opts_argv optargs;");
    w.blank();
    w.open("if (vfd_part_disk (v, \"/dev/sdb\", \"mbr\") == -1) {");
    w.line("printf (\"FAIL: partitioning /dev/sdb\\n\");");
    w.line("exit (EXIT_FAILURE);");
    w.close("}");
    w.line("optargs.bitmask = UINT64_C (0x0);");
    w.open("if (vfd_mkfs_opts_argv (v, \"ext2\", \"/dev/sdb1\", &optargs) == -1) {");
    w.line("printf (\"FAIL: creating scratch filesystem on /dev/sdb1\\n\");");
    w.line("exit (EXIT_FAILURE);");
    w.close("}");
    w.close("}");
    w.blank();

    w.line(&format!("nr_tests = {nr_tests};"));
    w.blank();

    for (_, units) in groups.iter().rev() {
        for unit in units {
            w.line("test_num++;");
            w.line(&format!(
                "printf (\"%3lu/%3lu {unit}\\n\", (unsigned long) test_num, (unsigned long) nr_tests);"
            ));
            w.open(&format!("if ({unit} () == -1) {{"));
            w.line(&format!("printf (\"FAIL: {unit}\\n\");"));
            w.line("nr_failed++;");
            w.close("}");
        }
    }
    w.blank();

    w.line("vfd_close (v);");
    w.open("if (close_sentinel != 1) {");
    w.line("fprintf (stderr, \"close callback was not called\\n\");");
    w.line("exit (EXIT_FAILURE);");
    w.close("}");
    w.blank();

    for (name, _) in DISKS {
        w.line(&format!("unlink (\"{name}\");"));
    }
    w.blank();

    w.open("if (nr_failed > 0) {");
    w.line("printf (\"***** %lu / %lu tests FAILED *****\\n\", (unsigned long) nr_failed, (unsigned long) nr_tests);");
    w.line("exit (EXIT_FAILURE);");
    w.close("}");
    w.blank();
    w.line("exit (EXIT_SUCCESS);");
    w.close("}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use vfd_registry::{ArgKind, Assertion, InitState, Prereq, ReturnShape, TestCase, TestInvocation};

    #[test]
    fn preamble_warns_once_per_untested_action() {
        let mut w = CWriter::new();
        emit_preamble(&mut w, &["command", "debug"], false);
        let src = w.finish();
        assert!(src.contains("warning: \\\"vfd_command\\\" has no tests"));
        assert!(src.contains("warning: \\\"vfd_debug\\\" has no tests"));
        assert!(!src.contains("md5sum"));
    }

    #[test]
    fn md5_helper_is_emitted_only_on_demand() {
        let mut w = CWriter::new();
        emit_preamble(&mut w, &[], true);
        assert!(w.finish().contains("md5sum (const char *filename, char *result)"));
    }

    static A: Action = Action {
        name: "first",
        call: "first",
        args: &[(ArgKind::String, "x")],
        optargs: &[],
        ret: ReturnShape::Err,
        group: None,
        tests: &[],
    };
    static B: Action = Action {
        name: "second",
        call: "second",
        args: &[],
        optargs: &[],
        ret: ReturnShape::Err,
        group: None,
        tests: &[TestCase {
            init: InitState::Empty,
            prereq: Prereq::Always,
            assert: Assertion::Run(&[TestInvocation {
                action: "second",
                args: &[],
            }]),
        }],
    };

    #[test]
    fn groups_run_in_reverse_registry_order_units_in_declared_order() {
        let mut w = CWriter::new();
        let groups = vec![
            (&A, vec!["test_first_0".to_string(), "test_first_1".to_string()]),
            (&B, vec!["test_second_0".to_string()]),
        ];
        emit_main(&mut w, &GenOptions::default(), &groups);
        let src = w.finish();
        let second = src.find("test_second_0 ()").expect("second");
        let first0 = src.find("test_first_0 ()").expect("first0");
        let first1 = src.find("test_first_1 ()").expect("first1");
        assert!(second < first0 && first0 < first1);
        assert!(src.contains("nr_tests = 3;"));
    }

    #[test]
    fn driver_provisions_scratch_disk_and_arms_launch_watchdog() {
        let mut w = CWriter::new();
        emit_main(&mut w, &GenOptions::default(), &[]);
        let src = w.finish();
        assert!(src.contains("vfd_part_disk (v, \"/dev/sdb\", \"mbr\")"));
        assert!(src.contains("vfd_mkfs_opts_argv (v, \"ext2\", \"/dev/sdb1\", &optargs)"));
        assert!(src.contains("optargs.bitmask = UINT64_C (0x0);"));
        assert!(src.contains("alarm (600);"));
        assert!(src.contains("alarm (0);"));
        assert!(src.contains("ftruncate (fd, 524288000)"));
        assert!(src.contains("if (close_sentinel != 1) {"));
    }
}
