//! End-to-end generation over the full action registry.

use std::sync::OnceLock;

use vfd_registry::actions::registry;
use vfd_registry::Prereq;
use vfdc::compile::{generate_tests, GenOptions, GenOutput};
use vfdc::coverage;

fn generated() -> &'static GenOutput {
    static OUT: OnceLock<GenOutput> = OnceLock::new();
    OUT.get_or_init(|| generate_tests(registry(), &GenOptions::default()).expect("generate"))
}

#[test]
fn every_test_becomes_one_unit_defined_and_driven() {
    let src = &generated().c_src;
    let mut nr_units = 0;
    for action in registry() {
        for idx in 0..action.tests.len() {
            let unit = format!("test_{}_{}", action.name, idx);
            assert!(
                src.contains(&format!("static int\n{unit} (void)")),
                "missing definition of {unit}"
            );
            assert!(
                src.contains(&format!("if ({unit} () == -1) {{")),
                "driver never runs {unit}"
            );
            nr_units += 1;
        }
    }
    assert_eq!(generated().stats.nr_units, nr_units);
    assert_eq!(generated().stats.nr_actions, registry().len());
}

#[test]
fn driver_runs_groups_in_reverse_registry_order() {
    let src = &generated().c_src;
    let main_pos = src.find("int\nmain (void)").expect("main");
    let driver = &src[main_pos..];
    // First registry action runs last, last tested action runs first.
    let first = driver.find("test_internal_test_0 ()").expect("first group");
    let last = driver.find("test_command_0 ()").expect("last group");
    assert!(last < first);
}

#[test]
fn untested_actions_are_warned_and_counted() {
    let untested = coverage::untested_actions(registry());
    assert_eq!(untested, vec!["command", "debug", "internal_send_fd"]);
    assert_eq!(generated().stats.nr_untested, 3);
    let src = &generated().c_src;
    for name in untested {
        assert!(src.contains(&format!("warning: \\\"vfd_{name}\\\" has no tests")));
    }
}

#[test]
fn optional_argument_presence_is_a_bitmask() {
    let src = &generated().c_src;
    // mkfs with blocksize present sets bit 0; the BasicFS fixture leaves
    // it absent.
    assert!(src.contains("optargs.blocksize = 4096;") || src.contains(".blocksize = 4096;"));
    assert!(src.contains(".bitmask = UINT64_C (0x1);"));
    assert!(src.contains(".bitmask = UINT64_C (0x0);"));
    assert!(src.contains("vfd_mkfs_opts_argv (v, \"ext2\", \"/dev/sda1\", &"));
}

#[test]
fn skip_controls_cover_filter_unit_and_action() {
    let src = &generated().c_src;
    assert!(src.contains("getenv (\"TEST_ONLY\")"));
    assert!(src.contains("getenv (\"SKIP_TEST_MKFS_0\")"));
    assert!(src.contains("getenv (\"SKIP_TEST_MKFS\")"));
}

#[test]
fn disabled_tests_emit_no_daemon_calls() {
    let src = &generated().c_src;
    let start = src
        .find("static int\ntest_command_0 (void)")
        .expect("unit");
    let end = src[start..].find("\n}\n").map(|e| start + e).expect("end");
    let body = &src[start..end];
    assert!(body.contains("skipped (reason: test disabled)"));
    assert!(!body.contains("vfd_command"));
    assert!(!body.contains("vfd_blockdev_setrw"));
}

#[test]
fn generation_is_deterministic() {
    let again = generate_tests(registry(), &GenOptions::default()).expect("generate");
    assert_eq!(again.c_src, generated().c_src);
}

#[test]
fn options_reach_the_emitted_driver() {
    let options = GenOptions {
        launch_timeout_secs: 60,
        reference_image: "/tmp/ref.iso".to_string(),
    };
    let out = generate_tests(registry(), &options).expect("generate");
    assert!(out.c_src.contains("alarm (60);"));
    assert!(out.c_src.contains("vfd_add_drive_ro (v, \"/tmp/ref.iso\")"));
    assert!(!out.c_src.contains("../data/test.iso"));
}

#[test]
fn feature_gated_actions_check_availability_before_running() {
    let src = &generated().c_src;
    assert!(src.contains("{ \"lvm2\", NULL }"));
    assert!(src.contains("{ \"luks\", NULL }"));
    assert!(src.contains("vfd_feature_available"));
    // A prereq group distinct from the action group also gates.
    assert!(src.contains("{ \"swaplabel\", NULL }"));
}

#[test]
fn buffer_literals_survive_embedded_zero_bytes() {
    let src = &generated().c_src;
    assert!(src.contains("\"abc\\000abc\""));
}

#[test]
fn driver_frame_is_complete() {
    let src = &generated().c_src;
    assert!(src.starts_with("/* Conformance tests of the vfd daemon API."));
    assert!(src.contains("#include \"vfd.h\""));
    assert!(src.contains("no_test_warnings ();"));
    assert!(src.contains("ftruncate (fd, 524288000)"));
    assert!(src.contains("ftruncate (fd, 52428800)"));
    assert!(src.contains("ftruncate (fd, 10485760)"));
    assert!(src.contains("vfd_register_close_callback (v, incr_close_sentinel, NULL);"));
    assert!(src.contains("***** %lu / %lu tests FAILED *****"));
    assert!(src.contains("unlink (\"test1.img\");"));
    assert!(src.contains("exit (EXIT_SUCCESS);"));
}

#[test]
fn md5_helper_present_because_checksum_test_needs_it() {
    let src = &generated().c_src;
    assert!(registry().iter().any(|a| a.name == "checksum"));
    assert!(src.contains("md5sum (const char *filename, char *result)"));
}

#[test]
fn unit_count_excludes_nothing_not_even_disabled_tests() {
    // Disabled tests still produce units; they only skip at runtime.
    let expected: usize = registry().iter().map(|a| a.tests.len()).sum();
    assert_eq!(generated().stats.nr_units, expected);
    let disabled: usize = registry()
        .iter()
        .flat_map(|a| a.tests)
        .filter(|t| t.prereq == Prereq::Disabled)
        .count();
    assert!(disabled > 0);
}
