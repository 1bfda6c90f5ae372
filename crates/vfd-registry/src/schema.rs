//! Schema types for the action table.
//!
//! These enums are deliberately exhaustive: downstream emitters match on
//! every variant without wildcard arms, so adding a variant here fails to
//! compile until every backend handles it.

use serde::Serialize;

/// Kind of one required, positional action parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgKind {
    String,
    OptString,
    Pathname,
    Device,
    Mountable,
    DeviceOrPath,
    MountableOrPath,
    Key,
    BufferIn,
    StringList,
    DeviceList,
    Int,
    Int64,
    Bool,
    FileIn,
    FileOut,
    /// Structurally present in the schema but never satisfiable from a
    /// literal; any test invocation of an action with a Pointer parameter
    /// is a generation-time error.
    Pointer,
}

/// Kind of one optional action parameter.
///
/// The parameter's zero-based declaration position doubles as its bit index
/// in the presence bitmask (LSB first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptArgKind {
    OBool,
    OInt,
    OInt64,
    OString,
    OStringList,
}

/// Shape of an action's return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnShape {
    Err,
    Int,
    Int64,
    Bool,
    ConstString,
    ConstOptString,
    String,
    StringList,
    Hashtable,
    Struct(&'static str),
    StructList(&'static str),
    BufferOut,
}

/// Failure-signaling convention of a return shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSentinel {
    CannotFail,
    MinusOneIsError,
    NullIsError,
}

impl ReturnShape {
    /// The sentinel is fixed by the shape, never configurable per action.
    pub fn sentinel(self) -> ErrorSentinel {
        match self {
            ReturnShape::Err | ReturnShape::Int | ReturnShape::Int64 | ReturnShape::Bool => {
                ErrorSentinel::MinusOneIsError
            }
            ReturnShape::ConstOptString => ErrorSentinel::CannotFail,
            ReturnShape::ConstString
            | ReturnShape::String
            | ReturnShape::StringList
            | ReturnShape::Hashtable
            | ReturnShape::Struct(_)
            | ReturnShape::StructList(_)
            | ReturnShape::BufferOut => ErrorSentinel::NullIsError,
        }
    }
}

/// Fixture state established before a test body runs.
///
/// Every fixture starts from the same reset sequence (read-write scratch
/// disk, unmount everything, remove all volume-manager state) so that
/// sequential reuse of the shared backing stores is safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InitState {
    Empty,
    Partition,
    Gpt,
    BasicFs,
    BasicFsOnLvm,
    IsoFs,
    ScratchFs,
}

/// One fixture or test call: an action name plus flat literal arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TestInvocation {
    pub action: &'static str,
    pub args: &'static [&'static str],
}

/// Ordered invocation sequence; only the final invocation's result is
/// asserted, all prior invocations must succeed.
pub type Seq = &'static [TestInvocation];

const fn call(action: &'static str, args: &'static [&'static str]) -> TestInvocation {
    TestInvocation { action, args }
}

const SETRW: TestInvocation = call("blockdev_setrw", &["/dev/sda"]);
const UMOUNT_ALL: TestInvocation = call("umount_all", &[]);
const LVM_REMOVE_ALL: TestInvocation = call("lvm_remove_all", &[]);
const PART_MBR: TestInvocation = call("part_disk", &["/dev/sda", "mbr"]);

const EMPTY_FIXTURE: &[TestInvocation] = &[SETRW, UMOUNT_ALL, LVM_REMOVE_ALL];
const PARTITION_FIXTURE: &[TestInvocation] = &[SETRW, UMOUNT_ALL, LVM_REMOVE_ALL, PART_MBR];
const GPT_FIXTURE: &[TestInvocation] = &[
    SETRW,
    UMOUNT_ALL,
    LVM_REMOVE_ALL,
    call("part_disk", &["/dev/sda", "gpt"]),
];
const BASICFS_FIXTURE: &[TestInvocation] = &[
    SETRW,
    UMOUNT_ALL,
    LVM_REMOVE_ALL,
    PART_MBR,
    call("mkfs", &["ext2", "/dev/sda1", ""]),
    call("mount", &["/dev/sda1", "/"]),
];
const BASICFS_ON_LVM_FIXTURE: &[TestInvocation] = &[
    SETRW,
    UMOUNT_ALL,
    LVM_REMOVE_ALL,
    PART_MBR,
    call("pvcreate", &["/dev/sda1"]),
    call("vgcreate", &["VG", "/dev/sda1"]),
    call("lvcreate", &["LV", "VG", "8"]),
    call("mkfs", &["ext2", "/dev/VG/LV", ""]),
    call("mount", &["/dev/VG/LV", "/"]),
];
const ISOFS_FIXTURE: &[TestInvocation] = &[
    SETRW,
    UMOUNT_ALL,
    LVM_REMOVE_ALL,
    call("mount_ro", &["/dev/sdd", "/"]),
];
// Reuses the filesystem provisioned once on /dev/sdb1 by the generated
// driver, so no mkfs here.
const SCRATCHFS_FIXTURE: &[TestInvocation] = &[
    SETRW,
    UMOUNT_ALL,
    LVM_REMOVE_ALL,
    call("mount", &["/dev/sdb1", "/"]),
];

impl InitState {
    /// The fixed, idempotent command sequence establishing this state.
    pub fn fixture(self) -> Seq {
        match self {
            InitState::Empty => EMPTY_FIXTURE,
            InitState::Partition => PARTITION_FIXTURE,
            InitState::Gpt => GPT_FIXTURE,
            InitState::BasicFs => BASICFS_FIXTURE,
            InitState::BasicFsOnLvm => BASICFS_ON_LVM_FIXTURE,
            InitState::IsoFs => ISOFS_FIXTURE,
            InitState::ScratchFs => SCRATCHFS_FIXTURE,
        }
    }
}

/// Gate deciding whether a test body runs at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Prereq {
    Always,
    IfAvailable(&'static str),
    Disabled,
}

/// Relational operator for integer comparisons in assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Ne,
}

impl CmpOp {
    pub fn c_op(self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Ne => "!=",
        }
    }
}

/// One per-field check of an `OutputStructEquals` assertion. Cross-field
/// checks compare two fields of the same returned struct, bound as `r`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCheck {
    Int {
        field: &'static str,
        expected: i64,
    },
    IntCompare {
        field: &'static str,
        op: CmpOp,
        expected: i64,
    },
    Str {
        field: &'static str,
        expected: &'static str,
    },
    FieldsIntEq {
        field: &'static str,
        other: &'static str,
    },
    FieldsStrEq {
        field: &'static str,
        other: &'static str,
    },
}

/// What a test asserts about the final invocation of its sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Assertion {
    /// Invocation success only.
    Run(Seq),
    /// A C boolean expression over the captured results. The final result
    /// is bound as `ret`, earlier results as `ret1`, `ret2`, ... counting
    /// backwards from the end.
    Result { seq: Seq, expr: &'static str },
    ResultTrue(Seq),
    ResultFalse(Seq),
    /// The final invocation runs in expect-error mode; success means the
    /// call reported failure through its error sentinel.
    LastFail(Seq),
    OutputEquals {
        seq: Seq,
        expected: &'static str,
    },
    OutputListEquals {
        seq: Seq,
        expected: &'static [&'static str],
    },
    OutputListOfDevicesEquals {
        seq: Seq,
        expected: &'static [&'static str],
    },
    OutputIntEquals {
        seq: Seq,
        expected: i64,
    },
    OutputIntCompare {
        seq: Seq,
        op: CmpOp,
        expected: i64,
    },
    OutputTrue(Seq),
    OutputFalse(Seq),
    OutputLengthEquals {
        seq: Seq,
        expected: usize,
    },
    OutputBufferEquals {
        seq: Seq,
        expected: &'static [u8],
    },
    OutputStructEquals {
        seq: Seq,
        checks: &'static [FieldCheck],
    },
    OutputFileMd5Equals {
        seq: Seq,
        path: &'static str,
    },
    OutputDeviceEquals {
        seq: Seq,
        expected: &'static str,
    },
    OutputHashtableEquals {
        seq: Seq,
        pairs: &'static [(&'static str, &'static str)],
    },
}

impl Assertion {
    pub fn seq(&self) -> Seq {
        match *self {
            Assertion::Run(seq)
            | Assertion::ResultTrue(seq)
            | Assertion::ResultFalse(seq)
            | Assertion::LastFail(seq)
            | Assertion::OutputTrue(seq)
            | Assertion::OutputFalse(seq)
            | Assertion::Result { seq, .. }
            | Assertion::OutputEquals { seq, .. }
            | Assertion::OutputListEquals { seq, .. }
            | Assertion::OutputListOfDevicesEquals { seq, .. }
            | Assertion::OutputIntEquals { seq, .. }
            | Assertion::OutputIntCompare { seq, .. }
            | Assertion::OutputLengthEquals { seq, .. }
            | Assertion::OutputBufferEquals { seq, .. }
            | Assertion::OutputStructEquals { seq, .. }
            | Assertion::OutputFileMd5Equals { seq, .. }
            | Assertion::OutputDeviceEquals { seq, .. }
            | Assertion::OutputHashtableEquals { seq, .. } => seq,
        }
    }
}

/// One conformance test of one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TestCase {
    pub init: InitState,
    pub prereq: Prereq,
    pub assert: Assertion,
}

/// One schema entry for a remotely invokable daemon operation.
///
/// Constructed once from the static registry and immutable thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Action {
    pub name: &'static str,
    /// Stem of the C call symbol. Differs from `name` when the C binding
    /// carries an optional-argument struct (`vfd_<call>_argv`).
    pub call: &'static str,
    pub args: &'static [(ArgKind, &'static str)],
    pub optargs: &'static [(OptArgKind, &'static str)],
    pub ret: ReturnShape,
    /// Capability group the daemon must advertise for this action's tests
    /// to run.
    pub group: Option<&'static str>,
    pub tests: &'static [TestCase],
}

impl Action {
    /// Combined required + optional arity every invocation must supply.
    pub fn arity(&self) -> usize {
        self.args.len() + self.optargs.len()
    }
}

/// Field type inside a returned struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Int,
    Int64,
    Str,
}

/// Schema of a struct named by `ReturnShape::Struct`/`StructList`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StructDef {
    pub name: &'static str,
    pub fields: &'static [(&'static str, FieldType)],
}

impl StructDef {
    pub fn field(&self, name: &str) -> Option<FieldType> {
        self.fields
            .iter()
            .find(|(f, _)| *f == name)
            .map(|&(_, ty)| ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_fixed_by_shape() {
        assert_eq!(ReturnShape::Err.sentinel(), ErrorSentinel::MinusOneIsError);
        assert_eq!(ReturnShape::Bool.sentinel(), ErrorSentinel::MinusOneIsError);
        assert_eq!(
            ReturnShape::ConstOptString.sentinel(),
            ErrorSentinel::CannotFail
        );
        assert_eq!(
            ReturnShape::Struct("statbuf").sentinel(),
            ErrorSentinel::NullIsError
        );
        assert_eq!(
            ReturnShape::BufferOut.sentinel(),
            ErrorSentinel::NullIsError
        );
    }

    #[test]
    fn every_fixture_starts_with_the_reset_sequence() {
        for init in [
            InitState::Empty,
            InitState::Partition,
            InitState::Gpt,
            InitState::BasicFs,
            InitState::BasicFsOnLvm,
            InitState::IsoFs,
            InitState::ScratchFs,
        ] {
            let seq = init.fixture();
            assert_eq!(seq[0].action, "blockdev_setrw");
            assert_eq!(seq[1].action, "umount_all");
            assert_eq!(seq[2].action, "lvm_remove_all");
        }
    }

    #[test]
    fn scratch_fixture_mounts_without_mkfs() {
        let seq = InitState::ScratchFs.fixture();
        assert!(seq.iter().all(|c| c.action != "mkfs"));
        assert_eq!(seq.last().unwrap().action, "mount");
        assert_eq!(seq.last().unwrap().args, &["/dev/sdb1", "/"]);
    }
}
