//! The action table.
//!
//! Declaration order matters to the generated driver: test groups execute in
//! reverse declaration order, so the most recently declared action's tests
//! run first. Append new actions at the end of the table.

use crate::schema::{
    Action, ArgKind, Assertion, CmpOp, FieldCheck, FieldType, InitState, OptArgKind, Prereq,
    ReturnShape, StructDef, TestCase, TestInvocation,
};

const fn inv(action: &'static str, args: &'static [&'static str]) -> TestInvocation {
    TestInvocation { action, args }
}

const fn always(init: InitState, assert: Assertion) -> TestCase {
    TestCase {
        init,
        prereq: Prereq::Always,
        assert,
    }
}

/// Struct schemas referenced by `Struct`/`StructList` return shapes.
pub const STRUCTS: &[StructDef] = &[
    StructDef {
        name: "statbuf",
        fields: &[
            ("dev", FieldType::Int64),
            ("ino", FieldType::Int64),
            ("mode", FieldType::Int64),
            ("nlink", FieldType::Int64),
            ("uid", FieldType::Int64),
            ("gid", FieldType::Int64),
            ("rdev", FieldType::Int64),
            ("size", FieldType::Int64),
            ("blksize", FieldType::Int64),
            ("blocks", FieldType::Int64),
            ("atime", FieldType::Int64),
            ("mtime", FieldType::Int64),
            ("ctime", FieldType::Int64),
        ],
    },
    StructDef {
        name: "partinfo",
        fields: &[
            ("part_num", FieldType::Int),
            ("part_start", FieldType::Int64),
            ("part_end", FieldType::Int64),
            ("part_size", FieldType::Int64),
        ],
    },
    StructDef {
        name: "utsname",
        fields: &[
            ("uts_sysname", FieldType::Str),
            ("uts_release", FieldType::Str),
            ("uts_version", FieldType::Str),
            ("uts_machine", FieldType::Str),
        ],
    },
];

/// The full action registry.
pub const REGISTRY: &[Action] = &[
    // Exercises one parameter of every literal-satisfiable kind and one
    // optional parameter of every kind, so the bindings and the
    // optional-argument bitmask are covered end to end.
    Action {
        name: "internal_test",
        call: "internal_test",
        args: &[
            (ArgKind::String, "str"),
            (ArgKind::OptString, "optstr"),
            (ArgKind::StringList, "strlist"),
            (ArgKind::Bool, "b"),
            (ArgKind::Int, "integer"),
            (ArgKind::Int64, "integer64"),
            (ArgKind::FileIn, "filein"),
            (ArgKind::FileOut, "fileout"),
            (ArgKind::BufferIn, "bufferin"),
        ],
        optargs: &[
            (OptArgKind::OBool, "obool"),
            (OptArgKind::OInt, "oint"),
            (OptArgKind::OInt64, "oint64"),
            (OptArgKind::OString, "ostring"),
            (OptArgKind::OStringList, "ostringlist"),
        ],
        ret: ReturnShape::Err,
        group: None,
        tests: &[
            always(
                InitState::Empty,
                Assertion::Run(&[inv(
                    "internal_test",
                    &[
                        "abc",
                        "NULL",
                        "a b c",
                        "true",
                        "100",
                        "1000000000",
                        "../data/helloworld.tar",
                        "testdownload.tmp",
                        "abc\0abc",
                        "true",
                        "60",
                        "1000000000000",
                        "NOARG",
                        "",
                    ],
                )]),
            ),
            always(
                InitState::Empty,
                Assertion::Run(&[inv(
                    "internal_test",
                    &[
                        "abc",
                        "def",
                        "",
                        "false",
                        "-1",
                        "-1000000000",
                        "../data/helloworld.tar",
                        "testdownload.tmp",
                        "",
                        "",
                        "",
                        "",
                        "test",
                        "a b",
                    ],
                )]),
            ),
        ],
    },
    Action {
        name: "get_path",
        call: "get_path",
        args: &[],
        optargs: &[],
        ret: ReturnShape::ConstString,
        group: None,
        tests: &[always(InitState::Empty, Assertion::Run(&[inv("get_path", &[])]))],
    },
    Action {
        name: "get_append",
        call: "get_append",
        args: &[],
        optargs: &[],
        ret: ReturnShape::ConstOptString,
        group: None,
        tests: &[always(
            InitState::Empty,
            Assertion::Result {
                seq: &[inv("get_append", &[])],
                expr: "ret == NULL",
            },
        )],
    },
    Action {
        name: "set_verbose",
        call: "set_verbose",
        args: &[(ArgKind::Bool, "verbose")],
        optargs: &[],
        ret: ReturnShape::Err,
        group: None,
        tests: &[
            always(
                InitState::Empty,
                Assertion::OutputTrue(&[
                    inv("set_verbose", &["true"]),
                    inv("get_verbose", &[]),
                ]),
            ),
            always(
                InitState::Empty,
                Assertion::OutputFalse(&[
                    inv("set_verbose", &["false"]),
                    inv("get_verbose", &[]),
                ]),
            ),
        ],
    },
    Action {
        name: "get_verbose",
        call: "get_verbose",
        args: &[],
        optargs: &[],
        ret: ReturnShape::Bool,
        group: None,
        tests: &[],
    },
    Action {
        name: "sync",
        call: "sync",
        args: &[],
        optargs: &[],
        ret: ReturnShape::Err,
        group: None,
        tests: &[always(InitState::Empty, Assertion::Run(&[inv("sync", &[])]))],
    },
    Action {
        name: "list_devices",
        call: "list_devices",
        args: &[],
        optargs: &[],
        ret: ReturnShape::StringList,
        group: None,
        tests: &[always(
            InitState::Empty,
            Assertion::OutputListOfDevicesEquals {
                seq: &[inv("list_devices", &[])],
                expected: &["/dev/sda", "/dev/sdb", "/dev/sdc", "/dev/sdd"],
            },
        )],
    },
    Action {
        name: "list_partitions",
        call: "list_partitions",
        args: &[],
        optargs: &[],
        ret: ReturnShape::StringList,
        group: None,
        tests: &[
            always(
                InitState::BasicFs,
                Assertion::OutputListOfDevicesEquals {
                    seq: &[inv("list_partitions", &[])],
                    expected: &["/dev/sda1"],
                },
            ),
            always(
                InitState::Gpt,
                Assertion::OutputListOfDevicesEquals {
                    seq: &[inv("list_partitions", &[])],
                    expected: &["/dev/sda1"],
                },
            ),
        ],
    },
    Action {
        name: "blockdev_getsize64",
        call: "blockdev_getsize64",
        args: &[(ArgKind::Device, "device")],
        optargs: &[],
        ret: ReturnShape::Int64,
        group: None,
        tests: &[
            always(
                InitState::Empty,
                Assertion::OutputIntEquals {
                    seq: &[inv("blockdev_getsize64", &["/dev/sda"])],
                    expected: 524288000,
                },
            ),
            always(
                InitState::Empty,
                Assertion::Result {
                    seq: &[
                        inv("blockdev_getss", &["/dev/sda"]),
                        inv("blockdev_getsize64", &["/dev/sda"]),
                    ],
                    expr: "ret == INT64_C (524288000) && ret1 >= 512",
                },
            ),
        ],
    },
    Action {
        name: "blockdev_getss",
        call: "blockdev_getss",
        args: &[(ArgKind::Device, "device")],
        optargs: &[],
        ret: ReturnShape::Int,
        group: None,
        tests: &[always(
            InitState::Empty,
            Assertion::OutputIntCompare {
                seq: &[inv("blockdev_getss", &["/dev/sda"])],
                op: CmpOp::Ge,
                expected: 512,
            },
        )],
    },
    Action {
        name: "blockdev_setro",
        call: "blockdev_setro",
        args: &[(ArgKind::Device, "device")],
        optargs: &[],
        ret: ReturnShape::Err,
        group: None,
        tests: &[always(
            InitState::Empty,
            Assertion::OutputTrue(&[
                inv("blockdev_setro", &["/dev/sda"]),
                inv("blockdev_getro", &["/dev/sda"]),
            ]),
        )],
    },
    Action {
        name: "blockdev_setrw",
        call: "blockdev_setrw",
        args: &[(ArgKind::Device, "device")],
        optargs: &[],
        ret: ReturnShape::Err,
        group: None,
        tests: &[always(
            InitState::Empty,
            Assertion::OutputFalse(&[
                inv("blockdev_setrw", &["/dev/sda"]),
                inv("blockdev_getro", &["/dev/sda"]),
            ]),
        )],
    },
    Action {
        name: "blockdev_getro",
        call: "blockdev_getro",
        args: &[(ArgKind::Device, "device")],
        optargs: &[],
        ret: ReturnShape::Bool,
        group: None,
        tests: &[],
    },
    Action {
        name: "part_disk",
        call: "part_disk",
        args: &[(ArgKind::Device, "device"), (ArgKind::String, "parttype")],
        optargs: &[],
        ret: ReturnShape::Err,
        group: None,
        tests: &[
            always(
                InitState::Empty,
                Assertion::Run(&[inv("part_disk", &["/dev/sda", "mbr"])]),
            ),
            always(
                InitState::Empty,
                Assertion::LastFail(&[inv("part_disk", &["/dev/sda", "bogusparttype"])]),
            ),
        ],
    },
    Action {
        name: "part_get_parttype",
        call: "part_get_parttype",
        args: &[(ArgKind::Device, "device")],
        optargs: &[],
        ret: ReturnShape::String,
        group: None,
        tests: &[always(
            InitState::Gpt,
            Assertion::OutputEquals {
                seq: &[inv("part_get_parttype", &["/dev/sda"])],
                expected: "gpt",
            },
        )],
    },
    Action {
        name: "part_list",
        call: "part_list",
        args: &[(ArgKind::Device, "device")],
        optargs: &[],
        ret: ReturnShape::StructList("partinfo"),
        group: None,
        tests: &[always(
            InitState::Partition,
            Assertion::Result {
                seq: &[inv("part_list", &["/dev/sda"])],
                expr: "ret->len == 1 && ret->val[0].part_num == 1",
            },
        )],
    },
    Action {
        name: "part_to_dev",
        call: "part_to_dev",
        args: &[(ArgKind::Device, "partition")],
        optargs: &[],
        ret: ReturnShape::String,
        group: None,
        tests: &[always(
            InitState::Partition,
            Assertion::OutputDeviceEquals {
                seq: &[inv("part_to_dev", &["/dev/sda1"])],
                expected: "/dev/sda",
            },
        )],
    },
    Action {
        name: "mkfs",
        call: "mkfs_opts",
        args: &[(ArgKind::String, "fstype"), (ArgKind::Device, "device")],
        optargs: &[(OptArgKind::OInt, "blocksize")],
        ret: ReturnShape::Err,
        group: None,
        tests: &[
            always(
                InitState::Partition,
                Assertion::OutputEquals {
                    seq: &[
                        inv("mkfs", &["ext2", "/dev/sda1", "4096"]),
                        inv("mount", &["/dev/sda1", "/"]),
                        inv("write", &["/new", "new file contents"]),
                        inv("cat", &["/new"]),
                    ],
                    expected: "new file contents",
                },
            ),
            always(
                InitState::Partition,
                Assertion::LastFail(&[inv("mkfs", &["bogusfs", "/dev/sda1", ""])]),
            ),
        ],
    },
    Action {
        name: "mount",
        call: "mount",
        args: &[
            (ArgKind::Mountable, "mountable"),
            (ArgKind::String, "mountpoint"),
        ],
        optargs: &[],
        ret: ReturnShape::Err,
        group: None,
        tests: &[always(
            InitState::Partition,
            Assertion::OutputEquals {
                seq: &[
                    inv("mkfs", &["ext2", "/dev/sda1", ""]),
                    inv("mount", &["/dev/sda1", "/"]),
                    inv("write", &["/new", "new file contents"]),
                    inv("cat", &["/new"]),
                ],
                expected: "new file contents",
            },
        )],
    },
    Action {
        name: "mount_ro",
        call: "mount_ro",
        args: &[
            (ArgKind::Mountable, "mountable"),
            (ArgKind::String, "mountpoint"),
        ],
        optargs: &[],
        ret: ReturnShape::Err,
        group: None,
        tests: &[
            always(
                InitState::BasicFs,
                Assertion::LastFail(&[
                    inv("umount", &["/", "", ""]),
                    inv("mount_ro", &["/dev/sda1", "/"]),
                    inv("touch", &["/new"]),
                ]),
            ),
            always(
                InitState::BasicFs,
                Assertion::OutputEquals {
                    seq: &[
                        inv("write", &["/new", "data"]),
                        inv("umount", &["/", "", ""]),
                        inv("mount_ro", &["/dev/sda1", "/"]),
                        inv("cat", &["/new"]),
                    ],
                    expected: "data",
                },
            ),
        ],
    },
    Action {
        name: "umount",
        call: "umount_opts",
        args: &[(ArgKind::MountableOrPath, "pathordevice")],
        optargs: &[
            (OptArgKind::OBool, "force"),
            (OptArgKind::OBool, "lazyunmount"),
        ],
        ret: ReturnShape::Err,
        group: None,
        tests: &[always(
            InitState::BasicFs,
            Assertion::OutputLengthEquals {
                seq: &[inv("umount", &["/", "", ""]), inv("mounts", &[])],
                expected: 0,
            },
        )],
    },
    Action {
        name: "mounts",
        call: "mounts",
        args: &[],
        optargs: &[],
        ret: ReturnShape::StringList,
        group: None,
        tests: &[always(
            InitState::BasicFs,
            Assertion::OutputListOfDevicesEquals {
                seq: &[inv("mounts", &[])],
                expected: &["/dev/sda1"],
            },
        )],
    },
    Action {
        name: "umount_all",
        call: "umount_all",
        args: &[],
        optargs: &[],
        ret: ReturnShape::Err,
        group: None,
        tests: &[always(
            InitState::BasicFs,
            Assertion::OutputLengthEquals {
                seq: &[inv("umount_all", &[]), inv("mounts", &[])],
                expected: 0,
            },
        )],
    },
    Action {
        name: "set_e2label",
        call: "set_e2label",
        args: &[(ArgKind::Device, "device"), (ArgKind::String, "label")],
        optargs: &[],
        ret: ReturnShape::Err,
        group: None,
        tests: &[always(
            InitState::BasicFs,
            Assertion::OutputEquals {
                seq: &[
                    inv("set_e2label", &["/dev/sda1", "testlabel"]),
                    inv("get_e2label", &["/dev/sda1"]),
                ],
                expected: "testlabel",
            },
        )],
    },
    Action {
        name: "get_e2label",
        call: "get_e2label",
        args: &[(ArgKind::Device, "device")],
        optargs: &[],
        ret: ReturnShape::String,
        group: None,
        tests: &[],
    },
    Action {
        name: "tune2fs_l",
        call: "tune2fs_l",
        args: &[(ArgKind::Device, "device")],
        optargs: &[],
        ret: ReturnShape::Hashtable,
        group: None,
        tests: &[always(
            InitState::BasicFs,
            Assertion::OutputHashtableEquals {
                seq: &[inv("tune2fs_l", &["/dev/sda1"])],
                pairs: &[
                    ("Filesystem magic number", "0xEF53"),
                    ("Filesystem OS type", "Linux"),
                ],
            },
        )],
    },
    Action {
        name: "mkswap",
        call: "mkswap_opts",
        args: &[(ArgKind::Device, "device")],
        optargs: &[(OptArgKind::OString, "label"), (OptArgKind::OString, "uuid")],
        ret: ReturnShape::Err,
        group: None,
        tests: &[
            always(
                InitState::Partition,
                Assertion::Run(&[inv("mkswap", &["/dev/sda1", "NOARG", "NOARG"])]),
            ),
            TestCase {
                init: InitState::Partition,
                prereq: Prereq::IfAvailable("swaplabel"),
                assert: Assertion::Run(&[inv("mkswap", &["/dev/sda1", "swapit", "NOARG"])]),
            },
        ],
    },
    Action {
        name: "touch",
        call: "touch",
        args: &[(ArgKind::Pathname, "path")],
        optargs: &[],
        ret: ReturnShape::Err,
        group: None,
        tests: &[always(
            InitState::ScratchFs,
            Assertion::OutputTrue(&[inv("touch", &["/new"]), inv("exists", &["/new"])]),
        )],
    },
    Action {
        name: "exists",
        call: "exists",
        args: &[(ArgKind::Pathname, "path")],
        optargs: &[],
        ret: ReturnShape::Bool,
        group: None,
        tests: &[
            always(
                InitState::ScratchFs,
                Assertion::OutputFalse(&[inv("exists", &["/nosuchfile"])]),
            ),
            always(
                InitState::ScratchFs,
                Assertion::OutputTrue(&[inv("touch", &["/new"]), inv("exists", &["/new"])]),
            ),
        ],
    },
    Action {
        name: "is_dir",
        call: "is_dir",
        args: &[(ArgKind::Pathname, "path")],
        optargs: &[],
        ret: ReturnShape::Bool,
        group: None,
        tests: &[
            always(
                InitState::ScratchFs,
                Assertion::OutputFalse(&[inv("touch", &["/file"]), inv("is_dir", &["/file"])]),
            ),
            always(
                InitState::ScratchFs,
                Assertion::OutputTrue(&[inv("mkdir", &["/dir"]), inv("is_dir", &["/dir"])]),
            ),
        ],
    },
    Action {
        name: "mkdir",
        call: "mkdir",
        args: &[(ArgKind::Pathname, "path")],
        optargs: &[],
        ret: ReturnShape::Err,
        group: None,
        tests: &[always(
            InitState::ScratchFs,
            Assertion::OutputTrue(&[inv("mkdir", &["/dir"]), inv("is_dir", &["/dir"])]),
        )],
    },
    Action {
        name: "write",
        call: "write",
        args: &[(ArgKind::Pathname, "path"), (ArgKind::BufferIn, "content")],
        optargs: &[],
        ret: ReturnShape::Err,
        group: None,
        tests: &[
            always(
                InitState::ScratchFs,
                Assertion::OutputEquals {
                    seq: &[
                        inv("write", &["/new", "new file contents"]),
                        inv("cat", &["/new"]),
                    ],
                    expected: "new file contents",
                },
            ),
            always(
                InitState::ScratchFs,
                Assertion::OutputBufferEquals {
                    seq: &[
                        inv("write", &["/new", "abc\0abc"]),
                        inv("read_file", &["/new"]),
                    ],
                    expected: b"abc\0abc",
                },
            ),
        ],
    },
    Action {
        name: "cat",
        call: "cat",
        args: &[(ArgKind::Pathname, "path")],
        optargs: &[],
        ret: ReturnShape::String,
        group: None,
        tests: &[always(
            InitState::ScratchFs,
            Assertion::OutputEquals {
                seq: &[
                    inv("write", &["/new", "new file contents"]),
                    inv("cat", &["/new"]),
                ],
                expected: "new file contents",
            },
        )],
    },
    Action {
        name: "read_file",
        call: "read_file",
        args: &[(ArgKind::Pathname, "path")],
        optargs: &[],
        ret: ReturnShape::BufferOut,
        group: None,
        tests: &[always(
            InitState::ScratchFs,
            Assertion::OutputBufferEquals {
                seq: &[
                    inv("write", &["/rf", "binary\0data"]),
                    inv("read_file", &["/rf"]),
                ],
                expected: b"binary\0data",
            },
        )],
    },
    Action {
        name: "ls",
        call: "ls",
        args: &[(ArgKind::Pathname, "directory")],
        optargs: &[],
        ret: ReturnShape::StringList,
        group: None,
        tests: &[
            always(
                InitState::ScratchFs,
                Assertion::OutputListEquals {
                    seq: &[
                        inv("mkdir", &["/ls"]),
                        inv("touch", &["/ls/a"]),
                        inv("touch", &["/ls/b"]),
                        inv("touch", &["/ls/c"]),
                        inv("ls", &["/ls"]),
                    ],
                    expected: &["a", "b", "c"],
                },
            ),
            always(
                InitState::ScratchFs,
                Assertion::OutputLengthEquals {
                    seq: &[inv("mkdir", &["/lsempty"]), inv("ls", &["/lsempty"])],
                    expected: 0,
                },
            ),
        ],
    },
    Action {
        name: "rm",
        call: "rm",
        args: &[(ArgKind::Pathname, "path")],
        optargs: &[],
        ret: ReturnShape::Err,
        group: None,
        tests: &[
            always(
                InitState::ScratchFs,
                Assertion::OutputFalse(&[
                    inv("touch", &["/rm"]),
                    inv("rm", &["/rm"]),
                    inv("exists", &["/rm"]),
                ]),
            ),
            always(
                InitState::ScratchFs,
                Assertion::LastFail(&[inv("rm", &["/nosuchfile"])]),
            ),
        ],
    },
    Action {
        name: "equal",
        call: "equal",
        args: &[(ArgKind::Pathname, "file1"), (ArgKind::Pathname, "file2")],
        optargs: &[],
        ret: ReturnShape::Bool,
        group: None,
        tests: &[
            always(
                InitState::ScratchFs,
                Assertion::OutputTrue(&[
                    inv("write", &["/a", "x"]),
                    inv("write", &["/b", "x"]),
                    inv("equal", &["/a", "/b"]),
                ]),
            ),
            always(
                InitState::ScratchFs,
                Assertion::OutputFalse(&[
                    inv("write", &["/c", "x"]),
                    inv("write", &["/d", "y"]),
                    inv("equal", &["/c", "/d"]),
                ]),
            ),
            always(
                InitState::ScratchFs,
                Assertion::LastFail(&[inv("equal", &["/nope1", "/nope2"])]),
            ),
        ],
    },
    Action {
        name: "truncate_size",
        call: "truncate_size",
        args: &[(ArgKind::Pathname, "path"), (ArgKind::Int64, "size")],
        optargs: &[],
        ret: ReturnShape::Err,
        group: None,
        tests: &[always(
            InitState::ScratchFs,
            Assertion::OutputStructEquals {
                seq: &[
                    inv("write", &["/t", "abcdef"]),
                    inv("truncate_size", &["/t", "1000"]),
                    inv("stat", &["/t"]),
                ],
                checks: &[FieldCheck::Int {
                    field: "size",
                    expected: 1000,
                }],
            },
        )],
    },
    Action {
        name: "stat",
        call: "stat",
        args: &[(ArgKind::Pathname, "path")],
        optargs: &[],
        ret: ReturnShape::Struct("statbuf"),
        group: None,
        tests: &[always(
            InitState::ScratchFs,
            Assertion::OutputStructEquals {
                seq: &[inv("touch", &["/empty"]), inv("stat", &["/empty"])],
                checks: &[
                    FieldCheck::Int {
                        field: "size",
                        expected: 0,
                    },
                    FieldCheck::IntCompare {
                        field: "blocks",
                        op: CmpOp::Ge,
                        expected: 0,
                    },
                    FieldCheck::FieldsIntEq {
                        field: "atime",
                        other: "mtime",
                    },
                ],
            },
        )],
    },
    Action {
        name: "utsname",
        call: "utsname",
        args: &[],
        optargs: &[],
        ret: ReturnShape::Struct("utsname"),
        group: None,
        tests: &[always(
            InitState::Empty,
            Assertion::OutputStructEquals {
                seq: &[inv("utsname", &[])],
                checks: &[FieldCheck::Str {
                    field: "uts_sysname",
                    expected: "Linux",
                }],
            },
        )],
    },
    Action {
        name: "checksum",
        call: "checksum",
        args: &[(ArgKind::String, "csumtype"), (ArgKind::Pathname, "path")],
        optargs: &[],
        ret: ReturnShape::String,
        group: None,
        tests: &[always(
            InitState::ScratchFs,
            Assertion::OutputFileMd5Equals {
                seq: &[
                    inv("upload", &["../data/helloworld.tar", "/helloworld.tar"]),
                    inv("checksum", &["md5", "/helloworld.tar"]),
                ],
                path: "../data/helloworld.tar",
            },
        )],
    },
    Action {
        name: "upload",
        call: "upload",
        args: &[
            (ArgKind::FileIn, "filename"),
            (ArgKind::Pathname, "remotefilename"),
        ],
        optargs: &[],
        ret: ReturnShape::Err,
        group: None,
        tests: &[always(
            InitState::ScratchFs,
            Assertion::OutputFileMd5Equals {
                seq: &[
                    inv("upload", &["../data/helloworld.tar", "/upl"]),
                    inv("checksum", &["md5", "/upl"]),
                ],
                path: "../data/helloworld.tar",
            },
        )],
    },
    Action {
        name: "download",
        call: "download",
        args: &[
            (ArgKind::Pathname, "remotefilename"),
            (ArgKind::FileOut, "filename"),
        ],
        optargs: &[],
        ret: ReturnShape::Err,
        group: None,
        tests: &[always(
            InitState::ScratchFs,
            Assertion::OutputEquals {
                seq: &[
                    inv("write", &["/src", "rosebud"]),
                    inv("download", &["/src", "testdownload.tmp"]),
                    inv("upload", &["testdownload.tmp", "/dst"]),
                    inv("cat", &["/dst"]),
                ],
                expected: "rosebud",
            },
        )],
    },
    Action {
        name: "lvm_remove_all",
        call: "lvm_remove_all",
        args: &[],
        optargs: &[],
        ret: ReturnShape::Err,
        group: Some("lvm2"),
        tests: &[always(
            InitState::BasicFsOnLvm,
            Assertion::OutputLengthEquals {
                seq: &[
                    inv("umount_all", &[]),
                    inv("lvm_remove_all", &[]),
                    inv("lvs", &[]),
                ],
                expected: 0,
            },
        )],
    },
    Action {
        name: "pvcreate",
        call: "pvcreate",
        args: &[(ArgKind::Device, "device")],
        optargs: &[],
        ret: ReturnShape::Err,
        group: Some("lvm2"),
        tests: &[always(
            InitState::Empty,
            Assertion::OutputListOfDevicesEquals {
                seq: &[
                    inv("part_disk", &["/dev/sda", "mbr"]),
                    inv("pvcreate", &["/dev/sda1"]),
                    inv("pvs", &[]),
                ],
                expected: &["/dev/sda1"],
            },
        )],
    },
    Action {
        name: "pvs",
        call: "pvs",
        args: &[],
        optargs: &[],
        ret: ReturnShape::StringList,
        group: Some("lvm2"),
        tests: &[always(
            InitState::BasicFsOnLvm,
            Assertion::OutputListOfDevicesEquals {
                seq: &[inv("pvs", &[])],
                expected: &["/dev/sda1"],
            },
        )],
    },
    Action {
        name: "vgcreate",
        call: "vgcreate",
        args: &[
            (ArgKind::String, "volgroup"),
            (ArgKind::DeviceList, "physvols"),
        ],
        optargs: &[],
        ret: ReturnShape::Err,
        group: Some("lvm2"),
        tests: &[always(
            InitState::Empty,
            Assertion::OutputListEquals {
                seq: &[
                    inv("part_disk", &["/dev/sda", "mbr"]),
                    inv("pvcreate", &["/dev/sda1"]),
                    inv("vgcreate", &["VG", "/dev/sda1"]),
                    inv("vgs", &[]),
                ],
                expected: &["VG"],
            },
        )],
    },
    Action {
        name: "vgs",
        call: "vgs",
        args: &[],
        optargs: &[],
        ret: ReturnShape::StringList,
        group: Some("lvm2"),
        tests: &[always(
            InitState::BasicFsOnLvm,
            Assertion::OutputListEquals {
                seq: &[inv("vgs", &[])],
                expected: &["VG"],
            },
        )],
    },
    Action {
        name: "lvcreate",
        call: "lvcreate",
        args: &[
            (ArgKind::String, "logvol"),
            (ArgKind::String, "volgroup"),
            (ArgKind::Int, "mbytes"),
        ],
        optargs: &[],
        ret: ReturnShape::Err,
        group: Some("lvm2"),
        tests: &[always(
            InitState::Empty,
            Assertion::OutputListEquals {
                seq: &[
                    inv("part_disk", &["/dev/sda", "mbr"]),
                    inv("pvcreate", &["/dev/sda1"]),
                    inv("vgcreate", &["VG", "/dev/sda1"]),
                    inv("lvcreate", &["LV1", "VG", "8"]),
                    inv("lvcreate", &["LV2", "VG", "8"]),
                    inv("lvs", &[]),
                ],
                expected: &["/dev/VG/LV1", "/dev/VG/LV2"],
            },
        )],
    },
    Action {
        name: "lvs",
        call: "lvs",
        args: &[],
        optargs: &[],
        ret: ReturnShape::StringList,
        group: Some("lvm2"),
        tests: &[always(
            InitState::BasicFsOnLvm,
            Assertion::OutputListEquals {
                seq: &[inv("lvs", &[])],
                expected: &["/dev/VG/LV"],
            },
        )],
    },
    Action {
        name: "luks_open",
        call: "luks_open",
        args: &[
            (ArgKind::Device, "device"),
            (ArgKind::Key, "key"),
            (ArgKind::String, "mapname"),
        ],
        optargs: &[],
        ret: ReturnShape::Err,
        group: Some("luks"),
        tests: &[always(
            InitState::Partition,
            Assertion::LastFail(&[inv(
                "luks_open",
                &["/dev/sda1", "LUKS_SECRET_KEY", "lukstest"],
            )]),
        )],
    },
    Action {
        name: "command",
        call: "command",
        args: &[(ArgKind::StringList, "arguments")],
        optargs: &[],
        ret: ReturnShape::String,
        group: None,
        tests: &[TestCase {
            init: InitState::ScratchFs,
            prereq: Prereq::Disabled,
            assert: Assertion::OutputEquals {
                seq: &[inv("command", &["/bin/echo hello"])],
                expected: "hello\n",
            },
        }],
    },
    Action {
        name: "debug",
        call: "debug",
        args: &[(ArgKind::String, "subcmd"), (ArgKind::StringList, "extraargs")],
        optargs: &[],
        ret: ReturnShape::String,
        group: None,
        tests: &[],
    },
    Action {
        name: "internal_send_fd",
        call: "internal_send_fd",
        args: &[(ArgKind::Pointer, "fd")],
        optargs: &[],
        ret: ReturnShape::Err,
        group: None,
        tests: &[],
    },
];

/// The registry, as a slice. Kept as a function so callers do not depend on
/// the storage of the table.
pub fn registry() -> &'static [Action] {
    REGISTRY
}
