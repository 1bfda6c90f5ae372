//! Type-directed resolution of flat literal strings into typed wire values.
//!
//! Given an action's signature and an invocation's literal list, produces a
//! typed value for every required parameter, a presence-tagged value for
//! every optional parameter, and the combined presence bitmask. Pure: the
//! same inputs always yield the same resolution.

use vfd_registry::{Action, ArgKind, OptArgKind};

use crate::compile::{GenError, GenErrorKind};

/// Typed wire value for one required parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    /// Passed through verbatim (String, Pathname, Device, Mountable,
    /// DeviceOrPath, MountableOrPath, Key).
    Str(String),
    OptStr(Option<String>),
    /// Bytes plus explicit length; content may contain embedded zero
    /// bytes, so the length is never derived from a terminator scan.
    Buffer(Vec<u8>),
    List(Vec<String>),
    Int(i64),
    Bool(bool),
    /// FileIn/FileOut literal, inlined as a path at the call site.
    FilePath(String),
}

/// Typed wire value for one optional parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptValue {
    Bool(bool),
    Int(i64),
    Int64(i64),
    Str(String),
    List(Vec<String>),
}

/// One optional parameter slot; `value` is `None` when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptSlot {
    pub name: &'static str,
    pub kind: OptArgKind,
    pub value: Option<OptValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCall {
    pub args: Vec<(&'static str, ArgKind, ArgValue)>,
    pub optargs: Vec<OptSlot>,
    /// Bit i set iff optional parameter i (0-indexed, LSB first) is
    /// present. Must match the daemon's wire contract bit for bit.
    pub bitmask: u64,
}

pub fn resolve_call(
    action: &Action,
    literals: &[&str],
    test_name: &str,
) -> Result<ResolvedCall, GenError> {
    if literals.len() != action.arity() {
        return Err(GenError::new(
            GenErrorKind::Schema,
            format!(
                "{}: action {:?} takes {} arguments ({} required + {} optional), test supplies {}",
                test_name,
                action.name,
                action.arity(),
                action.args.len(),
                action.optargs.len(),
                literals.len()
            ),
        ));
    }

    let mut args = Vec::with_capacity(action.args.len());
    for (&(kind, name), &lit) in action.args.iter().zip(literals) {
        let value = resolve_required(action, kind, name, lit, test_name)?;
        args.push((name, kind, value));
    }

    let mut optargs = Vec::with_capacity(action.optargs.len());
    let mut bitmask = 0u64;
    let opt_literals = &literals[action.args.len()..];
    for (pos, (&(kind, name), &lit)) in action.optargs.iter().zip(opt_literals).enumerate() {
        let value = resolve_optional(action, kind, name, lit, test_name)?;
        if value.is_some() {
            bitmask |= 1 << pos;
        }
        optargs.push(OptSlot { name, kind, value });
    }

    Ok(ResolvedCall {
        args,
        optargs,
        bitmask,
    })
}

fn resolve_required(
    action: &Action,
    kind: ArgKind,
    name: &str,
    lit: &str,
    test_name: &str,
) -> Result<ArgValue, GenError> {
    match kind {
        ArgKind::String
        | ArgKind::Pathname
        | ArgKind::Device
        | ArgKind::Mountable
        | ArgKind::DeviceOrPath
        | ArgKind::MountableOrPath
        | ArgKind::Key => Ok(ArgValue::Str(lit.to_string())),
        ArgKind::OptString => {
            if lit == "NULL" {
                Ok(ArgValue::OptStr(None))
            } else {
                Ok(ArgValue::OptStr(Some(lit.to_string())))
            }
        }
        ArgKind::BufferIn => Ok(ArgValue::Buffer(lit.as_bytes().to_vec())),
        ArgKind::StringList | ArgKind::DeviceList => Ok(ArgValue::List(split_list(lit))),
        ArgKind::Int | ArgKind::Int64 => parse_int(action, name, lit, test_name).map(ArgValue::Int),
        ArgKind::Bool => match lit {
            "true" => Ok(ArgValue::Bool(true)),
            "false" => Ok(ArgValue::Bool(false)),
            _ => Err(GenError::new(
                GenErrorKind::Literal,
                format!(
                    "{}: action {:?}: parameter {:?}: boolean literal must be \"true\" or \"false\", got {:?}",
                    test_name, action.name, name, lit
                ),
            )),
        },
        ArgKind::FileIn | ArgKind::FileOut => Ok(ArgValue::FilePath(lit.to_string())),
        ArgKind::Pointer => Err(GenError::new(
            GenErrorKind::Schema,
            format!(
                "{}: action {:?}: parameter {:?} is a Pointer and cannot be built from a literal",
                test_name, action.name, name
            ),
        )),
    }
}

fn resolve_optional(
    action: &Action,
    kind: OptArgKind,
    name: &str,
    lit: &str,
    test_name: &str,
) -> Result<Option<OptValue>, GenError> {
    match kind {
        OptArgKind::OBool => match lit {
            "" => Ok(None),
            "true" => Ok(Some(OptValue::Bool(true))),
            "false" => Ok(Some(OptValue::Bool(false))),
            _ => Err(GenError::new(
                GenErrorKind::Literal,
                format!(
                    "{}: action {:?}: optional parameter {:?}: boolean literal must be empty, \"true\" or \"false\", got {:?}",
                    test_name, action.name, name, lit
                ),
            )),
        },
        OptArgKind::OInt => {
            if lit.is_empty() {
                Ok(None)
            } else {
                parse_int(action, name, lit, test_name).map(|v| Some(OptValue::Int(v)))
            }
        }
        OptArgKind::OInt64 => {
            if lit.is_empty() {
                Ok(None)
            } else {
                parse_int(action, name, lit, test_name).map(|v| Some(OptValue::Int64(v)))
            }
        }
        OptArgKind::OString => {
            if lit == "NOARG" {
                Ok(None)
            } else {
                Ok(Some(OptValue::Str(lit.to_string())))
            }
        }
        // An empty literal is still present: an explicit empty list.
        OptArgKind::OStringList => {
            if lit == "NOARG" {
                Ok(None)
            } else {
                Ok(Some(OptValue::List(split_list(lit))))
            }
        }
    }
}

fn split_list(lit: &str) -> Vec<String> {
    if lit.is_empty() {
        Vec::new()
    } else {
        lit.split(' ').map(str::to_string).collect()
    }
}

fn parse_int(action: &Action, name: &str, lit: &str, test_name: &str) -> Result<i64, GenError> {
    lit.parse::<i64>().map_err(|_| {
        GenError::new(
            GenErrorKind::Literal,
            format!(
                "{}: action {:?}: parameter {:?}: cannot parse {:?} as a base-10 integer",
                test_name, action.name, name, lit
            ),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vfd_registry::{Action, ArgKind, OptArgKind, ReturnShape};

    static MKFS: Action = Action {
        name: "mkfs",
        call: "mkfs_opts",
        args: &[(ArgKind::String, "fstype"), (ArgKind::Device, "device")],
        optargs: &[(OptArgKind::OInt, "blocksize")],
        ret: ReturnShape::Err,
        group: None,
        tests: &[],
    };

    #[test]
    fn present_optional_int_sets_bit_zero() {
        let r = resolve_call(&MKFS, &["ext2", "/dev/sda1", "4096"], "test_mkfs_0").unwrap();
        assert_eq!(r.bitmask, 0b1);
        assert_eq!(r.optargs[0].value, Some(OptValue::Int(4096)));
    }

    #[test]
    fn empty_optional_int_is_absent() {
        let r = resolve_call(&MKFS, &["ext2", "/dev/sda1", ""], "test_mkfs_0").unwrap();
        assert_eq!(r.bitmask, 0b0);
        assert_eq!(r.optargs[0].value, None);
    }

    #[test]
    fn resolution_is_idempotent() {
        let a = resolve_call(&MKFS, &["ext2", "/dev/sda1", "4096"], "test_mkfs_0").unwrap();
        let b = resolve_call(&MKFS, &["ext2", "/dev/sda1", "4096"], "test_mkfs_0").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn arity_mismatch_is_rejected_not_truncated() {
        let short = resolve_call(&MKFS, &["ext2", "/dev/sda1"], "test_mkfs_0").unwrap_err();
        assert_eq!(short.kind, crate::compile::GenErrorKind::Schema);
        assert!(short.message.contains("test_mkfs_0"));
        assert!(short.message.contains("mkfs"));

        let long =
            resolve_call(&MKFS, &["ext2", "/dev/sda1", "4096", "extra"], "test_mkfs_0").unwrap_err();
        assert_eq!(long.kind, crate::compile::GenErrorKind::Schema);
    }

    #[test]
    fn unparsable_int_literal_fails_generation() {
        let err = resolve_call(&MKFS, &["ext2", "/dev/sda1", "4k"], "test_mkfs_0").unwrap_err();
        assert_eq!(err.kind, crate::compile::GenErrorKind::Literal);
        assert!(err.message.contains("blocksize"));
    }

    static OPTY: Action = Action {
        name: "opty",
        call: "opty",
        args: &[],
        optargs: &[
            (OptArgKind::OBool, "obool"),
            (OptArgKind::OString, "ostring"),
            (OptArgKind::OStringList, "ostringlist"),
        ],
        ret: ReturnShape::Err,
        group: None,
        tests: &[],
    };

    #[test]
    fn bitmask_is_positional_lsb_first() {
        let r = resolve_call(&OPTY, &["", "value", "NOARG"], "t").unwrap();
        assert_eq!(r.bitmask, 0b010);
        let r = resolve_call(&OPTY, &["true", "NOARG", "a b"], "t").unwrap();
        assert_eq!(r.bitmask, 0b101);
    }

    #[test]
    fn empty_ostringlist_is_present_as_explicit_empty_list() {
        let r = resolve_call(&OPTY, &["", "NOARG", ""], "t").unwrap();
        assert_eq!(r.bitmask, 0b100);
        assert_eq!(r.optargs[2].value, Some(OptValue::List(Vec::new())));
    }

    #[test]
    fn malformed_obool_literal_is_rejected() {
        let err = resolve_call(&OPTY, &["yes", "NOARG", "NOARG"], "t").unwrap_err();
        assert_eq!(err.kind, crate::compile::GenErrorKind::Literal);
        assert!(err.message.contains("obool"));
    }

    static PTR: Action = Action {
        name: "internal_send_fd",
        call: "internal_send_fd",
        args: &[(ArgKind::Pointer, "fd")],
        optargs: &[],
        ret: ReturnShape::Err,
        group: None,
        tests: &[],
    };

    #[test]
    fn pointer_parameter_can_never_be_satisfied() {
        let err = resolve_call(&PTR, &["0"], "t").unwrap_err();
        assert_eq!(err.kind, crate::compile::GenErrorKind::Schema);
        assert!(err.message.contains("Pointer"));
    }

    #[test]
    fn buffer_length_counts_embedded_zero_bytes() {
        static WRITE: Action = Action {
            name: "write",
            call: "write",
            args: &[(ArgKind::Pathname, "path"), (ArgKind::BufferIn, "content")],
            optargs: &[],
            ret: ReturnShape::Err,
            group: None,
            tests: &[],
        };
        let r = resolve_call(&WRITE, &["/new", "abc\0abc"], "t").unwrap();
        match &r.args[1].2 {
            ArgValue::Buffer(bytes) => assert_eq!(bytes.len(), 7),
            other => panic!("expected buffer, got {other:?}"),
        }
    }

    #[test]
    fn string_list_splits_on_single_spaces() {
        static VG: Action = Action {
            name: "vgcreate",
            call: "vgcreate",
            args: &[
                (ArgKind::String, "volgroup"),
                (ArgKind::DeviceList, "physvols"),
            ],
            optargs: &[],
            ret: ReturnShape::Err,
            group: None,
            tests: &[],
        };
        let r = resolve_call(&VG, &["VG", "/dev/sda1 /dev/sdb1"], "t").unwrap();
        assert_eq!(
            r.args[1].2,
            ArgValue::List(vec!["/dev/sda1".to_string(), "/dev/sdb1".to_string()])
        );
        let r = resolve_call(&VG, &["VG", ""], "t").unwrap();
        assert_eq!(r.args[1].2, ArgValue::List(Vec::new()));
    }
}
