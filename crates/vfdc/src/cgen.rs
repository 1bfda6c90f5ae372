//! Low-level C source writer shared by all emitters.

/// Accumulates emitted C source with indentation tracking.
#[derive(Debug, Default)]
pub struct CWriter {
    out: String,
    indent: usize,
}

impl CWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit one line at the current indentation.
    pub fn line(&mut self, s: &str) {
        if s.is_empty() {
            self.out.push('\n');
            return;
        }
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(s);
        self.out.push('\n');
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Emit a line and open one level of indentation.
    pub fn open(&mut self, s: &str) {
        self.line(s);
        self.indent += 1;
    }

    /// Close one level of indentation and emit a line (usually `}`).
    pub fn close(&mut self, s: &str) {
        debug_assert!(self.indent > 0);
        self.indent -= 1;
        self.line(s);
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// Escape bytes for use inside a C string literal.
///
/// Non-printing bytes use fixed-width octal escapes rather than hex: a hex
/// escape would greedily swallow a following hex digit, corrupting buffer
/// literals with embedded zero bytes.
pub fn c_quote(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'"' => out.push_str("\\\""),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7E => out.push(b as char),
            _ => out.push_str(&format!("\\{:03o}", b)),
        }
    }
    out
}

/// Render an i64 as a C constant of type int64_t.
pub fn c_int64(v: i64) -> String {
    format!("INT64_C ({v})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_indents_blocks() {
        let mut w = CWriter::new();
        w.open("if (r == -1) {");
        w.line("return -1;");
        w.close("}");
        assert_eq!(w.finish(), "if (r == -1) {\n  return -1;\n}\n");
    }

    #[test]
    fn quote_escapes_specials_and_embedded_zero_bytes() {
        assert_eq!(c_quote(b"plain"), "plain");
        assert_eq!(c_quote(b"a\"b\\c"), "a\\\"b\\\\c");
        assert_eq!(c_quote(b"nl\n"), "nl\\n");
        // Octal escapes are fixed width, so a digit can follow safely.
        assert_eq!(c_quote(b"abc\0abc"), "abc\\000abc");
        assert_eq!(c_quote(b"\x01"), "\\001");
    }
}
