//! Indented line buffer for Java output.

const INDENT: &str = "    ";

#[derive(Debug, Default)]
pub(crate) struct Writer {
    lines: Vec<String>,
    depth: usize,
}

impl Writer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A buffer whose lines start `depth` levels in.
    pub(crate) fn at_depth(depth: usize) -> Self {
        Writer {
            lines: Vec::new(),
            depth,
        }
    }

    /// Write a line at the current depth. Text spanning several lines (a
    /// lambda with a block body) keeps its relative indentation.
    pub(crate) fn line(&mut self, text: impl AsRef<str>) {
        for part in text.as_ref().split('\n') {
            if part.is_empty() {
                self.lines.push(String::new());
            } else {
                self.lines.push(format!("{}{}", INDENT.repeat(self.depth), part));
            }
        }
    }

    pub(crate) fn blank(&mut self) {
        self.lines.push(String::new());
    }

    /// Write a line and indent what follows.
    pub(crate) fn open(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.depth += 1;
    }

    /// Dedent and write a line.
    pub(crate) fn close(&mut self, text: impl AsRef<str>) {
        self.depth = self.depth.saturating_sub(1);
        self.line(text);
    }

    /// `} else {` and the like: dedent, write, indent again.
    pub(crate) fn reopen(&mut self, text: impl AsRef<str>) {
        self.depth = self.depth.saturating_sub(1);
        self.line(text);
        self.depth += 1;
    }

    /// Move the lines of `other` to the end of this buffer, indented to the
    /// current depth.
    pub(crate) fn append(&mut self, other: Writer) {
        let indent = INDENT.repeat(self.depth);
        for line in other.lines {
            if line.is_empty() {
                self.lines.push(line);
            } else {
                self.lines.push(format!("{}{}", indent, line));
            }
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub(crate) fn finish(self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    /// The lines without a trailing newline, for embedding in an expression.
    pub(crate) fn into_text(self) -> String {
        self.lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_blocks() {
        let mut w = Writer::new();
        w.open("if (a) {");
        w.line("f();");
        w.reopen("} else {");
        w.line("g();");
        w.close("}");
        assert_eq!(w.finish(), "if (a) {\n    f();\n} else {\n    g();\n}\n");
    }

    #[test]
    fn appended_buffers_are_reindented() {
        let mut inner = Writer::new();
        inner.open("{");
        inner.line("x();");
        inner.close("}");

        let mut outer = Writer::new();
        outer.open("void f() {");
        outer.append(inner);
        outer.close("}");
        assert_eq!(outer.finish(), "void f() {\n    {\n        x();\n    }\n}\n");
    }

    #[test]
    fn multi_line_text_keeps_relative_indent() {
        let mut w = Writer::at_depth(1);
        w.line("a = (() -> {\n    return 1;\n});");
        assert_eq!(w.into_text(), "    a = (() -> {\n        return 1;\n    });");
    }
}
