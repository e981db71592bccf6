//! Output sink for the `print` built-in, adapted from the same seam the
//! evaluator uses for every host-visible side effect.
use std::cell::RefCell;

pub trait PrintWriter {
    fn write_line(&self, text: &str);
}

pub struct StdPrint;

impl PrintWriter for StdPrint {
    fn write_line(&self, text: &str) {
        println!("{text}");
    }
}

pub struct NoPrint;

impl PrintWriter for NoPrint {
    fn write_line(&self, _text: &str) {}
}

/// Collects output in-memory; used by embedders and by this crate's own
/// end-to-end tests to assert on exactly what `print` produced.
pub struct CollectStringPrint {
    pub lines: RefCell<Vec<String>>,
}

impl CollectStringPrint {
    pub fn new() -> Self {
        Self { lines: RefCell::new(Vec::new()) }
    }

    pub fn joined(&self) -> String {
        self.lines.borrow().join("\n")
    }
}

impl Default for CollectStringPrint {
    fn default() -> Self {
        Self::new()
    }
}

impl PrintWriter for CollectStringPrint {
    fn write_line(&self, text: &str) {
        self.lines.borrow_mut().push(text.to_string());
    }
}
