/// Minimum printable byte for an extracted run
const PRINTABLE_START: u8 = 0x20;
/// Maximum printable byte for an extracted run
const PRINTABLE_END: u8 = 0x7e;

/// Incremental scanner that pulls printable ASCII and UTF-16LE runs out of a
/// byte stream. Runs shorter than `min_chars` are dropped, runs reaching
/// `max_chars` are emitted and a fresh run is started. Emitted runs are
/// separated by a single newline.
pub(crate) struct StringsScanner {
    min_chars: usize,
    max_chars: usize,
    ascii_run: Vec<u8>,
    wide_run: Vec<u8>,
    wide_pending: Option<u8>,
    emitted: bool,
}

impl StringsScanner {
    pub(crate) fn new(min_chars: u32, max_chars: u32) -> StringsScanner {
        StringsScanner {
            min_chars: min_chars as usize,
            max_chars: max_chars as usize,
            ascii_run: Vec::new(),
            wide_run: Vec::new(),
            wide_pending: None,
            emitted: false,
        }
    }

    /// Scan a chunk of input and append any completed runs to `out`
    pub(crate) fn feed(&mut self, data: &[u8], out: &mut Vec<u8>) {
        for value in data {
            self.scan_ascii(*value, out);
            self.scan_wide(*value, out);
        }
    }

    /// Flush any still-open runs at end of input
    pub(crate) fn finish(&mut self, out: &mut Vec<u8>) {
        self.wide_pending = None;

        let mut run = std::mem::take(&mut self.ascii_run);
        self.emit(&mut run, out);
        let mut run = std::mem::take(&mut self.wide_run);
        self.emit(&mut run, out);
    }

    /// Track runs of printable single byte characters
    fn scan_ascii(&mut self, value: u8, out: &mut Vec<u8>) {
        if is_printable(value) {
            self.ascii_run.push(value);
            // Overlong runs are split at the max bound
            if self.ascii_run.len() == self.max_chars {
                let mut run = std::mem::take(&mut self.ascii_run);
                self.emit(&mut run, out);
            }
            return;
        }

        let mut run = std::mem::take(&mut self.ascii_run);
        self.emit(&mut run, out);
    }

    /// Track runs of printable UTF-16LE characters (printable byte followed by a zero byte)
    fn scan_wide(&mut self, value: u8, out: &mut Vec<u8>) {
        if let Some(low_byte) = self.wide_pending.take() {
            if value == 0 {
                self.wide_run.push(low_byte);
                if self.wide_run.len() == self.max_chars {
                    let mut run = std::mem::take(&mut self.wide_run);
                    self.emit(&mut run, out);
                }
                return;
            }
            let mut run = std::mem::take(&mut self.wide_run);
            self.emit(&mut run, out);
        }

        if is_printable(value) {
            self.wide_pending = Some(value);
            return;
        }

        let mut run = std::mem::take(&mut self.wide_run);
        self.emit(&mut run, out);
    }

    /// Emit a completed run if it satisfies the min bound
    fn emit(&mut self, run: &mut Vec<u8>, out: &mut Vec<u8>) {
        if !run.is_empty() && run.len() >= self.min_chars {
            if self.emitted {
                out.push(b'\n');
            }
            out.append(run);
            self.emitted = true;
        }
        run.clear();
    }
}

/// Check for printable single byte characters
fn is_printable(value: u8) -> bool {
    (PRINTABLE_START..=PRINTABLE_END).contains(&value)
}

/// Extract all printable runs from a byte slice in one pass
#[cfg(test)]
pub(crate) fn extract_strings(data: &[u8], min_chars: u32, max_chars: u32) -> Vec<u8> {
    let mut scanner = StringsScanner::new(min_chars, max_chars);
    let mut out = Vec::new();
    scanner.feed(data, &mut out);
    scanner.finish(&mut out);
    out
}
