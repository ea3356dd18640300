use zg_core::LogSection;

/// Accumulates text the guest writes through `wasm_log_write` and emits it
/// as log records on the configured target.
///
/// Records go through the `log` facade because the target is only known at
/// runtime.
#[derive(Debug, Clone, Default)]
pub struct GuestConsole {
    target: String,
    flush_on_newline: bool,
    pending: String,
}

impl GuestConsole {
    pub fn new(config: &LogSection) -> Self {
        Self {
            target: config.guest_target.clone(),
            flush_on_newline: config.flush_on_newline,
            pending: String::new(),
        }
    }

    pub fn write(&mut self, text: &str) {
        self.pending.push_str(text);
        if !self.flush_on_newline {
            return;
        }
        while let Some(end) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=end).collect();
            self.emit(line.trim_end_matches(['\r', '\n']));
        }
    }

    /// Emit everything written since the last flush as one record.
    pub fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.pending);
        self.emit(&text);
    }

    /// Text written but not yet emitted.
    pub fn pending(&self) -> &str {
        &self.pending
    }

    fn emit(&self, text: &str) {
        log::info!(target: self.target.as_str(), "{}", text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_accumulates_until_flush() {
        let mut console = GuestConsole::new(&LogSection::default());
        console.write("frame ");
        console.write("17\nnext");
        assert_eq!(console.pending(), "frame 17\nnext");

        console.flush();
        assert_eq!(console.pending(), "");
    }

    #[test]
    fn newline_mode_keeps_only_the_unterminated_tail() {
        let mut console = GuestConsole::new(&LogSection {
            guest_target: "app".to_string(),
            flush_on_newline: true,
        });
        console.write("one\r\ntwo\nthr");
        assert_eq!(console.pending(), "thr");
        console.write("ee\n");
        assert_eq!(console.pending(), "");
    }
}
