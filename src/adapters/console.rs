//! Console front end: renders menu pages and a progress bar on a text
//! stream (stdout in the binary).
//!
//! Implements both [`MenuDisplay`] and [`EventSink`]; events are also
//! forwarded to the [`LogEventSink`] so the log keeps a full record.

use std::io::Write;

use log::warn;

use crate::app::events::DispenseEvent;
use crate::app::ports::{EventSink, MenuDisplay};
use crate::menu::{ItemKind, MenuView};

use super::log_sink::LogEventSink;

const BAR_WIDTH: usize = 30;

pub struct ConsoleFrontend<W: Write> {
    out: W,
    log: LogEventSink,
    faulted: bool,
}

impl<W: Write> ConsoleFrontend<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            log: LogEventSink::new(),
            faulted: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, text: &str) {
        let result = self.out.write_all(text.as_bytes()).and_then(|()| self.out.flush());
        if let Err(e) = result {
            if !self.faulted {
                warn!("Console write failed: {e}");
            }
            self.faulted = true;
        }
    }
}

/// `[#########                     ]  30%`
pub fn progress_bar(pct: u8) -> String {
    let pct = pct.min(100);
    let filled = usize::from(pct) * BAR_WIDTH / 100;
    format!(
        "[{}{}] {pct:>3}%",
        "#".repeat(filled),
        " ".repeat(BAR_WIDTH - filled)
    )
}

impl<W: Write> MenuDisplay for ConsoleFrontend<W> {
    fn show_menu(&mut self, view: &MenuView) {
        let mut page = format!("\n== {} ==\n", view.title);
        if view.items.is_empty() {
            page.push_str("   (nothing available)\n");
        }
        for (i, item) in view.items.iter().enumerate() {
            let cursor = if view.highlighted == Some(i) { '>' } else { ' ' };
            let suffix = match item.kind {
                ItemKind::SubMenu => " ...",
                ItemKind::Leaf | ItemKind::Back => "",
            };
            page.push_str(&format!(" {cursor} {}{suffix}\n", item.label));
        }
        page.push_str("[advance | select | quit] > ");
        self.write(&page);
    }

    fn notice(&mut self, message: &str) {
        self.write(&format!("\n! {message}\n"));
    }
}

impl<W: Write> EventSink for ConsoleFrontend<W> {
    fn emit(&mut self, event: &DispenseEvent) {
        self.log.emit(event);
        let line = match event {
            DispenseEvent::Started { label, .. } => format!("\nPreparing {label}...\n"),
            DispenseEvent::IngredientSkipped { ingredient } => {
                format!("  (no pump for {ingredient}, skipping)\n")
            }
            DispenseEvent::Progress(pct) => format!("\r{}", progress_bar(*pct)),
            DispenseEvent::Finished { label, .. } => format!("\n{label} is ready. Enjoy!\n"),
            DispenseEvent::Interrupted { label } => format!("\n{label} was stopped.\n"),
        };
        self.write(&line);
    }
}
