use console::{Key, Term, style};
use rootsweep::size::{format_megabytes, format_size};
use rootsweep::{Entry, Event, Outcome, PreferenceStore, Session, Worker};
use std::io;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// Rows below the list: status, blank, key help.
const FOOTER_LINES: usize = 4;

const WORKER_POLL: Duration = Duration::from_millis(100);

pub struct Selector<S: PreferenceStore> {
    session: Session<S>,
    events: Receiver<Event>,
    worker: Worker,
    rows: Vec<Entry>,
    aggregate: u64,
    status: Option<String>,
    /// Set while a job is on the worker. Keys are not read until it is done.
    busy: Option<&'static str>,
    cursor: usize,
    offset: usize,
}

impl<S: PreferenceStore> Selector<S> {
    pub fn new(session: Session<S>, events: Receiver<Event>, worker: Worker) -> Self {
        let mut selector = Self {
            session,
            events,
            worker,
            rows: Vec::new(),
            aggregate: 0,
            status: None,
            busy: None,
            cursor: 0,
            offset: 0,
        };
        selector.drain_events();
        selector
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                Event::EntriesReady(rows) => {
                    self.rows = rows;
                    self.cursor = self.cursor.min(self.rows.len().saturating_sub(1));
                }
                Event::AggregateSizeChanged(size) => self.aggregate = size,
                Event::DeletionCompleted(report) => {
                    self.status = Some(format!(
                        "Cleaned {} in {} entries",
                        format_size(report.freed_bytes),
                        report.deleted.len()
                    ));
                }
                Event::Failed(reason) => self.status = Some(reason),
            }
        }
    }

    fn max_name_len(&self) -> usize {
        self.rows.iter().map(|e| e.name.chars().count()).max().unwrap_or(20)
    }

    fn visible_rows(term: &Term) -> usize {
        let (height, _) = term.size();
        (height as usize).saturating_sub(FOOTER_LINES + 2).max(1)
    }

    fn render(&mut self, term: &Term) -> io::Result<()> {
        let height = Self::visible_rows(term);
        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + height {
            self.offset = self.cursor + 1 - height;
        }

        let width = self.max_name_len();
        let mut output = String::new();

        output.push_str(&format!(
            "{} {}  sorted by {}  marked {}\n\n",
            style("rootsweep").bold(),
            style(self.session.root().display()).cyan(),
            style(self.session.sorting()).cyan(),
            style(format_megabytes(self.aggregate)).green().bold()
        ));

        if self.rows.is_empty() {
            output.push_str(&format!("{}\n", style("Nothing here.").yellow()));
        }

        for (index, entry) in self.rows.iter().enumerate().skip(self.offset).take(height) {
            let checkbox = if entry.marked_for_deletion {
                style("[✓]").green()
            } else {
                style("[ ]").dim()
            };
            let line = format!(
                "{} {:<width$}  {:>10}  {}",
                checkbox,
                entry.name,
                entry.size_human(),
                entry.kind().label(),
                width = width
            );
            let line = if index == self.cursor {
                style(line).reverse()
            } else if entry.is_hidden {
                style(line).dim()
            } else {
                style(line)
            };
            output.push_str(&format!("{}\n", line));
        }

        output.push('\n');
        if let Some(busy) = self.busy {
            output.push_str(&format!("{}\n", style(format!("{busy}...")).cyan()));
        } else if let Some(status) = &self.status {
            output.push_str(&format!("{}\n", style(status).yellow()));
        }
        output.push_str(&format!(
            "{} navigate  {} toggle  {} deselect all  {} sort  {} rescan  {} delete  {} quit\n",
            style("↑↓").cyan(),
            style("Space").cyan(),
            style("a").cyan(),
            style("s").cyan(),
            style("r").cyan(),
            style("Enter").cyan(),
            style("q").cyan()
        ));

        term.clear_screen()?;
        term.write_str(&output)?;
        Ok(())
    }

    fn move_up(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    fn move_down(&mut self) {
        if self.cursor + 1 < self.rows.len() {
            self.cursor += 1;
        }
    }

    fn toggle_current(&mut self) {
        let Some(entry) = self.rows.get_mut(self.cursor) else {
            return;
        };
        match self.session.toggle(&entry.name) {
            Ok(marked) => entry.marked_for_deletion = marked,
            Err(err) => self.status = Some(err.to_string()),
        }
    }

    fn deselect_all(&mut self) {
        self.session.deselect_all();
        for row in &mut self.rows {
            row.marked_for_deletion = false;
        }
    }

    fn cycle_sorting(&mut self) {
        if let Err(err) = self.session.cycle_sorting() {
            self.status = Some(err.to_string());
        }
    }

    fn confirm_delete(&mut self, term: &Term) -> io::Result<()> {
        let names = self.session.selected_names();
        if names.is_empty() {
            self.status = Some("Nothing to clean".to_string());
            return Ok(());
        }

        term.clear_screen()?;
        term.write_line(&format!(
            "{} {} entries ({})? This cannot be undone. [y/N]",
            style("Delete").red().bold(),
            names.len(),
            format_megabytes(self.session.aggregate_size())
        ))?;
        if !matches!(term.read_key()?, Key::Char('y') | Key::Char('Y')) {
            self.status = Some("Cancelled".to_string());
            return Ok(());
        }

        self.status = None;
        self.worker.submit_delete(self.session.root(), names);
        self.busy = Some("Deleting");
        Ok(())
    }

    fn rescan(&mut self) {
        self.status = None;
        self.worker
            .submit_scan(self.session.root(), self.session.exclusions().clone());
        self.busy = Some("Scanning");
    }

    fn handle(&mut self, outcome: Outcome) {
        let deleted = matches!(outcome, Outcome::Deleted(_));
        // Failures already reach the status line as events.
        let _ = self.session.apply_outcome(outcome);
        if deleted {
            self.rescan();
        } else {
            self.busy = None;
        }
    }

    /// Blocks until the worker answers, without doing the work here.
    fn wait_for_worker(&mut self) {
        loop {
            if let Some(outcome) = self.worker.recv_timeout(WORKER_POLL) {
                self.handle(outcome);
                return;
            }
            if !self.worker.is_running() {
                self.busy = None;
                self.status = Some("Background worker stopped".to_string());
                return;
            }
        }
    }

    pub fn run(mut self) -> io::Result<()> {
        let term = Term::stderr();
        term.hide_cursor()?;
        self.rescan();

        loop {
            self.drain_events();
            self.render(&term)?;

            if self.busy.is_some() {
                self.wait_for_worker();
                continue;
            }

            match term.read_key()? {
                Key::ArrowUp | Key::Char('k') => self.move_up(),
                Key::ArrowDown | Key::Char('j') => self.move_down(),
                Key::Char(' ') => self.toggle_current(),
                Key::Char('a') => self.deselect_all(),
                Key::Char('s') => self.cycle_sorting(),
                Key::Char('r') => self.rescan(),
                Key::Enter => self.confirm_delete(&term)?,
                Key::Escape | Key::Char('q') => break,
                _ => {}
            }
        }

        term.show_cursor()?;
        term.clear_screen()?;
        Ok(())
    }
}
