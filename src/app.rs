use std::fs;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;

use crate::config::Config;
use crate::data::export::ExportFormat;
use crate::data::filter::FilterField;
use crate::data::loader::{resolve_workbook_path, WorkbookCache};
use crate::data::validate::Submission;
use crate::error::LoadError;
use crate::state::SessionState;
use crate::ui::command::{parse, Command, HELP};
use crate::ui::table::{filter_summary, render_list, render_view};

/// Whether the read-eval loop keeps going after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

// ---------------------------------------------------------------------------
// Interactive session
// ---------------------------------------------------------------------------

pub struct BoksApp {
    config: Config,
    cache: WorkbookCache,
    workbook_path: PathBuf,
    pub state: SessionState,
}

impl BoksApp {
    /// Locate and load the workbook, then open a session on it.
    pub fn start(config: Config) -> Result<Self, LoadError> {
        let cache = WorkbookCache::new();
        let workbook_path = resolve_workbook_path(&config.workbook_candidates)?;
        info!("using workbook {}", workbook_path.display());
        let workbook = cache.get_or_load(&workbook_path)?;
        Ok(Self {
            state: SessionState::new(workbook),
            config,
            cache,
            workbook_path,
        })
    }

    /// Read commands until `quit` or end of input.
    ///
    /// Only a failed `reload` ends the loop with an error.
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, out: &mut W) -> Result<()> {
        writeln!(out, "📘 BIM BOKS Beheer App")?;
        writeln!(
            out,
            "{} regels geladen uit {}. Typ 'help' voor de commando's.",
            self.state.table().len(),
            self.workbook_path.display()
        )?;

        loop {
            write!(out, "> ")?;
            out.flush()?;
            let mut line = String::new();
            if input.read_line(&mut line).context("reading command")? == 0 {
                writeln!(out)?;
                return Ok(());
            }
            match parse(&line) {
                Ok(None) => {}
                Ok(Some(command)) => {
                    if self.execute(command, out)? == Flow::Quit {
                        return Ok(());
                    }
                }
                Err(err) => writeln!(out, "{err}")?,
            }
        }
    }

    pub fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> Result<Flow> {
        match command {
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Show => self.show(out)?,
            Command::Filter { field, value } => self.filter(field, value.as_deref(), out)?,
            Command::ClearFilters => {
                self.state.clear_filters();
                writeln!(out, "{}", filter_summary(&self.state.filters))?;
            }
            Command::Options(field) => {
                let values = self.state.options().values(field);
                writeln!(out, "{}", render_list(field.label(), values))?;
            }
            Command::Topics(category) => {
                let title = format!("Onderwerpen voor '{category}'");
                writeln!(out, "{}", render_list(&title, self.state.topic_choices(&category)))?;
            }
            Command::Add(submission) => self.add(&submission, out)?,
            Command::Export(format) => self.export(format, out)?,
            Command::Reload => self.reload(out)?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn show<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "📄 Overzicht ({})", filter_summary(&self.state.filters))?;
        if let Some(view) = self.state.view() {
            writeln!(out, "{}", render_view(&view))?;
            writeln!(out, "{} van {} regels", view.len(), self.state.table().len())?;
        }
        Ok(())
    }

    fn filter<W: Write>(
        &mut self,
        field: FilterField,
        value: Option<&str>,
        out: &mut W,
    ) -> Result<()> {
        let resolved = match value {
            None => None,
            Some(text) => match self.state.options().resolve(field, text) {
                Some(v) => Some(v),
                None => {
                    writeln!(out, "'{text}' is geen keuze voor {field}")?;
                    return Ok(());
                }
            },
        };
        self.state.set_filter(field, resolved);
        writeln!(
            out,
            "{} ({} regels)",
            filter_summary(&self.state.filters),
            self.state.visible_indices.len()
        )?;
        Ok(())
    }

    fn add<W: Write>(&mut self, submission: &Submission, out: &mut W) -> Result<()> {
        match self.state.submit(submission) {
            Ok(row) => writeln!(
                out,
                "✅ Toegevoegd! {} / {} / {}",
                row.course_code, row.category, row.topic
            )?,
            Err(err) => writeln!(out, "❌ {err}")?,
        }
        Ok(())
    }

    /// Export failures are reported and the session continues.
    fn export<W: Write>(&mut self, format: ExportFormat, out: &mut W) -> Result<()> {
        let path = self.config.download_dir.join(format.file_name());
        let written = self.state.download(format).map_err(anyhow::Error::from).and_then(|d| {
            fs::write(&path, &d.bytes)
                .with_context(|| format!("writing {}", path.display()))
                .map(|()| d)
        });
        match written {
            Ok(download) => {
                info!("exported {} bytes to {}", download.bytes.len(), path.display());
                writeln!(
                    out,
                    "⬇️ {} ({}, {} bytes)",
                    path.display(),
                    download.mime_type,
                    download.bytes.len()
                )?;
            }
            Err(err) => {
                self.state.status_message = Some(format!("Export mislukt: {err:#}"));
                writeln!(out, "Export mislukt: {err:#}")?;
            }
        }
        Ok(())
    }

    /// Re-read the workbook. The session's rows are kept; a load failure is fatal.
    fn reload<W: Write>(&mut self, out: &mut W) -> Result<()> {
        self.cache.invalidate(&self.workbook_path);
        let workbook = self
            .cache
            .get_or_load(&self.workbook_path)
            .context("Kan Excel-bestand niet laden")?;
        self.state.replace_workbook(workbook);
        writeln!(
            out,
            "Referentietabellen opnieuw geladen ({} regels in sessie)",
            self.state.table().len()
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use tempfile::TempDir;

    use super::*;
    use crate::config::WORKBOOK_FILE;
    use crate::data::export::read_csv_table;
    use crate::data::loader::read_workbook_sheet;
    use crate::data::model::BoksTable;
    use crate::data::sample::fixtures::scenario_bytes;

    /// A workbook at the second candidate path; the first does not exist.
    fn setup() -> (TempDir, Config) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(WORKBOOK_FILE);
        fs::write(&path, scenario_bytes()).unwrap();
        let config = Config {
            workbook_candidates: vec![dir.path().join("data").join(WORKBOOK_FILE), path],
            download_dir: dir.path().to_path_buf(),
        };
        (dir, config)
    }

    fn run_script(app: &mut BoksApp, script: &str) -> String {
        let mut out = Vec::new();
        app.run(Cursor::new(script.to_string()), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn missing_workbook_fails_to_start() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            workbook_candidates: vec![dir.path().join("nope.xlsx")],
            download_dir: dir.path().to_path_buf(),
        };
        assert!(matches!(BoksApp::start(config), Err(LoadError::NotFound { .. })));
    }

    #[test]
    fn add_show_and_export_csv() {
        let (dir, config) = setup();
        let mut app = BoksApp::start(config).unwrap();

        let output = run_script(
            &mut app,
            "add C1 Structural HVAC\nadd C3 Structural Beams\nshow\nexport csv\nquit\n",
        );

        assert!(output.contains("3 regels geladen"));
        assert!(output.contains("❌ Combinatie ongeldig"));
        assert!(output.contains("✅ Toegevoegd! C3 / Structural / Beams"));
        assert_eq!(output.matches("❌").count(), 1);
        assert!(output.contains("4 van 4 regels"));

        let bytes = fs::read(dir.path().join("BIM_boks.csv")).unwrap();
        let exported = read_csv_table(&bytes).unwrap();
        assert_eq!(exported.len(), 4);
        assert_eq!(exported.rows[3].course_code.to_string(), "C3");
        assert_eq!(exported.rows[3].topic.to_string(), "Beams");
    }

    #[test]
    fn filters_resolve_against_options() {
        let (_dir, config) = setup();
        let mut app = BoksApp::start(config).unwrap();

        let output = run_script(&mut app, "filter course C1\nfilter topic Roofs\nshow\n");

        assert!(output.contains("Cursus: C1 | Categorie: Alle | Onderwerp: Alle (2 regels)"));
        assert!(output.contains("'Roofs' is geen keuze voor Onderwerp"));
        assert!(output.contains("2 van 3 regels"));
        assert_eq!(app.state.visible_indices, vec![0, 2]);
    }

    #[test]
    fn topics_are_listed_per_category() {
        let (_dir, config) = setup();
        let mut app = BoksApp::start(config).unwrap();

        let output = run_script(&mut app, "topics Structural\noptions category\n");

        assert!(output.contains("Onderwerpen voor 'Structural':\n  - Foundations\n  - Beams"));
        assert!(output.contains("Categorie:\n  - Structural\n  - MEP"));
    }

    #[test]
    fn xlsx_export_has_boks_sheet() {
        let (dir, config) = setup();
        let mut app = BoksApp::start(config).unwrap();

        let output = run_script(&mut app, "export xlsx\n");
        assert!(output.contains("BIM_boks.xlsx"));

        let bytes = fs::read(dir.path().join("BIM_boks.xlsx")).unwrap();
        let sheet = read_workbook_sheet(Cursor::new(bytes), "BIM_boks").unwrap();
        assert_eq!(
            &BoksTable::from_sheet(sheet),
            app.state.table().snapshot().unwrap()
        );
    }

    #[test]
    fn export_failure_keeps_session_alive() {
        let (dir, mut config) = setup();
        config.download_dir = dir.path().join("missing").join("dir");
        let mut app = BoksApp::start(config).unwrap();

        let output = run_script(&mut app, "export csv\nadd C2 MEP HVAC\n");
        assert!(output.contains("Export mislukt"));
        assert!(output.contains("✅ Toegevoegd!"));
    }

    #[test]
    fn reload_keeps_session_rows() {
        let (_dir, config) = setup();
        let mut app = BoksApp::start(config).unwrap();

        let output = run_script(&mut app, "add C2 MEP HVAC\nreload\n");
        assert!(output.contains("opnieuw geladen (4 regels in sessie)"));
        assert_eq!(app.state.table().len(), 4);
    }

    #[test]
    fn reload_of_vanished_workbook_is_fatal() {
        let (dir, config) = setup();
        let mut app = BoksApp::start(config).unwrap();
        fs::write(dir.path().join(WORKBOOK_FILE), b"corrupt").unwrap();

        let mut out = Vec::new();
        let err = app.run(Cursor::new("reload\nshow\n"), &mut out).unwrap_err();
        assert!(format!("{err:#}").starts_with("Kan Excel-bestand niet laden"));
    }

    #[test]
    fn bad_commands_are_reported_and_skipped() {
        let (_dir, config) = setup();
        let mut app = BoksApp::start(config).unwrap();

        let output = run_script(&mut app, "frobnicate\nadd C1\n\nquit\nshow\n");
        assert!(output.contains("onbekend commando 'frobnicate'"));
        assert!(output.contains("gebruik: add"));
        assert!(!output.contains("📄 Overzicht"));
    }
}
