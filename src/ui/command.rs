use thiserror::Error;

use crate::data::export::ExportFormat;
use crate::data::filter::FilterField;
use crate::data::validate::Submission;
use crate::error::ExportError;

/// Value that clears a filter, as in the original "Alle" choice.
pub const NO_FILTER: &str = "Alle";

pub const HELP: &str = "\
Commando's:
  show                                   toon het overzicht (met filters)
  filter course|category|topic <waarde>  zet een filter ('Alle' wist het)
  filter clear                           wis alle filters
  options course|category|topic          toon de keuzes voor een filter
  topics <categorie>                     toon de onderwerpen van een categorie
  add <cursus> <categorie> <onderwerp>   voeg een regel toe (gebruik \"...\" bij spaties)
  export csv|xlsx                        schrijf BIM_boks.csv of BIM_boks.xlsx
  reload                                 lees de referentietabellen opnieuw in
  help                                   deze hulp
  quit                                   stoppen";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Show,
    /// `None` clears the filter.
    Filter {
        field: FilterField,
        value: Option<String>,
    },
    ClearFilters,
    Options(FilterField),
    Topics(String),
    Add(Submission),
    Export(ExportFormat),
    Reload,
    Quit,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("cannot split command line: {0}")]
    Tokenize(#[from] csv::Error),

    #[error("onbekend commando '{0}', typ 'help' voor een overzicht")]
    Unknown(String),

    #[error("gebruik: {0}")]
    Usage(&'static str),

    #[error("{0}")]
    Field(String),

    #[error(transparent)]
    Format(#[from] ExportError),
}

/// Split a line on spaces; double quotes group words, `""` escapes a quote.
pub fn tokenize(line: &str) -> Result<Vec<String>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .flexible(true)
        .from_reader(line.trim().as_bytes());
    match reader.records().next() {
        Some(record) => Ok(record?
            .iter()
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()),
        None => Ok(Vec::new()),
    }
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let tokens = tokenize(line)?;
    let Some((name, args)) = tokens.split_first() else {
        return Ok(None);
    };

    let command = match name.to_ascii_lowercase().as_str() {
        "help" | "?" => Command::Help,
        "show" | "ls" => Command::Show,
        "filter" => parse_filter(args)?,
        "options" => match args {
            [field] => Command::Options(field_arg(field)?),
            _ => return Err(CommandError::Usage("options course|category|topic")),
        },
        "topics" if !args.is_empty() => Command::Topics(args.join(" ")),
        "topics" => return Err(CommandError::Usage("topics <categorie>")),
        "add" => match args {
            [course, category, topic] => Command::Add(Submission {
                course_code: course.clone(),
                category: category.clone(),
                topic: topic.clone(),
            }),
            _ => return Err(CommandError::Usage("add <cursus> <categorie> <onderwerp>")),
        },
        "export" | "download" => match args {
            [format] => Command::Export(format.parse()?),
            _ => return Err(CommandError::Usage("export csv|xlsx")),
        },
        "reload" => Command::Reload,
        "quit" | "exit" => Command::Quit,
        _ => return Err(CommandError::Unknown(name.clone())),
    };
    Ok(Some(command))
}

fn parse_filter(args: &[String]) -> Result<Command, CommandError> {
    match args {
        [clear] if clear.eq_ignore_ascii_case("clear") => Ok(Command::ClearFilters),
        [field, value @ ..] if !value.is_empty() => {
            let field = field_arg(field)?;
            let value = value.join(" ");
            let value = if value == NO_FILTER || value.eq_ignore_ascii_case("all") {
                None
            } else {
                Some(value)
            };
            Ok(Command::Filter { field, value })
        }
        _ => Err(CommandError::Usage(
            "filter course|category|topic <waarde> | filter clear",
        )),
    }
}

fn field_arg(arg: &str) -> Result<FilterField, CommandError> {
    arg.parse().map_err(CommandError::Field)
}
