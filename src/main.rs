use std::io;
use std::process::ExitCode;

use boks_manager::app::BoksApp;
use boks_manager::config::Config;

fn main() -> ExitCode {
    env_logger::init();

    let mut app = match BoksApp::start(Config::default()) {
        Ok(app) => app,
        Err(err) => {
            eprintln!("Kan Excel-bestand niet laden: {err}");
            return ExitCode::FAILURE;
        }
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    if let Err(err) = app.run(stdin.lock(), &mut stdout) {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
