use std::path::PathBuf;

use tracing::info;

use hatim::command::{self, Command};
use hatim::model::UsageLevel;
use hatim::session::{DEFAULT_COMPACT_THRESHOLD, Session};
use hatim::store::JsonFileStore;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let data_dir = std::env::var("HATIM_DATA_DIR").unwrap_or_else(|_| "./data".into());
    let document = std::env::var("HATIM_DOCUMENT").unwrap_or_else(|_| "hatim".into());
    let compact_threshold: u64 = std::env::var("HATIM_COMPACT_THRESHOLD")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_COMPACT_THRESHOLD);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cmd = match command::parse_command(&args) {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("{e}\n{}", command::USAGE);
            std::process::exit(2);
        }
    };

    std::fs::create_dir_all(&data_dir)?;
    let mut session = Session::open_in(&PathBuf::from(&data_dir), &document, compact_threshold)?;
    info!(data_dir = %data_dir, document = %document, "opened session");

    match cmd {
        Command::Show => print_roster(&session),
        Command::Add { pages, full_name } => {
            let p = session.add(&full_name, pages)?;
            println!("added {} ({} pages) as {}", p.full_name, p.pages, p.id);
        }
        Command::Edit { id, pages, full_name } => {
            session.edit(id, &full_name, pages)?;
            println!("updated {id}");
        }
        Command::Remove { id } => {
            session.remove(id)?;
            println!("removed {id}");
        }
        Command::MoveUp { index } => session.move_up(index)?,
        Command::MoveDown { index } => session.move_down(index)?,
        Command::SetName { name } => session.set_name(&name)?,
        Command::SetDates { start, end } => session.set_dates(Some(start), Some(end))?,
        Command::Export => {
            let export = session.export()?;
            info!(sheet = %export.sheet_name, file = %export.file_name, "export ready");
            print!("{}", export.matrix.to_tsv());
        }
        Command::Checkpoint => session.checkpoint()?,
    }
    Ok(())
}

fn print_roster(session: &Session<JsonFileStore>) {
    let doc = session.document();
    let title = if doc.name.is_empty() { "(untitled)" } else { doc.name.as_str() };
    let date = |d: Option<chrono::NaiveDate>| d.map_or_else(|| "-".to_string(), |d| d.to_string());
    println!("{title}  {} .. {}", date(doc.start_date), date(doc.end_date));

    for row in session.roster() {
        println!(
            "{:>3}  {}  {:<30} {:>4} pages  from p.{}",
            row.ordinal, row.id, row.full_name, row.pages, row.start_page
        );
    }

    let usage = session.usage();
    let marker = match usage.level {
        UsageLevel::Normal => "",
        UsageLevel::Warning => "  [almost full]",
        UsageLevel::Danger => "  [nearly exhausted]",
    };
    println!(
        "{} participants · {} pages used · {} pages left ({:.1}%){marker}",
        usage.participants, usage.used, usage.remaining, usage.fill_pct
    );
}
