use clap::Parser;
use std::{
    error::Error,
    io::{self, Write},
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use cip::{
    Command, Config, ConnectionInfo, OutputFormat, OutputFormatter, PromptError, Query,
    QueryOutput, Session, prompt,
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Read settings from this env file; process variables still win
    #[arg(long)]
    env_file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Rows per frame; defaults to CIP_MAX_ROWS
    #[arg(long)]
    max_rows: Option<u32>,

    /// Run one statement and exit instead of starting the shell
    sql: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize env_logger; For logging to STDOUT/STDERR
    env_logger::init();

    let cli = Cli::parse();
    let config = match &cli.env_file {
        Some(path) => Config::from_env_file(path)?,
        None => Config::from_env()?,
    };
    let mut max_rows = cli.max_rows.unwrap_or(config.max_rows);
    let mut formatter = OutputFormatter::new(cli.format);

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))?;

    let mut session = Session::from_config(&config);
    session.open_connection(ConnectionInfo::new()).await?;

    if let Some(sql) = cli.sql {
        let result = run_query(&mut session, &sql, max_rows, &interrupted).await;
        session.close_connection().await?;
        println!("{}", formatter.format_output(&result?));
        return Ok(());
    }

    let mut stdin = io::stdin().lock();
    let mut stdout = io::stdout();
    loop {
        let cmd = match prompt(&mut stdin, &mut stdout) {
            Ok(c) => c,
            Err(PromptError::Io(e)) => {
                eprintln!("failed to read input: {e}");
                break;
            }
            Err(e) => {
                eprintln!("error: {e}");
                continue;
            }
        };

        match cmd {
            Command::Exit => break,
            Command::Format(format) => formatter = OutputFormatter::new(format),
            Command::MaxRows(n) => max_rows = n,
            Command::Commit => report(session.commit().await.map(|_| "committed")),
            Command::Rollback => report(session.rollback().await.map(|_| "rolled back")),
            Command::Query(sql) => {
                interrupted.store(false, Ordering::SeqCst);
                match run_query(&mut session, &sql, max_rows, &interrupted).await {
                    Ok(output) => {
                        println!("{}", formatter.format_output(&output));
                        if interrupted.load(Ordering::SeqCst) {
                            println!("(interrupted, remaining rows not fetched)");
                        }
                    }
                    Err(e) => eprintln!("query error: {e}"),
                }
            }
        }
        stdout.flush()?;
    }

    if let Err(e) = session.close_connection().await {
        eprintln!("failed to close connection cleanly. error: {e}");
    }
    Ok(())
}

fn report(result: cip::Result<&str>) {
    match result {
        Ok(msg) => println!("{msg}"),
        Err(e) => eprintln!("error: {e}"),
    }
}

/// Runs `sql` to completion, or until Ctrl-C stops paging.
async fn run_query(
    session: &mut Session,
    sql: &str,
    max_rows: u32,
    interrupted: &AtomicBool,
) -> cip::Result<QueryOutput> {
    session
        .run_until(&Query::new(sql), max_rows, || {
            interrupted.load(Ordering::SeqCst)
        })
        .await
}
