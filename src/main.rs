use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rox::ast_printer::AstPrinter;
use rox::error::{LoxError, Reporter};
use rox::parser::Parser;
use rox::runner::{RunStatus, Session};
use rox::scanner::Scanner;
use rox::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print the tokens as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Parses a file and prints each statement's syntax tree
    Parse { filename: PathBuf },

    /// Runs input from a file as a Lox program
    Run { filename: PathBuf },

    /// Reads Lox lines from stdin and runs each one
    Repl,
}

/// Prints every diagnostic to stderr as it arrives.
struct StderrReporter;

impl Reporter for StderrReporter {
    fn report(&mut self, error: LoxError) {
        debug!("Reporting diagnostic: {}", error);

        eprintln!("{}", error);
    }
}

/// Reads the contents of a file into a String
fn read_file(filename: PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(&filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    let source = String::from_utf8(buf)
        .map_err(LoxError::from)
        .context(format!("File {:?} is not valid UTF-8", filename))?;

    Ok(source)
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Configure env_logger to write to file with module and source line
    Builder::new()
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("rox::").unwrap_or(module);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn tokenize(filename: PathBuf, json: bool) -> Result<i32> {
    let source = read_file(filename)?;
    let mut reporter = StderrReporter;
    let (tokens, had_error) = Scanner::new(source.as_bytes()).scan_tokens(&mut reporter);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&tokens).context("Failed to serialize tokens")?
        );
    } else {
        for token in &tokens {
            println!("{}", token);
        }
    }

    Ok(if had_error { 65 } else { 0 })
}

fn parse(filename: PathBuf) -> Result<i32> {
    let source = read_file(filename)?;
    let mut reporter = StderrReporter;
    let (tokens, had_lex_error): (Vec<Token>, bool) =
        Scanner::new(source.as_bytes()).scan_tokens(&mut reporter);
    let (statements, had_syntax_error) = Parser::new(tokens, &mut reporter).parse();

    for stmt in &statements {
        println!("{}", AstPrinter::print_stmt(stmt));
    }

    Ok(if had_lex_error || had_syntax_error { 65 } else { 0 })
}

fn run(filename: PathBuf) -> Result<i32> {
    let source = read_file(filename)?;
    let mut session = Session::new();
    let status = session.run(&source, &mut StderrReporter);

    info!("Run finished with {:?}", status);

    Ok(status.exit_code())
}

fn repl() -> Result<i32> {
    let mut session = Session::new();
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush stdout")?;

        line.clear();
        let read = stdin
            .lock()
            .read_line(&mut line)
            .context("Failed to read from stdin")?;

        if read == 0 || line.trim().is_empty() {
            break;
        }

        // Errors are reported; the session stays usable for the next line.
        let status: RunStatus = session.run(&line, &mut StderrReporter);
        debug!("REPL line finished with {:?}", status);
    }

    Ok(0)
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    let code = match args.commands {
        Commands::Tokenize { filename, json } => tokenize(filename, json)?,
        Commands::Parse { filename } => parse(filename)?,
        Commands::Run { filename } => run(filename)?,
        Commands::Repl => repl()?,
    };

    if code != 0 {
        debug!("Exiting with code {}", code);

        std::process::exit(code);
    }

    Ok(())
}
