//! blockstore CLI
//!
//! Command-line interface for a block-organized student file.
//!
//! The data file carries no header, so `--block-size` and `--strategy` must
//! match the values the file was written with on every invocation.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use blockstore::report::{
    render_block_map, render_block_visualization, render_reorganization, render_summary,
};
use blockstore::{Config, Engine, Result, StrategyKind, Student, StudentGenerator};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// blockstore CLI
#[derive(Parser, Debug)]
#[command(name = "blockstore-cli")]
#[command(about = "Block-organized student record store")]
#[command(version)]
struct Args {
    /// Data file
    #[arg(short, long, default_value = "students.dat")]
    file: PathBuf,

    /// Block size in bytes
    #[arg(short, long, default_value = "512")]
    block_size: usize,

    /// Packing strategy (fixed, contiguous, fragmented)
    #[arg(short, long, default_value = "contiguous")]
    strategy: StrategyKind,

    #[command(subcommand)]
    command: Commands,
}

/// One line typed at the shell prompt
#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate records and replace the data file with them
    Load {
        /// Number of records to generate
        #[arg(short, long)]
        count: usize,

        /// Seed for reproducible data
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show one record
    Get {
        /// Record key
        key: u32,
    },

    /// Show every active record
    List,

    /// Generate records and insert them into free space
    Add {
        /// Number of records to generate
        #[arg(short, long)]
        count: usize,

        /// Seed for reproducible data
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Insert one record given field by field
    Insert {
        key: u32,
        name: String,
        /// 11-character national ID
        national_id: String,
        course: String,
        mother: String,
        father: String,
        admission_year: u32,
        score: f64,
    },

    /// Change fields of an existing record
    Update {
        key: u32,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        course: Option<String>,

        #[arg(long)]
        mother: Option<String>,

        #[arg(long)]
        father: Option<String>,

        #[arg(long)]
        score: Option<f64>,
    },

    /// Tombstone a record
    Delete {
        key: u32,
    },

    /// Compact active records into the `_reorg` sibling file
    Reorganize,

    /// Show occupancy statistics
    Stats,

    /// Interactive prompt; type `help` for commands, `quit` to leave
    Shell,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,blockstore=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .data_file(&args.file)
        .block_size(args.block_size)
        .strategy(args.strategy)
        .build();

    let engine = match Engine::open(config) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    let outcome = match args.command {
        Commands::Shell => run_shell(&engine),
        command => execute(&engine, command),
    };

    if let Err(e) = outcome {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

// =============================================================================
// Command Execution
// =============================================================================

fn execute(engine: &Engine, command: Commands) -> Result<()> {
    match command {
        Commands::Load { count, seed } => {
            let records = generator(seed).generate(count);
            let written = engine.load(&records)?;
            println!(
                "Wrote {} record(s) to {}",
                written,
                engine.data_file().display()
            );
        }

        Commands::Get { key } => {
            print_student(&engine.get(key)?);
        }

        Commands::List => {
            let students = engine.list()?;
            for student in &students {
                print_student(student);
            }
            println!("{} active record(s)", students.len());
        }

        Commands::Add { count, seed } => {
            let records = generator(seed)
                .starting_at(engine.next_key()?)
                .generate(count);
            let added = engine.add(&records)?;
            println!("Added {} record(s)", added);
        }

        Commands::Insert {
            key,
            name,
            national_id,
            course,
            mother,
            father,
            admission_year,
            score,
        } => {
            let student = Student {
                key,
                name,
                national_id,
                course,
                mother,
                father,
                admission_year,
                score,
            };
            engine.add(std::slice::from_ref(&student))?;
            println!("Inserted record {}", key);
        }

        Commands::Update {
            key,
            name,
            course,
            mother,
            father,
            score,
        } => {
            let mut student = engine.get(key)?;
            if let Some(name) = name {
                student.name = name;
            }
            if let Some(course) = course {
                student.course = course;
            }
            if let Some(mother) = mother {
                student.mother = mother;
            }
            if let Some(father) = father {
                student.father = father;
            }
            if let Some(score) = score {
                student.score = score;
            }
            engine.update(&student)?;
            println!("Updated record {}", key);
        }

        Commands::Delete { key } => {
            engine.delete(key)?;
            println!("Deleted record {}", key);
        }

        Commands::Reorganize => {
            let report = engine.reorganize()?;
            println!("{}", render_reorganization(&report));
        }

        Commands::Stats => {
            let stats = engine.stats()?;
            println!(
                "{} strategy, {}-byte blocks",
                engine.strategy(),
                engine.block_size()
            );
            println!("{}", render_summary(&stats));
            println!();
            println!("{}", render_block_map(&stats));
            println!();
            println!("{}", render_block_visualization(&stats));
        }

        Commands::Shell => {
            println!("Already in the shell");
        }
    }

    Ok(())
}

fn generator(seed: Option<u64>) -> StudentGenerator {
    match seed {
        Some(seed) => StudentGenerator::with_seed(seed),
        None => StudentGenerator::new(),
    }
}

fn print_student(s: &Student) {
    println!(
        "{:>6}  {:<40}  {}  {:<24}  {}  {:>5.2}",
        s.key, s.name, s.national_id, s.course, s.admission_year, s.score
    );
}

// =============================================================================
// Interactive Shell
// =============================================================================

/// Read one command per line until `quit`, `exit` or end of input
///
/// A failing command prints its error and the prompt comes back.
fn run_shell(engine: &Engine) -> Result<()> {
    println!(
        "blockstore v{} on {} ({} strategy, {}-byte blocks)",
        blockstore::VERSION,
        engine.data_file().display(),
        engine.strategy(),
        engine.block_size()
    );
    println!("Type `help` for commands, `quit` to leave.");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("blockstore> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let words = split_words(&line);

        match words.first().map(String::as_str) {
            None => continue,
            Some("quit") | Some("exit") => break,
            Some(_) => {}
        }

        match ShellLine::try_parse_from(&words) {
            Ok(parsed) => {
                if let Err(e) = execute(engine, parsed.command) {
                    println!("error: {}", e);
                }
            }
            Err(e) => {
                if let Err(io) = e.print() {
                    eprintln!("error: could not print usage: {}", io);
                }
            }
        }
    }

    Ok(())
}

/// Split a shell line on whitespace, keeping double-quoted text together
fn split_words(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                pending = true;
            }
            c if c.is_whitespace() && !quoted => {
                if pending {
                    words.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if pending {
        words.push(current);
    }

    words
}
