use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ctm::{
    input_symbols, inspect, notes, parse, read_cases, CtmError, Diagnostic, DirectoryStore, Engine,
    Halt, Program, ProgramManager, ProgramStore, Step, TestCase, TestHarness, TestResult,
    MAX_EXECUTION_STEPS,
};
use serde::Serialize;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(author, version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
    /// Directory holding saved programs
    #[clap(long, global = true, default_value = "ctm-programs")]
    store: PathBuf,

    /// Log debug events to stderr (RUST_LOG takes precedence)
    #[clap(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a program on an input until it halts
    Run {
        /// Program file, saved program name or example name; stdin when omitted or `-`
        program: Option<String>,

        /// The initial tape content; spaces become blank cells
        #[clap(short, long, default_value = "")]
        input: String,

        /// Print each step of the execution
        #[clap(short = 'd', long)]
        debug: bool,

        /// Give up after this many steps
        #[clap(long, default_value_t = MAX_EXECUTION_STEPS)]
        max_steps: usize,
    },
    /// Run the test cases embedded in a program
    Test {
        program: Option<String>,

        #[clap(long, default_value_t = MAX_EXECUTION_STEPS)]
        max_steps: usize,
    },
    /// Show the parsed program, its diagnostics and analysis notes
    Inspect {
        program: Option<String>,

        /// Print machine-readable JSON
        #[clap(long)]
        json: bool,
    },
    /// Edit the test cases of a saved program
    #[clap(subcommand)]
    Cases(CasesCommand),
    /// Manage saved programs
    #[clap(subcommand)]
    Programs(ProgramsCommand),
}

#[derive(Subcommand)]
enum CasesCommand {
    /// List the test cases of a saved program
    List { name: String },
    /// Append a test case to a saved program
    Add {
        name: String,
        input: String,
        expected_output: String,
    },
    /// Delete a test case by its number as shown by `list`
    Delete { name: String, number: usize },
}

#[derive(Subcommand)]
enum ProgramsCommand {
    /// List saved programs and built-in examples
    List,
    /// Print the source of a saved program or example
    Show { name: String },
    /// Save a program file under a name
    Save { name: String, file: PathBuf },
    /// Delete a saved program
    Delete { name: String },
    /// Copy the built-in examples into the store
    Seed,
}

/// JSON shape printed by `inspect --json`.
#[derive(Serialize)]
struct Inspection<'a> {
    valid: bool,
    program: &'a Program,
    diagnostics: Vec<String>,
    notes: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn execute(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Run {
            program,
            input,
            debug,
            max_steps,
        } => {
            let source = load_source(&cli.store, program.as_deref())?;
            run(&source, &input, debug, max_steps)
        }
        Command::Test { program, max_steps } => {
            let source = load_source(&cli.store, program.as_deref())?;
            test(&source, max_steps)
        }
        Command::Inspect { program, json } => {
            let source = load_source(&cli.store, program.as_deref())?;
            inspect_source(&source, json)
        }
        Command::Cases(command) => {
            cases(&cli.store, command)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Programs(command) => {
            programs(&cli.store, command)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn open_store(root: &Path) -> Result<DirectoryStore> {
    DirectoryStore::open(root)
        .with_context(|| format!("could not open program store {}", root.display()))
}

/// Opens the store only when its directory already exists, so reading never creates it.
fn existing_store(root: &Path) -> Result<Option<DirectoryStore>> {
    if root.is_dir() {
        open_store(root).map(Some)
    } else {
        Ok(None)
    }
}

/// Opens the store holding the saved program `name`, failing when there is none.
fn store_with(root: &Path, name: &str) -> Result<DirectoryStore> {
    match existing_store(root)? {
        Some(store) if store.exists(name) => Ok(store),
        _ => Err(CtmError::NotFound(name.to_string()).into()),
    }
}

/// Resolves a program argument: a file path first, then a saved program, then an example.
/// Without an argument, or with `-`, the source is read from stdin.
fn load_source(store_root: &Path, program: Option<&str>) -> Result<String> {
    let name = match program {
        None | Some("-") => {
            if atty::is(atty::Stream::Stdin) {
                bail!("no program given; pass a file, a program name or pipe source on stdin");
            }

            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .context("could not read program from stdin")?;
            debug!("read program from stdin");
            return Ok(source);
        }
        Some(name) => name,
    };

    let path = Path::new(name);
    if path.is_file() {
        debug!(path = %path.display(), "loading program file");
        return std::fs::read_to_string(path)
            .with_context(|| format!("could not read {}", path.display()));
    }

    if let Some(store) = existing_store(store_root)? {
        if store.exists(name) {
            debug!(name, "loading saved program");
            return Ok(store.read(name)?);
        }
    }

    if let Some(text) = ProgramManager::get_program_text(name) {
        debug!(name, "loading example program");
        return Ok(text.to_string());
    }

    bail!("'{}' is neither a file, a saved program nor an example", name)
}

fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

fn run(source: &str, input: &str, debug: bool, max_steps: usize) -> Result<ExitCode> {
    let mut engine = Engine::new().with_step_limit(max_steps);
    if let Err(diagnostics) = engine.initialize(source, &input_symbols(input)) {
        bail!("program is invalid:\n{}", format_diagnostics(&diagnostics));
    }

    let halt = if debug {
        let print_state = |engine: &Engine| {
            if let Some(config) = engine.config() {
                println!(
                    "Step: {}, State: {}, Tape: {}",
                    config.step_count(),
                    config.state(),
                    config.tape().render()
                );
            }
        };

        print_state(&engine);
        loop {
            if engine.step_count() >= max_steps && !engine.is_finished() {
                break Halt::StepLimitExceeded(max_steps);
            }

            match engine.step() {
                Step::Continue => print_state(&engine),
                Step::Halt(halt) => break halt,
            }
        }
    } else {
        engine.run()
    };

    let (state, tape) = match engine.config() {
        Some(config) => (config.state().to_string(), config.tape().clone()),
        None => bail!("engine lost its configuration"),
    };

    match halt {
        Halt::Finished => {
            println!(
                "\nMachine halted in state {} after {} steps.",
                state,
                engine.step_count()
            );
            println!("{}", tape.render());
            println!("{}", tape.content_from_head());
            Ok(ExitCode::SUCCESS)
        }
        Halt::StepLimitExceeded(limit) => {
            println!("{}", tape.render());
            bail!("step limit of {} steps exceeded in state {}", limit, state)
        }
    }
}

fn test(source: &str, max_steps: usize) -> Result<ExitCode> {
    let cases = read_cases(source)?;
    if cases.is_empty() {
        println!("No test cases.");
        return Ok(ExitCode::SUCCESS);
    }

    let report = TestHarness::new()
        .with_step_limit(max_steps)
        .run_all(source, &cases);

    for (number, (case, result)) in report.results.iter().enumerate() {
        match result {
            TestResult::Success { steps } => {
                println!("#{} ok '{}' ({} steps)", number + 1, case.input, steps)
            }
            TestResult::Failure(failure) => {
                println!("#{} FAILED '{}': {}", number + 1, case.input, failure)
            }
        }
    }
    println!("\n{}", report.summary());

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn inspect_source(source: &str, json: bool) -> Result<ExitCode> {
    let report = inspect(source);
    let analysis = notes(&report.program);

    if json {
        let inspection = Inspection {
            valid: report.is_valid(),
            program: &report.program,
            diagnostics: report.diagnostics.iter().map(|d| d.to_string()).collect(),
            notes: analysis.iter().map(|n| n.to_string()).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&inspection)?);
    } else {
        let program = &report.program;
        println!(
            "Initial state: {}",
            program.initial_state.as_deref().unwrap_or("-")
        );
        println!("States: {}", program.states.join(", "));
        println!("Final states: {}", program.final_states.join(", "));
        println!("Alphabet: {}", program.alphabet.iter().collect::<String>());
        println!("Transitions:");
        for transition in &program.transitions {
            println!("  {}", transition);
        }

        for diagnostic in &report.diagnostics {
            match diagnostic.line() {
                Some(line) => println!("error (line {}): {}", line, diagnostic),
                None => println!("error: {}", diagnostic),
            }
        }
        for note in &analysis {
            println!("note: {}", note);
        }
    }

    Ok(if report.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn cases(store_root: &Path, command: CasesCommand) -> Result<()> {
    let harness = TestHarness::new();

    match command {
        CasesCommand::List { name } => {
            let store = store_with(store_root, &name)?;
            let cases = read_cases(&store.read(&name)?)?;
            if cases.is_empty() {
                println!("No test cases.");
            }
            for (number, case) in cases.iter().enumerate() {
                println!("#{} '{}' -> '{}'", number + 1, case.input, case.expected_output);
            }
        }
        CasesCommand::Add {
            name,
            input,
            expected_output,
        } => {
            let mut store = store_with(store_root, &name)?;
            let case = TestCase::new(input, expected_output);
            let cases = harness.add_case(&mut store, &name, case)?;
            info!(name = %name, count = cases.len(), "test case added");
            println!("{} now has {} test cases.", name, cases.len());
        }
        CasesCommand::Delete { name, number } => {
            let Some(index) = number.checked_sub(1) else {
                bail!("test case numbers start at 1");
            };
            let mut store = store_with(store_root, &name)?;
            let cases = harness.delete_case(&mut store, &name, index)?;
            println!("{} now has {} test cases.", name, cases.len());
        }
    }

    Ok(())
}

fn programs(store_root: &Path, command: ProgramsCommand) -> Result<()> {
    match command {
        ProgramsCommand::List => {
            if let Some(store) = existing_store(store_root)? {
                for name in store.list()? {
                    println!("{}", name);
                }
            }
            for name in ProgramManager::list_program_names() {
                println!("{} (example)", name);
            }
        }
        ProgramsCommand::Show { name } => {
            let text = if let Ok(store) = store_with(store_root, &name) {
                store.read(&name)?
            } else {
                ProgramManager::get_program_text(&name)
                    .map(str::to_string)
                    .with_context(|| format!("program '{}' not found", name))?
            };
            print!("{}", text);
        }
        ProgramsCommand::Save { name, file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("could not read {}", file.display()))?;
            if let Err(diagnostics) = parse(&text) {
                eprintln!(
                    "warning: saving a program with errors:\n{}",
                    format_diagnostics(&diagnostics)
                );
            }
            open_store(store_root)?.write(&name, &text)?;
            println!("Saved {}.", name);
        }
        ProgramsCommand::Delete { name } => {
            store_with(store_root, &name)?.delete(&name)?;
            println!("Deleted {}.", name);
        }
        ProgramsCommand::Seed => {
            let written = ProgramManager::seed(&mut open_store(store_root)?)?;
            println!("Seeded {} example programs.", written.len());
        }
    }

    Ok(())
}
