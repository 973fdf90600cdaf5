use clap::{App, Arg};
use itmoscript::ast::AstPrinter;
use itmoscript::{Error, Interpreter};
use log::debug;
use std::fs;
use std::io::{self, BufRead, Write};

fn main() {
    env_logger::init();
    let matches = App::new("itmoscript")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Runs ITMOScript programs")
        .arg(
            Arg::with_name("ast")
                .long("ast")
                .help("Prints the parsed program to stderr before running it"),
        )
        .arg(
            Arg::with_name("script")
                .help("Script to run; starts an interactive prompt when omitted")
                .index(1),
        )
        .get_matches();
    let show_ast = matches.is_present("ast");
    match matches.value_of("script") {
        Some(script) => run_file(script, show_ast),
        None => run_prompt(show_ast),
    }
}

fn run_file(file: &str, show_ast: bool) {
    let contents = match fs::read_to_string(file) {
        Ok(contents) => contents,
        Err(e) => {
            eprintln!("Could not read {}: {}", file, e);
            std::process::exit(66);
        }
    };
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut input = stdin.lock();
    let mut output = stdout.lock();
    let result = run(&contents, &mut input, &mut output, show_ast);
    if let Err(e) = result {
        let _ = output.flush();
        eprintln!("Error: {}", e);
        match e {
            Error::Lex(_) | Error::Parse(_) => std::process::exit(65),
            Error::Runtime(_) => std::process::exit(70),
        }
    }
}

/// Each line is a complete program; globals carry over to the next line.
fn run_prompt(show_ast: bool) {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut input = stdin.lock();
    let mut environment = itmoscript::builtins::global_environment();
    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            return;
        }
        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let mut output = stdout.lock();
        let mut interpreter = Interpreter::with_environment(environment, &mut input, &mut output);
        match itmoscript::parse_source(&line) {
            Ok(program) => {
                if show_ast {
                    eprintln!("{}", AstPrinter {}.print_program(&program));
                }
                interpreter.interpret(&program);
            }
            Err(e) => eprintln!("Error: {}", e),
        }
        environment = interpreter.into_environment();
        let _ = writeln!(output);
    }
}

fn run(
    source: &str,
    input: &mut dyn BufRead,
    output: &mut dyn Write,
    show_ast: bool,
) -> Result<(), Error> {
    let program = itmoscript::parse_source(source)?;
    debug!("running {} statements", program.statements.len());
    if show_ast {
        eprintln!("{}", AstPrinter {}.print_program(&program));
    }
    Interpreter::new(input, output).execute_program(&program)?;
    Ok(())
}
