use std::io::{self, Write};

use anyhow::{anyhow, Context};
use clap::{App, Arg, ArgMatches};
use kaleido::ast::{ASTNode, Function, Prototype};
use kaleido::source::ReadChars;
use kaleido::{Driver, Interpreter, OperatorTable, Outcome};

struct Options {
    prompt: bool,
    dump_ast: bool,
}

fn operator_table(matches: &ArgMatches) -> anyhow::Result<OperatorTable> {
    let mut operators = OperatorTable::default();
    for def in matches.values_of("operator").into_iter().flatten() {
        let (symbol, precedence) = def
            .split_once('=')
            .ok_or_else(|| anyhow!("operator {:?} is not of the form SYM=PREC", def))?;
        let mut chars = symbol.chars();
        let op = match (chars.next(), chars.next()) {
            (Some(op), None) => op,
            _ => return Err(anyhow!("operator {:?} must be a single character", symbol)),
        };
        let precedence = precedence
            .parse()
            .with_context(|| format!("invalid precedence for operator {:?}", symbol))?;
        operators.insert(op, precedence)?;
    }
    Ok(operators)
}

fn prompt(options: &Options) {
    if options.prompt {
        eprint!("ready> ");
        // the prompt is cosmetic, evaluation goes on without it
        let _ = io::stderr().flush();
    }
}

fn report(outcome: Outcome, options: &Options) {
    if options.dump_ast {
        let node = match &outcome {
            Outcome::Declared(proto) => Some(ASTNode::Extern(proto.clone())),
            Outcome::Defined(func) => Some(ASTNode::Function(func.clone())),
            Outcome::Evaluated { expr, .. } => Some(ASTNode::Function(Function {
                prototype: Prototype::anonymous(),
                body: expr.clone(),
            })),
            _ => None,
        };
        if let Some(node) = node {
            eprintln!("{:#?}", node);
        }
    }

    match outcome {
        Outcome::Separator => {}
        Outcome::Declared(proto) => eprintln!("Read extern: {}", proto),
        Outcome::Defined(func) => {
            eprintln!("Read function definition: {}", ASTNode::Function(func))
        }
        Outcome::Evaluated { value, .. } => eprintln!("Evaluated to {:.6}", value),
        Outcome::Failed(e) => eprintln!("Error: {}", e),
    }
}

fn run<I: Iterator<Item = char>>(input: I, operators: OperatorTable, options: &Options) {
    let mut driver = Driver::new(input, operators, Interpreter::new());
    prompt(options);
    driver.run(|outcome| {
        report(outcome, options);
        prompt(options);
    });
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let matches = App::new("kaleido")
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::with_name("no-prompt")
                .long("no-prompt")
                .help("Don't print the ready> prompt"),
        )
        .arg(
            Arg::with_name("dump-ast")
                .long("dump-ast")
                .help("Print the AST of every top-level form"),
        )
        .arg(
            Arg::with_name("operator")
                .long("operator")
                .short("o")
                .value_name("SYM=PREC")
                .multiple(true)
                .number_of_values(1)
                .help("Add or override a binary operator precedence"),
        )
        .arg(
            Arg::with_name("SOURCE")
                .multiple(true)
                .help("Source text to run instead of reading stdin"),
        )
        .get_matches();

    let operators = operator_table(&matches)?;

    match matches.values_of("SOURCE") {
        Some(source) => {
            let source = source.collect::<Vec<_>>().join(" ");
            let options = Options {
                prompt: false,
                dump_ast: matches.is_present("dump-ast"),
            };
            run(source.chars(), operators, &options);
        }
        None => {
            let options = Options {
                prompt: !matches.is_present("no-prompt"),
                dump_ast: matches.is_present("dump-ast"),
            };
            let stdin = io::stdin();
            let mut chars = ReadChars::new(stdin.lock());
            run(&mut chars, operators, &options);
            if options.prompt {
                eprintln!();
            }
            if let Some(e) = chars.take_error() {
                return Err(e).context("failed to read input");
            }
        }
    }

    Ok(())
}
