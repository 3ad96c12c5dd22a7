use std::fs;
use std::io;
use std::path::PathBuf;

use calc_interpreter::{Lexer, Session};
use clap::Parser;
use clap::Subcommand;
use miette::IntoDiagnostic;
use miette::WrapErr;

const DEFAULT_PROMPT: &str = "calc> ";

#[derive(Parser, Debug)]
#[command(version, about = "Evaluate integer arithmetic strictly left to right")]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Read expressions from stdin, one per line (the default)
    Repl {
        #[arg(long, default_value = DEFAULT_PROMPT)]
        prompt: String,
    },
    /// Evaluate a single expression
    Eval {
        #[arg(allow_hyphen_values = true)]
        expression: String,
    },
    /// Print the tokens of an expression
    Tokenize {
        #[arg(allow_hyphen_values = true)]
        expression: String,
    },
    /// Evaluate every line of a file
    Run { filename: PathBuf },
}

fn main() -> miette::Result<()> {
    let args = Args::parse();

    let command = args.command.unwrap_or(Commands::Repl {
        prompt: DEFAULT_PROMPT.to_string(),
    });

    match command {
        Commands::Repl { prompt } => {
            Session::new()
                .with_prompt(prompt)
                .run(io::stdin().lock(), io::stdout(), io::stderr())
                .into_diagnostic()
                .wrap_err("reading from stdin failed")?;
        }
        Commands::Eval { expression } => match calc_interpreter::evaluate(&expression) {
            Ok(number) => println!("{number}"),
            Err(e) => {
                eprintln!("Error: {e}");
                eprintln!("{:?}", miette::Report::new(e));

                std::process::exit(65);
            }
        },
        Commands::Tokenize { expression } => {
            for token in Lexer::new(None, &expression) {
                let token = match token {
                    Ok(token) => token,
                    Err(e) => {
                        eprintln!("[position {}] Error: {e}", e.position());
                        eprintln!("{:?}", miette::Report::new(e));

                        std::process::exit(65);
                    }
                };
                println!("{token}");
            }
        }
        Commands::Run { filename } => {
            let file_contents = fs::read_to_string(&filename)
                .into_diagnostic()
                .wrap_err_with(|| format!("reading `{}` failed", filename.display()))?;

            let summary = Session::new()
                .with_filename(filename.display().to_string())
                .run(file_contents.as_bytes(), io::stdout(), io::stderr())
                .into_diagnostic()
                .wrap_err("writing results failed")?;

            if summary.failed > 0 {
                std::process::exit(65);
            }
        }
    }
    Ok(())
}
