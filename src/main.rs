//! CLI for tokenizing pseudocode and driving the interpreter service.

use std::fs;
use std::process::ExitCode;

use pseudocode_rs::{
    ExecutionClient, HttpRemote, Outcome, Remote, Token, connect_from_env, tokenize,
};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        usage();
        return ExitCode::from(2);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    if command == "tokens" {
        return tokens(rest);
    }

    let (config, mut remote) = match connect_from_env() {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(2);
        }
    };

    let result = match (command, rest) {
        ("run", [path]) => read(path).and_then(|code| run(&mut remote, &code)),
        ("step", [path]) => read(path).and_then(|code| step(&mut remote, &code)),
        ("check", [path]) => read(path).and_then(|code| {
            let report = pseudocode_rs::check(&mut remote, &code, config.max_steps)
                .map_err(|e| e.to_string())?;
            let json = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
            println!("{json}");
            if report.is_consistent() {
                Ok(())
            } else {
                Err("runs are not consistent".to_string())
            }
        }),
        ("server-check", [path]) => read(path).and_then(|code| {
            let resp = remote.test_consistency(&code).map_err(|e| e.to_string())?;
            let json = serde_json::to_string_pretty(&resp).map_err(|e| e.to_string())?;
            println!("{json}");
            if resp.consistency.is_consistent() {
                Ok(())
            } else {
                Err("service reports runs are not consistent".to_string())
            }
        }),
        ("example", []) => remote
            .example()
            .map(|code| print!("{code}"))
            .map_err(|e| e.to_string()),
        ("snippets", []) => remote
            .list_snippets()
            .map(|names| {
                if names.is_empty() {
                    eprintln!("No snippets available");
                }
                for name in names {
                    println!("{name}");
                }
            })
            .map_err(|e| e.to_string()),
        ("save", [name, path]) => read(path).and_then(|code| {
            remote
                .save_snippet(name, &code)
                .map(|()| eprintln!("Snippet saved successfully"))
                .map_err(|e| e.to_string())
        }),
        ("load", [name]) => remote
            .load_snippet(name)
            .map(|code| print!("{code}"))
            .map_err(|e| e.to_string()),
        _ => {
            usage();
            return ExitCode::from(2);
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn usage() {
    eprintln!("Usage: pseudocode <command> [args...]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  tokens <files...>     Print the token stream of each file");
    eprintln!("  run <file>            Interpret a program in one go");
    eprintln!("  step <file>           Run a program one statement at a time");
    eprintln!("  check <file>          Compare batch and stepped runs");
    eprintln!("  server-check <file>   Ask the service to compare the runs");
    eprintln!("  example               Print the example program");
    eprintln!("  snippets              List saved snippets");
    eprintln!("  save <name> <file>    Save a file as a snippet");
    eprintln!("  load <name>           Print a saved snippet");
    eprintln!();
    eprintln!("The service URL is read from PSEUDOCODE_SERVER_URL.");
}

fn read(path: &str) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("{path}: {e}"))
}

fn tokens(files: &[String]) -> ExitCode {
    if files.is_empty() {
        eprintln!("Error: no files specified");
        return ExitCode::from(2);
    }

    let mut had_error = false;
    for path in files {
        match read(path) {
            Ok(content) => {
                println!("{path}:");
                print_tokens(&tokenize(&content), 1);
            }
            Err(e) => {
                eprintln!("{e}");
                had_error = true;
            }
        }
    }

    if had_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn print_tokens(tokens: &[Token], depth: usize) {
    let indent = "  ".repeat(depth);
    for token in tokens {
        println!(
            "{indent}{}..{} {} {:?}",
            token.span.start, token.span.end, token.kind, token.text
        );
        print_tokens(&token.children, depth + 1);
    }
}

fn run(remote: &mut HttpRemote, code: &str) -> Result<(), String> {
    let run = remote.interpret(code).map_err(|e| e.to_string())?;
    println!("{}", run.output);
    Ok(())
}

fn step(remote: &mut HttpRemote, code: &str) -> Result<(), String> {
    let mut client = ExecutionClient::new();
    client.start(remote, code).map_err(|e| e.to_string())?;

    let mut printed = 0;
    loop {
        let outcome = client.step(remote);
        for line in &client.transcript()[printed..] {
            println!("{line}");
        }
        printed = client.transcript().len();

        match outcome {
            Ok(Outcome::Stepped { .. }) => {
                for line in client.variable_lines() {
                    println!("  {line}");
                }
            }
            Ok(_) => return Ok(()),
            Err(e) => return Err(e.to_string()),
        }
    }
}
