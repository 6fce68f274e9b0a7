use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use rustyline::error::ReadlineError;
use rustyline::Editor;

use brine_interpreter::error::Error;
use brine_interpreter::{Environment, Evaluator};
use brine_parser::lexer;
use brine_parser::parser::Parser;

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn repl() {
    println!("brine v{} (type 'exit' to quit)", VERSION);

    // One environment persists across all inputs in this session
    let env = Rc::new(RefCell::new(Environment::new()));

    // `()` can be used when no completer is required
    let mut rl = Editor::<()>::new();
    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() { ">> " } else { ".. " };

        match rl.readline(prompt) {
            Ok(line) => {
                let line = line.trim();

                if buffer.is_empty() && (line == "exit" || line == "quit") {
                    break;
                }
                // Skip empty lines
                else if line.is_empty() {
                    continue;
                }

                if !buffer.is_empty() {
                    buffer.push(' ');
                }
                buffer.push_str(line);

                // Input is submitted once the buffer is `;`-terminated
                if !buffer.ends_with(';') {
                    continue;
                }

                let source = std::mem::take(&mut buffer);
                rl.add_history_entry(source.as_str());

                // Errors end this input, never the session
                if let Err(error) = evaluate(&source, &env) {
                    println!("{}", error);
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }
}

fn evaluate(source: &str, env: &Rc<RefCell<Environment>>) -> Result<(), Error> {
    let tokens = lexer::tokenize(source)?;
    let program = Parser::new(tokens).parse_program()?;

    let stdout = io::stdout();
    Evaluator::new_with_env(Rc::clone(env), stdout.lock()).eval(&program)?;

    Ok(())
}
