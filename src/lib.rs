pub mod eval;
pub mod lex;
pub mod repl;

pub use eval::{EvalError, Evaluator, Number, evaluate};
pub use lex::{LexError, Lexer};
pub use repl::{Session, Summary};
