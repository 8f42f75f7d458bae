/// The lexer takes the source input, mapping it into a sequence of tokens.
pub mod lexer;

/// The parser takes a sequence of tokens, mapping it into an AST and
/// resolving every local variable to its stack slot.
pub mod parser;

/// The code generator takes a resolved AST, mapping it into assembly text.
pub mod codegen {
    mod interface;
    pub use interface::*;

    pub mod x86_64;
    pub mod x86_64_env;
}

pub mod ast;
pub mod error;
pub mod locals;
pub mod token;

pub mod util {
    pub mod fmt;
    #[cfg(test)]
    pub(crate) mod test_utils;
}

pub use error::CompileError;

/// Compiles a whole program into assembly text for the given target.
///
/// Stops at the first error of any stage.
pub fn compile(src: &str, target: codegen::Target) -> Result<String, CompileError> {
    let tokens = lexer::lex_in_new(src)?;
    let program = parser::parse_program(&tokens)?;
    Ok(codegen::generate(target, &program)?)
}
