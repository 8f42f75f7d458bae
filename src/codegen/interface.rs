use crate::{
    ast::Program,
    codegen::{x86_64::Generator, x86_64_env},
    locals::Offset,
    token::Spanned,
};

const DEFAULT_CODE_CAPACITY: usize = 4 * 1024; // 4 KiB

/// Lowers a compiled unit to assembly text for the given target.
///
/// The output only depends on `target` and `program`: compiling the same
/// program twice yields byte-identical text.
pub fn generate(target: Target, program: &Program) -> Result<String, Spanned<Error>> {
    type DarwinGenerator = Generator<String, x86_64_env::Darwin>;
    type LinuxGenerator = Generator<String, x86_64_env::Linux>;

    let code = String::with_capacity(DEFAULT_CODE_CAPACITY);
    let code = match target {
        Target::x86_64_darwin => DarwinGenerator::new(code).generate(program)?,
        Target::x86_64_linux => LinuxGenerator::new(code).generate(program)?,
    };
    log::debug!(
        "generated {} bytes of assembly for {}",
        code.len(),
        target.triple()
    );
    Ok(code)
}

/// Broken invariants of a compiled unit. A unit built by the parser never
/// triggers these.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// An assignment whose target is not a local variable.
    NotAddressable,
    /// A local whose offset is not in the unit's variable table.
    UnresolvedLocal(Offset),
}

#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Target {
    x86_64_darwin,
    x86_64_linux,
}

impl Target {
    pub const ALL: &[Target] = &[Target::x86_64_darwin, Target::x86_64_linux];

    pub const fn triple(&self) -> &'static str {
        match self {
            Target::x86_64_darwin => "x86_64-apple-darwin",
            Target::x86_64_linux => "x86_64-unknown-linux-gnu",
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::x86_64_darwin => f.write_str("x86_64_darwin"),
            Target::x86_64_linux => f.write_str("x86_64_linux"),
        }
    }
}
