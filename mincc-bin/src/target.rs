use mincc::codegen;

#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
#[clap(rename_all = "snake_case")]
pub enum Target {
    x86_64_darwin,
    x86_64_linux,
    /// Only the default on hosts without a supported target.
    #[cfg_attr(
        all(target_arch = "x86_64", any(target_os = "macos", target_os = "linux")),
        allow(dead_code)
    )]
    #[clap(skip)]
    None,
}

impl Target {
    /// The generator target, if this is a real one.
    pub const fn codegen(self) -> Option<codegen::Target> {
        match self {
            Target::x86_64_darwin => Some(codegen::Target::x86_64_darwin),
            Target::x86_64_linux => Some(codegen::Target::x86_64_linux),
            Target::None => None,
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(all(target_arch = "x86_64", target_os = "macos"))] {
        pub const DEFAULT_TARGET: Target = Target::x86_64_darwin;
    } else if #[cfg(all(target_arch = "x86_64", target_os = "linux"))] {
        pub const DEFAULT_TARGET: Target = Target::x86_64_linux;
    } else {
        pub const DEFAULT_TARGET: Target = Target::None;
    }
}
