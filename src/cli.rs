use std::fmt::Display;

use argh::FromArgs;

use crate::model::{CharacterOptions, GatePolicy};

#[derive(Debug, Clone)]
pub enum CliError {
    ParseFailure(argh::EarlyExit),
}

impl Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParseFailure(e) => write!(f, "{e:?}"),
        }
    }
}

/// vtalkr embedding options
#[derive(Debug, FromArgs)]
pub struct Args {
    /// enable verbose logging, overridden by "quiet" if passed
    #[argh(switch, short = 'v', long = "verbose")]
    verbose: bool,
    /// disable all logging, overrides verbose
    #[argh(switch, short = 'q', long = "quiet")]
    quiet: bool,
    /// conversational backend endpoint
    #[argh(option)]
    backend_url: Option<String>,
    /// preferred voice locale prefix for local synthesis
    #[argh(option)]
    locale: Option<String>,
    /// behavior when text arrives while audio is locked: prompt or drop
    #[argh(option)]
    gate_policy: Option<GatePolicy>,
    /// directory for the session database
    #[argh(option)]
    session_dir: Option<String>,
    /// maximum retained conversation pairs
    #[argh(option)]
    max_turns: Option<usize>,
}

impl Args {
    /// Parse some `args`. Args are expected to come from the embedding host.
    pub fn parse(args: &[&str]) -> Result<Self, CliError> {
        Self::from_args(&[env!("CARGO_PKG_NAME")], args).map_err(CliError::ParseFailure)
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn quiet(&self) -> bool {
        self.quiet
    }

    pub fn session_dir(&self) -> Option<&str> {
        self.session_dir.as_deref()
    }

    /// Merge the parsed args over the default options.
    pub fn to_options(&self) -> CharacterOptions {
        let mut options = CharacterOptions::default();

        if let Some(v) = &self.backend_url {
            options.backend_url = v.clone();
        }
        if let Some(v) = &self.locale {
            options.locale = v.clone();
        }
        if let Some(v) = self.gate_policy {
            options.gate_policy = v;
        }
        if let Some(v) = self.max_turns {
            options.max_turns = v;
        }

        options
    }
}
