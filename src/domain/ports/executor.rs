//! Command execution port
//!
//! Commands are structured argument vectors. Only two shapes ever reach a
//! shell: [`ShellPipeline`]s assembled from quoted internal commands, and
//! operator-configured scripts (`build`, `release`, custom tasks).

use std::path::Path;
use std::time::Duration;

use crate::domain::entities::Host;
use crate::error::{CutoverError, CutoverResult};

/// How long a command may run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeout {
    /// The executor's bounded default
    #[default]
    Default,
    /// Data-dependent work (builds, dumps, restores)
    Unbounded,
    After(Duration),
}

/// What actually gets executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Exec { program: String, args: Vec<String> },
    Pipeline(ShellPipeline),
    /// Operator-supplied script from the configuration
    Script(String),
}

/// Two or more argv commands joined with `|`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellPipeline {
    stages: Vec<(String, Vec<String>)>,
}

impl ShellPipeline {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn stage<I, S>(mut self, program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stages
            .push((program.to_string(), args.into_iter().map(Into::into).collect()));
        self
    }

    /// Render as a shell string; every word is quoted
    pub fn render(&self) -> String {
        self.stages
            .iter()
            .map(|(program, args)| render_argv(program, args))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

impl Default for ShellPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// A command to run on a host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    invocation: Invocation,
    cwd: Option<String>,
    env: Vec<(String, String)>,
    timeout: Timeout,
    stream: bool,
}

impl CommandSpec {
    pub fn new(program: &str) -> Self {
        Self::from_invocation(Invocation::Exec {
            program: program.to_string(),
            args: Vec::new(),
        })
    }

    pub fn pipeline(pipeline: ShellPipeline) -> Self {
        Self::from_invocation(Invocation::Pipeline(pipeline))
    }

    pub fn script(script: impl Into<String>) -> Self {
        Self::from_invocation(Invocation::Script(script.into()))
    }

    fn from_invocation(invocation: Invocation) -> Self {
        Self {
            invocation,
            cwd: None,
            env: Vec::new(),
            timeout: Timeout::Default,
            stream: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        if let Invocation::Exec { args, .. } = &mut self.invocation {
            args.push(arg.into());
        }
        self
    }

    pub fn args<I, S>(mut self, new_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Invocation::Exec { args, .. } = &mut self.invocation {
            args.extend(new_args.into_iter().map(Into::into));
        }
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_string_lossy().into_owned());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn unbounded(mut self) -> Self {
        self.timeout = Timeout::Unbounded;
        self
    }

    pub fn timeout(mut self, after: Duration) -> Self {
        self.timeout = Timeout::After(after);
        self
    }

    /// Pass output straight through to the operator's terminal
    pub fn streaming(mut self) -> Self {
        self.stream = true;
        self
    }

    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    pub fn cwd(&self) -> Option<&str> {
        self.cwd.as_deref()
    }

    pub fn env_vars(&self) -> &[(String, String)] {
        &self.env
    }

    pub fn timeout_policy(&self) -> Timeout {
        self.timeout
    }

    pub fn is_streaming(&self) -> bool {
        self.stream
    }

    /// Command line without cwd/env, for logs and error messages
    pub fn display(&self) -> String {
        match &self.invocation {
            Invocation::Exec { program, args } => render_argv(program, args),
            Invocation::Pipeline(p) => p.render(),
            Invocation::Script(s) => s.clone(),
        }
    }

    /// Full shell rendering including env exports and `cd`
    ///
    /// Remote hosts receive this on the stdin of `sh -s` when env is set, so
    /// values never show up in an argv.
    pub fn to_shell(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.env {
            out.push_str(&format!("export {}={}; ", key, shell_quote(value)));
        }
        out.push_str(&self.command_line());
        out
    }

    /// `cd` plus the command, without env
    pub fn command_line(&self) -> String {
        let mut out = String::new();
        if let Some(cwd) = &self.cwd {
            out.push_str(&format!("cd {} && ", shell_quote(cwd)));
        }
        match &self.invocation {
            Invocation::Exec { program, args } => out.push_str(&render_argv(program, args)),
            Invocation::Pipeline(p) => out.push_str(&p.render()),
            Invocation::Script(s) => {
                out.push_str("sh -c ");
                out.push_str(&shell_quote(s));
            }
        }
        out
    }
}

fn render_argv(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .map(shell_quote)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Quote a word for POSIX sh; plain words are left bare
pub fn shell_quote(s: &str) -> String {
    let plain = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "_@%+=:,./-^".contains(c));
    if plain {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', "'\\''"))
    }
}

/// Runs commands on hosts
pub trait Executor: Send + Sync {
    /// Run and return trimmed stdout; non-zero exit is an error
    fn run(&self, host: &Host, command: &CommandSpec) -> CutoverResult<String>;

    /// Run a predicate; non-zero exit means `false`
    fn test(&self, host: &Host, command: &CommandSpec) -> CutoverResult<bool> {
        match self.run(host, command) {
            Ok(_) => Ok(true),
            Err(CutoverError::CommandFailed { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Moves files between the operator machine and hosts
pub trait FileTransfer: Send + Sync {
    fn upload(&self, host: &Host, local: &Path, remote: &str) -> CutoverResult<()>;
    fn download(&self, host: &Host, remote: &str, local: &Path) -> CutoverResult<()>;
}
