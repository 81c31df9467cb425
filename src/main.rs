use std::path::PathBuf;

use anyhow::{bail, Context};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vim_debugger::config::{ConfigStore, Detector, TerminalPrompt};
use vim_debugger::debugger::{
    DebugContext, DebuggerFactory, EditorFactory, LocalDebugger, Output, Personality,
    ScriptTrace, Session,
};
use vim_debugger::process::SystemRunner;

const USAGE: &str = "usage: vim-debugger [--check-config] [--vim] <file> [--line N]";

struct Args {
    check_config: bool,
    vim: bool,
    file: Option<PathBuf>,
    line: usize,
}

fn parse_args(args: &[String]) -> anyhow::Result<Args> {
    let mut parsed = Args {
        check_config: false,
        vim: false,
        file: None,
        line: 1,
    };
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--check-config" => parsed.check_config = true,
            "--vim" => parsed.vim = true,
            "--line" => {
                let value = iter.next().context("--line needs a line number")?;
                parsed.line = value
                    .parse()
                    .with_context(|| format!("invalid line number '{value}'"))?;
            }
            "-h" | "--help" => bail!(USAGE),
            other if other.starts_with("--") => bail!("unknown option '{other}'\n{USAGE}"),
            other => parsed.file = Some(PathBuf::from(other)),
        }
    }
    Ok(parsed)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("VIMDEBUG_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args = parse_args(&args)?;

    let store = ConfigStore::default_location()?;
    let initial = store.load()?;
    let config = Detector::new(&initial, SystemRunner, TerminalPrompt)
        .check_configuration(&store)?;

    if args.check_config {
        println!("{config}");
        return Ok(());
    }

    let Some(file) = args.file else {
        bail!(USAGE);
    };
    let trace =
        ScriptTrace::open(&file).with_context(|| format!("cannot read {}", file.display()))?;

    let ctx = DebugContext::new(Output::stdout());
    let mut factory = EditorFactory::new(config);
    let debugger = if args.vim {
        factory.build(Personality::Remote, ctx)?
    } else {
        Box::new(LocalDebugger::stdin(ctx))
    };
    let mut session = Session::new(debugger, Box::new(factory));
    session.install_switch();

    let disposition = trace.run(&mut session, args.line)?;
    tracing::info!(?disposition, file = %file.display(), "debugging finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_flags_and_file() {
        let parsed = parse_args(&args(&["--vim", "app.py", "--line", "7"])).unwrap();
        assert!(parsed.vim);
        assert!(!parsed.check_config);
        assert_eq!(parsed.file, Some(PathBuf::from("app.py")));
        assert_eq!(parsed.line, 7);
    }

    #[test]
    fn rejects_unknown_options_and_bad_lines() {
        assert!(parse_args(&args(&["--bogus"])).is_err());
        assert!(parse_args(&args(&["app.py", "--line", "x"])).is_err());
        assert!(parse_args(&args(&["app.py", "--line"])).is_err());
    }
}
