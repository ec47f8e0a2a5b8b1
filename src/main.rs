mod cli;

use std::{
    collections::HashSet,
    fs,
    io::{self, Read},
};

use anyhow::{bail, Context, Result};
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use python_plugin::{
    process::EntryScript, Config, LanguagePlugin, PluginExecutionProps, PythonPlugin,
};
use serde::Serialize;
use serde_json::{Map, Value};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let cfg = Config::load();

    // stdout carries JSON only; logs go to stderr
    env_logger::Builder::new()
        .parse_filters(&cfg.log_filter())
        .target(env_logger::Target::Stderr)
        .init();

    let script = EntryScript::from_install_dir()?;
    if args.install_runtime {
        script.install()?;
        println!("Installed entry script at {}", script.path().display());
        return Ok(());
    }
    if let Err(e) = script.ensure_installed() {
        log::warn!("could not refresh {}: {e:#}", script.path().display());
    }

    let mut plugin_cfg = cfg.plugin_configuration();
    if let Some(ms) = args.timeout_ms {
        plugin_cfg.python_execution_timeout_ms = ms;
    }
    let plugin = PythonPlugin::with_script(plugin_cfg, script);

    if args.bindings {
        let code = match args.code {
            Some(c) => c,
            None => read_stdin()?,
        };
        let data_context: Map<String, Value> = match &args.data {
            Some(p) => {
                let text = fs::read_to_string(p)
                    .with_context(|| format!("reading data context: {}", p.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing data context: {}", p.display()))?
            }
            None => Map::new(),
        };
        let entities: HashSet<String> = args.identifiers.into_iter().collect();
        let pairs = plugin
            .evaluate_binding_pairs(&code, &entities, &data_context)
            .await?;
        return print_json(&pairs, args.pretty);
    }

    let raw = match &args.request {
        Some(p) => fs::read_to_string(p)
            .with_context(|| format!("reading request: {}", p.display()))?,
        None => read_stdin()?,
    };
    if raw.trim().is_empty() {
        bail!("Provide an execution request with --request or via stdin");
    }
    let props: PluginExecutionProps =
        serde_json::from_str(&raw).context("parsing execution request")?;

    let output = plugin.execute(props).await?;
    if let Some(err) = &output.error {
        if io::stderr().is_terminal() {
            eprintln!("{}", err.red());
        }
    }
    print_json(&output, args.pretty)
}

fn read_stdin() -> Result<String> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        bail!("nothing on stdin");
    }
    let mut buf = String::new();
    stdin.lock().read_to_string(&mut buf)?;
    Ok(buf)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", text);
    Ok(())
}
